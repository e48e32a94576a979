//! Decoder half of the bit I/O engine.
//!
//! Reads Golomb-coded symbols from a JPEG-LS entropy-coded segment. The
//! segment uses bit stuffing: after a literal 0xFF byte the encoder emits a
//! 0 bit before continuing, so a 0xFF followed by a byte with the high bit
//! set can only be a marker. The reader keeps a wide cache of decoded bits
//! and refills it either via a bulk big-endian load (when no 0xFF is near)
//! or byte by byte applying the stuffing rule.

use crate::constants::SHORT_CODE_TABLE_COUNT;
use crate::error::JpeglsError;
use crate::golomb_lut::GOLOMB_LUT;
use crate::jpeg_marker_code::JPEG_MARKER_START_BYTE;
use crate::traits::unmap_error_value;

const CACHE_BITS: i32 = u64::BITS as i32;
const MAX_READABLE_BITS: i32 = CACHE_BITS - 8;

pub struct BitReader<'a> {
    source: &'a [u8],
    position: usize,
    /// Position of the next 0xFF byte at or after `position`, or the end of
    /// the source. Everything before it can be bulk loaded.
    next_ff_position: usize,
    read_cache: u64,
    valid_bits: i32,
}

impl<'a> BitReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        let mut reader = Self {
            source,
            position: 0,
            next_ff_position: 0,
            read_cache: 0,
            valid_bits: 0,
        };
        reader.find_next_ff();
        reader
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn find_next_ff(&mut self) {
        self.next_ff_position = self.position
            + self.source[self.position..]
                .iter()
                .position(|&byte| byte == JPEG_MARKER_START_BYTE)
                .unwrap_or(self.source.len() - self.position);
    }

    /// Refills the read cache. Returns false when no new bits could be
    /// loaded because the stream is at a marker or at its end.
    fn make_valid(&mut self) -> bool {
        debug_assert!(self.valid_bits < 32);

        // Common case: at least 4 stuffing-free bytes ahead.
        if self.position + 4 <= self.next_ff_position {
            let chunk = [
                self.source[self.position],
                self.source[self.position + 1],
                self.source[self.position + 2],
                self.source[self.position + 3],
            ];
            let loaded = u32::from_be_bytes(chunk) as u64;
            let free_bits = CACHE_BITS - self.valid_bits;
            self.read_cache |= loaded << (free_bits - 32);
            self.position += 4;
            self.valid_bits += 32;
            return true;
        }

        let valid_bits_on_entry = self.valid_bits;
        while self.valid_bits <= MAX_READABLE_BITS {
            if self.position == self.source.len() {
                break;
            }

            let value = self.source[self.position];
            if value == JPEG_MARKER_START_BYTE {
                // A 0xFF followed by a high-bit-set byte is a marker, and a
                // trailing 0xFF can only start one. Either way the scan data
                // ends here.
                if self.position + 1 == self.source.len()
                    || (self.source[self.position + 1] & 0x80) != 0
                {
                    break;
                }
            }

            self.read_cache |= (value as u64) << (CACHE_BITS - 8 - self.valid_bits);
            self.position += 1;
            self.valid_bits += 8;

            if value == JPEG_MARKER_START_BYTE {
                // The next byte carries a stuffed 0 in its high bit. Advance
                // by 7 so that bit overlaps the 0xFF's lowest (set) bit; the
                // OR above keeps the payload intact.
                self.valid_bits -= 1;
                if self.position >= self.next_ff_position {
                    self.find_next_ff();
                }
            }
        }

        self.valid_bits != valid_bits_on_entry
    }

    fn fill_cache(&mut self, needed_bits: i32) -> Result<(), JpeglsError> {
        if !self.make_valid() || self.valid_bits < needed_bits {
            return Err(JpeglsError::InvalidCompressedData);
        }
        Ok(())
    }

    pub fn read_value(&mut self, bit_count: i32) -> Result<i32, JpeglsError> {
        debug_assert!(bit_count > 0 && bit_count < 32);
        if self.valid_bits < bit_count {
            self.fill_cache(bit_count)?;
        }
        let value = (self.read_cache >> (CACHE_BITS - bit_count)) as i32;
        self.skip_bits(bit_count);
        Ok(value)
    }

    pub fn read_bit(&mut self) -> Result<bool, JpeglsError> {
        if self.valid_bits < 1 {
            self.fill_cache(1)?;
        }
        let set = (self.read_cache >> (CACHE_BITS - 1)) != 0;
        self.skip_bits(1);
        Ok(set)
    }

    pub fn peek_byte(&mut self) -> Result<i32, JpeglsError> {
        if self.valid_bits < 8 {
            self.fill_cache(8)?;
        }
        Ok((self.read_cache >> (CACHE_BITS - 8)) as i32)
    }

    fn peek_0_bits(&mut self) -> i32 {
        if self.valid_bits < 16 && !self.make_valid() && self.valid_bits == 0 {
            return -1;
        }
        let count = (self.read_cache.leading_zeros() as i32).min(self.valid_bits);
        if count < 16 && count < self.valid_bits {
            count
        } else {
            -1
        }
    }

    /// Counts the 0-run preceding the terminating 1 bit of a unary prefix
    /// and consumes the whole prefix.
    pub fn read_high_bits(&mut self) -> Result<i32, JpeglsError> {
        let count = self.peek_0_bits();
        if count >= 0 {
            self.skip_bits(count + 1);
            return Ok(count);
        }

        // Long prefix, walk it bit by bit. A valid stream bounds this via
        // the escape threshold; a hostile one runs out of source instead.
        let mut high_bits = 0;
        while !self.read_bit()? {
            high_bits += 1;
        }
        Ok(high_bits)
    }

    fn skip_bits(&mut self, bit_count: i32) {
        debug_assert!(bit_count <= self.valid_bits);
        self.read_cache <<= bit_count;
        self.valid_bits -= bit_count;
    }

    /// Decodes one Golomb-coded value the generic way: unary prefix, then
    /// either k remainder bits or the qbpp-bit escape payload.
    pub fn decode_value(&mut self, k: i32, limit: i32, qbpp: i32) -> Result<i32, JpeglsError> {
        let high_bits = self.read_high_bits()?;

        if high_bits >= limit - (qbpp + 1) {
            return Ok(self.read_value(qbpp)? + 1);
        }
        if k == 0 {
            return Ok(high_bits);
        }
        Ok((high_bits << k) + self.read_value(k)?)
    }

    /// Short-code path for regular-mode symbols: a single table probe
    /// decodes most codes in one step. Falls back to [`Self::decode_value`]
    /// plus unmapping when the code does not fit in 8 bits.
    pub fn decode_error_value(&mut self, k: i32, limit: i32, qbpp: i32) -> Result<i32, JpeglsError> {
        if (k as usize) < SHORT_CODE_TABLE_COUNT {
            if let Ok(peeked) = self.peek_byte() {
                let code = GOLOMB_LUT[k as usize][peeked as usize];
                if code.bit_count != 0 {
                    self.skip_bits(code.bit_count as i32);
                    return Ok(code.error_value as i32);
                }
            }
        }
        let mapped = self.decode_value(k, limit, qbpp)?;
        Ok(unmap_error_value(mapped))
    }

    /// Verifies that the scan consumed the stream exactly: at most 7 zero
    /// padding bits may remain before the next marker.
    pub fn end_scan(&mut self) -> Result<(), JpeglsError> {
        // Padding bits are zero; any set bit in the residue means the
        // decoder lost sync or the stream carries extra data.
        if self.valid_bits >= 8 {
            return Err(JpeglsError::TooMuchCompressedData);
        }
        if self.valid_bits > 0 && (self.read_cache >> (CACHE_BITS - self.valid_bits)) != 0 {
            return Err(JpeglsError::TooMuchCompressedData);
        }

        if self.position < self.source.len() && self.source[self.position] != JPEG_MARKER_START_BYTE
        {
            return Err(JpeglsError::TooMuchCompressedData);
        }
        Ok(())
    }
}
