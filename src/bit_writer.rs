//! Encoder half of the bit I/O engine.
//!
//! Packs Golomb-coded symbols into a bounded destination buffer. After a
//! literal 0xFF byte is written the next byte carries only 7 payload bits
//! with its high bit forced to 0, so a decoder can tell scan data from
//! markers.

use crate::error::JpeglsError;
use crate::jpeg_marker_code::JPEG_MARKER_START_BYTE;

pub struct BitWriter<'a> {
    destination: &'a mut [u8],
    position: usize,
    bit_buffer: u32,
    free_bit_count: i32,
    is_ff_written: bool,
}

impl<'a> BitWriter<'a> {
    pub fn new(destination: &'a mut [u8]) -> Self {
        Self {
            destination,
            position: 0,
            bit_buffer: 0,
            free_bit_count: 32,
            is_ff_written: false,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.position
    }

    pub fn append_to_bit_stream(&mut self, bits: u32, bit_count: i32) -> Result<(), JpeglsError> {
        debug_assert!((0..=31).contains(&bit_count));
        debug_assert!(bit_count == 31 || bits < (1u32 << bit_count));

        if bit_count == 0 {
            return Ok(());
        }

        self.free_bit_count -= bit_count;
        if self.free_bit_count >= 0 {
            self.bit_buffer |= bits << self.free_bit_count;
            return Ok(());
        }

        // The value spans the buffer boundary. Fill the buffer with the
        // part that fits, drain it, and re-apply: previously stored high
        // bits land on positions they already occupy, newly freed space
        // picks up the rest.
        self.bit_buffer |= bits >> -self.free_bit_count;
        self.flush()?;
        if self.free_bit_count < 0 {
            self.bit_buffer |= bits >> -self.free_bit_count;
            self.flush()?;
        }
        debug_assert!(self.free_bit_count >= 0);
        self.bit_buffer |= bits << self.free_bit_count;
        Ok(())
    }

    pub fn append_ones_to_bit_stream(&mut self, bit_count: i32) -> Result<(), JpeglsError> {
        self.append_to_bit_stream((1u32 << bit_count) - 1, bit_count)
    }

    /// Drains up to 4 bytes from a full bit buffer. Only called while the
    /// buffer holds at least 32 bits, so every emitted bit is payload.
    fn flush(&mut self) -> Result<(), JpeglsError> {
        for _ in 0..4 {
            if self.free_bit_count >= 32 {
                break;
            }
            self.emit_byte()?;
        }
        Ok(())
    }

    fn emit_byte(&mut self) -> Result<(), JpeglsError> {
        if self.position == self.destination.len() {
            return Err(JpeglsError::CompressedBufferTooSmall);
        }

        let value = if self.is_ff_written {
            // The high bit of this byte is the stuffed 0.
            (self.bit_buffer >> 25) as u8
        } else {
            (self.bit_buffer >> 24) as u8
        };
        let byte_payload_bits = if self.is_ff_written { 7 } else { 8 };

        self.destination[self.position] = value;
        self.position += 1;
        self.bit_buffer <<= byte_payload_bits;
        self.free_bit_count += byte_payload_bits;
        self.is_ff_written = value == JPEG_MARKER_START_BYTE;
        Ok(())
    }

    /// Golomb-codes one mapped value: a 0-run of `high_bits` terminated by
    /// a 1 bit, then k remainder bits, or the escape form when the prefix
    /// would reach `limit`.
    pub fn encode_mapped_value(
        &mut self,
        k: i32,
        mapped_error_value: i32,
        limit: i32,
        qbpp: i32,
    ) -> Result<(), JpeglsError> {
        let mut high_bits = mapped_error_value >> k;

        if high_bits < limit - qbpp - 1 {
            if high_bits + 1 > 31 {
                // The prefix exceeds one 32-bit append; emit half the zeros
                // separately.
                self.append_to_bit_stream(0, high_bits / 2)?;
                high_bits -= high_bits / 2;
            }
            self.append_to_bit_stream(1, high_bits + 1)?;
            if k != 0 {
                self.append_to_bit_stream((mapped_error_value as u32) & ((1 << k) - 1), k)?;
            }
            return Ok(());
        }

        let escape_prefix = limit - qbpp;
        if escape_prefix > 31 {
            self.append_to_bit_stream(0, 31)?;
            self.append_to_bit_stream(1, escape_prefix - 31)?;
        } else {
            self.append_to_bit_stream(1, escape_prefix)?;
        }
        self.append_to_bit_stream(
            ((mapped_error_value - 1) as u32) & ((1u32 << qbpp) - 1),
            qbpp,
        )
    }

    /// Drains the remaining payload bits, padding the final partial byte
    /// with zeros. The stream never ends on a raw 0xFF: the stuffed byte
    /// follows it, so the next byte a decoder sees is a marker lead.
    pub fn end_scan(&mut self) -> Result<usize, JpeglsError> {
        while self.free_bit_count < 32 {
            self.emit_byte()?;
        }
        if self.is_ff_written {
            self.emit_byte()?;
        }
        Ok(self.position)
    }
}
