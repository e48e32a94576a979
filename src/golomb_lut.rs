use crate::constants::SHORT_CODE_TABLE_COUNT;
use crate::traits::unmap_error_value;

/// One pre-decoded Golomb code: the signed error value and the number of
/// bits the code occupies. A `bit_count` of 0 marks a byte pattern with no
/// complete short code; the generic decoder handles those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GolombCodeMatch {
    pub error_value: i16,
    pub bit_count: i8,
}

const fn countl_zero_u8(mut x: u8) -> i8 {
    if x == 0 {
        return 8;
    }
    let mut count = 0;
    while (x & 0x80) == 0 {
        x <<= 1;
        count += 1;
    }
    count
}

/// For each small Golomb parameter k, maps a peeked byte to the decoded
/// error value and code length when the whole code fits in 8 bits. Escape
/// codes never fit: the escape threshold `limit - qbpp - 1` exceeds the
/// longest unary prefix an 8-bit code can carry for every legal parameter
/// set, so every table hit is a regular code.
pub const GOLOMB_LUT: [[GolombCodeMatch; 256]; SHORT_CODE_TABLE_COUNT] = {
    let mut lut = [[GolombCodeMatch {
        error_value: 0,
        bit_count: 0,
    }; 256]; SHORT_CODE_TABLE_COUNT];

    let mut k: usize = 0;
    while k < SHORT_CODE_TABLE_COUNT {
        let mut value: usize = 0;
        while value < 256 {
            let unary_length = countl_zero_u8(value as u8) as i32;
            let length = unary_length + 1 + k as i32;

            if length <= 8 {
                let shift = 8 - length;
                let remainder = ((value >> shift) & ((1usize << k) - 1)) as i32;
                let mapped_error_value = (unary_length << k) + remainder;
                lut[k][value] = GolombCodeMatch {
                    error_value: unmap_error_value(mapped_error_value) as i16,
                    bit_count: length as i8,
                };
            }
            value += 1;
        }
        k += 1;
    }
    lut
};
