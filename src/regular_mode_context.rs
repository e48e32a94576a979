use crate::constants::MAX_K_VALUE;
use crate::error::JpeglsError;
use crate::traits::bit_wise_sign;

/// Running statistics of one regular-mode context: `a` accumulates error
/// magnitudes, `b` the signed bias, `c` the prediction correction and `n`
/// the occurrence count. `n` is never 0: the periodic reset halves it but
/// the update always increments it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegularModeContext {
    a: i32,
    b: i32,
    c: i32,
    n: i32,
}

impl RegularModeContext {
    pub fn new(range: i32) -> Self {
        Self {
            a: initialization_value_for_a(range),
            b: 0,
            c: 0,
            n: 1,
        }
    }

    pub fn a(&self) -> i32 {
        self.a
    }

    pub fn b(&self) -> i32 {
        self.b
    }

    pub fn c(&self) -> i32 {
        self.c
    }

    pub fn n(&self) -> i32 {
        self.n
    }

    /// Correction applied to the error value when coding with k == 0
    /// (ISO/IEC 14495-1, A.5.3). Collapses to -1 or 0 so it can be applied
    /// with an XOR.
    pub fn get_error_correction(&self, k: i32) -> i32 {
        if k != 0 {
            return 0;
        }
        bit_wise_sign(2 * self.b + self.n - 1)
    }

    /// Smallest k with `n << k >= a`. A context driven past the hard bound
    /// can only come from a malformed stream.
    pub fn get_golomb_coding_parameter(&self) -> Result<i32, JpeglsError> {
        let mut k = 0;
        while ((self.n as i64) << k) < self.a as i64 && k < MAX_K_VALUE {
            k += 1;
        }
        if k == MAX_K_VALUE {
            return Err(JpeglsError::InvalidCompressedData);
        }
        Ok(k)
    }

    /// Accumulates an error value and re-centers the bias
    /// (ISO/IEC 14495-1, code segments A.12 and A.13).
    pub fn update_variables_and_bias(
        &mut self,
        error_value: i32,
        near_lossless: i32,
        reset_threshold: i32,
    ) -> Result<(), JpeglsError> {
        debug_assert!(self.n != 0);

        self.a += error_value.abs();
        self.b += error_value * (2 * near_lossless + 1);

        const LIMIT: i32 = 65536 * 256;
        if self.a >= LIMIT || self.b.abs() >= LIMIT {
            return Err(JpeglsError::InvalidCompressedData);
        }

        if self.n == reset_threshold {
            self.a >>= 1;
            self.b >>= 1;
            self.n >>= 1;
        }

        self.n += 1;
        debug_assert!(self.n != 0);

        const MAX_C: i32 = 127;
        const MIN_C: i32 = -128;

        if self.b + self.n <= 0 {
            self.b += self.n;
            if self.b <= -self.n {
                self.b = -self.n + 1;
            }
            if self.c > MIN_C {
                self.c -= 1;
            }
        } else if self.b > 0 {
            self.b -= self.n;
            if self.b > 0 {
                self.b = 0;
            }
            if self.c < MAX_C {
                self.c += 1;
            }
        }
        Ok(())
    }
}

pub(crate) fn initialization_value_for_a(range: i32) -> i32 {
    std::cmp::max(2, (range + 32) / 64)
}
