//! Gradient quantization.
//!
//! Maps a local gradient to one of 9 symmetric bins determined by the
//! thresholds T1 < T2 < T3 and the near-lossless tolerance. The scan codecs
//! consult the mapping once per gradient, so it is precomputed as a lookup
//! table; tables for the common bit depths with default parameters are
//! built once per process and shared.

use std::borrow::Cow;
use std::sync::OnceLock;

use crate::coding_parameters::{compute_default, PresetCodingParameters};

/// Reference bin computation (ISO/IEC 14495-1, code segment A.4).
pub fn quantize_gradient(
    di: i32,
    near_lossless: i32,
    t1: i32,
    t2: i32,
    t3: i32,
) -> i32 {
    if di <= -t3 {
        return -4;
    }
    if di <= -t2 {
        return -3;
    }
    if di <= -t1 {
        return -2;
    }
    if di < -near_lossless {
        return -1;
    }
    if di <= near_lossless {
        return 0;
    }
    if di < t1 {
        return 1;
    }
    if di < t2 {
        return 2;
    }
    if di < t3 {
        return 3;
    }
    4
}

/// Precomputed gradient-to-bin table covering every difference two samples
/// of the configured bit depth can produce.
#[derive(Debug, Clone)]
pub struct QuantizationTable {
    values: Vec<i8>,
    offset: i32,
}

impl QuantizationTable {
    pub fn new(bits_per_sample: i32, near_lossless: i32, t1: i32, t2: i32, t3: i32) -> Self {
        let offset = 1 << bits_per_sample;
        let values = (-offset..offset)
            .map(|di| quantize_gradient(di, near_lossless, t1, t2, t3) as i8)
            .collect();
        Self { values, offset }
    }

    #[inline]
    pub fn quantize(&self, di: i32) -> i32 {
        self.values[(di + self.offset) as usize] as i32
    }
}

fn build_default_table(bits_per_sample: i32) -> QuantizationTable {
    let preset = compute_default((1 << bits_per_sample) - 1, 0);
    QuantizationTable::new(
        bits_per_sample,
        0,
        preset.threshold1,
        preset.threshold2,
        preset.threshold3,
    )
}

/// Returns the quantization table for the given parameters: a shared
/// process-wide table when the parameters match a common default set, a
/// freshly built one otherwise.
pub fn quantization_table(
    bits_per_sample: i32,
    near_lossless: i32,
    preset: &PresetCodingParameters,
) -> Cow<'static, QuantizationTable> {
    static TABLE_8: OnceLock<QuantizationTable> = OnceLock::new();
    static TABLE_10: OnceLock<QuantizationTable> = OnceLock::new();
    static TABLE_12: OnceLock<QuantizationTable> = OnceLock::new();
    static TABLE_16: OnceLock<QuantizationTable> = OnceLock::new();

    let defaults = compute_default((1 << bits_per_sample) - 1, 0);
    if near_lossless == 0 && *preset == defaults {
        match bits_per_sample {
            8 => return Cow::Borrowed(TABLE_8.get_or_init(|| build_default_table(8))),
            10 => return Cow::Borrowed(TABLE_10.get_or_init(|| build_default_table(10))),
            12 => return Cow::Borrowed(TABLE_12.get_or_init(|| build_default_table(12))),
            16 => return Cow::Borrowed(TABLE_16.get_or_init(|| build_default_table(16))),
            _ => {}
        }
    }

    Cow::Owned(QuantizationTable::new(
        bits_per_sample,
        near_lossless,
        preset.threshold1,
        preset.threshold2,
        preset.threshold3,
    ))
}
