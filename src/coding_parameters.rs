//! Scan-level coding parameters and JPEG-LS preset coding parameters,
//! including the default threshold computation of ISO/IEC 14495-1,
//! C.2.4.1.1.

use crate::constants::DEFAULT_RESET_THRESHOLD;
use crate::error::JpeglsError;
use crate::{ColorTransformation, InterleaveMode};
use std::cmp::{max, min};

/// Parameters of one scan, recovered from or written to the SOS segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodingParameters {
    pub near_lossless: i32,
    pub interleave_mode: InterleaveMode,
    pub transformation: ColorTransformation,
}

impl Default for CodingParameters {
    fn default() -> Self {
        Self {
            near_lossless: 0,
            interleave_mode: InterleaveMode::None,
            transformation: ColorTransformation::None,
        }
    }
}

/// JPEG-LS preset coding parameters (LSE segment, type 1). A field value of
/// 0 selects the computed default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresetCodingParameters {
    pub maximum_sample_value: i32,
    pub threshold1: i32,
    pub threshold2: i32,
    pub threshold3: i32,
    pub reset_value: i32,
}

// Clamping function as defined by ISO/IEC 14495-1, Figure C.3.
const fn clamp(i: i32, j: i32, maximum_sample_value: i32) -> i32 {
    if i > maximum_sample_value || i < j { j } else { i }
}

pub fn compute_maximum_near_lossless(maximum_sample_value: i32) -> i32 {
    debug_assert!(maximum_sample_value >= 1);
    min(255, maximum_sample_value / 2)
}

/// Default coding threshold values as defined by ISO/IEC 14495-1, C.2.4.1.1.1.
pub fn compute_default(maximum_sample_value: i32, near_lossless: i32) -> PresetCodingParameters {
    debug_assert!(maximum_sample_value <= u16::MAX as i32);
    debug_assert!(
        near_lossless >= 0 && near_lossless <= compute_maximum_near_lossless(maximum_sample_value)
    );

    // Basic threshold values for JPEG-LS statistical modeling as defined in
    // ISO/IEC 14495-1, table C.3 for the case MAXVAL = 255 and NEAR = 0.
    const BASIC_THRESHOLD1: i32 = 3;
    const BASIC_THRESHOLD2: i32 = 7;
    const BASIC_THRESHOLD3: i32 = 21;

    if maximum_sample_value >= 128 {
        let factor = (min(maximum_sample_value, 4095) + 128) / 256;
        let threshold1 = clamp(
            factor * (BASIC_THRESHOLD1 - 2) + 2 + 3 * near_lossless,
            near_lossless + 1,
            maximum_sample_value,
        );
        let threshold2 = clamp(
            factor * (BASIC_THRESHOLD2 - 3) + 3 + 5 * near_lossless,
            threshold1,
            maximum_sample_value,
        );

        PresetCodingParameters {
            maximum_sample_value,
            threshold1,
            threshold2,
            threshold3: clamp(
                factor * (BASIC_THRESHOLD3 - 4) + 4 + 7 * near_lossless,
                threshold2,
                maximum_sample_value,
            ),
            reset_value: DEFAULT_RESET_THRESHOLD,
        }
    } else {
        let factor = 256 / (maximum_sample_value + 1);
        let threshold1 = clamp(
            max(2, BASIC_THRESHOLD1 / factor + 3 * near_lossless),
            near_lossless + 1,
            maximum_sample_value,
        );
        let threshold2 = clamp(
            max(3, BASIC_THRESHOLD2 / factor + 5 * near_lossless),
            threshold1,
            maximum_sample_value,
        );

        PresetCodingParameters {
            maximum_sample_value,
            threshold1,
            threshold2,
            threshold3: clamp(
                max(4, BASIC_THRESHOLD3 / factor + 7 * near_lossless),
                threshold2,
                maximum_sample_value,
            ),
            reset_value: DEFAULT_RESET_THRESHOLD,
        }
    }
}

/// Validates explicit preset coding parameters against ISO/IEC 14495-1,
/// C.2.4.1.1, Table C.1 and resolves every 0 field to its default.
pub fn validate_preset_coding_parameters(
    preset: &PresetCodingParameters,
    maximum_component_value: i32,
    near_lossless: i32,
) -> Result<PresetCodingParameters, JpeglsError> {
    debug_assert!(maximum_component_value >= 3 && maximum_component_value <= u16::MAX as i32);

    if preset.maximum_sample_value != 0
        && (preset.maximum_sample_value < 1
            || preset.maximum_sample_value > maximum_component_value)
    {
        return Err(JpeglsError::InvalidParameterPresetCodingParameters);
    }

    let maximum_sample_value = if preset.maximum_sample_value != 0 {
        preset.maximum_sample_value
    } else {
        maximum_component_value
    };

    if preset.threshold1 != 0
        && (preset.threshold1 < near_lossless + 1 || preset.threshold1 > maximum_sample_value)
    {
        return Err(JpeglsError::InvalidParameterPresetCodingParameters);
    }

    let defaults = compute_default(maximum_sample_value, near_lossless);

    let threshold1 = if preset.threshold1 != 0 {
        preset.threshold1
    } else {
        defaults.threshold1
    };

    if preset.threshold2 != 0
        && (preset.threshold2 < threshold1 || preset.threshold2 > maximum_sample_value)
    {
        return Err(JpeglsError::InvalidParameterPresetCodingParameters);
    }

    let threshold2 = if preset.threshold2 != 0 {
        preset.threshold2
    } else {
        defaults.threshold2
    };

    if preset.threshold3 != 0
        && (preset.threshold3 < threshold2 || preset.threshold3 > maximum_sample_value)
    {
        return Err(JpeglsError::InvalidParameterPresetCodingParameters);
    }

    if preset.reset_value != 0
        && (preset.reset_value < 3 || preset.reset_value > max(255, maximum_sample_value))
    {
        return Err(JpeglsError::InvalidParameterPresetCodingParameters);
    }

    Ok(PresetCodingParameters {
        maximum_sample_value,
        threshold1,
        threshold2,
        threshold3: if preset.threshold3 != 0 {
            preset.threshold3
        } else {
            defaults.threshold3
        },
        reset_value: if preset.reset_value != 0 {
            preset.reset_value
        } else {
            defaults.reset_value
        },
    })
}

/// True when the parameters carry no explicit value, or match the computed
/// defaults exactly; such parameters need no LSE segment on the wire.
pub fn is_default(preset: &PresetCodingParameters, defaults: &PresetCodingParameters) -> bool {
    *preset == PresetCodingParameters::default() || preset == defaults
}
