//! Top-level JPEG-LS encoder.

use crate::coding_parameters::{
    CodingParameters, PresetCodingParameters, compute_default, compute_maximum_near_lossless,
    is_default, validate_preset_coding_parameters,
};
use crate::constants::{
    MAXIMUM_BITS_PER_SAMPLE, MAXIMUM_COMPONENT_COUNT, MAXIMUM_HEIGHT, MAXIMUM_NEAR_LOSSLESS,
    MAXIMUM_WIDTH, MINIMUM_BITS_PER_SAMPLE, MINIMUM_COMPONENT_COUNT,
};
use crate::error::JpeglsError;
use crate::jpeg_stream_writer::JpegStreamWriter;
use crate::process_line::{InterleavedLineSource, LineSource, PlanarLineSource};
use crate::scan_encoder::make_scan_encoder;
use crate::{ColorTransformation, FrameInfo, InterleaveMode};

/// Encodes raw pixel data into a complete JPEG-LS codestream.
///
/// The expected source layout is plane after plane for
/// [`InterleaveMode::None`] with multiple components, and pixel interleaved
/// for the other modes.
///
/// ```
/// # use jpegls_rs::{FrameInfo, JpeglsEncoder};
/// # fn main() -> Result<(), jpegls_rs::JpeglsError> {
/// let pixels = [0u8; 16 * 16];
/// let mut encoder = JpeglsEncoder::new();
/// encoder.set_frame_info(FrameInfo {
///     width: 16,
///     height: 16,
///     bits_per_sample: 8,
///     component_count: 1,
/// })?;
/// let mut destination = vec![0u8; encoder.estimated_destination_size()?];
/// let bytes_written = encoder.encode(&pixels, &mut destination)?;
/// destination.truncate(bytes_written);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct JpeglsEncoder {
    frame_info: Option<FrameInfo>,
    near_lossless: i32,
    interleave_mode: InterleaveMode,
    transformation: ColorTransformation,
    preset_coding_parameters: PresetCodingParameters,
}

impl JpeglsEncoder {
    pub fn new() -> Self {
        Self {
            frame_info: None,
            near_lossless: 0,
            interleave_mode: InterleaveMode::None,
            transformation: ColorTransformation::None,
            preset_coding_parameters: PresetCodingParameters::default(),
        }
    }

    pub fn set_frame_info(&mut self, frame_info: FrameInfo) -> Result<(), JpeglsError> {
        if frame_info.width == 0 || frame_info.width > MAXIMUM_WIDTH {
            return Err(JpeglsError::InvalidArgumentWidth);
        }
        if frame_info.height == 0 || frame_info.height > MAXIMUM_HEIGHT {
            return Err(JpeglsError::InvalidArgumentHeight);
        }
        if !(MINIMUM_BITS_PER_SAMPLE..=MAXIMUM_BITS_PER_SAMPLE)
            .contains(&frame_info.bits_per_sample)
        {
            return Err(JpeglsError::InvalidArgumentBitsPerSample);
        }
        if frame_info.component_count < MINIMUM_COMPONENT_COUNT
            || frame_info.component_count > MAXIMUM_COMPONENT_COUNT
        {
            return Err(JpeglsError::InvalidArgumentComponentCount);
        }
        self.frame_info = Some(frame_info);
        Ok(())
    }

    pub fn set_near_lossless(&mut self, near_lossless: i32) -> Result<(), JpeglsError> {
        if !(0..=MAXIMUM_NEAR_LOSSLESS).contains(&near_lossless) {
            return Err(JpeglsError::InvalidArgumentNearLossless);
        }
        self.near_lossless = near_lossless;
        Ok(())
    }

    pub fn set_interleave_mode(
        &mut self,
        interleave_mode: InterleaveMode,
    ) -> Result<(), JpeglsError> {
        self.interleave_mode = interleave_mode;
        Ok(())
    }

    pub fn set_color_transformation(
        &mut self,
        transformation: ColorTransformation,
    ) -> Result<(), JpeglsError> {
        // The transforms are line-transform collaborators outside this
        // crate; only the identity selection is accepted.
        if transformation != ColorTransformation::None {
            return Err(JpeglsError::ColorTransformNotSupported);
        }
        self.transformation = transformation;
        Ok(())
    }

    pub fn set_preset_coding_parameters(
        &mut self,
        preset: PresetCodingParameters,
    ) -> Result<(), JpeglsError> {
        self.preset_coding_parameters = preset;
        Ok(())
    }

    /// A destination size that is always sufficient for the configured
    /// frame, assuming the worst case of incompressible data.
    pub fn estimated_destination_size(&self) -> Result<usize, JpeglsError> {
        let frame_info = self.frame_info.ok_or(JpeglsError::InvalidOperation)?;
        let (width, height) = (frame_info.width as usize, frame_info.height as usize);
        let component_count = frame_info.component_count as usize;
        let sample_size = if frame_info.bits_per_sample <= 8 { 1 } else { 2 };
        Ok(width * height * component_count * (sample_size + 1) + 1024)
    }

    /// Encodes `source` into `destination` and returns the number of bytes
    /// written.
    pub fn encode(&self, source: &[u8], destination: &mut [u8]) -> Result<usize, JpeglsError> {
        let frame_info = self.frame_info.ok_or(JpeglsError::InvalidOperation)?;

        if self.interleave_mode != InterleaveMode::None
            && !(2..=4).contains(&frame_info.component_count)
        {
            return Err(JpeglsError::InvalidArgumentInterleaveMode);
        }
        if self.interleave_mode == InterleaveMode::Sample && frame_info.component_count != 3 {
            return Err(JpeglsError::InvalidArgumentInterleaveMode);
        }

        let maximum_sample_value = (1 << frame_info.bits_per_sample) - 1;
        if self.near_lossless > compute_maximum_near_lossless(maximum_sample_value) {
            return Err(JpeglsError::InvalidArgumentNearLossless);
        }

        let preset = validate_preset_coding_parameters(
            &self.preset_coding_parameters,
            maximum_sample_value,
            self.near_lossless,
        )?;

        let sample_size = if frame_info.bits_per_sample <= 8 { 1 } else { 2 };
        let plane_size = frame_info.width as usize * frame_info.height as usize * sample_size;
        if source.len() < plane_size * frame_info.component_count as usize {
            return Err(JpeglsError::UncompressedBufferTooSmall);
        }

        let parameters = CodingParameters {
            near_lossless: self.near_lossless,
            interleave_mode: self.interleave_mode,
            transformation: self.transformation,
        };

        let mut writer = JpegStreamWriter::new(destination);
        writer.write_start_of_image()?;
        writer.write_start_of_frame_segment(&frame_info)?;
        if !is_default(
            &self.preset_coding_parameters,
            &compute_default(maximum_sample_value, self.near_lossless),
        ) {
            writer.write_preset_coding_parameters_segment(&preset)?;
        }

        if self.interleave_mode == InterleaveMode::None && frame_info.component_count > 1 {
            // One scan per component, source plane after plane.
            for component in 0..frame_info.component_count {
                writer.write_start_of_scan_segment(
                    component as u8 + 1,
                    1,
                    self.near_lossless,
                    InterleaveMode::None,
                )?;

                let plane = &source[component as usize * plane_size..][..plane_size];
                let mut line_source = PlanarLineSource::new(plane);
                let bytes_written = encode_single_scan(
                    &frame_info,
                    &preset,
                    &parameters,
                    &mut line_source,
                    writer.remaining_destination(),
                )?;
                writer.advance(bytes_written);
            }
        } else {
            writer.write_start_of_scan_segment(
                1,
                frame_info.component_count,
                self.near_lossless,
                self.interleave_mode,
            )?;

            let bytes_written = match self.interleave_mode {
                InterleaveMode::Line => {
                    let mut line_source = InterleavedLineSource::new(
                        source,
                        frame_info.component_count as usize,
                        sample_size,
                    );
                    encode_single_scan(
                        &frame_info,
                        &preset,
                        &parameters,
                        &mut line_source,
                        writer.remaining_destination(),
                    )?
                }
                _ => {
                    let mut line_source = PlanarLineSource::new(source);
                    encode_single_scan(
                        &frame_info,
                        &preset,
                        &parameters,
                        &mut line_source,
                        writer.remaining_destination(),
                    )?
                }
            };
            writer.advance(bytes_written);
        }

        writer.write_end_of_image()?;
        Ok(writer.bytes_written())
    }
}

fn encode_single_scan(
    frame_info: &FrameInfo,
    preset: &PresetCodingParameters,
    parameters: &CodingParameters,
    line_source: &mut dyn LineSource,
    destination: &mut [u8],
) -> Result<usize, JpeglsError> {
    let mut scan_encoder = make_scan_encoder(frame_info, preset, parameters, destination)?;
    scan_encoder.encode_scan(line_source)
}
