//! Top-level JPEG-LS decoder.

use crate::coding_parameters::{PresetCodingParameters, validate_preset_coding_parameters};
use crate::error::JpeglsError;
use crate::jpeg_stream_reader::JpegStreamReader;
use crate::process_line::{InterleavedLineSink, PlanarLineSink};
use crate::scan_decoder::make_scan_decoder;
use crate::{FrameInfo, InterleaveMode, Rect};

/// Decodes a JPEG-LS codestream back into raw pixel data.
///
/// The destination layout mirrors the encoder: plane after plane for
/// [`InterleaveMode::None`] with multiple components, pixel interleaved for
/// the other modes.
///
/// ```no_run
/// # use jpegls_rs::JpeglsDecoder;
/// # fn main() -> Result<(), jpegls_rs::JpeglsError> {
/// # let compressed: Vec<u8> = vec![];
/// let mut decoder = JpeglsDecoder::new(&compressed);
/// decoder.read_header()?;
/// let mut pixels = vec![0u8; decoder.destination_size()?];
/// decoder.decode(&mut pixels)?;
/// # Ok(())
/// # }
/// ```
pub struct JpeglsDecoder<'a> {
    reader: JpegStreamReader<'a>,
    header_read: bool,
}

impl<'a> JpeglsDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            reader: JpegStreamReader::new(source),
            header_read: false,
        }
    }

    /// Parses the stream header up to the first scan.
    pub fn read_header(&mut self) -> Result<(), JpeglsError> {
        self.reader.read_header()?;
        self.header_read = true;
        Ok(())
    }

    pub fn frame_info(&self) -> Result<FrameInfo, JpeglsError> {
        self.require_header()?;
        Ok(self.reader.frame_info())
    }

    /// Preset coding parameters recovered from the LSE segment, all zeros
    /// when the stream carries none.
    pub fn preset_coding_parameters(&self) -> Result<PresetCodingParameters, JpeglsError> {
        self.require_header()?;
        Ok(self.reader.preset_coding_parameters())
    }

    /// Near-lossless tolerance and interleave mode of the most recently
    /// decoded scan.
    pub fn near_lossless(&self) -> i32 {
        self.reader.parameters().near_lossless
    }

    pub fn interleave_mode(&self) -> InterleaveMode {
        self.reader.parameters().interleave_mode
    }

    /// Bytes needed to hold the fully decoded image.
    pub fn destination_size(&self) -> Result<usize, JpeglsError> {
        let frame_info = self.frame_info()?;
        Ok(destination_size_for(&frame_info, frame_info.width, frame_info.height))
    }

    /// Bytes needed to hold a decoded region of `width` by `height` pixels.
    pub fn destination_size_for_rect(&self, rect: Rect) -> Result<usize, JpeglsError> {
        let frame_info = self.frame_info()?;
        if !rect.is_valid_for(&frame_info) {
            return Err(JpeglsError::InvalidArgumentSize);
        }
        Ok(destination_size_for(&frame_info, rect.width, rect.height))
    }

    /// Decodes the whole image into `destination`.
    pub fn decode(&mut self, destination: &mut [u8]) -> Result<(), JpeglsError> {
        let frame_info = self.frame_info()?;
        self.decode_rect(destination, Rect::full(&frame_info))
    }

    /// Decodes the region `rect` into `destination`. The whole scan is
    /// processed either way; only the requested region is written out.
    pub fn decode_rect(&mut self, destination: &mut [u8], rect: Rect) -> Result<(), JpeglsError> {
        let frame_info = self.frame_info()?;
        if !rect.is_valid_for(&frame_info) {
            return Err(JpeglsError::InvalidArgumentSize);
        }
        if destination.len() < destination_size_for(&frame_info, rect.width, rect.height) {
            return Err(JpeglsError::UncompressedBufferTooSmall);
        }

        let sample_size = if frame_info.bits_per_sample <= 8 { 1 } else { 2 };
        let maximum_sample_value = (1 << frame_info.bits_per_sample) - 1;

        let component_count_in_first_scan = self.reader.read_start_of_scan_segment()?;

        if component_count_in_first_scan == 1 && frame_info.component_count > 1 {
            // Plane-interleaved stream: one scan per component.
            let plane_size = rect.width as usize * rect.height as usize * sample_size;
            for component in 0..frame_info.component_count {
                if component != 0 {
                    self.reader.read_start_of_scan_segment()?;
                }
                let parameters = self.reader.parameters();
                if parameters.interleave_mode != InterleaveMode::None {
                    return Err(JpeglsError::InvalidParameterInterleaveMode);
                }
                let preset = validate_preset_coding_parameters(
                    &self.reader.preset_coding_parameters(),
                    maximum_sample_value,
                    parameters.near_lossless,
                )?;

                let plane = &mut destination[component as usize * plane_size..][..plane_size];
                let mut sink = PlanarLineSink::new(plane);
                let mut scan_decoder = make_scan_decoder(
                    &frame_info,
                    &preset,
                    &parameters,
                    self.reader.remaining_data(),
                )?;
                let bytes_consumed = scan_decoder.decode_scan(&mut sink, rect)?;
                self.reader.advance(bytes_consumed);
            }
        } else {
            if component_count_in_first_scan != frame_info.component_count {
                return Err(JpeglsError::InvalidParameterComponentCount);
            }
            let parameters = self.reader.parameters();
            if frame_info.component_count > 1
                && parameters.interleave_mode == InterleaveMode::None
            {
                return Err(JpeglsError::InvalidParameterInterleaveMode);
            }
            let preset = validate_preset_coding_parameters(
                &self.reader.preset_coding_parameters(),
                maximum_sample_value,
                parameters.near_lossless,
            )?;

            let mut scan_decoder = make_scan_decoder(
                &frame_info,
                &preset,
                &parameters,
                self.reader.remaining_data(),
            )?;
            let bytes_consumed = match parameters.interleave_mode {
                InterleaveMode::Line => {
                    let mut sink = InterleavedLineSink::new(
                        destination,
                        frame_info.component_count as usize,
                        sample_size,
                    );
                    scan_decoder.decode_scan(&mut sink, rect)?
                }
                _ => {
                    let mut sink = PlanarLineSink::new(destination);
                    scan_decoder.decode_scan(&mut sink, rect)?
                }
            };
            self.reader.advance(bytes_consumed);
        }

        self.reader.read_end_of_image()
    }

    fn require_header(&self) -> Result<(), JpeglsError> {
        if !self.header_read {
            return Err(JpeglsError::InvalidOperation);
        }
        Ok(())
    }
}

fn destination_size_for(frame_info: &FrameInfo, width: u32, height: u32) -> usize {
    let sample_size = if frame_info.bits_per_sample <= 8 { 1 } else { 2 };
    width as usize * height as usize * frame_info.component_count as usize * sample_size
}
