//! JPEG-LS codestream writer.
//!
//! Emits the marker segments of a minimal JPEG-LS interchange stream: SOI,
//! SOF55 (JPEG-LS frame), LSE (preset coding parameters, type 1), one SOS
//! per scan and EOI. The entropy-coded scan data itself is produced by the
//! scan encoder and spliced in between SOS and the next marker.

use crate::FrameInfo;
use crate::InterleaveMode;
use crate::coding_parameters::PresetCodingParameters;
use crate::error::JpeglsError;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};

pub struct JpegStreamWriter<'a> {
    destination: &'a mut [u8],
    position: usize,
}

impl<'a> JpegStreamWriter<'a> {
    pub fn new(destination: &'a mut [u8]) -> Self {
        Self {
            destination,
            position: 0,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.position
    }

    fn write_byte(&mut self, value: u8) -> Result<(), JpeglsError> {
        if self.position == self.destination.len() {
            return Err(JpeglsError::CompressedBufferTooSmall);
        }
        self.destination[self.position] = value;
        self.position += 1;
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<(), JpeglsError> {
        let bytes = value.to_be_bytes();
        self.write_byte(bytes[0])?;
        self.write_byte(bytes[1])
    }

    fn write_marker(&mut self, marker: JpegMarkerCode) -> Result<(), JpeglsError> {
        self.write_byte(JPEG_MARKER_START_BYTE)?;
        self.write_byte(marker as u8)
    }

    pub fn write_start_of_image(&mut self) -> Result<(), JpeglsError> {
        self.write_marker(JpegMarkerCode::StartOfImage)
    }

    pub fn write_end_of_image(&mut self) -> Result<(), JpeglsError> {
        self.write_marker(JpegMarkerCode::EndOfImage)
    }

    /// SOF55 segment (ISO/IEC 14495-1, C.2.2).
    pub fn write_start_of_frame_segment(
        &mut self,
        frame_info: &FrameInfo,
    ) -> Result<(), JpeglsError> {
        debug_assert!(frame_info.width <= u16::MAX as u32);
        debug_assert!(frame_info.height <= u16::MAX as u32);

        self.write_marker(JpegMarkerCode::StartOfFrameJpegls)?;
        self.write_u16(8 + frame_info.component_count as u16 * 3)?;
        self.write_byte(frame_info.bits_per_sample as u8)?;
        self.write_u16(frame_info.height as u16)?;
        self.write_u16(frame_info.width as u16)?;
        self.write_byte(frame_info.component_count as u8)?;

        for component in 0..frame_info.component_count {
            self.write_byte(component as u8 + 1)?;
            // Horizontal and vertical sampling factor 1, no quantization
            // table (tables are a DCT concept; the field must be 0).
            self.write_byte(0x11)?;
            self.write_byte(0)?;
        }
        Ok(())
    }

    /// LSE segment, preset coding parameters (type 1).
    pub fn write_preset_coding_parameters_segment(
        &mut self,
        preset: &PresetCodingParameters,
    ) -> Result<(), JpeglsError> {
        self.write_marker(JpegMarkerCode::JpeglsPresetParameters)?;
        self.write_u16(2 + 1 + 5 * 2)?;
        self.write_byte(1)?;

        self.write_u16(preset.maximum_sample_value as u16)?;
        self.write_u16(preset.threshold1 as u16)?;
        self.write_u16(preset.threshold2 as u16)?;
        self.write_u16(preset.threshold3 as u16)?;
        self.write_u16(preset.reset_value as u16)
    }

    /// SOS segment for the components `first_component_id..+component_count`.
    pub fn write_start_of_scan_segment(
        &mut self,
        first_component_id: u8,
        component_count: i32,
        near_lossless: i32,
        interleave_mode: InterleaveMode,
    ) -> Result<(), JpeglsError> {
        debug_assert!((1..=4).contains(&component_count));

        self.write_marker(JpegMarkerCode::StartOfScan)?;
        self.write_u16(6 + component_count as u16 * 2)?;
        self.write_byte(component_count as u8)?;

        for component in 0..component_count {
            self.write_byte(first_component_id + component as u8)?;
            // Mapping table selector, 0 = none.
            self.write_byte(0)?;
        }

        self.write_byte(near_lossless as u8)?;
        self.write_byte(interleave_mode as u8)?;
        // Point transform, always 0 for JPEG-LS.
        self.write_byte(0)
    }

    /// The unwritten tail of the destination, for the scan encoder.
    pub fn remaining_destination(&mut self) -> &mut [u8] {
        &mut self.destination[self.position..]
    }

    /// Accounts for scan bytes written directly into
    /// [`Self::remaining_destination`].
    pub fn advance(&mut self, count: usize) {
        debug_assert!(self.position + count <= self.destination.len());
        self.position += count;
    }
}
