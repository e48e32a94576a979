//! JPEG-LS codestream reader.
//!
//! Parses the marker segments of a JPEG-LS interchange stream up to and
//! including each SOS header, validates the recovered frame and scan
//! parameters, and hands the entropy-coded data that follows to the scan
//! decoder. Application data and comment segments are skipped.

use crate::FrameInfo;
use crate::InterleaveMode;
use crate::coding_parameters::{CodingParameters, PresetCodingParameters};
use crate::constants::{
    MAXIMUM_BITS_PER_SAMPLE, MAXIMUM_COMPONENT_COUNT, MINIMUM_BITS_PER_SAMPLE,
};
use crate::error::JpeglsError;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    BeforeStartOfImage,
    HeaderSection,
    ScanSection,
    EndOfImage,
}

pub struct JpegStreamReader<'a> {
    source: &'a [u8],
    position: usize,
    state: ReaderState,
    frame_info: FrameInfo,
    parameters: CodingParameters,
    preset_coding_parameters: PresetCodingParameters,
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            state: ReaderState::BeforeStartOfImage,
            frame_info: FrameInfo::default(),
            parameters: CodingParameters::default(),
            preset_coding_parameters: PresetCodingParameters::default(),
        }
    }

    pub fn frame_info(&self) -> FrameInfo {
        self.frame_info
    }

    /// Parameters of the most recently parsed SOS segment.
    pub fn parameters(&self) -> CodingParameters {
        self.parameters
    }

    pub fn preset_coding_parameters(&self) -> PresetCodingParameters {
        self.preset_coding_parameters
    }

    /// The entropy-coded data following the last parsed SOS segment.
    pub fn remaining_data(&self) -> &'a [u8] {
        &self.source[self.position..]
    }

    pub fn advance(&mut self, count: usize) {
        debug_assert!(self.position + count <= self.source.len());
        self.position += count;
    }

    fn read_byte(&mut self) -> Result<u8, JpeglsError> {
        if self.position == self.source.len() {
            return Err(JpeglsError::NeedMoreData);
        }
        let value = self.source[self.position];
        self.position += 1;
        Ok(value)
    }

    fn read_u16(&mut self) -> Result<u16, JpeglsError> {
        let high = self.read_byte()? as u16;
        let low = self.read_byte()? as u16;
        Ok(high << 8 | low)
    }

    fn read_marker(&mut self) -> Result<JpegMarkerCode, JpeglsError> {
        if self.read_byte()? != JPEG_MARKER_START_BYTE {
            return Err(JpeglsError::JpegMarkerStartByteNotFound);
        }

        // Optional fill bytes before the marker code are legal.
        let mut marker_byte = self.read_byte()?;
        while marker_byte == JPEG_MARKER_START_BYTE {
            marker_byte = self.read_byte()?;
        }

        JpegMarkerCode::try_from(marker_byte)
            .map_err(|_| JpeglsError::UnknownJpegMarkerFound)
    }

    fn read_segment_size(&mut self) -> Result<usize, JpeglsError> {
        let size = self.read_u16()? as usize;
        if size < 2 || self.position + (size - 2) > self.source.len() {
            return Err(JpeglsError::InvalidMarkerSegmentSize);
        }
        Ok(size - 2)
    }

    fn skip_segment(&mut self) -> Result<(), JpeglsError> {
        let size = self.read_segment_size()?;
        self.position += size;
        Ok(())
    }

    /// Parses from SOI up to (not including) the first SOS marker.
    pub fn read_header(&mut self) -> Result<(), JpeglsError> {
        if self.state != ReaderState::BeforeStartOfImage {
            return Err(JpeglsError::InvalidOperation);
        }
        if self.read_marker()? != JpegMarkerCode::StartOfImage {
            return Err(JpeglsError::StartOfImageMarkerNotFound);
        }
        self.state = ReaderState::HeaderSection;

        loop {
            match self.read_marker()? {
                JpegMarkerCode::StartOfFrameJpegls => self.read_start_of_frame_segment()?,
                JpegMarkerCode::JpeglsPresetParameters => {
                    self.read_preset_parameters_segment()?;
                }
                JpegMarkerCode::StartOfScan => {
                    if self.frame_info.width == 0 {
                        return Err(JpeglsError::UnexpectedStartOfScanMarker);
                    }
                    self.position -= 2;
                    return Ok(());
                }
                JpegMarkerCode::EndOfImage => {
                    return Err(JpeglsError::UnexpectedEndOfImageMarker);
                }
                JpegMarkerCode::StartOfImage => {
                    return Err(JpeglsError::DuplicateStartOfImageMarker);
                }
                JpegMarkerCode::ApplicationData0
                | JpegMarkerCode::ApplicationData1
                | JpegMarkerCode::ApplicationData2
                | JpegMarkerCode::ApplicationData3
                | JpegMarkerCode::ApplicationData4
                | JpegMarkerCode::ApplicationData5
                | JpegMarkerCode::ApplicationData6
                | JpegMarkerCode::ApplicationData7
                | JpegMarkerCode::ApplicationData8
                | JpegMarkerCode::ApplicationData9
                | JpegMarkerCode::ApplicationData10
                | JpegMarkerCode::ApplicationData11
                | JpegMarkerCode::ApplicationData12
                | JpegMarkerCode::ApplicationData13
                | JpegMarkerCode::ApplicationData14
                | JpegMarkerCode::ApplicationData15
                | JpegMarkerCode::Comment => self.skip_segment()?,
                JpegMarkerCode::DefineNumberOfLines
                | JpegMarkerCode::DefineRestartInterval => {
                    return Err(JpeglsError::ParameterValueNotSupported);
                }
            }
        }
    }

    fn read_start_of_frame_segment(&mut self) -> Result<(), JpeglsError> {
        if self.frame_info.width != 0 {
            return Err(JpeglsError::DuplicateStartOfFrameMarker);
        }

        let segment_size = self.read_segment_size()?;

        let bits_per_sample = self.read_byte()? as i32;
        if !(MINIMUM_BITS_PER_SAMPLE..=MAXIMUM_BITS_PER_SAMPLE).contains(&bits_per_sample) {
            return Err(JpeglsError::InvalidParameterBitsPerSample);
        }

        let height = self.read_u16()? as u32;
        if height == 0 {
            return Err(JpeglsError::InvalidParameterHeight);
        }

        let width = self.read_u16()? as u32;
        if width == 0 {
            return Err(JpeglsError::InvalidParameterWidth);
        }

        let component_count = self.read_byte()? as i32;
        if component_count == 0 || component_count > MAXIMUM_COMPONENT_COUNT {
            return Err(JpeglsError::InvalidParameterComponentCount);
        }

        if segment_size != 6 + component_count as usize * 3 {
            return Err(JpeglsError::InvalidMarkerSegmentSize);
        }

        for _ in 0..component_count {
            let _component_id = self.read_byte()?;
            let sampling_factor = self.read_byte()?;
            if sampling_factor != 0x11 {
                return Err(JpeglsError::ParameterValueNotSupported);
            }
            let quantization_table = self.read_byte()?;
            if quantization_table != 0 {
                return Err(JpeglsError::ParameterValueNotSupported);
            }
        }

        self.frame_info = FrameInfo {
            width,
            height,
            bits_per_sample,
            component_count,
        };
        Ok(())
    }

    fn read_preset_parameters_segment(&mut self) -> Result<(), JpeglsError> {
        let segment_size = self.read_segment_size()?;
        if segment_size < 1 {
            return Err(JpeglsError::InvalidMarkerSegmentSize);
        }

        match self.read_byte()? {
            1 => {
                if segment_size != 1 + 5 * 2 {
                    return Err(JpeglsError::InvalidMarkerSegmentSize);
                }
                self.preset_coding_parameters = PresetCodingParameters {
                    maximum_sample_value: self.read_u16()? as i32,
                    threshold1: self.read_u16()? as i32,
                    threshold2: self.read_u16()? as i32,
                    threshold3: self.read_u16()? as i32,
                    reset_value: self.read_u16()? as i32,
                };
                Ok(())
            }
            // Mapping tables and oversize image dimensions.
            2..=4 => Err(JpeglsError::ParameterValueNotSupported),
            _ => Err(JpeglsError::InvalidJpeglsPresetParameterType),
        }
    }

    /// Parses the next SOS segment. Returns the number of components in the
    /// scan.
    pub fn read_start_of_scan_segment(&mut self) -> Result<i32, JpeglsError> {
        if self.state == ReaderState::BeforeStartOfImage || self.state == ReaderState::EndOfImage {
            return Err(JpeglsError::InvalidOperation);
        }
        if self.read_marker()? != JpegMarkerCode::StartOfScan {
            return Err(JpeglsError::UnexpectedStartOfScanMarker);
        }

        let segment_size = self.read_segment_size()?;
        let component_count_in_scan = self.read_byte()? as i32;
        if component_count_in_scan > 4
            || (component_count_in_scan != 1
                && component_count_in_scan != self.frame_info.component_count)
        {
            return Err(JpeglsError::InvalidParameterComponentCount);
        }
        if segment_size != 4 + component_count_in_scan as usize * 2 {
            return Err(JpeglsError::InvalidMarkerSegmentSize);
        }

        for _ in 0..component_count_in_scan {
            let _component_id = self.read_byte()?;
            let mapping_table = self.read_byte()?;
            if mapping_table != 0 {
                return Err(JpeglsError::ParameterValueNotSupported);
            }
        }

        let near_lossless = self.read_byte()? as i32;
        let maximum_near =
            crate::coding_parameters::compute_maximum_near_lossless(self.maximum_sample_value());
        if near_lossless > maximum_near {
            return Err(JpeglsError::InvalidParameterNearLossless);
        }

        let interleave_mode = InterleaveMode::try_from(self.read_byte()?)
            .map_err(|_| JpeglsError::InvalidParameterInterleaveMode)?;
        if component_count_in_scan == 1 && interleave_mode != InterleaveMode::None {
            return Err(JpeglsError::InvalidParameterInterleaveMode);
        }

        let point_transform = self.read_byte()?;
        if point_transform != 0 {
            return Err(JpeglsError::ParameterValueNotSupported);
        }

        self.parameters.near_lossless = near_lossless;
        self.parameters.interleave_mode = interleave_mode;
        self.state = ReaderState::ScanSection;
        Ok(component_count_in_scan)
    }

    /// Verifies the stream ends with EOI after the last scan.
    pub fn read_end_of_image(&mut self) -> Result<(), JpeglsError> {
        match self.read_marker() {
            Ok(JpegMarkerCode::EndOfImage) => {
                self.state = ReaderState::EndOfImage;
                Ok(())
            }
            Ok(_) => Err(JpeglsError::EndOfImageMarkerNotFound),
            Err(JpeglsError::NeedMoreData) => Err(JpeglsError::EndOfImageMarkerNotFound),
            Err(error) => Err(error),
        }
    }

    fn maximum_sample_value(&self) -> i32 {
        if self.preset_coding_parameters.maximum_sample_value != 0 {
            self.preset_coding_parameters.maximum_sample_value
        } else {
            (1 << self.frame_info.bits_per_sample) - 1
        }
    }
}
