//! JPEG-LS codec (ISO/IEC 14495-1 / ITU-T T.87)
//!
//! JPEG-LS is a low-complexity lossless and near-lossless image compression
//! standard built on context-adaptive prediction, Golomb-Rice entropy coding
//! and a run-length mode for flat regions.
//!
//! The crate provides:
//! - [`JpeglsEncoder`]: encodes raw pixel data into a JPEG-LS codestream.
//! - [`JpeglsDecoder`]: decodes a JPEG-LS codestream back into pixels.
//! - The scan-level codec machinery (`scan_encoder` / `scan_decoder`) for
//!   callers that manage the JPEG marker framing themselves.
//!
//! Supported sample depths are 2 to 16 bits, with 1 component (grayscale)
//! or 3 components (non-interleaved, line interleaved or sample
//! interleaved).

use num_enum::TryFromPrimitive;

pub mod bit_reader;
pub mod bit_writer;
pub mod coding_parameters;
pub mod constants;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod golomb_lut;
pub mod jpeg_marker_code;
pub mod jpeg_stream_reader;
pub mod jpeg_stream_writer;
pub mod process_line;
pub mod quantization;
pub mod regular_mode_context;
pub mod run_mode_context;
pub mod scan_decoder;
pub mod scan_encoder;
pub mod traits;

pub use coding_parameters::{CodingParameters, PresetCodingParameters};
pub use decoder::JpeglsDecoder;
pub use encoder::JpeglsEncoder;
pub use error::JpeglsError;

/// Interleave mode for multi-component scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, TryFromPrimitive)]
#[repr(u8)]
pub enum InterleaveMode {
    /// Each component is coded in its own scan.
    #[default]
    None = 0,
    /// Components are interleaved per line.
    Line = 1,
    /// Components are interleaved per sample.
    Sample = 2,
}

/// Color transformation for multi-component scans.
///
/// The transforms themselves are applied by line-transform collaborators
/// outside the codec; the codec only carries the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, TryFromPrimitive)]
#[repr(u8)]
pub enum ColorTransformation {
    /// No color transformation.
    #[default]
    None = 0,
    /// HP1 color transformation.
    Hp1 = 1,
    /// HP2 color transformation.
    Hp2 = 2,
    /// HP3 color transformation.
    Hp3 = 3,
}

/// Basic image parameters of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: i32,
    pub component_count: i32,
}

/// Region of a frame, used to restrict the delivered area when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The full area of a frame.
    pub fn full(frame_info: &FrameInfo) -> Self {
        Self::new(0, 0, frame_info.width, frame_info.height)
    }

    pub fn is_valid_for(&self, frame_info: &FrameInfo) -> bool {
        self.width != 0
            && self.height != 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= frame_info.width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= frame_info.height)
    }
}
