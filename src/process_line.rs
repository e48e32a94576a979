//! Line transform seam between the scan codecs and the caller's pixel
//! buffers.
//!
//! The codecs pull uncompressed lines through [`LineSource`] and push
//! decoded lines through [`LineSink`], one call per scanline per coded
//! unit: a component plane line for plane-interleaved scans, one line per
//! component for line-interleaved scans, a pixel-interleaved line for
//! sample-interleaved scans. Color transforms and layout remapping live
//! behind these traits, outside the codec.

use crate::error::JpeglsError;

pub trait LineSource {
    /// Fills `line` with the next uncompressed line of samples.
    fn request_line(&mut self, line: &mut [u8]) -> Result<(), JpeglsError>;
}

pub trait LineSink {
    /// Receives the next decoded line of samples.
    fn deliver_line(&mut self, line: &[u8]) -> Result<(), JpeglsError>;
}

/// Reads lines sequentially from a caller buffer whose layout already
/// matches the scan order (single component, planar, or sample
/// interleaved).
pub struct PlanarLineSource<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> PlanarLineSource<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
        }
    }
}

impl LineSource for PlanarLineSource<'_> {
    fn request_line(&mut self, line: &mut [u8]) -> Result<(), JpeglsError> {
        let end = self.position + line.len();
        if end > self.source.len() {
            return Err(JpeglsError::UncompressedBufferTooSmall);
        }
        line.copy_from_slice(&self.source[self.position..end]);
        self.position = end;
        Ok(())
    }
}

/// Writes decoded lines sequentially to a caller buffer in scan order.
pub struct PlanarLineSink<'a> {
    destination: &'a mut [u8],
    position: usize,
}

impl<'a> PlanarLineSink<'a> {
    pub fn new(destination: &'a mut [u8]) -> Self {
        Self {
            destination,
            position: 0,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.position
    }
}

impl LineSink for PlanarLineSink<'_> {
    fn deliver_line(&mut self, line: &[u8]) -> Result<(), JpeglsError> {
        let end = self.position + line.len();
        if end > self.destination.len() {
            return Err(JpeglsError::UncompressedBufferTooSmall);
        }
        self.destination[self.position..end].copy_from_slice(line);
        self.position = end;
        Ok(())
    }
}

/// Splits a pixel-interleaved caller buffer into per-component lines for a
/// line-interleaved scan: consecutive calls yield component 0..n of line 0,
/// then component 0..n of line 1, and so on.
pub struct InterleavedLineSource<'a> {
    source: &'a [u8],
    component_count: usize,
    sample_size: usize,
    line: usize,
    component: usize,
}

impl<'a> InterleavedLineSource<'a> {
    pub fn new(source: &'a [u8], component_count: usize, sample_size: usize) -> Self {
        Self {
            source,
            component_count,
            sample_size,
            line: 0,
            component: 0,
        }
    }
}

impl LineSource for InterleavedLineSource<'_> {
    fn request_line(&mut self, line: &mut [u8]) -> Result<(), JpeglsError> {
        let pixel_count = line.len() / self.sample_size;
        let pixel_stride = self.component_count * self.sample_size;
        let line_start = self.line * pixel_count * pixel_stride;

        let needed = line_start + pixel_count * pixel_stride;
        if needed > self.source.len() {
            return Err(JpeglsError::UncompressedBufferTooSmall);
        }

        for pixel in 0..pixel_count {
            let from = line_start + pixel * pixel_stride + self.component * self.sample_size;
            let to = pixel * self.sample_size;
            line[to..to + self.sample_size]
                .copy_from_slice(&self.source[from..from + self.sample_size]);
        }

        self.component += 1;
        if self.component == self.component_count {
            self.component = 0;
            self.line += 1;
        }
        Ok(())
    }
}

/// Reassembles per-component decoded lines into a pixel-interleaved caller
/// buffer, mirroring [`InterleavedLineSource`].
pub struct InterleavedLineSink<'a> {
    destination: &'a mut [u8],
    component_count: usize,
    sample_size: usize,
    line: usize,
    component: usize,
    delivered: usize,
}

impl<'a> InterleavedLineSink<'a> {
    pub fn new(destination: &'a mut [u8], component_count: usize, sample_size: usize) -> Self {
        Self {
            destination,
            component_count,
            sample_size,
            line: 0,
            component: 0,
            delivered: 0,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.delivered
    }
}

impl LineSink for InterleavedLineSink<'_> {
    fn deliver_line(&mut self, line: &[u8]) -> Result<(), JpeglsError> {
        let pixel_count = line.len() / self.sample_size;
        let pixel_stride = self.component_count * self.sample_size;
        let line_start = self.line * pixel_count * pixel_stride;

        let needed = line_start + pixel_count * pixel_stride;
        if needed > self.destination.len() {
            return Err(JpeglsError::UncompressedBufferTooSmall);
        }

        for pixel in 0..pixel_count {
            let to = line_start + pixel * pixel_stride + self.component * self.sample_size;
            let from = pixel * self.sample_size;
            self.destination[to..to + self.sample_size]
                .copy_from_slice(&line[from..from + self.sample_size]);
        }

        self.delivered += line.len();
        self.component += 1;
        if self.component == self.component_count {
            self.component = 0;
            self.line += 1;
        }
        Ok(())
    }
}
