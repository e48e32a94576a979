//! Scan decoder: the mirror of the scan encoder.
//!
//! Reads the entropy-coded segment of one scan, reconstructs samples in
//! strict raster order and delivers decoded lines to the caller's
//! [`LineSink`]. The whole scan is always decoded (causal prediction needs
//! every sample), but only the lines and columns inside the requested
//! rectangle are delivered.

use std::borrow::Cow;
use std::marker::PhantomData;

use crate::bit_reader::BitReader;
use crate::coding_parameters::{CodingParameters, PresetCodingParameters};
use crate::constants::{CONTEXT_COUNT, DEFAULT_RESET_THRESHOLD, J, RUN_MODE_CONTEXT_COUNT};
use crate::error::JpeglsError;
use crate::process_line::LineSink;
use crate::quantization::{QuantizationTable, quantization_table};
use crate::regular_mode_context::RegularModeContext;
use crate::run_mode_context::RunModeContext;
use crate::traits::{
    CodecTraits, DefaultTraits, LosslessTraits, Sample, Triplet, apply_sign, bit_wise_sign,
    compute_context_id, get_predicted_value, sign,
};
use crate::{FrameInfo, InterleaveMode, Rect};

/// Largest error magnitude a valid stream can produce.
const MAXIMUM_ERROR_MAGNITUDE: i32 = 65535;

pub trait DecodeStrategy {
    /// Decodes one scan, delivering the lines inside `rect` to `sink`.
    /// Returns the number of source bytes consumed.
    fn decode_scan(&mut self, sink: &mut dyn LineSink, rect: Rect) -> Result<usize, JpeglsError>;
}

/// Binds the sample type and numeric policy for one scan and returns the
/// decoder strategy.
pub fn make_scan_decoder<'a>(
    frame_info: &FrameInfo,
    preset: &PresetCodingParameters,
    parameters: &CodingParameters,
    source: &'a [u8],
) -> Result<Box<dyn DecodeStrategy + 'a>, JpeglsError> {
    if parameters.interleave_mode == InterleaveMode::Sample && frame_info.component_count != 3 {
        return Err(JpeglsError::ParameterValueNotSupported);
    }

    let near_lossless = parameters.near_lossless;
    let maximum_sample_value = preset.maximum_sample_value;

    macro_rules! build {
        ($sample:ty, $traits:expr) => {
            Ok(Box::new(ScanDecoderImpl::<$sample, _>::new(
                frame_info,
                preset,
                parameters,
                $traits,
                source,
            )))
        };
    }

    if near_lossless == 0 && preset.reset_value == DEFAULT_RESET_THRESHOLD {
        match (frame_info.bits_per_sample, maximum_sample_value) {
            (8, 255) => return build!(u8, LosslessTraits::<8>),
            (12, 4095) => return build!(u16, LosslessTraits::<12>),
            (16, 65535) => return build!(u16, LosslessTraits::<16>),
            _ => {}
        }
    }

    let traits = DefaultTraits::new(maximum_sample_value, near_lossless, preset.reset_value);
    if frame_info.bits_per_sample <= 8 {
        build!(u8, traits)
    } else {
        build!(u16, traits)
    }
}

struct ScanDecoderImpl<'a, T: Sample, Traits: CodecTraits> {
    frame_info: FrameInfo,
    interleave_mode: InterleaveMode,
    traits: Traits,
    reader: BitReader<'a>,
    quantization: Cow<'static, QuantizationTable>,
    contexts: Vec<RegularModeContext>,
    run_mode_contexts: [RunModeContext; RUN_MODE_CONTEXT_COUNT],
    run_index: usize,
    _sample: PhantomData<T>,
}

impl<'a, T: Sample, Traits: CodecTraits> ScanDecoderImpl<'a, T, Traits> {
    fn new(
        frame_info: &FrameInfo,
        preset: &PresetCodingParameters,
        parameters: &CodingParameters,
        traits: Traits,
        source: &'a [u8],
    ) -> Self {
        let range = traits.range();
        Self {
            frame_info: *frame_info,
            interleave_mode: parameters.interleave_mode,
            traits,
            reader: BitReader::new(source),
            quantization: quantization_table(
                frame_info.bits_per_sample,
                parameters.near_lossless,
                preset,
            ),
            contexts: vec![RegularModeContext::new(range); CONTEXT_COUNT],
            run_mode_contexts: [RunModeContext::new(0, range), RunModeContext::new(1, range)],
            run_index: 0,
            _sample: PhantomData,
        }
    }

    #[inline]
    fn quantize_gradient(&self, di: i32) -> i32 {
        self.quantization.quantize(di)
    }

    fn increment_run_index(&mut self) {
        self.run_index = (self.run_index + 1).min(31);
    }

    fn decrement_run_index(&mut self) {
        self.run_index = self.run_index.saturating_sub(1);
    }

    fn decode_lines(&mut self, sink: &mut dyn LineSink, rect: Rect) -> Result<(), JpeglsError> {
        let width = self.frame_info.width as usize;
        let height = self.frame_info.height as usize;
        let component_count = if self.interleave_mode == InterleaveMode::Line {
            self.frame_info.component_count as usize
        } else {
            1
        };
        let pixel_stride = width + 2;

        let mut line_buffer: Vec<T> = vec![T::default(); 2 * component_count * pixel_stride];
        let mut run_index = vec![0usize; component_count];
        let mut byte_line = vec![0u8; rect.width as usize * T::BYTES];

        for line in 0..height {
            let (top, bottom) = line_buffer.split_at_mut(component_count * pixel_stride);
            let (previous, current) = if line & 1 == 1 {
                (bottom, top)
            } else {
                (top, bottom)
            };

            for component in 0..component_count {
                let previous_line = &mut previous[component * pixel_stride..][..pixel_stride];
                let current_line = &mut current[component * pixel_stride..][..pixel_stride];

                // Guard samples for edge prediction.
                previous_line[width + 1] = previous_line[width];
                current_line[0] = previous_line[1];

                self.run_index = run_index[component];
                self.decode_sample_line(previous_line, current_line, width)?;
                run_index[component] = self.run_index;

                if rect_contains_line(&rect, line) {
                    let first = 1 + rect.x as usize;
                    T::write_bytes(
                        &current_line[first..first + rect.width as usize],
                        &mut byte_line,
                    );
                    sink.deliver_line(&byte_line)?;
                }
            }
        }
        Ok(())
    }

    fn decode_sample_line(
        &mut self,
        previous_line: &[T],
        current_line: &mut [T],
        width: usize,
    ) -> Result<(), JpeglsError> {
        let mut index = 1;
        let mut rb = previous_line[0].to_i32();
        let mut rd = previous_line[1].to_i32();

        while index <= width {
            let ra = current_line[index - 1].to_i32();
            let rc = rb;
            rb = rd;
            rd = previous_line[index + 1].to_i32();

            let qs = compute_context_id(
                self.quantize_gradient(rd - rb),
                self.quantize_gradient(rb - rc),
                self.quantize_gradient(rc - ra),
            );

            if qs != 0 {
                let x = self.decode_regular(qs, get_predicted_value(ra, rb, rc))?;
                current_line[index] = T::from_i32(x);
                index += 1;
            } else {
                index += self.decode_run_mode(index, previous_line, current_line, width)?;
                if index <= width {
                    rb = previous_line[index - 1].to_i32();
                    rd = previous_line[index].to_i32();
                }
            }
        }
        Ok(())
    }

    fn decode_regular(&mut self, qs: i32, predicted: i32) -> Result<i32, JpeglsError> {
        let sign = bit_wise_sign(qs);
        let context_index = apply_sign(qs, sign) as usize;

        let (k, c_value) = {
            let context = &self.contexts[context_index];
            (context.get_golomb_coding_parameter()?, context.c())
        };
        let predicted_value = self
            .traits
            .correct_prediction(predicted + apply_sign(c_value, sign));

        let mut error_value = self.reader.decode_error_value(
            k,
            self.traits.limit(),
            self.traits.quantized_bits_per_sample(),
        )?;
        if error_value.abs() > MAXIMUM_ERROR_MAGNITUDE {
            return Err(JpeglsError::InvalidCompressedData);
        }
        if k == 0 {
            error_value ^=
                self.contexts[context_index].get_error_correction(self.traits.near_lossless());
        }

        self.contexts[context_index].update_variables_and_bias(
            error_value,
            self.traits.near_lossless(),
            self.traits.reset_threshold(),
        )?;

        Ok(self
            .traits
            .compute_reconstructed_sample(predicted_value, apply_sign(error_value, sign)))
    }

    fn decode_run_mode(
        &mut self,
        index: usize,
        previous_line: &[T],
        current_line: &mut [T],
        width: usize,
    ) -> Result<usize, JpeglsError> {
        let samples_remaining = width - (index - 1);
        let ra = current_line[index - 1];

        let run_length = self.decode_run_length(samples_remaining)?;
        for position in current_line[index..index + run_length].iter_mut() {
            *position = ra;
        }
        if run_length == samples_remaining {
            return Ok(run_length);
        }

        let rb = previous_line[index + run_length];
        let x = self.decode_run_interruption_pixel(ra.to_i32(), rb.to_i32())?;
        current_line[index + run_length] = T::from_i32(x);
        self.decrement_run_index();
        Ok(run_length + 1)
    }

    /// Reads run-length codes until the run ends or fills the remaining
    /// samples of the line (ISO/IEC 14495-1, A.7.1.2).
    fn decode_run_length(&mut self, pixel_count: usize) -> Result<usize, JpeglsError> {
        let mut index = 0usize;
        while self.reader.read_bit()? {
            let count = std::cmp::min(1usize << J[self.run_index], pixel_count - index);
            index += count;
            if count == 1usize << J[self.run_index] {
                self.increment_run_index();
            }
            if index == pixel_count {
                break;
            }
        }

        if index != pixel_count {
            if J[self.run_index] > 0 {
                index += self.reader.read_value(J[self.run_index])? as usize;
            }
            if index > pixel_count {
                return Err(JpeglsError::InvalidCompressedData);
            }
        }
        Ok(index)
    }

    fn decode_run_interruption_pixel(&mut self, ra: i32, rb: i32) -> Result<i32, JpeglsError> {
        if (ra - rb).abs() <= self.traits.near_lossless() {
            let error_value = self.decode_run_interruption_error(1)?;
            Ok(self.traits.compute_reconstructed_sample(ra, error_value))
        } else {
            let error_value = self.decode_run_interruption_error(0)?;
            Ok(self
                .traits
                .compute_reconstructed_sample(rb, error_value * sign(rb - ra)))
        }
    }

    fn decode_run_interruption_error(&mut self, context_index: usize) -> Result<i32, JpeglsError> {
        let (k, run_interruption_type) = {
            let context = &self.run_mode_contexts[context_index];
            (
                context.get_golomb_coding_parameter()?,
                context.run_interruption_type(),
            )
        };

        let mapped_error_value = self.reader.decode_value(
            k,
            self.traits.limit() - J[self.run_index] - 1,
            self.traits.quantized_bits_per_sample(),
        )?;
        let error_value = self.run_mode_contexts[context_index]
            .compute_error_value(mapped_error_value + run_interruption_type, k);
        if error_value.abs() > MAXIMUM_ERROR_MAGNITUDE {
            return Err(JpeglsError::InvalidCompressedData);
        }

        self.run_mode_contexts[context_index].update_variables(
            error_value,
            mapped_error_value,
            self.traits.reset_threshold(),
        );
        Ok(error_value)
    }

    fn decode_triplet_lines(
        &mut self,
        sink: &mut dyn LineSink,
        rect: Rect,
    ) -> Result<(), JpeglsError> {
        let width = self.frame_info.width as usize;
        let height = self.frame_info.height as usize;
        let pixel_stride = width + 2;

        let mut line_buffer: Vec<Triplet<T>> = vec![Triplet::default(); 2 * pixel_stride];
        let mut byte_line = vec![0u8; rect.width as usize * 3 * T::BYTES];

        for line in 0..height {
            let (top, bottom) = line_buffer.split_at_mut(pixel_stride);
            let (previous_line, current_line) = if line & 1 == 1 {
                (bottom, top)
            } else {
                (top, bottom)
            };

            previous_line[width + 1] = previous_line[width];
            current_line[0] = previous_line[1];

            self.decode_triplet_line(previous_line, current_line, width)?;

            if rect_contains_line(&rect, line) {
                let first = 1 + rect.x as usize;
                Triplet::write_bytes(
                    &current_line[first..first + rect.width as usize],
                    &mut byte_line,
                );
                sink.deliver_line(&byte_line)?;
            }
        }
        Ok(())
    }

    fn decode_triplet_line(
        &mut self,
        previous_line: &[Triplet<T>],
        current_line: &mut [Triplet<T>],
        width: usize,
    ) -> Result<(), JpeglsError> {
        let mut index = 1;
        while index <= width {
            let ra = current_line[index - 1];
            let rc = previous_line[index - 1];
            let rb = previous_line[index];
            let rd = previous_line[index + 1];

            let qs1 = compute_context_id(
                self.quantize_gradient(rd.v1.to_i32() - rb.v1.to_i32()),
                self.quantize_gradient(rb.v1.to_i32() - rc.v1.to_i32()),
                self.quantize_gradient(rc.v1.to_i32() - ra.v1.to_i32()),
            );
            let qs2 = compute_context_id(
                self.quantize_gradient(rd.v2.to_i32() - rb.v2.to_i32()),
                self.quantize_gradient(rb.v2.to_i32() - rc.v2.to_i32()),
                self.quantize_gradient(rc.v2.to_i32() - ra.v2.to_i32()),
            );
            let qs3 = compute_context_id(
                self.quantize_gradient(rd.v3.to_i32() - rb.v3.to_i32()),
                self.quantize_gradient(rb.v3.to_i32() - rc.v3.to_i32()),
                self.quantize_gradient(rc.v3.to_i32() - ra.v3.to_i32()),
            );

            if qs1 == 0 && qs2 == 0 && qs3 == 0 {
                index += self.decode_triplet_run_mode(index, previous_line, current_line, width)?;
            } else {
                let rx = Triplet::new(
                    T::from_i32(self.decode_regular(
                        qs1,
                        get_predicted_value(ra.v1.to_i32(), rb.v1.to_i32(), rc.v1.to_i32()),
                    )?),
                    T::from_i32(self.decode_regular(
                        qs2,
                        get_predicted_value(ra.v2.to_i32(), rb.v2.to_i32(), rc.v2.to_i32()),
                    )?),
                    T::from_i32(self.decode_regular(
                        qs3,
                        get_predicted_value(ra.v3.to_i32(), rb.v3.to_i32(), rc.v3.to_i32()),
                    )?),
                );
                current_line[index] = rx;
                index += 1;
            }
        }
        Ok(())
    }

    fn decode_triplet_run_mode(
        &mut self,
        index: usize,
        previous_line: &[Triplet<T>],
        current_line: &mut [Triplet<T>],
        width: usize,
    ) -> Result<usize, JpeglsError> {
        let samples_remaining = width - (index - 1);
        let ra = current_line[index - 1];

        let run_length = self.decode_run_length(samples_remaining)?;
        for position in current_line[index..index + run_length].iter_mut() {
            *position = ra;
        }
        if run_length == samples_remaining {
            return Ok(run_length);
        }

        let rb = previous_line[index + run_length];
        let rx = self.decode_triplet_run_interruption_pixel(ra, rb)?;
        current_line[index + run_length] = rx;
        self.decrement_run_index();
        Ok(run_length + 1)
    }

    fn decode_triplet_run_interruption_pixel(
        &mut self,
        ra: Triplet<T>,
        rb: Triplet<T>,
    ) -> Result<Triplet<T>, JpeglsError> {
        let error_value1 = self.decode_run_interruption_error(0)?;
        let error_value2 = self.decode_run_interruption_error(0)?;
        let error_value3 = self.decode_run_interruption_error(0)?;

        Ok(Triplet::new(
            T::from_i32(self.traits.compute_reconstructed_sample(
                rb.v1.to_i32(),
                error_value1 * sign(rb.v1.to_i32() - ra.v1.to_i32()),
            )),
            T::from_i32(self.traits.compute_reconstructed_sample(
                rb.v2.to_i32(),
                error_value2 * sign(rb.v2.to_i32() - ra.v2.to_i32()),
            )),
            T::from_i32(self.traits.compute_reconstructed_sample(
                rb.v3.to_i32(),
                error_value3 * sign(rb.v3.to_i32() - ra.v3.to_i32()),
            )),
        ))
    }
}

fn rect_contains_line(rect: &Rect, line: usize) -> bool {
    let top = rect.y as usize;
    line >= top && line < top + rect.height as usize
}

impl<T: Sample, Traits: CodecTraits> DecodeStrategy for ScanDecoderImpl<'_, T, Traits> {
    fn decode_scan(&mut self, sink: &mut dyn LineSink, rect: Rect) -> Result<usize, JpeglsError> {
        if !rect.is_valid_for(&self.frame_info) {
            return Err(JpeglsError::InvalidArgument);
        }

        match self.interleave_mode {
            InterleaveMode::None | InterleaveMode::Line => self.decode_lines(sink, rect)?,
            InterleaveMode::Sample => self.decode_triplet_lines(sink, rect)?,
        }

        self.reader.end_scan()?;
        Ok(self.reader.position())
    }
}
