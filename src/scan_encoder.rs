//! Scan encoder: drives the predictive model over the scanlines of one
//! scan and emits the entropy-coded segment.
//!
//! Every sample is coded against its causal neighbors Ra (left), Rb
//! (above), Rc (above-left) and Rd (above-right). Flat neighborhoods (all
//! three quantized gradients zero) switch to run mode; everything else is
//! coded in regular mode through the median-edge predictor and one of 365
//! adaptive contexts. The numeric policy (near-lossless arithmetic or the
//! lossless shortcut) and the sample type are bound once per scan by
//! [`make_scan_encoder`].

use std::borrow::Cow;
use std::marker::PhantomData;

use crate::FrameInfo;
use crate::InterleaveMode;
use crate::bit_writer::BitWriter;
use crate::coding_parameters::{CodingParameters, PresetCodingParameters};
use crate::constants::{CONTEXT_COUNT, DEFAULT_RESET_THRESHOLD, J, RUN_MODE_CONTEXT_COUNT};
use crate::error::JpeglsError;
use crate::process_line::LineSource;
use crate::quantization::{QuantizationTable, quantization_table};
use crate::regular_mode_context::RegularModeContext;
use crate::run_mode_context::RunModeContext;
use crate::traits::{
    CodecTraits, DefaultTraits, LosslessTraits, Sample, Triplet, apply_sign, bit_wise_sign,
    compute_context_id, get_predicted_value, map_error_value, sign,
};

pub trait EncodeStrategy {
    /// Encodes one scan, pulling uncompressed lines from `source`. Returns
    /// the number of bytes written to the destination.
    fn encode_scan(&mut self, source: &mut dyn LineSource) -> Result<usize, JpeglsError>;
}

/// Binds the sample type and numeric policy for one scan and returns the
/// encoder strategy.
pub fn make_scan_encoder<'a>(
    frame_info: &FrameInfo,
    preset: &PresetCodingParameters,
    parameters: &CodingParameters,
    destination: &'a mut [u8],
) -> Result<Box<dyn EncodeStrategy + 'a>, JpeglsError> {
    if parameters.interleave_mode == InterleaveMode::Sample && frame_info.component_count != 3 {
        return Err(JpeglsError::ParameterValueNotSupported);
    }

    let near_lossless = parameters.near_lossless;
    let maximum_sample_value = preset.maximum_sample_value;

    macro_rules! build {
        ($sample:ty, $traits:expr) => {
            Ok(Box::new(ScanEncoderImpl::<$sample, _>::new(
                frame_info,
                preset,
                parameters,
                $traits,
                destination,
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

struct ScanEncoderImpl<'a, T: Sample, Traits: CodecTraits> {
    frame_info: FrameInfo,
    interleave_mode: InterleaveMode,
    traits: Traits,
    writer: BitWriter<'a>,
    quantization: Cow<'static, QuantizationTable>,
    contexts: Vec<RegularModeContext>,
    run_mode_contexts: [RunModeContext; RUN_MODE_CONTEXT_COUNT],
    run_index: usize,
    _sample: PhantomData<T>,
}

impl<'a, T: Sample, Traits: CodecTraits> ScanEncoderImpl<'a, T, Traits> {
    fn new(
        frame_info: &FrameInfo,
        preset: &PresetCodingParameters,
        parameters: &CodingParameters,
        traits: Traits,
        destination: &'a mut [u8],
    ) -> Self {
        let range = traits.range();
        Self {
            frame_info: *frame_info,
            interleave_mode: parameters.interleave_mode,
            traits,
            writer: BitWriter::new(destination),
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

    fn encode_lines(&mut self, source: &mut dyn LineSource) -> Result<(), JpeglsError> {
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
        let mut byte_line = vec![0u8; width * T::BYTES];

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

                source.request_line(&mut byte_line)?;
                T::read_bytes(&byte_line, &mut current_line[1..=width]);

                // Guard samples for edge prediction.
                previous_line[width + 1] = previous_line[width];
                current_line[0] = previous_line[1];

                self.run_index = run_index[component];
                self.encode_sample_line(previous_line, current_line, width)?;
                run_index[component] = self.run_index;
            }
        }
        Ok(())
    }

    fn encode_sample_line(
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
                let x = self.encode_regular(
                    qs,
                    current_line[index].to_i32(),
                    get_predicted_value(ra, rb, rc),
                )?;
                current_line[index] = T::from_i32(x);
                index += 1;
            } else {
                index += self.encode_run_mode(index, previous_line, current_line, width)?;
                if index <= width {
                    rb = previous_line[index - 1].to_i32();
                    rd = previous_line[index].to_i32();
                }
            }
        }
        Ok(())
    }

    fn encode_regular(&mut self, qs: i32, x: i32, predicted: i32) -> Result<i32, JpeglsError> {
        let sign = bit_wise_sign(qs);
        let context_index = apply_sign(qs, sign) as usize;

        let (k, correction, c_value) = {
            let context = &self.contexts[context_index];
            let k = context.get_golomb_coding_parameter()?;
            (
                k,
                context.get_error_correction(k | self.traits.near_lossless()),
                context.c(),
            )
        };

        let predicted_value = self
            .traits
            .correct_prediction(predicted + apply_sign(c_value, sign));
        let error_value = self
            .traits
            .compute_error_value(apply_sign(x - predicted_value, sign));

        self.writer.encode_mapped_value(
            k,
            map_error_value(correction ^ error_value),
            self.traits.limit(),
            self.traits.quantized_bits_per_sample(),
        )?;
        self.contexts[context_index].update_variables_and_bias(
            error_value,
            self.traits.near_lossless(),
            self.traits.reset_threshold(),
        )?;

        Ok(self
            .traits
            .compute_reconstructed_sample(predicted_value, apply_sign(error_value, sign)))
    }

    fn encode_run_mode(
        &mut self,
        index: usize,
        previous_line: &[T],
        current_line: &mut [T],
        width: usize,
    ) -> Result<usize, JpeglsError> {
        let samples_remaining = width - (index - 1);
        let ra = current_line[index - 1];

        let mut run_length = 0;
        while self
            .traits
            .is_near(current_line[index + run_length].to_i32(), ra.to_i32())
        {
            current_line[index + run_length] = ra;
            run_length += 1;
            if run_length == samples_remaining {
                break;
            }
        }

        self.encode_run_pixels(run_length as i32, run_length == samples_remaining)?;
        if run_length == samples_remaining {
            return Ok(run_length);
        }

        let x = self.encode_run_interruption_pixel(
            current_line[index + run_length].to_i32(),
            ra.to_i32(),
            previous_line[index + run_length].to_i32(),
        )?;
        current_line[index + run_length] = T::from_i32(x);
        self.decrement_run_index();
        Ok(run_length + 1)
    }

    fn encode_run_pixels(
        &mut self,
        mut run_length: i32,
        end_of_line: bool,
    ) -> Result<(), JpeglsError> {
        while run_length >= 1 << J[self.run_index] {
            self.writer.append_ones_to_bit_stream(1)?;
            run_length -= 1 << J[self.run_index];
            self.increment_run_index();
        }

        if end_of_line {
            // A run to the end of the line carries no length remainder; the
            // 1 bit is only emitted for a non-empty residual run.
            if run_length != 0 {
                self.writer.append_ones_to_bit_stream(1)?;
            }
        } else {
            self.writer
                .append_to_bit_stream(run_length as u32, J[self.run_index] + 1)?;
        }
        Ok(())
    }

    fn encode_run_interruption_pixel(
        &mut self,
        x: i32,
        ra: i32,
        rb: i32,
    ) -> Result<i32, JpeglsError> {
        if (ra - rb).abs() <= self.traits.near_lossless() {
            let error_value = self.traits.compute_error_value(x - ra);
            self.encode_run_interruption_error(1, error_value)?;
            Ok(self.traits.compute_reconstructed_sample(ra, error_value))
        } else {
            let error_value = self.traits.compute_error_value((x - rb) * sign(rb - ra));
            self.encode_run_interruption_error(0, error_value)?;
            Ok(self
                .traits
                .compute_reconstructed_sample(rb, error_value * sign(rb - ra)))
        }
    }

    fn encode_run_interruption_error(
        &mut self,
        context_index: usize,
        error_value: i32,
    ) -> Result<(), JpeglsError> {
        let (k, mapped_error_value) = {
            let context = &self.run_mode_contexts[context_index];
            let k = context.get_golomb_coding_parameter()?;
            let map = context.compute_map(error_value, k);
            let mapped = 2 * error_value.abs() - context.run_interruption_type() - i32::from(map);
            debug_assert_eq!(
                error_value,
                context.compute_error_value(mapped + context.run_interruption_type(), k)
            );
            (k, mapped)
        };

        self.writer.encode_mapped_value(
            k,
            mapped_error_value,
            self.traits.limit() - J[self.run_index] - 1,
            self.traits.quantized_bits_per_sample(),
        )?;
        self.run_mode_contexts[context_index].update_variables(
            error_value,
            mapped_error_value,
            self.traits.reset_threshold(),
        );
        Ok(())
    }

    // Sample-interleaved scans code whole pixels: the three channels share
    // run-mode detection but keep independent gradients and contexts.

    fn encode_triplet_lines(&mut self, source: &mut dyn LineSource) -> Result<(), JpeglsError> {
        let width = self.frame_info.width as usize;
        let height = self.frame_info.height as usize;
        let pixel_stride = width + 2;

        let mut line_buffer: Vec<Triplet<T>> = vec![Triplet::default(); 2 * pixel_stride];
        let mut byte_line = vec![0u8; width * 3 * T::BYTES];

        for line in 0..height {
            let (top, bottom) = line_buffer.split_at_mut(pixel_stride);
            let (previous_line, current_line) = if line & 1 == 1 {
                (bottom, top)
            } else {
                (top, bottom)
            };

            source.request_line(&mut byte_line)?;
            Triplet::read_bytes(&byte_line, &mut current_line[1..=width]);

            previous_line[width + 1] = previous_line[width];
            current_line[0] = previous_line[1];

            self.encode_triplet_line(previous_line, current_line, width)?;
        }
        Ok(())
    }

    fn encode_triplet_line(
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
                index += self.encode_triplet_run_mode(index, previous_line, current_line, width)?;
            } else {
                let x = current_line[index];
                let rx = Triplet::new(
                    T::from_i32(self.encode_regular(
                        qs1,
                        x.v1.to_i32(),
                        get_predicted_value(ra.v1.to_i32(), rb.v1.to_i32(), rc.v1.to_i32()),
                    )?),
                    T::from_i32(self.encode_regular(
                        qs2,
                        x.v2.to_i32(),
                        get_predicted_value(ra.v2.to_i32(), rb.v2.to_i32(), rc.v2.to_i32()),
                    )?),
                    T::from_i32(self.encode_regular(
                        qs3,
                        x.v3.to_i32(),
                        get_predicted_value(ra.v3.to_i32(), rb.v3.to_i32(), rc.v3.to_i32()),
                    )?),
                );
                current_line[index] = rx;
                index += 1;
            }
        }
        Ok(())
    }

    fn encode_triplet_run_mode(
        &mut self,
        index: usize,
        previous_line: &[Triplet<T>],
        current_line: &mut [Triplet<T>],
        width: usize,
    ) -> Result<usize, JpeglsError> {
        let samples_remaining = width - (index - 1);
        let ra = current_line[index - 1];

        let mut run_length = 0;
        while self
            .traits
            .is_near_triplet(current_line[index + run_length], ra)
        {
            current_line[index + run_length] = ra;
            run_length += 1;
            if run_length == samples_remaining {
                break;
            }
        }

        self.encode_run_pixels(run_length as i32, run_length == samples_remaining)?;
        if run_length == samples_remaining {
            return Ok(run_length);
        }

        let rb = previous_line[index + run_length];
        let x = current_line[index + run_length];
        let rx = self.encode_triplet_run_interruption_pixel(x, ra, rb)?;
        current_line[index + run_length] = rx;
        self.decrement_run_index();
        Ok(run_length + 1)
    }

    fn encode_triplet_run_interruption_pixel(
        &mut self,
        x: Triplet<T>,
        ra: Triplet<T>,
        rb: Triplet<T>,
    ) -> Result<Triplet<T>, JpeglsError> {
        let sign1 = sign(rb.v1.to_i32() - ra.v1.to_i32());
        let error_value1 = self
            .traits
            .compute_error_value(sign1 * (x.v1.to_i32() - rb.v1.to_i32()));
        self.encode_run_interruption_error(0, error_value1)?;

        let sign2 = sign(rb.v2.to_i32() - ra.v2.to_i32());
        let error_value2 = self
            .traits
            .compute_error_value(sign2 * (x.v2.to_i32() - rb.v2.to_i32()));
        self.encode_run_interruption_error(0, error_value2)?;

        let sign3 = sign(rb.v3.to_i32() - ra.v3.to_i32());
        let error_value3 = self
            .traits
            .compute_error_value(sign3 * (x.v3.to_i32() - rb.v3.to_i32()));
        self.encode_run_interruption_error(0, error_value3)?;

        Ok(Triplet::new(
            T::from_i32(
                self.traits
                    .compute_reconstructed_sample(rb.v1.to_i32(), error_value1 * sign1),
            ),
            T::from_i32(
                self.traits
                    .compute_reconstructed_sample(rb.v2.to_i32(), error_value2 * sign2),
            ),
            T::from_i32(
                self.traits
                    .compute_reconstructed_sample(rb.v3.to_i32(), error_value3 * sign3),
            ),
        ))
    }
}

impl<T: Sample, Traits: CodecTraits> EncodeStrategy for ScanEncoderImpl<'_, T, Traits> {
    fn encode_scan(&mut self, source: &mut dyn LineSource) -> Result<usize, JpeglsError> {
        match self.interleave_mode {
            InterleaveMode::None | InterleaveMode::Line => self.encode_lines(source)?,
            InterleaveMode::Sample => self.encode_triplet_lines(source)?,
        }
        self.writer.end_scan()
    }
}
