// Statistical model invariants: context update recurrences, Golomb
// parameter behavior, gradient quantization and the short-code table.

use jpegls_rs::bit_reader::BitReader;
use jpegls_rs::coding_parameters::compute_default;
use jpegls_rs::golomb_lut::GOLOMB_LUT;
use jpegls_rs::quantization::{QuantizationTable, quantize_gradient};
use jpegls_rs::regular_mode_context::RegularModeContext;
use jpegls_rs::run_mode_context::RunModeContext;
use jpegls_rs::traits::{
    CodecTraits, DefaultTraits, LosslessTraits, map_error_value, unmap_error_value,
};

struct Prng(u32);

impl Prng {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }
}

#[test]
fn context_count_never_reaches_zero() {
    let mut context = RegularModeContext::new(256);
    let mut prng = Prng(1);
    for _ in 0..10_000 {
        assert_ne!(context.n(), 0);
        let error_value = (prng.next() % 21) as i32 - 10;
        context.update_variables_and_bias(error_value, 0, 64).unwrap();
        assert_ne!(context.n(), 0);
    }
}

#[test]
fn context_bias_stays_bounded() {
    // After every update the rebias clamps guarantee -N < B <= 0.
    let mut context = RegularModeContext::new(256);
    let mut prng = Prng(0xC0FFEE);
    for _ in 0..10_000 {
        let error_value = (prng.next() % 501) as i32 - 250;
        context.update_variables_and_bias(error_value, 0, 64).unwrap();
        assert!(context.b() > -context.n() && context.b() <= 0);
    }
}

#[test]
fn context_bias_stays_bounded_near_lossless() {
    let mut context = RegularModeContext::new(52);
    let mut prng = Prng(7);
    for _ in 0..10_000 {
        let error_value = (prng.next() % 11) as i32 - 5;
        context.update_variables_and_bias(error_value, 2, 31).unwrap();
        assert!(context.b() > -context.n() && context.b() <= 0);
    }
}

#[test]
fn golomb_parameter_grows_with_accumulated_error() {
    // Larger ranges initialize A higher; with N fixed at 1 the parameter
    // is non-decreasing in A.
    let mut previous_k = 0;
    for range in (64..=65536).step_by(64) {
        let context = RegularModeContext::new(range);
        let k = context.get_golomb_coding_parameter().unwrap();
        assert!(k >= previous_k, "k dropped from {previous_k} to {k} at range {range}");
        previous_k = k;
    }
}

#[test]
fn golomb_parameter_shrinks_as_count_grows() {
    // Zero-error updates leave A unchanged while N increments; the
    // parameter must never grow.
    let mut context = RegularModeContext::new(65536);
    let mut previous_k = context.get_golomb_coding_parameter().unwrap();
    for _ in 0..200 {
        context.update_variables_and_bias(0, 0, 256).unwrap();
        let k = context.get_golomb_coding_parameter().unwrap();
        assert!(k <= previous_k);
        previous_k = k;
    }
}

#[test]
fn run_mode_context_counts_negative_errors() {
    let mut context = RunModeContext::new(0, 256);
    context.update_variables(-1, 1, 64);
    context.update_variables(-2, 3, 64);
    context.update_variables(3, 6, 64);
    assert_eq!(context.nn(), 2);
    assert_eq!(context.n(), 4);
}

#[test]
fn run_mode_error_mapping_roundtrips() {
    // The encoder-side map predicate and the decoder-side recovery must
    // agree for both interruption types across context states.
    for run_interruption_type in 0..=1 {
        let mut context = RunModeContext::new(run_interruption_type, 256);
        let mut prng = Prng(0x5EED);
        for _ in 0..2_000 {
            let error_value = (prng.next() % 41) as i32 - 20;
            let k = context.get_golomb_coding_parameter().unwrap();
            let map = context.compute_map(error_value, k);
            let mapped = 2 * error_value.abs() - run_interruption_type - i32::from(map);
            if mapped < 0 {
                // Illegal combination for this state, the encoder never
                // produces it.
                continue;
            }
            assert_eq!(
                context.compute_error_value(mapped + run_interruption_type, k),
                error_value
            );
            context.update_variables(error_value, mapped, 64);
        }
    }
}

#[test]
fn quantization_is_symmetric() {
    for bits_per_sample in [2, 8, 10, 12, 16] {
        let maximum_sample_value = (1 << bits_per_sample) - 1;
        for near_lossless in [0, 2] {
            if near_lossless > maximum_sample_value / 2 {
                continue;
            }
            let preset = compute_default(maximum_sample_value, near_lossless);
            for di in -maximum_sample_value..=maximum_sample_value {
                let positive = quantize_gradient(
                    di,
                    near_lossless,
                    preset.threshold1,
                    preset.threshold2,
                    preset.threshold3,
                );
                let negative = quantize_gradient(
                    -di,
                    near_lossless,
                    preset.threshold1,
                    preset.threshold2,
                    preset.threshold3,
                );
                assert_eq!(positive, -negative, "asymmetric at d = {di}");
            }
        }
    }
}

#[test]
fn quantization_table_matches_direct_computation() {
    for bits_per_sample in [2, 8, 12] {
        let maximum_sample_value = (1 << bits_per_sample) - 1;
        let preset = compute_default(maximum_sample_value, 0);
        let table = QuantizationTable::new(
            bits_per_sample,
            0,
            preset.threshold1,
            preset.threshold2,
            preset.threshold3,
        );
        for di in -maximum_sample_value..=maximum_sample_value {
            assert_eq!(
                table.quantize(di),
                quantize_gradient(
                    di,
                    0,
                    preset.threshold1,
                    preset.threshold2,
                    preset.threshold3
                )
            );
        }
    }
}

#[test]
fn error_value_mapping_roundtrips() {
    for error_value in -70_000..=70_000 {
        let mapped = map_error_value(error_value);
        assert!(mapped >= 0);
        assert_eq!(unmap_error_value(mapped), error_value);
    }
}

#[test]
fn golomb_table_agrees_with_generic_decoder() {
    // Every short-code entry must decode to the same value and consume the
    // same number of bits as the generic path.
    for k in 0..16 {
        for byte in 0..256usize {
            let entry = GOLOMB_LUT[k][byte];
            if entry.bit_count == 0 {
                continue;
            }

            let source = [byte as u8, 0, 0];
            let mut reader = BitReader::new(&source);
            // A limit high enough that no 8-bit code is an escape.
            let mapped = reader.decode_value(k as i32, 64, 16).unwrap();
            assert_eq!(
                unmap_error_value(mapped),
                entry.error_value as i32,
                "value mismatch at k = {k}, byte = {byte:#04x}"
            );

            // The bits left over must be exactly the low bits of the
            // probe byte followed by the two zero bytes.
            let remaining_bits = 24 - entry.bit_count as i32;
            let expected_tail =
                ((byte as u32) & ((1 << (8 - entry.bit_count)) - 1)) << 16;
            assert_eq!(
                reader.read_value(remaining_bits).unwrap() as u32,
                expected_tail,
                "length mismatch at k = {k}, byte = {byte:#04x}"
            );
        }
    }
}

#[test]
fn lossless_traits_match_default_traits() {
    // The lossless shortcut is a performance specialization; its
    // arithmetic must be indistinguishable from the general path.
    let lossless = LosslessTraits::<8>;
    let general = DefaultTraits::new(255, 0, 64);

    assert_eq!(lossless.range(), general.range());
    assert_eq!(lossless.limit(), general.limit());
    assert_eq!(
        lossless.quantized_bits_per_sample(),
        general.quantized_bits_per_sample()
    );

    for error_value in -255..=255 {
        assert_eq!(
            lossless.compute_error_value(error_value),
            general.compute_error_value(error_value),
            "error value mismatch at {error_value}"
        );
    }

    for predicted in -40..=300 {
        assert_eq!(
            lossless.correct_prediction(predicted),
            general.correct_prediction(predicted)
        );
    }

    for predicted in 0..=255 {
        for error_value in [-128, -3, -1, 0, 1, 3, 127] {
            let corrected = general.modulo_range(error_value);
            assert_eq!(
                lossless.compute_reconstructed_sample(predicted, corrected),
                general.compute_reconstructed_sample(predicted, corrected)
            );
        }
    }
}

#[test]
fn default_traits_derived_values() {
    let traits = DefaultTraits::new(255, 0, 64);
    assert_eq!(traits.range(), 256);
    assert_eq!(traits.bits_per_sample(), 8);
    assert_eq!(traits.quantized_bits_per_sample(), 8);
    assert_eq!(traits.limit(), 32);

    let near = DefaultTraits::new(255, 3, 64);
    assert_eq!(near.range(), (255 + 6) / 7 + 1);

    let deep = DefaultTraits::new(65535, 0, 64);
    assert_eq!(deep.bits_per_sample(), 16);
    assert_eq!(deep.limit(), 64);
}

#[test]
fn near_lossless_quantization_reconstruction() {
    let traits = DefaultTraits::new(255, 3, 64);
    for original in 0..=255 {
        for predicted in 0..=255 {
            let error_value = traits.compute_error_value(original - predicted);
            let reconstructed = traits.compute_reconstructed_sample(predicted, error_value);
            assert!(
                (reconstructed - original).abs() <= 3,
                "|{reconstructed} - {original}| > 3 (predicted {predicted})"
            );
        }
    }
}
