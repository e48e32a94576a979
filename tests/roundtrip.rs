// Encode/decode round trips across bit depths, component counts,
// interleave modes and pixel patterns.

use jpegls_rs::{
    FrameInfo, InterleaveMode, JpeglsDecoder, JpeglsEncoder, JpeglsError, Rect,
    coding_parameters::PresetCodingParameters,
};

/// Deterministic pixel generator, xorshift flavored.
struct Prng(u32);

impl Prng {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }
}

fn encode(
    frame_info: FrameInfo,
    interleave_mode: InterleaveMode,
    near_lossless: i32,
    pixels: &[u8],
) -> Vec<u8> {
    let mut encoder = JpeglsEncoder::new();
    encoder.set_frame_info(frame_info).unwrap();
    encoder.set_interleave_mode(interleave_mode).unwrap();
    encoder.set_near_lossless(near_lossless).unwrap();

    let mut destination = vec![0u8; encoder.estimated_destination_size().unwrap()];
    let bytes_written = encoder.encode(pixels, &mut destination).unwrap();
    destination.truncate(bytes_written);
    destination
}

fn decode(compressed: &[u8]) -> (FrameInfo, Vec<u8>) {
    let mut decoder = JpeglsDecoder::new(compressed);
    decoder.read_header().unwrap();
    let frame_info = decoder.frame_info().unwrap();
    let mut pixels = vec![0u8; decoder.destination_size().unwrap()];
    decoder.decode(&mut pixels).unwrap();
    (frame_info, pixels)
}

fn assert_roundtrip(
    frame_info: FrameInfo,
    interleave_mode: InterleaveMode,
    near_lossless: i32,
    pixels: &[u8],
) {
    let compressed = encode(frame_info, interleave_mode, near_lossless, pixels);
    let (decoded_info, decoded) = decode(&compressed);
    assert_eq!(decoded_info, frame_info);

    if near_lossless == 0 {
        assert_eq!(decoded, pixels, "lossless roundtrip must be exact");
        return;
    }

    if frame_info.bits_per_sample <= 8 {
        for (index, (&actual, &expected)) in decoded.iter().zip(pixels).enumerate() {
            let difference = (actual as i32 - expected as i32).abs();
            assert!(
                difference <= near_lossless,
                "sample {index}: |{actual} - {expected}| > {near_lossless}"
            );
        }
    } else {
        for (index, (actual, expected)) in decoded
            .chunks_exact(2)
            .zip(pixels.chunks_exact(2))
            .enumerate()
        {
            let actual = u16::from_ne_bytes([actual[0], actual[1]]) as i32;
            let expected = u16::from_ne_bytes([expected[0], expected[1]]) as i32;
            assert!(
                (actual - expected).abs() <= near_lossless,
                "sample {index}: |{actual} - {expected}| > {near_lossless}"
            );
        }
    }
}

fn gradient_pixels(frame_info: &FrameInfo) -> Vec<u8> {
    let maximum = (1u32 << frame_info.bits_per_sample) - 1;
    let mut pixels = Vec::new();
    for y in 0..frame_info.height {
        for x in 0..frame_info.width {
            for component in 0..frame_info.component_count as u32 {
                let value = (x + y + component * 37) % (maximum + 1);
                push_sample(&mut pixels, value, frame_info.bits_per_sample);
            }
        }
    }
    pixels
}

fn noise_pixels(frame_info: &FrameInfo, seed: u32) -> Vec<u8> {
    let maximum = (1u32 << frame_info.bits_per_sample) - 1;
    let mut prng = Prng(seed);
    let count = frame_info.width as usize
        * frame_info.height as usize
        * frame_info.component_count as usize;
    let mut pixels = Vec::new();
    for _ in 0..count {
        push_sample(&mut pixels, prng.next() & maximum, frame_info.bits_per_sample);
    }
    pixels
}

fn checker_pixels(frame_info: &FrameInfo) -> Vec<u8> {
    let maximum = (1u32 << frame_info.bits_per_sample) - 1;
    let mut pixels = Vec::new();
    for y in 0..frame_info.height {
        for x in 0..frame_info.width {
            for _ in 0..frame_info.component_count {
                let value = if (x + y) % 2 == 0 { 0 } else { maximum };
                push_sample(&mut pixels, value, frame_info.bits_per_sample);
            }
        }
    }
    pixels
}

fn solid_pixels(frame_info: &FrameInfo, value: u32) -> Vec<u8> {
    let count = frame_info.width as usize
        * frame_info.height as usize
        * frame_info.component_count as usize;
    let mut pixels = Vec::new();
    for _ in 0..count {
        push_sample(&mut pixels, value, frame_info.bits_per_sample);
    }
    pixels
}

fn push_sample(pixels: &mut Vec<u8>, value: u32, bits_per_sample: i32) {
    if bits_per_sample <= 8 {
        pixels.push(value as u8);
    } else {
        pixels.extend_from_slice(&(value as u16).to_ne_bytes());
    }
}

fn mono(width: u32, height: u32, bits_per_sample: i32) -> FrameInfo {
    FrameInfo {
        width,
        height,
        bits_per_sample,
        component_count: 1,
    }
}

fn color(width: u32, height: u32, bits_per_sample: i32) -> FrameInfo {
    FrameInfo {
        width,
        height,
        bits_per_sample,
        component_count: 3,
    }
}

#[test]
fn lossless_8_bit_gradient() {
    let frame_info = mono(32, 24, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &gradient_pixels(&frame_info));
}

#[test]
fn lossless_8_bit_noise() {
    let frame_info = mono(31, 17, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &noise_pixels(&frame_info, 0x1234_5678));
}

#[test]
fn lossless_8_bit_checker() {
    let frame_info = mono(16, 16, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &checker_pixels(&frame_info));
}

#[test]
fn lossless_8_bit_solid() {
    let frame_info = mono(64, 64, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &solid_pixels(&frame_info, 127));
}

#[test]
fn lossless_2_bit_gradient() {
    let frame_info = mono(19, 7, 2);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &gradient_pixels(&frame_info));
}

#[test]
fn lossless_12_bit_noise() {
    let frame_info = mono(23, 11, 12);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &noise_pixels(&frame_info, 42));
}

#[test]
fn lossless_16_bit_gradient() {
    let frame_info = mono(16, 16, 16);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &gradient_pixels(&frame_info));
}

#[test]
fn lossless_16_bit_noise() {
    let frame_info = mono(8, 8, 16);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &noise_pixels(&frame_info, 7));
}

#[test]
fn lossless_color_plane_interleaved() {
    let frame_info = color(16, 8, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &planar_gradient_pixels(&frame_info));
}

#[test]
fn lossless_color_line_interleaved() {
    let frame_info = color(16, 8, 8);
    assert_roundtrip(frame_info, InterleaveMode::Line, 0, &gradient_pixels(&frame_info));
}

#[test]
fn lossless_color_sample_interleaved() {
    let frame_info = color(16, 8, 8);
    assert_roundtrip(frame_info, InterleaveMode::Sample, 0, &gradient_pixels(&frame_info));
}

#[test]
fn lossless_color_sample_interleaved_16_bit() {
    let frame_info = color(9, 5, 16);
    assert_roundtrip(frame_info, InterleaveMode::Sample, 0, &noise_pixels(&frame_info, 99));
}

#[test]
fn lossless_color_line_interleaved_noise() {
    let frame_info = color(13, 9, 8);
    assert_roundtrip(frame_info, InterleaveMode::Line, 0, &noise_pixels(&frame_info, 1));
}

#[test]
fn near_lossless_8_bit_gradient() {
    let frame_info = mono(32, 24, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 3, &gradient_pixels(&frame_info));
}

#[test]
fn near_lossless_8_bit_noise() {
    let frame_info = mono(16, 16, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 2, &noise_pixels(&frame_info, 0xBEEF));
}

#[test]
fn near_lossless_color_sample_interleaved() {
    let frame_info = color(12, 12, 8);
    assert_roundtrip(frame_info, InterleaveMode::Sample, 3, &gradient_pixels(&frame_info));
}

#[test]
fn near_lossless_16_bit() {
    let frame_info = mono(16, 8, 16);
    assert_roundtrip(frame_info, InterleaveMode::None, 7, &noise_pixels(&frame_info, 3));
}

#[test]
fn near_lossless_maximum_tolerance() {
    // near = (maxval - 1) / 2, the largest tolerance the standard allows.
    let frame_info = mono(8, 8, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 127, &noise_pixels(&frame_info, 11));
}

#[test]
fn single_pixel_image() {
    let frame_info = mono(1, 1, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &[123]);
}

#[test]
fn single_line_image() {
    let frame_info = mono(64, 1, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &gradient_pixels(&frame_info));
}

#[test]
fn single_column_image() {
    let frame_info = mono(1, 64, 8);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &gradient_pixels(&frame_info));
}

#[test]
fn minimum_bit_depth_solid() {
    let frame_info = mono(5, 5, 2);
    assert_roundtrip(frame_info, InterleaveMode::None, 0, &solid_pixels(&frame_info, 3));
}

#[test]
fn custom_preset_coding_parameters() {
    let frame_info = mono(16, 16, 8);
    let pixels = gradient_pixels(&frame_info);

    let mut encoder = JpeglsEncoder::new();
    encoder.set_frame_info(frame_info).unwrap();
    encoder
        .set_preset_coding_parameters(PresetCodingParameters {
            maximum_sample_value: 255,
            threshold1: 7,
            threshold2: 11,
            threshold3: 23,
            reset_value: 31,
        })
        .unwrap();

    let mut destination = vec![0u8; encoder.estimated_destination_size().unwrap()];
    let bytes_written = encoder.encode(&pixels, &mut destination).unwrap();
    destination.truncate(bytes_written);

    let (_, decoded) = decode(&destination);
    assert_eq!(decoded, pixels);
}

#[test]
fn decode_rect_region() {
    let frame_info = mono(32, 32, 8);
    let pixels = gradient_pixels(&frame_info);
    let compressed = encode(frame_info, InterleaveMode::None, 0, &pixels);

    let rect = Rect::new(8, 4, 16, 20);
    let mut decoder = JpeglsDecoder::new(&compressed);
    decoder.read_header().unwrap();
    let mut region = vec![0u8; decoder.destination_size_for_rect(rect).unwrap()];
    decoder.decode_rect(&mut region, rect).unwrap();

    for y in 0..rect.height as usize {
        for x in 0..rect.width as usize {
            let full_index = (y + rect.y as usize) * 32 + x + rect.x as usize;
            assert_eq!(region[y * rect.width as usize + x], pixels[full_index]);
        }
    }
}

#[test]
fn encoder_is_deterministic() {
    let frame_info = mono(24, 24, 8);
    let pixels = noise_pixels(&frame_info, 0xABCD);
    let first = encode(frame_info, InterleaveMode::None, 0, &pixels);
    let second = encode(frame_info, InterleaveMode::None, 0, &pixels);
    assert_eq!(first, second);
}

#[test]
fn destination_too_small_fails() {
    let frame_info = mono(16, 16, 8);
    let pixels = noise_pixels(&frame_info, 5);

    let mut encoder = JpeglsEncoder::new();
    encoder.set_frame_info(frame_info).unwrap();
    let mut destination = vec![0u8; 8];
    assert_eq!(
        encoder.encode(&pixels, &mut destination),
        Err(JpeglsError::CompressedBufferTooSmall)
    );
}

#[test]
fn source_too_small_fails() {
    let frame_info = mono(16, 16, 8);

    let mut encoder = JpeglsEncoder::new();
    encoder.set_frame_info(frame_info).unwrap();
    let mut destination = vec![0u8; 1024];
    assert_eq!(
        encoder.encode(&[0u8; 100], &mut destination),
        Err(JpeglsError::UncompressedBufferTooSmall)
    );
}

#[test]
fn invalid_frame_info_is_rejected() {
    let mut encoder = JpeglsEncoder::new();
    assert_eq!(
        encoder.set_frame_info(mono(0, 16, 8)),
        Err(JpeglsError::InvalidArgumentWidth)
    );
    assert_eq!(
        encoder.set_frame_info(mono(16, 0, 8)),
        Err(JpeglsError::InvalidArgumentHeight)
    );
    assert_eq!(
        encoder.set_frame_info(mono(16, 16, 17)),
        Err(JpeglsError::InvalidArgumentBitsPerSample)
    );
    assert_eq!(
        encoder.set_frame_info(mono(16, 16, 1)),
        Err(JpeglsError::InvalidArgumentBitsPerSample)
    );
}

#[test]
fn sample_interleave_requires_three_components() {
    let mut encoder = JpeglsEncoder::new();
    encoder
        .set_frame_info(FrameInfo {
            width: 8,
            height: 8,
            bits_per_sample: 8,
            component_count: 4,
        })
        .unwrap();
    encoder.set_interleave_mode(InterleaveMode::Sample).unwrap();

    let pixels = vec![0u8; 8 * 8 * 4];
    let mut destination = vec![0u8; 4096];
    assert_eq!(
        encoder.encode(&pixels, &mut destination),
        Err(JpeglsError::InvalidArgumentInterleaveMode)
    );
}

/// Planar layout for InterleaveMode::None color images.
fn planar_gradient_pixels(frame_info: &FrameInfo) -> Vec<u8> {
    let maximum = (1u32 << frame_info.bits_per_sample) - 1;
    let mut pixels = Vec::new();
    for component in 0..frame_info.component_count as u32 {
        for y in 0..frame_info.height {
            for x in 0..frame_info.width {
                let value = (x + y + component * 37) % (maximum + 1);
                push_sample(&mut pixels, value, frame_info.bits_per_sample);
            }
        }
    }
    pixels
}
