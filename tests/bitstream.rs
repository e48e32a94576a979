// Bit-level stream behavior: stuffing after 0xFF bytes, known-answer
// codestreams and malformed-input error paths.

use jpegls_rs::bit_reader::BitReader;
use jpegls_rs::bit_writer::BitWriter;
use jpegls_rs::{FrameInfo, JpeglsDecoder, JpeglsEncoder, JpeglsError};

#[test]
fn bit_stuffing_roundtrip() {
    // Force a literal 0xFF into the stream and verify the stuffed 0 bit
    // never surfaces in the decoded values.
    let mut destination = vec![0u8; 64];
    let mut writer = BitWriter::new(&mut destination);
    writer.append_to_bit_stream(0, 24).unwrap();
    writer.append_to_bit_stream(0xFF, 8).unwrap();
    writer.append_to_bit_stream(0xFFFF, 16).unwrap();
    writer.append_to_bit_stream(0xFFFF, 16).unwrap();
    writer.append_to_bit_stream(0x1234_5678, 31).unwrap();
    let bytes_written = writer.end_scan().unwrap();

    let mut reader = BitReader::new(&destination[..bytes_written]);
    assert_eq!(reader.read_value(24).unwrap(), 0);
    assert_eq!(reader.read_value(8).unwrap(), 0xFF);
    assert_eq!(reader.read_value(16).unwrap(), 0xFFFF);
    assert_eq!(reader.read_value(16).unwrap(), 0xFFFF);
    assert_eq!(reader.read_value(31).unwrap(), 0x1234_5678);
    reader.end_scan().unwrap();
}

#[test]
fn stuffed_byte_follows_every_ff() {
    // Any byte following a written 0xFF must have its high bit clear.
    let mut destination = vec![0u8; 64];
    let mut writer = BitWriter::new(&mut destination);
    for _ in 0..8 {
        writer.append_to_bit_stream(0xFF, 8).unwrap();
    }
    let bytes_written = writer.end_scan().unwrap();

    let mut previous_was_ff = false;
    for &byte in &destination[..bytes_written] {
        if previous_was_ff {
            assert_eq!(byte & 0x80, 0, "stuffed bit missing after 0xFF");
        }
        previous_was_ff = byte == 0xFF;
    }
    assert!(!previous_was_ff, "stream must not end on a raw 0xFF");

    let mut reader = BitReader::new(&destination[..bytes_written]);
    for _ in 0..8 {
        assert_eq!(reader.read_value(8).unwrap(), 0xFF);
    }
    reader.end_scan().unwrap();
}

#[test]
fn wide_values_roundtrip() {
    let values: [(u32, i32); 6] = [
        (1, 1),
        (0x7FFF_FFFF, 31),
        (0, 31),
        (0x5555_5555 & 0x7FFF_FFFF, 31),
        (0xAB, 9),
        (3, 2),
    ];

    let mut destination = vec![0u8; 64];
    let mut writer = BitWriter::new(&mut destination);
    for &(value, bits) in &values {
        writer.append_to_bit_stream(value, bits).unwrap();
    }
    let bytes_written = writer.end_scan().unwrap();

    let mut reader = BitReader::new(&destination[..bytes_written]);
    for &(value, bits) in &values {
        assert_eq!(reader.read_value(bits).unwrap() as u32, value);
    }
    reader.end_scan().unwrap();
}

#[test]
fn mapped_value_coding_roundtrips() {
    // Covers the regular Golomb codes, the split unary prefix (more than
    // 31 zeros cannot go into one append) and the escape form.
    for &(k, limit, qbpp) in &[(0, 64, 16), (2, 64, 16), (0, 32, 8), (5, 32, 8)] {
        let mut values: Vec<i32> = (0..48).collect();
        values.extend([100, 255, 1000, (1 << qbpp) - 1]);
        values.retain(|&mapped| mapped < (1 << qbpp));

        for &mapped in &values {
            let mut destination = vec![0u8; 64];
            let mut writer = BitWriter::new(&mut destination);
            writer.encode_mapped_value(k, mapped, limit, qbpp).unwrap();
            let bytes_written = writer.end_scan().unwrap();

            let mut reader = BitReader::new(&destination[..bytes_written]);
            assert_eq!(
                reader.decode_value(k, limit, qbpp).unwrap(),
                mapped,
                "mismatch for k = {k}, limit = {limit}, mapped = {mapped}"
            );
        }
    }
}

#[test]
fn writer_reports_full_destination() {
    let mut destination = vec![0u8; 2];
    let mut writer = BitWriter::new(&mut destination);
    let mut result = Ok(());
    for _ in 0..16 {
        result = result.and(writer.append_to_bit_stream(0x55, 8));
    }
    assert_eq!(result, Err(JpeglsError::CompressedBufferTooSmall));
}

#[test]
fn reader_rejects_reading_past_marker() {
    // A 0xFF followed by a high-bit byte is a marker: no bits beyond it.
    let source = [0b1010_0000, 0xFF, 0xD9];
    let mut reader = BitReader::new(&source);
    assert_eq!(reader.read_value(8).unwrap(), 0b1010_0000);
    assert_eq!(reader.read_value(8), Err(JpeglsError::InvalidCompressedData));
}

fn minimal_stream(width: u16, scan_data: &[u8]) -> Vec<u8> {
    let mut stream = vec![
        0xFF, 0xD8, // SOI
        0xFF, 0xF7, // SOF55
        0x00, 0x0B, 0x08, 0x00, 0x01, (width >> 8) as u8, width as u8, 0x01, 0x01, 0x11, 0x00,
        0xFF, 0xDA, // SOS
        0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
    ];
    stream.extend_from_slice(scan_data);
    stream.extend_from_slice(&[0xFF, 0xD9]);
    stream
}

#[test]
fn encodes_known_single_pixel_stream() {
    // 1x1, 8 bit, lossless, pixel value 1: the first sample enters run
    // mode (all gradients zero against the all-zero first line), codes a
    // zero-length run and a run interruption error of +1 with k = 2:
    // bits 0, 1, 01 -> byte 0x50.
    let mut encoder = JpeglsEncoder::new();
    encoder
        .set_frame_info(FrameInfo {
            width: 1,
            height: 1,
            bits_per_sample: 8,
            component_count: 1,
        })
        .unwrap();
    let mut destination = vec![0u8; 64];
    let bytes_written = encoder.encode(&[1], &mut destination).unwrap();

    assert_eq!(&destination[..bytes_written], minimal_stream(1, &[0x50]));
}

#[test]
fn encodes_known_single_zero_pixel_stream() {
    // Pixel value 0 matches the zero-initialized first line: one full run
    // to the end of the line, a single 1 bit -> byte 0x80.
    let mut encoder = JpeglsEncoder::new();
    encoder
        .set_frame_info(FrameInfo {
            width: 1,
            height: 1,
            bits_per_sample: 8,
            component_count: 1,
        })
        .unwrap();
    let mut destination = vec![0u8; 64];
    let bytes_written = encoder.encode(&[0], &mut destination).unwrap();

    assert_eq!(&destination[..bytes_written], minimal_stream(1, &[0x80]));
}

#[test]
fn decodes_known_single_pixel_stream() {
    let stream = minimal_stream(1, &[0x50]);
    let mut decoder = JpeglsDecoder::new(&stream);
    decoder.read_header().unwrap();
    let mut pixels = [0u8; 1];
    decoder.decode(&mut pixels).unwrap();
    assert_eq!(pixels, [1]);
}

#[test]
fn run_length_beyond_line_width_is_rejected() {
    // Eight full-run 1 bits walk the run index up to J = 2 and fill 12 of
    // the 13 samples; the 2-bit remainder then claims 2 more samples than
    // the line holds.
    let stream = minimal_stream(13, &[0xFF, 0x20]);
    let mut decoder = JpeglsDecoder::new(&stream);
    decoder.read_header().unwrap();
    let mut pixels = [0u8; 13];
    assert_eq!(
        decoder.decode(&mut pixels),
        Err(JpeglsError::InvalidCompressedData)
    );
}

#[test]
fn trailing_scan_bytes_are_rejected() {
    let stream = minimal_stream(1, &[0x50, 0x00]);
    let mut decoder = JpeglsDecoder::new(&stream);
    decoder.read_header().unwrap();
    let mut pixels = [0u8; 1];
    assert_eq!(
        decoder.decode(&mut pixels),
        Err(JpeglsError::TooMuchCompressedData)
    );
}

#[test]
fn truncated_scan_data_is_rejected() {
    let stream = minimal_stream(16, &[]);
    let mut decoder = JpeglsDecoder::new(&stream);
    decoder.read_header().unwrap();
    let mut pixels = [0u8; 16];
    assert_eq!(
        decoder.decode(&mut pixels),
        Err(JpeglsError::InvalidCompressedData)
    );
}

#[test]
fn missing_start_of_image_is_rejected() {
    let mut decoder = JpeglsDecoder::new(&[0x00, 0x01, 0x02, 0x03]);
    assert_eq!(
        decoder.read_header(),
        Err(JpeglsError::JpegMarkerStartByteNotFound)
    );
}

#[test]
fn wrong_first_marker_is_rejected() {
    let mut decoder = JpeglsDecoder::new(&[0xFF, 0xD9]);
    assert_eq!(
        decoder.read_header(),
        Err(JpeglsError::StartOfImageMarkerNotFound)
    );
}

#[test]
fn destination_too_small_is_rejected() {
    let stream = minimal_stream(1, &[0x50]);
    let mut decoder = JpeglsDecoder::new(&stream);
    decoder.read_header().unwrap();
    let mut pixels = [0u8; 0];
    assert_eq!(
        decoder.decode(&mut pixels),
        Err(JpeglsError::UncompressedBufferTooSmall)
    );
}

#[test]
fn frame_info_is_recovered_from_header() {
    let stream = minimal_stream(1, &[0x50]);
    let mut decoder = JpeglsDecoder::new(&stream);
    decoder.read_header().unwrap();
    assert_eq!(
        decoder.frame_info().unwrap(),
        FrameInfo {
            width: 1,
            height: 1,
            bits_per_sample: 8,
            component_count: 1,
        }
    );
}

#[test]
fn header_queries_before_read_header_fail() {
    let stream = minimal_stream(1, &[0x50]);
    let decoder = JpeglsDecoder::new(&stream);
    assert_eq!(decoder.frame_info(), Err(JpeglsError::InvalidOperation));
}
