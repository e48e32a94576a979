//! jpegls CLI - encode, decode and inspect JPEG-LS images.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use jpegls_rs::{FrameInfo, InterleaveMode, JpeglsDecoder, JpeglsEncoder};

/// JPEG-LS (ISO/IEC 14495-1) lossless and near-lossless image codec
#[derive(Parser)]
#[command(name = "jpegls")]
#[command(version)]
#[command(about = "JPEG-LS codec for encoding and decoding raw pixel data", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegls encode -i pixels.raw -o image.jls -w 512 -H 512
    jpegls encode -i pixels.raw -o image.jls -w 512 -H 512 -n 3 --near-lossless 2
    jpegls decode -i image.jls -o pixels.raw
    jpegls info -i image.jls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode raw pixel data to a JPEG-LS file
    ///
    /// Input must be raw pixel data: grayscale, or pixel-interleaved color
    /// unless plane interleave mode is selected. Samples over 8 bits are
    /// read as native-endian 16-bit values.
    #[command(visible_alias = "e")]
    Encode {
        /// Input raw pixel file
        #[arg(short, long)]
        input: PathBuf,

        /// Output JPEG-LS file
        #[arg(short, long)]
        output: PathBuf,

        /// Image width in pixels
        #[arg(short, long)]
        width: u32,

        /// Image height in pixels
        #[arg(short = 'H', long)]
        height: u32,

        /// Bits per sample (2-16)
        #[arg(short, long, default_value = "8")]
        bits_per_sample: i32,

        /// Number of components (1=grayscale, 3=color)
        #[arg(short = 'n', long, default_value = "1")]
        components: i32,

        /// Interleave mode for color images
        #[arg(long, default_value = "sample", value_enum)]
        interleave: Interleave,

        /// Near-lossless tolerance (0=lossless)
        #[arg(long, default_value = "0")]
        near_lossless: i32,
    },

    /// Decode a JPEG-LS file to raw pixels
    #[command(visible_alias = "d")]
    Decode {
        /// Input JPEG-LS file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the raw pixel data
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Display frame information of a JPEG-LS file
    #[command(visible_alias = "i")]
    Info {
        /// Input JPEG-LS file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Interleave {
    /// One scan per component, planar input
    None,
    /// Components interleaved per line
    Line,
    /// Components interleaved per sample
    Sample,
}

impl From<Interleave> for InterleaveMode {
    fn from(value: Interleave) -> Self {
        match value {
            Interleave::None => InterleaveMode::None,
            Interleave::Line => InterleaveMode::Line,
            Interleave::Sample => InterleaveMode::Sample,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Encode {
            input,
            output,
            width,
            height,
            bits_per_sample,
            components,
            interleave,
            near_lossless,
        } => {
            let pixels = fs::read(&input).map_err(|e| format!("{}: {e}", input.display()))?;

            let mut encoder = JpeglsEncoder::new();
            encoder
                .set_frame_info(FrameInfo {
                    width,
                    height,
                    bits_per_sample,
                    component_count: components,
                })
                .map_err(|e| e.to_string())?;
            if components > 1 {
                encoder
                    .set_interleave_mode(interleave.into())
                    .map_err(|e| e.to_string())?;
            }
            encoder
                .set_near_lossless(near_lossless)
                .map_err(|e| e.to_string())?;

            let mut destination =
                vec![0u8; encoder.estimated_destination_size().map_err(|e| e.to_string())?];
            let bytes_written = encoder
                .encode(&pixels, &mut destination)
                .map_err(|e| e.to_string())?;
            destination.truncate(bytes_written);

            fs::write(&output, &destination).map_err(|e| format!("{}: {e}", output.display()))?;
            println!(
                "encoded {} -> {} ({} bytes, {:.2}:1)",
                input.display(),
                output.display(),
                bytes_written,
                pixels.len() as f64 / bytes_written as f64
            );
            Ok(())
        }

        Commands::Decode { input, output } => {
            let compressed = fs::read(&input).map_err(|e| format!("{}: {e}", input.display()))?;

            let mut decoder = JpeglsDecoder::new(&compressed);
            decoder.read_header().map_err(|e| e.to_string())?;
            let mut pixels = vec![0u8; decoder.destination_size().map_err(|e| e.to_string())?];
            decoder.decode(&mut pixels).map_err(|e| e.to_string())?;

            fs::write(&output, &pixels).map_err(|e| format!("{}: {e}", output.display()))?;
            println!(
                "decoded {} -> {} ({} bytes)",
                input.display(),
                output.display(),
                pixels.len()
            );
            Ok(())
        }

        Commands::Info { input } => {
            let compressed = fs::read(&input).map_err(|e| format!("{}: {e}", input.display()))?;

            let mut decoder = JpeglsDecoder::new(&compressed);
            decoder.read_header().map_err(|e| e.to_string())?;
            let frame_info = decoder.frame_info().map_err(|e| e.to_string())?;

            println!("{}", input.display());
            println!("  dimensions:      {}x{}", frame_info.width, frame_info.height);
            println!("  bits per sample: {}", frame_info.bits_per_sample);
            println!("  components:      {}", frame_info.component_count);
            let preset = decoder.preset_coding_parameters().map_err(|e| e.to_string())?;
            if preset != Default::default() {
                println!(
                    "  preset:          maxval {} T1 {} T2 {} T3 {} reset {}",
                    preset.maximum_sample_value,
                    preset.threshold1,
                    preset.threshold2,
                    preset.threshold3,
                    preset.reset_value
                );
            }
            Ok(())
        }
    }
}
