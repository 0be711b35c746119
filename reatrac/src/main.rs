use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use libatrac_audio::{
    AeaReader, AeaWriter, Atrac1Decoder, Atrac1Encoder, EncoderSettings, FrameSink, WindowMode,
    NUM_SAMPLES, SAMPLE_RATE,
};

mod audio;

#[derive(Parser)]
#[command(name = "reatrac")]
#[command(version = "0.1.0")]
#[command(about = "ATRAC1/AEA audio format converter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an audio file (wav, flac, mp3, ...) to ATRAC1/AEA
    Encode {
        /// Input audio file
        input: PathBuf,
        /// Output AEA file
        output: PathBuf,
        /// Pin the used BFU amount to preset N instead of adapting.
        /// WARNING: this is not a lowpass filter, do not use it to cut
        /// off high frequencies
        #[arg(long, value_name = "N")]
        bfuidxconst: Option<u32>,
        /// Binary-search the BFU amount instead of the linear scan
        #[arg(long)]
        bfuidxfast: bool,
        /// Disable transient detection; the optional mask forces short
        /// windows per band (low=1, mid=2, hi=4)
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "0", value_name = "MASK")]
        notransient: Option<u32>,
        /// Target bitrate in kbps (only if supported by the codec)
        #[arg(long)]
        bitrate: Option<u32>,
        /// Suppress progress output
        #[arg(long)]
        nostdout: bool,
    },
    /// Decode an ATRAC1/AEA file to WAV
    Decode {
        /// Input AEA file
        input: PathBuf,
        /// Output WAV file
        output: PathBuf,
        /// Suppress progress output
        #[arg(long)]
        nostdout: bool,
    },
    /// Show information about an AEA file
    Info {
        /// Input AEA file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            input,
            output,
            bfuidxconst,
            bfuidxfast,
            notransient,
            bitrate,
            nostdout,
        } => encode(EncodeArgs {
            input,
            output,
            bfuidxconst,
            bfuidxfast,
            notransient,
            bitrate,
            nostdout,
        }),
        Commands::Decode {
            input,
            output,
            nostdout,
        } => decode(&input, &output, nostdout),
        Commands::Info { input } => info(&input),
    }
}

struct EncodeArgs {
    input: PathBuf,
    output: PathBuf,
    bfuidxconst: Option<u32>,
    bfuidxfast: bool,
    notransient: Option<u32>,
    bitrate: Option<u32>,
    nostdout: bool,
}

fn encode(args: EncodeArgs) -> Result<()> {
    if args.bitrate.is_some() {
        bail!("--bitrate only applies to ATRAC3, which this build does not support");
    }
    let bfu_idx_const = match args.bfuidxconst {
        Some(n @ 1..=8) => n,
        Some(n) => bail!(
            "wrong bfuidxconst value ({n}). This is an advanced option, use --help to get more information"
        ),
        None => 0,
    };

    if !args.nostdout {
        println!("Reading {}...", args.input.display());
    }
    let (samples, sample_rate, channels) = audio::read_audio_file(&args.input)?;

    if sample_rate != SAMPLE_RATE {
        bail!("ATRAC1 requires {SAMPLE_RATE} Hz input, got {sample_rate} Hz (resample first)");
    }
    if channels == 0 || channels > 2 {
        bail!("ATRAC1 carries 1 or 2 channels, got {channels}");
    }

    let samples_per_channel = samples.len() / channels;
    if !args.nostdout {
        println!("  Channels: {channels}");
        println!("  SampleRate: {sample_rate}");
        println!("  TotalSamples: {samples_per_channel}");
    }

    let window_mode = if let Some(mask) = args.notransient {
        if mask > 7 {
            bail!("--notransient mask uses bits low=1, mid=2, hi=4, got {mask}");
        }
        if !args.nostdout {
            println!(
                "Transient detection disabled, bands: low - {}, mid - {}, hi - {}",
                if mask & 1 != 0 { "short" } else { "long" },
                if mask & 2 != 0 { "short" } else { "long" },
                if mask & 4 != 0 { "short" } else { "long" },
            );
        }
        WindowMode::NoTransient
    } else {
        WindowMode::Auto
    };

    let settings = EncoderSettings {
        bfu_idx_const,
        fast_bfu_search: args.bfuidxfast,
        window_mode,
        window_mask: args.notransient.unwrap_or(0),
    };

    let title = args
        .output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled");
    let mut encoder = Atrac1Encoder::new(channels as u8, settings)?;
    let mut writer = AeaWriter::new(title, channels as u8);

    let total_frames = samples_per_channel.div_ceil(NUM_SAMPLES);
    let mut block = vec![0.0f64; NUM_SAMPLES * channels];
    for frame_idx in 0..total_frames {
        let start = frame_idx * NUM_SAMPLES * channels;
        let end = (start + NUM_SAMPLES * channels).min(samples.len());
        block.fill(0.0);
        for (dst, &src) in block.iter_mut().zip(&samples[start..end]) {
            *dst = (src as f64 * 32768.0).clamp(-32768.0, 32767.0);
        }

        for frame in encoder.encode_frame(&block)? {
            writer.write_frame(&frame)?;
        }
        if !args.nostdout {
            print_progress(frame_idx as u64, (frame_idx + 1) * 100 / total_frames);
        }
    }

    let aea = writer.finish()?;
    fs::write(&args.output, &aea).context("Failed to write output file")?;

    if !args.nostdout {
        println!("\nDone");
        println!("  Output: {} ({} bytes)", args.output.display(), aea.len());
    }
    Ok(())
}

fn decode(input: &Path, output: &Path, nostdout: bool) -> Result<()> {
    let data = fs::read(input).context("Failed to read AEA file")?;
    let file = AeaReader::new().read(&data)?;

    let channels = file.header.channels as usize;
    if !nostdout {
        println!("Name: {}", file.header.title);
        println!(" Channels: {channels}");
        println!(" Length: {}", file.length_in_samples());
    }

    let mut decoder = Atrac1Decoder::new(file.header.channels)?;
    let total_units = file.frames.len() / channels;
    let mut pcm = Vec::with_capacity(total_units * NUM_SAMPLES * channels);

    for unit in 0..total_units {
        let frames = &file.frames[unit * channels..(unit + 1) * channels];
        let block = decoder.decode_frame(frames)?;
        pcm.extend(block.iter().map(|&v| v.round().clamp(-32768.0, 32767.0) as i16));
        if !nostdout && total_units > 0 {
            print_progress(unit as u64, (unit + 1) * 100 / total_units);
        }
    }

    audio::write_wav(output, &pcm, SAMPLE_RATE, channels)?;
    if !nostdout {
        println!("\nDone");
        println!("  Output: {}", output.display());
    }
    Ok(())
}

fn info(input: &Path) -> Result<()> {
    let data = fs::read(input).context("Failed to read AEA file")?;
    let file = AeaReader::new().read(&data)?;

    let length = file.length_in_samples();
    println!("ATRAC1/AEA Audio File");
    println!("───────────────────────────────");
    println!("  Name:        {}", file.header.title);
    println!("  Channels:    {}", file.header.channels);
    println!("  Sound units: {}", file.header.frame_count);
    println!("  Length:      {} samples", length);
    println!(
        "  Duration:    {:.2}s",
        length as f64 / SAMPLE_RATE as f64
    );
    println!("  File size:   {} bytes", data.len());
    Ok(())
}

fn print_progress(counter: u64, percent: usize) {
    const SYMBOLS: [char; 4] = ['-', '\\', '|', '/'];
    print!("{}  {}% done\r", SYMBOLS[(counter % 4) as usize], percent);
    let _ = std::io::stdout().flush();
}
