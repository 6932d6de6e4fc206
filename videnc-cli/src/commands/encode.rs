//! Encode command - raw I420 file to an elementary stream

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::{info, warn};
use videnc_core::config::ConfigFile;
use videnc_core::{
    EncodeParams, EncoderType, I420Layout, Profile, create_encoder_with, destroy_encoder,
};

use super::hinted;

/// Arguments for the encode command
#[derive(Args)]
pub struct EncodeArgs {
    /// Raw planar I420 input file
    #[arg(short, long)]
    input: PathBuf,

    /// Output elementary stream (Annex-B); defaults to the input path with
    /// a .h264 or .h265 extension
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Encoder (openh264, netint-h264, netint-h265, vpe-h264, vpe-h265)
    #[arg(short, long)]
    encoder: Option<EncoderType>,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Target bitrate in bits per second
    #[arg(short, long)]
    bitrate: Option<u32>,

    /// Keyframe interval in frames
    #[arg(long)]
    gop: Option<u32>,

    /// Profile (baseline, main, high)
    #[arg(long)]
    profile: Option<Profile>,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Switch to a new bitrate mid-stream, as FRAME:BITRATE
    #[arg(long, value_parser = parse_bitrate_change)]
    change_bitrate: Option<(u64, u32)>,

    /// Force a keyframe every N frames
    #[arg(long)]
    keyframe_every: Option<u64>,
}

fn parse_bitrate_change(s: &str) -> std::result::Result<(u64, u32), String> {
    let (frame, bitrate) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FRAME:BITRATE, got '{}'", s))?;
    let frame = frame
        .parse()
        .map_err(|_| format!("invalid frame index '{}'", frame))?;
    let bitrate = bitrate
        .parse()
        .map_err(|_| format!("invalid bitrate '{}'", bitrate))?;
    Ok((frame, bitrate))
}

/// Input path with the elementary stream extension of the encoder's codec
fn default_output(input: &Path, encoder_type: EncoderType) -> PathBuf {
    input.with_extension(encoder_type.codec().extension())
}

/// Read one frame; `Ok(false)` at a clean end of input
fn read_frame(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Failed to read input"),
        }
    }
    if filled == 0 {
        return Ok(false);
    }
    if filled < buf.len() {
        warn!(
            "Trailing partial frame ignored ({} of {} bytes)",
            filled,
            buf.len()
        );
        return Ok(false);
    }
    Ok(true)
}

/// Encode a raw I420 file
pub fn encode(args: EncodeArgs) -> Result<()> {
    let config = ConfigFile::load_or_default();
    let defaults = config.defaults.encode_params();

    let encoder_type = args.encoder.unwrap_or(config.defaults.encoder);
    let params = EncodeParams {
        width: args.width.unwrap_or(defaults.width),
        height: args.height.unwrap_or(defaults.height),
        frame_rate: args.fps.unwrap_or(defaults.frame_rate),
        bitrate: args.bitrate.unwrap_or(defaults.bitrate),
        gop_size: args.gop.unwrap_or(defaults.gop_size),
        profile: args.profile.unwrap_or(defaults.profile),
    };

    if args.keyframe_every == Some(0) {
        bail!("--keyframe-every must be at least 1");
    }

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input, encoder_type));
    if output_path == args.input {
        bail!("Output would overwrite the input file {}", args.input.display());
    }

    println!("videnc - Encoding\n");
    println!("  Encoder:  {} ({})", encoder_type.name(), encoder_type);
    println!("  Params:   {}", params);
    println!("  Input:    {}", args.input.display());
    println!("  Output:   {}", output_path.display());
    println!();

    let input = File::open(&args.input)
        .with_context(|| format!("Failed to open input {}", args.input.display()))?;
    let output = File::create(&output_path)
        .with_context(|| format!("Failed to create output {}", output_path.display()))?;
    let mut reader = BufReader::new(input);
    let mut writer = BufWriter::new(output);

    let mut encoder = create_encoder_with(encoder_type, &config.libraries).map_err(hinted)?;
    encoder.init_encoder(&params).map_err(hinted)?;
    encoder.start_encoder().map_err(hinted)?;

    let layout = I420Layout::new(params.width, params.height);
    let mut frame = vec![0u8; layout.frame_size()];

    let started = Instant::now();
    let mut frames = 0u64;
    let mut keyframes = 0u64;
    let mut bytes = 0u64;

    while args.frames.is_none_or(|limit| frames < limit) {
        if !read_frame(&mut reader, &mut frame)? {
            break;
        }

        if let Some((at, bitrate)) = args.change_bitrate {
            if frames == at {
                let current = encoder.encode_params().unwrap_or(params);
                info!("Switching bitrate to {} at frame {}", bitrate, frames);
                encoder
                    .set_encode_params(&current.with_bitrate(bitrate))
                    .map_err(hinted)?;
            }
        }
        if let Some(every) = args.keyframe_every {
            if frames > 0 && frames % every == 0 {
                encoder.force_key_frame().map_err(hinted)?;
            }
        }

        let bitstream = encoder.encode_one_frame(&frame).map_err(hinted)?;
        if bitstream.is_keyframe() {
            keyframes += 1;
        }
        bytes += bitstream.len() as u64;
        writer
            .write_all(bitstream.as_bytes())
            .context("Failed to write output")?;
        frames += 1;
    }

    writer.flush().context("Failed to write output")?;
    encoder.stop_encoder().map_err(hinted)?;
    destroy_encoder(Some(encoder)).map_err(hinted)?;

    let elapsed = started.elapsed().as_secs_f64();
    println!("Encoded {} frames ({} keyframes), {} bytes", frames, keyframes, bytes);
    if elapsed > 0.0 && frames > 0 {
        println!("  Speed:    {:.1} fps", frames as f64 / elapsed);
        let seconds = frames as f64 / params.frame_rate as f64;
        println!("  Bitrate:  {:.0} bps", bytes as f64 * 8.0 / seconds);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bitrate_change() {
        assert_eq!(parse_bitrate_change("30:6000000"), Ok((30, 6_000_000)));
        assert!(parse_bitrate_change("30").is_err());
        assert!(parse_bitrate_change("x:1").is_err());
    }

    #[test]
    fn test_default_output_follows_codec() {
        let input = Path::new("/tmp/clip.yuv");
        assert_eq!(
            default_output(input, EncoderType::OpenH264),
            PathBuf::from("/tmp/clip.h264")
        );
        assert_eq!(
            default_output(input, EncoderType::VpeH265),
            PathBuf::from("/tmp/clip.h265")
        );
    }

    #[test]
    fn test_read_frame_stops_on_partial() {
        let data = vec![1u8; 10];
        let mut reader = &data[..];
        let mut buf = [0u8; 4];
        assert!(read_frame(&mut reader, &mut buf).unwrap());
        assert!(read_frame(&mut reader, &mut buf).unwrap());
        assert!(!read_frame(&mut reader, &mut buf).unwrap());
    }
}
