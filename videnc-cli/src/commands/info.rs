//! Info command - show encoder types and capabilities

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use videnc_core::config::ConfigFile;
use videnc_core::factory;
use videnc_core::{BackendFamily, EncoderType};

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    /// Print machine-readable JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct EncoderInfo {
    code: u32,
    name: &'static str,
    codec: &'static str,
    family: &'static str,
    hardware: bool,
    library_available: bool,
    min_dimension: u32,
    max_dimension: u32,
    frame_rates: Vec<u32>,
    min_bitrate: u32,
    max_bitrate: u32,
    min_gop_size: u32,
    max_gop_size: u32,
    profiles: Vec<String>,
}

fn collect() -> Vec<EncoderInfo> {
    let config = ConfigFile::load_or_default();

    let available: Vec<(BackendFamily, bool)> = BackendFamily::ALL
        .into_iter()
        .map(|family| (family, factory::library_available(family, &config.libraries)))
        .collect();

    EncoderType::ALL
        .into_iter()
        .map(|ty| {
            let bounds = factory::bounds(ty);
            let family = ty.family();
            EncoderInfo {
                code: ty.code(),
                name: ty.name(),
                codec: ty.codec().display_name(),
                family: family.display_name(),
                hardware: family.is_hardware(),
                library_available: available
                    .iter()
                    .any(|(f, ok)| *f == family && *ok),
                min_dimension: bounds.min_dimension,
                max_dimension: bounds.max_dimension,
                frame_rates: bounds.frame_rates.to_vec(),
                min_bitrate: bounds.min_bitrate,
                max_bitrate: bounds.max_bitrate,
                min_gop_size: bounds.min_gop_size,
                max_gop_size: bounds.max_gop_size,
                profiles: bounds.profiles.iter().map(|p| p.to_string()).collect(),
            }
        })
        .collect()
}

/// Show encoder types, parameter ranges and library availability
pub fn info(args: InfoArgs) -> Result<()> {
    let encoders = collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&encoders)?);
        return Ok(());
    }

    println!("videnc - Encoder Information\n");

    for e in &encoders {
        let status = if e.library_available { "[OK]" } else { "[--]" };
        println!("{} {} (type {}): {} via {}", status, e.name, e.code, e.codec, e.family);
        println!(
            "    Resolution: {}-{} px per side",
            e.min_dimension, e.max_dimension
        );
        println!("    Frame rate: {:?}", e.frame_rates);
        println!("    Bitrate:    {}-{} bps", e.min_bitrate, e.max_bitrate);
        println!("    GOP size:   {}-{}", e.min_gop_size, e.max_gop_size);
        println!("    Profiles:   {}", e.profiles.join(", "));
        println!();
    }

    if encoders.iter().all(|e| !e.library_available) {
        println!("No encoder library could be loaded.");
        println!();
        println!("Make sure you have:");
        println!("  - libopenh264 installed (e.g. the openh264 package), or");
        println!("  - the NETINT / VPE encoder shim for your accelerator");
        println!("  - or a path in ~/.config/videnc/config.toml [libraries]");
    }

    Ok(())
}
