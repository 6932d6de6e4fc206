//! Config command - manage configuration files

use anyhow::Result;
use clap::{Args, Subcommand};
use videnc_core::config::{ConfigFile, sample_config};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the effective configuration
    Show,

    /// Generate a default config file
    Init {
        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub fn config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            let path = ConfigFile::default_path();
            println!("{}", path.display());
            if path.exists() {
                println!("(file exists)");
            } else {
                println!("(file does not exist)");
            }
        }
        ConfigCommand::Show => {
            let path = ConfigFile::default_path();
            if !path.exists() {
                println!("No configuration file found at: {}", path.display());
                println!();
                println!("Using default settings. Create a config file with:");
                println!("  videnc config init");
                return Ok(());
            }

            let config = ConfigFile::load_from(path.clone()).map_err(super::hinted)?;
            let defaults = &config.defaults;

            println!("Configuration file: {}\n", path.display());
            println!("Defaults:");
            println!("  Encoder:  {}", defaults.encoder.name());
            println!("  Params:   {}", defaults.encode_params());
            println!();
            println!("Libraries:");
            for (name, path) in [
                ("openh264", &config.libraries.openh264),
                ("netint", &config.libraries.netint),
                ("vpe", &config.libraries.vpe),
            ] {
                match path {
                    Some(p) => println!("  {:<9} {}", name, p.display()),
                    None => println!("  {:<9} (default search)", name),
                }
            }
        }
        ConfigCommand::Init { force } => {
            let path = ConfigFile::default_path();

            if force {
                ConfigFile::write_sample_to(&path).map_err(super::hinted)?;
            } else if !ConfigFile::create_default_if_missing(&path).map_err(super::hinted)? {
                println!("Configuration file already exists: {}", path.display());
                println!();
                println!("Use --force to overwrite, or edit the existing file.");
                return Ok(());
            }

            println!("Created configuration file: {}", path.display());
            println!();
            println!("Edit this file to change the default encoder and parameters.");
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}
