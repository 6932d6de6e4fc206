//! Configuration file loading
//!
//! Loads user configuration from `~/.config/videnc/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{EncoderError, Result};
use crate::types::{BackendFamily, EncodeParams, EncoderType, Profile};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Default encoder and parameters
    #[serde(default)]
    pub defaults: DefaultSettings,

    /// Per-family library path overrides
    #[serde(default)]
    pub libraries: LibraryPaths,
}

/// Default encode settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultSettings {
    /// Encoder type (openh264, netint-h264, netint-h265, vpe-h264, vpe-h265)
    #[serde(default = "default_encoder")]
    pub encoder: EncoderType,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Target bitrate in bits per second
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,

    /// Keyframe interval in frames
    #[serde(default = "default_gop_size")]
    pub gop_size: u32,

    #[serde(default)]
    pub profile: Profile,
}

/// Explicit shared library paths; unset entries fall back to the
/// environment and the default search list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openh264: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netint: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpe: Option<PathBuf>,
}

impl LibraryPaths {
    /// Override configured for `family`
    pub fn get(&self, family: BackendFamily) -> Option<PathBuf> {
        match family {
            BackendFamily::OpenH264 => self.openh264.clone(),
            BackendFamily::Netint => self.netint.clone(),
            BackendFamily::Vpe => self.vpe.clone(),
        }
    }
}

fn default_encoder() -> EncoderType {
    EncoderType::OpenH264
}

fn default_width() -> u32 {
    EncodeParams::default().width
}

fn default_height() -> u32 {
    EncodeParams::default().height
}

fn default_frame_rate() -> u32 {
    EncodeParams::default().frame_rate
}

fn default_bitrate() -> u32 {
    EncodeParams::default().bitrate
}

fn default_gop_size() -> u32 {
    EncodeParams::default().gop_size
}

impl Default for DefaultSettings {
    fn default() -> Self {
        let params = EncodeParams::default();
        Self {
            encoder: default_encoder(),
            width: params.width,
            height: params.height,
            frame_rate: params.frame_rate,
            bitrate: params.bitrate,
            gop_size: params.gop_size,
            profile: params.profile,
        }
    }
}

impl DefaultSettings {
    /// Encode parameters described by this section
    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
            bitrate: self.bitrate,
            gop_size: self.gop_size,
            profile: self.profile,
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("videnc").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("videnc")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/videnc/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;

        let config: ConfigFile = toml::from_str(&content)?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        create_parent_dir(&path)?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| EncoderError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&path, content)?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Write the commented sample to `path`, replacing any existing file
    pub fn write_sample_to(path: &Path) -> Result<()> {
        create_parent_dir(path)?;
        std::fs::write(path, sample_config())?;
        info!("Wrote sample configuration to {:?}", path);
        Ok(())
    }

    /// Write the sample to `path` unless a file is already there
    ///
    /// Returns whether a file was created.
    pub fn create_default_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::write_sample_to(path)?;
        Ok(true)
    }
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# videnc configuration

[defaults]
# Encoder: openh264, netint-h264, netint-h265, vpe-h264, vpe-h265
encoder = "openh264"

# Resolution in pixels (software encoder: 16-4096)
width = 1280
height = 720

# Frames per second (software encoder: 30 or 60)
frame_rate = 30

# Target bitrate in bits per second (software encoder: 1000000-10000000)
bitrate = 4000000

# Keyframe interval in frames (software encoder: 30-3000)
gop_size = 60

# Profile: baseline, main, high (H.265 encoders accept main only)
profile = "high"

[libraries]
# Explicit shared library paths. Unset entries fall back to
# VIDENC_OPENH264_LIBRARY / VIDENC_NETINT_LIBRARY / VIDENC_VPE_LIBRARY
# and then the default search list.
# openh264 = "/usr/lib/x86_64-linux-gnu/libopenh264.so.7"
# netint = "/usr/local/lib/libxcoder_enc.so"
# vpe = "/usr/lib/vpe/libvpe_enc.so"
"#
    .to_string()
}
