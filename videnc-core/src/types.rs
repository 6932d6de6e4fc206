//! Core types for videnc
//!
//! Encode parameters, profiles and the encoder type codes the factory
//! dispatches on.

use serde::{Deserialize, Serialize};

use crate::error::EncoderError;

/// Codec profile requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Baseline,
    Main,
    #[default]
    High,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Baseline, Profile::Main, Profile::High];

    /// Wire value used by the C surface
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Baseline => 0,
            Self::Main => 1,
            Self::High => 2,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Baseline),
            1 => Some(Self::Main),
            2 => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Main => write!(f, "main"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" | "base" => Ok(Self::Baseline),
            "main" => Ok(Self::Main),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown profile: {}", s)),
        }
    }
}

/// Encode configuration shared by every backend
///
/// Equality is structural; an adapter only ever holds a value that passed
/// validation against its backend's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodeParams {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frames per second
    pub frame_rate: u32,
    /// Target bitrate in bits per second
    pub bitrate: u32,
    /// Frames between forced intra refreshes
    pub gop_size: u32,
    /// Codec profile
    pub profile: Profile,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 30,
            bitrate: 4_000_000,
            gop_size: 60,
            profile: Profile::High,
        }
    }
}

impl EncodeParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn with_gop_size(mut self, gop_size: u32) -> Self {
        self.gop_size = gop_size;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }
}

impl std::fmt::Display for EncodeParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} @ {}fps, {}bps, gop {}, {}",
            self.width, self.height, self.frame_rate, self.bitrate, self.gop_size, self.profile
        )
    }
}

/// Output bitstream codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    H264,
    H265,
}

impl Codec {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::H264 => "H.264",
            Self::H265 => "H.265",
        }
    }

    /// File extension for a raw Annex-B elementary stream
    pub fn extension(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "h265",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Backend family; one process-wide library binding exists per family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFamily {
    /// Cisco OpenH264 software encoder
    OpenH264,
    /// NETINT transcoding accelerator
    Netint,
    /// VeriSilicon VPE accelerator
    Vpe,
}

impl BackendFamily {
    pub const ALL: [BackendFamily; 3] = [Self::OpenH264, Self::Netint, Self::Vpe];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenH264 => "OpenH264",
            Self::Netint => "NETINT",
            Self::Vpe => "VPE",
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, Self::OpenH264)
    }
}

impl std::fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Encoder selected by the factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncoderType {
    /// Software H.264 via OpenH264
    #[serde(rename = "openh264")]
    OpenH264,
    NetintH264,
    NetintH265,
    VpeH264,
    VpeH265,
}

impl EncoderType {
    pub const ALL: [EncoderType; 5] = [
        Self::OpenH264,
        Self::NetintH264,
        Self::NetintH265,
        Self::VpeH264,
        Self::VpeH265,
    ];

    /// Wire type code
    pub fn code(&self) -> u32 {
        match self {
            Self::OpenH264 => 0,
            Self::NetintH264 => 1,
            Self::NetintH265 => 2,
            Self::VpeH264 => 3,
            Self::VpeH265 => 4,
        }
    }

    pub fn codec(&self) -> Codec {
        match self {
            Self::OpenH264 | Self::NetintH264 | Self::VpeH264 => Codec::H264,
            Self::NetintH265 | Self::VpeH265 => Codec::H265,
        }
    }

    pub fn family(&self) -> BackendFamily {
        match self {
            Self::OpenH264 => BackendFamily::OpenH264,
            Self::NetintH264 | Self::NetintH265 => BackendFamily::Netint,
            Self::VpeH264 | Self::VpeH265 => BackendFamily::Vpe,
        }
    }

    /// Short name used on the command line and in config files
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenH264 => "openh264",
            Self::NetintH264 => "netint-h264",
            Self::NetintH265 => "netint-h265",
            Self::VpeH264 => "vpe-h264",
            Self::VpeH265 => "vpe-h265",
        }
    }
}

impl TryFrom<u32> for EncoderType {
    type Error = EncoderError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(EncoderError::UnknownEncoderType(code))
    }
}

impl std::fmt::Display for EncoderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.family(), self.codec())
    }
}

impl std::str::FromStr for EncoderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .or_else(|| match lower.as_str() {
                "software" | "sw" => Some(Self::OpenH264),
                _ => None,
            })
            .ok_or_else(|| format!("Unknown encoder type: {}", s))
    }
}
