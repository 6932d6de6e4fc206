//! Encode parameter validation
//!
//! Every backend publishes a [`ParamBounds`] table and runs the same
//! [`validate`] check before any native call is issued.

use thiserror::Error;
use tracing::{debug, error};

use crate::types::{EncodeParams, Profile};

/// Backend-specific limits for [`EncodeParams`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamBounds {
    /// Inclusive minimum for width and height
    pub min_dimension: u32,
    /// Inclusive maximum for width and height
    pub max_dimension: u32,
    /// Accepted frame rates
    pub frame_rates: &'static [u32],
    pub min_bitrate: u32,
    pub max_bitrate: u32,
    pub min_gop_size: u32,
    pub max_gop_size: u32,
    /// Accepted profiles
    pub profiles: &'static [Profile],
}

impl ParamBounds {
    /// OpenH264 software encoder
    pub const SOFTWARE_H264: ParamBounds = ParamBounds {
        min_dimension: 16,
        max_dimension: 4096,
        frame_rates: &[30, 60],
        min_bitrate: 1_000_000,
        max_bitrate: 10_000_000,
        min_gop_size: 30,
        max_gop_size: 3000,
        profiles: &Profile::ALL,
    };

    /// NETINT accelerator, H.264
    pub const NETINT_H264: ParamBounds = ParamBounds {
        max_dimension: 8192,
        frame_rates: &[24, 25, 30, 50, 60],
        max_bitrate: 40_000_000,
        ..Self::SOFTWARE_H264
    };

    /// NETINT accelerator, H.265
    pub const NETINT_H265: ParamBounds = ParamBounds {
        profiles: &[Profile::Main],
        ..Self::NETINT_H264
    };

    /// VPE accelerator, H.264
    pub const VPE_H264: ParamBounds = ParamBounds {
        frame_rates: &[24, 25, 30, 50, 60],
        max_bitrate: 40_000_000,
        ..Self::SOFTWARE_H264
    };

    /// VPE accelerator, H.265
    pub const VPE_H265: ParamBounds = ParamBounds {
        profiles: &[Profile::Main],
        ..Self::VPE_H264
    };
}

/// A single violated bound
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("resolution [{width}x{height}] is not supported (each side must be in [{min}, {max}])")]
    Resolution {
        width: u32,
        height: u32,
        min: u32,
        max: u32,
    },

    #[error("framerate [{0}] is not supported")]
    FrameRate(u32),

    #[error("bitrate [{value}] is not supported (must be in [{min}, {max}])")]
    Bitrate { value: u32, min: u32, max: u32 },

    #[error("gopsize [{value}] is not supported (must be in [{min}, {max}])")]
    GopSize { value: u32, min: u32, max: u32 },

    #[error("profile [{0}] is not supported")]
    Profile(String),
}

impl ParamError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            Self::Resolution { .. } => "resolution",
            Self::FrameRate(_) => "frame_rate",
            Self::Bitrate { .. } => "bitrate",
            Self::GopSize { .. } => "gop_size",
            Self::Profile(_) => "profile",
        }
    }
}

/// Check `params` against `bounds`
///
/// Total and side-effect free apart from logging; the first violated field
/// rejects the whole configuration.
pub fn validate(params: &EncodeParams, bounds: &ParamBounds) -> Result<(), ParamError> {
    let result = check(params, bounds);
    match &result {
        Ok(()) => debug!("encode params accepted: {}", params),
        Err(e) => error!("{}", e),
    }
    result
}

fn check(params: &EncodeParams, bounds: &ParamBounds) -> Result<(), ParamError> {
    let dims = bounds.min_dimension..=bounds.max_dimension;
    if !dims.contains(&params.width) || !dims.contains(&params.height) {
        return Err(ParamError::Resolution {
            width: params.width,
            height: params.height,
            min: bounds.min_dimension,
            max: bounds.max_dimension,
        });
    }

    if !bounds.frame_rates.contains(&params.frame_rate) {
        return Err(ParamError::FrameRate(params.frame_rate));
    }

    if !(bounds.min_bitrate..=bounds.max_bitrate).contains(&params.bitrate) {
        return Err(ParamError::Bitrate {
            value: params.bitrate,
            min: bounds.min_bitrate,
            max: bounds.max_bitrate,
        });
    }

    if !(bounds.min_gop_size..=bounds.max_gop_size).contains(&params.gop_size) {
        return Err(ParamError::GopSize {
            value: params.gop_size,
            min: bounds.min_gop_size,
            max: bounds.max_gop_size,
        });
    }

    if !bounds.profiles.contains(&params.profile) {
        return Err(ParamError::Profile(params.profile.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_fit_software_bounds() {
        assert!(validate(&EncodeParams::default(), &ParamBounds::SOFTWARE_H264).is_ok());
    }

    #[test]
    fn test_h265_rejects_high_profile() {
        let params = EncodeParams::default().with_profile(Profile::High);
        let err = validate(&params, &ParamBounds::NETINT_H265).unwrap_err();
        assert_eq!(err.field(), "profile");
        assert!(validate(&params.with_profile(Profile::Main), &ParamBounds::NETINT_H265).is_ok());
    }

    #[test]
    fn test_error_message_names_value() {
        let params = EncodeParams::default().with_frame_rate(45);
        let err = validate(&params, &ParamBounds::SOFTWARE_H264).unwrap_err();
        assert_eq!(err, ParamError::FrameRate(45));
        assert!(err.to_string().contains("[45]"));
    }
}
