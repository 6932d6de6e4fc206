//! VPE video processing accelerator (H.264 and H.265)

use std::path::PathBuf;

use super::accel::{AccelBackend, AccelFamily};
use crate::encoder::LifecycleAdapter;
use crate::types::Codec;
use crate::validate::ParamBounds;

/// Environment variable overriding the shim path
pub const LIBRARY_ENV: &str = "VIDENC_VPE_LIBRARY";

pub static VPE: AccelFamily = AccelFamily::new(
    "VPE",
    "vpe_enc",
    LIBRARY_ENV,
    &["libvpe_enc.so", "/usr/lib/vpe/libvpe_enc.so", "/opt/vpe/lib/libvpe_enc.so"],
);

/// VPE encoder handle
pub type VpeEncoder = LifecycleAdapter<AccelBackend>;

pub fn h264() -> AccelBackend {
    AccelBackend::new(&VPE, "VPE H.264", Codec::H264, ParamBounds::VPE_H264)
}

pub fn h265() -> AccelBackend {
    AccelBackend::new(&VPE, "VPE H.265", Codec::H265, ParamBounds::VPE_H265)
}

pub fn is_available(explicit: Option<PathBuf>) -> bool {
    VPE.is_available(explicit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NativeBackend;
    use crate::types::EncodeParams;
    use crate::validate::validate;

    #[test]
    fn test_vpe_dimension_ceiling() {
        let backend = h264();
        assert!(validate(&EncodeParams::new(4096, 2160), backend.bounds()).is_ok());
        assert!(validate(&EncodeParams::new(4097, 2160), backend.bounds()).is_err());
    }

    #[test]
    fn test_vpe_bitrate_range() {
        let backend = h264();
        let params = EncodeParams::new(1920, 1080);
        assert!(validate(&params.with_bitrate(40_000_000), backend.bounds()).is_ok());
        assert!(validate(&params.with_bitrate(40_000_001), backend.bounds()).is_err());
        assert!(validate(&params.with_bitrate(999_999), backend.bounds()).is_err());
    }

    #[test]
    #[ignore = "Requires VPE hardware"]
    fn test_vpe_available() {
        assert!(is_available(None));
    }
}
