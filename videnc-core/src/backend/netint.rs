//! NETINT transcoding accelerator (H.264 and H.265)

use std::path::PathBuf;

use super::accel::{AccelBackend, AccelFamily};
use crate::encoder::LifecycleAdapter;
use crate::types::Codec;
use crate::validate::ParamBounds;

/// Environment variable overriding the shim path
pub const LIBRARY_ENV: &str = "VIDENC_NETINT_LIBRARY";

pub static NETINT: AccelFamily = AccelFamily::new(
    "NETINT",
    "ni_enc",
    LIBRARY_ENV,
    &[
        "libxcoder_enc.so",
        "/usr/local/lib/libxcoder_enc.so",
        "/opt/netint/lib/libxcoder_enc.so",
    ],
);

/// NETINT encoder handle
pub type NetintEncoder = LifecycleAdapter<AccelBackend>;

pub fn h264() -> AccelBackend {
    AccelBackend::new(&NETINT, "NETINT H.264", Codec::H264, ParamBounds::NETINT_H264)
}

pub fn h265() -> AccelBackend {
    AccelBackend::new(&NETINT, "NETINT H.265", Codec::H265, ParamBounds::NETINT_H265)
}

pub fn is_available(explicit: Option<PathBuf>) -> bool {
    NETINT.is_available(explicit)
}
