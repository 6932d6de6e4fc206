//! CLI command implementations

mod config;
mod encode;
mod info;

pub use config::{ConfigArgs, config};
pub use encode::{EncodeArgs, encode};
pub use info::{InfoArgs, info};

use videnc_core::EncoderError;

/// Attach the remediation hint, if any, to an encoder error
pub(crate) fn hinted(err: EncoderError) -> anyhow::Error {
    match err.user_hint() {
        Some(hint) => anyhow::anyhow!("{}\n\nHint: {}", err, hint),
        None => anyhow::Error::new(err),
    }
}
