//! The lifecycle contract shared by every encoder backend
//!
//! ```text
//! Uninitialized ──init──▶ Initialized ──start──▶ Started ◀──encode──┐
//!       ▲                     ▲                  │   ▲              │
//!       │                     │       set_params │   │ encode       │
//!       │                     │                  ▼   │ (reinit)     │
//!       │                   init              PendingReset          │
//!       │                     │                  │                  │
//!       │                  Stopped ◀────stop─────┴──────────────────┘
//!       │                     │
//!       └───── destroy ──▶ Destroyed (init / reset leave again)
//! ```

mod adapter;

pub use adapter::LifecycleAdapter;

use crate::error::Result;
use crate::frame::Bitstream;
use crate::types::EncodeParams;

/// Lifecycle state of an encoder handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderState {
    /// Constructed, no native context
    Uninitialized,
    /// Native context exists, not started
    Initialized,
    /// Accepting frames
    Started,
    /// Started, but new parameters are waiting for the next frame
    PendingReset,
    /// Stopped; `init_encoder` is required before encoding again
    Stopped,
    /// Native context released
    Destroyed,
}

impl EncoderState {
    /// States in which `encode_one_frame` is accepted
    pub fn accepts_frames(&self) -> bool {
        matches!(self, Self::Started | Self::PendingReset)
    }

    /// States from which `init_encoder` may run
    pub fn can_init(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Stopped | Self::Destroyed)
    }
}

impl std::fmt::Display for EncoderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::Initialized => "Initialized",
            Self::Started => "Started",
            Self::PendingReset => "PendingReset",
            Self::Stopped => "Stopped",
            Self::Destroyed => "Destroyed",
        };
        f.write_str(name)
    }
}

/// Uniform encoder interface returned by the factory
///
/// Every operation is synchronous. One handle serves one caller at a time.
pub trait VideoEncoder: Send {
    /// Validate `params`, bind the backend library and create the native context
    fn init_encoder(&mut self, params: &EncodeParams) -> Result<()>;

    /// Move an initialized encoder into the started state
    fn start_encoder(&mut self) -> Result<()>;

    /// Encode one planar I420 frame
    ///
    /// The returned view aliases backend memory and lives until the next
    /// mutating call on this encoder.
    fn encode_one_frame(&mut self, input: &[u8]) -> Result<Bitstream<'_>>;

    fn stop_encoder(&mut self) -> Result<()>;

    /// Release the native context; calling it again is a no-op
    fn destroy_encoder(&mut self);

    /// Destroy, re-init with the current parameters, and start
    fn reset_encoder(&mut self) -> Result<()>;

    /// Make the next encoded frame an intra frame
    fn force_key_frame(&mut self) -> Result<()>;

    /// Accept new parameters; applied on the next encoded frame
    fn set_encode_params(&mut self, params: &EncodeParams) -> Result<()>;

    fn state(&self) -> EncoderState;

    /// Most recently accepted parameters
    fn encode_params(&self) -> Option<EncodeParams>;

    /// Backend name for diagnostics
    fn backend_name(&self) -> &'static str;
}
