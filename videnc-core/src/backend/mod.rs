//! Native encoder backends
//!
//! A backend knows how to bind its vendor library and open a native session
//! for validated parameters. The lifecycle rules live in
//! [`LifecycleAdapter`](crate::encoder::LifecycleAdapter), which drives any
//! backend through the same state machine.

pub mod accel;
pub mod netint;
pub mod openh264;
pub mod vpe;

use crate::error::Result;
use crate::frame::{Bitstream, I420Planes};
use crate::types::EncodeParams;
use crate::validate::ParamBounds;

/// A family of native encoders reachable through one shared library
pub trait NativeBackend: Send {
    /// Live native encoder context; released on drop
    type Session: NativeSession;

    /// Backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Parameter limits enforced before any native call
    fn bounds(&self) -> &ParamBounds;

    /// Resolve the process-wide library binding if it is not bound yet
    fn bind(&self) -> Result<()>;

    /// Create and configure a native context for `params`
    ///
    /// `params` has already passed [`bounds`](Self::bounds). On error no
    /// native resources stay allocated.
    fn open(&self, params: &EncodeParams) -> Result<Self::Session>;
}

/// One native encoder context
pub trait NativeSession: Send {
    /// Allocate streaming resources; a no-op for software encoders
    fn start(&mut self) -> Result<()>;

    /// Encode one frame; the output aliases session-owned memory
    fn encode(&mut self, frame: &I420Planes<'_>) -> Result<Bitstream<'_>>;

    /// Release streaming resources; a no-op for software encoders
    fn stop(&mut self) -> Result<()>;

    /// Request an intra frame next
    fn force_key_frame(&mut self) -> Result<()>;
}
