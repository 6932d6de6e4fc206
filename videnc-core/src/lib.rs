//! videnc Core Library
//!
//! One lifecycle contract over several H.264/H.265 encoders.
//!
//! This library provides:
//! - OpenH264 software encoding, bound from libopenh264 at runtime
//! - NETINT and VPE hardware accelerators through their vendor shims
//! - Deferred reconfiguration: new parameters apply on the next frame
//! - A C ABI for hosts that are not written in Rust
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │ Factory     │───▶│ LifecycleAdapter │───▶│ NativeBackend    │
//! │ (type code) │    │ (state machine)  │    │ (dlopen'd codec) │
//! └─────────────┘    └──────────────────┘    └──────────────────┘
//! ```

pub mod backend;
pub mod binding;
pub mod capi;
pub mod config;
pub mod encoder;
pub mod error;
pub mod factory;
pub mod frame;
pub mod logging;
pub mod types;
pub mod validate;

pub use config::ConfigFile;
pub use encoder::{EncoderState, LifecycleAdapter, VideoEncoder};
pub use error::{EncoderError, Operation, Result, ResultCode, ResultExt};
pub use factory::{
    EncoderHandle, create_encoder, create_encoder_from_code, create_encoder_with, destroy_encoder,
    library_available,
};
pub use frame::{Bitstream, I420Layout, I420Planes};
pub use logging::{LogLevel, register_log_callback};
pub use types::{BackendFamily, Codec, EncodeParams, EncoderType, Profile};
pub use validate::{ParamBounds, ParamError, validate};
