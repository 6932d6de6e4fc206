//! Encoder factory
//!
//! Maps an [`EncoderType`] (or its raw wire code) to a concrete adapter.
//! Construction never touches native libraries; binding happens on the
//! first `init_encoder`.

use std::ops::{Deref, DerefMut};

use tracing::{debug, info};

use crate::backend::{netint, openh264, vpe};
use crate::config::LibraryPaths;
use crate::encoder::{LifecycleAdapter, VideoEncoder};
use crate::error::{Operation, Result, ResultExt};
use crate::types::{BackendFamily, EncoderType};
use crate::validate::ParamBounds;

/// An encoder that knows which type it was created as
///
/// Teardown is driven by the handle itself, so no type tag is needed to
/// destroy it.
pub struct EncoderHandle {
    ty: EncoderType,
    inner: Box<dyn VideoEncoder>,
}

impl EncoderHandle {
    pub fn encoder_type(&self) -> EncoderType {
        self.ty
    }
}

impl Deref for EncoderHandle {
    type Target = dyn VideoEncoder;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for EncoderHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl std::fmt::Debug for EncoderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderHandle")
            .field("type", &self.ty)
            .field("state", &self.inner.state())
            .finish()
    }
}

/// Create an encoder using the default library search
pub fn create_encoder(ty: EncoderType) -> Result<EncoderHandle> {
    create_encoder_with(ty, &LibraryPaths::default())
}

/// Create an encoder from its wire type code
pub fn create_encoder_from_code(code: u32) -> Result<EncoderHandle> {
    let ty = EncoderType::try_from(code).during(Operation::Create)?;
    create_encoder(ty)
}

/// Create an encoder, preferring library paths from `libraries`
pub fn create_encoder_with(ty: EncoderType, libraries: &LibraryPaths) -> Result<EncoderHandle> {
    let library = libraries.get(ty.family());
    let inner: Box<dyn VideoEncoder> = match ty {
        EncoderType::OpenH264 => {
            let backend = match library {
                Some(path) => openh264::OpenH264Backend::with_library(path),
                None => openh264::OpenH264Backend::new(),
            };
            Box::new(LifecycleAdapter::new(backend))
        }
        EncoderType::NetintH264 | EncoderType::NetintH265 => {
            let mut backend = if ty == EncoderType::NetintH264 {
                netint::h264()
            } else {
                netint::h265()
            };
            if let Some(path) = library {
                backend = backend.with_library(path);
            }
            Box::new(LifecycleAdapter::new(backend))
        }
        EncoderType::VpeH264 | EncoderType::VpeH265 => {
            let mut backend = if ty == EncoderType::VpeH264 {
                vpe::h264()
            } else {
                vpe::h265()
            };
            if let Some(path) = library {
                backend = backend.with_library(path);
            }
            Box::new(LifecycleAdapter::new(backend))
        }
    };

    info!("created {} encoder (type code {})", ty, ty.code());
    Ok(EncoderHandle { ty, inner })
}

/// Release an encoder; `None` is accepted and does nothing
pub fn destroy_encoder(handle: Option<EncoderHandle>) -> Result<()> {
    let Some(mut handle) = handle else {
        debug!("destroy called without an encoder");
        return Ok(());
    };
    let ty = handle.ty;
    handle.destroy_encoder();
    drop(handle);
    info!("destroyed {} encoder", ty);
    Ok(())
}

/// Whether the library for `family` can be bound in this process
pub fn library_available(family: BackendFamily, libraries: &LibraryPaths) -> bool {
    let library = libraries.get(family);
    match family {
        BackendFamily::OpenH264 => openh264::is_available(library),
        BackendFamily::Netint => netint::is_available(library),
        BackendFamily::Vpe => vpe::is_available(library),
    }
}

/// Parameter bounds enforced by encoders of type `ty`
pub fn bounds(ty: EncoderType) -> ParamBounds {
    match ty {
        EncoderType::OpenH264 => ParamBounds::SOFTWARE_H264,
        EncoderType::NetintH264 => ParamBounds::NETINT_H264,
        EncoderType::NetintH265 => ParamBounds::NETINT_H265,
        EncoderType::VpeH264 => ParamBounds::VPE_H264,
        EncoderType::VpeH265 => ParamBounds::VPE_H265,
    }
}
