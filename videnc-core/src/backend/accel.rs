//! Shared plumbing for hardware accelerator families
//!
//! Each accelerator vendor ships an encoder shim library exporting a flat C
//! entry-point set under a vendor prefix:
//!
//! ```text
//! int  <prefix>_create(int codec, void **ctx);      // 0 = H.264, 1 = H.265
//! int  <prefix>_open(void *ctx, const AccelParams *params);
//! int  <prefix>_start(void *ctx);                   // allocate device buffers
//! int  <prefix>_encode(void *ctx, const AccelFrame *frame, AccelPacket *out);
//! int  <prefix>_force_idr(void *ctx);
//! int  <prefix>_stop(void *ctx);                    // release device buffers
//! void <prefix>_destroy(void *ctx);
//! ```
//!
//! Every call except `destroy` returns 0 on success. The packet returned by
//! `encode` stays valid until the next call on the same context.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use libc::{c_int, c_uint};
use tracing::{debug, info, warn};

use super::{NativeBackend, NativeSession};
use crate::binding::{LazyBinding, LibrarySearch};
use crate::error::{EncoderError, Result};
use crate::frame::{Bitstream, I420Planes};
use crate::types::{Codec, EncodeParams};
use crate::validate::ParamBounds;

/// Encoder configuration passed to `<prefix>_open`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccelParams {
    pub width: c_uint,
    pub height: c_uint,
    pub frame_rate: c_uint,
    pub bitrate: c_uint,
    pub gop_size: c_uint,
    /// 0 = baseline, 1 = main, 2 = high
    pub profile: c_uint,
}

impl From<&EncodeParams> for AccelParams {
    fn from(p: &EncodeParams) -> Self {
        Self {
            width: p.width,
            height: p.height,
            frame_rate: p.frame_rate,
            bitrate: p.bitrate,
            gop_size: p.gop_size,
            profile: p.profile.as_u32(),
        }
    }
}

/// One planar I420 input frame
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AccelFrame {
    pub planes: [*const u8; 3],
    pub strides: [c_uint; 3],
    pub width: c_uint,
    pub height: c_uint,
}

impl AccelFrame {
    fn from_planes(frame: &I420Planes<'_>) -> Self {
        Self {
            planes: [frame.y.as_ptr(), frame.u.as_ptr(), frame.v.as_ptr()],
            strides: [frame.y_stride, frame.uv_stride, frame.uv_stride],
            width: frame.width,
            height: frame.height,
        }
    }
}

/// Encoded output owned by the shim
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AccelPacket {
    pub data: *const u8,
    pub len: usize,
    pub keyframe: c_int,
}

impl Default for AccelPacket {
    fn default() -> Self {
        Self {
            data: ptr::null(),
            len: 0,
            keyframe: 0,
        }
    }
}

pub type FnCreate = unsafe extern "C" fn(codec: c_int, ctx: *mut *mut c_void) -> c_int;
pub type FnOpen = unsafe extern "C" fn(ctx: *mut c_void, params: *const AccelParams) -> c_int;
pub type FnCall = unsafe extern "C" fn(ctx: *mut c_void) -> c_int;
pub type FnEncode = unsafe extern "C" fn(
    ctx: *mut c_void,
    frame: *const AccelFrame,
    out: *mut AccelPacket,
) -> c_int;
pub type FnDestroy = unsafe extern "C" fn(ctx: *mut c_void);

/// Resolved entry points of one accelerator shim
pub struct AccelLib {
    _lib: libloading::Library,
    pub create: FnCreate,
    pub open: FnOpen,
    pub start: FnCall,
    pub encode: FnEncode,
    pub force_idr: FnCall,
    pub stop: FnCall,
    pub destroy: FnDestroy,
}

/// # Safety
/// `T` must be the function pointer type of the exported symbol.
unsafe fn symbol<T: Copy>(lib: &libloading::Library, prefix: &str, name: &str) -> Result<T> {
    let full = format!("{}_{}", prefix, name);
    // SAFETY: upheld by the caller.
    let sym = unsafe { lib.get::<T>(full.as_bytes()) }
        .map_err(|e| EncoderError::binding(format!("failed to load {}: {}", full, e)))?;
    Ok(*sym)
}

impl AccelLib {
    /// Load a shim and resolve every `<prefix>_*` entry point
    pub fn load_from_path(path: &Path, prefix: &str) -> Result<Self> {
        // SAFETY: the shim is a vendor-managed library and the pointer types
        // match the entry-point set above. The pointers are copied out while
        // `lib` is alive and `lib` is stored next to them.
        unsafe {
            let lib = libloading::Library::new(path).map_err(|e| {
                EncoderError::binding(format!("load {} error: {}", path.display(), e))
            })?;

            Ok(Self {
                create: symbol(&lib, prefix, "create")?,
                open: symbol(&lib, prefix, "open")?,
                start: symbol(&lib, prefix, "start")?,
                encode: symbol(&lib, prefix, "encode")?,
                force_idr: symbol(&lib, prefix, "force_idr")?,
                stop: symbol(&lib, prefix, "stop")?,
                destroy: symbol(&lib, prefix, "destroy")?,
                _lib: lib,
            })
        }
    }
}

// SAFETY: AccelLib only holds the library handle and plain function
// pointers; contexts created through them are owned by single sessions.
unsafe impl Send for AccelLib {}
unsafe impl Sync for AccelLib {}

/// An accelerator vendor: where its shim lives and its process-wide binding
pub struct AccelFamily {
    pub name: &'static str,
    pub symbol_prefix: &'static str,
    pub env_var: &'static str,
    pub candidates: &'static [&'static str],
    binding: LazyBinding<AccelLib>,
}

impl AccelFamily {
    pub const fn new(
        name: &'static str,
        symbol_prefix: &'static str,
        env_var: &'static str,
        candidates: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            symbol_prefix,
            env_var,
            candidates,
            binding: LazyBinding::new(name),
        }
    }

    /// Bind the shim once per process
    pub fn api(&self, explicit: Option<PathBuf>) -> Result<Arc<AccelLib>> {
        self.binding.get_or_load(|| {
            let search = LibrarySearch {
                explicit,
                env_var: Some(self.env_var),
                candidates: self.candidates,
            };
            search.load_first(self.name, |path| {
                AccelLib::load_from_path(path, self.symbol_prefix)
            })
        })
    }

    pub fn is_available(&self, explicit: Option<PathBuf>) -> bool {
        self.api(explicit).is_ok()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_bound()
    }
}

/// One codec of an accelerator family
#[derive(Clone)]
pub struct AccelBackend {
    family: &'static AccelFamily,
    name: &'static str,
    codec: Codec,
    bounds: ParamBounds,
    library: Option<PathBuf>,
}

impl AccelBackend {
    pub fn new(
        family: &'static AccelFamily,
        name: &'static str,
        codec: Codec,
        bounds: ParamBounds,
    ) -> Self {
        Self {
            family,
            name,
            codec,
            bounds,
            library: None,
        }
    }

    /// Prefer `path` over the environment and default names
    pub fn with_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.library = Some(path.into());
        self
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn family(&self) -> &'static AccelFamily {
        self.family
    }
}

impl std::fmt::Debug for AccelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccelBackend")
            .field("name", &self.name)
            .field("codec", &self.codec)
            .field("library", &self.library)
            .finish()
    }
}

fn codec_id(codec: Codec) -> c_int {
    match codec {
        Codec::H264 => 0,
        Codec::H265 => 1,
    }
}

impl NativeBackend for AccelBackend {
    type Session = AccelSession;

    fn name(&self) -> &'static str {
        self.name
    }

    fn bounds(&self) -> &ParamBounds {
        &self.bounds
    }

    fn bind(&self) -> Result<()> {
        self.family.api(self.library.clone()).map(|_| ())
    }

    fn open(&self, params: &EncodeParams) -> Result<AccelSession> {
        let lib = self.family.api(self.library.clone())?;

        let mut ctx: *mut c_void = ptr::null_mut();
        // SAFETY: `create` writes a fresh context pointer into `ctx`.
        let ret = unsafe { (lib.create)(codec_id(self.codec), &mut ctx) };
        if ret != 0 || ctx.is_null() {
            return Err(EncoderError::native("create", ret));
        }

        // Drop destroys the context if open fails.
        let session = AccelSession {
            lib,
            ctx,
            started: false,
            name: self.name,
        };

        let native = AccelParams::from(params);
        // SAFETY: valid context; the shim copies `native`.
        let ret = unsafe { (session.lib.open)(session.ctx, &native) };
        if ret != 0 {
            return Err(EncoderError::native("open", ret));
        }

        debug!("{} context opened: {:?}", self.name, native);
        Ok(session)
    }
}

/// One accelerator encoder context
pub struct AccelSession {
    lib: Arc<AccelLib>,
    ctx: *mut c_void,
    started: bool,
    name: &'static str,
}

// SAFETY: the context is only reached through `&mut self`.
unsafe impl Send for AccelSession {}

impl NativeSession for AccelSession {
    fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        // SAFETY: valid context.
        let ret = unsafe { (self.lib.start)(self.ctx) };
        if ret != 0 {
            return Err(EncoderError::native("start", ret));
        }
        self.started = true;
        info!("{} device resources allocated", self.name);
        Ok(())
    }

    fn encode(&mut self, frame: &I420Planes<'_>) -> Result<Bitstream<'_>> {
        let input = AccelFrame::from_planes(frame);
        let mut packet = AccelPacket::default();
        // SAFETY: the planes outlive the call; `packet` is writable.
        let ret = unsafe { (self.lib.encode)(self.ctx, &input, &mut packet) };
        if ret != 0 {
            return Err(EncoderError::native("encode", ret));
        }

        if packet.data.is_null() || packet.len == 0 {
            return Ok(Bitstream::empty());
        }
        // SAFETY: the shim owns the packet until the next call on this
        // context, which needs `&mut self` again.
        let data = unsafe { std::slice::from_raw_parts(packet.data, packet.len) };
        Ok(Bitstream::new(data, packet.keyframe != 0))
    }

    fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        // SAFETY: valid, started context.
        let ret = unsafe { (self.lib.stop)(self.ctx) };
        if ret != 0 {
            return Err(EncoderError::native("stop", ret));
        }
        self.started = false;
        Ok(())
    }

    fn force_key_frame(&mut self) -> Result<()> {
        // SAFETY: valid context.
        let ret = unsafe { (self.lib.force_idr)(self.ctx) };
        if ret != 0 {
            return Err(EncoderError::native("force_idr", ret));
        }
        Ok(())
    }
}

impl Drop for AccelSession {
    fn drop(&mut self) {
        if self.started {
            if let Err(e) = self.stop() {
                warn!("{} stop during release failed: {}", self.name, e);
            }
        }
        // SAFETY: context came from this library's `create` and is destroyed
        // exactly once.
        unsafe { (self.lib.destroy)(self.ctx) };
        self.ctx = ptr::null_mut();
    }
}
