//! OpenH264 software H.264 encoder
//!
//! libopenh264 is opened on first use and shared by every software encoder
//! in the process. Each session owns one `ISVCEncoder` configured for
//! single-layer real-time camera encoding with bitrate rate control.

pub mod sys;

use std::ffi::c_void;
use std::path::PathBuf;
use std::ptr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use self::sys::{ISVCEncoder, ISVCEncoderVtbl, OpenH264Lib, SEncParamExt, SSourcePicture};
use super::{NativeBackend, NativeSession};
use crate::binding::{LazyBinding, LibrarySearch};
use crate::encoder::LifecycleAdapter;
use crate::error::{EncoderError, Result};
use crate::frame::{Bitstream, I420Planes};
use crate::types::{EncodeParams, Profile};
use crate::validate::ParamBounds;

/// Environment variable overriding the library path
pub const LIBRARY_ENV: &str = "VIDENC_OPENH264_LIBRARY";

static OPENH264: LazyBinding<OpenH264Lib> = LazyBinding::new("libopenh264");

/// Software H.264 encoder handle
pub type OpenH264Encoder = LifecycleAdapter<OpenH264Backend>;

fn search(explicit: Option<PathBuf>) -> LibrarySearch {
    LibrarySearch {
        explicit,
        env_var: Some(LIBRARY_ENV),
        candidates: sys::OPENH264_LIB_PATHS,
    }
}

/// Bind libopenh264 once per process
pub fn api(explicit: Option<PathBuf>) -> Result<Arc<OpenH264Lib>> {
    OPENH264.get_or_load(|| {
        let lib = search(explicit).load_first("libopenh264", OpenH264Lib::load_from_path)?;
        info!("OpenH264 version {}", lib.version_string());
        Ok(lib)
    })
}

/// Check whether libopenh264 can be bound, binding it if needed
pub fn is_available(explicit: Option<PathBuf>) -> bool {
    api(explicit).is_ok()
}

/// Backend for the OpenH264 software encoder
#[derive(Debug, Clone, Default)]
pub struct OpenH264Backend {
    library: Option<PathBuf>,
}

impl OpenH264Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefer `path` over the environment and default names
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library: Some(path.into()),
        }
    }
}

impl NativeBackend for OpenH264Backend {
    type Session = OpenH264Session;

    fn name(&self) -> &'static str {
        "OpenH264"
    }

    fn bounds(&self) -> &ParamBounds {
        &ParamBounds::SOFTWARE_H264
    }

    fn bind(&self) -> Result<()> {
        if OPENH264.is_bound() && self.library.is_some() {
            debug!("libopenh264 already bound, ignoring explicit library path");
        }
        api(self.library.clone()).map(|_| ())
    }

    fn open(&self, params: &EncodeParams) -> Result<OpenH264Session> {
        let api = api(self.library.clone())?;
        OpenH264Session::open(api, params)
    }
}

fn profile_idc(profile: Profile) -> sys::EProfileIdc {
    match profile {
        Profile::Baseline => sys::PRO_BASELINE,
        Profile::Main => sys::PRO_MAIN,
        Profile::High => sys::PRO_HIGH,
    }
}

/// Fill `p` for single-layer real-time encoding of `params`
///
/// Fields not listed keep the library defaults from `GetDefaultParams`.
pub fn apply_params(p: &mut SEncParamExt, params: &EncodeParams) {
    let width = params.width as i32;
    let height = params.height as i32;
    let bitrate = params.bitrate as i32;
    let fps = params.frame_rate as f32;

    p.iUsageType = sys::CAMERA_VIDEO_REAL_TIME;
    p.iPicWidth = width;
    p.iPicHeight = height;
    p.iTargetBitrate = bitrate;
    p.iMaxBitrate = bitrate;
    p.iRCMode = sys::RC_BITRATE_MODE;
    p.fMaxFrameRate = fps;
    p.uiIntraPeriod = params.gop_size;

    p.iPaddingFlag = 0;
    p.iTemporalLayerNum = 1;
    p.iSpatialLayerNum = 1;
    p.eSpsPpsIdStrategy = sys::CONSTANT_ID;
    p.bPrefixNalAddingCtrl = false;
    p.bSimulcastAVC = false;
    p.bEnableDenoise = false;
    p.bEnableBackgroundDetection = true;
    p.bEnableSceneChangeDetect = true;
    p.bEnableAdaptiveQuant = false;
    p.bEnableFrameSkip = false;
    p.bEnableLongTermReference = false;
    p.iLtrMarkPeriod = 30;
    p.bIsLosslessLink = false;
    p.iComplexityMode = sys::HIGH_COMPLEXITY;
    p.iNumRefFrame = 1;
    p.iEntropyCodingModeFlag = 1;
    p.uiMaxNalSize = 0;
    p.iLTRRefNum = 0;
    p.iMultipleThreadIdc = 1;
    p.iLoopFilterDisableIdc = 0;

    let layer = &mut p.sSpatialLayers[0];
    layer.iVideoWidth = width;
    layer.iVideoHeight = height;
    layer.fFrameRate = fps;
    layer.iSpatialBitrate = bitrate;
    layer.iMaxSpatialBitrate = bitrate;
    layer.sSliceArgument.uiSliceMode = sys::SM_SINGLE_SLICE;
    layer.uiProfileIdc = profile_idc(params.profile);
    layer.uiLevelIdc = sys::LEVEL_3_2;
}

/// One `ISVCEncoder` instance
pub struct OpenH264Session {
    api: Arc<OpenH264Lib>,
    encoder: *mut ISVCEncoder,
    frame_info: sys::FrameInfo,
    timestamp_ms: i64,
    frame_interval_ms: i64,
}

// SAFETY: the encoder instance is only reached through `&mut self`, so it is
// never used from two threads at once; OpenH264 encoders have no thread
// affinity.
unsafe impl Send for OpenH264Session {}

impl OpenH264Session {
    fn open(api: Arc<OpenH264Lib>, params: &EncodeParams) -> Result<Self> {
        let mut encoder: *mut ISVCEncoder = ptr::null_mut();
        // SAFETY: `create` writes a fresh instance pointer into `encoder`.
        let ret = unsafe { (api.create)(&mut encoder) };
        if ret != 0 || encoder.is_null() {
            return Err(EncoderError::native("WelsCreateSVCEncoder", ret));
        }

        let frame_info = sys::FrameInfo::new(api.abi);
        // From here on Drop releases the instance on any error.
        let mut session = Self {
            api,
            encoder,
            frame_info,
            timestamp_ms: 0,
            frame_interval_ms: (1000 / params.frame_rate.max(1)) as i64,
        };
        session.configure(params)?;
        Ok(session)
    }

    fn vtable(&self) -> &ISVCEncoderVtbl {
        // SAFETY: `encoder` is non-null and points at the instance's vtable
        // pointer for the whole life of the session.
        unsafe { &**self.encoder }
    }

    fn configure(&mut self, params: &EncodeParams) -> Result<()> {
        let vtbl = *self.vtable();
        let get_defaults = vtbl
            .GetDefaultParams
            .ok_or_else(|| EncoderError::binding("ISVCEncoder::GetDefaultParams missing"))?;
        let initialize = vtbl
            .InitializeExt
            .ok_or_else(|| EncoderError::binding("ISVCEncoder::InitializeExt missing"))?;
        let set_option = vtbl
            .SetOption
            .ok_or_else(|| EncoderError::binding("ISVCEncoder::SetOption missing"))?;

        let mut p = SEncParamExt::default();
        // SAFETY: `p` is a writable SEncParamExt in the layout of this library
        // generation or a superset of it.
        let ret = unsafe { get_defaults(self.encoder, &mut p as *mut SEncParamExt as *mut c_void) };
        if ret != 0 {
            return Err(EncoderError::native("GetDefaultParams", ret));
        }

        apply_params(&mut p, params);

        // SAFETY: as above; the library copies what it needs.
        let ret = unsafe { initialize(self.encoder, &p as *const SEncParamExt as *const c_void) };
        if ret != 0 {
            return Err(EncoderError::native("InitializeExt", ret));
        }

        let mut format: libc::c_int = sys::VIDEO_FORMAT_I420;
        // SAFETY: DATAFORMAT takes a pointer to an int format id.
        let ret = unsafe {
            set_option(
                self.encoder,
                sys::ENCODER_OPTION_DATAFORMAT,
                &mut format as *mut libc::c_int as *mut c_void,
            )
        };
        if ret != 0 {
            return Err(EncoderError::native("SetOption(DATAFORMAT)", ret));
        }

        debug!(
            "OpenH264 configured: {}x{} @ {} fps, {} bps, gop {}, profile {}",
            params.width, params.height, params.frame_rate, params.bitrate, params.gop_size, params.profile
        );
        Ok(())
    }
}

impl NativeSession for OpenH264Session {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn encode(&mut self, frame: &I420Planes<'_>) -> Result<Bitstream<'_>> {
        let encode_frame = self
            .vtable()
            .EncodeFrame
            .ok_or_else(|| EncoderError::binding("ISVCEncoder::EncodeFrame missing"))?;

        let mut src = SSourcePicture {
            iColorFormat: sys::VIDEO_FORMAT_I420,
            iPicWidth: frame.width as i32,
            iPicHeight: frame.height as i32,
            uiTimeStamp: self.timestamp_ms,
            ..Default::default()
        };
        src.iStride[0] = frame.y_stride as i32;
        src.iStride[1] = frame.uv_stride as i32;
        src.iStride[2] = frame.uv_stride as i32;
        // The library only reads from the source planes.
        src.pData[0] = frame.y.as_ptr() as *mut u8;
        src.pData[1] = frame.u.as_ptr() as *mut u8;
        src.pData[2] = frame.v.as_ptr() as *mut u8;

        let info = self.frame_info.as_mut_ptr();
        // SAFETY: the planes outlive the call and match the configured
        // resolution; `info` has the layout the library was detected with.
        let ret = unsafe {
            encode_frame(
                self.encoder,
                &src as *const SSourcePicture as *const c_void,
                info,
            )
        };
        if ret != 0 {
            return Err(EncoderError::native("EncodeFrame", ret));
        }
        self.timestamp_ms += self.frame_interval_ms;

        let out = self.frame_info.output();
        if out.frame_type == sys::VIDEO_FRAME_TYPE_SKIP || out.len == 0 || out.data.is_null() {
            return Ok(Bitstream::empty());
        }

        let keyframe = matches!(
            out.frame_type,
            sys::VIDEO_FRAME_TYPE_IDR | sys::VIDEO_FRAME_TYPE_I
        );
        // SAFETY: the library owns this buffer until the next EncodeFrame on
        // this instance, which needs `&mut self` again.
        let data = unsafe { std::slice::from_raw_parts(out.data, out.len) };
        Ok(Bitstream::new(data, keyframe))
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn force_key_frame(&mut self) -> Result<()> {
        let force = self
            .vtable()
            .ForceIntraFrame
            .ok_or_else(|| EncoderError::binding("ISVCEncoder::ForceIntraFrame missing"))?;
        // SAFETY: valid instance, plain bool argument.
        let ret = unsafe { force(self.encoder, true) };
        if ret != 0 {
            return Err(EncoderError::native("ForceIntraFrame", ret));
        }
        Ok(())
    }
}

impl Drop for OpenH264Session {
    fn drop(&mut self) {
        if self.encoder.is_null() {
            return;
        }
        match self.vtable().Uninitialize {
            // SAFETY: valid instance; Uninitialize tolerates an instance that
            // was never initialized.
            Some(uninit) => unsafe {
                uninit(self.encoder);
            },
            None => warn!("ISVCEncoder::Uninitialize missing"),
        }
        // SAFETY: instance came from WelsCreateSVCEncoder of the same library.
        unsafe { (self.api.destroy)(self.encoder) };
        self.encoder = ptr::null_mut();
    }
}
