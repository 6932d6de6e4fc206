//! Raw FFI bindings for the OpenH264 encoder
//!
//! The library is loaded at runtime from libopenh264.so. Only the two
//! factory symbols are exported as plain C functions; everything else goes
//! through the `ISVCEncoder` vtable.
//!
//! OpenH264 2.6 appended PSNR fields to several structs. `SEncParamExt` and
//! `SSourcePicture` are declared with the 2.6 layout, which older libraries
//! read as a prefix. `SFrameBSInfo` changes in the middle, so both layouts are
//! kept and selected by the detected [`Abi`].

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(dead_code)]

use std::ffi::c_void;
use std::path::Path;

use libc::{c_int, c_longlong, c_uchar, c_uint, c_ushort};

use crate::error::{EncoderError, Result};

pub type EVideoFormatType = c_int;
pub type EVideoFrameType = c_int;
pub type ENCODER_OPTION = c_int;
pub type EUsageType = c_int;
pub type ECOMPLEXITY_MODE = c_int;
pub type RC_MODES = c_int;
pub type EParameterSetStrategy = c_int;
pub type EProfileIdc = c_int;
pub type ELevelIdc = c_int;
pub type ESampleAspectRatio = c_int;
pub type SliceModeEnum = c_int;

pub const VIDEO_FORMAT_I420: EVideoFormatType = 23;

pub const VIDEO_FRAME_TYPE_INVALID: EVideoFrameType = 0;
pub const VIDEO_FRAME_TYPE_IDR: EVideoFrameType = 1;
pub const VIDEO_FRAME_TYPE_I: EVideoFrameType = 2;
pub const VIDEO_FRAME_TYPE_P: EVideoFrameType = 3;
pub const VIDEO_FRAME_TYPE_SKIP: EVideoFrameType = 4;

pub const ENCODER_OPTION_DATAFORMAT: ENCODER_OPTION = 0;

pub const CAMERA_VIDEO_REAL_TIME: EUsageType = 0;
pub const RC_BITRATE_MODE: RC_MODES = 1;
pub const CONSTANT_ID: EParameterSetStrategy = 0;
pub const HIGH_COMPLEXITY: ECOMPLEXITY_MODE = 2;
pub const SM_SINGLE_SLICE: SliceModeEnum = 0;

pub const PRO_BASELINE: EProfileIdc = 66;
pub const PRO_MAIN: EProfileIdc = 77;
pub const PRO_HIGH: EProfileIdc = 100;

pub const LEVEL_3_2: ELevelIdc = 32;

pub const MAX_LAYER_NUM_OF_FRAME: usize = 128;

/// OpenH264 version struct
#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct OpenH264Version {
    pub uMajor: c_uint,
    pub uMinor: c_uint,
    pub uRevision: c_uint,
    pub uReserved: c_uint,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct SSliceArgument {
    pub uiSliceMode: SliceModeEnum,
    pub uiSliceNum: c_uint,
    pub uiSliceMbNum: [c_uint; 35],
    pub uiSliceSizeConstraint: c_uint,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct SSpatialLayerConfig {
    pub iVideoWidth: c_int,
    pub iVideoHeight: c_int,
    pub fFrameRate: f32,
    pub iSpatialBitrate: c_int,
    pub iMaxSpatialBitrate: c_int,
    pub uiProfileIdc: EProfileIdc,
    pub uiLevelIdc: ELevelIdc,
    pub iDLayerQp: c_int,
    pub sSliceArgument: SSliceArgument,
    pub bVideoSignalTypePresent: bool,
    pub uiVideoFormat: c_uchar,
    pub bFullRange: bool,
    pub bColorDescriptionPresent: bool,
    pub uiColorPrimaries: c_uchar,
    pub uiTransferCharacteristics: c_uchar,
    pub uiColorMatrix: c_uchar,
    pub bAspectRatioPresent: bool,
    pub eAspectRatio: ESampleAspectRatio,
    pub sAspectRatioExtWidth: c_ushort,
    pub sAspectRatioExtHeight: c_ushort,
}

/// Extended encoder parameters (2.6 layout)
#[repr(C)]
#[derive(Clone)]
pub struct SEncParamExt {
    pub iUsageType: EUsageType,
    pub iPicWidth: c_int,
    pub iPicHeight: c_int,
    pub iTargetBitrate: c_int,
    pub iRCMode: RC_MODES,
    pub fMaxFrameRate: f32,
    pub iTemporalLayerNum: c_int,
    pub iSpatialLayerNum: c_int,
    pub sSpatialLayers: [SSpatialLayerConfig; 4],
    pub iComplexityMode: ECOMPLEXITY_MODE,
    pub uiIntraPeriod: c_uint,
    pub iNumRefFrame: c_int,
    pub eSpsPpsIdStrategy: EParameterSetStrategy,
    pub bPrefixNalAddingCtrl: bool,
    pub bEnableSSEI: bool,
    pub bSimulcastAVC: bool,
    pub iPaddingFlag: c_int,
    pub iEntropyCodingModeFlag: c_int,
    pub bEnableFrameSkip: bool,
    pub iMaxBitrate: c_int,
    pub iMaxQp: c_int,
    pub iMinQp: c_int,
    pub uiMaxNalSize: c_uint,
    pub bEnableLongTermReference: bool,
    pub iLTRRefNum: c_int,
    pub iLtrMarkPeriod: c_uint,
    pub iMultipleThreadIdc: c_ushort,
    pub bUseLoadBalancing: bool,
    pub iLoopFilterDisableIdc: c_int,
    pub iLoopFilterAlphaC0Offset: c_int,
    pub iLoopFilterBetaOffset: c_int,
    pub bEnableDenoise: bool,
    pub bEnableBackgroundDetection: bool,
    pub bEnableAdaptiveQuant: bool,
    pub bEnableFrameCroppingFlag: bool,
    pub bEnableSceneChangeDetect: bool,
    pub bIsLosslessLink: bool,
    pub bFixRCOverShoot: bool,
    pub iIdrBitrateRatio: c_int,
    pub bPsnrY: bool,
    pub bPsnrU: bool,
    pub bPsnrV: bool,
}

impl Default for SEncParamExt {
    fn default() -> Self {
        // SAFETY: plain-old-data C struct; all-zero is a valid bit pattern.
        unsafe { std::mem::zeroed() }
    }
}

/// Input picture (2.6 layout)
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct SSourcePicture {
    pub iColorFormat: c_int,
    pub iStride: [c_int; 4],
    pub pData: [*mut c_uchar; 4],
    pub iPicWidth: c_int,
    pub iPicHeight: c_int,
    pub uiTimeStamp: c_longlong,
    pub bPsnrY: bool,
    pub bPsnrU: bool,
    pub bPsnrV: bool,
}

impl Default for SSourcePicture {
    fn default() -> Self {
        // SAFETY: null pointers and zero integers are valid for every field.
        unsafe { std::mem::zeroed() }
    }
}

/// Frame-info layouts that differ between library generations
pub mod abi7 {
    use super::{EVideoFrameType, MAX_LAYER_NUM_OF_FRAME};
    use libc::{c_int, c_longlong, c_uchar};

    #[repr(C)]
    #[derive(Debug, Copy, Clone)]
    pub struct SLayerBSInfo {
        pub uiTemporalId: c_uchar,
        pub uiSpatialId: c_uchar,
        pub uiQualityId: c_uchar,
        pub eFrameType: EVideoFrameType,
        pub uiLayerType: c_uchar,
        pub iSubSeqId: c_int,
        pub iNalCount: c_int,
        pub pNalLengthInByte: *mut c_int,
        pub pBsBuf: *mut c_uchar,
    }

    #[repr(C)]
    pub struct SFrameBSInfo {
        pub iLayerNum: c_int,
        pub sLayerInfo: [SLayerBSInfo; MAX_LAYER_NUM_OF_FRAME],
        pub eFrameType: EVideoFrameType,
        pub iFrameSizeInBytes: c_int,
        pub uiTimeStamp: c_longlong,
    }
}

pub mod abi8 {
    use super::{EVideoFrameType, MAX_LAYER_NUM_OF_FRAME};
    use libc::{c_int, c_longlong, c_uchar};

    #[repr(C)]
    #[derive(Debug, Copy, Clone)]
    pub struct SLayerBSInfo {
        pub uiTemporalId: c_uchar,
        pub uiSpatialId: c_uchar,
        pub uiQualityId: c_uchar,
        pub eFrameType: EVideoFrameType,
        pub uiLayerType: c_uchar,
        pub iSubSeqId: c_int,
        pub iNalCount: c_int,
        pub pNalLengthInByte: *mut c_int,
        pub pBsBuf: *mut c_uchar,
        pub rPsnr: [f32; 3],
    }

    #[repr(C)]
    pub struct SFrameBSInfo {
        pub iLayerNum: c_int,
        pub sLayerInfo: [SLayerBSInfo; MAX_LAYER_NUM_OF_FRAME],
        pub eFrameType: EVideoFrameType,
        pub iFrameSizeInBytes: c_int,
        pub uiTimeStamp: c_longlong,
    }
}

/// Struct layout generation of the loaded library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abi {
    /// 2.3.x through 2.5.x
    Abi7,
    /// 2.6.0 and later
    Abi8,
}

impl Abi {
    /// Map a library version to its struct layout
    pub fn from_version(major: u32, minor: u32) -> Result<Self> {
        match (major, minor) {
            (0 | 1, _) | (2, 0..=2) => Err(EncoderError::binding(format!(
                "OpenH264 {}.{} is too old (minimum 2.3)",
                major, minor
            ))),
            (2, 3..=5) => Ok(Self::Abi7),
            _ => Ok(Self::Abi8),
        }
    }
}

impl std::fmt::Display for Abi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Abi::Abi7 => write!(f, "ABI 7"),
            Abi::Abi8 => write!(f, "ABI 8"),
        }
    }
}

/// Output buffer for `EncodeFrame`, in the layout the library expects
pub enum FrameInfo {
    Abi7(Box<abi7::SFrameBSInfo>),
    Abi8(Box<abi8::SFrameBSInfo>),
}

/// Location of one encoded frame inside library-owned memory
#[derive(Debug, Clone, Copy)]
pub struct EncodedOutput {
    pub data: *const u8,
    pub len: usize,
    pub frame_type: EVideoFrameType,
}

impl FrameInfo {
    pub fn new(abi: Abi) -> Self {
        // SAFETY: both layouts are plain C structs of integers and pointers;
        // all-zero is their documented initial state.
        match abi {
            Abi::Abi7 => Self::Abi7(Box::new(unsafe { std::mem::zeroed() })),
            Abi::Abi8 => Self::Abi8(Box::new(unsafe { std::mem::zeroed() })),
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        match self {
            Self::Abi7(info) => info.as_mut() as *mut abi7::SFrameBSInfo as *mut c_void,
            Self::Abi8(info) => info.as_mut() as *mut abi8::SFrameBSInfo as *mut c_void,
        }
    }

    /// All layers of a frame are written back to back starting at the first
    /// layer's buffer, so the frame is one contiguous range.
    pub fn output(&self) -> EncodedOutput {
        match self {
            Self::Abi7(info) => EncodedOutput {
                data: info.sLayerInfo[0].pBsBuf,
                len: info.iFrameSizeInBytes.max(0) as usize,
                frame_type: info.eFrameType,
            },
            Self::Abi8(info) => EncodedOutput {
                data: info.sLayerInfo[0].pBsBuf,
                len: info.iFrameSizeInBytes.max(0) as usize,
                frame_type: info.eFrameType,
            },
        }
    }
}

/// Opaque encoder handle: a pointer to the vtable pointer
pub type ISVCEncoder = *const ISVCEncoderVtbl;

/// `ISVCEncoder` vtable, identical across supported versions
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct ISVCEncoderVtbl {
    pub Initialize:
        Option<unsafe extern "C" fn(encoder: *mut ISVCEncoder, pParam: *const c_void) -> c_int>,
    pub InitializeExt:
        Option<unsafe extern "C" fn(encoder: *mut ISVCEncoder, pParam: *const c_void) -> c_int>,
    pub GetDefaultParams:
        Option<unsafe extern "C" fn(encoder: *mut ISVCEncoder, pParam: *mut c_void) -> c_int>,
    pub Uninitialize: Option<unsafe extern "C" fn(encoder: *mut ISVCEncoder) -> c_int>,
    pub EncodeFrame: Option<
        unsafe extern "C" fn(
            encoder: *mut ISVCEncoder,
            kpSrcPic: *const c_void,
            pBsInfo: *mut c_void,
        ) -> c_int,
    >,
    pub EncodeParameterSets:
        Option<unsafe extern "C" fn(encoder: *mut ISVCEncoder, pBsInfo: *mut c_void) -> c_int>,
    pub ForceIntraFrame:
        Option<unsafe extern "C" fn(encoder: *mut ISVCEncoder, bIDR: bool) -> c_int>,
    pub SetOption: Option<
        unsafe extern "C" fn(
            encoder: *mut ISVCEncoder,
            eOptionId: ENCODER_OPTION,
            pOption: *mut c_void,
        ) -> c_int,
    >,
    pub GetOption: Option<
        unsafe extern "C" fn(
            encoder: *mut ISVCEncoder,
            eOptionId: ENCODER_OPTION,
            pOption: *mut c_void,
        ) -> c_int,
    >,
}

pub type FnWelsCreateSVCEncoder = unsafe extern "C" fn(ppEncoder: *mut *mut ISVCEncoder) -> c_int;
pub type FnWelsDestroySVCEncoder = unsafe extern "C" fn(pEncoder: *mut ISVCEncoder);
pub type FnWelsGetCodecVersion = unsafe extern "C" fn() -> OpenH264Version;

/// Library names tried after any explicit or environment override
pub const OPENH264_LIB_PATHS: &[&str] = &[
    "libopenh264.so",
    "libopenh264.so.8",
    "libopenh264.so.7",
    "/usr/lib/x86_64-linux-gnu/libopenh264.so.7",
    "/usr/lib64/libopenh264.so.7",
    "/usr/lib/libopenh264.so",
];

/// Dynamically loaded OpenH264 library
pub struct OpenH264Lib {
    _lib: libloading::Library,
    pub create: FnWelsCreateSVCEncoder,
    pub destroy: FnWelsDestroySVCEncoder,
    pub version: Option<(u32, u32, u32)>,
    pub abi: Abi,
}

impl OpenH264Lib {
    /// Load the library from a specific path
    ///
    /// Every required symbol is resolved before the table is returned.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        // SAFETY: OpenH264 is a system-managed codec library; the function
        // pointer types match its C API. The pointers are copied out while
        // `lib` is alive and `lib` is stored next to them.
        unsafe {
            let lib = libloading::Library::new(path).map_err(|e| {
                EncoderError::binding(format!("load {} error: {}", path.display(), e))
            })?;

            let create: FnWelsCreateSVCEncoder = *lib
                .get::<FnWelsCreateSVCEncoder>(b"WelsCreateSVCEncoder")
                .map_err(|e| EncoderError::binding(format!("failed to load WelsCreateSVCEncoder: {}", e)))?;

            let destroy: FnWelsDestroySVCEncoder = *lib
                .get::<FnWelsDestroySVCEncoder>(b"WelsDestroySVCEncoder")
                .map_err(|e| EncoderError::binding(format!("failed to load WelsDestroySVCEncoder: {}", e)))?;

            let version = lib
                .get::<FnWelsGetCodecVersion>(b"WelsGetCodecVersion")
                .ok()
                .map(|get_version| {
                    let v = get_version();
                    (v.uMajor, v.uMinor, v.uRevision)
                });

            let abi = match version {
                Some((major, minor, _)) => Abi::from_version(major, minor)?,
                None => {
                    tracing::warn!("WelsGetCodecVersion missing in {}, assuming ABI 7", path.display());
                    Abi::Abi7
                }
            };

            Ok(Self {
                _lib: lib,
                create,
                destroy,
                version,
                abi,
            })
        }
    }

    pub fn version_string(&self) -> String {
        match self.version {
            Some((major, minor, rev)) => format!("{}.{}.{} ({})", major, minor, rev, self.abi),
            None => format!("unknown ({})", self.abi),
        }
    }
}

// SAFETY: OpenH264Lib only holds the library handle and plain function
// pointers; the handle keeps the pointers valid and the factory functions
// have no thread affinity.
unsafe impl Send for OpenH264Lib {}
unsafe impl Sync for OpenH264Lib {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_from_version() {
        assert_eq!(Abi::from_version(2, 3).unwrap(), Abi::Abi7);
        assert_eq!(Abi::from_version(2, 5).unwrap(), Abi::Abi7);
        assert_eq!(Abi::from_version(2, 6).unwrap(), Abi::Abi8);
        assert_eq!(Abi::from_version(3, 0).unwrap(), Abi::Abi8);
        assert!(Abi::from_version(2, 2).is_err());
        assert!(Abi::from_version(1, 9).is_err());
    }

    #[test]
    fn test_empty_frame_info_reports_no_data() {
        for abi in [Abi::Abi7, Abi::Abi8] {
            let info = FrameInfo::new(abi);
            let out = info.output();
            assert!(out.data.is_null());
            assert_eq!(out.len, 0);
            assert_eq!(out.frame_type, VIDEO_FRAME_TYPE_INVALID);
        }
    }

    #[test]
    fn test_abi8_layer_is_larger() {
        assert!(
            std::mem::size_of::<abi8::SFrameBSInfo>() > std::mem::size_of::<abi7::SFrameBSInfo>()
        );
    }
}
