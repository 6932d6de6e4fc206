//! C ABI exported from the `cdylib`
//!
//! Every function returns a [`ResultCode`] as `u32`. Handles are opaque
//! pointers produced by `videnc_create_encoder` and released by
//! `videnc_destroy_encoder`; a null handle passed to any other call reports
//! that call's failure code.

use std::ffi::{CString, c_char};
use std::ptr;

use tracing::error;

use crate::error::{EncoderError, Operation, Result, ResultCode};
use crate::factory::{self, EncoderHandle};
use crate::logging::{self, LogLevel};
use crate::types::{EncodeParams, Profile};

/// Opaque encoder handle
pub struct VidencEncoder {
    handle: EncoderHandle,
}

/// Encode parameters as laid out for C callers
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VidencEncodeParams {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub bitrate: u32,
    pub gop_size: u32,
    /// 0 = baseline, 1 = main, 2 = high
    pub profile: u32,
}

impl TryFrom<&VidencEncodeParams> for EncodeParams {
    type Error = EncoderError;

    fn try_from(p: &VidencEncodeParams) -> Result<Self> {
        let profile = Profile::from_u32(p.profile).ok_or_else(|| {
            EncoderError::InvalidParams(crate::validate::ParamError::Profile(format!(
                "profile code {}",
                p.profile
            )))
        })?;
        Ok(EncodeParams {
            width: p.width,
            height: p.height,
            frame_rate: p.frame_rate,
            bitrate: p.bitrate,
            gop_size: p.gop_size,
            profile,
        })
    }
}

pub type VidencLogCallback = extern "C" fn(level: u32, message: *const c_char);

fn report(op: Operation, result: Result<()>) -> u32 {
    match result {
        Ok(()) => ResultCode::Success.as_u32(),
        Err(e) => {
            // Adapter errors already carry their operation; raw ones get `op`.
            let code = if e.operation().is_some() {
                e.result_code()
            } else {
                op.failure_code()
            };
            code.as_u32()
        }
    }
}

/// # Safety
/// `encoder` must be null or a live handle from `videnc_create_encoder`.
unsafe fn handle_mut<'a>(encoder: *mut VidencEncoder) -> Option<&'a mut EncoderHandle> {
    // SAFETY: upheld by the caller.
    unsafe { encoder.as_mut() }.map(|e| &mut e.handle)
}

/// # Safety
/// `params` must be null or point at a readable `VidencEncodeParams`.
unsafe fn read_params(params: *const VidencEncodeParams) -> Result<EncodeParams> {
    // SAFETY: upheld by the caller.
    match unsafe { params.as_ref() } {
        Some(p) => EncodeParams::try_from(p),
        None => Err(EncoderError::NoParams),
    }
}

fn null_handle(op: Operation) -> u32 {
    error!("{}: null encoder handle", op);
    op.failure_code().as_u32()
}

/// Create an encoder for a wire type code
///
/// # Safety
/// `out` must be a writable pointer. On failure `*out` is set to null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn videnc_create_encoder(encoder_type: u32, out: *mut *mut VidencEncoder) -> u32 {
    if out.is_null() {
        return null_handle(Operation::Create);
    }
    match factory::create_encoder_from_code(encoder_type) {
        Ok(handle) => {
            let boxed = Box::new(VidencEncoder { handle });
            // SAFETY: `out` is non-null and writable per the contract.
            unsafe { *out = Box::into_raw(boxed) };
            ResultCode::Success.as_u32()
        }
        Err(e) => {
            error!("{}", e);
            // SAFETY: as above.
            unsafe { *out = ptr::null_mut() };
            e.result_code().as_u32()
        }
    }
}

/// Release an encoder; null is accepted
///
/// # Safety
/// `encoder` must be null or a handle not yet destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn videnc_destroy_encoder(encoder: *mut VidencEncoder) -> u32 {
    let handle = if encoder.is_null() {
        None
    } else {
        // SAFETY: the pointer came from Box::into_raw and ownership returns here.
        Some(unsafe { Box::from_raw(encoder) }.handle)
    };
    report(Operation::Destroy, factory::destroy_encoder(handle))
}

/// # Safety
/// `encoder` must be null or live; `params` must be null or readable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn videnc_init_encoder(
    encoder: *mut VidencEncoder,
    params: *const VidencEncodeParams,
) -> u32 {
    // SAFETY: forwarded caller contract.
    let Some(handle) = (unsafe { handle_mut(encoder) }) else {
        return null_handle(Operation::Init);
    };
    // SAFETY: forwarded caller contract.
    let result = unsafe { read_params(params) }.and_then(|p| handle.init_encoder(&p));
    report(Operation::Init, result)
}

/// # Safety
/// `encoder` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn videnc_start_encoder(encoder: *mut VidencEncoder) -> u32 {
    // SAFETY: forwarded caller contract.
    let Some(handle) = (unsafe { handle_mut(encoder) }) else {
        return null_handle(Operation::Start);
    };
    report(Operation::Start, handle.start_encoder())
}

/// Encode one I420 frame
///
/// On success `*out_data`/`*out_len` describe encoder-owned bytes that stay
/// valid until the next call on this handle.
///
/// # Safety
/// `input` must be readable for `input_len` bytes; `out_data` and `out_len`
/// must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn videnc_encode_one_frame(
    encoder: *mut VidencEncoder,
    input: *const u8,
    input_len: usize,
    out_data: *mut *const u8,
    out_len: *mut usize,
) -> u32 {
    // SAFETY: forwarded caller contract.
    let Some(handle) = (unsafe { handle_mut(encoder) }) else {
        return null_handle(Operation::Encode);
    };
    if input.is_null() || out_data.is_null() || out_len.is_null() {
        error!("encode frame: null buffer argument");
        return Operation::Encode.failure_code().as_u32();
    }

    // SAFETY: `input` is non-null and readable for `input_len` bytes.
    let frame = unsafe { std::slice::from_raw_parts(input, input_len) };
    match handle.encode_one_frame(frame) {
        Ok(bitstream) => {
            // SAFETY: both out pointers are non-null and writable.
            unsafe {
                *out_data = if bitstream.is_empty() {
                    ptr::null()
                } else {
                    bitstream.as_ptr()
                };
                *out_len = bitstream.len();
            }
            ResultCode::Success.as_u32()
        }
        Err(e) => e.result_code().as_u32(),
    }
}

/// # Safety
/// `encoder` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn videnc_stop_encoder(encoder: *mut VidencEncoder) -> u32 {
    // SAFETY: forwarded caller contract.
    let Some(handle) = (unsafe { handle_mut(encoder) }) else {
        return null_handle(Operation::Stop);
    };
    report(Operation::Stop, handle.stop_encoder())
}

/// # Safety
/// `encoder` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn videnc_reset_encoder(encoder: *mut VidencEncoder) -> u32 {
    // SAFETY: forwarded caller contract.
    let Some(handle) = (unsafe { handle_mut(encoder) }) else {
        return null_handle(Operation::Reset);
    };
    report(Operation::Reset, handle.reset_encoder())
}

/// # Safety
/// `encoder` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn videnc_force_key_frame(encoder: *mut VidencEncoder) -> u32 {
    // SAFETY: forwarded caller contract.
    let Some(handle) = (unsafe { handle_mut(encoder) }) else {
        return null_handle(Operation::ForceKeyFrame);
    };
    report(Operation::ForceKeyFrame, handle.force_key_frame())
}

/// # Safety
/// `encoder` must be null or live; `params` must be null or readable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn videnc_set_encode_params(
    encoder: *mut VidencEncoder,
    params: *const VidencEncodeParams,
) -> u32 {
    // SAFETY: forwarded caller contract.
    let Some(handle) = (unsafe { handle_mut(encoder) }) else {
        return null_handle(Operation::SetParams);
    };
    // SAFETY: forwarded caller contract.
    let result = unsafe { read_params(params) }.and_then(|p| handle.set_encode_params(&p));
    report(Operation::SetParams, result)
}

/// Route log messages to `callback`; null removes the current callback
#[unsafe(no_mangle)]
pub extern "C" fn videnc_register_log_callback(callback: Option<VidencLogCallback>) -> u32 {
    match callback {
        Some(callback) => logging::register_log_callback(move |level: LogLevel, message: &str| {
            let line = CString::new(message.replace('\0', " ")).unwrap_or_default();
            callback(level as u32, line.as_ptr());
        }),
        None => logging::clear_log_callback(),
    }
    ResultCode::Success.as_u32()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> VidencEncodeParams {
        VidencEncodeParams {
            width: 1280,
            height: 720,
            frame_rate: 30,
            bitrate: 4_000_000,
            gop_size: 60,
            profile: 2,
        }
    }

    #[test]
    fn test_create_and_destroy() {
        let mut encoder: *mut VidencEncoder = ptr::null_mut();
        unsafe {
            assert_eq!(videnc_create_encoder(0, &mut encoder), 0);
            assert!(!encoder.is_null());
            assert_eq!(videnc_destroy_encoder(encoder), 0);
        }
    }

    #[test]
    fn test_unknown_type_code() {
        let mut encoder: *mut VidencEncoder = ptr::null_mut();
        let code = unsafe { videnc_create_encoder(42, &mut encoder) };
        assert_eq!(code, ResultCode::CreateFail.as_u32());
        assert!(encoder.is_null());
    }

    #[test]
    fn test_null_handles() {
        unsafe {
            assert_eq!(videnc_destroy_encoder(ptr::null_mut()), 0);
            assert_eq!(
                videnc_start_encoder(ptr::null_mut()),
                ResultCode::StartFail.as_u32()
            );
            assert_eq!(
                videnc_force_key_frame(ptr::null_mut()),
                ResultCode::ForceKeyFrameFail.as_u32()
            );
        }
    }

    #[test]
    fn test_invalid_params_report_init_fail() {
        let mut encoder: *mut VidencEncoder = ptr::null_mut();
        unsafe {
            assert_eq!(videnc_create_encoder(0, &mut encoder), 0);

            let mut bad = params();
            bad.width = 8;
            assert_eq!(videnc_init_encoder(encoder, &bad), ResultCode::InitFail.as_u32());

            let mut bad_profile = params();
            bad_profile.profile = 7;
            assert_eq!(
                videnc_init_encoder(encoder, &bad_profile),
                ResultCode::InitFail.as_u32()
            );
            assert_eq!(
                videnc_init_encoder(encoder, ptr::null()),
                ResultCode::InitFail.as_u32()
            );
            assert_eq!(videnc_destroy_encoder(encoder), 0);
        }
    }

    #[test]
    fn test_set_params_before_init_is_accepted() {
        let mut encoder: *mut VidencEncoder = ptr::null_mut();
        unsafe {
            assert_eq!(videnc_create_encoder(0, &mut encoder), 0);
            assert_eq!(videnc_set_encode_params(encoder, &params()), 0);
            assert_eq!(videnc_destroy_encoder(encoder), 0);
        }
    }

    #[test]
    fn test_encode_before_init_is_encode_fail() {
        let mut encoder: *mut VidencEncoder = ptr::null_mut();
        let frame = vec![0u8; 1280 * 720 * 3 / 2];
        let mut out_data: *const u8 = ptr::null();
        let mut out_len: usize = 7;
        unsafe {
            assert_eq!(videnc_create_encoder(0, &mut encoder), 0);
            let code = videnc_encode_one_frame(
                encoder,
                frame.as_ptr(),
                frame.len(),
                &mut out_data,
                &mut out_len,
            );
            assert_eq!(code, ResultCode::EncodeFail.as_u32());
            assert_eq!(videnc_destroy_encoder(encoder), 0);
        }
        // Out pointers are only written on success.
        assert!(out_data.is_null());
        assert_eq!(out_len, 7);
    }

    #[test]
    fn test_encode_null_arguments() {
        let mut encoder: *mut VidencEncoder = ptr::null_mut();
        let frame = vec![0u8; 16];
        let mut out_data: *const u8 = ptr::null();
        let mut out_len: usize = 0;
        let fail = ResultCode::EncodeFail.as_u32();
        unsafe {
            assert_eq!(
                videnc_encode_one_frame(
                    ptr::null_mut(),
                    frame.as_ptr(),
                    frame.len(),
                    &mut out_data,
                    &mut out_len,
                ),
                fail
            );

            assert_eq!(videnc_create_encoder(0, &mut encoder), 0);
            assert_eq!(
                videnc_encode_one_frame(encoder, ptr::null(), 0, &mut out_data, &mut out_len),
                fail
            );
            assert_eq!(
                videnc_encode_one_frame(
                    encoder,
                    frame.as_ptr(),
                    frame.len(),
                    ptr::null_mut(),
                    &mut out_len,
                ),
                fail
            );
            assert_eq!(
                videnc_encode_one_frame(
                    encoder,
                    frame.as_ptr(),
                    frame.len(),
                    &mut out_data,
                    ptr::null_mut(),
                ),
                fail
            );
            assert_eq!(videnc_destroy_encoder(encoder), 0);
        }
    }

    #[test]
    fn test_create_with_null_out() {
        let code = unsafe { videnc_create_encoder(0, ptr::null_mut()) };
        assert_eq!(code, ResultCode::CreateFail.as_u32());
    }
}
