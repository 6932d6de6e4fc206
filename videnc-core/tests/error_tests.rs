//! Integration tests for error handling

use videnc_core::error::{EncoderError, Operation, ResultCode, ResultExt};
use videnc_core::{EncodeParams, ParamBounds, validate};

#[test]
fn test_every_operation_has_its_code() {
    let expected = [
        (Operation::Create, 0x0A01),
        (Operation::Destroy, 0x0A02),
        (Operation::Init, 0x0A03),
        (Operation::Start, 0x0A04),
        (Operation::Encode, 0x0A05),
        (Operation::Stop, 0x0A06),
        (Operation::Reset, 0x0A07),
        (Operation::ForceKeyFrame, 0x0A08),
        (Operation::SetParams, 0x0A09),
    ];
    for (op, code) in expected {
        let err = EncoderError::native("call", -1).during(op);
        assert_eq!(err.result_code().as_u32(), code);
        assert!(!err.result_code().is_success());
    }
    assert_eq!(ResultCode::Success.as_u32(), 0);
}

#[test]
fn test_result_ext_during() {
    let result: Result<(), EncoderError> = Err(EncoderError::binding("WelsCreateSVCEncoder missing"));
    let err = result.during(Operation::Init).unwrap_err();

    assert_eq!(err.operation(), Some(Operation::Init));
    let msg = format!("{}", err);
    assert!(msg.contains("init encoder failed"));
    assert!(msg.contains("WelsCreateSVCEncoder missing"));
}

#[test]
fn test_param_error_converts() {
    let param_err = validate(&EncodeParams::new(8, 8), &ParamBounds::SOFTWARE_H264).unwrap_err();
    let err: EncoderError = param_err.into();
    assert!(matches!(err, EncoderError::InvalidParams(_)));
    assert!(err.to_string().contains("[8x8]"));
    assert!(err.user_hint().is_some());
}

#[test]
fn test_nested_reset_inside_encode() {
    let err = EncoderError::native("InitializeExt", -1)
        .during(Operation::Init)
        .during(Operation::Reset)
        .during(Operation::Encode);

    assert_eq!(err.result_code(), ResultCode::EncodeFail);
    assert!(err.involves(Operation::Reset));
    assert!(err.involves(Operation::Init));
    assert!(!err.involves(Operation::Stop));
    assert!(matches!(
        err.root_cause(),
        EncoderError::Native {
            call: "InitializeExt",
            code: -1
        }
    ));
}

#[test]
fn test_error_source_chain() {
    use std::error::Error;

    let err = EncoderError::native("EncodeFrame", 4).during(Operation::Encode);
    let source = err.source().expect("wrapped cause");
    assert_eq!(source.to_string(), "EncodeFrame returned 4");
}

#[test]
fn test_user_hints() {
    assert!(EncoderError::binding("x").user_hint().is_some());
    assert!(
        EncoderError::InputTooSmall {
            actual: 1,
            expected: 2
        }
        .user_hint()
        .is_some()
    );
    assert!(EncoderError::native("EncodeFrame", -1).user_hint().is_none());
}
