//! Integration tests for parameter validation

use videnc_core::{EncodeParams, EncoderType, ParamBounds, ParamError, Profile, validate};

fn software(params: EncodeParams) -> Result<(), ParamError> {
    validate(&params, &ParamBounds::SOFTWARE_H264)
}

fn field(params: EncodeParams) -> &'static str {
    software(params).unwrap_err().field()
}

#[test]
fn test_software_bounds_inclusive() {
    let base = EncodeParams::default();
    assert!(software(EncodeParams::new(16, 16)).is_ok());
    assert!(software(EncodeParams::new(4096, 4096)).is_ok());
    assert!(software(base.with_frame_rate(60)).is_ok());
    assert!(software(base.with_bitrate(1_000_000)).is_ok());
    assert!(software(base.with_bitrate(10_000_000)).is_ok());
    assert!(software(base.with_gop_size(30)).is_ok());
    assert!(software(base.with_gop_size(3000)).is_ok());
    for profile in Profile::ALL {
        assert!(software(base.with_profile(profile)).is_ok());
    }
}

#[test]
fn test_software_bounds_one_unit_outside() {
    let base = EncodeParams::default();
    assert_eq!(field(EncodeParams::new(15, 720)), "resolution");
    assert_eq!(field(EncodeParams::new(1280, 15)), "resolution");
    assert_eq!(field(EncodeParams::new(4097, 720)), "resolution");
    assert_eq!(field(EncodeParams::new(1280, 4097)), "resolution");
    assert_eq!(field(base.with_frame_rate(29)), "frame_rate");
    assert_eq!(field(base.with_frame_rate(31)), "frame_rate");
    assert_eq!(field(base.with_frame_rate(61)), "frame_rate");
    assert_eq!(field(base.with_bitrate(999_999)), "bitrate");
    assert_eq!(field(base.with_bitrate(10_000_001)), "bitrate");
    assert_eq!(field(base.with_gop_size(29)), "gop_size");
    assert_eq!(field(base.with_gop_size(3001)), "gop_size");
}

#[test]
fn test_error_names_offending_value() {
    let err = software(EncodeParams::default().with_bitrate(500)).unwrap_err();
    assert_eq!(
        err,
        ParamError::Bitrate {
            value: 500,
            min: 1_000_000,
            max: 10_000_000
        }
    );
    assert!(err.to_string().contains("[500]"));

    let err = software(EncodeParams::default().with_frame_rate(24)).unwrap_err();
    assert!(err.to_string().contains("[24]"));
}

#[test]
fn test_hardware_frame_rates() {
    let params = EncodeParams::new(1920, 1080);
    for fps in [24, 25, 30, 50, 60] {
        assert!(validate(&params.with_frame_rate(fps), &ParamBounds::NETINT_H264).is_ok());
        assert!(validate(&params.with_frame_rate(fps), &ParamBounds::VPE_H264).is_ok());
    }
    assert!(validate(&params.with_frame_rate(120), &ParamBounds::NETINT_H264).is_err());
}

#[test]
fn test_hardware_dimension_ceilings() {
    let params = EncodeParams::new(8192, 8192).with_profile(Profile::Main);
    assert!(validate(&params, &ParamBounds::NETINT_H265).is_ok());
    assert!(validate(&params, &ParamBounds::VPE_H265).is_err());
    assert!(validate(&EncodeParams::new(8193, 720), &ParamBounds::NETINT_H264).is_err());
}

#[test]
fn test_h265_profiles() {
    let high = EncodeParams::new(1920, 1080).with_profile(Profile::High);
    for bounds in [ParamBounds::NETINT_H265, ParamBounds::VPE_H265] {
        assert_eq!(
            validate(&high, &bounds).unwrap_err(),
            ParamError::Profile("high".to_string())
        );
        assert!(validate(&high.with_profile(Profile::Main), &bounds).is_ok());
    }
}

#[test]
fn test_bounds_for_every_type() {
    for ty in EncoderType::ALL {
        let bounds = videnc_core::factory::bounds(ty);
        assert!(bounds.min_dimension <= bounds.max_dimension);
        assert!(bounds.min_bitrate <= bounds.max_bitrate);
        assert!(!bounds.frame_rates.is_empty());
    }
}
