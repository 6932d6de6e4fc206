//! Integration tests for configuration system

use std::path::PathBuf;

use tempfile::TempDir;
use videnc_core::config::{ConfigFile, LibraryPaths, sample_config};
use videnc_core::{BackendFamily, EncoderError, EncoderType, Profile, ResultCode};

#[test]
fn test_default_path() {
    let path = ConfigFile::default_path();
    assert!(path.ends_with("videnc/config.toml"));
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = ConfigFile::default();
    config.defaults.encoder = EncoderType::NetintH265;
    config.defaults.profile = Profile::Main;
    config.defaults.bitrate = 12_000_000;
    config.libraries.netint = Some(PathBuf::from("/opt/netint/lib/libxcoder_enc.so"));

    config.save_to(path.clone()).unwrap();
    assert!(path.exists());

    let loaded = ConfigFile::load_from(path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.defaults.encode_params().bitrate, 12_000_000);
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let config = ConfigFile::load_from(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, ConfigFile::default());
}

#[test]
fn test_unreadable_config_is_io_error() {
    let dir = TempDir::new().unwrap();

    // A directory where the file should be.
    let err = ConfigFile::load_from(dir.path().to_path_buf()).unwrap_err();
    assert!(matches!(err, EncoderError::Io(_)));
    assert_eq!(err.result_code(), ResultCode::InitFail);
}

#[test]
fn test_create_default_if_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("videnc").join("config.toml");

    assert!(ConfigFile::create_default_if_missing(&path).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), sample_config());
    assert_eq!(ConfigFile::load_from(path.clone()).unwrap(), ConfigFile::default());

    std::fs::write(&path, "[defaults]\nwidth = 640\n").unwrap();
    assert!(!ConfigFile::create_default_if_missing(&path).unwrap());
    assert_eq!(ConfigFile::load_from(path.clone()).unwrap().defaults.width, 640);

    ConfigFile::write_sample_to(&path).unwrap();
    assert_eq!(ConfigFile::load_from(path).unwrap().defaults.width, 1280);
}

#[test]
fn test_load_invalid_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[defaults\nwidth = ").unwrap();

    let err = ConfigFile::load_from(path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
    assert!(err.user_hint().is_some());
}

#[test]
fn test_unknown_encoder_name_rejected() {
    let result: Result<ConfigFile, _> = toml::from_str("[defaults]\nencoder = \"x264\"\n");
    assert!(result.is_err());
}

#[test]
fn test_sample_config_matches_defaults() {
    let config: ConfigFile = toml::from_str(&sample_config()).unwrap();
    assert_eq!(config.defaults.encoder, EncoderType::OpenH264);
    assert_eq!(config.defaults.encode_params(), videnc_core::EncodeParams::default());
    assert_eq!(config.libraries, LibraryPaths::default());
}

#[test]
fn test_library_paths_by_family() {
    let libraries = LibraryPaths {
        openh264: Some(PathBuf::from("/usr/lib64/libopenh264.so.7")),
        ..Default::default()
    };
    assert!(libraries.get(BackendFamily::OpenH264).is_some());
    assert!(libraries.get(BackendFamily::Netint).is_none());
    assert!(libraries.get(BackendFamily::Vpe).is_none());
}
