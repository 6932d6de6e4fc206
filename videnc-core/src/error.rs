//! Error types for videnc
//!
//! Low-level causes (invalid parameters, binding failures, native status
//! codes) are wrapped into the lifecycle [`Operation`] that failed, and every
//! error collapses into a coarse [`ResultCode`] for the C surface.

use thiserror::Error;

use crate::encoder::EncoderState;
use crate::validate::ParamError;

/// Result type alias using EncoderError
pub type Result<T> = std::result::Result<T, EncoderError>;

/// Coarse result codes reported across the public contract
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success = 0,
    CreateFail = 0x0A01,
    DestroyFail = 0x0A02,
    InitFail = 0x0A03,
    StartFail = 0x0A04,
    EncodeFail = 0x0A05,
    StopFail = 0x0A06,
    ResetFail = 0x0A07,
    ForceKeyFrameFail = 0x0A08,
    SetParamsFail = 0x0A09,
}

impl ResultCode {
    /// Raw value as seen by C callers
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({:#x})", self, self.as_u32())
    }
}

/// Lifecycle operation an error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Destroy,
    Init,
    Start,
    Encode,
    Stop,
    Reset,
    ForceKeyFrame,
    SetParams,
}

impl Operation {
    /// Result code reported when this operation fails
    pub fn failure_code(self) -> ResultCode {
        match self {
            Self::Create => ResultCode::CreateFail,
            Self::Destroy => ResultCode::DestroyFail,
            Self::Init => ResultCode::InitFail,
            Self::Start => ResultCode::StartFail,
            Self::Encode => ResultCode::EncodeFail,
            Self::Stop => ResultCode::StopFail,
            Self::Reset => ResultCode::ResetFail,
            Self::ForceKeyFrame => ResultCode::ForceKeyFrameFail,
            Self::SetParams => ResultCode::SetParamsFail,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Create => "create encoder",
            Self::Destroy => "destroy encoder",
            Self::Init => "init encoder",
            Self::Start => "start encoder",
            Self::Encode => "encode frame",
            Self::Stop => "stop encoder",
            Self::Reset => "reset encoder",
            Self::ForceKeyFrame => "force key frame",
            Self::SetParams => "set encode params",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for encoder operations
#[derive(Debug, Error)]
pub enum EncoderError {
    /// Encode parameters outside the backend's bounds
    #[error("Invalid encode params: {0}")]
    InvalidParams(#[from] ParamError),

    /// Shared library or symbol could not be resolved
    #[error("Binding error: {0}")]
    Binding(String),

    /// Native library returned a non-zero status
    #[error("{call} returned {code}")]
    Native { call: &'static str, code: i32 },

    /// Input frame shorter than the negotiated frame size
    #[error("input size {actual} < frame size {expected}")]
    InputTooSmall { actual: usize, expected: usize },

    /// Operation not allowed in the current lifecycle state
    #[error("not allowed in state {state}")]
    InvalidState { state: EncoderState },

    /// Operation needs parameters that were never supplied
    #[error("no encode params have been accepted yet")]
    NoParams,

    /// Type code does not name a known encoder
    #[error("unknown encoder type {0}")]
    UnknownEncoderType(u32),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lifecycle operation failed
    #[error("{op} failed: {source}")]
    Operation {
        op: Operation,
        #[source]
        source: Box<EncoderError>,
    },
}

impl EncoderError {
    /// Create a binding error
    pub fn binding(msg: impl Into<String>) -> Self {
        Self::Binding(msg.into())
    }

    /// Create a native status error
    pub fn native(call: &'static str, code: i32) -> Self {
        Self::Native { call, code }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Attribute this error to a lifecycle operation
    pub fn during(self, op: Operation) -> Self {
        Self::Operation {
            op,
            source: Box::new(self),
        }
    }

    /// Outermost operation this error is attributed to, if any
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Operation { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Innermost cause, skipping operation wrappers
    pub fn root_cause(&self) -> &EncoderError {
        match self {
            Self::Operation { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether any layer of this error is attributed to `op`
    pub fn involves(&self, op: Operation) -> bool {
        match self {
            Self::Operation { op: outer, source } => *outer == op || source.involves(op),
            _ => false,
        }
    }

    /// Collapse into the coarse result code
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::Operation { op, .. } => op.failure_code(),
            Self::UnknownEncoderType(_) => ResultCode::CreateFail,
            Self::InvalidParams(_) | Self::Binding(_) | Self::Config(_) | Self::Io(_) => {
                ResultCode::InitFail
            }
            Self::NoParams => ResultCode::ResetFail,
            Self::InputTooSmall { .. } | Self::Native { .. } | Self::InvalidState { .. } => {
                ResultCode::EncodeFail
            }
        }
    }

    /// Remediation hint for the user, if one applies
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root_cause() {
            Self::Binding(_) => Some(
                "Install the encoder library (libopenh264, NETINT libxcoder or VPE) \
                 or point VIDENC_*_LIBRARY / config.toml [libraries] at it",
            ),
            Self::InvalidParams(_) => Some("Run `videnc info` to see the accepted parameter ranges"),
            Self::InputTooSmall { .. } => {
                Some("Input must be planar I420: width*height*3/2 bytes per frame")
            }
            Self::Config(_) => Some("Check ~/.config/videnc/config.toml for syntax errors"),
            _ => None,
        }
    }
}

/// Extension trait for attributing Results to an operation
pub trait ResultExt<T> {
    /// Wrap the error (if any) into `op`
    fn during(self, op: Operation) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn during(self, op: Operation) -> Result<T> {
        self.map_err(|e| e.during(op))
    }
}

impl From<libloading::Error> for EncoderError {
    fn from(err: libloading::Error) -> Self {
        Self::Binding(err.to_string())
    }
}

impl From<toml::de::Error> for EncoderError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse config file: {}", err))
    }
}
