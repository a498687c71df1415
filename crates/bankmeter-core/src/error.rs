//! Shared error type across bankmeter crates.

use thiserror::Error;

use crate::meter::MeterKind;

/// Stable error codes (used in startup logs and by tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Meter name rejected.
    InvalidName,
    /// Tag key rejected.
    InvalidTag,
    /// Name already registered with another meter kind.
    KindMismatch,
    /// Registry configuration can no longer change.
    ConfigLocked,
    /// Invalid configuration value.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::InvalidTag => "INVALID_TAG",
            ErrorCode::KindMismatch => "KIND_MISMATCH",
            ErrorCode::ConfigLocked => "CONFIG_LOCKED",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and service.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid meter name: {0}")]
    InvalidName(String),
    #[error("invalid tag: {0}")]
    InvalidTag(String),
    #[error("meter `{name}` is already registered as a {existing}, not a {requested}")]
    KindMismatch {
        name: String,
        existing: MeterKind,
        requested: MeterKind,
    },
    #[error("registry config is locked: {0}")]
    ConfigLocked(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricsError::InvalidName(_) => ErrorCode::InvalidName,
            MetricsError::InvalidTag(_) => ErrorCode::InvalidTag,
            MetricsError::KindMismatch { .. } => ErrorCode::KindMismatch,
            MetricsError::ConfigLocked(_) => ErrorCode::ConfigLocked,
            MetricsError::BadConfig(_) => ErrorCode::BadConfig,
            MetricsError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            MetricsError::Internal(_) => ErrorCode::Internal,
        }
    }
}
