// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner application

use crate::backends::camera::BackendError;
use crate::constants::messages;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera session errors
    Scan(ScanError),
    /// Configuration errors
    Config(String),
    /// Terminal setup or rendering errors
    Terminal(String),
    /// Filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Errors surfaced by the camera session controller.
///
/// None of these are fatal: each maps to a message shown to the user while
/// the controller returns to a usable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The user or the system refused camera access
    PermissionDenied,
    /// No capture device was available
    DeviceNotFound,
    /// The device has no controllable torch
    CapabilityUnsupported,
    /// Any other acquisition failure, carrying the raw message
    AccessFailure(String),
    /// Restarting on the next camera failed
    SwitchFailure(String),
}

impl ScanError {
    /// Whether the session ended because of this error
    pub fn is_fatal_to_session(&self) -> bool {
        !matches!(self, ScanError::CapabilityUnsupported)
    }

    /// Wrap an acquisition error that happened during a camera switch
    pub fn into_switch_failure(self) -> Self {
        match self {
            ScanError::SwitchFailure(_) => self,
            other => ScanError::SwitchFailure(other.to_string()),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Scan(e) => write!(f, "Scan error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Terminal(msg) => write!(f, "Terminal error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::PermissionDenied => write!(f, "{}", messages::PERMISSION_DENIED),
            ScanError::DeviceNotFound => write!(f, "{}", messages::NO_CAMERA),
            ScanError::CapabilityUnsupported => write!(f, "{}", messages::TORCH_UNSUPPORTED),
            ScanError::AccessFailure(msg) if msg.trim().is_empty() => {
                write!(f, "{}", messages::ACCESS_DENIED_FALLBACK)
            }
            ScanError::AccessFailure(msg) => write!(f, "{}", msg),
            ScanError::SwitchFailure(msg) => {
                write!(f, "{}: {}", messages::SWITCH_FAILED_PREFIX, msg)
            }
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ScanError {}

impl From<BackendError> for ScanError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::PermissionDenied(_) => ScanError::PermissionDenied,
            BackendError::DeviceNotFound(_) => ScanError::DeviceNotFound,
            BackendError::Unsupported(_) => ScanError::CapabilityUnsupported,
            BackendError::InitializationFailed(msg) | BackendError::Other(msg) => {
                ScanError::AccessFailure(msg)
            }
            BackendError::NotActive => ScanError::AccessFailure(err.to_string()),
        }
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        AppError::Scan(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Scan(err.into())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_message_mentions_permission() {
        let err = ScanError::from(BackendError::PermissionDenied("EACCES".into()));
        assert!(err.to_string().to_lowercase().contains("permission"));
    }

    #[test]
    fn test_generic_failure_keeps_raw_message() {
        let err = ScanError::from(BackendError::Other("pipeline stalled".into()));
        assert_eq!(err.to_string(), "pipeline stalled");
        assert_eq!(
            ScanError::AccessFailure(String::new()).to_string(),
            messages::ACCESS_DENIED_FALLBACK
        );
    }

    #[test]
    fn test_switch_failure_prefix() {
        let err = ScanError::DeviceNotFound.into_switch_failure();
        assert_eq!(
            err.to_string(),
            "Failed to switch camera: No camera devices found."
        );
        // Wrapping twice keeps a single prefix
        assert_eq!(err.clone().into_switch_failure(), err);
    }

    #[test]
    fn test_torch_error_is_not_fatal() {
        assert!(!ScanError::CapabilityUnsupported.is_fatal_to_session());
        assert!(ScanError::PermissionDenied.is_fatal_to_session());
    }
}
