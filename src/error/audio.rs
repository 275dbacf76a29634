// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes reported by [`AudioError`].
///
/// Error code range: 1001-1006
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Host has no audio output capability
    pub const UNSUPPORTED: i32 = 1001;

    /// Audio context could not be created (transient, retried on next start)
    pub const CONTEXT_CREATION_FAILED: i32 = 1002;

    /// Resume request on a suspended context failed
    pub const RESUME_FAILED: i32 = 1003;

    /// Failed to open the output stream
    pub const STREAM_OPEN_FAILED: i32 = 1004;

    /// Hardware error occurred
    pub const HARDWARE_ERROR: i32 = 1005;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1006;
}

/// Log an audio error with structured context
///
/// Logs the numeric code, the component and the human-readable message.
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioContext, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover the audio context lifecycle and sound scheduling.
/// None of them escape the playback coordinator: they are logged and
/// converted into silent degradation.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Host has no audio output capability
    Unsupported,

    /// Audio context could not be created
    ContextCreationFailed { reason: String },

    /// Resume request failed (autoplay restriction, device busy)
    ResumeFailed { reason: String },

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Hardware error occurred
    HardwareError { details: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl AudioError {
    /// Whether the error means the capability is permanently absent.
    ///
    /// Transient failures are retried on the next user-initiated start.
    pub fn is_capability_absent(&self) -> bool {
        matches!(self, AudioError::Unsupported)
    }
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::Unsupported => AudioErrorCodes::UNSUPPORTED,
            AudioError::ContextCreationFailed { .. } => AudioErrorCodes::CONTEXT_CREATION_FAILED,
            AudioError::ResumeFailed { .. } => AudioErrorCodes::RESUME_FAILED,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::Unsupported => "Audio output is not supported on this host".to_string(),
            AudioError::ContextCreationFailed { reason } => {
                format!("Failed to create audio context: {}", reason)
            }
            AudioError::ResumeFailed { reason } => {
                format!("Failed to resume audio context: {}", reason)
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(AudioError::Unsupported.code(), AudioErrorCodes::UNSUPPORTED);
        assert_eq!(
            AudioError::ContextCreationFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::CONTEXT_CREATION_FAILED
        );
        assert_eq!(
            AudioError::ResumeFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::RESUME_FAILED
        );
        assert_eq!(
            AudioError::StreamOpenFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_OPEN_FAILED
        );
        assert_eq!(
            AudioError::HardwareError {
                details: "test".to_string()
            }
            .code(),
            AudioErrorCodes::HARDWARE_ERROR
        );
        assert_eq!(
            AudioError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            AudioErrorCodes::LOCK_POISONED
        );
    }

    #[test]
    fn test_audio_error_messages() {
        let err = AudioError::Unsupported;
        assert!(err.message().contains("not supported"));

        let err = AudioError::ResumeFailed {
            reason: "autoplay blocked".to_string(),
        };
        assert_eq!(
            err.message(),
            "Failed to resume audio context: autoplay blocked"
        );
    }

    #[test]
    fn test_capability_absent() {
        assert!(AudioError::Unsupported.is_capability_absent());
        assert!(!AudioError::ResumeFailed {
            reason: "x".to_string()
        }
        .is_capability_absent());
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::Unsupported;
        let display = format!("{}", err);
        assert!(display.contains("AudioError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("device vanished");
        let audio_err: AudioError = io_err.into();
        match audio_err {
            AudioError::HardwareError { details } => {
                assert!(details.contains("device vanished"));
            }
            _ => panic!("Expected HardwareError"),
        }
    }
}
