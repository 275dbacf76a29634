// Playback error types

use crate::error::{ErrorCode, PatternError};
use log::error;
use std::fmt;

/// Playback error code constants
///
/// Error code range: 1101-1105
pub struct PlaybackErrorCodes {}

impl PlaybackErrorCodes {
    /// BPM outside the supported [40, 200] range
    pub const BPM_OUT_OF_RANGE: i32 = 1101;

    /// Pattern playback requested with no pattern loaded
    pub const NO_PATTERN_LOADED: i32 = 1102;

    /// Loaded pattern failed validation
    pub const INVALID_PATTERN: i32 = 1103;

    /// Scheduler started outside a tokio runtime
    pub const NO_RUNTIME: i32 = 1104;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1105;
}

/// Log a playback error with structured context
pub fn log_playback_error(err: &PlaybackError, context: &str) {
    error!(
        "Playback error in {}: code={}, component=PlaybackCoordinator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised at the configuration boundary of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// BPM outside [40, 200]
    BpmOutOfRange { bpm: u32 },

    /// Pattern playback requested before a pattern was loaded
    NoPatternLoaded,

    /// Pattern failed validation
    InvalidPattern(PatternError),

    /// No tokio runtime available to drive the housekeeping tick
    NoRuntime,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> i32 {
        match self {
            PlaybackError::BpmOutOfRange { .. } => PlaybackErrorCodes::BPM_OUT_OF_RANGE,
            PlaybackError::NoPatternLoaded => PlaybackErrorCodes::NO_PATTERN_LOADED,
            PlaybackError::InvalidPattern(_) => PlaybackErrorCodes::INVALID_PATTERN,
            PlaybackError::NoRuntime => PlaybackErrorCodes::NO_RUNTIME,
            PlaybackError::LockPoisoned { .. } => PlaybackErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            PlaybackError::BpmOutOfRange { bpm } => {
                format!("BPM must be between 40 and 200 (got {})", bpm)
            }
            PlaybackError::NoPatternLoaded => {
                "No pattern loaded. Call load_pattern() first.".to_string()
            }
            PlaybackError::InvalidPattern(err) => format!("Invalid pattern: {}", err.message()),
            PlaybackError::NoRuntime => {
                "Scheduler requires a running tokio runtime".to_string()
            }
            PlaybackError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlaybackError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PlaybackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlaybackError::InvalidPattern(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PatternError> for PlaybackError {
    fn from(err: PatternError) -> Self {
        PlaybackError::InvalidPattern(err)
    }
}
