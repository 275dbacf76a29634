use std::fmt;

/// Failures reported by a wake-lock capability.
///
/// The engine never surfaces these: they are logged and dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum WakeLockError {
    /// Host has no wake-lock API
    Unsupported,
    /// Permission denied or the page is not visible
    Denied { reason: String },
    /// Any other platform failure
    Platform { details: String },
}

impl fmt::Display for WakeLockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WakeLockError::Unsupported => write!(f, "wake lock not supported"),
            WakeLockError::Denied { reason } => write!(f, "wake lock denied: {}", reason),
            WakeLockError::Platform { details } => write!(f, "wake lock failed: {}", details),
        }
    }
}

impl std::error::Error for WakeLockError {}
