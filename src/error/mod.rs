// Error types for the practice metronome engine
//
// This module defines custom error types for audio, playback and pattern
// operations, providing structured error handling with numeric codes that
// UI shells can map to messages without string matching.

mod audio;
mod pattern;
mod playback;
mod wake_lock;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use pattern::{PatternError, PatternErrorCodes};
pub use playback::{log_playback_error, PlaybackError, PlaybackErrorCodes};
pub use wake_lock::WakeLockError;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the engine boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
