//! Audio context capability traits.
//!
//! The engine never talks to a sound device directly. It asks an injected
//! [`AudioHost`] for a single [`AudioContext`], reads its clock, and commits
//! sounds to it at absolute clock times. Hosts without audio return
//! [`AudioError::Unsupported`] and the engine degrades to visual-only playback.

use std::sync::Arc;

use futures::future::BoxFuture;

use super::synth::ScheduledSound;
use crate::error::AudioError;

/// Run state of an audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not producing sound (autoplay policy, backgrounded)
    Suspended,
    Running,
    Closed,
}

/// A running audio output with its own monotonic clock.
pub trait AudioContext: Send + Sync {
    /// Audio clock reading in seconds.
    fn current_time(&self) -> f64;

    fn state(&self) -> ContextState;

    fn sample_rate(&self) -> u32;

    /// Requests the context to start producing sound.
    fn resume(&self) -> BoxFuture<'static, Result<(), AudioError>>;

    fn suspend(&self) -> BoxFuture<'static, Result<(), AudioError>>;

    /// Commits a sound at its absolute start time.
    ///
    /// Committed sounds cannot be cancelled; they play out.
    fn schedule(&self, sound: ScheduledSound) -> Result<(), AudioError>;
}

/// Factory for the process-wide audio context.
pub trait AudioHost: Send + Sync {
    fn create_context(&self) -> Result<Arc<dyn AudioContext>, AudioError>;
}

/// Host used when no explicit host is injected.
///
/// With the `device-audio` feature this opens the default output device;
/// otherwise it reports audio as unsupported.
pub fn default_host() -> Arc<dyn AudioHost> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "device-audio")] {
            Arc::new(super::engine_cpal::CpalAudioHost::default())
        } else {
            Arc::new(super::stubs::NullAudioHost)
        }
    }
}
