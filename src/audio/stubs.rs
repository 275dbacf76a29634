//! Stub audio hosts for desktop testing and offline rendering
//!
//! This module provides audio hosts that run without any sound hardware:
//!
//! - [`NullAudioHost`] models a host with no audio capability at all. The
//!   engine must degrade to visual-only playback on it.
//! - [`StubAudioHost`] creates a [`StubAudioContext`] whose clock follows
//!   `tokio::time::Instant`, so tests running with paused time observe a
//!   deterministic audio clock. Every committed sound is recorded for
//!   inspection and can later be rendered offline.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{self, BoxFuture, FutureExt};
use tokio::time::Instant;

use super::context::{AudioContext, AudioHost, ContextState};
use super::synth::ScheduledSound;
use crate::error::AudioError;

/// Host without audio output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudioHost;

impl AudioHost for NullAudioHost {
    fn create_context(&self) -> Result<Arc<dyn AudioContext>, AudioError> {
        Err(AudioError::Unsupported)
    }
}

/// Host producing recording contexts.
pub struct StubAudioHost {
    sample_rate: u32,
    created: AtomicUsize,
    fail_resume: Arc<AtomicBool>,
    fail_creation: AtomicBool,
    last: Mutex<Option<Arc<StubAudioContext>>>,
}

impl StubAudioHost {
    pub fn new() -> Self {
        Self::with_sample_rate(48000)
    }

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            created: AtomicUsize::new(0),
            fail_resume: Arc::new(AtomicBool::new(false)),
            fail_creation: AtomicBool::new(false),
            last: Mutex::new(None),
        }
    }

    /// Number of contexts this host has created.
    pub fn contexts_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Most recently created context, for inspection.
    pub fn last_context(&self) -> Option<Arc<StubAudioContext>> {
        lock_or_recover(&self.last).clone()
    }

    /// Makes subsequent resume requests fail (autoplay-block simulation).
    pub fn set_fail_resume(&self, fail: bool) {
        self.fail_resume.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent context creation fail with a transient error.
    pub fn set_fail_creation(&self, fail: bool) {
        self.fail_creation.store(fail, Ordering::SeqCst);
    }
}

impl Default for StubAudioHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioHost for StubAudioHost {
    fn create_context(&self) -> Result<Arc<dyn AudioContext>, AudioError> {
        if self.fail_creation.load(Ordering::SeqCst) {
            return Err(AudioError::ContextCreationFailed {
                reason: "stub creation failure".to_string(),
            });
        }

        let context = Arc::new(StubAudioContext::new(
            self.sample_rate,
            Arc::clone(&self.fail_resume),
        ));
        self.created.fetch_add(1, Ordering::SeqCst);
        *lock_or_recover(&self.last) = Some(Arc::clone(&context));
        Ok(context)
    }
}

/// Recording audio context with a tokio-driven clock.
///
/// Starts suspended, like a browser context created before a user gesture.
pub struct StubAudioContext {
    origin: Instant,
    sample_rate: u32,
    state: Arc<Mutex<ContextState>>,
    scheduled: Mutex<Vec<ScheduledSound>>,
    fail_resume: Arc<AtomicBool>,
}

impl StubAudioContext {
    fn new(sample_rate: u32, fail_resume: Arc<AtomicBool>) -> Self {
        Self {
            origin: Instant::now(),
            sample_rate,
            state: Arc::new(Mutex::new(ContextState::Suspended)),
            scheduled: Mutex::new(Vec::new()),
            fail_resume,
        }
    }

    /// Snapshot of every sound committed so far, in commit order.
    pub fn scheduled(&self) -> Vec<ScheduledSound> {
        lock_or_recover(&self.scheduled).clone()
    }

    pub fn clear_scheduled(&self) {
        lock_or_recover(&self.scheduled).clear();
    }
}

impl AudioContext for StubAudioContext {
    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn state(&self) -> ContextState {
        *lock_or_recover(&self.state)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn resume(&self) -> BoxFuture<'static, Result<(), AudioError>> {
        if self.fail_resume.load(Ordering::SeqCst) {
            return future::ready(Err(AudioError::ResumeFailed {
                reason: "stub resume blocked".to_string(),
            }))
            .boxed();
        }
        let state = Arc::clone(&self.state);
        async move {
            *lock_or_recover(&state) = ContextState::Running;
            Ok(())
        }
        .boxed()
    }

    fn suspend(&self) -> BoxFuture<'static, Result<(), AudioError>> {
        let state = Arc::clone(&self.state);
        async move {
            *lock_or_recover(&state) = ContextState::Suspended;
            Ok(())
        }
        .boxed()
    }

    fn schedule(&self, sound: ScheduledSound) -> Result<(), AudioError> {
        lock_or_recover(&self.scheduled).push(sound);
        Ok(())
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
