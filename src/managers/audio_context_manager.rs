// AudioContextManager: Focused manager for the shared audio context
//
// Single Responsibility: lazy creation, resume/suspend and clock reads of
// the one audio context the process owns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::audio::{AudioContext, AudioHost, ContextState};
use crate::error::log_audio_error;

/// Owns the single shared audio context for the process lifetime.
///
/// This manager handles:
/// - Lazy, idempotent context creation on first use
/// - Capability detection (hosts without audio are remembered, not retried)
/// - Transient creation failures (retried on the next user-initiated start)
/// - Fire-and-forget resume/suspend that never surfaces errors
///
/// # Example
/// ```ignore
/// let manager = AudioContextManager::new(default_host());
/// manager.resume().await;              // inside the user's start action
/// let now = manager.current_time();     // None when audio is unavailable
/// ```
pub struct AudioContextManager {
    host: Arc<dyn AudioHost>,
    context: OnceCell<Arc<dyn AudioContext>>,
    unsupported: AtomicBool,
}

impl AudioContextManager {
    pub fn new(host: Arc<dyn AudioHost>) -> Self {
        Self {
            host,
            context: OnceCell::new(),
            unsupported: AtomicBool::new(false),
        }
    }

    /// Returns the shared context, creating it on first call.
    ///
    /// Never creates a second instance. Returns `None` when the host has no
    /// audio capability or creation failed transiently.
    pub fn context(&self) -> Option<Arc<dyn AudioContext>> {
        if let Some(context) = self.context.get() {
            return Some(Arc::clone(context));
        }
        if self.unsupported.load(Ordering::Acquire) {
            return None;
        }

        match self.context.get_or_try_init(|| self.host.create_context()) {
            Ok(context) => {
                log::info!(
                    "[AudioContext] Created audio context at {} Hz",
                    context.sample_rate()
                );
                Some(Arc::clone(context))
            }
            Err(err) => {
                if err.is_capability_absent() {
                    self.unsupported.store(true, Ordering::Release);
                    log::warn!("[AudioContext] Audio unsupported on this host, continuing without sound");
                } else {
                    log_audio_error(&err, "create_context");
                }
                None
            }
        }
    }

    /// Whether a context exists or could still be created.
    pub fn is_available(&self) -> bool {
        self.context.get().is_some() || !self.unsupported.load(Ordering::Acquire)
    }

    /// Current audio clock time in seconds.
    pub fn current_time(&self) -> Option<f64> {
        self.context().map(|context| context.current_time())
    }

    pub fn state(&self) -> Option<ContextState> {
        self.context.get().map(|context| context.state())
    }

    /// Resumes a suspended context; no-op when already running.
    ///
    /// Failures are logged and swallowed: absence of audio is non-fatal.
    pub async fn resume(&self) {
        let Some(context) = self.context() else {
            return;
        };
        if context.state() != ContextState::Suspended {
            return;
        }
        match context.resume().await {
            Ok(()) => log::debug!("[AudioContext] Resumed"),
            Err(err) => log_audio_error(&err, "resume"),
        }
    }

    /// Suspends a running context; failures are logged.
    pub async fn suspend(&self) {
        let Some(context) = self.context.get().cloned() else {
            return;
        };
        if context.state() != ContextState::Running {
            return;
        }
        if let Err(err) = context.suspend().await {
            log_audio_error(&err, "suspend");
        }
    }
}
