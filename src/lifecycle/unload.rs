//! Close/unload confirmation guard.

use tokio::sync::watch;

use super::store::Store;

/// What the host should do with a close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Proceed,
    /// Playback is active; ask the user before closing
    Confirm,
}

/// Follows an "any playback active" signal and vetoes silent closes while
/// it is true. Dropping the guard unsubscribes it.
#[derive(Debug)]
pub struct UnloadGuard {
    active: watch::Receiver<bool>,
}

impl UnloadGuard {
    pub fn attach(signal: &Store<bool>) -> Self {
        Self {
            active: signal.subscribe(),
        }
    }

    pub fn is_armed(&self) -> bool {
        *self.active.borrow()
    }

    pub fn on_close_requested(&self) -> CloseDecision {
        if self.is_armed() {
            log::debug!("[UnloadGuard] Close requested during playback, confirmation required");
            CloseDecision::Confirm
        } else {
            CloseDecision::Proceed
        }
    }
}
