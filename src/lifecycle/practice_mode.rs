//! Practice-mode flag: a focused, distraction-free view the UI can toggle.

use tokio::sync::watch;

use super::store::Store;

#[derive(Debug, Default)]
pub struct PracticeMode {
    active: Store<bool>,
}

impl PracticeMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) {
        if self.active.set(true) {
            log::debug!("[PracticeMode] Entered");
        }
    }

    pub fn exit(&self) {
        if self.active.set(false) {
            log::debug!("[PracticeMode] Exited");
        }
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&self) -> bool {
        let next = !self.active.get();
        if next {
            self.enter();
        } else {
            self.exit();
        }
        next
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trip() {
        let mode = PracticeMode::new();
        assert!(!mode.is_active());
        assert!(mode.toggle());
        assert!(mode.is_active());
        assert!(!mode.toggle());
        assert!(!mode.is_active());
    }

    #[test]
    fn test_subscribers_observe_enter_exit() {
        let mode = PracticeMode::new();
        let mut rx = mode.subscribe();
        mode.enter();
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        // Entering twice is not a change
        mode.enter();
        assert!(!rx.has_changed().unwrap());

        mode.exit();
        assert!(!*rx.borrow_and_update());
    }
}
