// PlaybackCoordinator: Focused manager for the playback state machine
//
// Single Responsibility: mutual exclusion between metronome and pattern
// playback. Starting one mode always stops the other first.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// Which playback mode is active; at most one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    MetronomePlaying,
    PatternPlaying,
}

impl PlaybackState {
    pub fn is_active(self) -> bool {
        self != PlaybackState::Idle
    }
}

/// Result of a state change request.
///
/// Callers use `from`/`to` to decide which schedulers to stop and start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PlaybackState,
    pub to: PlaybackState,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }

    /// Mode that must be stopped (if any) to complete the transition.
    pub fn stopped(&self) -> Option<PlaybackState> {
        (self.is_change() && self.from.is_active()).then_some(self.from)
    }

    /// Mode that must be started (if any) to complete the transition.
    pub fn started(&self) -> Option<PlaybackState> {
        (self.is_change() && self.to.is_active()).then_some(self.to)
    }
}

/// Serializes playback state transitions.
///
/// The lock is held only for the state swap itself. Scheduler start/stop
/// happens in the caller, after the transition is decided.
#[derive(Debug, Default)]
pub struct PlaybackCoordinator {
    state: Mutex<PlaybackState>,
}

impl PlaybackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        *self.lock()
    }

    pub fn is_any_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn toggle_metronome(&self) -> Transition {
        self.toggle(PlaybackState::MetronomePlaying)
    }

    pub fn toggle_pattern(&self) -> Transition {
        self.toggle(PlaybackState::PatternPlaying)
    }

    pub fn set_metronome_playing(&self, playing: bool) -> Transition {
        self.set(PlaybackState::MetronomePlaying, playing)
    }

    pub fn set_pattern_playing(&self, playing: bool) -> Transition {
        self.set(PlaybackState::PatternPlaying, playing)
    }

    /// Idempotent: stopping while idle is a no-op transition.
    pub fn stop_all(&self) -> Transition {
        self.swap(PlaybackState::Idle)
    }

    fn toggle(&self, mode: PlaybackState) -> Transition {
        let mut state = self.lock();
        let from = *state;
        let to = if from == mode {
            PlaybackState::Idle
        } else {
            mode
        };
        *state = to;
        Transition { from, to }
    }

    fn set(&self, mode: PlaybackState, playing: bool) -> Transition {
        let mut state = self.lock();
        let from = *state;
        let to = match (playing, from == mode) {
            (true, _) => mode,
            (false, true) => PlaybackState::Idle,
            // Stopping a mode that isn't playing leaves the other one alone
            (false, false) => from,
        };
        *state = to;
        Transition { from, to }
    }

    fn swap(&self, to: PlaybackState) -> Transition {
        let mut state = self.lock();
        let from = std::mem::replace(&mut *state, to);
        Transition { from, to }
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlaybackState::*;

    #[test]
    fn test_toggle_metronome_on_off() {
        let coordinator = PlaybackCoordinator::new();
        let on = coordinator.toggle_metronome();
        assert_eq!(on, Transition { from: Idle, to: MetronomePlaying });
        assert_eq!(on.started(), Some(MetronomePlaying));
        assert_eq!(on.stopped(), None);

        let off = coordinator.toggle_metronome();
        assert_eq!(off.to, Idle);
        assert_eq!(off.stopped(), Some(MetronomePlaying));
        assert!(!coordinator.is_any_active());
    }

    #[test]
    fn test_pattern_preempts_metronome() {
        let coordinator = PlaybackCoordinator::new();
        coordinator.toggle_metronome();
        let transition = coordinator.toggle_pattern();
        assert_eq!(transition.stopped(), Some(MetronomePlaying));
        assert_eq!(transition.started(), Some(PatternPlaying));
        assert_eq!(coordinator.state(), PatternPlaying);
    }

    #[test]
    fn test_metronome_preempts_pattern() {
        let coordinator = PlaybackCoordinator::new();
        coordinator.set_pattern_playing(true);
        let transition = coordinator.set_metronome_playing(true);
        assert_eq!(transition.stopped(), Some(PatternPlaying));
        assert_eq!(coordinator.state(), MetronomePlaying);
    }

    #[test]
    fn test_set_playing_is_idempotent() {
        let coordinator = PlaybackCoordinator::new();
        coordinator.set_metronome_playing(true);
        let again = coordinator.set_metronome_playing(true);
        assert!(!again.is_change());
        assert_eq!(again.started(), None);
    }

    #[test]
    fn test_stopping_inactive_mode_keeps_other() {
        let coordinator = PlaybackCoordinator::new();
        coordinator.set_metronome_playing(true);
        let transition = coordinator.set_pattern_playing(false);
        assert!(!transition.is_change());
        assert_eq!(coordinator.state(), MetronomePlaying);
    }

    #[test]
    fn test_stop_all_from_any_state() {
        let coordinator = PlaybackCoordinator::new();
        assert!(!coordinator.stop_all().is_change());

        coordinator.toggle_pattern();
        let transition = coordinator.stop_all();
        assert_eq!(transition.stopped(), Some(PatternPlaying));
        assert_eq!(coordinator.state(), Idle);
    }

    #[test]
    fn test_never_two_modes_after_any_sequence() {
        let coordinator = PlaybackCoordinator::new();
        let ops: [fn(&PlaybackCoordinator) -> Transition; 6] = [
            PlaybackCoordinator::toggle_metronome,
            PlaybackCoordinator::toggle_pattern,
            PlaybackCoordinator::stop_all,
            |c| c.set_metronome_playing(true),
            |c| c.set_pattern_playing(true),
            |c| c.set_pattern_playing(false),
        ];
        for i in 0..200usize {
            let transition = ops[(i * 7 + i / 3) % ops.len()](&coordinator);
            assert_eq!(transition.to, coordinator.state());
            if let (Some(stopped), Some(started)) = (transition.stopped(), transition.started()) {
                assert_ne!(stopped, started);
            }
        }
    }
}
