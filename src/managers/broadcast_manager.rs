// BroadcastChannelManager: Centralized tokio broadcast channel management
// Single Responsibility: Broadcast channel lifecycle and subscription

use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::PlaybackState;
use crate::scheduler::StepEvent;

/// Manages the engine's outward broadcast channels
///
/// # Channel Types
/// - Steps: Beat/step index updates for the visual indicator
/// - Playback state: Mode changes after every coordinator transition
pub struct BroadcastChannelManager {
    steps: Mutex<Option<broadcast::Sender<StepEvent>>>,
    playback_state: Mutex<Option<broadcast::Sender<PlaybackState>>>,
}

impl BroadcastChannelManager {
    /// Create a new BroadcastChannelManager with all channels uninitialized
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(None),
            playback_state: Mutex::new(None),
        }
    }

    // ========================================================================
    // STEP CHANNEL
    // ========================================================================

    /// Initialize the step broadcast channel, or return the existing sender
    ///
    /// Subscribers that fall more than `capacity` steps behind skip ahead
    /// (lagged), which is the right behavior for a visual indicator.
    pub fn init_steps(&self, capacity: usize) -> broadcast::Sender<StepEvent> {
        let mut guard = lock(&self.steps);
        guard
            .get_or_insert_with(|| broadcast::channel(capacity.max(1)).0)
            .clone()
    }

    /// Subscribe to step events; `None` before `init_steps`
    pub fn subscribe_steps(&self) -> Option<broadcast::Receiver<StepEvent>> {
        lock(&self.steps).as_ref().map(|tx| tx.subscribe())
    }

    // ========================================================================
    // PLAYBACK STATE CHANNEL
    // ========================================================================

    pub fn init_playback_state(&self) -> broadcast::Sender<PlaybackState> {
        let mut guard = lock(&self.playback_state);
        guard
            .get_or_insert_with(|| broadcast::channel(16).0)
            .clone()
    }

    pub fn subscribe_playback_state(&self) -> Option<broadcast::Receiver<PlaybackState>> {
        lock(&self.playback_state)
            .as_ref()
            .map(|tx| tx.subscribe())
    }

    /// Publish a state change if the channel exists
    pub fn publish_playback_state(&self, state: PlaybackState) {
        if let Some(tx) = lock(&self.playback_state).as_ref() {
            let _ = tx.send(state);
        }
    }
}

impl Default for BroadcastChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_channel_lifecycle() {
        let manager = BroadcastChannelManager::new();

        // Initially no subscription possible
        assert!(manager.subscribe_steps().is_none());

        let _tx = manager.init_steps(8);
        assert!(manager.subscribe_steps().is_some());
    }

    #[test]
    fn test_steps_init_is_idempotent() {
        let manager = BroadcastChannelManager::new();
        let first = manager.init_steps(8);
        let mut rx = manager.subscribe_steps().unwrap();
        let second = manager.init_steps(8);

        second
            .send(StepEvent {
                beat_index: 1,
                step_index: 1,
                time: 0.5,
                accented: false,
            })
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().beat_index, 1);
        assert_eq!(first.receiver_count(), 1);
    }

    #[test]
    fn test_steps_multiple_subscribers() {
        let manager = BroadcastChannelManager::new();
        let tx = manager.init_steps(8);
        let mut rx1 = manager.subscribe_steps().unwrap();
        let mut rx2 = manager.subscribe_steps().unwrap();

        let event = StepEvent {
            beat_index: 0,
            step_index: 0,
            time: 0.05,
            accented: true,
        };
        tx.send(event.clone()).unwrap();

        assert_eq!(rx1.try_recv().unwrap(), event);
        assert_eq!(rx2.try_recv().unwrap(), event);
    }

    #[test]
    fn test_playback_state_publish() {
        let manager = BroadcastChannelManager::default();
        // Publishing before init is a no-op
        manager.publish_playback_state(PlaybackState::Idle);
        assert!(manager.subscribe_playback_state().is_none());

        manager.init_playback_state();
        let mut rx = manager.subscribe_playback_state().unwrap();
        manager.publish_playback_state(PlaybackState::PatternPlaying);
        assert_eq!(rx.try_recv().unwrap(), PlaybackState::PatternPlaying);
    }
}
