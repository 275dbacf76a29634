// Managers Module
//
// Focused manager classes the engine core composes, one concern each:
// - AudioContextManager: Shared audio context lifecycle and clock access
// - PlaybackCoordinator: Metronome/pattern mutual exclusion state machine
// - BroadcastChannelManager: Tokio broadcast channel for step events

pub mod audio_context_manager;
pub mod broadcast_manager;
pub mod playback_coordinator;

pub use audio_context_manager::AudioContextManager;
pub use broadcast_manager::BroadcastChannelManager;
pub use playback_coordinator::{PlaybackCoordinator, PlaybackState, Transition};
