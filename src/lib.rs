// Practice Metronome Core - playback timing and audio-trigger engine
// Look-ahead scheduled clicks and drum hits on a shared audio clock

// Module declarations
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod managers;
pub mod pattern;
pub mod scheduler;
pub mod telemetry;
pub mod timing;

// Re-exports for convenience
pub use config::AppConfig;
pub use engine::PracticeEngine;
pub use managers::PlaybackState;
pub use pattern::{DrumVoice, Pattern};
pub use scheduler::StepEvent;
pub use timing::{Tempo, TimeSignature};
