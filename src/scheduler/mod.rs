//! Beat scheduler: look-ahead step timing for metronome and pattern playback.
//!
//! - `source`: step sequences (metronome bar, drum pattern)
//! - `lookahead`: pure time arithmetic deciding which steps to commit
//! - `clock`: audio clock and wall-clock fallback
//! - `runner`: the tokio task tying them to the synthesizer and UI

pub mod clock;
pub mod lookahead;
pub mod runner;
pub mod source;

pub use clock::{AudioClock, SchedulerClock, WallClock};
pub use lookahead::{LookaheadScheduler, ScheduledEvent};
pub use runner::{BeatScheduler, PlaybackPosition, Position, SchedulerState, StepEvent};
pub use source::{StepSource, StepTrigger};
