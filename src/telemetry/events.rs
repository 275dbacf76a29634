//! Telemetry event types describing playback lifecycle for CLI and
//! embedding surfaces.

use serde::{Deserialize, Serialize};

/// Which playback mode an event refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    Metronome,
    Pattern,
}

/// Platform capability that was found missing at runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    AudioOutput,
    WakeLock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TelemetryEventKind {
    PlaybackStarted { mode: PlaybackMode, bpm: u32 },
    PlaybackStopped { mode: PlaybackMode },
    BpmChanged { bpm: u32 },
    TimeSignatureChanged { beats_per_bar: u32, beat_unit: u32 },
    CapabilityDowngraded { capability: Capability },
    Warning,
}

/// A single timestamped telemetry record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryEvent {
    pub timestamp_ms: u64,
    pub kind: TelemetryEventKind,
    pub detail: Option<String>,
}
