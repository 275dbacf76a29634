//! Configuration management for scheduler and synthesis tuning
//!
//! This module provides runtime configuration loading from JSON files so
//! look-ahead window, tick rate and click voicing can be adjusted without
//! recompilation. Missing or malformed files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::timing::{Tempo, TimeSignature};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub synth: SynthConfig,
    #[serde(default)]
    pub defaults: PlaybackDefaults,
}

/// Look-ahead scheduler timing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Housekeeping tick period; clamped to 25-50ms
    pub tick_interval_ms: u64,
    /// How far ahead of the audio clock events are committed
    pub lookahead_ms: u64,
    /// Offset between start and the first event
    pub latency_hint_ms: u64,
    /// Capacity of the step event broadcast channel
    pub event_buffer: usize,
}

impl SchedulerConfig {
    pub const MIN_TICK_MS: u64 = 25;
    pub const MAX_TICK_MS: u64 = 50;

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(
            self.tick_interval_ms
                .clamp(Self::MIN_TICK_MS, Self::MAX_TICK_MS),
        )
    }

    /// Look-ahead window, never shorter than one tick period.
    pub fn lookahead_secs(&self) -> f64 {
        let tick = self.tick_interval();
        let lookahead = Duration::from_millis(self.lookahead_ms);
        if lookahead < tick {
            log::warn!(
                "[Config] lookahead_ms {} is shorter than the {:?} tick, using the tick period",
                self.lookahead_ms,
                tick
            );
            return tick.as_secs_f64();
        }
        lookahead.as_secs_f64()
    }

    pub fn latency_hint_secs(&self) -> f64 {
        self.latency_hint_ms as f64 / 1000.0
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 25,
            // Must exceed the tick period so no event falls between two ticks
            lookahead_ms: 100,
            latency_hint_ms: 50,
            event_buffer: 64,
        }
    }
}

/// Click synthesis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    pub accent_frequency_hz: f32,
    pub regular_frequency_hz: f32,
    pub click_gain: f32,
    /// Time for a click to decay to near-silence
    pub decay_ms: f32,
    pub sample_rate: u32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            accent_frequency_hz: 1000.0,
            regular_frequency_hz: 800.0,
            click_gain: 0.6,
            decay_ms: 100.0,
            sample_rate: 48000,
        }
    }
}

/// Initial tempo and meter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackDefaults {
    pub bpm: u32,
    pub beats_per_bar: u32,
    pub beat_unit: u32,
}

impl PlaybackDefaults {
    pub fn tempo(&self) -> Tempo {
        Tempo::clamped(self.bpm)
    }

    pub fn time_signature(&self) -> TimeSignature {
        TimeSignature::new(self.beats_per_bar, self.beat_unit).unwrap_or_else(|| {
            log::warn!(
                "[Config] Invalid default time signature {}/{}, using 4/4",
                self.beats_per_bar,
                self.beat_unit
            );
            TimeSignature::default()
        })
    }
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            bpm: 120,
            beats_per_bar: 4,
            beat_unit: 4,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the conventional location
    pub fn load() -> Self {
        Self::load_from_file("assets/metronome_config.json")
    }
}
