//! Tempo and meter primitives shared by the scheduler and the coordinator.
//!
//! All step durations derive from a fixed formula,
//! `seconds_per_step = 60 / bpm / subdivisions_per_beat`, so timing never
//! depends on how late a timer happened to fire.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// Slowest supported tempo
pub const MIN_BPM: u32 = 40;

/// Fastest supported tempo
pub const MAX_BPM: u32 = 200;

/// Steps per beat in pattern mode (sixteenth notes in x/4 time)
pub const DEFAULT_SUBDIVISIONS: u32 = 4;

/// Converts a tempo and subdivision count into the duration of one step.
///
/// # Examples
/// ```
/// use practice_metronome::timing::seconds_per_step;
/// assert_eq!(seconds_per_step(120, 4), 0.125);
/// assert_eq!(seconds_per_step(60, 1), 1.0);
/// ```
#[inline]
pub fn seconds_per_step(bpm: u32, subdivisions_per_beat: u32) -> f64 {
    60.0 / bpm.max(1) as f64 / subdivisions_per_beat.max(1) as f64
}

/// Beats per minute, always within [`MIN_BPM`, `MAX_BPM`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Tempo(u32);

impl Tempo {
    /// Strict constructor used at the configuration boundary.
    pub fn new(bpm: u32) -> Result<Self, PlaybackError> {
        if (MIN_BPM..=MAX_BPM).contains(&bpm) {
            Ok(Self(bpm))
        } else {
            Err(PlaybackError::BpmOutOfRange { bpm })
        }
    }

    /// Clamps into range, logging when the input had to be adjusted.
    pub fn clamped(bpm: u32) -> Self {
        let clamped = bpm.clamp(MIN_BPM, MAX_BPM);
        if clamped != bpm {
            log::warn!(
                "[Tempo] BPM {} outside [{}, {}], clamped to {}",
                bpm,
                MIN_BPM,
                MAX_BPM,
                clamped
            );
        }
        Self(clamped)
    }

    pub fn bpm(self) -> u32 {
        self.0
    }

    pub fn seconds_per_beat(self) -> f64 {
        seconds_per_step(self.0, 1)
    }

    pub fn seconds_per_step(self, subdivisions_per_beat: u32) -> f64 {
        seconds_per_step(self.0, subdivisions_per_beat)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(120)
    }
}

impl TryFrom<u32> for Tempo {
    type Error = PlaybackError;

    fn try_from(bpm: u32) -> Result<Self, Self::Error> {
        Tempo::new(bpm)
    }
}

impl From<Tempo> for u32 {
    fn from(tempo: Tempo) -> Self {
        tempo.0
    }
}

/// Time signature: beats per bar over beat unit.
///
/// Beat 0 of each bar is the accent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignature {
    pub beats_per_bar: u32,
    pub beat_unit: u32,
}

impl TimeSignature {
    pub fn new(beats_per_bar: u32, beat_unit: u32) -> Option<Self> {
        if beats_per_bar == 0 || beat_unit == 0 {
            return None;
        }
        Some(Self {
            beats_per_bar,
            beat_unit,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.beats_per_bar >= 1 && self.beat_unit >= 1
    }

    /// Step count of one bar at the given subdivision, saturating.
    pub fn steps_per_bar(&self, subdivisions_per_beat: u32) -> usize {
        (self.beats_per_bar as usize).saturating_mul(subdivisions_per_beat as usize)
    }

    /// Step count of one bar, `None` on overflow.
    pub fn checked_steps_per_bar(&self, subdivisions_per_beat: u32) -> Option<usize> {
        (self.beats_per_bar as usize).checked_mul(subdivisions_per_beat as usize)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats_per_bar: 4,
            beat_unit: 4,
        }
    }
}

/// Live tempo/meter values read by the running scheduler at every advance.
///
/// Writers (the coordinator) and the scheduler task share this through an
/// `Arc`; updates land on the next step boundary.
#[derive(Debug)]
pub struct TempoControls {
    bpm: AtomicU32,
    beats_per_bar: AtomicU32,
    beat_unit: AtomicU32,
}

impl TempoControls {
    pub fn new(tempo: Tempo, time_signature: TimeSignature) -> Self {
        Self {
            bpm: AtomicU32::new(tempo.bpm()),
            beats_per_bar: AtomicU32::new(time_signature.beats_per_bar.max(1)),
            beat_unit: AtomicU32::new(time_signature.beat_unit.max(1)),
        }
    }

    pub fn tempo(&self) -> Tempo {
        Tempo::clamped(self.bpm.load(Ordering::Relaxed))
    }

    pub fn set_tempo(&self, tempo: Tempo) {
        self.bpm.store(tempo.bpm(), Ordering::Relaxed);
    }

    pub fn time_signature(&self) -> TimeSignature {
        TimeSignature {
            beats_per_bar: self.beats_per_bar.load(Ordering::Relaxed),
            beat_unit: self.beat_unit.load(Ordering::Relaxed),
        }
    }

    pub fn set_time_signature(&self, time_signature: TimeSignature) {
        self.beats_per_bar
            .store(time_signature.beats_per_bar.max(1), Ordering::Relaxed);
        self.beat_unit
            .store(time_signature.beat_unit.max(1), Ordering::Relaxed);
    }
}

impl Default for TempoControls {
    fn default() -> Self {
        Self::new(Tempo::default(), TimeSignature::default())
    }
}

/// Derives a tempo from successive taps.
///
/// Averages the most recent intervals; a pause longer than
/// [`TapTempo::RESET_AFTER_S`] starts a fresh measurement.
#[derive(Debug, Default, Clone)]
pub struct TapTempo {
    taps: Vec<f64>,
}

impl TapTempo {
    pub const RESET_AFTER_S: f64 = 2.0;
    const MAX_INTERVALS: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tap at `at` seconds (any monotonic origin).
    ///
    /// Returns a tempo once at least two taps are in the current run.
    pub fn tap(&mut self, at: f64) -> Option<Tempo> {
        if let Some(&last) = self.taps.last() {
            if at <= last || at - last > Self::RESET_AFTER_S {
                self.taps.clear();
            }
        }
        self.taps.push(at);
        if self.taps.len() > Self::MAX_INTERVALS + 1 {
            self.taps.remove(0);
        }
        if self.taps.len() < 2 {
            return None;
        }

        let intervals = self.taps.len() - 1;
        let span = self.taps[self.taps.len() - 1] - self.taps[0];
        let average = span / intervals as f64;
        Some(Tempo::clamped((60.0 / average).round() as u32))
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_per_step_formula() {
        for bpm in MIN_BPM..=MAX_BPM {
            let expected = 60.0 / bpm as f64 / 4.0;
            assert_eq!(seconds_per_step(bpm, 4), expected, "bpm {}", bpm);
        }
        assert_eq!(seconds_per_step(120, 1), 0.5);
    }

    #[test]
    fn test_tempo_bounds() {
        assert!(Tempo::new(40).is_ok());
        assert!(Tempo::new(200).is_ok());
        assert_eq!(
            Tempo::new(39).unwrap_err(),
            PlaybackError::BpmOutOfRange { bpm: 39 }
        );
        assert!(Tempo::new(201).is_err());
    }

    #[test]
    fn test_tempo_clamped() {
        assert_eq!(Tempo::clamped(10).bpm(), MIN_BPM);
        assert_eq!(Tempo::clamped(500).bpm(), MAX_BPM);
        assert_eq!(Tempo::clamped(97).bpm(), 97);
    }

    #[test]
    fn test_tempo_deserialize_rejects_out_of_range() {
        assert_eq!(serde_json::from_str::<Tempo>("90").unwrap().bpm(), 90);
        assert!(serde_json::from_str::<Tempo>("250").is_err());
    }

    #[test]
    fn test_time_signature_steps() {
        let ts = TimeSignature::new(3, 4).unwrap();
        assert_eq!(ts.steps_per_bar(4), 12);
        assert!(TimeSignature::new(0, 4).is_none());

        let huge = TimeSignature::new(u32::MAX, 4).unwrap();
        assert_eq!(huge.checked_steps_per_bar(4), Some(u32::MAX as usize * 4));
        assert_eq!(huge.steps_per_bar(u32::MAX), u32::MAX as usize * u32::MAX as usize);
    }

    #[test]
    fn test_controls_roundtrip() {
        let controls = TempoControls::default();
        controls.set_tempo(Tempo::clamped(90));
        controls.set_time_signature(TimeSignature::new(7, 8).unwrap());
        assert_eq!(controls.tempo().bpm(), 90);
        assert_eq!(controls.time_signature(), TimeSignature::new(7, 8).unwrap());
    }

    #[test]
    fn test_tap_tempo_steady_taps() {
        let mut tap = TapTempo::new();
        assert!(tap.tap(0.0).is_none());
        assert_eq!(tap.tap(0.5).unwrap().bpm(), 120);
        assert_eq!(tap.tap(1.0).unwrap().bpm(), 120);
        assert_eq!(tap.tap(1.5).unwrap().bpm(), 120);
    }

    #[test]
    fn test_tap_tempo_resets_after_pause() {
        let mut tap = TapTempo::new();
        tap.tap(0.0);
        tap.tap(0.5);
        assert!(tap.tap(5.0).is_none());
        assert_eq!(tap.tap(6.0).unwrap().bpm(), 60);
    }

    #[test]
    fn test_tap_tempo_clamps() {
        let mut tap = TapTempo::new();
        tap.tap(0.0);
        assert_eq!(tap.tap(0.1).unwrap().bpm(), MAX_BPM);
    }
}
