//! Drum pattern model consumed read-only by the playback engine.
//!
//! A pattern is a boolean grid: one row per drum voice, one column per step,
//! where a step is one subdivision of a beat. The engine never mutates a
//! loaded pattern; the builder helpers exist for tooling and tests.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PatternError;
use crate::timing::{TimeSignature, DEFAULT_SUBDIVISIONS};

/// Upper bound on grid columns a pattern may declare.
pub const MAX_STEPS: usize = 1 << 16;

/// One drum instrument track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrumVoice {
    Kick,
    Snare,
    HiHat,
    OpenHat,
    Clap,
    Tom,
}

impl DrumVoice {
    pub const ALL: [DrumVoice; 6] = [
        DrumVoice::Kick,
        DrumVoice::Snare,
        DrumVoice::HiHat,
        DrumVoice::OpenHat,
        DrumVoice::Clap,
        DrumVoice::Tom,
    ];
}

/// Inclusive step range the pattern loops over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRange {
    pub start: usize,
    pub end: usize,
}

impl LoopRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, step: usize) -> bool {
        (self.start..=self.end).contains(&step)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

fn default_subdivisions() -> u32 {
    DEFAULT_SUBDIVISIONS
}

/// A stored drum pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub id: String,
    pub name: String,
    pub bpm: u32,
    pub time_signature: TimeSignature,
    pub bars: u32,
    #[serde(default = "default_subdivisions")]
    pub subdivisions_per_beat: u32,
    pub voices: Vec<DrumVoice>,
    pub grid: Vec<Vec<bool>>,
    #[serde(default)]
    pub loop_range: Option<LoopRange>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

impl Pattern {
    /// Creates an all-rest pattern with a correctly sized grid.
    pub fn empty(
        id: impl Into<String>,
        name: impl Into<String>,
        bpm: u32,
        time_signature: TimeSignature,
        bars: u32,
        voices: Vec<DrumVoice>,
    ) -> Self {
        let columns = (bars as usize)
            .saturating_mul(time_signature.steps_per_bar(DEFAULT_SUBDIVISIONS))
            .min(MAX_STEPS);
        let grid = vec![vec![false; columns]; voices.len()];
        Self {
            id: id.into(),
            name: name.into(),
            bpm,
            time_signature,
            bars,
            subdivisions_per_beat: DEFAULT_SUBDIVISIONS,
            voices,
            grid,
            loop_range: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Sets a cell, ignoring coordinates outside the grid.
    pub fn with_hit(mut self, voice: DrumVoice, step: usize) -> Self {
        if let Some(row) = self.voices.iter().position(|v| *v == voice) {
            if let Some(cell) = self.grid[row].get_mut(step) {
                *cell = true;
            }
        }
        self
    }

    pub fn with_loop_range(mut self, start: usize, end: usize) -> Self {
        self.loop_range = Some(LoopRange::new(start, end));
        self
    }

    /// Parses and validates a pattern from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, PatternError> {
        let pattern: Pattern = serde_json::from_str(json)?;
        pattern.validate()?;
        Ok(pattern)
    }

    /// Reads, parses and validates a pattern file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PatternError> {
        let contents = fs::read_to_string(&path)?;
        let pattern = Self::from_json_str(&contents)?;
        log::info!(
            "[Pattern] Loaded '{}' ({} steps) from {:?}",
            pattern.name,
            pattern.step_count(),
            path.as_ref()
        );
        Ok(pattern)
    }

    /// Checks the grid invariants.
    pub fn validate(&self) -> Result<(), PatternError> {
        if !self.time_signature.is_valid() {
            return Err(PatternError::InvalidTimeSignature {
                beats_per_bar: self.time_signature.beats_per_bar,
                beat_unit: self.time_signature.beat_unit,
            });
        }
        let Some(expected) = self.checked_step_count().filter(|_| {
            self.bars > 0 && self.subdivisions_per_beat > 0
        }) else {
            return Err(PatternError::InvalidDimensions {
                bars: self.bars,
                subdivisions: self.subdivisions_per_beat,
            });
        };
        if self.voices.is_empty() {
            return Err(PatternError::EmptyVoices);
        }
        if self.grid.len() != self.voices.len() {
            return Err(PatternError::RowCountMismatch {
                rows: self.grid.len(),
                voices: self.voices.len(),
            });
        }

        if let Some((row, cells)) = self
            .grid
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != expected)
        {
            return Err(PatternError::ColumnCountMismatch {
                row,
                expected,
                actual: cells.len(),
            });
        }

        if let Some(range) = self.loop_range {
            if range.start > range.end || range.end >= expected {
                return Err(PatternError::LoopRangeOutOfBounds {
                    start: range.start,
                    end: range.end,
                    steps: expected,
                });
            }
        }

        Ok(())
    }

    /// Total number of steps (grid columns).
    pub fn step_count(&self) -> usize {
        (self.bars as usize).saturating_mul(self.steps_per_bar())
    }

    /// Step count, `None` when it overflows or exceeds [`MAX_STEPS`].
    pub fn checked_step_count(&self) -> Option<usize> {
        self.time_signature
            .checked_steps_per_bar(self.subdivisions_per_beat)?
            .checked_mul(self.bars as usize)
            .filter(|steps| *steps <= MAX_STEPS)
    }

    pub fn steps_per_bar(&self) -> usize {
        self.time_signature
            .steps_per_bar(self.subdivisions_per_beat)
    }

    /// Beat within the bar that `step` falls on.
    pub fn beat_of_step(&self, step: usize) -> u32 {
        let steps_per_bar = self.steps_per_bar().max(1);
        ((step % steps_per_bar) / self.subdivisions_per_beat.max(1) as usize) as u32
    }

    /// Voices with an active cell at `step`.
    pub fn voices_at(&self, step: usize) -> impl Iterator<Item = DrumVoice> + '_ {
        self.voices
            .iter()
            .zip(self.grid.iter())
            .filter(move |(_, cells)| cells.get(step).copied().unwrap_or(false))
            .map(|(voice, _)| *voice)
    }

    /// Step playback begins on: the loop start when a loop is set.
    pub fn first_step(&self) -> usize {
        self.loop_range.map(|range| range.start).unwrap_or(0)
    }

    /// Step following `step`, wrapping within the loop range or the grid.
    pub fn next_step(&self, step: usize) -> usize {
        match self.loop_range {
            Some(range) => {
                if step >= range.end || step < range.start {
                    range.start
                } else {
                    step + 1
                }
            }
            None => {
                let steps = self.step_count().max(1);
                (step + 1) % steps
            }
        }
    }
}
