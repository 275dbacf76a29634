//! What the scheduler plays: a bar of metronome clicks or a drum pattern.

use std::sync::Arc;

use crate::pattern::{DrumVoice, Pattern};
use crate::timing::TimeSignature;

/// Sound(s) a single step triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTrigger {
    Click { accented: bool },
    /// Active voices at a pattern step; empty for a rest
    Voices(Vec<DrumVoice>),
}

impl StepTrigger {
    pub fn is_accented(&self) -> bool {
        matches!(self, StepTrigger::Click { accented: true })
    }
}

/// Step sequence driving one scheduler run.
#[derive(Debug, Clone)]
pub enum StepSource {
    /// One step per beat; step 0 of each bar is accented
    Metronome,
    Pattern(Arc<Pattern>),
}

impl StepSource {
    /// Steps per beat used for step duration.
    pub fn subdivisions(&self) -> u32 {
        match self {
            StepSource::Metronome => 1,
            StepSource::Pattern(pattern) => pattern.subdivisions_per_beat.max(1),
        }
    }

    pub fn first_step(&self) -> usize {
        match self {
            StepSource::Metronome => 0,
            StepSource::Pattern(pattern) => pattern.first_step(),
        }
    }

    /// Step after `step`. The metronome reads the live meter so a time
    /// signature change lands on the next advance.
    pub fn next_step(&self, step: usize, time_signature: TimeSignature) -> usize {
        match self {
            StepSource::Metronome => {
                let beats = time_signature.beats_per_bar.max(1) as usize;
                if step + 1 >= beats {
                    0
                } else {
                    step + 1
                }
            }
            StepSource::Pattern(pattern) => pattern.next_step(step),
        }
    }

    pub fn beat_index(&self, step: usize) -> u32 {
        match self {
            StepSource::Metronome => step as u32,
            StepSource::Pattern(pattern) => pattern.beat_of_step(step),
        }
    }

    pub fn trigger(&self, step: usize) -> StepTrigger {
        match self {
            StepSource::Metronome => StepTrigger::Click { accented: step == 0 },
            StepSource::Pattern(pattern) => StepTrigger::Voices(pattern.voices_at(step).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metronome_wraps_on_bar() {
        let source = StepSource::Metronome;
        let meter = TimeSignature::default();
        let mut step = source.first_step();
        let mut seen = Vec::new();
        for _ in 0..9 {
            seen.push(step);
            step = source.next_step(step, meter);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 0, 1, 2, 3, 0]);
        assert!(source.trigger(0).is_accented());
        assert!(!source.trigger(2).is_accented());
    }

    #[test]
    fn test_metronome_shrinking_bar_wraps_immediately() {
        let source = StepSource::Metronome;
        let three_four = TimeSignature::new(3, 4).unwrap();
        assert_eq!(source.next_step(4, three_four), 0);
        assert_eq!(source.next_step(1, three_four), 2);
    }

    #[test]
    fn test_pattern_triggers_active_voices() {
        let pattern = Pattern::empty(
            "p",
            "test",
            120,
            TimeSignature::default(),
            1,
            vec![DrumVoice::Kick, DrumVoice::Snare, DrumVoice::HiHat],
        )
        .with_hit(DrumVoice::Kick, 0)
        .with_hit(DrumVoice::HiHat, 0)
        .with_hit(DrumVoice::Snare, 4);
        let source = StepSource::Pattern(Arc::new(pattern));

        assert_eq!(source.subdivisions(), 4);
        assert_eq!(
            source.trigger(0),
            StepTrigger::Voices(vec![DrumVoice::Kick, DrumVoice::HiHat])
        );
        assert_eq!(source.trigger(4), StepTrigger::Voices(vec![DrumVoice::Snare]));
        assert_eq!(source.trigger(1), StepTrigger::Voices(vec![]));
        assert_eq!(source.beat_index(5), 1);
    }
}
