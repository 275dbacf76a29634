//! Look-ahead step computation.
//!
//! Pure timing core of the beat scheduler: given the current clock reading
//! it returns every step whose start time falls inside the look-ahead
//! window, advancing its cursor by the fixed step duration. It never looks
//! at how late it was called, so timer jitter cannot accumulate into drift.

use std::sync::Arc;

use super::source::{StepSource, StepTrigger};
use crate::timing::TempoControls;

/// A step committed for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    /// Absolute clock time in seconds
    pub time: f64,
    pub step_index: usize,
    pub beat_index: u32,
    pub trigger: StepTrigger,
}

pub struct LookaheadScheduler {
    source: StepSource,
    controls: Arc<TempoControls>,
    lookahead: f64,
    next_event_time: f64,
    current_step: usize,
}

impl LookaheadScheduler {
    pub fn new(
        source: StepSource,
        controls: Arc<TempoControls>,
        start_time: f64,
        lookahead: f64,
    ) -> Self {
        let current_step = source.first_step();
        Self {
            source,
            controls,
            lookahead,
            next_event_time: start_time,
            current_step,
        }
    }

    /// Time of the next step not yet committed.
    pub fn next_event_time(&self) -> f64 {
        self.next_event_time
    }

    /// Step index that will be committed next.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn source(&self) -> &StepSource {
        &self.source
    }

    /// Step duration at the live tempo.
    pub fn seconds_per_step(&self) -> f64 {
        self.controls
            .tempo()
            .seconds_per_step(self.source.subdivisions())
    }

    /// Commits every step starting before `now + lookahead`.
    pub fn pump(&mut self, now: f64) -> Vec<ScheduledEvent> {
        let horizon = now + self.lookahead;
        let mut events = Vec::new();

        while self.next_event_time < horizon {
            let step = self.current_step;
            events.push(ScheduledEvent {
                time: self.next_event_time,
                step_index: step,
                beat_index: self.source.beat_index(step),
                trigger: self.source.trigger(step),
            });

            // Tempo and meter are read per advance so live edits apply to
            // the next step only.
            self.next_event_time += self.seconds_per_step();
            self.current_step = self
                .source
                .next_step(step, self.controls.time_signature());
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{DrumVoice, Pattern};
    use crate::timing::{Tempo, TimeSignature, MAX_BPM, MIN_BPM};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const LOOKAHEAD: f64 = 0.1;

    fn controls(bpm: u32) -> Arc<TempoControls> {
        Arc::new(TempoControls::new(
            Tempo::clamped(bpm),
            TimeSignature::default(),
        ))
    }

    fn eight_step_pattern() -> Arc<Pattern> {
        let pattern = Pattern::empty(
            "loop",
            "Loop test",
            120,
            TimeSignature::new(2, 4).unwrap(),
            1,
            vec![DrumVoice::Kick],
        )
        .with_hit(DrumVoice::Kick, 4)
        .with_loop_range(4, 7);
        Arc::new(pattern)
    }

    #[test]
    fn test_pump_commits_only_inside_window() {
        let mut scheduler =
            LookaheadScheduler::new(StepSource::Metronome, controls(120), 0.05, LOOKAHEAD);
        let events = scheduler.pump(0.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time, 0.05);
        assert!(events[0].trigger.is_accented());
        assert!(scheduler.pump(0.0).is_empty());
        assert!((scheduler.next_event_time() - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_no_drift_over_1000_steps_with_jitter() {
        let mut rng = StdRng::seed_from_u64(7);
        for &bpm in &[MIN_BPM, 97, 120, 173, MAX_BPM] {
            let pattern = Arc::new(Pattern::empty(
                "p",
                "grid",
                bpm,
                TimeSignature::default(),
                4,
                vec![DrumVoice::HiHat],
            ));
            let start = 0.05;
            let mut scheduler = LookaheadScheduler::new(
                StepSource::Pattern(pattern),
                controls(bpm),
                start,
                LOOKAHEAD,
            );
            let sps = 60.0 / bpm as f64 / 4.0;

            let mut now = 0.0;
            let mut committed = Vec::new();
            while committed.len() < 1000 {
                for event in scheduler.pump(now) {
                    assert!(event.time < now + LOOKAHEAD);
                    assert!(event.time >= now, "step committed late at bpm {}", bpm);
                    committed.push(event.time);
                }
                now += rng.gen_range(0.025..0.05);
            }

            for (k, time) in committed.iter().enumerate().take(1000) {
                let expected = start + k as f64 * sps;
                assert!(
                    (time - expected).abs() < 1e-9,
                    "bpm {} step {} drifted: {} vs {}",
                    bpm,
                    k,
                    time,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_live_bpm_change_affects_future_only() {
        let tempo = controls(120);
        let mut scheduler =
            LookaheadScheduler::new(StepSource::Metronome, Arc::clone(&tempo), 0.0, LOOKAHEAD);
        let first = scheduler.pump(0.0);
        assert_eq!(first[0].time, 0.0);
        assert_eq!(scheduler.next_event_time(), 0.5);

        tempo.set_tempo(Tempo::clamped(60));
        let second = scheduler.pump(0.45);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].time, 0.5);
        assert_eq!(scheduler.next_event_time(), 1.5);
    }

    #[test]
    fn test_loop_range_sequence() {
        let mut scheduler = LookaheadScheduler::new(
            StepSource::Pattern(eight_step_pattern()),
            controls(120),
            0.0,
            LOOKAHEAD,
        );
        assert_eq!(scheduler.current_step(), 4);

        let steps: Vec<usize> = scheduler
            .pump(2.0)
            .into_iter()
            .map(|event| event.step_index)
            .take(10)
            .collect();
        assert_eq!(steps, vec![4, 5, 6, 7, 4, 5, 6, 7, 4, 5]);
    }

    #[test]
    fn test_metronome_beats_follow_meter_change() {
        let tempo = controls(120);
        let mut scheduler =
            LookaheadScheduler::new(StepSource::Metronome, Arc::clone(&tempo), 0.0, LOOKAHEAD);
        let beats: Vec<u32> = scheduler.pump(1.85).iter().map(|e| e.beat_index).collect();
        assert_eq!(beats, vec![0, 1, 2, 3]);

        tempo.set_time_signature(TimeSignature::new(3, 4).unwrap());
        let beats: Vec<u32> = scheduler.pump(3.35).iter().map(|e| e.beat_index).collect();
        assert_eq!(beats, vec![0, 1, 2]);
    }
}
