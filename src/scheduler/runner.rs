//! Beat scheduler task.
//!
//! One tokio task per playback run interleaves two timers:
//! - a housekeeping interval (25–50 ms) that commits every step inside the
//!   look-ahead window to the synthesizer
//! - a visual timer aligned to the next committed step, which publishes the
//!   beat/step index when that step's time arrives
//!
//! Stop aborts the task and bumps a generation counter so a write racing
//! the abort on another worker thread is discarded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::clock::SchedulerClock;
use super::lookahead::{LookaheadScheduler, ScheduledEvent};
use super::source::{StepSource, StepTrigger};
use crate::audio::Synthesizer;
use crate::config::SchedulerConfig;
use crate::error::PlaybackError;
use crate::timing::TempoControls;

/// Slack when deciding whether a queued visual step is due
const VISUAL_TOLERANCE_S: f64 = 0.001;

/// Beat/step update for the visual indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEvent {
    pub beat_index: u32,
    pub step_index: usize,
    /// Clock time the step sounded at, in seconds
    pub time: f64,
    pub accented: bool,
}

impl From<&ScheduledEvent> for StepEvent {
    fn from(event: &ScheduledEvent) -> Self {
        Self {
            beat_index: event.beat_index,
            step_index: event.step_index,
            time: event.time,
            accented: event.trigger.is_accented(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub beat_index: u32,
    pub step_index: usize,
}

#[derive(Debug, Default)]
struct PositionInner {
    generation: u64,
    position: Position,
}

/// Current beat/step index, written only by the active scheduler run.
#[derive(Debug, Default)]
pub struct PlaybackPosition {
    inner: Mutex<PositionInner>,
}

impl PlaybackPosition {
    /// Writes a position if `generation` is still current.
    pub fn publish(&self, generation: u64, position: Position) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.position = position;
        true
    }

    /// Zeroes the indices and invalidates writers from earlier runs.
    pub fn reset(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.position = Position::default();
        inner.generation
    }

    pub fn snapshot(&self) -> Position {
        self.lock().position
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn lock(&self) -> MutexGuard<'_, PositionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// Drives look-ahead scheduling for one playback mode at a time.
pub struct BeatScheduler {
    controls: Arc<TempoControls>,
    config: SchedulerConfig,
    position: Arc<PlaybackPosition>,
    steps_tx: broadcast::Sender<StepEvent>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BeatScheduler {
    pub fn new(
        controls: Arc<TempoControls>,
        config: SchedulerConfig,
        steps_tx: broadcast::Sender<StepEvent>,
    ) -> Self {
        Self {
            controls,
            config,
            position: Arc::new(PlaybackPosition::default()),
            steps_tx,
            task: Mutex::new(None),
        }
    }

    /// Starts a run on the current tokio runtime, replacing any active run.
    ///
    /// `synth` is only consulted when `clock` is an audio clock.
    pub fn start(
        &self,
        source: StepSource,
        clock: Arc<dyn SchedulerClock>,
        synth: Option<Arc<Synthesizer>>,
    ) -> Result<(), PlaybackError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PlaybackError::NoRuntime)?;
        self.stop();

        let generation = self.position.reset();
        let start_time = clock.now() + self.config.latency_hint_secs();
        let lookahead = LookaheadScheduler::new(
            source,
            Arc::clone(&self.controls),
            start_time,
            self.config.lookahead_secs(),
        );
        let synth = synth.filter(|_| clock.is_audio());

        log::info!(
            "[Scheduler] Starting at t={:.3}s, {} bpm, tick {:?}{}",
            start_time,
            self.controls.tempo().bpm(),
            self.config.tick_interval(),
            if synth.is_some() { "" } else { " (visual only)" }
        );

        let run = SchedulerRun {
            lookahead,
            clock,
            synth,
            position: Arc::clone(&self.position),
            generation,
            steps_tx: self.steps_tx.clone(),
            pending: VecDeque::with_capacity(self.config.event_buffer),
        };
        let handle = runtime.spawn(run.run(self.config.tick_interval()));
        *self.lock_task() = Some(handle);
        Ok(())
    }

    /// Cancels the run; already committed sounds play out. Indices reset to 0.
    pub fn stop(&self) {
        if let Some(handle) = self.lock_task().take() {
            handle.abort();
            log::info!("[Scheduler] Stopped");
        }
        self.position.reset();
    }

    pub fn state(&self) -> SchedulerState {
        match self.lock_task().as_ref() {
            Some(handle) if !handle.is_finished() => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }

    pub fn position(&self) -> Position {
        self.position.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StepEvent> {
        self.steps_tx.subscribe()
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for BeatScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_task().take() {
            handle.abort();
        }
    }
}

/// State owned by one running scheduler task.
struct SchedulerRun {
    lookahead: LookaheadScheduler,
    clock: Arc<dyn SchedulerClock>,
    synth: Option<Arc<Synthesizer>>,
    position: Arc<PlaybackPosition>,
    generation: u64,
    steps_tx: broadcast::Sender<StepEvent>,
    /// Committed steps waiting for their visual update, in time order
    pending: VecDeque<StepEvent>,
}

impl SchedulerRun {
    async fn run(mut self, tick: Duration) {
        let mut ticker = time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let visual_deadline = self.pending.front().map(|event| self.deadline_for(event.time));

            tokio::select! {
                _ = ticker.tick() => self.housekeeping(),
                _ = time::sleep_until(visual_deadline.unwrap_or_else(Instant::now)),
                    if visual_deadline.is_some() => self.emit_due(),
            }
        }
    }

    fn deadline_for(&self, event_time: f64) -> Instant {
        let until = (event_time - self.clock.now()).max(0.0);
        Instant::now() + Duration::from_secs_f64(until)
    }

    fn housekeeping(&mut self) {
        let now = self.clock.now();
        for event in self.lookahead.pump(now) {
            self.commit(&event);
            self.pending.push_back(StepEvent::from(&event));
        }
    }

    fn commit(&self, event: &ScheduledEvent) {
        let Some(synth) = self.synth.as_ref() else {
            return;
        };
        match &event.trigger {
            StepTrigger::Click { accented } => {
                synth.schedule_click(event.time, *accented);
            }
            StepTrigger::Voices(voices) => {
                for voice in voices {
                    synth.schedule_voice_hit(event.time, *voice);
                }
            }
        }
    }

    /// Publishes the step the visual timer fired for, plus any others due.
    fn emit_due(&mut self) {
        let Some(first) = self.pending.pop_front() else {
            return;
        };
        self.emit(first);

        let now = self.clock.now();
        while self
            .pending
            .front()
            .map(|event| event.time <= now + VISUAL_TOLERANCE_S)
            .unwrap_or(false)
        {
            if let Some(event) = self.pending.pop_front() {
                self.emit(event);
            }
        }
    }

    fn emit(&self, event: StepEvent) {
        let position = Position {
            beat_index: event.beat_index,
            step_index: event.step_index,
        };
        if self.position.publish(self.generation, position) {
            // Nobody listening is fine
            let _ = self.steps_tx.send(event);
        }
    }
}
