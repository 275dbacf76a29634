//! PracticeEngine: playback orchestration layer.
//!
//! Composes the audio context manager, synthesizer, beat scheduler and
//! playback coordinator behind one handle shared by the CLI and embedding
//! UIs. Every public operation is synchronous and never fails because of a
//! missing platform capability: audio and wake-lock absence degrade
//! silently and are reported through telemetry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tokio::sync::broadcast;

use crate::audio::{default_host, AudioHost, Synthesizer};
use crate::config::AppConfig;
use crate::error::{log_playback_error, PatternError, PlaybackError};
use crate::lifecycle::{NoopWakeLock, PracticeMode, Store, UnloadGuard, WakeLock, WakeLockGuard};
use crate::managers::{
    AudioContextManager, BroadcastChannelManager, PlaybackCoordinator, PlaybackState, Transition,
};
use crate::pattern::Pattern;
use crate::scheduler::{
    AudioClock, BeatScheduler, Position, SchedulerClock, StepEvent, StepSource, WallClock,
};
use crate::telemetry::{
    Capability, PlaybackMode, TelemetryCollector, TelemetryEvent, TelemetryEventKind,
    TelemetrySnapshot,
};
use crate::timing::{TapTempo, Tempo, TempoControls, TimeSignature};

#[path = "core_subscriptions.rs"]
mod core_subscriptions;


/// Handle owning one metronome/pattern playback engine.
pub struct PracticeEngine {
    config: AppConfig,
    audio: Arc<AudioContextManager>,
    synth: Arc<Synthesizer>,
    controls: Arc<TempoControls>,
    coordinator: PlaybackCoordinator,
    scheduler: BeatScheduler,
    pattern: RwLock<Option<Arc<Pattern>>>,
    pub(crate) broadcasts: BroadcastChannelManager,
    telemetry: Arc<TelemetryCollector>,
    wake_lock: WakeLockGuard,
    active: Store<bool>,
    practice_mode: PracticeMode,
    tap_tempo: Mutex<TapTempo>,
    /// Serializes transitions so scheduler start/stop follows state order
    transition_lock: Mutex<()>,
    audio_downgrade_reported: AtomicBool,
}

impl PracticeEngine {
    pub fn new(config: AppConfig, host: Arc<dyn AudioHost>, wake_lock: Arc<dyn WakeLock>) -> Self {
        let audio = Arc::new(AudioContextManager::new(host));
        let synth = Arc::new(Synthesizer::new(Arc::clone(&audio), config.synth.clone()));
        let controls = Arc::new(TempoControls::new(
            config.defaults.tempo(),
            config.defaults.time_signature(),
        ));

        let broadcasts = BroadcastChannelManager::new();
        let steps_tx = broadcasts.init_steps(config.scheduler.event_buffer);
        broadcasts.init_playback_state();

        let scheduler = BeatScheduler::new(
            Arc::clone(&controls),
            config.scheduler.clone(),
            steps_tx,
        );
        let telemetry = Arc::new(TelemetryCollector::default());
        let wake_lock = WakeLockGuard::new(wake_lock, Arc::clone(&telemetry));

        Self {
            config,
            audio,
            synth,
            controls,
            coordinator: PlaybackCoordinator::new(),
            scheduler,
            pattern: RwLock::new(None),
            broadcasts,
            telemetry,
            wake_lock,
            active: Store::new(false),
            practice_mode: PracticeMode::new(),
            tap_tempo: Mutex::new(TapTempo::new()),
            transition_lock: Mutex::new(()),
            audio_downgrade_reported: AtomicBool::new(false),
        }
    }

    /// Engine with file/default configuration, the platform audio host and
    /// no wake lock.
    pub fn with_defaults() -> Self {
        Self::new(AppConfig::load(), default_host(), Arc::new(NoopWakeLock))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ========================================================================
    // PATTERN
    // ========================================================================

    /// Validates and installs a pattern. A playing pattern restarts on the
    /// new one.
    pub fn load_pattern(&self, pattern: Pattern) -> Result<(), PatternError> {
        pattern.validate()?;
        log::info!(
            "[PracticeEngine] Loaded pattern '{}' ({} steps)",
            pattern.name,
            pattern.step_count()
        );
        *self.pattern_write() = Some(Arc::new(pattern));

        let _transition = self.lock_transitions();
        if self.coordinator.state() == PlaybackState::PatternPlaying {
            if let Err(err) = self.start_mode(PlaybackState::PatternPlaying) {
                self.recover_from_start_failure(&err);
            }
        }
        Ok(())
    }

    pub fn pattern(&self) -> Option<Arc<Pattern>> {
        self.pattern
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    pub fn toggle_metronome(&self) -> PlaybackState {
        let _transition = self.lock_transitions();
        let transition = self.coordinator.toggle_metronome();
        self.apply(transition)
    }

    /// Toggles pattern playback. Without a loaded pattern starting is
    /// refused with a warning and the state is unchanged.
    pub fn toggle_pattern(&self) -> PlaybackState {
        let _transition = self.lock_transitions();
        let current = self.coordinator.state();
        if current != PlaybackState::PatternPlaying && !self.refuse_without_pattern() {
            return current;
        }
        let transition = self.coordinator.toggle_pattern();
        self.apply(transition)
    }

    pub fn set_metronome_playing(&self, playing: bool) -> PlaybackState {
        let _transition = self.lock_transitions();
        let transition = self.coordinator.set_metronome_playing(playing);
        self.apply(transition)
    }

    pub fn set_pattern_playing(&self, playing: bool) -> PlaybackState {
        let _transition = self.lock_transitions();
        if playing && !self.refuse_without_pattern() {
            return self.coordinator.state();
        }
        let transition = self.coordinator.set_pattern_playing(playing);
        self.apply(transition)
    }

    /// Stops whatever is playing; indices read 0 afterwards.
    pub fn stop_all(&self) -> PlaybackState {
        let _transition = self.lock_transitions();
        let transition = self.coordinator.stop_all();
        self.apply(transition);
        // Idle already, but a stopped run must still read as position 0
        self.scheduler.stop();
        self.coordinator.state()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.coordinator.state()
    }

    pub fn is_metronome_playing(&self) -> bool {
        self.playback_state() == PlaybackState::MetronomePlaying
    }

    pub fn is_pattern_playing(&self) -> bool {
        self.playback_state() == PlaybackState::PatternPlaying
    }

    pub fn is_any_active(&self) -> bool {
        self.coordinator.is_any_active()
    }

    pub fn position(&self) -> Position {
        self.scheduler.position()
    }

    pub fn beat_index(&self) -> u32 {
        self.position().beat_index
    }

    pub fn step_index(&self) -> usize {
        self.position().step_index
    }

    // ========================================================================
    // TEMPO & METER
    // ========================================================================

    /// Sets the tempo, clamped to the supported range. Applies from the
    /// next step; already scheduled steps keep their times.
    pub fn set_bpm(&self, bpm: u32) -> Tempo {
        let tempo = Tempo::clamped(bpm);
        let previous = self.controls.tempo();
        self.controls.set_tempo(tempo);
        if previous != tempo {
            log::info!("[PracticeEngine] BPM {} -> {}", previous.bpm(), tempo.bpm());
            self.emit_event(TelemetryEventKind::BpmChanged { bpm: tempo.bpm() }, None);
        }
        tempo
    }

    pub fn tempo(&self) -> Tempo {
        self.controls.tempo()
    }

    pub fn set_time_signature(&self, time_signature: TimeSignature) -> Result<(), PatternError> {
        if !time_signature.is_valid() {
            return Err(PatternError::InvalidTimeSignature {
                beats_per_bar: time_signature.beats_per_bar,
                beat_unit: time_signature.beat_unit,
            });
        }
        if self.controls.time_signature() != time_signature {
            self.controls.set_time_signature(time_signature);
            self.emit_event(
                TelemetryEventKind::TimeSignatureChanged {
                    beats_per_bar: time_signature.beats_per_bar,
                    beat_unit: time_signature.beat_unit,
                },
                None,
            );
        }
        Ok(())
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.controls.time_signature()
    }

    /// Registers a tap at `at_secs` and applies the derived tempo, if any.
    pub fn tap_tempo(&self, at_secs: f64) -> Option<Tempo> {
        let tempo = self
            .tap_tempo
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .tap(at_secs)?;
        Some(self.set_bpm(tempo.bpm()))
    }

    // ========================================================================
    // LIFECYCLE & OBSERVATION
    // ========================================================================

    /// "Any playback active" signal, recomputed on every transition.
    pub fn active_signal(&self) -> &Store<bool> {
        &self.active
    }

    pub fn unload_guard(&self) -> UnloadGuard {
        UnloadGuard::attach(&self.active)
    }

    pub fn practice_mode(&self) -> &PracticeMode {
        &self.practice_mode
    }

    pub fn audio(&self) -> &Arc<AudioContextManager> {
        &self.audio
    }

    pub fn subscribe_steps(&self) -> broadcast::Receiver<StepEvent> {
        self.scheduler.subscribe()
    }

    pub fn subscribe_playback_state(&self) -> Option<broadcast::Receiver<PlaybackState>> {
        self.broadcasts.subscribe_playback_state()
    }

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.telemetry.subscribe()
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn apply(&self, transition: Transition) -> PlaybackState {
        if !transition.is_change() {
            return transition.to;
        }

        if let Some(stopped) = transition.stopped() {
            self.scheduler.stop();
            if let Some(mode) = playback_mode(stopped) {
                self.emit_event(TelemetryEventKind::PlaybackStopped { mode }, None);
            }
        }

        if let Some(started) = transition.started() {
            if let Err(err) = self.start_mode(started) {
                self.recover_from_start_failure(&err);
            }
        }

        self.sync_signals();
        self.coordinator.state()
    }

    fn start_mode(&self, state: PlaybackState) -> Result<(), PlaybackError> {
        let (source, mode) = match state {
            PlaybackState::Idle => return Ok(()),
            PlaybackState::MetronomePlaying => (StepSource::Metronome, PlaybackMode::Metronome),
            PlaybackState::PatternPlaying => {
                let pattern = self.pattern().ok_or(PlaybackError::NoPatternLoaded)?;
                self.set_bpm(pattern.bpm);
                (StepSource::Pattern(pattern), PlaybackMode::Pattern)
            }
        };

        self.resume_audio();
        let clock = self.select_clock();
        self.scheduler
            .start(source, clock, Some(Arc::clone(&self.synth)))?;

        self.emit_event(
            TelemetryEventKind::PlaybackStarted {
                mode,
                bpm: self.controls.tempo().bpm(),
            },
            None,
        );
        Ok(())
    }

    fn recover_from_start_failure(&self, err: &PlaybackError) {
        log_playback_error(err, "start_playback");
        self.emit_event(
            TelemetryEventKind::Warning,
            Some(format!("playback did not start: {}", err)),
        );
        self.scheduler.stop();
        self.coordinator.stop_all();
        self.sync_signals();
    }

    /// Audio clock when a context exists, wall clock otherwise.
    fn select_clock(&self) -> Arc<dyn SchedulerClock> {
        match self.audio.context() {
            Some(context) => Arc::new(AudioClock::new(context)),
            None => {
                if !self.audio_downgrade_reported.swap(true, Ordering::SeqCst) {
                    log::warn!("[PracticeEngine] No audio output, running visual-only on wall clock");
                    self.emit_event(
                        TelemetryEventKind::CapabilityDowngraded {
                            capability: Capability::AudioOutput,
                        },
                        Some("visual-only playback".to_string()),
                    );
                }
                Arc::new(WallClock::new())
            }
        }
    }

    /// Resume must be requested from the user's start action; it completes
    /// in the background.
    fn resume_audio(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let audio = Arc::clone(&self.audio);
        runtime.spawn(async move {
            audio.resume().await;
        });
    }

    fn refuse_without_pattern(&self) -> bool {
        if self.pattern().is_some() {
            return true;
        }
        log::warn!("[PracticeEngine] Pattern playback requested with no pattern loaded");
        self.emit_event(
            TelemetryEventKind::Warning,
            Some("no pattern loaded".to_string()),
        );
        false
    }

    fn sync_signals(&self) {
        let state = self.coordinator.state();
        if self.active.set(state.is_active()) {
            if state.is_active() {
                self.wake_lock.acquire();
            } else {
                self.wake_lock.release();
            }
        }
        self.broadcasts.publish_playback_state(state);
    }

    fn emit_event(&self, kind: TelemetryEventKind, detail: Option<String>) {
        self.telemetry.record(kind, detail);
    }

    fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.transition_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pattern_write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<Pattern>>> {
        self.pattern
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for PracticeEngine {
    fn default() -> Self {
        Self::new(AppConfig::default(), default_host(), Arc::new(NoopWakeLock))
    }
}

fn playback_mode(state: PlaybackState) -> Option<PlaybackMode> {
    match state {
        PlaybackState::Idle => None,
        PlaybackState::MetronomePlaying => Some(PlaybackMode::Metronome),
        PlaybackState::PatternPlaying => Some(PlaybackMode::Pattern),
    }
}
