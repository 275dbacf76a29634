//! End-to-end playback tests driven through `PracticeEngine`.
//!
//! All tests run on a paused tokio clock, so the stub audio context and the
//! visual timers advance deterministically.

use std::sync::Arc;
use std::time::Duration;

use practice_metronome::audio::{AudioHost, NullAudioHost, SoundTag, StubAudioHost};
use practice_metronome::lifecycle::{CloseDecision, NoopWakeLock, StubWakeLock, WakeLock};
use practice_metronome::{
    AppConfig, DrumVoice, Pattern, PlaybackState, PracticeEngine, TimeSignature,
};
use tokio_stream::StreamExt;

fn stub_engine() -> (PracticeEngine, Arc<StubAudioHost>, Arc<StubWakeLock>) {
    let host = Arc::new(StubAudioHost::new());
    let wake_lock = Arc::new(StubWakeLock::new());
    let engine = PracticeEngine::new(
        AppConfig::default(),
        Arc::clone(&host) as Arc<dyn AudioHost>,
        Arc::clone(&wake_lock) as Arc<dyn WakeLock>,
    );
    (engine, host, wake_lock)
}

fn looped_pattern() -> Pattern {
    Pattern::empty(
        "loop",
        "Loop section",
        120,
        TimeSignature::new(4, 4).unwrap(),
        1,
        vec![DrumVoice::Kick, DrumVoice::HiHat],
    )
    .with_hit(DrumVoice::Kick, 4)
    .with_hit(DrumVoice::HiHat, 6)
    .with_loop_range(4, 7)
}

#[tokio::test(start_paused = true)]
async fn test_metronome_beats_wrap_at_bar_line() {
    let (engine, host, _) = stub_engine();
    engine.set_bpm(120);
    let mut steps = engine.step_stream();
    engine.toggle_metronome();

    let mut events = Vec::new();
    for _ in 0..5 {
        events.push(steps.next().await.unwrap());
    }
    engine.stop_all();

    let beats: Vec<u32> = events.iter().map(|event| event.beat_index).collect();
    assert_eq!(beats, vec![0, 1, 2, 3, 0]);
    assert!(events[0].accented);
    assert!(!events[1].accented);
    assert!(events[4].accented);
    for pair in events.windows(2) {
        assert!((pair[1].time - pair[0].time - 0.5).abs() < 1e-9);
    }

    let sounds = host.last_context().unwrap().scheduled();
    let accent = sounds
        .iter()
        .find(|sound| sound.tag == SoundTag::Click { accented: true })
        .unwrap();
    let regular = sounds
        .iter()
        .find(|sound| sound.tag == SoundTag::Click { accented: false })
        .unwrap();
    assert!(accent.tone.start_frequency_hz > regular.tone.start_frequency_hz);
}

#[tokio::test(start_paused = true)]
async fn test_three_four_meter_accents_every_third_beat() {
    let (engine, _, _) = stub_engine();
    engine
        .set_time_signature(TimeSignature::new(3, 4).unwrap())
        .unwrap();
    let mut steps = engine.step_stream();
    engine.toggle_metronome();

    let mut accents = Vec::new();
    for _ in 0..7 {
        accents.push(steps.next().await.unwrap().accented);
    }
    engine.stop_all();
    assert_eq!(
        accents,
        vec![true, false, false, true, false, false, true]
    );
}

#[tokio::test(start_paused = true)]
async fn test_playback_continues_without_audio_output() {
    let engine = PracticeEngine::new(
        AppConfig::default(),
        Arc::new(NullAudioHost),
        Arc::new(NoopWakeLock),
    );
    let mut steps = engine.step_stream();
    assert_eq!(engine.toggle_metronome(), PlaybackState::MetronomePlaying);

    let first = steps.next().await.unwrap();
    let second = steps.next().await.unwrap();
    assert_eq!((first.beat_index, second.beat_index), (0, 1));
    assert!(!engine.audio().is_available());
    engine.stop_all();
}

#[tokio::test(start_paused = true)]
async fn test_modes_are_mutually_exclusive() {
    let (engine, _, _) = stub_engine();
    engine.load_pattern(looped_pattern()).unwrap();

    engine.toggle_metronome();
    assert_eq!(engine.toggle_pattern(), PlaybackState::PatternPlaying);
    assert!(!engine.is_metronome_playing());

    assert_eq!(engine.toggle_metronome(), PlaybackState::MetronomePlaying);
    assert!(!engine.is_pattern_playing());

    assert_eq!(engine.stop_all(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stop_resets_position_to_start() {
    let (engine, _, _) = stub_engine();
    let mut steps = engine.step_stream();
    engine.toggle_metronome();
    steps.next().await.unwrap();
    steps.next().await.unwrap();
    steps.next().await.unwrap();
    assert_eq!(engine.beat_index(), 2);

    engine.stop_all();
    assert_eq!(engine.beat_index(), 0);
    assert_eq!(engine.step_index(), 0);

    // No late visual update after stopping
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(engine.beat_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_pattern_plays_inside_loop_range() {
    let (engine, host, _) = stub_engine();
    engine.load_pattern(looped_pattern()).unwrap();
    let mut steps = engine.step_stream();
    engine.toggle_pattern();

    let mut indices = Vec::new();
    for _ in 0..9 {
        indices.push(steps.next().await.unwrap().step_index);
    }
    engine.stop_all();
    assert_eq!(indices, vec![4, 5, 6, 7, 4, 5, 6, 7, 4]);

    let sounds = host.last_context().unwrap().scheduled();
    assert!(sounds
        .iter()
        .any(|sound| sound.tag == SoundTag::Voice { voice: DrumVoice::Kick }));
    assert!(sounds
        .iter()
        .any(|sound| sound.tag == SoundTag::Voice { voice: DrumVoice::HiHat }));
    assert!(sounds
        .iter()
        .all(|sound| !matches!(sound.tag, SoundTag::Click { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_guards_follow_active_playback() {
    let (engine, _, wake_lock) = stub_engine();
    let guard = engine.unload_guard();
    let mut active = engine.active_signal().subscribe();

    engine.toggle_metronome();
    active.changed().await.unwrap();
    assert!(*active.borrow());
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(wake_lock.is_held());
    assert_eq!(guard.on_close_requested(), CloseDecision::Confirm);

    engine.stop_all();
    active.changed().await.unwrap();
    assert!(!*active.borrow());
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(!wake_lock.is_held());
    assert_eq!(guard.on_close_requested(), CloseDecision::Proceed);
}

#[tokio::test(start_paused = true)]
async fn test_failed_wake_lock_does_not_block_playback() {
    let (engine, _, wake_lock) = stub_engine();
    wake_lock.set_fail_requests(true);
    let mut steps = engine.step_stream();

    assert_eq!(engine.toggle_metronome(), PlaybackState::MetronomePlaying);
    assert_eq!(steps.next().await.unwrap().beat_index, 0);
    assert!(!wake_lock.is_held());
    engine.stop_all();
}

#[test]
fn test_practice_mode_is_independent_of_playback() {
    let (engine, _, _) = stub_engine();
    let mode = engine.practice_mode();
    let rx = mode.subscribe();

    assert!(mode.toggle());
    assert!(*rx.borrow());
    assert_eq!(engine.playback_state(), PlaybackState::Idle);
    mode.exit();
    assert!(!mode.is_active());
}
