//! Click/hit synthesizer.
//!
//! Converts a trigger time plus an accent flag or drum voice into a
//! [`ScheduledSound`] and commits it to the shared audio context. Every
//! call builds its own tone description, so overlapping hits never share
//! mutable synthesis state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SynthConfig;
use crate::error::log_audio_error;
use crate::managers::AudioContextManager;
use crate::pattern::DrumVoice;

/// Parametric description of one percussive sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    pub start_frequency_hz: f32,
    /// Pitch reached at the end of the sound (exponential sweep)
    pub end_frequency_hz: f32,
    /// 0.0 = pure sine, 1.0 = pure noise
    pub noise_mix: f32,
    pub gain: f32,
    pub attack_s: f32,
    /// Time from peak to near-silence
    pub decay_s: f32,
}

impl ToneSpec {
    /// Constant-pitch sine tone.
    pub fn sine(frequency_hz: f32, gain: f32, attack_s: f32, decay_s: f32) -> Self {
        Self {
            start_frequency_hz: frequency_hz,
            end_frequency_hz: frequency_hz,
            noise_mix: 0.0,
            gain,
            attack_s,
            decay_s,
        }
    }

    /// Total length in seconds.
    pub fn duration(&self) -> f32 {
        self.attack_s + self.decay_s
    }
}

/// What a scheduled sound represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SoundTag {
    Click { accented: bool },
    Voice { voice: DrumVoice },
}

/// A sound committed at an absolute audio-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSound {
    /// Absolute audio-clock time in seconds
    pub at: f64,
    pub tag: SoundTag,
    pub tone: ToneSpec,
}

/// Schedules clicks and drum hits on the shared audio context.
pub struct Synthesizer {
    audio: Arc<AudioContextManager>,
    config: SynthConfig,
}

impl Synthesizer {
    const CLICK_ATTACK_S: f32 = 0.001;
    const REGULAR_GAIN_RATIO: f32 = 0.7;

    pub fn new(audio: Arc<AudioContextManager>, config: SynthConfig) -> Self {
        Self { audio, config }
    }

    /// Metronome click voicing; accents are higher and louder.
    pub fn click_tone(&self, accented: bool) -> ToneSpec {
        let (frequency, gain) = if accented {
            (self.config.accent_frequency_hz, self.config.click_gain)
        } else {
            (
                self.config.regular_frequency_hz,
                self.config.click_gain * Self::REGULAR_GAIN_RATIO,
            )
        };
        ToneSpec::sine(
            frequency,
            gain,
            Self::CLICK_ATTACK_S,
            (self.config.decay_ms / 1000.0).max(0.005),
        )
    }

    /// Drum voicing for pattern playback.
    pub fn voice_tone(voice: DrumVoice) -> ToneSpec {
        match voice {
            DrumVoice::Kick => ToneSpec {
                start_frequency_hz: 150.0,
                end_frequency_hz: 45.0,
                noise_mix: 0.0,
                gain: 0.9,
                attack_s: 0.002,
                decay_s: 0.3,
            },
            DrumVoice::Snare => ToneSpec {
                start_frequency_hz: 220.0,
                end_frequency_hz: 180.0,
                noise_mix: 0.7,
                gain: 0.6,
                attack_s: 0.001,
                decay_s: 0.18,
            },
            DrumVoice::HiHat => ToneSpec {
                start_frequency_hz: 8000.0,
                end_frequency_hz: 8000.0,
                noise_mix: 0.95,
                gain: 0.35,
                attack_s: 0.001,
                decay_s: 0.05,
            },
            DrumVoice::OpenHat => ToneSpec {
                start_frequency_hz: 8000.0,
                end_frequency_hz: 7000.0,
                noise_mix: 0.95,
                gain: 0.35,
                attack_s: 0.001,
                decay_s: 0.3,
            },
            DrumVoice::Clap => ToneSpec {
                start_frequency_hz: 1200.0,
                end_frequency_hz: 900.0,
                noise_mix: 0.85,
                gain: 0.5,
                attack_s: 0.002,
                decay_s: 0.12,
            },
            DrumVoice::Tom => ToneSpec {
                start_frequency_hz: 220.0,
                end_frequency_hz: 110.0,
                noise_mix: 0.05,
                gain: 0.7,
                attack_s: 0.002,
                decay_s: 0.25,
            },
        }
    }

    /// Schedules a click at absolute audio time `at`.
    ///
    /// Returns false when no audio context is available or the commit failed.
    pub fn schedule_click(&self, at: f64, accented: bool) -> bool {
        self.submit(ScheduledSound {
            at,
            tag: SoundTag::Click { accented },
            tone: self.click_tone(accented),
        })
    }

    /// Schedules a drum hit at absolute audio time `at`.
    pub fn schedule_voice_hit(&self, at: f64, voice: DrumVoice) -> bool {
        self.submit(ScheduledSound {
            at,
            tag: SoundTag::Voice { voice },
            tone: Self::voice_tone(voice),
        })
    }

    fn submit(&self, sound: ScheduledSound) -> bool {
        let Some(context) = self.audio.context() else {
            return false;
        };
        match context.schedule(sound) {
            Ok(()) => true,
            Err(err) => {
                log_audio_error(&err, "schedule_sound");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::stubs::{NullAudioHost, StubAudioHost};

    fn synth_with(host: Arc<StubAudioHost>) -> Synthesizer {
        let manager = Arc::new(AudioContextManager::new(host));
        Synthesizer::new(manager, SynthConfig::default())
    }

    #[test]
    fn test_accent_is_higher_pitched() {
        let synth = synth_with(Arc::new(StubAudioHost::new()));
        let accent = synth.click_tone(true);
        let regular = synth.click_tone(false);
        assert!(accent.start_frequency_hz > regular.start_frequency_hz);
        assert!(accent.gain > regular.gain);
    }

    #[test]
    fn test_click_decays_within_100ms() {
        let synth = synth_with(Arc::new(StubAudioHost::new()));
        let tone = synth.click_tone(false);
        assert!(tone.duration() <= 0.101 + f32::EPSILON);
    }

    #[test]
    fn test_schedule_click_commits_absolute_time() {
        let host = Arc::new(StubAudioHost::new());
        let synth = synth_with(Arc::clone(&host));
        assert!(synth.schedule_click(1.25, true));
        assert!(synth.schedule_voice_hit(1.5, DrumVoice::Snare));

        let context = host.last_context().expect("context created");
        let scheduled = context.scheduled();
        assert_eq!(scheduled.len(), 2);
        assert_eq!(scheduled[0].at, 1.25);
        assert_eq!(scheduled[0].tag, SoundTag::Click { accented: true });
        assert_eq!(
            scheduled[1].tag,
            SoundTag::Voice {
                voice: DrumVoice::Snare
            }
        );
    }

    #[test]
    fn test_schedule_without_audio_is_noop() {
        let manager = Arc::new(AudioContextManager::new(Arc::new(NullAudioHost)));
        let synth = Synthesizer::new(manager, SynthConfig::default());
        assert!(!synth.schedule_click(0.5, true));
        assert!(!synth.schedule_voice_hit(0.5, DrumVoice::Kick));
    }

    #[test]
    fn test_every_voice_has_audible_tone() {
        for voice in DrumVoice::ALL {
            let tone = Synthesizer::voice_tone(voice);
            assert!(tone.gain > 0.0 && tone.gain <= 1.0, "{:?}", voice);
            assert!(tone.decay_s > 0.0, "{:?}", voice);
        }
    }
}
