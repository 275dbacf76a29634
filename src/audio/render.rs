//! Render - Sample-accurate click and drum synthesis
//!
//! Turns [`ToneSpec`] descriptions into sample buffers and mixes committed
//! sounds into output blocks by absolute frame position.
//! Key features:
//! - Quick linear attack followed by exponential decay to near-silence
//! - Deterministic seeded noise for snare/hat/clap bodies
//! - Pure rendering functions (no shared state between sounds)
//! - A mixer that never reallocates once constructed

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

use super::synth::{ScheduledSound, ToneSpec};

/// Level the decay envelope reaches at the end of a sound
pub const SILENCE_LEVEL: f32 = 0.001;

/// Fixed noise seed so identical tones render identical samples
const NOISE_SEED: u64 = 42;

/// Envelope value at `t` seconds into a sound.
///
/// Rises linearly over `attack_s`, then decays exponentially so that it hits
/// [`SILENCE_LEVEL`] exactly `decay_s` after the attack.
#[inline]
pub fn envelope_at(t: f32, attack_s: f32, decay_s: f32) -> f32 {
    if t < 0.0 {
        return 0.0;
    }
    if attack_s > 0.0 && t < attack_s {
        return t / attack_s;
    }
    let since_peak = t - attack_s;
    if decay_s <= 0.0 || since_peak >= decay_s {
        return 0.0;
    }
    let rate = (1.0 / SILENCE_LEVEL).ln() / decay_s;
    (-rate * since_peak).exp()
}

/// Number of samples a tone occupies.
pub fn tone_length(tone: &ToneSpec, sample_rate: u32) -> usize {
    ((tone.attack_s + tone.decay_s).max(0.0) * sample_rate as f32).ceil() as usize
}

/// Renders a tone into a mono buffer in range [-1.0, 1.0].
///
/// # Examples
/// ```
/// use practice_metronome::audio::render::{render_tone, tone_length};
/// use practice_metronome::audio::ToneSpec;
///
/// let tone = ToneSpec::sine(1000.0, 0.6, 0.001, 0.1);
/// let samples = render_tone(&tone, 48000);
/// assert_eq!(samples.len(), tone_length(&tone, 48000));
/// ```
pub fn render_tone(tone: &ToneSpec, sample_rate: u32) -> Vec<f32> {
    let num_samples = tone_length(tone, sample_rate);
    let duration = (tone.attack_s + tone.decay_s).max(f32::EPSILON);
    let sr = sample_rate as f32;

    let mut rng = StdRng::seed_from_u64(NOISE_SEED);
    let noise_mix = tone.noise_mix.clamp(0.0, 1.0);
    let sweep = if tone.start_frequency_hz > 0.0 && tone.end_frequency_hz > 0.0 {
        tone.end_frequency_hz / tone.start_frequency_hz
    } else {
        1.0
    };

    let mut samples = Vec::with_capacity(num_samples);
    let mut phase = 0.0_f32;
    for i in 0..num_samples {
        let t = i as f32 / sr;
        let frequency = tone.start_frequency_hz * sweep.powf(t / duration);
        phase = (phase + 2.0 * PI * frequency / sr) % (2.0 * PI);

        let tonal = phase.sin();
        let noise: f32 = if noise_mix > 0.0 {
            rng.gen_range(-1.0..1.0)
        } else {
            0.0
        };
        let body = tonal * (1.0 - noise_mix) + noise * noise_mix;
        let sample = body * envelope_at(t, tone.attack_s, tone.decay_s) * tone.gain;
        samples.push(sample.clamp(-1.0, 1.0));
    }

    samples
}

/// A committed sound rendered and pinned to an absolute frame.
#[derive(Debug, Clone)]
pub struct RenderedSound {
    pub start_frame: u64,
    samples: Vec<f32>,
    cursor: usize,
}

impl RenderedSound {
    pub fn new(start_frame: u64, samples: Vec<f32>) -> Self {
        Self {
            start_frame,
            samples,
            cursor: 0,
        }
    }

    pub fn from_scheduled(sound: &ScheduledSound, sample_rate: u32) -> Self {
        let start_frame = (sound.at.max(0.0) * sample_rate as f64).round() as u64;
        Self::new(start_frame, render_tone(&sound.tone, sample_rate))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn is_finished(&self) -> bool {
        self.cursor >= self.samples.len()
    }
}

/// Mixes overlapping committed sounds into interleaved output blocks.
///
/// Each sound keeps its own cursor, so overlapping hits never share
/// envelope state. A sound whose start frame has already passed begins
/// immediately, matching how an audio clock treats late start times.
pub struct Mixer {
    active: Vec<RenderedSound>,
    limit: usize,
}

impl Mixer {
    pub fn with_capacity(capacity: usize) -> Self {
        let limit = capacity.max(1);
        Self {
            active: Vec::with_capacity(limit),
            limit,
        }
    }

    /// Adds a sound; returns false (dropping it) when the mixer is full.
    pub fn add(&mut self, sound: RenderedSound) -> bool {
        if self.active.len() >= self.limit {
            return false;
        }
        self.active.push(sound);
        true
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Fills `out` (interleaved, `channels` wide) starting at `first_frame`.
    pub fn mix(&mut self, out: &mut [f32], channels: usize, first_frame: u64) {
        let channels = channels.max(1);
        out.iter_mut().for_each(|s| *s = 0.0);
        let frame_count = out.len() / channels;
        let block_end = first_frame + frame_count as u64;

        for sound in self.active.iter_mut() {
            if sound.start_frame >= block_end {
                continue;
            }
            let offset = sound.start_frame.saturating_sub(first_frame) as usize;
            let available = sound.samples.len() - sound.cursor;
            let count = available.min(frame_count - offset);

            for i in 0..count {
                let value = sound.samples[sound.cursor + i];
                let frame = offset + i;
                for ch in 0..channels {
                    out[frame * channels + ch] += value;
                }
            }
            sound.cursor += count;
        }

        out.iter_mut().for_each(|s| *s = s.clamp(-1.0, 1.0));
        self.active.retain(|sound| !sound.is_finished());
    }
}

/// Renders a list of committed sounds into a mono buffer of `total_frames`.
pub fn render_offline(sounds: &[ScheduledSound], sample_rate: u32, total_frames: usize) -> Vec<f32> {
    const BLOCK: usize = 512;

    let mut pending: Vec<RenderedSound> = sounds
        .iter()
        .map(|sound| RenderedSound::from_scheduled(sound, sample_rate))
        .collect();
    pending.sort_by_key(|sound| std::cmp::Reverse(sound.start_frame));

    let mut mixer = Mixer::with_capacity(pending.len().max(1));
    let mut output = vec![0.0_f32; total_frames];
    let mut frame = 0usize;

    while frame < total_frames {
        let end = (frame + BLOCK).min(total_frames);
        while pending
            .last()
            .map(|sound| sound.start_frame < end as u64)
            .unwrap_or(false)
        {
            if let Some(sound) = pending.pop() {
                mixer.add(sound);
            }
        }
        mixer.mix(&mut output[frame..end], 1, frame as u64);
        frame = end;
    }

    output
}
