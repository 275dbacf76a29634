use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use practice_metronome::audio::{default_host, render_offline, StubAudioHost, Synthesizer};
use practice_metronome::config::AppConfig;
use practice_metronome::error::ErrorCode;
use practice_metronome::lifecycle::NoopWakeLock;
use practice_metronome::managers::AudioContextManager;
use practice_metronome::pattern::Pattern;
use practice_metronome::scheduler::{LookaheadScheduler, StepSource, StepTrigger};
use practice_metronome::timing::{Tempo, TempoControls, TimeSignature};
use practice_metronome::PracticeEngine;
use serde::Serialize;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "metronome_cli",
    about = "Metronome and drum-pattern playback harness"
)]
struct Cli {
    /// JSON config file (defaults to assets/metronome_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the metronome and print each step as a JSON line
    Click {
        #[arg(long, default_value_t = 120)]
        bpm: u32,
        #[arg(long, default_value_t = 2)]
        bars: u32,
        #[arg(long, default_value_t = 4)]
        beats_per_bar: u32,
        #[arg(long, default_value_t = 4)]
        beat_unit: u32,
    },
    /// Play a pattern file and print each step as a JSON line
    Pattern {
        #[arg(long)]
        file: PathBuf,
        /// Passes over the pattern (or its loop range)
        #[arg(long, default_value_t = 1)]
        loops: u32,
        #[arg(long)]
        bpm: Option<u32>,
    },
    /// Render clicks or a pattern offline to a WAV file
    Render {
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        pattern: Option<PathBuf>,
        #[arg(long, default_value_t = 120)]
        bpm: u32,
        #[arg(long, default_value_t = 2)]
        bars: u32,
        #[arg(long)]
        sample_rate: Option<u32>,
    },
    /// Validate a pattern file
    Validate {
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "metronome_cli starting");
    let config = cli
        .config
        .as_deref()
        .map(AppConfig::load_from_file)
        .unwrap_or_else(AppConfig::load);

    match cli.command {
        Commands::Click {
            bpm,
            bars,
            beats_per_bar,
            beat_unit,
        } => {
            let meter = TimeSignature::new(beats_per_bar, beat_unit)
                .context("beats per bar and beat unit must be at least 1")?;
            run_click(config, bpm, bars, meter)
        }
        Commands::Pattern { file, loops, bpm } => run_pattern(config, &file, loops, bpm),
        Commands::Render {
            output,
            pattern,
            bpm,
            bars,
            sample_rate,
        } => run_render(config, &output, pattern.as_deref(), bpm, bars, sample_rate),
        Commands::Validate { file } => run_validate(&file),
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("building tokio runtime")
}

fn run_click(config: AppConfig, bpm: u32, bars: u32, meter: TimeSignature) -> Result<ExitCode> {
    let runtime = build_runtime()?;
    runtime.block_on(async move {
        let engine = PracticeEngine::new(config, default_host(), Arc::new(NoopWakeLock));
        engine.set_bpm(bpm);
        engine.set_time_signature(meter)?;

        let total = click_step_total(bars, meter)?;
        let mut steps = engine.step_stream();
        engine.toggle_metronome();

        let mut printed = 0;
        while printed < total {
            let Some(step) = steps.next().await else {
                break;
            };
            println!("{}", serde_json::to_string(&step)?);
            printed += 1;
        }

        engine.stop_all();
        Ok::<_, anyhow::Error>(ExitCode::from(0))
    })
}

fn click_step_total(bars: u32, meter: TimeSignature) -> Result<usize> {
    bars.checked_mul(meter.beats_per_bar)
        .map(|beats| beats as usize)
        .context("--bars times --beats-per-bar is too large")
}

fn run_pattern(config: AppConfig, file: &Path, loops: u32, bpm: Option<u32>) -> Result<ExitCode> {
    let pattern = Pattern::load_from_file(file)
        .with_context(|| format!("loading pattern {}", file.display()))?;
    let steps_per_pass = pattern
        .loop_range
        .map(|range| range.len())
        .unwrap_or_else(|| pattern.step_count());
    let total = steps_per_pass
        .checked_mul(loops as usize)
        .context("--loops is too large for this pattern")?;

    let runtime = build_runtime()?;
    runtime.block_on(async move {
        let engine = PracticeEngine::new(config, default_host(), Arc::new(NoopWakeLock));
        engine.load_pattern(pattern)?;

        let mut steps = engine.step_stream();
        engine.toggle_pattern();
        if let Some(bpm) = bpm {
            engine.set_bpm(bpm);
        }

        let mut printed = 0;
        while printed < total {
            let Some(step) = steps.next().await else {
                break;
            };
            println!("{}", serde_json::to_string(&step)?);
            printed += 1;
        }

        engine.stop_all();
        Ok::<_, anyhow::Error>(ExitCode::from(0))
    })
}

fn run_render(
    config: AppConfig,
    output: &Path,
    pattern_file: Option<&Path>,
    bpm: u32,
    bars: u32,
    sample_rate: Option<u32>,
) -> Result<ExitCode> {
    let sample_rate = sample_rate.unwrap_or(config.synth.sample_rate);
    let host = Arc::new(StubAudioHost::with_sample_rate(sample_rate));
    let audio = Arc::new(AudioContextManager::new(host.clone()));
    let synth = Synthesizer::new(Arc::clone(&audio), config.synth.clone());

    let (source, tempo, meter, bars) = match pattern_file {
        Some(path) => {
            let pattern = Pattern::load_from_file(path)
                .with_context(|| format!("loading pattern {}", path.display()))?;
            let tempo = Tempo::clamped(pattern.bpm);
            let meter = pattern.time_signature;
            let bars = pattern.bars;
            (StepSource::Pattern(Arc::new(pattern)), tempo, meter, bars)
        }
        None => (
            StepSource::Metronome,
            Tempo::clamped(bpm),
            config.defaults.time_signature(),
            bars,
        ),
    };

    let controls = Arc::new(TempoControls::new(tempo, meter));
    let seconds_per_beat = tempo.seconds_per_beat();
    let length_secs = bars as f64 * meter.beats_per_bar as f64 * seconds_per_beat;

    // Offline: one pump covering the whole render commits every step
    let mut scheduler = LookaheadScheduler::new(source, controls, 0.0, 0.0);
    for event in scheduler.pump(length_secs) {
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

    let Some(context) = host.last_context() else {
        bail!("offline render context was not created");
    };
    let sounds = context.scheduled();
    // Let the final hit ring out
    let total_frames = ((length_secs + 0.5) * sample_rate as f64).ceil() as usize;
    let samples = render_offline(&sounds, sample_rate, total_frames);

    write_wav(output, sample_rate, &samples)?;
    let summary = RenderSummary {
        output: output.display().to_string(),
        sample_rate,
        bpm: tempo.bpm(),
        sounds: sounds.len(),
        frames: samples.len(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::from(0))
}

fn write_wav(path: &Path, sample_rate: u32, samples: &[f32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

fn run_validate(file: &Path) -> Result<ExitCode> {
    match Pattern::load_from_file(file) {
        Ok(pattern) => {
            let report = ValidationReport {
                valid: true,
                name: Some(pattern.name.clone()),
                steps: Some(pattern.step_count()),
                error: None,
                code: None,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::from(0))
        }
        Err(err) => {
            let report = ValidationReport {
                valid: false,
                name: None,
                steps: None,
                error: Some(err.to_string()),
                code: Some(err.code()),
            };
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::from(2))
        }
    }
}

#[derive(Serialize)]
struct RenderSummary {
    output: String,
    sample_rate: u32,
    bpm: u32,
    sounds: usize,
    frames: usize,
}

#[derive(Serialize)]
struct ValidationReport {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i32>,
}
