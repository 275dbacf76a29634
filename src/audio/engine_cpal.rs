//! Device-backed audio context using cpal.
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream lives on a
//! dedicated thread that owns it for its whole life. The context talks to
//! that thread through a command channel and hands committed sounds to the
//! output callback through a lock-free rtrb queue. The callback advances an
//! atomic frame counter, which is the context's clock.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use futures::future::{self, BoxFuture, FutureExt};
use rtrb::{Consumer, Producer, RingBuffer};
use tokio::sync::oneshot;

use super::context::{AudioContext, AudioHost, ContextState};
use super::render::{Mixer, RenderedSound};
use super::synth::ScheduledSound;
use crate::error::AudioError;

/// Maximum committed sounds waiting for the callback
const SOUND_QUEUE_CAPACITY: usize = 256;

/// Maximum simultaneously sounding hits
const MIXER_VOICES: usize = 64;

const STATE_SUSPENDED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_CLOSED: u8 = 2;

enum StreamCommand {
    Play(oneshot::Sender<Result<(), AudioError>>),
    Pause(oneshot::Sender<Result<(), AudioError>>),
    Close,
}

/// Host that opens the default output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalAudioHost;

impl AudioHost for CpalAudioHost {
    fn create_context(&self) -> Result<Arc<dyn AudioContext>, AudioError> {
        let context = CpalAudioContext::open()?;
        Ok(Arc::new(context))
    }
}

/// Audio context driven by a cpal output stream.
pub struct CpalAudioContext {
    frame_counter: Arc<AtomicU64>,
    sample_rate: u32,
    state: Arc<AtomicU8>,
    sounds: Mutex<Producer<RenderedSound>>,
    commands: Mutex<mpsc::Sender<StreamCommand>>,
}

impl CpalAudioContext {
    fn open() -> Result<Self, AudioError> {
        let frame_counter = Arc::new(AtomicU64::new(0));
        let (producer, consumer) = RingBuffer::<RenderedSound>::new(SOUND_QUEUE_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread_counter = Arc::clone(&frame_counter);
        thread::Builder::new()
            .name("metronome-audio".to_string())
            .spawn(move || run_stream_thread(thread_counter, consumer, command_rx, ready_tx))
            .map_err(AudioError::from)?;

        let sample_rate = ready_rx.recv().map_err(|_| AudioError::ContextCreationFailed {
            reason: "audio thread exited during startup".to_string(),
        })??;

        log::info!("[CpalAudio] Output stream opened at {} Hz", sample_rate);

        Ok(Self {
            frame_counter,
            sample_rate,
            state: Arc::new(AtomicU8::new(STATE_SUSPENDED)),
            sounds: Mutex::new(producer),
            commands: Mutex::new(command_tx),
        })
    }

    fn send(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<(), AudioError>>) -> StreamCommand,
    ) -> BoxFuture<'static, Result<(), AudioError>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = match self.commands.lock() {
            Ok(commands) => commands.send(make(reply_tx)).is_ok(),
            Err(_) => {
                return future::ready(Err(AudioError::LockPoisoned {
                    component: "stream_commands".to_string(),
                }))
                .boxed()
            }
        };
        if !sent {
            return future::ready(Err(AudioError::HardwareError {
                details: "audio thread is gone".to_string(),
            }))
            .boxed();
        }
        async move {
            reply_rx.await.unwrap_or_else(|_| {
                Err(AudioError::HardwareError {
                    details: "audio thread dropped reply".to_string(),
                })
            })
        }
        .boxed()
    }
}

impl AudioContext for CpalAudioContext {
    fn current_time(&self) -> f64 {
        self.frame_counter.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn state(&self) -> ContextState {
        match self.state.load(Ordering::Acquire) {
            STATE_RUNNING => ContextState::Running,
            STATE_CLOSED => ContextState::Closed,
            _ => ContextState::Suspended,
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn resume(&self) -> BoxFuture<'static, Result<(), AudioError>> {
        let state = Arc::clone(&self.state);
        let reply = self.send(StreamCommand::Play);
        async move {
            reply.await?;
            state.store(STATE_RUNNING, Ordering::Release);
            Ok(())
        }
        .boxed()
    }

    fn suspend(&self) -> BoxFuture<'static, Result<(), AudioError>> {
        let state = Arc::clone(&self.state);
        let reply = self.send(StreamCommand::Pause);
        async move {
            reply.await?;
            state.store(STATE_SUSPENDED, Ordering::Release);
            Ok(())
        }
        .boxed()
    }

    fn schedule(&self, sound: ScheduledSound) -> Result<(), AudioError> {
        let rendered = RenderedSound::from_scheduled(&sound, self.sample_rate);
        let mut producer = self.sounds.lock().map_err(|_| AudioError::LockPoisoned {
            component: "sound_queue".to_string(),
        })?;
        producer.push(rendered).map_err(|_| AudioError::HardwareError {
            details: "sound queue full".to_string(),
        })
    }
}

impl Drop for CpalAudioContext {
    fn drop(&mut self) {
        self.state.store(STATE_CLOSED, Ordering::Release);
        if let Ok(commands) = self.commands.lock() {
            let _ = commands.send(StreamCommand::Close);
        }
    }
}

fn open_output() -> Result<(cpal::Device, cpal::StreamConfig), AudioError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(AudioError::Unsupported)?;
    let config = device
        .default_output_config()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to get default output config: {:?}", e),
        })?;
    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::StreamOpenFailed {
            reason: "Only F32 sample format is currently supported for output".to_string(),
        });
    }
    Ok((device, config.into()))
}

fn run_stream_thread(
    frame_counter: Arc<AtomicU64>,
    mut sounds: Consumer<RenderedSound>,
    commands: mpsc::Receiver<StreamCommand>,
    ready: mpsc::Sender<Result<u32, AudioError>>,
) {
    let (device, config) = match open_output() {
        Ok(output) => output,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    let sample_rate = config.sample_rate.0;
    let channels = config.channels as usize;
    let mut mixer = Mixer::with_capacity(MIXER_VOICES);
    let err_fn = |err| log::error!("[CpalAudio] Output stream error: {}", err);

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            while let Ok(sound) = sounds.pop() {
                if !mixer.add(sound) {
                    break;
                }
            }
            let first_frame = frame_counter.load(Ordering::Relaxed);
            mixer.mix(data, channels, first_frame);
            frame_counter.fetch_add((data.len() / channels.max(1)) as u64, Ordering::Relaxed);
        },
        err_fn,
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(AudioError::StreamOpenFailed {
                reason: format!("{:?}", e),
            }));
            return;
        }
    };
    // Streams may autostart on some hosts; start suspended like every context.
    let _ = stream.pause();
    let _ = ready.send(Ok(sample_rate));

    while let Ok(command) = commands.recv() {
        match command {
            StreamCommand::Play(reply) => {
                let result = stream.play().map_err(|e| AudioError::ResumeFailed {
                    reason: format!("{}", e),
                });
                let _ = reply.send(result);
            }
            StreamCommand::Pause(reply) => {
                let result = stream.pause().map_err(|e| AudioError::HardwareError {
                    details: format!("Output pause failed: {}", e),
                });
                let _ = reply.send(result);
            }
            StreamCommand::Close => break,
        }
    }

    drop(stream);
    log::debug!("[CpalAudio] Audio thread exiting");
}
