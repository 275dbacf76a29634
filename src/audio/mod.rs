// Audio module - shared audio context, click/hit synthesis and rendering

pub mod context;
#[cfg(feature = "device-audio")]
pub mod engine_cpal;
pub mod render;
pub mod stubs;
pub mod synth;

// Re-export commonly used types for convenience
pub use context::{default_host, AudioContext, AudioHost, ContextState};
pub use render::{render_offline, Mixer, RenderedSound};
pub use stubs::{NullAudioHost, StubAudioContext, StubAudioHost};
pub use synth::{ScheduledSound, SoundTag, Synthesizer, ToneSpec};
