//! Time sources the scheduler can run against.

use std::sync::Arc;

use tokio::time::Instant;

use crate::audio::AudioContext;

/// Monotonic seconds used for step timestamps.
pub trait SchedulerClock: Send + Sync {
    fn now(&self) -> f64;

    /// Whether timestamps are audio-clock times sounds can be committed at.
    fn is_audio(&self) -> bool;
}

/// Clock backed by the shared audio context.
pub struct AudioClock {
    context: Arc<dyn AudioContext>,
}

impl AudioClock {
    pub fn new(context: Arc<dyn AudioContext>) -> Self {
        Self { context }
    }
}

impl SchedulerClock for AudioClock {
    fn now(&self) -> f64 {
        self.context.current_time()
    }

    fn is_audio(&self) -> bool {
        true
    }
}

/// Fallback clock used when no audio context exists; drives visuals only.
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerClock for WallClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn is_audio(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_follows_tokio_time() {
        let clock = WallClock::new();
        assert!(!clock.is_audio());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!((clock.now() - 0.5).abs() < 1e-6);
    }
}
