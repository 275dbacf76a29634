use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::PracticeEngine;
use crate::managers::PlaybackState;
use crate::scheduler::StepEvent;
use crate::telemetry::TelemetryEvent;

impl PracticeEngine {
    // ========================================================================
    // ASYNC STREAM ADAPTERS
    // ========================================================================

    /// Visual beat/step updates. A slow consumer skips missed steps rather
    /// than replaying stale ones.
    pub fn step_stream(&self) -> impl Stream<Item = StepEvent> + Unpin {
        skip_lagged(self.subscribe_steps(), "steps")
    }

    pub fn telemetry_stream(&self) -> impl Stream<Item = TelemetryEvent> + Unpin {
        skip_lagged(self.subscribe_telemetry(), "telemetry")
    }

    /// Mode changes; ends immediately if the channel was never initialized.
    pub fn playback_state_stream(&self) -> impl Stream<Item = PlaybackState> + Unpin {
        let rx = self
            .subscribe_playback_state()
            .unwrap_or_else(|| broadcast::channel(1).1);
        skip_lagged(rx, "playback_state")
    }
}

fn skip_lagged<T>(
    rx: broadcast::Receiver<T>,
    channel: &'static str,
) -> impl Stream<Item = T> + Unpin
where
    T: Clone + Send + 'static,
{
    BroadcastStream::new(rx).filter_map(move |item| match item {
        Ok(value) => Some(value),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            log::debug!("[PracticeEngine] {} subscriber lagged by {}", channel, skipped);
            None
        }
    })
}
