//! Screen wake-lock capability and the guard that drives it from playback.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::WakeLockError;
use crate::telemetry::{Capability, TelemetryCollector, TelemetryEventKind};

/// Platform wake-lock API.
pub trait WakeLock: Send + Sync {
    fn request(&self) -> BoxFuture<'static, Result<(), WakeLockError>>;
    fn release(&self) -> BoxFuture<'static, Result<(), WakeLockError>>;
}

/// Used when the host has no wake lock; always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWakeLock;

impl WakeLock for NoopWakeLock {
    fn request(&self) -> BoxFuture<'static, Result<(), WakeLockError>> {
        future::ready(Ok(())).boxed()
    }

    fn release(&self) -> BoxFuture<'static, Result<(), WakeLockError>> {
        future::ready(Ok(())).boxed()
    }
}

/// Counting wake lock for tests and the CLI.
#[derive(Debug, Default)]
pub struct StubWakeLock {
    requests: AtomicUsize,
    releases: AtomicUsize,
    held: Arc<AtomicBool>,
    fail_requests: AtomicBool,
    request_delay_ms: AtomicU64,
}

impl StubWakeLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    pub fn set_fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    /// Makes each request take `delay` before it is granted.
    pub fn set_request_delay(&self, delay: Duration) {
        self.request_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

impl WakeLock for StubWakeLock {
    fn request(&self) -> BoxFuture<'static, Result<(), WakeLockError>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_requests.load(Ordering::SeqCst) {
            return future::ready(Err(WakeLockError::Denied {
                reason: "stub denial".to_string(),
            }))
            .boxed();
        }
        let delay = Duration::from_millis(self.request_delay_ms.load(Ordering::SeqCst));
        let held = Arc::clone(&self.held);
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            held.store(true, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn release(&self) -> BoxFuture<'static, Result<(), WakeLockError>> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.held.store(false, Ordering::SeqCst);
        future::ready(Ok(())).boxed()
    }
}

/// Holds the wake lock while playback is active.
///
/// `acquire`/`release` only record the desired state and return at once.
/// A single worker task applies it, so platform calls run strictly in
/// order: a release always follows the request it undoes. Failures are
/// logged, never returned.
pub struct WakeLockGuard {
    lock: Arc<dyn WakeLock>,
    telemetry: Arc<TelemetryCollector>,
    desired: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WakeLockGuard {
    pub fn new(lock: Arc<dyn WakeLock>, telemetry: Arc<TelemetryCollector>) -> Self {
        let (desired, _) = watch::channel(false);
        Self {
            lock,
            telemetry,
            desired,
            worker: Mutex::new(None),
        }
    }

    /// Whether the lock is wanted (not necessarily granted).
    pub fn is_held(&self) -> bool {
        *self.desired.borrow()
    }

    pub fn acquire(&self) {
        self.set_desired(true);
    }

    pub fn release(&self) {
        self.set_desired(false);
    }

    fn set_desired(&self, held: bool) {
        let changed = self.desired.send_if_modified(|current| {
            if *current == held {
                false
            } else {
                *current = held;
                true
            }
        });
        if changed {
            self.ensure_worker();
        }
    }

    fn ensure_worker(&self) {
        let mut worker = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let sync = WakeLockSync {
                    lock: Arc::clone(&self.lock),
                    telemetry: Arc::clone(&self.telemetry),
                    desired: self.desired.subscribe(),
                    granted: false,
                    unsupported_reported: false,
                };
                *worker = Some(runtime.spawn(sync.run()));
            }
            Err(_) => log::debug!("[WakeLock] No runtime, skipping wake-lock call"),
        }
    }
}

/// Worker state: what the platform has actually granted.
struct WakeLockSync {
    lock: Arc<dyn WakeLock>,
    telemetry: Arc<TelemetryCollector>,
    desired: watch::Receiver<bool>,
    granted: bool,
    unsupported_reported: bool,
}

impl WakeLockSync {
    async fn run(mut self) {
        loop {
            let want = *self.desired.borrow_and_update();
            self.apply(want).await;
            if self.desired.changed().await.is_err() {
                break;
            }
        }
        // Guard dropped
        self.apply(false).await;
    }

    async fn apply(&mut self, want: bool) {
        if want == self.granted {
            return;
        }
        if want {
            match self.lock.request().await {
                Ok(()) => {
                    self.granted = true;
                    log::debug!("[WakeLock] Acquired");
                }
                Err(WakeLockError::Unsupported) => {
                    if !self.unsupported_reported {
                        self.unsupported_reported = true;
                        log::warn!("[WakeLock] Not supported on this host, screen may sleep");
                        self.telemetry.record(
                            TelemetryEventKind::CapabilityDowngraded {
                                capability: Capability::WakeLock,
                            },
                            None,
                        );
                    }
                }
                Err(err) => {
                    log::warn!("[WakeLock] Request failed: {}", err);
                    self.telemetry
                        .warn(format!("wake lock request failed: {}", err));
                }
            }
        } else {
            self.granted = false;
            match self.lock.release().await {
                Ok(()) => log::debug!("[WakeLock] Released"),
                Err(err) => log::warn!("[WakeLock] Release failed: {}", err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard_with(lock: Arc<StubWakeLock>) -> (WakeLockGuard, Arc<TelemetryCollector>) {
        let telemetry = Arc::new(TelemetryCollector::default());
        (WakeLockGuard::new(lock, Arc::clone(&telemetry)), telemetry)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_release_once_each() {
        let lock = Arc::new(StubWakeLock::new());
        let (guard, _) = guard_with(Arc::clone(&lock));

        guard.acquire();
        guard.acquire();
        settle().await;
        assert_eq!(lock.requests(), 1);
        assert!(lock.is_held());

        guard.release();
        guard.release();
        settle().await;
        assert_eq!(lock.releases(), 1);
        assert!(!lock.is_held());
        assert!(!guard.is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_failure_is_swallowed() {
        let lock = Arc::new(StubWakeLock::new());
        lock.set_fail_requests(true);
        let (guard, telemetry) = guard_with(Arc::clone(&lock));

        guard.acquire();
        settle().await;
        assert!(guard.is_held());
        assert!(!lock.is_held());
        assert_eq!(
            telemetry.snapshot().recent[0].kind,
            TelemetryEventKind::Warning
        );

        // Nothing was granted, so nothing is released
        guard.release();
        settle().await;
        assert_eq!(lock.releases(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_waits_for_slow_grant() {
        let lock = Arc::new(StubWakeLock::new());
        lock.set_request_delay(Duration::from_millis(20));
        let (guard, _) = guard_with(Arc::clone(&lock));

        guard.acquire();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(lock.requests(), 1);
        assert!(!lock.is_held());

        // Released while the request is still pending
        guard.release();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(lock.releases(), 1);
        assert!(!lock.is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_retried_after_next_start() {
        let lock = Arc::new(StubWakeLock::new());
        lock.set_fail_requests(true);
        let (guard, _) = guard_with(Arc::clone(&lock));

        guard.acquire();
        settle().await;
        guard.release();
        settle().await;

        lock.set_fail_requests(false);
        guard.acquire();
        settle().await;
        assert_eq!(lock.requests(), 2);
        assert!(lock.is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_guard_releases_lock() {
        let lock = Arc::new(StubWakeLock::new());
        let (guard, _) = guard_with(Arc::clone(&lock));
        guard.acquire();
        settle().await;
        assert!(lock.is_held());

        drop(guard);
        settle().await;
        assert!(!lock.is_held());
    }

    #[test]
    fn test_no_runtime_is_tolerated() {
        let (guard, _) = guard_with(Arc::new(StubWakeLock::new()));
        guard.acquire();
        guard.release();
        assert!(!guard.is_held());
    }

    #[tokio::test]
    async fn test_noop_wake_lock_succeeds() {
        assert!(NoopWakeLock.request().await.is_ok());
        assert!(NoopWakeLock.release().await.is_ok());
    }
}
