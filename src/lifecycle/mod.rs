//! Lifecycle guards and observable UI flags.
//!
//! - `wake_lock`: keeps the screen on while anything plays
//! - `unload`: asks for confirmation before closing during playback
//! - `store` / `practice_mode`: observable values with explicit subscriptions

pub mod practice_mode;
pub mod store;
pub mod unload;
pub mod wake_lock;

pub use practice_mode::PracticeMode;
pub use store::Store;
pub use unload::{CloseDecision, UnloadGuard};
pub use wake_lock::{NoopWakeLock, StubWakeLock, WakeLock, WakeLockGuard};
