//! Engine module housing the playback orchestration core.
//!
//! `PracticeEngine` (`core`) is the single entry point the CLI and embedding
//! UIs drive; everything else in the crate is composed underneath it.

pub mod core;

pub use core::PracticeEngine;
