// src/record/mod.rs

//! Log recording for supervised stages.
//!
//! - [`entry`] defines log entries, statuses, summaries and snapshots.
//! - [`classify`] holds the keyword heuristics.
//! - [`recorder`] owns the per-stage state and its actor wrapper.

pub mod classify;
pub mod entry;
pub mod recorder;

pub use classify::classify;
pub use entry::{Level, LogEntry, Status, StatusSnapshot, StreamSource, Summary};
pub use recorder::{spawn_recorder, LogRecorder, RecorderHandle};
