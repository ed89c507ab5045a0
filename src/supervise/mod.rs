// src/supervise/mod.rs

//! Process supervision layer.
//!
//! This module launches the commands defined for each stage using
//! `tokio::process::Command` and streams their output into a
//! [`crate::record::RecorderHandle`].
//!
//! - [`command`] describes what to launch.
//! - [`streams`] reads stdout/stderr line by line (`\n` or `\r`).
//! - [`signals`] catches interrupts and forwards them to children.
//! - [`supervisor`] ties it together for one child process.

pub mod command;
pub mod signals;
pub mod streams;
pub mod supervisor;

pub use command::CommandSpec;
pub use signals::{
    forward_to_child, request_shutdown, shutdown_channel, spawn_signal_listener, Interrupt,
    ShutdownReceiver, ShutdownSender,
};
pub use streams::{LineSplitter, MAX_LINE_BYTES};
pub use supervisor::{ExitOutcome, ProcessSupervisor};
