// src/supervise/signals.rs

//! Interrupt plumbing: catching signals aimed at devwatch and forwarding
//! them to supervised children.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::process::Child;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// An external request to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Ctrl-C / SIGINT.
    Interrupt,
    /// SIGTERM, also used for pipeline teardown.
    Terminate,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Interrupt => f.write_str("SIGINT"),
            Interrupt::Terminate => f.write_str("SIGTERM"),
        }
    }
}

pub type ShutdownSender = Arc<watch::Sender<Option<Interrupt>>>;
pub type ShutdownReceiver = watch::Receiver<Option<Interrupt>>;

/// Broadcast channel every supervisor subscribes to.
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    let (tx, rx) = watch::channel(None);
    (Arc::new(tx), rx)
}

/// Publish an interrupt unless one is already pending.
pub fn request_shutdown(tx: &ShutdownSender, interrupt: Interrupt) {
    tx.send_if_modified(|current| {
        if current.is_none() {
            *current = Some(interrupt);
            true
        } else {
            false
        }
    });
}

/// Resolve once an interrupt has been published. Never resolves if the
/// sender is gone without one.
pub async fn wait_for_interrupt(rx: &mut ShutdownReceiver) -> Interrupt {
    loop {
        if let Some(interrupt) = *rx.borrow_and_update() {
            return interrupt;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Listen for Ctrl-C (and SIGTERM on unix) and publish the first one.
pub fn spawn_signal_listener(tx: ShutdownSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(interrupt) => {
                info!(signal = %interrupt, "received signal; stopping supervised processes");
                request_shutdown(&tx, interrupt);
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for shutdown signals");
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> io::Result<Interrupt> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            Ok(Interrupt::Interrupt)
        }
        _ = terminate.recv() => Ok(Interrupt::Terminate),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> io::Result<Interrupt> {
    tokio::signal::ctrl_c().await?;
    Ok(Interrupt::Interrupt)
}

/// Deliver the equivalent signal to the child.
#[cfg(unix)]
pub fn forward_to_child(child: &mut Child, interrupt: Interrupt) -> io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        // Already reaped.
        return Ok(());
    };
    let signal = match interrupt {
        Interrupt::Interrupt => Signal::SIGINT,
        Interrupt::Terminate => Signal::SIGTERM,
    };
    let pid = i32::try_from(pid).map_err(io::Error::other)?;
    kill(Pid::from_raw(pid), signal).map_err(io::Error::from)
}

#[cfg(not(unix))]
pub fn forward_to_child(child: &mut Child, _interrupt: Interrupt) -> io::Result<()> {
    child.start_kill()
}
