//! Cancellation signal shared by every sidecar component
//!
//! The controller side is held by whoever may start shutdown (the OS
//! signal watcher and the pre-stop endpoint). The signal side is cloned
//! into each long-running task:
//! - Listeners stop accepting and drain their connections
//! - The database prober leaves its tick loop
//!
//! Triggering is idempotent: the flag only ever moves from `false` to `true`.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Receiving half of the cancellation signal
///
/// Cheap to clone; every clone observes the same flag.
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    ///
    /// Returns immediately if shutdown was already triggered.
    pub async fn wait(&mut self) {
        // wait_for checks the current value first, so a late subscriber
        // never misses an earlier trigger. Err means the sender was
        // dropped, which is treated as shutdown too.
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }

    /// Check if shutdown was signaled (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Sending half of the cancellation signal
#[derive(Clone)]
pub struct ShutdownController {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownController {
    /// Trigger shutdown
    ///
    /// Returns `true` only for the call that actually flipped the flag.
    /// Later calls are no-ops, so a second SIGTERM or a pre-stop call
    /// racing a signal never restarts teardown.
    pub fn shutdown(&self) -> bool {
        let triggered = self.sender.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        });
        if triggered {
            info!("Shutdown signal sent");
        }
        triggered
    }

    /// Create another receiving half bound to this controller
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        ShutdownController {
            sender: Arc::new(sender),
        },
        ShutdownSignal { receiver },
    )
}

/// Registered SIGTERM/SIGINT handlers
///
/// Installed before any listener starts so a signal delivered during
/// startup is not lost.
#[cfg(unix)]
pub struct TerminationSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    /// Register the handlers
    ///
    /// Fails only on OS resource exhaustion.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next SIGTERM or SIGINT
    ///
    /// Returns the signal name that was received.
    pub async fn recv(&mut self) -> &'static str {
        let name = tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        };
        info!(signal = name, "Received termination signal");
        name
    }
}

/// Ctrl+C handler (Windows)
#[cfg(not(unix))]
pub struct TerminationSignals {
    _private: (),
}

#[cfg(not(unix))]
impl TerminationSignals {
    /// Nothing to register up front on this platform
    pub fn install() -> std::io::Result<Self> {
        Ok(Self { _private: () })
    }

    /// Wait for Ctrl+C
    pub async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to wait for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C");
        "CTRL_C"
    }
}
