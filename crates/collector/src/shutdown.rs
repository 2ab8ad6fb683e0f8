//! Shutdown controller
//!
//! Converts SIGINT/SIGTERM into a poll-able wakeup and a sticky stop
//! flag. The cancellation token is the wakeup: every long-lived task
//! holds a clone and selects on `cancelled()` next to its primary I/O,
//! so a signal unblocks all of them promptly. Cancellation is one-way;
//! once requested, stop stays requested.
//!
//! Install exactly once - the collector runs one pipeline per process.

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Process-wide shutdown signal
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Register SIGINT and SIGTERM handlers
    ///
    /// Spawns a task that cancels the token on the first signal. Must be
    /// called from within the runtime.
    pub fn install() -> io::Result<Self> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!(signal = "SIGINT", "termination signal received");
                }
                _ = sigterm.recv() => {
                    tracing::info!(signal = "SIGTERM", "termination signal received");
                }
            }
            trigger.cancel();
        });

        Ok(Self { token })
    }

    /// Clone of the wakeup token for a component's `run()`
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether shutdown has been requested
    pub fn stop_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Request stop without a signal (error paths, tests)
    pub fn trigger(&self) {
        self.token.cancel();
    }
}
