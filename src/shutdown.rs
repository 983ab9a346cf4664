//! Shutdown signal observed by every long-running loop at its sleep point.

use std::time::Duration;
use tokio::sync::watch;

/// Sending half, held by `main` (Ctrl-C handler).
#[derive(Debug)]
pub struct ShutdownTrigger(watch::Sender<bool>);

/// Receiving half, cloned into each loop.
#[derive(Debug, Clone)]
pub struct Shutdown(watch::Receiver<bool>);

/// Create a connected trigger/listener pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger(tx), Shutdown(rx))
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // Err only means every listener is already gone
        let _ = self.0.send(true);
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Sleep for `duration` or until shutdown, whichever comes first.
    ///
    /// Returns `true` when the caller should stop. A dropped trigger counts as
    /// shutdown so loops never spin on a closed channel.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_triggered(),
            changed = self.0.changed() => changed.is_err() || self.is_triggered(),
        }
    }
}
