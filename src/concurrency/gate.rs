use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_secs(9);

/// A single-shot boolean latch: false→true exactly once, never reset.
/// Consumers that need reference data to be loaded poll it on a bounded
/// timer and log progress while waiting, same as the readiness gates in
/// the original pipeline.
pub struct ReadinessGate {
    name: &'static str,
    set: AtomicBool,
}

impl ReadinessGate {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            set: AtomicBool::new(false),
        }
    }

    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    /// Mark the gate ready. Calling this more than once is a no-op; the
    /// transition only ever happens false→true.
    pub fn set(&self) {
        self.set.store(true, Ordering::Release);
    }

    /// Wait until the gate is set, polling every 9s and logging while it
    /// isn't. Returns early if `cancel` fires.
    pub async fn wait(&self, cancel: &CancellationToken) {
        while !self.is_set() {
            info!(gate = self.name, "waiting on reference data readiness");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_once_set() {
        let gate = ReadinessGate::new("test");
        gate.set();
        let cancel = CancellationToken::new();
        gate.wait(&cancel).await;
    }

    #[tokio::test]
    async fn wait_honors_cancellation() {
        let gate = ReadinessGate::new("test");
        let cancel = CancellationToken::new();
        cancel.cancel();
        gate.wait(&cancel).await;
        assert!(!gate.is_set());
    }
}
