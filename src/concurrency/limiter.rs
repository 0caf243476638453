use std::sync::Arc;

use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

/// A counted semaphore bounding concurrent use of one named resource
/// (a binary, a CPU-bound codec step, a disk-heavy write class).
///
/// Cloning a `Limiter` shares the same permit pool; it is handed to every
/// worker that needs to throttle on that resource.
#[derive(Clone)]
pub struct Limiter {
    name: &'static str,
    sem: Arc<Semaphore>,
}

impl Limiter {
    pub fn new(name: &'static str, permits: usize) -> Self {
        Self {
            name,
            sem: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Acquire one permit, or return `Cancellation` if `cancel` fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<SemaphorePermit<'_>, PipelineError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancellation),
            permit = self.sem.acquire() => permit.map_err(|_| PipelineError::Cancellation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_respects_bound() {
        let limiter = Limiter::new("test", 1);
        let cancel = CancellationToken::new();
        let _first = limiter.acquire(&cancel).await.unwrap();
        assert_eq!(limiter.sem.available_permits(), 0);
    }

    #[tokio::test]
    async fn acquire_is_cancellable() {
        let limiter = Limiter::new("test", 0);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = limiter.acquire(&cancel).await;
        assert!(matches!(result, Err(PipelineError::Cancellation)));
    }
}
