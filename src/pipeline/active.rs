//! The active-task counter the lifecycle controller waits on to know the
//! pipeline has fully drained.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Default)]
pub struct ActiveCounter {
    count: AtomicUsize,
    notify: Notify,
}

impl ActiveCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn decrement(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait until the counter reaches zero. Spurious wakeups are handled by
    /// re-checking the count in a loop.
    pub async fn wait_until_zero(&self) {
        loop {
            if self.get() == 0 {
                return;
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_returns_once_all_decremented() {
        let counter = Arc::new(ActiveCounter::new());
        counter.increment();
        counter.increment();

        let waiter = {
            let counter = counter.clone();
            tokio::spawn(async move {
                counter.wait_until_zero().await;
            })
        };

        counter.decrement();
        counter.decrement();
        waiter.await.unwrap();
    }
}
