use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Returned by [`QueueSender::send`] once the queue has been closed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("queue is closed")]
pub struct QueueClosed;

/// A bounded, typed, closeable FIFO. Default capacity across the pipeline is
/// 1 (a hand-off), giving every stage immediate backpressure on its
/// predecessor.
pub struct Queue<T> {
    _marker: std::marker::PhantomData<T>,
}

impl<T: Send + 'static> Queue<T> {
    /// Build a fresh sender/receiver pair with the given capacity.
    pub fn bounded(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sender = QueueSender {
            inner: Arc::new(Mutex::new(Some(tx))),
        };
        (sender, QueueReceiver { inner: rx })
    }
}

/// The sending half of a [`Queue`]. Cloneable; every clone shares the same
/// underlying close state.
#[derive(Clone)]
pub struct QueueSender<T> {
    inner: Arc<Mutex<Option<mpsc::Sender<T>>>>,
}

impl<T> QueueSender<T> {
    /// Send a value, suspending while the queue is full.
    ///
    /// Fails with [`QueueClosed`] — never panics — once [`Self::close`] has
    /// been called, even if a send was already in flight when it ran.
    pub async fn send(&self, value: T) -> Result<(), QueueClosed> {
        let sender = self.inner.lock().expect("queue mutex poisoned").clone();
        match sender {
            Some(tx) => tx.send(value).await.map_err(|_| QueueClosed),
            None => Err(QueueClosed),
        }
    }

    /// Idempotent. Marks the queue closed; in-flight sends still complete,
    /// but every call after this one fails.
    pub fn close(&self) {
        *self.inner.lock().expect("queue mutex poisoned") = None;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().expect("queue mutex poisoned").is_none()
    }
}

/// The receiving half of a [`Queue`].
pub struct QueueReceiver<T> {
    inner: mpsc::Receiver<T>,
}

impl<T> QueueReceiver<T> {
    /// Receive the next value, or `None` once the queue is closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.inner.recv().await
    }

    /// As [`Self::recv`], but resolves to `None` promptly if `cancel` fires
    /// first.
    pub async fn recv_cancellable(&mut self, cancel: &CancellationToken) -> Option<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = self.inner.recv() => item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_then_receive() {
        let (tx, mut rx) = Queue::<u32>::bounded(1);
        tx.send(7).await.unwrap();
        assert_eq!(rx.recv().await, Some(7));
    }

    #[tokio::test]
    async fn send_after_close_fails_not_panics() {
        let (tx, _rx) = Queue::<u32>::bounded(1);
        tx.close();
        tx.close(); // idempotent
        assert_eq!(tx.send(1).await, Err(QueueClosed));
    }

    #[tokio::test]
    async fn close_unblocks_receiver_after_drain() {
        let (tx, mut rx) = Queue::<u32>::bounded(4);
        tx.send(1).await.unwrap();
        tx.close();
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);
    }
}
