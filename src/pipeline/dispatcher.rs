//! The stage dispatcher (§4.8): receives from inbound, spawns one worker
//! per item, forwards the worker's result to outbound. Used for every
//! stage with a 1:1 input/output relationship; the fan-out (split pages)
//! and many:1 (aggregate) stages have their own loops.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::concurrency::{QueueReceiver, QueueSender};

use super::active::ActiveCounter;

pub async fn run_stage<In, Out, F, Fut>(
    stage_name: &'static str,
    mut inbound: QueueReceiver<In>,
    outbound: Option<QueueSender<Out>>,
    active: Arc<ActiveCounter>,
    cancel: CancellationToken,
    worker: F,
) where
    In: Send + 'static,
    Out: Send + 'static,
    F: Fn(In) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Option<Out>> + Send + 'static,
{
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = inbound.recv() => item,
        };
        let Some(item) = item else {
            break;
        };

        active.increment();
        let outbound = outbound.clone();
        let active_for_worker = active.clone();
        let worker = worker.clone();

        tokio::spawn(async move {
            let result = worker(item).await;
            if let Some(out) = result {
                if let Some(outbound) = outbound {
                    if outbound.send(out).await.is_err() {
                        warn!(stage = stage_name, "outbound queue closed, dropping completed item");
                    }
                }
            }
            active_for_worker.decrement();
        });
    }
    warn!(stage = stage_name, "dispatcher exiting, inbound closed or cancelled");
}
