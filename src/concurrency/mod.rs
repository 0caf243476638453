//! Bounded-concurrency building blocks: a named [`Limiter`], a closeable
//! typed [`Queue`], and a single-shot [`ReadinessGate`].

mod gate;
mod limiter;
mod queue;

pub use gate::ReadinessGate;
pub use limiter::Limiter;
pub use queue::{Queue, QueueClosed, QueueReceiver, QueueSender};
