//! The 15 ordered pipeline stages (§4.7). Each module implements one
//! stage's worker function; wiring them into dispatchers happens in
//! [`super`] (`pipeline::run`), as a sequence of hand-written `tokio::spawn`
//! blocks rather than a table-driven topology.

pub mod aggregate;
pub mod cryptonym;
pub mod dates;
pub mod extract_text;
pub mod gematria;
pub mod location;
pub mod ocr;
pub mod rasterize;
pub mod split_pages;
pub mod thumbnails_dark;
pub mod thumbnails_light;
pub mod to_jpeg;
pub mod validate;
pub mod word_index;

use tracing::warn;

use crate::error::PipelineError;

/// Log a per-item stage failure and drop it, matching the "best-effort per
/// item, robust across items" policy of §7: one page failing never stops
/// its siblings.
pub(crate) fn log_and_drop<T>(stage: &'static str, id: &str, result: Result<T, PipelineError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(PipelineError::Cancellation) => None,
        Err(e) => {
            warn!(stage, id, error = %e, "stage failed for item, dropping");
            None
        }
    }
}
