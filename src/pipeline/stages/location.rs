//! Stage 11: tokenize OCR text on whitespace, look each token up against
//! the city/state/country maps — a token may hit more than one.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::{Location, PendingPage};
use crate::refdata::ReferenceData;

pub async fn process(mut page: PendingPage, refdata: &ReferenceData, cancel: &CancellationToken) -> Result<PendingPage, PipelineError> {
    refdata.locations_gate.wait(cancel).await;
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancellation);
    }

    let text = std::fs::read_to_string(&page.ocr_text_path).unwrap_or_default();

    let mut locations = Vec::new();
    for token in text.split_whitespace() {
        let trimmed = token.trim_matches(|c: char| !c.is_alphanumeric());
        if trimmed.is_empty() {
            continue;
        }
        for kind in refdata.locations.lookup(trimmed) {
            locations.push(Location {
                token: trimmed.to_string(),
                kind,
            });
        }
    }

    page.locations = locations;
    page.state = crate::model::PageState::Located;
    crate::persistence::write_manifest(&page.manifest_path, &page)?;
    info!(id = %page.identifier, count = page.locations.len(), "location scan complete");
    Ok(page)
}
