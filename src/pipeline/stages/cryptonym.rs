//! Stage 10: mark every cryptonym that appears as a literal, case-sensitive
//! substring of the page's OCR text.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::PendingPage;
use crate::refdata::ReferenceData;

pub async fn process(mut page: PendingPage, refdata: &ReferenceData, cancel: &CancellationToken) -> Result<PendingPage, PipelineError> {
    refdata.cryptonyms_gate.wait(cancel).await;
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancellation);
    }

    let text = std::fs::read_to_string(&page.ocr_text_path).unwrap_or_default();
    page.cryptonyms = refdata.cryptonyms.matches_in(&text);
    page.state = crate::model::PageState::CryptoScanned;
    crate::persistence::write_manifest(&page.manifest_path, &page)?;
    info!(id = %page.identifier, count = page.cryptonyms.len(), "cryptonym scan complete");
    Ok(page)
}
