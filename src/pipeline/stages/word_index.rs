//! Stage 13: confirm the dictionary gate is still set, then persist the
//! fully-analyzed page manifest.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::PendingPage;
use crate::refdata::ReferenceData;

pub async fn process(mut page: PendingPage, refdata: &ReferenceData, cancel: &CancellationToken) -> Result<PendingPage, PipelineError> {
    refdata.dictionaries_gate.wait(cancel).await;
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancellation);
    }

    page.state = crate::model::PageState::Indexed;
    crate::persistence::write_manifest(&page.manifest_path, &page)?;
    info!(id = %page.identifier, "page manifest indexed and persisted");
    Ok(page)
}
