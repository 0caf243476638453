//! Stage 1: validate → normalize → optimize a downloaded PDF in place.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::Record;
use crate::pipeline::context::PipelineContext;
use crate::process::{run_limited, run_limited_expect};

pub async fn process(record: Record, ctx: &PipelineContext, cancel: &CancellationToken) -> Result<Record, PipelineError> {
    if record.resumed {
        info!(id = %record.identifier, "record previously validated, skipping stage 1");
        return Ok(record);
    }

    let pdf = record
        .pdf_path
        .to_str()
        .ok_or_else(|| PipelineError::DataValidation("pdf path is not valid UTF-8".into()))?;

    run_limited_expect(
        "pdfcpu",
        &["validate", pdf],
        "validation ok",
        &ctx.limiters.pdfcpu,
        cancel,
    )
    .await?;

    run_limited(
        "gs",
        &["-q", "-sDEVICE=pdfwrite", "-dCompatibilityLevel=1.7", "-o", pdf, pdf],
        &ctx.limiters.gs,
        cancel,
    )
    .await?;

    run_limited("pdfcpu", &["optimize", pdf], &ctx.limiters.pdfcpu, cancel).await?;

    info!(id = %record.identifier, "pdf validated and normalized");
    Ok(record)
}
