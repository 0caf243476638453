//! Stage 4: rasterize a page PDF to a PNG with `pdftoppm` at 369dpi.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::PendingPage;
use crate::pipeline::context::PipelineContext;
use crate::process::run_limited;

pub async fn process(mut page: PendingPage, ctx: &PipelineContext, cancel: &CancellationToken) -> Result<PendingPage, PipelineError> {
    if page.png.light.original.is_some() {
        info!(id = %page.identifier, "light original png already present, skipping stage 4");
        return Ok(page);
    }

    let prefix = page
        .pages_dir
        .join(format!("page.light.{:06}.original", page.page_number));
    let prefix_str = prefix
        .to_str()
        .ok_or_else(|| PipelineError::DataValidation("prefix is not valid UTF-8".into()))?;
    let pdf_str = page
        .pdf_path
        .to_str()
        .ok_or_else(|| PipelineError::DataValidation("page pdf path is not valid UTF-8".into()))?;

    run_limited(
        "pdftoppm",
        &[
            "-r", "369", "-png", "-freetype", "yes", "-aa", "yes", "-aaVector", "yes",
            "-thinlinemode", "solid", pdf_str, prefix_str,
        ],
        &ctx.limiters.pdftoppm,
        cancel,
    )
    .await?;

    let emitted = prefix.with_file_name(format!("{}-1.png", prefix.file_name().and_then(|n| n.to_str()).unwrap_or_default()));
    let target = prefix.with_extension("png");
    if emitted.exists() {
        std::fs::rename(&emitted, &target)?;
    }

    page.png.light.original = Some(target);
    page.state = crate::model::PageState::Rasterized;
    crate::persistence::write_manifest(&page.manifest_path, &page)?;
    info!(id = %page.identifier, "page rasterized to png");
    Ok(page)
}
