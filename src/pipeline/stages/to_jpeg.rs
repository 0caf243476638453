//! Stage 8: convert every PNG variant to JPEG and delete the source PNG.
//!
//! The `image` crate's JPEG encoder has no progressive-mode flag (unlike
//! the original's `go-libjpeg` binding); we encode baseline JPEG at the
//! configured quality — a resolved Open Question, see DESIGN.md.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::PendingPage;
use crate::pipeline::context::PipelineContext;

pub async fn process(mut page: PendingPage, ctx: &PipelineContext, cancel: &CancellationToken) -> Result<PendingPage, PipelineError> {
    let quality = ctx.config.jpeg_quality;

    page.jpeg.light.original = convert_one(&mut page.png.light.original, "light", "original", &page, quality, ctx, cancel).await?;
    page.jpeg.light.large = convert_one(&mut page.png.light.large, "light", "large", &page, quality, ctx, cancel).await?;
    page.jpeg.light.medium = convert_one(&mut page.png.light.medium, "light", "medium", &page, quality, ctx, cancel).await?;
    page.jpeg.light.small = convert_one(&mut page.png.light.small, "light", "small", &page, quality, ctx, cancel).await?;

    page.jpeg.dark.original = convert_one(&mut page.png.dark.original, "dark", "original", &page, quality, ctx, cancel).await?;
    page.jpeg.dark.large = convert_one(&mut page.png.dark.large, "dark", "large", &page, quality, ctx, cancel).await?;
    page.jpeg.dark.medium = convert_one(&mut page.png.dark.medium, "dark", "medium", &page, quality, ctx, cancel).await?;
    page.jpeg.dark.small = convert_one(&mut page.png.dark.small, "dark", "small", &page, quality, ctx, cancel).await?;

    page.state = crate::model::PageState::Jpeg;
    crate::persistence::write_manifest(&page.manifest_path, &page)?;
    info!(id = %page.identifier, "pngs converted to jpeg");
    Ok(page)
}

#[allow(clippy::too_many_arguments)]
async fn convert_one(
    png_path: &mut Option<PathBuf>,
    shade: &str,
    size: &str,
    page: &PendingPage,
    quality: u8,
    ctx: &PipelineContext,
    cancel: &CancellationToken,
) -> Result<Option<PathBuf>, PipelineError> {
    let Some(source) = png_path.take() else {
        return Ok(None);
    };
    if !source.exists() {
        return Ok(None);
    }

    let target = page.pages_dir.join(format!("{shade}.{:06}.{size}.jpg", page.page_number));

    let _permit = ctx.limiters.png2jpg.acquire(cancel).await?;
    let source_for_blocking = source.clone();
    let target_for_blocking = target.clone();
    tokio::task::spawn_blocking(move || encode_jpeg(&source_for_blocking, &target_for_blocking, quality))
        .await
        .map_err(|e| PipelineError::DataValidation(format!("jpeg encode task panicked: {e}")))??;

    std::fs::remove_file(&source)?;
    Ok(Some(target))
}

fn encode_jpeg(source: &std::path::Path, target: &std::path::Path, quality: u8) -> Result<(), PipelineError> {
    let img = image::open(source).map_err(|e| PipelineError::DataValidation(format!("decoding {source:?}: {e}")))?;
    let mut out = std::fs::File::create(target)?;
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    img.write_with_encoder(encoder)
        .map_err(|e| PipelineError::DataValidation(format!("encoding {target:?}: {e}")))?;
    Ok(())
}
