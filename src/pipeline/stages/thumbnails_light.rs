//! Stage 5: generate light-mode thumbnails at three target widths by
//! bilinear-resizing the rasterized original, in-process via the `image`
//! crate (§4.7 resize/encode note).

use image::imageops::FilterType;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::PendingPage;
use crate::pipeline::context::PipelineContext;

const SIZES: &[(&str, u32)] = &[("large", 999), ("medium", 666), ("small", 333)];

pub async fn process(mut page: PendingPage, ctx: &PipelineContext, cancel: &CancellationToken) -> Result<PendingPage, PipelineError> {
    let Some(original) = page.png.light.original.clone() else {
        return Err(PipelineError::DataValidation("no light original to resize".into()));
    };

    for (label, width) in SIZES {
        let target_path = page.pages_dir.join(format!("page.light.{:06}.{label}.png", page.page_number));
        let already_set = match *label {
            "large" => page.png.light.large.is_some(),
            "medium" => page.png.light.medium.is_some(),
            _ => page.png.light.small.is_some(),
        };
        if already_set && target_path.exists() {
            continue;
        }

        let _permit = ctx.limiters.resize.acquire(cancel).await?;
        let path_for_blocking = original.clone();
        let target_for_blocking = target_path.clone();
        let width = *width;
        tokio::task::spawn_blocking(move || resize_and_save(&path_for_blocking, &target_for_blocking, width))
            .await
            .map_err(|e| PipelineError::DataValidation(format!("resize task panicked: {e}")))??;

        match *label {
            "large" => page.png.light.large = Some(target_path),
            "medium" => page.png.light.medium = Some(target_path),
            _ => page.png.light.small = Some(target_path),
        }
    }

    page.state = crate::model::PageState::ThumbedLight;
    crate::persistence::write_manifest(&page.manifest_path, &page)?;
    info!(id = %page.identifier, "light thumbnails generated");
    Ok(page)
}

fn resize_and_save(source: &std::path::Path, target: &std::path::Path, width: u32) -> Result<(), PipelineError> {
    let img = image::open(source).map_err(|e| PipelineError::DataValidation(format!("decoding {source:?}: {e}")))?;
    let height = (img.height() as f64 * (width as f64 / img.width() as f64)).round() as u32;
    let resized = img.resize(width, height.max(1), FilterType::Triangle);
    resized
        .save(target)
        .map_err(|e| PipelineError::DataValidation(format!("encoding {target:?}: {e}")))?;
    Ok(())
}
