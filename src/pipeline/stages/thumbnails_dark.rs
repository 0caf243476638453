//! Stage 6: generate a dark-mode original via two `convert` passes, then
//! resize it to the same three target widths as the light variant.

use image::imageops::FilterType;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::PendingPage;
use crate::pipeline::context::PipelineContext;
use crate::process::run_limited;

const SIZES: &[(&str, u32)] = &[("large", 999), ("medium", 666), ("small", 333)];

pub async fn process(mut page: PendingPage, ctx: &PipelineContext, cancel: &CancellationToken) -> Result<PendingPage, PipelineError> {
    if page.png.dark.original.is_none() {
        let Some(light_original) = page.png.light.original.clone() else {
            return Err(PipelineError::DataValidation("no light original to derive dark mode from".into()));
        };

        let dark_original = page.pages_dir.join(format!("page.dark.{:06}.original.png", page.page_number));
        let light_str = light_original
            .to_str()
            .ok_or_else(|| PipelineError::DataValidation("light path is not valid UTF-8".into()))?;
        let dark_str = dark_original
            .to_str()
            .ok_or_else(|| PipelineError::DataValidation("dark path is not valid UTF-8".into()))?;

        run_limited(
            "convert",
            &[light_str, "-fuzz", "45%", "-fill", "rgb(250,226,203)", "-opaque", "black", "-flatten", dark_str],
            &ctx.limiters.convert,
            cancel,
        )
        .await?;

        run_limited(
            "convert",
            &[dark_str, "-fuzz", "12%", "-fill", "rgb(40,40,86)", "-opaque", "white", "-flatten", dark_str],
            &ctx.limiters.convert,
            cancel,
        )
        .await?;

        page.png.dark.original = Some(dark_original);
    }

    let original = page.png.dark.original.clone().expect("set above");

    for (label, width) in SIZES {
        let target_path = page.pages_dir.join(format!("page.dark.{:06}.{label}.png", page.page_number));
        let already_set = match *label {
            "large" => page.png.dark.large.is_some(),
            "medium" => page.png.dark.medium.is_some(),
            _ => page.png.dark.small.is_some(),
        };
        if already_set && target_path.exists() {
            continue;
        }

        let _permit = ctx.limiters.darkimage.acquire(cancel).await?;
        let source = original.clone();
        let target = target_path.clone();
        let width = *width;
        tokio::task::spawn_blocking(move || resize_and_save(&source, &target, width))
            .await
            .map_err(|e| PipelineError::DataValidation(format!("resize task panicked: {e}")))??;

        match *label {
            "large" => page.png.dark.large = Some(target_path),
            "medium" => page.png.dark.medium = Some(target_path),
            _ => page.png.dark.small = Some(target_path),
        }
    }

    page.state = crate::model::PageState::ThumbedDark;
    crate::persistence::write_manifest(&page.manifest_path, &page)?;
    info!(id = %page.identifier, "dark thumbnails generated");
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
