//! Stage 7: OCR the rasterized page with `tesseract`, gated by the
//! 1-permit OCR limiter (CPU-bound and memory-heavy — never run more than
//! one at a time by default).

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::PendingPage;
use crate::pipeline::context::PipelineContext;
use crate::process::run_limited;

/// ≥4 alphanumeric characters counts as "non-empty" for the resume check —
/// resolves the Open Question in §9 per the source's existing behavior.
fn has_ocr_text(path: &std::path::Path) -> bool {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return false;
    };
    contents.chars().filter(|c| c.is_ascii_alphanumeric()).count() >= 4
}

pub async fn process(mut page: PendingPage, ctx: &PipelineContext, cancel: &CancellationToken) -> Result<PendingPage, PipelineError> {
    if has_ocr_text(&page.ocr_text_path) {
        info!(id = %page.identifier, "ocr text already present, skipping stage 7");
        page.state = crate::model::PageState::Ocred;
        return Ok(page);
    }

    let Some(image_path) = page.png.light.original.clone() else {
        return Err(PipelineError::DataValidation("no rasterized page to ocr".into()));
    };
    let image_str = image_path
        .to_str()
        .ok_or_else(|| PipelineError::DataValidation("image path is not valid UTF-8".into()))?;
    let text_path_no_ext = page.ocr_text_path.with_extension("");
    let text_path_str = text_path_no_ext
        .to_str()
        .ok_or_else(|| PipelineError::DataValidation("ocr text path is not valid UTF-8".into()))?;

    run_limited(
        "tesseract",
        &[image_str, text_path_str, "-l", "eng", "--psm", "1"],
        &ctx.limiters.tesseract,
        cancel,
    )
    .await?;

    page.state = crate::model::PageState::Ocred;
    crate::persistence::write_manifest(&page.manifest_path, &page)?;
    info!(id = %page.identifier, "page ocr'd");
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_ocr_text_requires_four_alnum_chars() {
        let dir = tempfile::tempdir().unwrap();
        let short = dir.path().join("a.txt");
        std::fs::write(&short, "a.b").unwrap();
        assert!(!has_ocr_text(&short));

        let long = dir.path().join("b.txt");
        std::fs::write(&long, "abcd").unwrap();
        assert!(has_ocr_text(&long));
    }
}
