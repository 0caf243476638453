//! Stage 3: split a validated PDF into per-page PDFs with `pdfcpu extract`,
//! then build one [`PendingPage`] per page. Fans out 1 → N, so it is wired
//! with its own loop in `pipeline::mod` rather than the generic dispatcher.

use std::path::Path;

use regex::Regex;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::ids::IdentifierAllocator;
use crate::model::{ImageFamily, PageState, PendingPage, Record};
use crate::persistence::{read_manifest, write_manifest};
use crate::pipeline::context::PipelineContext;
use crate::process::run_limited;

static PAGE_FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_page_(\d+)\.pdf$").unwrap());

pub async fn process(
    record: &Record,
    ctx: &PipelineContext,
    ids: &IdentifierAllocator,
    cancel: &CancellationToken,
) -> Result<Vec<PendingPage>, PipelineError> {
    let pages_dir = record.data_dir.join("pages");

    if !has_page_pdfs(&pages_dir) {
        let pdf = record
            .pdf_path
            .to_str()
            .ok_or_else(|| PipelineError::DataValidation("pdf path is not valid UTF-8".into()))?;
        let pages_dir_str = pages_dir
            .to_str()
            .ok_or_else(|| PipelineError::DataValidation("pages dir is not valid UTF-8".into()))?;
        std::fs::create_dir_all(&pages_dir)?;
        run_limited(
            "pdfcpu",
            &["extract", "-mode", "page", pdf, pages_dir_str],
            &ctx.limiters.pdfcpu,
            cancel,
        )
        .await?;
    }

    let mut pages = Vec::new();
    let entries = std::fs::read_dir(&pages_dir)?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(captures) = PAGE_FILE.captures(name) else {
            continue;
        };
        let page_number: u32 = captures[1]
            .parse()
            .map_err(|_| PipelineError::DataValidation(format!("malformed page filename: {name}")))?;

        pages.push(build_pending_page(record, page_number, &pages_dir, &path, ids)?);
    }

    pages.sort_by_key(|p| p.page_number);
    info!(id = %record.identifier, count = pages.len(), "split into pages");
    Ok(pages)
}

fn has_page_pdfs(pages_dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(pages_dir) else {
        return false;
    };
    entries
        .filter_map(Result::ok)
        .any(|e| e.file_name().to_str().is_some_and(|n| PAGE_FILE.is_match(n)))
}

/// Reloads a page's manifest from a prior run if one already exists on
/// disk, instead of rebuilding blank `Created` state and clobbering
/// whatever stage progress (rasterized PNGs, OCR text, analysis) that run
/// already recorded. Only a genuinely new page gets a fresh manifest.
fn build_pending_page(
    record: &Record,
    page_number: u32,
    pages_dir: &Path,
    page_pdf_path: &Path,
    ids: &IdentifierAllocator,
) -> Result<PendingPage, PipelineError> {
    let manifest_path = pages_dir.join(PendingPage::manifest_name(page_number));

    if manifest_path.exists() {
        return read_manifest(&manifest_path);
    }

    let identifier = ids
        .allocate_page_id()
        .map_err(|e| PipelineError::DataValidation(e.to_string()))?;

    let ocr_text_path = pages_dir.join(PendingPage::ocr_text_name(page_number));

    let page = PendingPage {
        identifier,
        record_identifier: record.identifier.clone(),
        page_number,
        pages_dir: pages_dir.to_path_buf(),
        pdf_path: page_pdf_path.to_path_buf(),
        ocr_text_path,
        manifest_path,
        state: PageState::Created,
        language: None,
        word_results: Vec::new(),
        cryptonyms: Vec::new(),
        dates: Vec::new(),
        locations: Vec::new(),
        gematria: Vec::new(),
        png: ImageFamily::default(),
        jpeg: ImageFamily::default(),
    };

    write_manifest(&page.manifest_path, &page)?;
    Ok(page)
}
