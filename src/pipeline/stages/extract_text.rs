//! Stage 2: extract plain text with `pdftotext`, skipped on resume or when
//! the existing output already looks non-trivial.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::model::Record;
use crate::pipeline::context::PipelineContext;
use crate::process::run_limited;

/// The source's `fileHasData`: strip non-alphanumeric characters and
/// require more than 3 remain.
pub(crate) fn file_has_data(path: &std::path::Path) -> bool {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return false;
    };
    let alnum: String = contents.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    alnum.len() > 3
}

pub async fn process(record: Record, ctx: &PipelineContext, cancel: &CancellationToken) -> Result<Record, PipelineError> {
    if record.resumed || file_has_data(&record.extracted_text_path) {
        info!(id = %record.identifier, "extracted text already present, skipping stage 2");
        return Ok(record);
    }

    let pdf = record
        .pdf_path
        .to_str()
        .ok_or_else(|| PipelineError::DataValidation("pdf path is not valid UTF-8".into()))?;
    let text_path = record
        .extracted_text_path
        .to_str()
        .ok_or_else(|| PipelineError::DataValidation("text path is not valid UTF-8".into()))?;

    run_limited("pdftotext", &[pdf, text_path], &ctx.limiters.pdftotext, cancel).await?;

    info!(id = %record.identifier, "plain text extracted");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_has_data_requires_more_than_three_alnum_chars() {
        let dir = tempfile::tempdir().unwrap();
        let short = dir.path().join("short.txt");
        std::fs::write(&short, "--.").unwrap();
        assert!(!file_has_data(&short));

        let long = dir.path().join("long.txt");
        std::fs::write(&long, "hello world").unwrap();
        assert!(file_has_data(&long));
    }

    #[test]
    fn file_has_data_false_when_missing() {
        assert!(!file_has_data(std::path::Path::new("/nonexistent/path.txt")));
    }
}
