//! The Record Ingestor: spreadsheet rows in, normalized [`Record`]s out.

mod dates;
mod download;
mod header;
mod spreadsheet;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256, Sha512};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::concurrency::Limiter;
use crate::error::PipelineError;
use crate::ids::IdentifierAllocator;
use crate::model::Record;
use crate::persistence::write_manifest;

const METADATA_KEYS: &[&str] = &[
    "title",
    "record_number",
    "release_date",
    "creation_date",
    "agency",
    "to_name",
    "from_name",
    "collection",
    "comments",
];

pub struct Ingestor {
    pub data_dir: PathBuf,
    pub pdf_url_base: Option<String>,
    pub client: reqwest::Client,
    pub ids: Arc<IdentifierAllocator>,
    pub download_limiter: Limiter,
    pub shafile_limiter: Limiter,
}

impl Ingestor {
    /// Read every row of `path` and stream a Record for each onto the
    /// returned channel as soon as it's ready, rather than collecting the
    /// whole spreadsheet first. One row's download+hash runs as its own
    /// task, bounded by `download_limiter`/`shafile_limiter` the same as
    /// every other permit in the pipeline, so rows overlap instead of
    /// completing one at a time. One row failing (bad URL, data
    /// validation) is logged and skipped; it does not stop the rest.
    pub fn ingest_stream(self: Arc<Self>, path: PathBuf, buffer_size: usize, cancel: CancellationToken) -> mpsc::Receiver<Record> {
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let rows = match spreadsheet::read_rows(&path, buffer_size) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(error = %e, "failed to read spreadsheet, no records ingested");
                    return;
                }
            };

            let mut tasks = JoinSet::new();
            for row in rows {
                if cancel.is_cancelled() {
                    break;
                }
                let this = self.clone();
                let tx = tx.clone();
                let cancel = cancel.clone();
                tasks.spawn(async move {
                    match this.ingest_row(&row, &cancel).await {
                        Ok(record) => {
                            let _ = tx.send(record).await;
                        }
                        Err(e) => warn!(error = %e, "row failed to ingest, skipping"),
                    }
                });
            }
            while tasks.join_next().await.is_some() {}
        });

        rx
    }

    async fn ingest_row(&self, fields: &HashMap<String, String>, cancel: &CancellationToken) -> Result<Record, PipelineError> {
        let filename = fields
            .get("filename")
            .cloned()
            .ok_or_else(|| PipelineError::DataValidation("row missing filename".into()))?;

        let pdf_url = resolve_pdf_url(fields, &filename, self.pdf_url_base.as_deref())?;

        let dir_hash = hex::encode(Sha256::digest(pdf_url.as_bytes()));
        let record_dir = self.data_dir.join(&dir_hash);
        create_record_dir(&record_dir)?;

        let identifier = self
            .ids
            .allocate_record_id()
            .map_err(|e| PipelineError::DataValidation(e.to_string()))?;

        let safe_filename = sanitize_filename(&filename);
        let pdf_path = record_dir.join(&safe_filename);

        download::download_if_missing(&self.client, &pdf_url, &pdf_path, &self.download_limiter, cancel).await?;

        let sha512 = {
            let _permit = self.shafile_limiter.acquire(cancel).await?;
            hash_file_sha512(&pdf_path)?
        };

        let total_pages = fields
            .get("total_pages")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0);

        let metadata = build_metadata(fields);
        let legacy_ocr_text_path = record_dir.join(format!("ocr.{identifier}.txt"));
        let manifest_path = record_dir.join(Record::manifest_name());
        let resumed = manifest_path.exists();

        let record = Record {
            identifier,
            source_url: fields.get("source_url").cloned().unwrap_or_else(|| pdf_url.clone()),
            pdf_path,
            pdf_sha512: Some(sha512),
            extracted_text_path: record_dir.join(format!("{safe_filename}.txt")),
            legacy_ocr_text_path,
            data_dir: record_dir.clone(),
            manifest_path,
            total_pages,
            metadata,
            resumed,
        };

        write_manifest(&record.manifest_path, &record)?;
        info!(identifier = %record.identifier, url = %pdf_url, "record ingested");
        Ok(record)
    }
}

fn resolve_pdf_url(fields: &HashMap<String, String>, filename: &str, base: Option<&str>) -> Result<String, PipelineError> {
    if let Some(url) = fields.get("pdf_url") {
        if url.starts_with("http") {
            return Ok(url.clone());
        }
    }
    let base = base.ok_or_else(|| {
        PipelineError::DataValidation("pdf_url missing/non-http and no pdf_url_base configured".into())
    })?;
    Ok(format!("{}/{}", base.trim_end_matches('/'), filename))
}

fn create_record_dir(dir: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(dir)?.permissions();
        perms.set_mode(0o750);
        std::fs::set_permissions(dir, perms)?;
    }
    Ok(())
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn hash_file_sha512(path: &Path) -> Result<String, PipelineError> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha512::digest(&bytes)))
}

fn build_metadata(fields: &HashMap<String, String>) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    for key in METADATA_KEYS {
        if let Some(value) = fields.get(*key) {
            if !value.trim().is_empty() {
                if key.ends_with("_date") {
                    if let Some(parsed) = dates::parse_permissive(value) {
                        metadata.insert((*key).to_string(), parsed.to_rfc3339());
                        continue;
                    }
                    warn!(field = key, value, "unparseable date, eliding");
                    continue;
                }
                metadata.insert((*key).to_string(), value.clone());
            }
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_pdf_url_prefers_http_field() {
        let mut fields = HashMap::new();
        fields.insert("pdf_url".to_string(), "http://example.com/a.pdf".to_string());
        let url = resolve_pdf_url(&fields, "a.pdf", None).unwrap();
        assert_eq!(url, "http://example.com/a.pdf");
    }

    #[test]
    fn resolve_pdf_url_synthesizes_from_base() {
        let fields = HashMap::new();
        let url = resolve_pdf_url(&fields, "a.pdf", Some("https://archive.example/docs")).unwrap();
        assert_eq!(url, "https://archive.example/docs/a.pdf");
    }

    #[test]
    fn sanitize_filename_strips_unsafe_characters() {
        assert_eq!(sanitize_filename("a b/c.pdf"), "a_b_c.pdf");
    }

    #[test]
    fn build_metadata_elides_unparseable_dates() {
        let mut fields = HashMap::new();
        fields.insert("creation_date".to_string(), "garbage".to_string());
        fields.insert("agency".to_string(), "CIA".to_string());
        let metadata = build_metadata(&fields);
        assert!(!metadata.contains_key("creation_date"));
        assert_eq!(metadata.get("agency"), Some(&"CIA".to_string()));
    }
}
