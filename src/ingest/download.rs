//! PDF download with bounded retry, matching the source's
//! `tryDownloadFile`: up to 33 attempts, each preceded by a random backoff
//! capped at `2^attempt` seconds, retrying only on what looks like a
//! transient network failure.

use std::path::Path;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::concurrency::Limiter;
use crate::error::PipelineError;

const MAX_ATTEMPTS: u32 = 33;

pub async fn download_if_missing(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    limiter: &Limiter,
    cancel: &CancellationToken,
) -> Result<(), PipelineError> {
    if dest.exists() {
        debug!(?dest, "pdf already present, skipping download");
        return Ok(());
    }

    let _permit = limiter.acquire(cancel).await?;

    let mut last_error = String::new();
    for attempt in 0..MAX_ATTEMPTS {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancellation);
        }

        if attempt > 0 {
            let cap = 1u64 << attempt.min(20);
            let backoff_secs = rand::rng().random_range(0..=cap.min(33));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancellation),
                _ = tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)) => {}
            }
        }

        match try_download(client, url, dest).await {
            Ok(()) => return Ok(()),
            Err(DownloadError::Transient(detail)) => {
                warn!(attempt, url, error = %detail, "transient download failure, retrying");
                last_error = detail;
            }
            Err(DownloadError::Fatal(detail)) => {
                return Err(PipelineError::TransientIo(detail));
            }
        }
    }

    Err(PipelineError::TransientIo(format!(
        "exhausted {MAX_ATTEMPTS} attempts downloading {url}: {last_error}"
    )))
}

enum DownloadError {
    Transient(String),
    Fatal(String),
}

async fn try_download(client: &reqwest::Client, url: &str, dest: &Path) -> Result<(), DownloadError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify(&e))?
        .error_for_status()
        .map_err(|e| classify(&e))?;
    let bytes = response.bytes().await.map_err(|e| classify(&e))?;
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::Fatal(e.to_string()))?;
    }
    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| DownloadError::Fatal(e.to_string()))?;
    Ok(())
}

fn classify(e: &reqwest::Error) -> DownloadError {
    if e.is_timeout() || e.is_connect() {
        DownloadError::Transient(e.to_string())
    } else {
        DownloadError::Fatal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn skips_download_when_file_already_present() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("existing.pdf");
        std::fs::write(&dest, b"already here").unwrap();
        let client = reqwest::Client::new();
        let limiter = Limiter::new("download", 1);
        let cancel = CancellationToken::new();
        download_if_missing(&client, "http://example.invalid/x.pdf", &dest, &limiter, &cancel)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"already here");
    }
}
