//! External-process invocation under a named concurrency limiter.
//!
//! Every pipeline stage that shells out to a binary (`pdfcpu`, `gs`,
//! `pdftotext`, `pdftoppm`, `convert`, `tesseract`) goes through
//! [`run_limited`], which acquires the stage's limiter permit, logs
//! start/completion, and maps a nonzero exit into [`PipelineError::ExternalProcess`].

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::concurrency::Limiter;
use crate::error::PipelineError;

/// Run `binary` with `args` under `limiter`, returning captured stdout on
/// success.
pub async fn run_limited(
    binary: &str,
    args: &[&str],
    limiter: &Limiter,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, PipelineError> {
    let _permit = limiter.acquire(cancel).await?;

    debug!(binary, limiter = limiter.name(), args = ?args, "invoking external process");

    let output = Command::new(binary)
        .args(args)
        .output()
        .await
        .map_err(|e| PipelineError::ExternalProcess {
            binary: binary.to_string(),
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        warn!(binary, status = ?output.status, "external process exited nonzero");
        return Err(PipelineError::ExternalProcess {
            binary: binary.to_string(),
            detail: format!(
                "exit status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }

    Ok(output.stdout)
}

/// As [`run_limited`], but also requires `needle` to appear in stdout
/// (e.g. `pdfcpu validate`'s "validation ok").
pub async fn run_limited_expect(
    binary: &str,
    args: &[&str],
    needle: &str,
    limiter: &Limiter,
    cancel: &CancellationToken,
) -> Result<(), PipelineError> {
    let stdout = run_limited(binary, args, limiter, cancel).await?;
    let text = String::from_utf8_lossy(&stdout);
    if !text.contains(needle) {
        return Err(PipelineError::ExternalProcess {
            binary: binary.to_string(),
            detail: format!("expected output to contain {needle:?}, got: {text}"),
        });
    }
    Ok(())
}
