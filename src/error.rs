//! Error taxonomy for the acquisition pipeline.
//!
//! Mirrors the five error kinds the pipeline distinguishes operationally:
//! failures that should abort startup, failures that are worth retrying,
//! failures in a shelled-out tool, malformed input data, and cooperative
//! cancellation. Only `FatalStartup` propagates out of `main`; the rest are
//! handled per-item so one bad row or page never stops the run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort the process before the pipeline starts running.
#[derive(Debug, Error)]
pub enum FatalStartupError {
    #[error("required binary '{0}' was not found on $PATH")]
    MissingBinary(String),

    #[error("required binary '{0}' was found at {1:?} but is not executable")]
    NotExecutable(String, PathBuf),

    #[error("data directory {0:?} does not exist or is not a directory")]
    InvalidDataDir(PathBuf),

    #[error("missing required flag: {0}")]
    MissingFlag(&'static str),

    #[error("failed to read configuration: {0}")]
    Config(#[from] anyhow::Error),
}

/// Per-item errors raised while an item moves through the pipeline.
///
/// These never escape the stage worker that raised them; the dispatcher
/// logs them and drops the item rather than propagating a panic or
/// stopping sibling work.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("transient I/O error after retries: {0}")]
    TransientIo(String),

    #[error("external process `{binary}` failed: {detail}")]
    ExternalProcess { binary: String, detail: String },

    #[error("data validation failed: {0}")]
    DataValidation(String),

    #[error("operation cancelled")]
    Cancellation,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
