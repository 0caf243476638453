//! Lifecycle controller (§4.9): startup ordering, readiness kickoff,
//! signal-driven shutdown, and the drain barrier.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::binaries;
use crate::config::Config;
use crate::error::FatalStartupError;
use crate::ingest::Ingestor;
use crate::model::Document;
use crate::pipeline;
use crate::pipeline::context::PipelineContext;
use crate::refdata::{self, ReferenceData, ReferenceDataPaths};

pub async fn run(config: Config) -> Result<Vec<Document>, FatalStartupError> {
    let started = Instant::now();
    let cancel = install_signal_handler();

    config.validate()?;
    info!(dir = ?config.dir, file = ?config.file, "configuration loaded");

    binaries::verify_all()?;
    info!("all required binaries verified on $PATH");

    let paths = reference_data_paths(&config);
    let reference_data = Arc::new(ReferenceData::empty());
    refdata::spawn_loaders(reference_data.clone(), paths);

    let mut ctx = PipelineContext::new(config);
    ctx.cancel = cancel.clone();
    ctx.refdata = reference_data;
    let ctx = Arc::new(ctx);

    let ingestor = Arc::new(Ingestor {
        data_dir: ctx.config.dir.clone(),
        pdf_url_base: ctx.config.pdf_url_base.clone(),
        client: reqwest::Client::new(),
        ids: ctx.ids.clone(),
        download_limiter: ctx.limiters.download.clone(),
        shafile_limiter: ctx.limiters.shafile.clone(),
    });

    info!("starting dispatchers and spreadsheet ingestion");
    let file = ctx.config.file.clone();
    let buffer = ctx.config.buffer;
    let documents = pipeline::run(ctx, ingestor, file, buffer).await;

    if cancel.is_cancelled() {
        warn!(elapsed = ?started.elapsed(), "shutdown requested, pipeline drained under cancellation");
    } else {
        info!(elapsed = ?started.elapsed(), documents = documents.len(), "pipeline run complete");
    }

    Ok(documents)
}

fn install_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_for_task = cancel.clone();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
            let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
            tokio::select! {
                _ = sigint.recv() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        error!("shutdown signal received, cancelling and draining");
        cancel_for_task.cancel();
    });

    cancel
}

fn reference_data_paths(config: &Config) -> ReferenceDataPaths {
    ReferenceDataPaths {
        cryptonyms: config.cryptonyms_path.clone(),
        locations: config.locations_path.clone(),
        dictionaries_dir: config.dictionaries_dir.clone(),
    }
}
