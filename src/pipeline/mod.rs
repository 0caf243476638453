//! Pipeline topology: wires the 15 stages together as explicit
//! `tokio::spawn` blocks connected by bounded queues (§9 design note — no
//! named globals, no `dyn Any`). See DESIGN.md for why this is hand-written
//! per stage rather than table-driven.

pub mod active;
pub mod context;
pub mod dispatcher;
pub mod stages;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use crate::concurrency::{Queue, QueueSender};
use crate::error::PipelineError;
use crate::ids::IdentifierAllocator;
use crate::ingest::Ingestor;
use crate::model::{Document, PendingPage, Record};

use active::ActiveCounter;
use context::PipelineContext;
use stages::aggregate::Aggregator;

#[derive(Clone)]
struct RecordInfo {
    total_pages: u32,
    source_url: String,
    collection: Option<String>,
}

/// Looks up the owning record's bookkeeping, records one failed page
/// against it, and forwards the finalized Document if that failure was
/// what completed the count. Shared by every page stage's error branch so
/// a page dying anywhere in the pipeline still lets its document finish.
async fn record_stage_failure(
    stage: &'static str,
    record_identifier: &str,
    error: &PipelineError,
    record_info: &RwLock<HashMap<String, RecordInfo>>,
    aggregator: &Aggregator,
    doc_outbound: &QueueSender<Document>,
) {
    warn!(stage, id = record_identifier, error = %error, "stage failed for item, dropping");

    let info = record_info.read().await.get(record_identifier).cloned();
    let (total_pages, source_url, collection) = match info {
        Some(i) => (i.total_pages, i.source_url, i.collection),
        None => (0, String::new(), None),
    };
    if let Some(doc) = aggregator.record_failure(record_identifier, total_pages, &source_url, collection) {
        let _ = doc_outbound.send(doc).await;
    }
}

/// Runs the full stage topology until every input record has drained
/// through to aggregation (or been cancelled). Returns every Document
/// emitted.
///
/// Every stage dispatcher below is spawned and already polling its (empty)
/// inbound queue before `ingestor` is asked to start reading `file` — so
/// rows still being downloaded overlap with pipeline work on rows already
/// ingested, rather than the whole spreadsheet finishing first.
pub async fn run(ctx: Arc<PipelineContext>, ingestor: Arc<Ingestor>, file: PathBuf, buffer: usize) -> Vec<Document> {
    let capacity = ctx.config.limit;

    let (q_validate_tx, q_validate_rx) = Queue::<Record>::bounded(capacity);
    let (q_extract_tx, q_extract_rx) = Queue::<Record>::bounded(capacity);
    let (q_split_tx, q_split_rx) = Queue::<Record>::bounded(capacity);
    let (q_rasterize_tx, q_rasterize_rx) = Queue::<PendingPage>::bounded(capacity);
    let (q_light_tx, q_light_rx) = Queue::<PendingPage>::bounded(capacity);
    let (q_dark_tx, q_dark_rx) = Queue::<PendingPage>::bounded(capacity);
    let (q_ocr_tx, q_ocr_rx) = Queue::<PendingPage>::bounded(capacity);
    let (q_jpeg_tx, q_jpeg_rx) = Queue::<PendingPage>::bounded(capacity);
    let (q_dates_tx, q_dates_rx) = Queue::<PendingPage>::bounded(capacity);
    let (q_crypto_tx, q_crypto_rx) = Queue::<PendingPage>::bounded(capacity);
    let (q_location_tx, q_location_rx) = Queue::<PendingPage>::bounded(capacity);
    let (q_gematria_tx, q_gematria_rx) = Queue::<PendingPage>::bounded(capacity);
    let (q_index_tx, q_index_rx) = Queue::<PendingPage>::bounded(capacity);
    let (q_doc_tx, mut q_doc_rx) = Queue::<Document>::bounded(capacity.max(4));

    let active = Arc::new(ActiveCounter::new());
    let record_info: Arc<RwLock<HashMap<String, RecordInfo>>> = Arc::new(RwLock::new(HashMap::new()));
    let aggregator = Arc::new(Aggregator::new());
    let ids = ctx.ids.clone();

    // Dispatchers are spawned and already polling their (empty) inbound
    // queues before ingestion below sends a single record, so downloads
    // and stage work for earlier rows overlap with ingestion of later
    // ones rather than waiting for the whole spreadsheet to be read first.

    // Stage 1: validate.
    {
        let ctx = ctx.clone();
        let active = active.clone();
        tokio::spawn(dispatcher::run_stage("validate", q_validate_rx, Some(q_extract_tx), active, ctx.cancel.clone(), move |record: Record| {
            let ctx = ctx.clone();
            async move {
                let cancel = ctx.cancel.clone();
                let id = record.identifier.clone();
                stages::log_and_drop("validate", &id, stages::validate::process(record, &ctx, &cancel).await)
            }
        }));
    }

    // Stage 2: extract text.
    {
        let ctx = ctx.clone();
        let active = active.clone();
        tokio::spawn(dispatcher::run_stage("extract_text", q_extract_rx, Some(q_split_tx), active, ctx.cancel.clone(), move |record: Record| {
            let ctx = ctx.clone();
            async move {
                let cancel = ctx.cancel.clone();
                let id = record.identifier.clone();
                stages::log_and_drop("extract_text", &id, stages::extract_text::process(record, &ctx, &cancel).await)
            }
        }));
    }

    // Stage 3: split pages. Fans 1 -> N, and handles zero-page records by
    // emitting an empty Document directly.
    {
        let ctx = ctx.clone();
        let active = active.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let q_doc_tx = q_doc_tx.clone();
        let ids = ids.clone();
        tokio::spawn(run_split_stage(
            q_split_rx,
            q_rasterize_tx,
            q_doc_tx,
            ctx,
            active,
            ids,
            record_info,
            aggregator,
        ));
    }

    {
        let ctx1 = ctx.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let doc_outbound = q_doc_tx.clone();
        tokio::spawn(dispatcher::run_stage("rasterize", q_rasterize_rx, Some(q_light_tx), active.clone(), ctx.cancel.clone(), move |page: PendingPage| {
            let ctx = ctx1.clone();
            let record_info = record_info.clone();
            let aggregator = aggregator.clone();
            let doc_outbound = doc_outbound.clone();
            async move {
                let cancel = ctx.cancel.clone();
                let record_identifier = page.record_identifier.clone();
                match stages::rasterize::process(page, &ctx, &cancel).await {
                    Ok(page) => Some(page),
                    Err(PipelineError::Cancellation) => None,
                    Err(e) => {
                        record_stage_failure("rasterize", &record_identifier, &e, &record_info, &aggregator, &doc_outbound).await;
                        None
                    }
                }
            }
        }));
    }

    {
        let ctx1 = ctx.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let doc_outbound = q_doc_tx.clone();
        tokio::spawn(dispatcher::run_stage("thumbnails_light", q_light_rx, Some(q_dark_tx), active.clone(), ctx.cancel.clone(), move |page: PendingPage| {
            let ctx = ctx1.clone();
            let record_info = record_info.clone();
            let aggregator = aggregator.clone();
            let doc_outbound = doc_outbound.clone();
            async move {
                let cancel = ctx.cancel.clone();
                let record_identifier = page.record_identifier.clone();
                match stages::thumbnails_light::process(page, &ctx, &cancel).await {
                    Ok(page) => Some(page),
                    Err(PipelineError::Cancellation) => None,
                    Err(e) => {
                        record_stage_failure("thumbnails_light", &record_identifier, &e, &record_info, &aggregator, &doc_outbound).await;
                        None
                    }
                }
            }
        }));
    }

    {
        let ctx1 = ctx.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let doc_outbound = q_doc_tx.clone();
        tokio::spawn(dispatcher::run_stage("thumbnails_dark", q_dark_rx, Some(q_ocr_tx), active.clone(), ctx.cancel.clone(), move |page: PendingPage| {
            let ctx = ctx1.clone();
            let record_info = record_info.clone();
            let aggregator = aggregator.clone();
            let doc_outbound = doc_outbound.clone();
            async move {
                let cancel = ctx.cancel.clone();
                let record_identifier = page.record_identifier.clone();
                match stages::thumbnails_dark::process(page, &ctx, &cancel).await {
                    Ok(page) => Some(page),
                    Err(PipelineError::Cancellation) => None,
                    Err(e) => {
                        record_stage_failure("thumbnails_dark", &record_identifier, &e, &record_info, &aggregator, &doc_outbound).await;
                        None
                    }
                }
            }
        }));
    }

    {
        let ctx1 = ctx.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let doc_outbound = q_doc_tx.clone();
        tokio::spawn(dispatcher::run_stage("ocr", q_ocr_rx, Some(q_jpeg_tx), active.clone(), ctx.cancel.clone(), move |page: PendingPage| {
            let ctx = ctx1.clone();
            let record_info = record_info.clone();
            let aggregator = aggregator.clone();
            let doc_outbound = doc_outbound.clone();
            async move {
                let cancel = ctx.cancel.clone();
                let record_identifier = page.record_identifier.clone();
                match stages::ocr::process(page, &ctx, &cancel).await {
                    Ok(page) => Some(page),
                    Err(PipelineError::Cancellation) => None,
                    Err(e) => {
                        record_stage_failure("ocr", &record_identifier, &e, &record_info, &aggregator, &doc_outbound).await;
                        None
                    }
                }
            }
        }));
    }

    {
        let ctx1 = ctx.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let doc_outbound = q_doc_tx.clone();
        tokio::spawn(dispatcher::run_stage("to_jpeg", q_jpeg_rx, Some(q_dates_tx), active.clone(), ctx.cancel.clone(), move |page: PendingPage| {
            let ctx = ctx1.clone();
            let record_info = record_info.clone();
            let aggregator = aggregator.clone();
            let doc_outbound = doc_outbound.clone();
            async move {
                let cancel = ctx.cancel.clone();
                let record_identifier = page.record_identifier.clone();
                match stages::to_jpeg::process(page, &ctx, &cancel).await {
                    Ok(page) => Some(page),
                    Err(PipelineError::Cancellation) => None,
                    Err(e) => {
                        record_stage_failure("to_jpeg", &record_identifier, &e, &record_info, &aggregator, &doc_outbound).await;
                        None
                    }
                }
            }
        }));
    }

    {
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let doc_outbound = q_doc_tx.clone();
        tokio::spawn(dispatcher::run_stage("dates", q_dates_rx, Some(q_crypto_tx), active.clone(), ctx.cancel.clone(), move |page: PendingPage| {
            let record_info = record_info.clone();
            let aggregator = aggregator.clone();
            let doc_outbound = doc_outbound.clone();
            async move {
                let record_identifier = page.record_identifier.clone();
                match stages::dates::process(page).await {
                    Ok(page) => Some(page),
                    Err(PipelineError::Cancellation) => None,
                    Err(e) => {
                        record_stage_failure("dates", &record_identifier, &e, &record_info, &aggregator, &doc_outbound).await;
                        None
                    }
                }
            }
        }));
    }

    {
        let refdata = ctx.refdata.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let doc_outbound = q_doc_tx.clone();
        let ctx1 = ctx.clone();
        tokio::spawn(dispatcher::run_stage("cryptonym", q_crypto_rx, Some(q_location_tx), active.clone(), ctx.cancel.clone(), move |page: PendingPage| {
            let refdata = refdata.clone();
            let cancel = ctx1.cancel.clone();
            let record_info = record_info.clone();
            let aggregator = aggregator.clone();
            let doc_outbound = doc_outbound.clone();
            async move {
                let record_identifier = page.record_identifier.clone();
                match stages::cryptonym::process(page, &refdata, &cancel).await {
                    Ok(page) => Some(page),
                    Err(PipelineError::Cancellation) => None,
                    Err(e) => {
                        record_stage_failure("cryptonym", &record_identifier, &e, &record_info, &aggregator, &doc_outbound).await;
                        None
                    }
                }
            }
        }));
    }

    {
        let refdata = ctx.refdata.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let doc_outbound = q_doc_tx.clone();
        let ctx1 = ctx.clone();
        tokio::spawn(dispatcher::run_stage("location", q_location_rx, Some(q_gematria_tx), active.clone(), ctx.cancel.clone(), move |page: PendingPage| {
            let refdata = refdata.clone();
            let cancel = ctx1.cancel.clone();
            let record_info = record_info.clone();
            let aggregator = aggregator.clone();
            let doc_outbound = doc_outbound.clone();
            async move {
                let record_identifier = page.record_identifier.clone();
                match stages::location::process(page, &refdata, &cancel).await {
                    Ok(page) => Some(page),
                    Err(PipelineError::Cancellation) => None,
                    Err(e) => {
                        record_stage_failure("location", &record_identifier, &e, &record_info, &aggregator, &doc_outbound).await;
                        None
                    }
                }
            }
        }));
    }

    {
        let refdata = ctx.refdata.clone();
        let ctx1 = ctx.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let doc_outbound = q_doc_tx.clone();
        tokio::spawn(dispatcher::run_stage("gematria", q_gematria_rx, Some(q_index_tx), active.clone(), ctx.cancel.clone(), move |page: PendingPage| {
            let refdata = refdata.clone();
            let cancel = ctx1.cancel.clone();
            let record_info = record_info.clone();
            let aggregator = aggregator.clone();
            let doc_outbound = doc_outbound.clone();
            async move {
                let record_identifier = page.record_identifier.clone();
                match stages::gematria::process(page, &refdata, &cancel).await {
                    Ok(page) => Some(page),
                    Err(PipelineError::Cancellation) => None,
                    Err(e) => {
                        record_stage_failure("gematria", &record_identifier, &e, &record_info, &aggregator, &doc_outbound).await;
                        None
                    }
                }
            }
        }));
    }

    // Stage 13 + 14 share a loop: word-index persists, then the aggregator
    // decides whether a Document is ready.
    {
        let ctx = ctx.clone();
        let active = active.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();
        let q_doc_tx = q_doc_tx.clone();
        tokio::spawn(run_index_and_aggregate_stage(q_index_rx, q_doc_tx, ctx, active, record_info, aggregator));
    }

    // Ingestion starts only now, after every dispatcher above is already
    // spawned and polling. `ingest_stream` reads rows and fetches/hashes
    // them concurrently (bounded by the download/shafile limiters), so
    // rows keep streaming in while earlier ones are already moving through
    // the stages rather than waiting for the whole spreadsheet to finish.
    let record_rx = ingestor.ingest_stream(file, buffer, ctx.cancel.clone());
    seed_records(record_rx, &ctx, &record_info, &q_validate_tx).await;
    q_validate_tx.close();

    active.wait_until_zero().await;

    q_extract_tx.close();
    q_split_tx.close();
    q_rasterize_tx.close();
    q_light_tx.close();
    q_dark_tx.close();
    q_ocr_tx.close();
    q_jpeg_tx.close();
    q_dates_tx.close();
    q_crypto_tx.close();
    q_location_tx.close();
    q_gematria_tx.close();
    q_index_tx.close();
    q_doc_tx.close();

    let mut documents = Vec::new();
    while let Some(doc) = q_doc_rx.recv().await {
        info!(id = %doc.identifier, total_pages = doc.total_pages, "document finalized");
        documents.push(doc);
    }
    documents
}

/// Drains records off the ingestion channel as they stream in, recording
/// their bookkeeping and forwarding each onto the first queue. Parallel row
/// ingestion (download+hash per row) happens upstream in `ingest::Ingestor`;
/// this just seeds the topology as each row finishes.
async fn seed_records(
    mut records: mpsc::Receiver<Record>,
    ctx: &Arc<PipelineContext>,
    record_info: &RwLock<HashMap<String, RecordInfo>>,
    q_validate_tx: &QueueSender<Record>,
) {
    loop {
        let record = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            item = records.recv() => item,
        };
        let Some(record) = record else { break };

        record_info.write().await.insert(
            record.identifier.clone(),
            RecordInfo {
                total_pages: record.total_pages,
                source_url: record.source_url.clone(),
                collection: record.metadata.get("collection").cloned(),
            },
        );
        if q_validate_tx.send(record).await.is_err() {
            break;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_split_stage(
    mut inbound: crate::concurrency::QueueReceiver<Record>,
    outbound: crate::concurrency::QueueSender<PendingPage>,
    doc_outbound: crate::concurrency::QueueSender<Document>,
    ctx: Arc<PipelineContext>,
    active: Arc<ActiveCounter>,
    ids: Arc<IdentifierAllocator>,
    record_info: Arc<RwLock<HashMap<String, RecordInfo>>>,
    aggregator: Arc<Aggregator>,
) {
    loop {
        let record = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            item = inbound.recv() => item,
        };
        let Some(record) = record else { break };

        active.increment();
        let ctx = ctx.clone();
        let outbound = outbound.clone();
        let doc_outbound = doc_outbound.clone();
        let active = active.clone();
        let ids = ids.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();

        tokio::spawn(async move {
            let cancel = ctx.cancel.clone();
            let id = record.identifier.clone();
            match stages::split_pages::process(&record, &ctx, &ids, &cancel).await {
                Ok(pages) if pages.is_empty() => {
                    let info = record_info.read().await.get(&id).cloned();
                    let (source_url, collection) = info
                        .map(|i| (i.source_url, i.collection))
                        .unwrap_or((record.source_url.clone(), None));
                    let doc = aggregator.submit_empty(&id, &source_url, collection);
                    let _ = doc_outbound.send(doc).await;
                }
                Ok(pages) => {
                    for page in pages {
                        if outbound.send(page).await.is_err() {
                            break;
                        }
                    }
                }
                Err(e) if matches!(e, PipelineError::Cancellation) => {}
                Err(e) => {
                    record_stage_failure("split_pages", &id, &e, &record_info, &aggregator, &doc_outbound).await;
                }
            }
            active.decrement();
        });
    }
}

async fn run_index_and_aggregate_stage(
    mut inbound: crate::concurrency::QueueReceiver<PendingPage>,
    doc_outbound: crate::concurrency::QueueSender<Document>,
    ctx: Arc<PipelineContext>,
    active: Arc<ActiveCounter>,
    record_info: Arc<RwLock<HashMap<String, RecordInfo>>>,
    aggregator: Arc<Aggregator>,
) {
    loop {
        let page = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            item = inbound.recv() => item,
        };
        let Some(page) = page else { break };

        active.increment();
        let ctx = ctx.clone();
        let doc_outbound = doc_outbound.clone();
        let active = active.clone();
        let record_info = record_info.clone();
        let aggregator = aggregator.clone();

        tokio::spawn(async move {
            let cancel = ctx.cancel.clone();
            let refdata = ctx.refdata.clone();
            let record_identifier = page.record_identifier.clone();
            let info = record_info.read().await.get(&record_identifier).cloned();
            let (total_pages, source_url, collection) = match info {
                Some(i) => (i.total_pages, i.source_url, i.collection),
                None => (0, String::new(), None),
            };

            match stages::word_index::process(page, &refdata, &cancel).await {
                Ok(page) => {
                    if let Some(doc) = aggregator.submit_page(page, total_pages, &source_url, collection) {
                        let _ = doc_outbound.send(doc).await;
                    }
                }
                Err(PipelineError::Cancellation) => {}
                Err(e) => {
                    record_stage_failure("word_index", &record_identifier, &e, &record_info, &aggregator, &doc_outbound).await;
                }
            }
            active.decrement();
        });
    }
}
