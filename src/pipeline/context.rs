//! Everything a stage worker needs, built once at startup and shared via
//! `Arc`. Replaces the source's process-wide globals with an explicitly
//! constructed collaborator (§9 of the design notes).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::concurrency::Limiter;
use crate::config::Config;
use crate::ids::IdentifierAllocator;
use crate::refdata::ReferenceData;

pub struct Limiters {
    pub tesseract: Limiter,
    pub download: Limiter,
    pub pdfcpu: Limiter,
    pub gs: Limiter,
    pub pdftotext: Limiter,
    pub convert: Limiter,
    pub pdftoppm: Limiter,
    pub png2jpg: Limiter,
    pub resize: Limiter,
    pub shafile: Limiter,
    pub darkimage: Limiter,
    pub filedata: Limiter,
    pub wjsonfile: Limiter,
}

impl Limiters {
    pub fn from_config(config: &crate::config::LimiterConfig) -> Self {
        Self {
            tesseract: Limiter::new("tesseract", config.tesseract),
            download: Limiter::new("download", config.download),
            pdfcpu: Limiter::new("pdfcpu", config.pdfcpu),
            gs: Limiter::new("gs", config.gs),
            pdftotext: Limiter::new("pdftotext", config.pdftotext),
            convert: Limiter::new("convert", config.convert),
            pdftoppm: Limiter::new("pdftoppm", config.pdftoppm),
            png2jpg: Limiter::new("png2jpg", config.png2jpg),
            resize: Limiter::new("resize", config.resize),
            shafile: Limiter::new("shafile", config.shafile),
            darkimage: Limiter::new("darkimage", config.darkimage),
            filedata: Limiter::new("filedata", config.filedata),
            wjsonfile: Limiter::new("wjsonfile", config.wjsonfile),
        }
    }
}

pub struct PipelineContext {
    pub config: Config,
    pub limiters: Limiters,
    pub refdata: Arc<ReferenceData>,
    pub ids: Arc<IdentifierAllocator>,
    pub cancel: CancellationToken,
}

impl PipelineContext {
    pub fn new(config: Config) -> Self {
        let limiters = Limiters::from_config(&config.limiters);
        Self {
            config,
            limiters,
            refdata: Arc::new(ReferenceData::empty()),
            ids: Arc::new(IdentifierAllocator::new()),
            cancel: CancellationToken::new(),
        }
    }
}
