//! Core data types that flow through the pipeline: [`Record`], [`PendingPage`],
//! and [`Document`], plus the value types analysis stages attach to a page.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One size/shade variant of a rasterized page image.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSizes {
    pub original: Option<PathBuf>,
    pub large: Option<PathBuf>,
    pub medium: Option<PathBuf>,
    pub small: Option<PathBuf>,
    pub social: Option<PathBuf>,
}

/// Light/dark pair of [`ImageSizes`] for one encoding (PNG or JPEG).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageFamily {
    pub light: ImageSizes,
    pub dark: ImageSizes,
}

/// A geographic hit from the location-scan stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub token: String,
    pub kind: LocationKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    City,
    State,
    Country,
}

/// The three classical per-word gematria values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GemScore {
    pub jewish: u32,
    pub english: u32,
    pub simple: u32,
}

/// One dictionary-matched word and its scores, within a single language bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordResult {
    pub word: String,
    pub score: GemScore,
}

/// Per-language bucket of gematria-scored words; the page keeps the winning
/// language's analysis after stage 12 (gematria/language) runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GemAnalysis {
    pub language: String,
    pub words: Vec<WordResult>,
}

/// The state a [`PendingPage`] has most recently completed. Strictly
/// monotonic — a page never revisits a state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum PageState {
    Created,
    Rasterized,
    ThumbedLight,
    ThumbedDark,
    Ocred,
    Jpeg,
    Dated,
    CryptoScanned,
    Located,
    GematriaScored,
    Indexed,
    Aggregated,
}

/// One source document's row, created once at ingestion.
///
/// Immutable after creation except for `pdf_sha512`, which is filled in once
/// the download completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub identifier: String,
    pub source_url: String,
    pub pdf_path: PathBuf,
    pub pdf_sha512: Option<String>,
    pub extracted_text_path: PathBuf,
    /// Full-document OCR text path. Carried for filesystem-layout fidelity;
    /// no stage ever writes to it.
    pub legacy_ocr_text_path: PathBuf,
    pub data_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub total_pages: u32,
    pub metadata: HashMap<String, String>,
    /// Set when `record.json` already existed on disk at ingestion time —
    /// a resume of a prior run. Not part of the manifest; stage 1 uses it
    /// to skip re-validating a PDF it already normalized.
    #[serde(skip)]
    pub resumed: bool,
}

impl Record {
    pub fn manifest_name() -> &'static str {
        "record.json"
    }
}

/// One PDF page in flight through the pipeline. Owned by exactly one stage
/// worker at a time; mutated in place, then handed to the next stage's
/// queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPage {
    pub identifier: String,
    pub record_identifier: String,
    pub page_number: u32,
    pub pages_dir: PathBuf,
    pub pdf_path: PathBuf,
    pub ocr_text_path: PathBuf,
    pub manifest_path: PathBuf,
    pub state: PageState,

    pub language: Option<String>,
    pub word_results: Vec<WordResult>,
    pub cryptonyms: Vec<String>,
    pub dates: Vec<chrono::DateTime<chrono::Utc>>,
    pub locations: Vec<Location>,
    pub gematria: Vec<GemAnalysis>,

    pub png: ImageFamily,
    pub jpeg: ImageFamily,
}

impl PendingPage {
    pub fn manifest_name(page_number: u32) -> String {
        format!("manifest.{:06}.json", page_number)
    }

    pub fn ocr_text_name(page_number: u32) -> String {
        format!("ocr.{:06}.txt", page_number)
    }
}

/// A finalized document: the union of all of a Record's completed pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub identifier: String,
    pub source_url: String,
    pub total_pages: u32,
    pub cover_page_identifier: Option<String>,
    pub collection: Option<String>,
    pub pages: HashMap<u32, PendingPage>,
}

impl Document {
    pub fn new(identifier: String, source_url: String, total_pages: u32, collection: Option<String>) -> Self {
        Self {
            identifier,
            source_url,
            total_pages,
            cover_page_identifier: None,
            collection,
            pages: HashMap::new(),
        }
    }

    pub fn is_complete(&self, failed: u32) -> bool {
        self.pages.len() as u32 + failed >= self.total_pages
    }
}
