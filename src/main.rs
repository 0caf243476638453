use std::path::PathBuf;

use clap::Parser;
use dossier_forge::config::Config;
use dossier_forge::{lifecycle, logging};

/// Turn a spreadsheet of PDF records into per-page OCR'd, analyzed,
/// rasterized records.
#[derive(Debug, Parser)]
#[command(name = "dossier-forge", version, about)]
struct Cli {
    /// Optional TOML/YAML config file; CLI flags override its values.
    #[arg(long, env = "DOSSIER_FORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Spreadsheet (csv/tsv/xlsx) of records to ingest.
    #[arg(long, env = "DOSSIER_FORGE_FILE")]
    file: Option<PathBuf>,

    /// Output data directory.
    #[arg(long, env = "DOSSIER_FORGE_DIR")]
    dir: Option<PathBuf>,

    /// Queue capacity between stages.
    #[arg(long)]
    limit: Option<usize>,

    /// Buffered-reader size, in bytes, for the spreadsheet and downloads.
    #[arg(long)]
    buffer: Option<usize>,

    /// JPEG encode quality, 1-100.
    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// Emit progressive JPEGs (currently always baseline; see module docs).
    #[arg(long)]
    progressive: Option<bool>,

    /// Log to this file instead of stderr.
    #[arg(long, env = "DOSSIER_FORGE_LOG")]
    log: Option<PathBuf>,

    /// Base URL to resolve bare filenames against, when a row has no URL column.
    #[arg(long)]
    pdf_url_base: Option<String>,

    /// JSON file mapping cryptonym -> real name, scanned for in OCR text.
    #[arg(long)]
    cryptonyms: Option<PathBuf>,

    /// Pipe-delimited `kind|name` file of city/state/country tokens.
    #[arg(long)]
    locations: Option<PathBuf>,

    /// Directory of per-language word-list files for gematria scoring.
    #[arg(long)]
    dictionaries: Option<PathBuf>,

    #[arg(long)]
    tesseract_limit: Option<usize>,
    #[arg(long)]
    download_limit: Option<usize>,
    #[arg(long)]
    pdfcpu_limit: Option<usize>,
    #[arg(long)]
    gs_limit: Option<usize>,
    #[arg(long)]
    pdftotext_limit: Option<usize>,
    #[arg(long)]
    convert_limit: Option<usize>,
    #[arg(long)]
    pdftoppm_limit: Option<usize>,
    #[arg(long)]
    png2jpg_limit: Option<usize>,
    #[arg(long)]
    resize_limit: Option<usize>,
    #[arg(long)]
    shafile_limit: Option<usize>,
    #[arg(long)]
    darkimage_limit: Option<usize>,
    #[arg(long)]
    filedata_limit: Option<usize>,
    #[arg(long)]
    wjsonfile_limit: Option<usize>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_file(path)?,
            None => Config::default(),
        };

        if let Some(file) = self.file {
            config.file = file;
        }
        if let Some(dir) = self.dir {
            config.dir = dir;
        }
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if let Some(buffer) = self.buffer {
            config.buffer = buffer;
        }
        if let Some(q) = self.jpeg_quality {
            config.jpeg_quality = q;
        }
        if let Some(p) = self.progressive {
            config.progressive = p;
        }
        if self.log.is_some() {
            config.log = self.log;
        }
        if self.pdf_url_base.is_some() {
            config.pdf_url_base = self.pdf_url_base;
        }
        if self.cryptonyms.is_some() {
            config.cryptonyms_path = self.cryptonyms;
        }
        if self.locations.is_some() {
            config.locations_path = self.locations;
        }
        if self.dictionaries.is_some() {
            config.dictionaries_dir = self.dictionaries;
        }

        let limiters = &mut config.limiters;
        if let Some(v) = self.tesseract_limit {
            limiters.tesseract = v;
        }
        if let Some(v) = self.download_limit {
            limiters.download = v;
        }
        if let Some(v) = self.pdfcpu_limit {
            limiters.pdfcpu = v;
        }
        if let Some(v) = self.gs_limit {
            limiters.gs = v;
        }
        if let Some(v) = self.pdftotext_limit {
            limiters.pdftotext = v;
        }
        if let Some(v) = self.convert_limit {
            limiters.convert = v;
        }
        if let Some(v) = self.pdftoppm_limit {
            limiters.pdftoppm = v;
        }
        if let Some(v) = self.png2jpg_limit {
            limiters.png2jpg = v;
        }
        if let Some(v) = self.resize_limit {
            limiters.resize = v;
        }
        if let Some(v) = self.shafile_limit {
            limiters.shafile = v;
        }
        if let Some(v) = self.darkimage_limit {
            limiters.darkimage = v;
        }
        if let Some(v) = self.filedata_limit {
            limiters.filedata = v;
        }
        if let Some(v) = self.wjsonfile_limit {
            limiters.wjsonfile = v;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = cli.into_config()?;

    logging::init(config.log.as_deref())?;

    lifecycle::run(config).await?;
    Ok(())
}
