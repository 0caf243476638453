//! Pipeline configuration: CLI flags layered over an optional config file.
//!
//! The file may be TOML or YAML; format is chosen by extension. Every field
//! also has a CLI flag and a sensible default, so a config file is never
//! required.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FatalStartupError;

/// Per-resource concurrency permit counts, one per named limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub tesseract: usize,
    pub download: usize,
    pub pdfcpu: usize,
    pub gs: usize,
    pub pdftotext: usize,
    pub convert: usize,
    pub pdftoppm: usize,
    pub png2jpg: usize,
    pub resize: usize,
    pub shafile: usize,
    pub watermark: usize,
    pub darkimage: usize,
    pub filedata: usize,
    pub shastring: usize,
    pub wjsonfile: usize,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            tesseract: 1,
            download: 2,
            pdfcpu: 17,
            gs: 17,
            pdftotext: 17,
            convert: 17,
            pdftoppm: 17,
            png2jpg: 17,
            resize: 17,
            shafile: 36,
            watermark: 36,
            darkimage: 36,
            filedata: 369,
            shastring: 369,
            wjsonfile: 369,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub file: PathBuf,
    pub dir: PathBuf,
    pub limit: usize,
    pub buffer: usize,
    pub limiters: LimiterConfig,
    pub jpeg_quality: u8,
    pub progressive: bool,
    pub log: Option<PathBuf>,
    pub pdf_url_base: Option<String>,
    pub cryptonyms_path: Option<PathBuf>,
    pub locations_path: Option<PathBuf>,
    pub dictionaries_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: PathBuf::new(),
            dir: PathBuf::new(),
            limit: 1,
            buffer: 168 * 1024,
            limiters: LimiterConfig::default(),
            jpeg_quality: 71,
            progressive: true,
            log: None,
            pdf_url_base: None,
            cryptonyms_path: None,
            locations_path: None,
            dictionaries_dir: None,
        }
    }
}

impl Config {
    /// Load a config file, TOML or YAML by extension. Unknown extensions
    /// are treated as TOML.
    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {path:?}: {e}"))?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)?,
            _ => toml::from_str(&contents)?,
        };
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FatalStartupError> {
        if self.file.as_os_str().is_empty() {
            return Err(FatalStartupError::MissingFlag("file"));
        }
        if self.dir.as_os_str().is_empty() {
            return Err(FatalStartupError::MissingFlag("dir"));
        }
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)
                .map_err(|e| FatalStartupError::Config(anyhow::anyhow!(e)))?;
        }
        if !self.dir.is_dir() {
            return Err(FatalStartupError::InvalidDataDir(self.dir.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limiters_match_observed_policy() {
        let limiters = LimiterConfig::default();
        assert_eq!(limiters.tesseract, 1);
        assert_eq!(limiters.download, 2);
        assert_eq!(limiters.pdfcpu, 17);
        assert_eq!(limiters.shafile, 36);
        assert_eq!(limiters.filedata, 369);
    }

    #[test]
    fn validate_rejects_empty_required_flags() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(FatalStartupError::MissingFlag("file"))));
    }

    #[test]
    fn load_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "file = \"in.csv\"\ndir = \"/tmp/out\"\n").unwrap();
        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.file, PathBuf::from("in.csv"));
        assert_eq!(config.jpeg_quality, 71);
    }
}
