//! Manifest reads/writes: JSON with 4-space indentation, truncate-and-write.

use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::PipelineError;

pub fn write_manifest<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(
        &mut buf,
        serde_json::ser::PrettyFormatter::with_indent(b"    "),
    );
    value
        .serialize(&mut ser)
        .map_err(|e| PipelineError::DataValidation(format!("serializing {path:?}: {e}")))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, buf)?;
    Ok(())
}

pub fn read_manifest<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let contents = std::fs::read(path)?;
    serde_json::from_slice(&contents)
        .map_err(|e| PipelineError::DataValidation(format!("parsing {path:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        a: u32,
        b: String,
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        let value = Sample { a: 7, b: "x".into() };
        write_manifest(&path, &value).unwrap();
        let read: Sample = read_manifest(&path).unwrap();
        assert_eq!(value, read);
    }

    #[test]
    fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        write_manifest(&path, &Sample { a: 1, b: "aaaaaaaaaa".into() }).unwrap();
        write_manifest(&path, &Sample { a: 2, b: "b".into() }).unwrap();
        let read: Sample = read_manifest(&path).unwrap();
        assert_eq!(read, Sample { a: 2, b: "b".into() });
    }
}
