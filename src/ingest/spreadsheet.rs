//! Spreadsheet row reading: pipe-delimited files and workbook files (first
//! sheet, row 1 headers). Yields header-normalized field maps; the actual
//! Record construction lives in [`super::ingest_rows`].

use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Reader};

use super::header::reconcile_row;
use crate::error::PipelineError;

pub fn read_rows(path: &Path, buffer_size: usize) -> Result<Vec<HashMap<String, String>>, PipelineError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xlsx") | Some("xls") | Some("xlsb") | Some("ods") => read_workbook(path),
        _ => read_delimited(path, buffer_size),
    }
}

fn read_delimited(path: &Path, buffer_size: usize) -> Result<Vec<HashMap<String, String>>, PipelineError> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::with_capacity(buffer_size.max(1), file);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| PipelineError::DataValidation(format!("reading header row: {e}")))?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| PipelineError::DataValidation(format!("reading row: {e}")))?;
        let values: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        rows.push(reconcile_row(&headers, &values));
    }
    Ok(rows)
}

fn read_workbook(path: &Path) -> Result<Vec<HashMap<String, String>>, PipelineError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| PipelineError::DataValidation(format!("opening workbook {path:?}: {e}")))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| PipelineError::DataValidation("workbook has no sheets".into()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| PipelineError::DataValidation(format!("reading sheet {sheet_name}: {e}")))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(row) => row.iter().map(|cell| cell.to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for row in rows_iter {
        let values: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
        rows.push(reconcile_row(&headers, &values));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_pipe_delimited_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "filename|title\ndoc.pdf|A Title\n").unwrap();
        let rows = read_rows(&path, 1024).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("filename"), Some(&"doc.pdf".to_string()));
    }

    #[test]
    fn tolerates_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "filename|title\ndoc.pdf|A Title|extra\n").unwrap();
        let rows = read_rows(&path, 1024).unwrap();
        assert_eq!(rows[0].get("filename"), Some(&"doc.pdf".to_string()));
    }
}
