//! Header-synonym normalization across the several corpora this pipeline
//! has historically ingested, each with its own spreadsheet column names.

use std::collections::HashMap;

/// Canonical field name → every header spelling observed in the wild that
/// should map to it.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("filename", &["filename", "File Name"]),
    ("title", &["title", "Title", "File Title"]),
    ("record_number", &["Record Num", "document_number", "Record Number"]),
    ("release_date", &["NARA Release Date", "release_date"]),
    ("creation_date", &["Doc Date", "creation_date", "Document Date"]),
    ("total_pages", &["Num Pages", "page_count", "Original Document Pages"]),
    ("pdf_url", &["pdf_url"]),
    ("source_url", &["source_url"]),
    ("agency", &["Agency"]),
    ("to_name", &["To Name", "To"]),
    ("from_name", &["From Name", "From"]),
    ("collection", &["collection", "Record Series"]),
    ("comments", &["Comments"]),
];

/// Build a lookup from a row's actual header spelling to the canonical
/// field name, for the headers that were actually present in this row.
pub fn normalize(headers: &[String]) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for header in headers {
        for (canonical, spellings) in SYNONYMS {
            if spellings.iter().any(|s| s.eq_ignore_ascii_case(header)) {
                out.insert(header.clone(), (*canonical).to_string());
                break;
            }
        }
    }
    out
}

/// Reconcile a row's values against its header row when their lengths
/// disagree, matching `ProcessRow`'s leniency in the source: if there are
/// fewer headers than values, map by index and skip blank values; otherwise
/// map headers to whatever values are actually present.
pub fn reconcile_row(headers: &[String], row: &[String]) -> HashMap<String, String> {
    let canonical = normalize(headers);
    let mut fields = HashMap::new();

    if headers.len() < row.len() {
        for (idx, value) in row.iter().enumerate() {
            if value.trim().is_empty() {
                continue;
            }
            if let Some(header) = headers.get(idx) {
                let key = canonical.get(header).cloned().unwrap_or_else(|| header.clone());
                fields.insert(key, value.clone());
            }
        }
    } else {
        for (header, value) in headers.iter().zip(row.iter()) {
            let key = canonical.get(header).cloned().unwrap_or_else(|| header.clone());
            fields.insert(key, value.clone());
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_synonyms_to_canonical_names() {
        let headers = vec!["File Name".to_string(), "Record Number".to_string()];
        let canonical = normalize(&headers);
        assert_eq!(canonical.get("File Name"), Some(&"filename".to_string()));
        assert_eq!(canonical.get("Record Number"), Some(&"record_number".to_string()));
    }

    #[test]
    fn reconcile_tolerates_extra_trailing_values() {
        let headers = vec!["filename".to_string()];
        let row = vec!["doc.pdf".to_string(), "extra".to_string(), String::new()];
        let fields = reconcile_row(&headers, &row);
        assert_eq!(fields.get("filename"), Some(&"doc.pdf".to_string()));
    }

    #[test]
    fn reconcile_handles_missing_trailing_values() {
        let headers = vec!["filename".to_string(), "title".to_string()];
        let row = vec!["doc.pdf".to_string()];
        let fields = reconcile_row(&headers, &row);
        assert_eq!(fields.get("filename"), Some(&"doc.pdf".to_string()));
        assert_eq!(fields.get("title"), None);
    }
}
