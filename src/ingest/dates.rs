//! Permissive metadata-date parsing for ingestion, trying a fixed ordered
//! list of formats. Unparseable strings are simply `None` — a `DataValidation`
//! case that's logged, not fatal.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const FORMATS: &[&str] = &["%m-%d-%y", "%m/%d/%Y", "%m-%d-%Y"];

pub fn parse_permissive(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            let naive: NaiveDateTime = date.and_hms_opt(0, 0, 0)?;
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_supported_format() {
        assert!(parse_permissive("01-02-06").is_some());
        assert!(parse_permissive("01/02/2006").is_some());
        assert!(parse_permissive("01-02-2006").is_some());
        assert!(parse_permissive("2006-01-02T15:04:05-07:00").is_some());
    }

    #[test]
    fn unparseable_dates_are_elided_not_fatal() {
        assert_eq!(parse_permissive("not a date"), None);
        assert_eq!(parse_permissive(""), None);
    }
}
