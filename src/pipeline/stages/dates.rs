//! Stage 9: date extraction from OCR text via a union of five patterns —
//! day-month-year, month-day-year, numeric slash dates, and a bare
//! four-digit year fallback (interpreted as June 1st).

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::{Regex, RegexBuilder};
use tracing::info;

use crate::error::PipelineError;
use crate::model::PendingPage;

const MONTH_ALTERNATION: &str = "January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sept|Sep|Oct|Nov|Dec";

static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTH_ALTERNATION})\.?,?\s+(\d{{4}})\b"
    ))
    .case_insensitive(true)
    .build()
    .unwrap()
});

static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(&format!(
        r"\b({MONTH_ALTERNATION})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    ))
    .case_insensitive(true)
    .build()
    .unwrap()
});

static SLASH_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b").unwrap());

static BARE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    Some(match lower.as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    })
}

struct Candidate {
    start: usize,
    end: usize,
    date: NaiveDate,
}

/// Extract every date `extracted_text` contains, normalized to midnight
/// UTC, deduplicated by calendar date, in order of first appearance.
pub fn extract_dates(text: &str) -> Vec<DateTime<Utc>> {
    let mut candidates: Vec<Candidate> = Vec::new();

    for caps in DAY_MONTH_YEAR.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let day: u32 = caps[1].parse().unwrap_or(0);
        let year: i32 = caps[3].parse().unwrap_or(0);
        if let Some(month) = month_number(&caps[2]) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day.max(1)) {
                candidates.push(Candidate { start: m.start(), end: m.end(), date });
            }
        }
    }

    for caps in MONTH_DAY_YEAR.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let day: u32 = caps[2].parse().unwrap_or(0);
        let year: i32 = caps[3].parse().unwrap_or(0);
        if let Some(month) = month_number(&caps[1]) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day.max(1)) {
                candidates.push(Candidate { start: m.start(), end: m.end(), date });
            }
        }
    }

    for caps in SLASH_DATE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let month: u32 = caps[1].parse().unwrap_or(0);
        let day: u32 = caps[2].parse().unwrap_or(0);
        let mut year: i32 = caps[3].parse().unwrap_or(0);
        if caps[3].len() == 2 {
            year += 2000;
        }
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            candidates.push(Candidate { start: m.start(), end: m.end(), date });
        }
    }

    candidates.sort_by_key(|c| c.start);

    for caps in BARE_YEAR.captures_iter(text) {
        let m = caps.get(0).unwrap();
        if candidates.iter().any(|c| m.start() < c.end && c.start < m.end()) {
            continue;
        }
        let year: i32 = caps[1].parse().unwrap_or(0);
        if let Some(date) = NaiveDate::from_ymd_opt(year, 6, 1) {
            candidates.push(Candidate { start: m.start(), end: m.end(), date });
        }
    }

    candidates.sort_by_key(|c| c.start);

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for candidate in candidates {
        if seen.insert(candidate.date) {
            let midnight = candidate.date.and_hms_opt(0, 0, 0).expect("midnight always valid");
            out.push(Utc.from_utc_datetime(&midnight));
        }
    }
    out
}

pub async fn process(mut page: PendingPage) -> Result<PendingPage, PipelineError> {
    let text = std::fs::read_to_string(&page.ocr_text_path).unwrap_or_default();
    page.dates = extract_dates(&text);
    page.state = crate::model::PageState::Dated;
    crate::persistence::write_manifest(&page.manifest_path, &page)?;
    info!(id = %page.identifier, count = page.dates.len(), "dates extracted");
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn scenario_one() {
        let text = "The event was held on 25th June, 2023 and then again on August 3rd, 2023. Save the next date 01/12/2023.";
        let dates = extract_dates(text);
        assert_eq!(dates, vec![ymd(2023, 6, 25), ymd(2023, 8, 3), ymd(2023, 1, 12)]);
    }

    #[test]
    fn scenario_two() {
        let text = "His birthdate is on 14th Feb 2020, and her birthdate is on March 1st, 2019. Their anniversary is on 07/23/2020.";
        let dates = extract_dates(text);
        assert_eq!(dates, vec![ymd(2020, 2, 14), ymd(2019, 3, 1), ymd(2020, 7, 23)]);
    }

    #[test]
    fn scenario_three_dedups_bare_years() {
        let text = "In 1984 and again in 1984.";
        let dates = extract_dates(text);
        assert_eq!(dates, vec![ymd(1984, 6, 1)]);
    }
}
