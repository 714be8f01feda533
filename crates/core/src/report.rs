//! Hymn extraction report.
//!
//! Collects the runs found across the library into rows and orders them two
//! ways: by hymn number, and by the service date in the file name.

use crate::compendium::CompendiumTitles;
use crate::segment::HymnRun;
use crate::Result;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Longest text kept in a report cell.
const MAX_CELL_CHARS: usize = 200;

static SPACED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]{1,2})\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+([0-9]{4})")
        .unwrap()
});

static COMPACT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]{1,2})\s*(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s*([0-9]{4})")
        .unwrap()
});

static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2})[\-_]([0-9]{1,2})[\-_]([0-9]{2,4})").unwrap());

/// One hymn occurrence in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub hymn_number: Option<String>,
    pub title: String,
    pub file_name: String,
    pub first_slide: Option<usize>,
    pub content_slides: usize,
}

impl ReportRow {
    pub fn from_run(run: &HymnRun) -> Self {
        Self {
            hymn_number: run.hymn_number.clone(),
            title: clean_report_text(run.title.as_deref().unwrap_or_default()),
            file_name: clean_report_text(&run.source_file),
            first_slide: run.content_slide_indices.first().copied(),
            content_slides: run.total_slide_count(),
        }
    }

    /// Number as an integer for ordering; unnumbered rows sort last.
    fn number_key(&self) -> u32 {
        self.hymn_number
            .as_deref()
            .and_then(|n| n.parse().ok())
            .unwrap_or(u32::MAX)
    }
}

/// Rows for every entry of the compendium title table.
pub fn compendium_rows(titles: &CompendiumTitles, file_name: &str) -> Vec<ReportRow> {
    titles
        .iter()
        .map(|(number, title)| ReportRow {
            hymn_number: Some(number.to_string()),
            title: clean_report_text(title),
            file_name: file_name.to_string(),
            first_slide: None,
            content_slides: 0,
        })
        .collect()
}

/// The report with both orderings and a few totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HymnReport {
    pub files_analyzed: usize,
    pub total_entries: usize,
    pub unique_numbers: usize,
    /// Lowest and highest hymn number seen.
    pub number_range: Option<(u32, u32)>,
    pub by_number: Vec<ReportRow>,
    pub by_date: Vec<ReportRow>,
}

impl HymnReport {
    pub fn build(rows: Vec<ReportRow>, files_analyzed: usize) -> Self {
        let numbers: BTreeSet<u32> = rows
            .iter()
            .filter_map(|r| r.hymn_number.as_deref())
            .filter_map(|n| n.parse().ok())
            .collect();
        let number_range = numbers.first().zip(numbers.last()).map(|(a, b)| (*a, *b));

        let mut by_number = rows.clone();
        by_number.sort_by(|a, b| {
            let title_a = if a.hymn_number.is_none() { a.title.as_str() } else { "" };
            let title_b = if b.hymn_number.is_none() { b.title.as_str() } else { "" };
            a.number_key()
                .cmp(&b.number_key())
                .then_with(|| title_a.cmp(title_b))
        });

        let mut by_date = rows;
        by_date.sort_by_cached_key(|r| (date_from_filename(&r.file_name), r.number_key()));

        Self {
            files_analyzed,
            total_entries: by_number.len(),
            unique_numbers: numbers.len(),
            number_range,
            by_number,
            by_date,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::Error::Write(e.to_string()))
    }
}

/// Service date printed in a file name; undated files get 1900-01-01.
///
/// Understands "8 Feb 2026", "[13 Oct 2024] Eng HCS", "25 Dec2024_HCS",
/// "24Aug 2025" and "HCS 23-02-25".
pub fn date_from_filename(file_name: &str) -> NaiveDate {
    let name = file_name.trim_end_matches(".pptx");
    let name = name.trim_matches(|c| c == '[' || c == ']');

    for pattern in [&*SPACED_DATE, &*COMPACT_DATE] {
        if let Some(caps) = pattern.captures(name) {
            let text = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
            if let Ok(date) = NaiveDate::parse_from_str(&text, "%d %b %Y") {
                return date;
            }
        }
    }

    if let Some(caps) = NUMERIC_DATE.captures(name) {
        let year = if caps[3].len() == 2 {
            format!("20{}", &caps[3])
        } else {
            caps[3].to_string()
        };
        let text = format!("{}-{}-{year}", &caps[1], &caps[2]);
        if let Ok(date) = NaiveDate::parse_from_str(&text, "%d-%m-%Y") {
            return date;
        }
    }

    undated()
}

fn undated() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Drop control characters (except tab and line breaks) and cap the length.
pub fn clean_report_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|&c| c >= ' ' || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    if cleaned.chars().count() > MAX_CELL_CHARS {
        let cut: String = cleaned.chars().take(MAX_CELL_CHARS).collect();
        format!("{cut}...")
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(number: Option<&str>, title: &str, file: &str) -> ReportRow {
        ReportRow {
            hymn_number: number.map(String::from),
            title: title.to_string(),
            file_name: file.to_string(),
            first_slide: Some(1),
            content_slides: 3,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_filename_dates() {
        assert_eq!(date_from_filename("8 Feb 2026.pptx"), ymd(2026, 2, 8));
        assert_eq!(date_from_filename("[13 Oct 2024] Eng HCS.pptx"), ymd(2024, 10, 13));
        assert_eq!(date_from_filename("23 March 2025 Eng HCS.pptx"), ymd(2025, 3, 23));
        assert_eq!(date_from_filename("25 Dec2024_HCS.pptx"), ymd(2024, 12, 25));
        assert_eq!(date_from_filename("24Aug 2025 Eng HCS.pptx"), ymd(2025, 8, 24));
        assert_eq!(date_from_filename("HCS 23-02-25.pptx"), ymd(2025, 2, 23));
        assert_eq!(date_from_filename("17th Apr.pptx"), ymd(1900, 1, 1));
    }

    #[test]
    fn test_orderings() {
        let report = HymnReport::build(
            vec![
                row(Some("313"), "Here O my Lord", "8 Feb 2026.pptx"),
                row(None, "Bread of heaven", "12 Jan 2025.pptx"),
                row(Some("91"), "Praise to the Lord", "12 Jan 2025.pptx"),
                row(None, "Abide with me", "notes.pptx"),
            ],
            3,
        );

        let numbers: Vec<&str> = report.by_number.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(numbers, vec!["Praise to the Lord", "Here O my Lord", "Abide with me", "Bread of heaven"]);

        let dates: Vec<&str> = report.by_date.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(dates, vec!["Abide with me", "Praise to the Lord", "Bread of heaven", "Here O my Lord"]);

        assert_eq!(report.unique_numbers, 2);
        assert_eq!(report.number_range, Some((91, 313)));
        assert_eq!(report.total_entries, 4);
    }

    #[test]
    fn test_compendium_rows() {
        let titles = CompendiumTitles::from_json_str(r#"{"2": "Yeshu nallavan", "10": "Sthothram"}"#).unwrap();
        let rows = compendium_rows(&titles, "KK.pptx");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hymn_number.as_deref(), Some("2"));
        assert_eq!(rows[1].content_slides, 0);
    }

    #[test]
    fn test_clean_report_text() {
        assert_eq!(clean_report_text("Abide\u{b}with\tme\0"), "Abidewith\tme");
        let long = clean_report_text(&"a".repeat(250));
        assert_eq!(long.chars().count(), 203);
        assert!(long.ends_with("..."));
    }

    #[test]
    fn test_json_has_both_views() {
        let report = HymnReport::build(vec![row(Some("1"), "x", "a.pptx")], 1);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"by_number\""));
        assert!(json.contains("\"by_date\""));
    }
}
