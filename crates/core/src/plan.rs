//! Service plan files.
//!
//! One request per line, `hymn_number|section_label|title_hint`:
//!
//! ```text
//! # Language: English
//! # Date: 8 Feb 2026
//! 91|Opening|
//! 236|Thanksgiving|Now thank we all our God
//! Message
//! 313|Communion|
//! ```

use crate::section::SectionLabel;
use crate::signals::canonical_number;
use crate::Result;
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Accepted spellings of the `# Date:` directive.
const DATE_FORMATS: &[&str] = &[
    "%d %b %Y", "%d %B %Y", "%d-%b-%Y", "%d-%B-%Y", "%d/%m/%Y", "%d-%m-%Y",
];

/// How service dates are printed on generated slides.
pub const SERVICE_DATE_FORMAT: &str = "%d %B %Y";

/// One line of a service plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSongRequest {
    pub hymn_number: Option<String>,
    pub section_label: SectionLabel,
    pub title_hint: Option<String>,
}

impl ServiceSongRequest {
    pub fn new(hymn_number: Option<&str>, section_label: SectionLabel, title_hint: Option<&str>) -> Self {
        let clean = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        Self {
            hymn_number: clean(hymn_number),
            section_label,
            title_hint: clean(title_hint),
        }
    }

    /// The sectionless sermon marker.
    pub fn message() -> Self {
        Self::new(None, SectionLabel::Message, None)
    }

    pub fn is_message(&self) -> bool {
        self.section_label == SectionLabel::Message
    }

    /// Parse one request line. `None` for lines that are not requests,
    /// including a hymn field that is not a 1-4 digit number.
    pub fn parse_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() >= 2 {
            let label = parts[1].trim();
            if label.is_empty() {
                return None;
            }
            let number = plan_number(parts[0])?;
            return Some(Self::new(
                number.as_deref(),
                SectionLabel::parse(label),
                parts.get(2).copied(),
            ));
        }
        parts[0]
            .trim()
            .eq_ignore_ascii_case("message")
            .then(Self::message)
    }
}

/// Hymn field of a request line, leading zeros stripped. `Some(None)` when
/// blank, `None` when malformed.
fn plan_number(field: &str) -> Option<Option<String>> {
    let field = field.trim();
    if field.is_empty() {
        return Some(None);
    }
    if field.len() > 4 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    canonical_number(field).map(Some)
}

/// A parsed plan file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePlan {
    /// From `# Language:`; selects the script profile.
    pub language: Option<String>,

    /// From `# Date:`, normalised when it parses.
    pub service_date: Option<String>,

    pub requests: Vec<ServiceSongRequest>,

    /// Lines that were skipped, with their 1-based line numbers.
    pub warnings: Vec<String>,
}

impl ServicePlan {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        info!("Reading songs from: {}", path.display());
        Ok(Self::parse(&text))
    }

    /// Parse plan text. Never fails; malformed lines land in `warnings`.
    pub fn parse(text: &str) -> Self {
        let mut plan = Self::default();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(value) = directive(line, "language") {
                info!("Language set to: {value}");
                plan.language = Some(value.to_string());
                continue;
            }
            if let Some(value) = directive(line, "date") {
                let date = normalize_service_date(value);
                info!("Service date set to: {date}");
                plan.service_date = Some(date).filter(|d| !d.is_empty());
                continue;
            }
            if line.starts_with('#') {
                continue;
            }

            match ServiceSongRequest::parse_line(line) {
                Some(request) => plan.requests.push(request),
                None => {
                    let message = format!("line {}: not a request: {line}", index + 1);
                    warn!("Skipping plan {message}");
                    plan.warnings.push(message);
                }
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Value of `# Name: value` (or bare `date: value`), name matched case-insensitively.
fn directive<'l>(line: &'l str, name: &str) -> Option<&'l str> {
    let body = match line.strip_prefix('#') {
        Some(rest) => rest.trim_start(),
        None if name == "date" => line,
        None => return None,
    };
    let (key, value) = body.split_once(':')?;
    key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
}

/// Reformat a date in any accepted spelling as `08 February 2026`.
///
/// Text that matches no format is returned trimmed but otherwise unchanged.
pub fn normalize_service_date(text: &str) -> String {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(|date| date.format(SERVICE_DATE_FORMAT).to_string())
        .unwrap_or_else(|| text.to_string())
}
