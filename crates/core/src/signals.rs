//! Text signal extractors.
//!
//! Pure functions that pull a hymn number, a title, a section label or a
//! boundary marker out of noisy slide text. Absence is a normal result and is
//! returned as `None`/`false`, never as an error.
//!
//! Hymn numbers are found by an ordered chain of patterns, most specific first.
//! The chain is plain data ([`number_patterns`]) so each entry can be tested on
//! its own; the order and the small-number and pagination exclusions matter,
//! real decks produce many false positives without them.

use crate::geometry::{is_large_background, is_title_box};
use crate::script::{letters, ScriptProfile};
use crate::section::SectionLabel;
use crate::types::{ExtractedSlide, ShapeKind};
use regex::Regex;
use std::sync::LazyLock;

/// One entry of the hymn number priority chain.
#[derive(Debug)]
pub struct NumberPattern {
    /// Short identifier used in logs and tests.
    pub name: &'static str,

    /// Pattern whose first capture group is the number.
    pub regex: Regex,

    /// Reject numbers below 5; in bare parentheses those are verse or part
    /// markers, not hymn numbers.
    pub reject_small: bool,
}

impl NumberPattern {
    fn new(name: &'static str, pattern: &str, reject_small: bool) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
            reject_small,
        }
    }
}

static NUMBER_PATTERNS: LazyLock<Vec<NumberPattern>> = LazyLock::new(|| {
    vec![
        // "Hymn No 22", "Hymn No. 22", "Hymn No: (22)", "Hymn No – 22"
        NumberPattern::new(
            "hymn_no",
            r"(?i)Hymn\s*No\.?[:\-–]?\s*[\(\[]?([0-9]{1,4})[\)\]]?",
            false,
        ),
        // "Hymn – 171"
        NumberPattern::new("hymn_dash", r"(?i)Hymn\s*[-–]\s*([0-9]{1,4})\b", false),
        // "Song. No: 524"
        NumberPattern::new(
            "song_dot_no",
            r"(?i)Song\.\s*No\.?\s*[:\-–]\s*([0-9]{1,4})",
            false,
        ),
        // "Song No. – 297"
        NumberPattern::new(
            "song_no_dash",
            r"(?i)Song\s*No\.?\s*[-–]\s*([0-9]{1,4})",
            false,
        ),
        // "Song No: 522, v1", "Song no 208"
        NumberPattern::new(
            "song_no",
            r"(?i)Song\s*No\.?\s*[:\-–]?\s*([0-9]{1,4})",
            false,
        ),
        // "Offertory – 896 I Will Sing"
        NumberPattern::new(
            "section_dash",
            r"(?i)(?:Offertory|Confession)\s*[-–]\s*([0-9]{1,4})\b",
            false,
        ),
        // "Holy Communion – Song no. 650"
        NumberPattern::new(
            "communion_dash",
            r"(?i)(?:Holy\s+)?Communion\s*[-–]\s*(?:(?:Song|Hymn)\s+no\.?\s*)?([0-9]{1,4})(?:\s|$)",
            false,
        ),
        // "Holy Communion – And Can It Be (42)"
        NumberPattern::new(
            "communion_title_paren",
            r"(?i)Holy\s+Communion\s*[-–]\s*[^(]*[\(\[]([0-9]{1,4})[\)\]]",
            false,
        ),
        // "Offertory – Song no 12"
        NumberPattern::new(
            "section_song_no",
            r"(?i)(?:Offertory|Confession)\s*[-–]\s*(?:Song\s+no\.?\s*)?([0-9]{1,4})(?:\s|$)",
            false,
        ),
        // "A Christian home (36)"
        NumberPattern::new("parenthetical", r"[\(\[]([0-9]{1,4})[\)\]]", true),
    ]
});

/// The hymn number chain, in evaluation order.
pub fn number_patterns() -> &'static [NumberPattern] {
    &NUMBER_PATTERNS
}

/// "X of Y" pagination as printed in slide footers.
static PAGINATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([0-9]+)\s+of\s+([0-9]+)\b").unwrap());

/// Footer counter like "30 : 31 of 106" or "1:2 of 3".
static FOOTER_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[0-9]+\s*:\s*[0-9]+\s+of\s+[0-9]+").unwrap());

/// Footer line like "B/A: 1 of 2" or "Communion 2: 1 of 7".
static FOOTER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i).+?:\s*[0-9]+\s+of\s+[0-9]+").unwrap());

/// Compendium pagination "– 2 of 5".
static COMPENDIUM_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[-–:]\s*([0-9]+)\s+of\s+([0-9]+)").unwrap());

static FOOTER_HYMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Hymn\s*#?\s*([0-9]+)").unwrap());

static BRACKETED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\(\[]([0-9]{1,3})[\)\]]").unwrap());

static INLINE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Hymn\s+(?:No\.?)?\s*[0-9]+\s*[-–]\s*([A-Za-z][A-Za-z\s]+?)(?:\s*$|\s+[0-9])")
        .unwrap()
});

/// Normalise a captured numeral: strip leading zeros.
pub(crate) fn canonical_number(digits: &str) -> Option<String> {
    digits.parse::<u32>().ok().map(|n| n.to_string())
}

/// A number that belongs to "X of Y" pagination in the same text.
fn is_pagination_number(text: &str, number: &str, start: usize, end: usize) -> bool {
    PAGINATION.captures_iter(text).any(|caps| {
        let Some(whole) = caps.get(0) else {
            return false;
        };
        let overlaps = start < whole.end() && end > whole.start();
        let is_current = caps
            .get(1)
            .and_then(|m| canonical_number(m.as_str()))
            .is_some_and(|x| x == number);
        overlaps || is_current
    })
}

/// A hymn number together with the pattern that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberMatch {
    pub number: String,
    pub pattern: &'static str,
}

/// Run the priority chain over `text`; first accepted match wins.
pub fn match_hymn_number(text: &str) -> Option<NumberMatch> {
    for pattern in number_patterns() {
        for caps in pattern.regex.captures_iter(text) {
            let Some(group) = caps.get(1) else { continue };
            let Some(number) = canonical_number(group.as_str()) else {
                continue;
            };

            if pattern.reject_small && number.parse::<u32>().map_or(true, |n| n < 5) {
                continue;
            }
            if is_pagination_number(text, &number, group.start(), group.end()) {
                continue;
            }

            return Some(NumberMatch {
                number,
                pattern: pattern.name,
            });
        }
    }
    None
}

/// Extract a hymn number from a block of text.
pub fn extract_hymn_number(text: &str) -> Option<String> {
    match_hymn_number(text).map(|m| m.number)
}

/// First hymn number found in any text shape, in shape order.
pub fn slide_hymn_number(slide: &ExtractedSlide) -> Option<String> {
    slide
        .text_shapes()
        .find_map(|shape| extract_hymn_number(shape.text.trim()))
}

/// A bare `(140)` or `[140]`, used to resolve runs opened by a section title.
pub fn extract_bracketed_number(text: &str) -> Option<String> {
    BRACKETED_NUMBER
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| canonical_number(m.as_str()))
}

/// Title written inline after the number: "Hymn 171 - Title".
pub fn extract_inline_title(text: &str) -> Option<String> {
    let caps = INLINE_TITLE.captures(text)?;
    let title = caps.get(1)?.as_str().trim();
    if title.is_empty() {
        return None;
    }
    Some(title.chars().take(30).collect::<String>().trim_end().to_string())
}

/// Remove trailing footer counters like "1:2 of 3 ...".
pub fn strip_footer_counter(text: &str) -> String {
    static TRAILING: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\s*[0-9]+\s*:\s*[0-9]+\s+of\s+[0-9]+.*$").unwrap()
    });
    TRAILING.replace(text, "").into_owned()
}

/// Text is a slide footer counter ("Communion 2: 1 of 7", "30 : 31 of 106").
pub fn is_footer_text(text: &str) -> bool {
    FOOTER_LINE.is_match(text) || FOOTER_COUNTER.is_match(text)
}

/// "N of M" pagination as printed by the compendium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideCounter {
    pub current: usize,
    pub total: usize,
}

pub fn extract_slide_counter(text: &str) -> Option<SlideCounter> {
    let caps = COMPENDIUM_COUNTER.captures(text)?;
    Some(SlideCounter {
        current: caps.get(1)?.as_str().parse().ok()?,
        total: caps.get(2)?.as_str().parse().ok()?,
    })
}

/// Hymn number printed in a compendium footer ("Hymn #143").
pub fn extract_footer_hymn(text: &str) -> Option<String> {
    FOOTER_HYMN
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| canonical_number(m.as_str()))
}

const SECTION_HEADING: &str = r"(?:Offertory|Opening(?:\s+Hymn)?|Closing(?:\s+Hymn)?|Holy\s+Communion|Communion|Confession|Thanksgiving)";

static PART_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Part\s+[0-9]+\s*:\s*(.+?)\s*\([0-9]+\)$").unwrap());

static PART_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Part\s+[0-9]+\s*:\s*(.+?)\s*\([0-9]+\)").unwrap());

static HEADING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(&format!(
            r"(?i)^{SECTION_HEADING}\s*[-–]\s*Song\.?\s*(?:No\.?)?\s*[0-9]+\s*[-–]\s*(.+)$"
        ))
        .unwrap(),
        Regex::new(&format!(r"(?i)^{SECTION_HEADING}\s*[-–]\s*(.+)$")).unwrap(),
        Regex::new(r"(?i)^Hymn\s+(?:No\.?)?\s*[0-9]+\s*[-–]\s*(.+)$").unwrap(),
    ]
});

static TRAILING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[0-9]+\s*$").unwrap());

static TRAILING_STOPS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!]+$").unwrap());

const NUMBER_INDICATORS: &[&str] = &["song.no:", "song no:", "hymn.no:", "hymn no:"];

fn is_number_indicator(title: &str) -> bool {
    let lower = title.to_lowercase();
    NUMBER_INDICATORS.iter().any(|i| lower.contains(i))
}

/// Title from a label-prefixed heading.
///
/// Understands "Offertory – When I survey", "Hymn 45 – O for a thousand
/// tongues" and "Part 1: Title (140)". Footer fragments, trailing numerals and
/// trailing stops are removed; candidates shorter than 6 characters, with
/// fewer than 10 letters, or failing the profile's heading filter are rejected.
pub fn extract_title_from_heading(text: &str, profile: &ScriptProfile) -> Option<String> {
    let text = text.trim();
    if text.chars().count() < 10 {
        return None;
    }

    if let Some(caps) = PART_HEADING.captures(text) {
        let title = caps.get(1)?.as_str().trim();
        if title.chars().count() > 5 && profile.accepts_heading(title) {
            return Some(title.to_string());
        }
    }

    for pattern in HEADING_PATTERNS.iter() {
        let Some(caps) = pattern.captures(text) else {
            continue;
        };
        let Some(raw) = caps.get(1) else { continue };

        let title = strip_footer_counter(raw.as_str().trim());
        let title = TRAILING_NUMBER.replace(&title, "");
        let title = TRAILING_STOPS.replace(&title, "");
        let title = title.trim();

        if is_number_indicator(title) {
            continue;
        }

        let len = title.chars().count();
        if (6..100).contains(&len) && letters(title) >= 10 && profile.accepts_heading(title) {
            return Some(title.to_string());
        }
    }

    None
}

/// Heading title for a whole slide: heading patterns on each paragraph first,
/// then any line that reads like a title.
pub fn slide_heading_title(slide: &ExtractedSlide, profile: &ScriptProfile) -> Option<String> {
    if let Some(title) = slide
        .paragraphs()
        .find_map(|p| extract_title_from_heading(p, profile))
    {
        return Some(title);
    }

    for shape in slide.text_shapes() {
        for line in shape.text.trim().lines().map(str::trim) {
            if let Some(caps) = PART_INLINE.captures(line) {
                if let Some(title) = caps.get(1).map(|m| m.as_str().trim()) {
                    if title.chars().count() > 5 {
                        return Some(title.to_string());
                    }
                }
            }

            if line.chars().count() < 10 || line.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if FOOTER_COUNTER.is_match(line) {
                continue;
            }

            let spaces = line.chars().filter(|c| c.is_whitespace()).count();
            if letters(line) > 15 && spaces >= 2 && profile.accepts_heading(line) {
                let cleaned = TRAILING_NUMBER.replace(line, "");
                if cleaned.chars().count() > 5 {
                    return Some(cleaned.chars().take(60).collect());
                }
            }
        }
    }

    None
}

/// Lines that are labels or metadata, never a title.
static BODY_SKIP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(hymn|offertory|communion|confession|thanksgiving|opening|closing)",
        r"^holy\s+communion",
        r"^(message|prayer|scripture|reading)",
        r"^[0-9]+\s*$",
        r"^slide\s+[0-9]+",
        r"^page\s+[0-9]+",
        r"^uen\s*[-–]",
        r"^song\.?\s*no",
        r"^hymn\.?\s*no",
        r"^\s*[-–]\s*(song|hymn)",
        r"(song|hymn)\.?\s*no\.?[:\-]\s*[0-9]+",
        r"^theme:",
        r"^[0-9]+\s+[a-z]+\s+[0-9]{4}",
        r"order\s+of\s+worship",
        r"sacred\s+music",
        r"choir\s+dedication",
        r"^dedication\s*[-–]",
        r"^(easter\s+sunday|good\s+friday|palm\s+sunday|maundy\s+thursday)",
        r"[0-9]+\s*:\s*[0-9]+\s+of\s+[0-9]+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{1,3}\s+").unwrap());

static TRAILING_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[;,:.!?]+$").unwrap());

/// Longest title kept before truncation with an ellipsis.
const MAX_BODY_TITLE: usize = 100;

/// Title from the first lyric line of a block of text.
///
/// Scans line by line, skipping labels and metadata (hymn/song number
/// prefixes, section names, "order of worship", dates, slide and page
/// counters) and lines failing the profile's script test. The first
/// surviving line becomes the title.
pub fn extract_title_from_body(text: &str, profile: &ScriptProfile) -> Option<String> {
    for raw in text.lines() {
        let line = raw.trim();
        if line.chars().count() < 3 {
            continue;
        }
        if !profile.accepts_body_line(line) {
            continue;
        }

        if BODY_SKIP_PATTERNS.iter().any(|p| p.is_match(&line.to_lowercase())) {
            continue;
        }

        let line = LEADING_NUMBER.replace(line, "");
        let lower = line.to_lowercase();
        if BODY_SKIP_PATTERNS.iter().any(|p| p.is_match(&lower)) {
            continue;
        }
        if line.chars().count() <= 3 {
            continue;
        }

        return shape_body_title(&line, profile);
    }
    None
}

fn shape_body_title(line: &str, profile: &ScriptProfile) -> Option<String> {
    if let Some(words) = profile.title_words {
        let title = line.split_whitespace().take(words).collect::<Vec<_>>().join(" ");
        return (!title.is_empty()).then_some(title);
    }

    let mut title = TRAILING_PUNCT.replace(line, "").trim().to_string();

    if title.chars().count() > 80 {
        for punct in [',', ';', ':', '—', '–', '-'] {
            if let Some((head, _)) = title.split_once(punct) {
                title = head.trim().to_string();
                break;
            }
        }
    }

    if title.chars().count() > MAX_BODY_TITLE {
        title = title.chars().take(MAX_BODY_TITLE - 3).collect::<String>() + "...";
    }

    (title.chars().count() > 3).then_some(title)
}

/// Body title for a slide, paragraph by paragraph.
pub fn slide_body_title(slide: &ExtractedSlide, profile: &ScriptProfile) -> Option<String> {
    let text = slide.paragraphs().collect::<Vec<_>>().join("\n");
    extract_title_from_body(&text, profile)
}

/// A standalone section divider such as "Opening Hymn O Day of rest".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTitle {
    pub label: SectionLabel,
    pub title: String,
}

static SECTION_TITLE_INLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?im)^({SECTION_HEADING})[ \t]+(.{{5,}})$")).unwrap()
});

static SECTION_TITLE_ALONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^{SECTION_HEADING}$")).unwrap());

static TRAILING_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{1,2}\s+[A-Z][a-z]+\s+[0-9]{4}.*$").unwrap());

fn clean_section_title(raw: &str) -> Option<String> {
    let title = strip_footer_counter(raw);
    let title = TRAILING_DATE.replace(&title, "");
    let title = title.trim_start_matches(|c: char| matches!(c, '-' | '–' | '—' | ':') || c.is_whitespace());
    let title = title.trim();
    (letters(title) > 5 && title.chars().count() < 80).then(|| title.to_string())
}

/// Detect a section divider: "Label Title" on one line, or "Label" with the
/// title on the next line.
pub fn is_section_title_slide(text: &str) -> Option<SectionTitle> {
    let text = text.trim();

    for caps in SECTION_TITLE_INLINE.captures_iter(text) {
        let (Some(label), Some(raw)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if let Some(title) = clean_section_title(raw.as_str()) {
            return Some(SectionTitle {
                label: SectionLabel::parse(label.as_str()),
                title,
            });
        }
    }

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    for pair in lines.windows(2) {
        let (label, next) = (pair[0], pair[1]);
        if SECTION_TITLE_ALONE.is_match(label) && next.chars().count() > 5 {
            if let Some(title) = clean_section_title(next) {
                return Some(SectionTitle {
                    label: SectionLabel::parse(label),
                    title,
                });
            }
        }
    }

    None
}

/// Section divider on any text shape of the slide, or across shapes when the
/// label and the title sit in separate boxes.
pub fn slide_section_title(slide: &ExtractedSlide) -> Option<SectionTitle> {
    slide
        .text_shapes()
        .find_map(|shape| is_section_title_slide(&shape.text))
        .or_else(|| {
            let joined = slide
                .text_shapes()
                .map(|s| s.text.trim())
                .collect::<Vec<_>>()
                .join("\n");
            is_section_title_slide(&joined)
        })
}

/// Song lists and orders of worship: they name hymns but are not hymn slides.
static INDEX_PAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^\s*song\s+list\b",
        r"(?i)order\s+of\s+(?:worship|service)",
        r"(?i)^\s*opening\s*:\s*[0-9]+\s+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static NON_HYMN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^prayers?\b",
        r"(?i)thanksgiving\s+prayer",
        r"(?i)intercessory\s+prayer",
        r"(?i)\bprayer\b.*[0-9]+\s*:\s*[0-9]+\s+of\s+[0-9]+",
        r"(?i)\bresponse\b",
        r"\b[LC]\s*[-–]\s*for\b",
        r"(?i)\bleader\b",
        r"(?i)\bcongregation\b",
        r"(?i)\bdedication\b.*[0-9]+\s+of\s+[0-9]+",
        r"(?i)\breading\b",
        r"(?i)\bscripture\b",
        r"(?i)(?:hymns?|song)\s+list",
        r"(?i)^b/?a:",
        r"(?i)^youtube\.be",
        r"(?i)^theme:",
        r"(?i)^announcements?\b",
        r"(?i)^message\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TWO_OR_THREE_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{2,3}\b").unwrap());

/// Index page listing the whole service.
pub fn is_index_page(text: &str) -> bool {
    let text = text.trim();
    INDEX_PAGE_PATTERNS.iter().any(|p| p.is_match(text))
        || TWO_OR_THREE_DIGITS.find_iter(text).count() > 4
}

/// Prayers, readings, responses, announcements and index pages.
///
/// Only meaningful for slides without an explicit hymn number:
/// "Thanksgiving Prayers Hymn No 306" is a hymn.
pub fn is_non_hymn_slide(text: &str) -> bool {
    let text = text.trim();
    is_index_page(text) || NON_HYMN_PATTERNS.iter().any(|p| p.is_match(text))
}

static SECTION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(Opening|Closing|Offertory|Holy\s+Communion|Communion|Confession|Thanksgiving|Dedication)\b")
        .unwrap()
});

/// Section label a slide heading starts with, e.g. "Offertory – Hymn No 12".
pub fn extract_section_label(text: &str) -> Option<SectionLabel> {
    SECTION_PREFIX
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| SectionLabel::parse(m.as_str()))
}

/// Slide text starts with a section keyword of the profile.
pub fn starts_with_section_keyword(text: &str, profile: &ScriptProfile) -> bool {
    let lower = text.trim_start().to_lowercase();
    profile
        .section_keywords
        .iter()
        .any(|kw| lower.starts_with(&kw.to_lowercase()))
}

const TITLE_BAR_LABELS: &[&str] = &[
    "Holy Communion Hymn",
    "Opening Hymn",
    "Thanksgiving",
    "Confession",
    "Closing Hymn",
    "Offertory",
    "Communion",
];

static SHORT_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[0-9]{1,3}\b").unwrap());

/// Slide whose text, once title-bar labels, bare numbers and footers are
/// removed, has fewer than 30 letters: an image with a caption at most.
pub fn is_image_only(text: &str) -> bool {
    let mut meaningful = text.to_string();
    for label in TITLE_BAR_LABELS {
        meaningful = meaningful.replace(label, "");
    }
    let meaningful = FOOTER_COUNTER.replace_all(&meaningful, "");
    let meaningful = SHORT_NUMBER.replace_all(&meaningful, "");
    letters(&meaningful) < 30
}

const TITLE_INDICATORS: &[&str] = &[
    "Hymn",
    "Opening",
    "Closing",
    "Midnight",
    "Confession",
    "Thanksgiving",
    "Offertory",
    "Dedication",
    "Song",
    "Communion",
];

static COMMUNION_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Holy\s+Communion\s*[–-]\s*[A-Za-z]").unwrap());

/// Section title slide rather than lyrics, from text and geometry together.
///
/// A large background picture with a rounded title box is decisive; otherwise
/// short text carrying a section indicator in one or two unpunctuated lines.
pub fn is_title_slide(slide: &ExtractedSlide) -> bool {
    let text = slide.all_text();
    let clean = text.trim();
    let short = clean.chars().count() < 150;
    let has_indicator = TITLE_INDICATORS.iter().any(|i| text.contains(i));

    let has_background = slide.pictures().any(is_large_background);
    let has_title_box = slide
        .shapes
        .iter()
        .filter(|s| s.kind == ShapeKind::RoundedRect)
        .filter_map(|s| s.bounds.as_ref())
        .any(is_title_box);

    if has_background && has_title_box {
        return true;
    }
    if has_background && short && has_indicator {
        return true;
    }

    if COMMUNION_TITLE.is_match(&text) && short {
        let long_lines = text.lines().filter(|l| l.trim().chars().count() > 10).count();
        if long_lines <= 2 {
            return true;
        }
    }

    if !short || !has_indicator {
        return false;
    }

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| l.chars().count() > 5)
        .collect();
    let commas = lines.iter().filter(|l| l.contains(',')).count();
    let stops = lines
        .iter()
        .filter(|l| l.ends_with(['.', '!', '?']))
        .count();

    lines.len() <= 2 && commas == 0 && stops == 0
}

static INDICATOR_WITH_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:song|hymn)\.?\s*no\.?[:\-]\s*[0-9]+[,\s]*(.+)").unwrap()
});

static VERSION_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\(v[0-9]+\)\s*").unwrap());

/// Repair titles that are really a number indicator ("Song.no: 522 (v1)").
///
/// Returns the text after the indicator, or `None` when nothing real remains.
/// Titles without an indicator are returned unchanged.
pub fn clean_indicator_title(title: &str) -> Option<String> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    if !is_number_indicator(title) {
        return Some(title.to_string());
    }

    let rest = INDICATOR_WITH_TITLE.captures(title)?.get(1)?.as_str();
    let rest = VERSION_PAREN.replace_all(rest, "");
    let rest = rest.trim();
    (rest.chars().count() > 3).then(|| rest.to_string())
}
