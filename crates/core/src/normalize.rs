//! Text normalization for hymn titles and lyric lines.
//!
//! Titles are normalized into comparison keys for deduplication and title-hint
//! search. Lyric lines are cleaned of punctuation for plain-text output while
//! keeping apostrophes inside words.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse multiple whitespace characters into one.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Trailing version marker: "Amazing Grace v2".
static VERSION_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+v[0-9]+\s*$").unwrap());

static DASH_RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-–—]+").unwrap());

static DASH_QUOTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"-\s*["“”]"#).unwrap());

static LEADING_JUNK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[-\s"“”']+"#).unwrap());

static TRAILING_JUNK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[-\s"“”']+$"#).unwrap());

/// Characters that are considered punctuation to remove from lyric lines.
/// Apostrophes are handled separately.
const PUNCTUATION_CHARS: &[char] = &[
    '.', ',', ';', ':', '?', '!', // Basic punctuation
    '"', '\u{201C}', '\u{201D}', // Quotation marks
    '«', '»', // Guillemets
    '(', ')', '[', ']', '{', '}', '<', '>', // Brackets
    '—', '–', '-', // Dashes
    '/', '\\', '|', '*', '_', '~',
];

/// Apostrophe-like characters.
const APOSTROPHE_CHARS: &[char] = &['\'', '\u{2019}', '\u{2018}', '`'];

/// Strip Latin combining accents so "Jésus" and "Jesus" compare equal.
///
/// Only the Combining Diacritical Marks block is removed; vowel signs of
/// Indic scripts are left alone.
fn fold_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !('\u{0300}'..='\u{036F}').contains(c))
        .nfc()
        .collect()
}

/// Comparison key for a hymn title.
///
/// Drops a trailing version marker, unifies dash runs, strips dashes and
/// quotes at either end, collapses whitespace and lowercases.
/// "What a Friend – "We Have" v2" and "what a friend - we have" share a key.
pub fn normalize_title(title: &str) -> String {
    let title = fold_diacritics(title.trim());
    let title = VERSION_SUFFIX_REGEX.replace(&title, "");
    let title = DASH_RUN_REGEX.replace_all(&title, "-");
    let title = DASH_QUOTE_REGEX.replace_all(&title, "- ");
    let title = LEADING_JUNK_REGEX.replace(&title, "");
    let title = TRAILING_JUNK_REGEX.replace(&title, "");

    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lowercase ASCII letters, digits and single spaces only.
pub fn normalize_for_search(text: &str) -> String {
    fold_diacritics(text)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Search phrase built from a title hint: words longer than two characters,
/// at most the first four.
pub fn title_hint_phrase(hint: &str) -> Option<String> {
    let normalized = normalize_for_search(hint);
    let words: Vec<&str> = normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .take(4)
        .collect();

    (!words.is_empty()).then(|| words.join(" "))
}

/// Text normalizer for lyric lines.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    /// Whether to preserve original line breaks.
    preserve_line_breaks: bool,
}

impl TextNormalizer {
    /// Create a new text normalizer with default settings.
    pub fn new() -> Self {
        Self {
            preserve_line_breaks: true,
        }
    }

    /// Set whether to preserve original line breaks.
    pub fn with_preserve_line_breaks(mut self, preserve: bool) -> Self {
        self.preserve_line_breaks = preserve;
        self
    }

    /// Normalize a single line of text.
    ///
    /// - Removes most punctuation (quotes, parentheses, dashes, etc.)
    /// - Keeps apostrophes that are inside words (e'er, don't)
    /// - Collapses whitespace runs to single spaces
    pub fn normalize_line(&self, text: &str) -> String {
        let text = text.replace("\r\n", "\n").replace(['\r', '\u{0B}'], "\n");

        let chars: Vec<char> = text.chars().collect();
        let mut output = String::with_capacity(text.len());

        for (i, &c) in chars.iter().enumerate() {
            if PUNCTUATION_CHARS.contains(&c) {
                continue;
            } else if APOSTROPHE_CHARS.contains(&c) {
                let prev_is_letter = i > 0 && chars[i - 1].is_alphabetic();
                let next_is_letter = i + 1 < chars.len() && chars[i + 1].is_alphabetic();

                if prev_is_letter && next_is_letter {
                    output.push('\'');
                }
            } else {
                output.push(c);
            }
        }

        if self.preserve_line_breaks {
            output
                .lines()
                .map(|line| WHITESPACE_COLLAPSE_REGEX.replace_all(line, " ").trim().to_string())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            output.split_whitespace().collect::<Vec<_>>().join(" ")
        }
    }

    /// Normalize text and split it into non-empty lines.
    pub fn normalize_to_lines(&self, text: &str) -> Vec<String> {
        self.normalize_line(text)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }
}
