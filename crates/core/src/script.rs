//! Script profiles: what counts as a readable line in the deck's language.
//!
//! English decks and Malayalam decks share every boundary rule; they differ
//! only in which lines may become a title and what lyrics look like. Those
//! differences live here as plain data and function pointers.

/// Predicate over a candidate line of text.
pub type ScriptFilter = fn(&str) -> bool;

/// Words that open a new section when they start a slide.
pub const SECTION_KEYWORDS: &[&str] = &[
    "Opening",
    "Closing",
    "Offertory",
    "Communion",
    "Confession",
    "Thanksgiving",
    "Message",
    "Prayer",
];

/// Language-specific tuning for the extractors and the segmenter.
#[derive(Debug, Clone, Copy)]
pub struct ScriptProfile {
    pub name: &'static str,

    /// Accepts a body paragraph as a title candidate.
    pub body_filter: ScriptFilter,

    /// Accepts a title captured from a heading pattern.
    pub heading_filter: ScriptFilter,

    /// Decides whether a slide's text carries lyrics.
    pub lyrics_filter: ScriptFilter,

    /// Minimum share of vowels among ASCII letters; guards against
    /// transliteration debris and mis-encoded fonts.
    pub min_vowel_ratio: Option<f64>,

    /// Body titles are cut to this many words when set.
    pub title_words: Option<usize>,

    /// Words that start an unrelated section.
    pub section_keywords: &'static [&'static str],
}

impl ScriptProfile {
    /// English decks.
    pub fn english() -> Self {
        Self {
            name: "English",
            body_filter: english_line,
            heading_filter: latin_majority,
            lyrics_filter: english_lyrics,
            min_vowel_ratio: None,
            title_words: None,
            section_keywords: SECTION_KEYWORDS,
        }
    }

    /// Malayalam decks, titled in Manglish (Malayalam written in Latin letters).
    pub fn malayalam() -> Self {
        Self {
            name: "Malayalam",
            body_filter: manglish_line,
            heading_filter: any_script,
            lyrics_filter: malayalam_lyrics,
            min_vowel_ratio: Some(0.2),
            title_words: Some(3),
            section_keywords: SECTION_KEYWORDS,
        }
    }

    /// Profile for a `# Language:` directive value. Unknown names fall back to English.
    pub fn for_language(language: &str) -> Self {
        match language.trim().to_lowercase().as_str() {
            "malayalam" | "manglish" | "ml" => Self::malayalam(),
            _ => Self::english(),
        }
    }

    /// Body line passes the script test and the vowel test.
    pub fn accepts_body_line(&self, line: &str) -> bool {
        if !(self.body_filter)(line) {
            return false;
        }
        match self.min_vowel_ratio {
            Some(min) => vowel_ratio(line).map_or(true, |r| r >= min),
            None => true,
        }
    }

    pub fn accepts_heading(&self, title: &str) -> bool {
        (self.heading_filter)(title)
    }

    pub fn has_lyrics(&self, text: &str) -> bool {
        (self.lyrics_filter)(text)
    }
}

impl Default for ScriptProfile {
    fn default() -> Self {
        Self::english()
    }
}

/// Character lies in the Malayalam Unicode block.
pub fn is_malayalam_char(c: char) -> bool {
    ('\u{0D00}'..='\u{0D7F}').contains(&c)
}

pub fn contains_malayalam(text: &str) -> bool {
    text.chars().any(is_malayalam_char)
}

/// Count of ASCII letters.
pub fn ascii_letters(text: &str) -> usize {
    text.chars().filter(|c| c.is_ascii_alphabetic()).count()
}

/// Count of letters in any script.
pub fn letters(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphabetic()).count()
}

/// Share of vowels among ASCII letters, `None` when there are no ASCII letters.
pub fn vowel_ratio(text: &str) -> Option<f64> {
    let ascii = ascii_letters(text);
    if ascii == 0 {
        return None;
    }
    let vowels = text
        .chars()
        .filter(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
        .count();
    Some(vowels as f64 / ascii as f64)
}

fn any_script(_: &str) -> bool {
    true
}

fn latin_majority(text: &str) -> bool {
    let total = letters(text);
    total == 0 || ascii_letters(text) * 2 >= total
}

fn english_line(text: &str) -> bool {
    if contains_malayalam(text) {
        return false;
    }
    let total = text.chars().count();
    let non_ascii = text.chars().filter(|c| !c.is_ascii()).count();
    total == 0 || (non_ascii as f64 / total as f64) <= 0.1
}

fn english_lyrics(text: &str) -> bool {
    ascii_letters(text) >= 30
}

fn malayalam_lyrics(text: &str) -> bool {
    contains_malayalam(text) || ascii_letters(text) >= 30
}

const MANGLISH_ALLOWED: &[char] = &['-', '\'', '!', '?', ',', '.', ' ', '\n', '\r', '\t', '\u{0B}'];

const COMMON_ENGLISH: &[&str] = &[
    "ride", "on", "the", "and", "or", "but", "in", "to", "for", "of", "with", "at", "by", "from",
];

fn manglish_line(text: &str) -> bool {
    if contains_malayalam(text) {
        return false;
    }
    if text
        .chars()
        .any(|c| !(c.is_alphanumeric() || MANGLISH_ALLOWED.contains(&c)))
    {
        return false;
    }

    let total = letters(text);
    if total > 0 && (ascii_letters(text) as f64) < total as f64 * 0.9 {
        return false;
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() >= 2 {
        let english = words
            .iter()
            .take(3)
            .filter(|w| COMMON_ENGLISH.contains(&w.to_lowercase().as_str()))
            .count();
        if english >= 2 {
            return false;
        }
    }
    true
}
