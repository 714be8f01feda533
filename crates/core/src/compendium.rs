//! Reference compendium support.
//!
//! The compendium is one large deck holding the whole hymnal. Its layout
//! differs from service recordings: the number sits in a corner or after a
//! dash rather than in a "Hymn No" header, every slide carries a
//! "Hymn #N – X of Y" footer, and titles come from a curated table.

use crate::error::Error;
use crate::geometry::is_in_right_corner;
use crate::segment::HymnRun;
use crate::signals::{extract_footer_hymn, extract_slide_counter, is_footer_text, SlideCounter};
use crate::types::{ExtractedSlide, Presentation};
use crate::Result;
use log::debug;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

static DASH_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[–\-—]\s*([0-9]{1,4})\b").unwrap());

/// Shapes with more words than this are lyrics, not number labels.
const MAX_LABEL_WORDS: usize = 6;

/// Curated number → title table for the compendium.
#[derive(Debug, Clone, Default)]
pub struct CompendiumTitles {
    titles: BTreeMap<String, String>,
}

impl CompendiumTitles {
    /// Parse a JSON object `{ "<number>": "<title>" }`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let titles: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|e| Error::Lookup(e.to_string()))?;
        Ok(Self { titles })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn get(&self, number: &str) -> Option<&str> {
        self.titles.get(number).map(String::as_str)
    }

    /// Entries in ascending numeric order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .titles
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_by_key(|(k, _)| k.parse::<u32>().unwrap_or(u32::MAX));
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// Hymn number printed on a compendium slide, ignoring footers and the
/// right-hand page furniture.
pub fn compendium_slide_number(slide: &ExtractedSlide, presentation: &Presentation) -> Option<String> {
    for shape in slide.text_shapes() {
        if shape
            .bounds
            .as_ref()
            .is_some_and(|b| is_in_right_corner(b, &presentation.slide_size))
        {
            continue;
        }

        let text = shape.text.trim();
        if extract_slide_counter(text).is_some() || extract_footer_hymn(text).is_some() {
            continue;
        }

        if let Some(caps) = DASH_NUMBER.captures(text) {
            if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                return Some(n.to_string());
            }
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() || words.len() > MAX_LABEL_WORDS {
            continue;
        }
        let half = words.len().div_ceil(2);
        for word in &words[..half] {
            let bare = word.trim_matches(|c: char| c.is_ascii_punctuation());
            if (1..=4).contains(&bare.len()) && bare.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(n) = bare.parse::<u32>() {
                    return Some(n.to_string());
                }
            }
        }
    }
    None
}

/// Footer hymn number and pagination of a slide, from any shape.
fn slide_footer(slide: &ExtractedSlide) -> (Option<String>, Option<SlideCounter>) {
    let mut hymn = None;
    let mut counter = None;
    for shape in slide.text_shapes() {
        let text = shape.text.trim();
        if hymn.is_none() {
            hymn = extract_footer_hymn(text);
        }
        if counter.is_none() {
            counter = extract_slide_counter(text);
        }
    }
    (hymn, counter)
}

/// Largest non-footer text on a slide, first line only.
fn largest_text(slide: &ExtractedSlide) -> Option<String> {
    slide
        .text_shapes()
        .map(|s| s.text.trim())
        .filter(|t| !is_footer_text(t) && extract_footer_hymn(t).is_none())
        .max_by_key(|t| t.chars().count())
        .and_then(|t| t.lines().next())
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

#[derive(Debug)]
struct OpenHymn {
    number: String,
    first: usize,
    indices: Vec<usize>,
    total: Option<usize>,
}

/// Segmenter for the compendium layout.
#[derive(Debug, Clone, Default)]
pub struct CompendiumSegmenter {
    titles: CompendiumTitles,
}

impl CompendiumSegmenter {
    pub fn new(titles: CompendiumTitles) -> Self {
        Self { titles }
    }

    pub fn titles(&self) -> &CompendiumTitles {
        &self.titles
    }

    /// Every hymn in the compendium, in document order.
    pub fn segment(&self, presentation: &Presentation) -> Vec<HymnRun> {
        let mut runs = Vec::new();
        let mut open: Option<OpenHymn> = None;

        for slide in &presentation.slides {
            let (footer_hymn, counter) = slide_footer(slide);
            let start = compendium_slide_number(slide, presentation);

            if let Some(current) = open.as_mut() {
                let footer_changed = footer_hymn.as_ref().is_some_and(|h| *h != current.number);
                let new_start = start.as_ref().is_some_and(|n| *n != current.number);
                let restarted = counter.is_some_and(|c| {
                    c.current == 1 && current.total.is_some_and(|t| current.indices.len() >= t)
                });

                if !(footer_changed || new_start || restarted) {
                    current.indices.push(slide.number);
                    if current.total.is_none() {
                        current.total = counter.map(|c| c.total);
                    }
                    continue;
                }

                if let Some(done) = open.take() {
                    runs.push(self.close(done, presentation));
                }
            }

            if let Some(number) = start.or(footer_hymn) {
                open = Some(OpenHymn {
                    number,
                    first: slide.number,
                    indices: vec![slide.number],
                    total: counter.map(|c| c.total),
                });
            }
        }

        if let Some(done) = open {
            runs.push(self.close(done, presentation));
        }

        runs
    }

    /// Content slides of one hymn.
    pub fn find(&self, presentation: &Presentation, number: &str) -> Option<HymnRun> {
        let found = self
            .segment(presentation)
            .into_iter()
            .find(|run| run.hymn_number.as_deref() == Some(number));

        if let Some(run) = &found {
            debug!(
                "{}: hymn {number} at slides {:?}",
                presentation.filename, run.content_slide_indices
            );
        }
        found
    }

    fn close(&self, open: OpenHymn, presentation: &Presentation) -> HymnRun {
        let title = self
            .titles
            .get(&open.number)
            .map(str::to_string)
            .or_else(|| presentation.slide(open.first).and_then(largest_text));

        HymnRun {
            hymn_number: Some(open.number),
            title,
            section_label: None,
            source_file: presentation.filename.clone(),
            title_slide_index: open.first,
            content_slide_indices: open.indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::types::SlideShape;

    fn slide(number: usize, texts: &[(&str, Rect)]) -> ExtractedSlide {
        let mut s = ExtractedSlide::new(number);
        for (text, rect) in texts {
            s.add_shape(SlideShape::text_at(*text, *rect));
        }
        s
    }

    fn body() -> Rect {
        Rect::new(500_000, 1_000_000, 8_000_000, 4_000_000)
    }

    fn corner() -> Rect {
        Rect::new(8_600_000, 100_000, 400_000, 300_000)
    }

    fn label() -> Rect {
        Rect::new(200_000, 100_000, 1_000_000, 400_000)
    }

    fn footer() -> Rect {
        Rect::new(500_000, 6_300_000, 8_000_000, 300_000)
    }

    fn compendium() -> Presentation {
        let mut p = Presentation::new("KK Hymns.pptx");
        p.add_slide(slide(1, &[("143", label()), ("Yeshu nallavan\navan vallabhan", body()), ("Hymn #143 – 1 of 2", footer())]));
        p.add_slide(slide(2, &[("Ente daivam\nmahathvathil", body()), ("Hymn #143 – 2 of 2", footer())]));
        p.add_slide(slide(3, &[("– 144", label()), ("999", corner()), ("Sthothram sthothram", body()), ("Hymn #144 – 1 of 3", footer())]));
        p.add_slide(slide(4, &[("Second verse", body()), ("Hymn #144 – 2 of 3", footer())]));
        p.add_slide(slide(5, &[("Third verse", body()), ("Hymn #144 – 3 of 3", footer())]));
        p
    }

    #[test]
    fn test_segment_by_footer_and_corner_numbers() {
        let runs = CompendiumSegmenter::default().segment(&compendium());

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].hymn_number.as_deref(), Some("143"));
        assert_eq!(runs[0].content_slide_indices, vec![1, 2]);
        assert_eq!(runs[1].hymn_number.as_deref(), Some("144"));
        assert_eq!(runs[1].content_slide_indices, vec![3, 4, 5]);
    }

    #[test]
    fn test_right_corner_number_is_ignored() {
        let p = compendium();
        assert_eq!(compendium_slide_number(&p.slides[2], &p).as_deref(), Some("144"));
    }

    #[test]
    fn test_title_from_table_then_largest_text() {
        let titles = CompendiumTitles::from_json_str(r#"{"144": "Sthothram Sthothram"}"#).unwrap();
        let seg = CompendiumSegmenter::new(titles);
        let p = compendium();

        assert_eq!(
            seg.find(&p, "144").and_then(|r| r.title).as_deref(),
            Some("Sthothram Sthothram")
        );
        assert_eq!(
            seg.find(&p, "143").and_then(|r| r.title).as_deref(),
            Some("Yeshu nallavan")
        );
        assert!(seg.find(&p, "7").is_none());
    }

    #[test]
    fn test_lyrics_with_verse_numbers_are_not_hymn_numbers() {
        let mut p = Presentation::new("KK.pptx");
        p.add_slide(slide(1, &[("2 Yeshu nallavan avan vallabhan ente rakshakan", body())]));
        assert_eq!(compendium_slide_number(&p.slides[0], &p), None);
    }

    #[test]
    fn test_title_table_errors_and_order() {
        assert!(matches!(
            CompendiumTitles::from_json_str("[1, 2]"),
            Err(Error::Lookup(_))
        ));

        let titles = CompendiumTitles::from_json_str(r#"{"10": "b", "9": "a"}"#).unwrap();
        let order: Vec<&str> = titles.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["9", "10"]);
        assert_eq!(titles.len(), 2);
    }
}
