//! Service deck assembly.
//!
//! Turns a [`ServicePlan`] into an [`AssembledDeck`]: an ordered list of
//! slides to generate or clone, with every per-shape edit already decided.
//! Writing the file is left to a [`DeckWriter`].
//!
//! A request that cannot be resolved never stops the generation; it becomes
//! a placeholder slide carrying [`NOT_FOUND_TEXT`].

use crate::geometry::{is_decorative, is_in_title_band, is_on_right_half, SlideSize};
use crate::plan::{ServicePlan, ServiceSongRequest, SERVICE_DATE_FORMAT};
use crate::section::SectionLabel;
use crate::selector::{GenerationSession, SelectedSource, SongQuery};
use crate::signals::{extract_footer_hymn, extract_slide_counter, is_footer_text};
use crate::types::{ExtractedSlide, ShapeKind, SlideShape};
use crate::Result;
use log::{info, warn};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Placeholder text for a request no source could satisfy.
pub const NOT_FOUND_TEXT: &str = "(Song not found)";

/// Heading of the summary slide.
pub const SUMMARY_HEADING: &str = "Song list";

/// Caption printed under the offertory QR code.
pub const UEN_TEXT: &str = "UEN - S86CC0315K";

pub const DEFAULT_CHURCH_NAME: &str = "Mar Thoma Syrian Church, Singapore";
pub const DEFAULT_SERVICE_NAME: &str = "English Holy Communion Service";

/// Summary titles longer than this are cut with an ellipsis.
const SUMMARY_TITLE_CHARS: usize = 50;

/// Words a cloned title bar must contain to be relabelled.
const TITLE_BAR_WORDS: &[&str] = &[
    "Hymn",
    "Song",
    "Offertory",
    "Opening",
    "Confession",
    "Communion",
    "Closing",
    "ThanksGiving",
];

/// Auto shapes this close to the top and this thin are title bars.
const TITLE_BAR_MAX_TOP: i64 = 100_000;
const TITLE_BAR_MAX_HEIGHT: i64 = 700_000;

static COMPENDIUM_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:hymn|song)\s*(?:no\.?|#)\s*:?\s*|[–\-—]\s*)?[0-9]{1,4}$").unwrap()
});

static SECTION_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Opening|Thanksgiving|Offertory|Confession|Communion|Closing|Dedication|B/A)")
        .unwrap()
});

static FRAMING_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Trinity|Message|Holy|Mar Thoma)").unwrap());

static LEADING_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\s*:\s*[0-9]+\s+of\s+[0-9]+").unwrap());

/// Text framing shared by all generated slides.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub church_name: String,
    pub service_name: String,
    /// Printed date; today when unset.
    pub service_date: Option<String>,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            church_name: DEFAULT_CHURCH_NAME.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_date: None,
        }
    }
}

impl AssemblyOptions {
    pub fn with_service_date(mut self, date: Option<String>) -> Self {
        self.service_date = date;
        self
    }
}

/// One line of the summary slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub label: String,
    /// False for a Communion entry directly after another one.
    pub show_label: bool,
    pub hymn_number: Option<String>,
    pub title: Option<String>,
}

impl SummaryEntry {
    /// `<number> <title>`, or `None` when there is neither.
    pub fn detail_line(&self) -> Option<String> {
        let title = self.title.as_deref().map(summary_title);
        match (self.hymn_number.as_deref(), title) {
            (Some(n), Some(t)) if !t.is_empty() => Some(format!("{n} {t}")),
            (Some(n), _) => Some(n.to_string()),
            (None, Some(t)) if !t.is_empty() => Some(t),
            _ => None,
        }
    }
}

/// First line of a title, control characters removed, capped for the summary.
fn summary_title(title: &str) -> String {
    let clean: String = title
        .replace('\u{b}', " ")
        .chars()
        .filter(|c| *c != '\0')
        .collect();
    let first = clean.lines().next().unwrap_or_default().trim();
    if first.chars().count() > SUMMARY_TITLE_CHARS {
        let cut: String = first.chars().take(SUMMARY_TITLE_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}

/// What happens to one source shape when its slide is cloned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ShapeAction {
    Drop,
    Keep {
        /// Replacement title bar text.
        relabel: Option<String>,
        /// Repaint the fill in the template's title bar colour.
        recolor: bool,
    },
}

impl ShapeAction {
    pub fn keep() -> Self {
        Self::Keep {
            relabel: None,
            recolor: false,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Self::Drop)
    }
}

/// Section title slide: label, number line, title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleSlide {
    pub label: String,
    pub hymn_line: Option<String>,
    pub title: Option<String>,
    /// Set on placeholders.
    pub note: Option<String>,
}

/// A source slide copied into the deck.
#[derive(Debug, Clone, Serialize)]
pub struct ContentSlide {
    pub source: PathBuf,
    /// 1-based slide number in `source`.
    pub slide_index: usize,
    /// One action per source shape, in shape order.
    pub actions: Vec<ShapeAction>,
    /// Text of the slide as it will appear after the actions.
    pub preview: ExtractedSlide,
    /// Title bar text for slides that had none to relabel.
    pub add_title_bar: Option<String>,
    pub add_qr: bool,
    /// Summary entry this slide belongs to.
    pub entry: usize,
}

/// One slide of the output deck.
#[derive(Debug, Clone, Serialize)]
pub enum AssembledSlide {
    Summary(Vec<SummaryEntry>),
    SectionTitle(TitleSlide),
    Message,
    CommunionIntro {
        heading: String,
        note: Option<String>,
    },
    Content(ContentSlide),
    /// Offertory slide with only a title bar and the QR code.
    OffertoryQr {
        heading: String,
    },
}

impl AssembledSlide {
    /// Visible text, one entry per line.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Summary(entries) => {
                let mut lines = vec![SUMMARY_HEADING.to_string()];
                for entry in entries {
                    if entry.show_label {
                        lines.push(entry.label.clone());
                    }
                    lines.extend(entry.detail_line());
                }
                lines
            }
            Self::SectionTitle(slide) => std::iter::once(slide.label.clone())
                .chain(slide.hymn_line.clone())
                .chain(slide.title.clone())
                .chain(slide.note.clone())
                .collect(),
            Self::Message => vec![SectionLabel::Message.name().to_string()],
            Self::CommunionIntro { heading, note } => {
                std::iter::once(heading.clone()).chain(note.clone()).collect()
            }
            Self::Content(slide) => slide
                .add_title_bar
                .iter()
                .cloned()
                .chain(
                    slide
                        .preview
                        .text_shapes()
                        .flat_map(|s| s.text.trim().lines().map(|l| l.trim().to_string())),
                )
                .filter(|l| !l.is_empty())
                .collect(),
            Self::OffertoryQr { heading } => vec![heading.clone(), UEN_TEXT.to_string()],
        }
    }
}

/// The complete output, ready for a [`DeckWriter`].
#[derive(Debug, Clone, Serialize)]
pub struct AssembledDeck {
    /// Header line of title slides.
    pub header: String,
    /// Footer line of title slides.
    pub footer: String,
    pub service_name: String,
    pub service_date: String,
    pub slides: Vec<AssembledSlide>,
    /// Requests that fell back to a placeholder.
    pub unresolved: Vec<String>,
}

impl AssembledDeck {
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn summary_entries(&self) -> &[SummaryEntry] {
        match self.slides.first() {
            Some(AssembledSlide::Summary(entries)) => entries,
            _ => &[],
        }
    }

    fn summary_entries_mut(&mut self) -> Option<&mut Vec<SummaryEntry>> {
        match self.slides.first_mut() {
            Some(AssembledSlide::Summary(entries)) => Some(entries),
            _ => None,
        }
    }

    /// Source files the content slides are cloned from, in first-use order.
    pub fn source_files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = Vec::new();
        for slide in &self.slides {
            if let AssembledSlide::Content(c) = slide {
                if !files.contains(&c.source.as_path()) {
                    files.push(&c.source);
                }
            }
        }
        files
    }
}

/// Writes an assembled deck to a presentation file.
pub trait DeckWriter {
    /// Write `deck` to `output` and return the number of slides written.
    fn write(&self, deck: &AssembledDeck, output: &Path) -> Result<usize>;
}

/// Title bar text of cloned slides: `Opening: Hymn No 91`.
pub fn title_bar_text(label: &SectionLabel, hymn_number: Option<&str>, title: Option<&str>) -> String {
    let label = label.slide_label();
    match (hymn_number, title) {
        (Some(n), _) => format!("{label}: Hymn No {n}"),
        (None, Some(t)) => format!("{label}: {t}"),
        (None, None) => label.to_string(),
    }
}

/// Heading of the communion intro slide.
pub fn communion_heading(hymn_number: Option<&str>, title: Option<&str>) -> String {
    match (hymn_number, title) {
        (Some(n), _) => format!("Holy Communion - Hymn No {n}"),
        (None, Some(t)) => format!("Holy Communion - {t}"),
        (None, None) => "Holy Communion".to_string(),
    }
}

/// Decide what to do with every shape of a slide being cloned.
///
/// Drops old QR codes, `UEN` captions and footer counters; relabels the first
/// title bar in the top band; marks thin auto shapes at the very top for
/// recolouring. Compendium slides also lose their number header, pagination
/// and decoration.
pub fn classify_cloned_shapes(
    slide: &ExtractedSlide,
    slide_size: &SlideSize,
    heading: &str,
    from_compendium: bool,
) -> Vec<ShapeAction> {
    let mut relabelled = false;

    slide
        .shapes
        .iter()
        .map(|shape| {
            if should_drop(shape, slide_size, from_compendium) {
                return ShapeAction::Drop;
            }

            let relabel = if !relabelled && is_title_bar_text(shape) {
                relabelled = true;
                Some(heading.to_string())
            } else {
                None
            };

            let recolor = shape.kind == ShapeKind::Shape
                && shape
                    .bounds
                    .as_ref()
                    .is_some_and(|b| b.y <= TITLE_BAR_MAX_TOP && b.height <= TITLE_BAR_MAX_HEIGHT);

            ShapeAction::Keep { relabel, recolor }
        })
        .collect()
}

fn should_drop(shape: &SlideShape, slide_size: &SlideSize, from_compendium: bool) -> bool {
    let text = shape.text.trim();

    if shape.kind == ShapeKind::Picture {
        return shape.bounds.as_ref().is_some_and(is_on_right_half);
    }
    if text.contains("UEN") || is_footer_text(text) {
        return true;
    }
    if !from_compendium {
        return false;
    }

    if text.is_empty() {
        return shape
            .bounds
            .as_ref()
            .is_some_and(|b| is_decorative(b, slide_size));
    }
    COMPENDIUM_HEADER.is_match(text)
        || extract_footer_hymn(text).is_some()
        || extract_slide_counter(text).is_some()
}

fn is_title_bar_text(shape: &SlideShape) -> bool {
    let in_band = shape.bounds.as_ref().is_some_and(is_in_title_band);
    in_band && TITLE_BAR_WORDS.iter().any(|w| shape.text.contains(w))
}

/// The slide as it will read after `actions` are applied.
pub fn apply_actions(slide: &ExtractedSlide, actions: &[ShapeAction]) -> ExtractedSlide {
    let mut preview = ExtractedSlide::new(slide.number);
    for (shape, action) in slide.shapes.iter().zip(actions) {
        match action {
            ShapeAction::Drop => {}
            ShapeAction::Keep {
                relabel: Some(text),
                ..
            } => {
                let mut relabelled = SlideShape::text(text.clone());
                relabelled.bounds = shape.bounds;
                relabelled.kind = shape.kind;
                preview.add_shape(relabelled);
            }
            ShapeAction::Keep { relabel: None, .. } => preview.add_shape(shape.clone()),
        }
    }
    preview
}

/// Short summary title from a slide of the assembled deck.
///
/// The first line of the first body text that reads as English (at least
/// ten letters, 80% of them basic Latin), cut to three words.
pub fn summary_title_from_slide(slide: &ExtractedSlide) -> Option<String> {
    body_lines(slide)
        .into_iter()
        .filter(|line| line.chars().count() <= 120)
        .find(|line| {
            let alpha = line.chars().filter(|c| c.is_alphabetic()).count();
            let latin = line.chars().filter(|c| c.is_ascii_alphabetic()).count();
            alpha >= 10 && latin as f64 >= alpha as f64 * 0.8
        })
        .map(|line| first_words(&line))
}

/// Any readable first line, for slides with no English body text.
fn fallback_title_from_slide(slide: &ExtractedSlide) -> Option<String> {
    body_lines(slide).first().map(|line| first_words(line))
}

/// First lines of the text shapes that are not framing or footers.
fn body_lines(slide: &ExtractedSlide) -> Vec<String> {
    slide
        .text_shapes()
        .map(|s| s.text.trim())
        .filter(|text| text.chars().count() >= 5)
        .filter(|text| {
            !SECTION_WORD.is_match(text)
                && !LEADING_COUNTER.is_match(text)
                && !FRAMING_PREFIX.is_match(text)
                && !text.contains("Hymn")
                && !text.contains("Song")
        })
        .filter_map(|text| {
            text.replace('\u{b}', "\n")
                .lines()
                .next()
                .map(|line| line.trim().to_string())
        })
        .filter(|line| line.chars().count() >= 5)
        .collect()
}

fn first_words(line: &str) -> String {
    let words: Vec<&str> = line.split_whitespace().collect();
    let take = if words.len() >= 3 { 3 } else { 2 };
    words.iter().take(take).copied().collect::<Vec<_>>().join(" ")
}

/// Builds the deck one request at a time.
struct Assembler<'s, 'a> {
    session: &'s mut GenerationSession<'a>,
    slides: Vec<AssembledSlide>,
    entries: Vec<SummaryEntry>,
    unresolved: Vec<String>,
}

impl Assembler<'_, '_> {
    fn push_entry(&mut self, request: &ServiceSongRequest, title: Option<String>) -> usize {
        let continues_communion = request.section_label.is_communion()
            && self
                .entries
                .last()
                .is_some_and(|e| e.label == SectionLabel::Communion.summary_label());

        self.entries.push(SummaryEntry {
            label: request.section_label.summary_label().to_string(),
            show_label: !continues_communion,
            hymn_number: request.hymn_number.clone(),
            title,
        });
        self.entries.len() - 1
    }

    fn process(&mut self, request: &ServiceSongRequest) {
        if request.is_message() {
            self.push_entry(request, None);
            self.slides.push(AssembledSlide::Message);
            info!("Added Message title slide");
            return;
        }

        let number = request.hymn_number.as_deref();
        let hint = request.title_hint.as_deref();
        let label = &request.section_label;

        match self.session.find_best_source(SongQuery::new(number, hint)) {
            Some(found) => {
                let display_title = found
                    .title()
                    .map(str::to_string)
                    .or_else(|| request.title_hint.clone());
                let entry = self.push_entry(request, display_title.clone());

                if label.is_communion() {
                    self.slides.push(AssembledSlide::CommunionIntro {
                        heading: communion_heading(number, display_title.as_deref()),
                        note: None,
                    });
                } else {
                    self.slides.push(AssembledSlide::SectionTitle(section_title(
                        label,
                        number,
                        display_title.clone(),
                        None,
                    )));
                }

                let heading = title_bar_text(label, number, display_title.as_deref());
                let added = self.clone_content(&found, &heading, *label == SectionLabel::Offertory, entry);
                info!(
                    "{label}: found in {} ({added} content slides)",
                    found.path.display()
                );
            }
            None => {
                let description = match (number, hint) {
                    (Some(n), _) => format!("{label}: Hymn No {n}"),
                    (None, Some(h)) => format!("{label}: {h}"),
                    (None, None) => label.to_string(),
                };
                warn!("{description}: song not found, adding placeholder");
                self.unresolved.push(description);
                self.push_entry(request, request.title_hint.clone());

                if label.is_communion() {
                    self.slides.push(AssembledSlide::CommunionIntro {
                        heading: communion_heading(number, hint),
                        note: Some(NOT_FOUND_TEXT.to_string()),
                    });
                    return;
                }

                self.slides.push(AssembledSlide::SectionTitle(section_title(
                    label,
                    number,
                    request.title_hint.clone(),
                    Some(NOT_FOUND_TEXT.to_string()),
                )));
                if *label == SectionLabel::Offertory {
                    self.slides.push(AssembledSlide::OffertoryQr {
                        heading: title_bar_text(label, number, None),
                    });
                }
            }
        }
    }

    fn clone_content(&mut self, found: &SelectedSource, heading: &str, offertory: bool, entry: usize) -> usize {
        let Some(presentation) = self.session.presentation(&found.path) else {
            warn!("{} is no longer loaded", found.path.display());
            return 0;
        };

        let mut added = Vec::new();
        for &index in found.content_slide_indices() {
            let Some(slide) = presentation.slide(index) else {
                warn!("{}: slide {index} out of range", found.path.display());
                continue;
            };

            let actions = classify_cloned_shapes(slide, &presentation.slide_size, heading, found.from_compendium);
            let relabelled = actions
                .iter()
                .any(|a| matches!(a, ShapeAction::Keep { relabel: Some(_), .. }));
            let preview = apply_actions(slide, &actions);

            added.push(AssembledSlide::Content(ContentSlide {
                source: found.path.clone(),
                slide_index: index,
                actions,
                preview,
                add_title_bar: (found.from_compendium && !relabelled).then(|| heading.to_string()),
                add_qr: offertory,
                entry,
            }));
        }

        let count = added.len();
        self.slides.extend(added);
        count
    }
}

fn section_title(
    label: &SectionLabel,
    number: Option<&str>,
    title: Option<String>,
    note: Option<String>,
) -> TitleSlide {
    let label = match label {
        SectionLabel::Thanksgiving => "ThanksGiving Prayers".to_string(),
        other => other.slide_label().to_string(),
    };
    TitleSlide {
        label,
        hymn_line: number.map(|n| format!("Hymn No {n}")),
        title,
        note,
    }
}

/// Assemble the whole service.
///
/// The summary slide comes first, then each request's framing and content in
/// plan order. Summary titles still missing afterwards are read back from
/// the assembled content slides.
pub fn assemble(
    plan: &ServicePlan,
    session: &mut GenerationSession<'_>,
    options: &AssemblyOptions,
) -> AssembledDeck {
    let service_date = options
        .service_date
        .clone()
        .or_else(|| plan.service_date.clone())
        .unwrap_or_else(|| chrono::Local::now().format(SERVICE_DATE_FORMAT).to_string());

    let mut assembler = Assembler {
        session,
        slides: Vec::new(),
        entries: Vec::new(),
        unresolved: Vec::new(),
    };

    for (i, request) in plan.requests.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, plan.requests.len(), request.section_label);
        assembler.process(request);
    }

    let mut slides = Vec::with_capacity(assembler.slides.len() + 1);
    slides.push(AssembledSlide::Summary(assembler.entries));
    slides.extend(assembler.slides);

    let mut deck = AssembledDeck {
        header: options.church_name.clone(),
        footer: format!("{} – {service_date}", options.service_name),
        service_name: options.service_name.clone(),
        service_date,
        slides,
        unresolved: assembler.unresolved,
    };
    backfill_summary(&mut deck);
    deck
}

/// Fill summary titles from the deck's own content slides.
pub fn backfill_summary(deck: &mut AssembledDeck) {
    let mut found: Vec<(usize, String)> = Vec::new();
    let mut fallback: Vec<(usize, String)> = Vec::new();

    for slide in &deck.slides {
        let AssembledSlide::Content(content) = slide else {
            continue;
        };
        if found.iter().any(|(e, _)| *e == content.entry) {
            continue;
        }
        match summary_title_from_slide(&content.preview) {
            Some(title) => found.push((content.entry, title)),
            None => {
                if !fallback.iter().any(|(e, _)| *e == content.entry) {
                    if let Some(title) = fallback_title_from_slide(&content.preview) {
                        fallback.push((content.entry, title));
                    }
                }
            }
        }
    }

    let Some(entries) = deck.summary_entries_mut() else {
        return;
    };
    for (index, entry) in entries.iter_mut().enumerate() {
        if entry.title.is_some() {
            continue;
        }
        entry.title = found
            .iter()
            .chain(fallback.iter())
            .find(|(e, _)| *e == index)
            .map(|(_, t)| t.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compendium::CompendiumSegmenter;
    use crate::error::Error;
    use crate::geometry::Rect;
    use crate::library::{default_markers, SourceLibrary};
    use crate::script::ScriptProfile;
    use crate::segment::RunSegmenter;
    use crate::types::{Presentation, PresentationLoader};
    use std::collections::HashMap;

    struct MemoryLoader(HashMap<PathBuf, Presentation>);

    impl PresentationLoader for MemoryLoader {
        fn load(&self, path: &Path) -> Result<Presentation> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| Error::PresentationParse(path.display().to_string()))
        }
    }

    fn bar() -> Rect {
        Rect::new(0, 0, 9_144_000, 486_000)
    }

    fn body() -> Rect {
        Rect::new(500_000, 1_000_000, 8_000_000, 4_500_000)
    }

    fn footer() -> Rect {
        Rect::new(500_000, 6_300_000, 3_000_000, 300_000)
    }

    fn service_deck() -> Presentation {
        let mut p = Presentation::new("12 Jan 2025 HCS.pptx");
        let hymns = [
            ("91", "Opening", "Praise to the Lord the Almighty", 5),
            ("313", "Communion", "Here O my Lord I see thee face to face", 3),
        ];
        for (number, label, opening, count) in hymns {
            for verse in 1..=count {
                let mut slide = ExtractedSlide::new(p.slides.len() + 1);
                slide.add_shape(
                    SlideShape::text_at(format!("{label} Hymn No {number}"), bar())
                        .with_kind(ShapeKind::Shape),
                );
                slide.add_shape(SlideShape::text_at(
                    format!("{opening}\nthe King of creation verse {verse}\nall ye who hear now to his temple draw near"),
                    body(),
                ));
                slide.add_shape(SlideShape::text_at(format!("{label}: {verse} of {count}"), footer()));
                p.add_slide(slide);
            }
        }
        p
    }

    fn fixture(decks: Vec<Presentation>) -> (MemoryLoader, SourceLibrary) {
        let mut map = HashMap::new();
        let mut files = Vec::new();
        for deck in decks {
            let path = PathBuf::from(&deck.filename);
            files.push(path.clone());
            map.insert(path, deck);
        }
        (MemoryLoader(map), SourceLibrary::from_files(files, &default_markers()))
    }

    fn run(plan: &str, decks: Vec<Presentation>) -> AssembledDeck {
        let (loader, library) = fixture(decks);
        let mut session = GenerationSession::new(
            &loader,
            &library,
            RunSegmenter::new(ScriptProfile::english()),
            CompendiumSegmenter::default(),
        );
        let options = AssemblyOptions::default().with_service_date(Some("08 February 2026".into()));
        assemble(&ServicePlan::parse(plan), &mut session, &options)
    }

    #[test]
    fn test_end_to_end_service() {
        let deck = run("91|Opening|\nMessage\n313|Communion|\n", vec![service_deck()]);

        assert_eq!(deck.len(), 12);
        assert!(deck.unresolved.is_empty());
        assert!(matches!(deck.slides[0], AssembledSlide::Summary(_)));
        assert!(matches!(&deck.slides[1], AssembledSlide::SectionTitle(t) if t.label == "Opening"));
        for slide in &deck.slides[2..7] {
            assert!(matches!(slide, AssembledSlide::Content(_)));
        }
        assert!(matches!(deck.slides[7], AssembledSlide::Message));
        assert!(matches!(
            &deck.slides[8],
            AssembledSlide::CommunionIntro { heading, .. } if heading == "Holy Communion - Hymn No 313"
        ));
        for slide in &deck.slides[9..] {
            assert!(matches!(slide, AssembledSlide::Content(_)));
        }

        assert_eq!(deck.footer, "English Holy Communion Service – 08 February 2026");
        assert_eq!(deck.source_files(), vec![Path::new("12 Jan 2025 HCS.pptx")]);
    }

    #[test]
    fn test_zero_padded_plan_number_matches_deck() {
        let mut padded = Presentation::new("09 Mar 2025 HCS.pptx");
        for verse in 1..=2 {
            let mut slide = ExtractedSlide::new(verse);
            slide.add_shape(SlideShape::text_at("Opening Hymn No 042", bar()).with_kind(ShapeKind::Shape));
            slide.add_shape(SlideShape::text_at(
                format!("O God our help in ages past
our hope for years to come verse {verse}"),
                body(),
            ));
            padded.add_slide(slide);
        }

        let deck = run("042|Opening|\n", vec![padded]);

        assert!(deck.unresolved.is_empty());
        assert_eq!(deck.len(), 4);
        assert!(matches!(&deck.slides[1], AssembledSlide::SectionTitle(t) if t.label == "Opening"));
        assert!(matches!(deck.slides[2], AssembledSlide::Content(_)));
    }

    #[test]
    fn test_cloned_slides_are_relabelled_and_footers_dropped() {
        let deck = run("313|Confession|\n", vec![service_deck()]);

        let AssembledSlide::Content(first) = &deck.slides[2] else {
            panic!("expected content slide");
        };
        assert_eq!(
            first.actions[0],
            ShapeAction::Keep {
                relabel: Some("Confession: Hymn No 313".into()),
                recolor: true
            }
        );
        assert_eq!(first.actions[1], ShapeAction::keep());
        assert!(first.actions[2].is_drop());
        assert_eq!(first.preview.shapes.len(), 2);
        assert_eq!(deck.slides[2].lines()[0], "Confession: Hymn No 313");
        assert!(!first.add_qr);
    }

    #[test]
    fn test_missing_hymn_gets_placeholder() {
        let deck = run("777|Closing|\n", vec![service_deck()]);

        assert_eq!(deck.len(), 2);
        assert_eq!(deck.unresolved, vec!["Closing: Hymn No 777".to_string()]);
        let lines = deck.slides[1].lines();
        assert_eq!(lines, vec!["Closing", "Hymn No 777", NOT_FOUND_TEXT]);
    }

    #[test]
    fn test_missing_offertory_and_communion() {
        let deck = run("|Offertory|\n900|Communion|\n", vec![service_deck()]);

        assert_eq!(deck.len(), 4);
        assert!(matches!(&deck.slides[1], AssembledSlide::SectionTitle(t) if t.note.as_deref() == Some(NOT_FOUND_TEXT)));
        assert!(matches!(&deck.slides[2], AssembledSlide::OffertoryQr { heading } if heading == "Offertory"));
        assert_eq!(
            deck.slides[3].lines(),
            vec!["Holy Communion - Hymn No 900", NOT_FOUND_TEXT]
        );
        assert_eq!(deck.unresolved.len(), 2);
    }

    #[test]
    fn test_offertory_content_gets_qr() {
        let deck = run("91|Offertory|\n", vec![service_deck()]);
        let qr_slides = deck
            .slides
            .iter()
            .filter(|s| matches!(s, AssembledSlide::Content(c) if c.add_qr))
            .count();
        assert_eq!(qr_slides, 5);
    }

    #[test]
    fn test_summary_entries() {
        let deck = run(
            "91|Opening|\n236|Thanksgiving|Now thank we all our God\nMessage\n313|Communion|\n900|Communion|\n",
            vec![service_deck()],
        );

        let entries = deck.summary_entries();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[1].label, "B/A");
        assert_eq!(entries[1].detail_line().as_deref(), Some("236 Now thank we all our God"));
        assert_eq!(entries[2].detail_line(), None);
        assert!(entries[3].show_label);
        assert!(!entries[4].show_label);

        assert_eq!(entries[0].title.as_deref(), Some("Praise to the Lord the Almighty"));
        assert_eq!(entries[4].title, None);
    }

    #[test]
    fn test_backfill_summary_from_content() {
        let mut preview = ExtractedSlide::new(1);
        preview.add_shape(SlideShape::text("Closing: Hymn No 40"));
        preview.add_shape(SlideShape::text("Closing: 1 of 4"));
        preview.add_shape(SlideShape::text("Abide with me fast falls the eventide\nthe darkness deepens"));

        let mut deck = AssembledDeck {
            header: String::new(),
            footer: String::new(),
            service_name: String::new(),
            service_date: String::new(),
            slides: vec![
                AssembledSlide::Summary(vec![SummaryEntry {
                    label: "Closing".into(),
                    show_label: true,
                    hymn_number: Some("40".into()),
                    title: None,
                }]),
                AssembledSlide::Content(ContentSlide {
                    source: PathBuf::from("a.pptx"),
                    slide_index: 1,
                    actions: vec![ShapeAction::keep(); 3],
                    preview,
                    add_title_bar: None,
                    add_qr: false,
                    entry: 0,
                }),
            ],
            unresolved: Vec::new(),
        };

        backfill_summary(&mut deck);
        assert_eq!(deck.summary_entries()[0].title.as_deref(), Some("Abide with me"));
        assert_eq!(deck.summary_entries()[0].detail_line().as_deref(), Some("40 Abide with me"));
    }

    #[test]
    fn test_summary_title_cap() {
        let entry = SummaryEntry {
            label: "Opening".into(),
            show_label: true,
            hymn_number: Some("1".into()),
            title: Some("x".repeat(60)),
        };
        let line = entry.detail_line().unwrap();
        assert_eq!(line.chars().count(), 2 + 50);
        assert!(line.ends_with("..."));
    }

    #[test]
    fn test_summary_title_skips_framing_and_foreign_text() {
        let mut slide = ExtractedSlide::new(1);
        slide.add_shape(SlideShape::text("Opening: Hymn No 91"));
        slide.add_shape(SlideShape::text("ദൈവമേ നിൻ കൃപ എന്നും"));
        slide.add_shape(SlideShape::text("Holy is the Lord"));
        slide.add_shape(SlideShape::text("Great is thy faithfulness O God my Father"));
        assert_eq!(summary_title_from_slide(&slide).as_deref(), Some("Great is thy"));
        assert_eq!(fallback_title_from_slide(&slide).as_deref(), Some("ദൈവമേ നിൻ കൃപ"));
    }

    #[test]
    fn test_classify_compendium_shapes() {
        let size = SlideSize::default();
        let mut slide = ExtractedSlide::new(1);
        slide.add_shape(SlideShape::text_at("143", Rect::new(200_000, 100_000, 1_000_000, 400_000)));
        slide.add_shape(SlideShape::text_at("Yeshu nallavan\navan vallabhan", body()));
        slide.add_shape(SlideShape::text_at("Hymn #143 – 1 of 2", footer()));
        slide.add_shape(
            SlideShape::text_at("", Rect::new(100_000, 100_000, 300_000, 300_000)).with_kind(ShapeKind::Shape),
        );
        slide.add_shape(SlideShape::picture(Rect::new(6_400_000, 1_000_000, 2_700_000, 2_800_000)));

        let actions = classify_cloned_shapes(&slide, &size, "Closing: Hymn No 143", true);
        let dropped: Vec<bool> = actions.iter().map(ShapeAction::is_drop).collect();
        assert_eq!(dropped, vec![true, false, true, true, true]);

        // The same slide from a service recording keeps its number and decoration
        let actions = classify_cloned_shapes(&slide, &size, "Closing: Hymn No 143", false);
        let dropped: Vec<bool> = actions.iter().map(ShapeAction::is_drop).collect();
        assert_eq!(dropped, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_only_first_title_bar_is_relabelled() {
        let mut slide = ExtractedSlide::new(1);
        slide.add_shape(SlideShape::text_at("Hymn No 5", bar()).with_kind(ShapeKind::TextBox));
        slide.add_shape(SlideShape::text_at("Opening Song", Rect::new(0, 200_000, 100, 100)));
        slide.add_shape(SlideShape::text("Song of praise"));

        let actions = classify_cloned_shapes(&slide, &SlideSize::default(), "Opening: Hymn No 5", false);
        assert_eq!(
            actions[0],
            ShapeAction::Keep {
                relabel: Some("Opening: Hymn No 5".into()),
                recolor: false
            }
        );
        assert_eq!(actions[1], ShapeAction::keep());
        assert_eq!(actions[2], ShapeAction::keep());
    }

    #[test]
    fn test_heading_texts() {
        assert_eq!(
            title_bar_text(&SectionLabel::Thanksgiving, Some("236"), None),
            "ThanksGiving: Hymn No 236"
        );
        assert_eq!(title_bar_text(&SectionLabel::Closing, None, Some("Abide")), "Closing: Abide");
        assert_eq!(communion_heading(None, Some("Bread of life")), "Holy Communion - Bread of life");
        assert_eq!(communion_heading(None, None), "Holy Communion");
    }
}
