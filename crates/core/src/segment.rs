//! Run segmentation: partition a presentation into hymn runs.
//!
//! A [`RunSegmenter`] walks the slides of one file in order and groups them
//! into [`HymnRun`]s with a two-state machine (idle / collecting). Boundary
//! rules are shared by every language; the [`ScriptProfile`] only decides
//! which lines may become titles and what counts as lyrics.

use crate::normalize::normalize_title;
use crate::script::ScriptProfile;
use crate::section::SectionLabel;
use crate::signals::{
    clean_indicator_title, extract_bracketed_number, extract_inline_title,
    extract_section_label, is_image_only, is_index_page, is_non_hymn_slide, is_title_slide,
    slide_body_title, slide_heading_title, slide_hymn_number, slide_section_title,
    starts_with_section_keyword,
};
use crate::types::{ExtractedSlide, Presentation};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Slides with less text than this are treated as blank.
const NEAR_EMPTY_CHARS: usize = 5;

/// One occurrence of a hymn (or section) within one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HymnRun {
    /// Normalized numeral, 1 to 4 digits.
    pub hymn_number: Option<String>,

    pub title: Option<String>,

    pub section_label: Option<SectionLabel>,

    /// File name of the presentation the run came from.
    pub source_file: String,

    /// 1-based index of the first slide of the run.
    pub title_slide_index: usize,

    /// 1-based, strictly increasing. Gaps mark skipped image-only or
    /// transition slides.
    pub content_slide_indices: Vec<usize>,
}

impl HymnRun {
    pub fn total_slide_count(&self) -> usize {
        self.content_slide_indices.len()
    }

    /// First and last content slide.
    pub fn slide_range(&self) -> Option<(usize, usize)> {
        let first = *self.content_slide_indices.first()?;
        let last = *self.content_slide_indices.last()?;
        Some((first, last))
    }

    /// Deduplication key of the title, if there is one.
    pub fn normalized_title(&self) -> Option<String> {
        self.title
            .as_deref()
            .map(normalize_title)
            .filter(|t| !t.is_empty())
    }

    /// Primary identity: the number when present, else the normalized title.
    pub fn key(&self) -> Option<String> {
        self.hymn_number
            .clone()
            .or_else(|| self.normalized_title())
    }
}

/// The run being collected plus bookkeeping for the backfill pass.
#[derive(Debug)]
struct OpenRun {
    run: HymnRun,

    /// Opened by a section divider; the number is still unknown.
    awaiting_number: bool,

    /// Slides to try the heading extractor on if no title turns up.
    title_candidates: Vec<usize>,
}

#[derive(Debug)]
enum SegmenterState {
    Idle,
    Collecting(OpenRun),
}

/// Partitions slides into hymn runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSegmenter {
    profile: ScriptProfile,
}

impl RunSegmenter {
    pub fn new(profile: ScriptProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ScriptProfile {
        &self.profile
    }

    /// Every run in document order, titles backfilled and cleaned.
    ///
    /// Runs without content slides, and runs that end up with neither a
    /// number nor a title, are dropped. Not deduplicated.
    pub fn segment(&self, presentation: &Presentation) -> Vec<HymnRun> {
        let mut state = SegmenterState::Idle;
        let mut closed: Vec<OpenRun> = Vec::new();

        for slide in &presentation.slides {
            state = self.step(state, slide, &presentation.filename, &mut closed);
        }
        Self::close(state, &mut closed);

        closed
            .into_iter()
            .filter_map(|open| self.finish(open, presentation))
            .collect()
    }

    /// Segment and deduplicate: one run per hymn number, else per title.
    pub fn extract_hymns(&self, presentation: &Presentation) -> Vec<HymnRun> {
        deduplicate(self.segment(presentation))
    }

    fn step(
        &self,
        state: SegmenterState,
        slide: &ExtractedSlide,
        filename: &str,
        closed: &mut Vec<OpenRun>,
    ) -> SegmenterState {
        let index = slide.number;
        let text = slide.all_text();

        if text.trim().chars().count() < NEAR_EMPTY_CHARS || is_index_page(&text) {
            Self::close(state, closed);
            return SegmenterState::Idle;
        }

        let number = slide_hymn_number(slide);

        if number.is_none() && is_non_hymn_slide(&text) {
            Self::close(state, closed);
            return SegmenterState::Idle;
        }

        let transition =
            is_image_only(&text) || (is_title_slide(slide) && !self.profile.has_lyrics(&text));

        if let Some(number) = number {
            return match state {
                SegmenterState::Collecting(mut open)
                    if open.run.hymn_number.as_deref() == Some(number.as_str()) =>
                {
                    if !transition {
                        open.run.content_slide_indices.push(index);
                    }
                    if open.run.title.is_none() {
                        open.run.title = self.title_for(slide, &text);
                    }
                    SegmenterState::Collecting(open)
                }
                SegmenterState::Collecting(mut open)
                    if open.awaiting_number && open.run.content_slide_indices.is_empty() =>
                {
                    debug!("{filename}: slide {index} resolves section run to hymn {number}");
                    open.run.hymn_number = Some(number);
                    open.awaiting_number = false;
                    if !transition {
                        open.run.content_slide_indices.push(index);
                    }
                    SegmenterState::Collecting(open)
                }
                other => {
                    Self::close(other, closed);
                    SegmenterState::Collecting(self.open_numbered(slide, &text, number, filename, transition))
                }
            };
        }

        if let Some(section) = slide_section_title(slide) {
            Self::close(state, closed);
            debug!("{filename}: slide {index} opens section {}", section.label);
            return SegmenterState::Collecting(OpenRun {
                run: HymnRun {
                    hymn_number: None,
                    title: Some(section.title),
                    section_label: Some(section.label),
                    source_file: filename.to_string(),
                    title_slide_index: index,
                    content_slide_indices: Vec::new(),
                },
                awaiting_number: true,
                title_candidates: Vec::new(),
            });
        }

        let SegmenterState::Collecting(mut open) = state else {
            return SegmenterState::Idle;
        };

        if starts_with_section_keyword(&text, &self.profile) {
            Self::close(SegmenterState::Collecting(open), closed);
            return SegmenterState::Idle;
        }

        if !transition {
            open.run.content_slide_indices.push(index);
        }
        if open.awaiting_number {
            if let Some(number) = extract_bracketed_number(&text) {
                open.run.hymn_number = Some(number);
                open.awaiting_number = false;
            }
        }
        if open.run.title.is_none() {
            open.title_candidates.push(index);
        }

        SegmenterState::Collecting(open)
    }

    fn open_numbered(
        &self,
        slide: &ExtractedSlide,
        text: &str,
        number: String,
        filename: &str,
        transition: bool,
    ) -> OpenRun {
        let index = slide.number;
        let title = self.title_for(slide, text);
        let title_candidates = if title.is_none() { vec![index] } else { Vec::new() };

        OpenRun {
            run: HymnRun {
                hymn_number: Some(number),
                title,
                section_label: extract_section_label(text),
                source_file: filename.to_string(),
                title_slide_index: index,
                content_slide_indices: if transition { Vec::new() } else { vec![index] },
            },
            awaiting_number: false,
            title_candidates,
        }
    }

    /// Title from a numbered slide: heading patterns, lyric body, then the
    /// "Hymn N - Title" form.
    fn title_for(&self, slide: &ExtractedSlide, text: &str) -> Option<String> {
        slide_heading_title(slide, &self.profile)
            .or_else(|| slide_body_title(slide, &self.profile))
            .or_else(|| extract_inline_title(text))
    }

    fn close(state: SegmenterState, closed: &mut Vec<OpenRun>) {
        if let SegmenterState::Collecting(open) = state {
            if open.run.content_slide_indices.is_empty() {
                debug!(
                    "{}: dropping run at slide {} without content",
                    open.run.source_file, open.run.title_slide_index
                );
            } else {
                closed.push(open);
            }
        }
    }

    /// Backfill a missing title, clean indicator titles, drop keyless runs.
    fn finish(&self, open: OpenRun, presentation: &Presentation) -> Option<HymnRun> {
        let OpenRun {
            mut run,
            title_candidates,
            ..
        } = open;

        if run.title.is_none() && run.hymn_number.is_some() {
            run.title = title_candidates
                .iter()
                .filter_map(|&i| presentation.slide(i))
                .find_map(|slide| slide_heading_title(slide, &self.profile));
        }

        run.title = run.title.as_deref().and_then(clean_indicator_title);

        if run.hymn_number.is_none() && run.title.is_none() {
            debug!(
                "{}: dropping run at slide {} without number or title",
                run.source_file, run.title_slide_index
            );
            return None;
        }

        Some(run)
    }
}

/// Keep the first run per key, then drop later runs whose normalized title
/// was already kept under a different or missing number.
pub fn deduplicate(runs: Vec<HymnRun>) -> Vec<HymnRun> {
    let mut seen_keys = HashSet::new();
    let mut seen_titles = HashSet::new();
    let mut kept = Vec::new();

    for run in runs {
        let Some(key) = run.key() else { continue };
        if !seen_keys.insert(key) {
            continue;
        }

        if let Some(title) = run.normalized_title() {
            if !seen_titles.insert(title) {
                continue;
            }
        }

        kept.push(run);
    }

    kept
}
