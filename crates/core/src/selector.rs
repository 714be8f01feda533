//! Candidate selection across the source library.
//!
//! A [`GenerationSession`] lives for exactly one generated deck. It caches
//! loaded and segmented files and owns the used-range guard, so nothing
//! leaks between generations.

use crate::compendium::CompendiumSegmenter;
use crate::library::SourceLibrary;
use crate::normalize::{normalize_for_search, title_hint_phrase};
use crate::segment::{HymnRun, RunSegmenter};
use crate::types::{Presentation, PresentationLoader};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Slide spans already placed in the deck being generated, keyed by
/// `(file, first, last)` and mapped to the hymn that claimed them.
#[derive(Debug, Default)]
pub struct UsedSlideRanges {
    claims: HashMap<(PathBuf, usize, usize), String>,
}

impl UsedSlideRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// The span is claimed by a different hymn.
    ///
    /// The same hymn may reuse its own span: a number requested in two
    /// sections gets the same slides twice.
    pub fn conflicts(&self, file: &Path, first: usize, last: usize, claim: &str) -> bool {
        self.claims
            .get(&(file.to_path_buf(), first, last))
            .is_some_and(|owner| owner != claim)
    }

    pub fn claim(&mut self, file: &Path, first: usize, last: usize, claim: &str) {
        self.claims
            .insert((file.to_path_buf(), first, last), claim.to_string());
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// What a request is looking for.
#[derive(Debug, Clone, Copy, Default)]
pub struct SongQuery<'q> {
    pub hymn_number: Option<&'q str>,
    pub title_hint: Option<&'q str>,
}

impl<'q> SongQuery<'q> {
    pub fn number(number: &'q str) -> Self {
        Self {
            hymn_number: Some(number),
            title_hint: None,
        }
    }

    pub fn new(hymn_number: Option<&'q str>, title_hint: Option<&'q str>) -> Self {
        Self {
            hymn_number: hymn_number.filter(|n| !n.trim().is_empty()),
            title_hint: title_hint.filter(|h| !h.trim().is_empty()),
        }
    }
}

/// The run chosen for one request.
#[derive(Debug, Clone)]
pub struct SelectedSource {
    pub path: PathBuf,
    pub run: HymnRun,
    pub from_compendium: bool,
}

impl SelectedSource {
    pub fn title(&self) -> Option<&str> {
        self.run.title.as_deref()
    }

    pub fn content_slide_indices(&self) -> &[usize] {
        &self.run.content_slide_indices
    }
}

/// A loaded file and its runs; `None` marks a file that failed to load.
type CachedFile = Option<(Presentation, Vec<HymnRun>)>;

/// State for one generation: loaded files, runs and the used-range guard.
pub struct GenerationSession<'a> {
    loader: &'a dyn PresentationLoader,
    library: &'a SourceLibrary,
    segmenter: RunSegmenter,
    compendium: CompendiumSegmenter,
    cache: HashMap<PathBuf, CachedFile>,
    used: UsedSlideRanges,
}

impl<'a> GenerationSession<'a> {
    pub fn new(
        loader: &'a dyn PresentationLoader,
        library: &'a SourceLibrary,
        segmenter: RunSegmenter,
        compendium: CompendiumSegmenter,
    ) -> Self {
        Self {
            loader,
            library,
            segmenter,
            compendium,
            cache: HashMap::new(),
            used: UsedSlideRanges::new(),
        }
    }

    pub fn used_ranges(&self) -> &UsedSlideRanges {
        &self.used
    }

    /// A previously loaded source presentation.
    pub fn presentation(&self, path: &Path) -> Option<&Presentation> {
        self.cache
            .get(path)
            .and_then(|c| c.as_ref())
            .map(|(p, _)| p)
    }

    /// Load and segment a file once; failures are logged and remembered.
    fn ensure_loaded(&mut self, path: &Path, compendium: bool) {
        if self.cache.contains_key(path) {
            return;
        }

        let entry = match self.loader.load(path) {
            Ok(presentation) => {
                let runs = if compendium {
                    self.compendium.segment(&presentation)
                } else {
                    self.segmenter.segment(&presentation)
                };
                debug!("{}: {} runs", path.display(), runs.len());
                Some((presentation, runs))
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            }
        };
        self.cache.insert(path.to_path_buf(), entry);
    }

    /// Choose the best run for a request and claim its slide range.
    ///
    /// Service recordings are searched first; the largest matching run wins,
    /// earlier files winning ties. Compendiums are searched by number only
    /// when no recording matched.
    pub fn find_best_source(&mut self, query: SongQuery<'_>) -> Option<SelectedSource> {
        let phrase = query.title_hint.and_then(title_hint_phrase);
        let claim = match (query.hymn_number, phrase.as_deref()) {
            (Some(number), _) => number.to_string(),
            (None, Some(phrase)) => format!("title:{phrase}"),
            (None, None) => return None,
        };

        let library = self.library;
        let mut best: Option<SelectedSource> = None;

        for path in &library.service_files {
            self.ensure_loaded(path, false);
            let Some(Some((presentation, runs))) = self.cache.get(path) else {
                continue;
            };

            for run in runs {
                let number_match = query
                    .hymn_number
                    .is_some_and(|n| run.hymn_number.as_deref() == Some(n));
                let title_match = phrase
                    .as_deref()
                    .is_some_and(|p| run_contains_phrase(presentation, run, p));
                if !(number_match || title_match) {
                    continue;
                }

                let Some((first, last)) = run.slide_range() else {
                    continue;
                };
                if self.used.conflicts(path, first, last, &claim) {
                    debug!(
                        "{}: slides {first}-{last} already used by another hymn",
                        path.display()
                    );
                    continue;
                }

                let larger = best
                    .as_ref()
                    .map_or(true, |b| run.total_slide_count() > b.run.total_slide_count());
                if larger {
                    best = Some(SelectedSource {
                        path: path.clone(),
                        run: run.clone(),
                        from_compendium: false,
                    });
                }
            }
        }

        if best.is_none() {
            if let Some(number) = query.hymn_number {
                best = self.search_compendiums(number, &claim);
            }
        }

        if let Some(found) = &best {
            if let Some((first, last)) = found.run.slide_range() {
                self.used.claim(&found.path, first, last, &claim);
            }
            info!(
                "Found {} in {} ({} slides)",
                found.run.hymn_number.as_deref().unwrap_or(claim.as_str()),
                found.path.display(),
                found.run.total_slide_count()
            );
        }

        best
    }

    fn search_compendiums(&mut self, number: &str, claim: &str) -> Option<SelectedSource> {
        let library = self.library;

        for path in &library.compendiums {
            self.ensure_loaded(path, true);
            let Some(Some((_, runs))) = self.cache.get(path) else {
                continue;
            };

            let Some(run) = runs
                .iter()
                .find(|r| r.hymn_number.as_deref() == Some(number))
            else {
                continue;
            };
            let Some((first, last)) = run.slide_range() else {
                continue;
            };
            if self.used.conflicts(path, first, last, claim) {
                continue;
            }

            return Some(SelectedSource {
                path: path.clone(),
                run: run.clone(),
                from_compendium: true,
            });
        }
        None
    }
}

/// The hint phrase appears in the run's title or in the first line of any
/// text box on the run's slides.
fn run_contains_phrase(presentation: &Presentation, run: &HymnRun, phrase: &str) -> bool {
    if run
        .title
        .as_deref()
        .is_some_and(|t| normalize_for_search(t).contains(phrase))
    {
        return true;
    }

    std::iter::once(run.title_slide_index)
        .chain(run.content_slide_indices.iter().copied())
        .filter_map(|i| presentation.slide(i))
        .flat_map(|slide| slide.first_lines())
        .any(|line| normalize_for_search(line).contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::script::ScriptProfile;
    use crate::types::{ExtractedSlide, SlideShape};
    use crate::Result;

    /// Loader over in-memory presentations keyed by path.
    struct MemoryLoader(HashMap<PathBuf, Presentation>);

    impl PresentationLoader for MemoryLoader {
        fn load(&self, path: &Path) -> Result<Presentation> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| Error::PresentationParse(format!("no such deck {}", path.display())))
        }
    }

    const AMAZING: &str = "Amazing grace how sweet the sound";
    const ABIDE: &str = "Abide with me fast falls the eventide";

    fn hymn_deck(name: &str, hymns: &[(&str, &str, usize)]) -> Presentation {
        let mut p = Presentation::new(name);
        for (number, opening, count) in hymns {
            for _ in 0..*count {
                let mut slide = ExtractedSlide::new(p.slides.len() + 1);
                slide.add_shape(SlideShape::text(format!("Hymn No {number}")));
                slide.add_shape(SlideShape::text(format!(
                    "{opening}\nwith voices raised in joyful praise\nto the Lord of all creation"
                )));
                p.add_slide(slide);
            }
        }
        p
    }

    fn setup(decks: Vec<Presentation>) -> (MemoryLoader, SourceLibrary) {
        let mut map = HashMap::new();
        let mut files = Vec::new();
        for deck in decks {
            let path = PathBuf::from(&deck.filename);
            files.push(path.clone());
            map.insert(path, deck);
        }
        let library = SourceLibrary::from_files(files, &crate::library::default_markers());
        (MemoryLoader(map), library)
    }

    fn session<'a>(loader: &'a MemoryLoader, library: &'a SourceLibrary) -> GenerationSession<'a> {
        GenerationSession::new(
            loader,
            library,
            RunSegmenter::new(ScriptProfile::english()),
            CompendiumSegmenter::default(),
        )
    }

    #[test]
    fn test_largest_run_wins() {
        let (loader, library) = setup(vec![
            hymn_deck("a.pptx", &[("42", AMAZING, 3)]),
            hymn_deck("b.pptx", &[("42", AMAZING, 6)]),
        ]);
        let mut session = session(&loader, &library);

        let found = session.find_best_source(SongQuery::number("42")).unwrap();
        assert_eq!(found.path, PathBuf::from("b.pptx"));
        assert_eq!(found.content_slide_indices().len(), 6);
        assert!(!found.from_compendium);
    }

    #[test]
    fn test_same_hymn_may_reuse_its_range() {
        let (loader, library) = setup(vec![hymn_deck("a.pptx", &[("42", AMAZING, 4)])]);
        let mut session = session(&loader, &library);

        let first = session.find_best_source(SongQuery::number("42")).unwrap();
        let second = session.find_best_source(SongQuery::number("42")).unwrap();
        assert_eq!(first.content_slide_indices(), second.content_slide_indices());
        assert_eq!(session.used_ranges().len(), 1);
    }

    #[test]
    fn test_different_hymn_cannot_take_claimed_range() {
        let (loader, library) = setup(vec![hymn_deck("a.pptx", &[("42", AMAZING, 4)])]);
        let mut session = session(&loader, &library);

        assert!(session.find_best_source(SongQuery::number("42")).is_some());

        // Number 99 exists nowhere, but its title hint matches hymn 42's slides
        let noisy = SongQuery::new(Some("99"), Some("Amazing Grace"));
        assert!(session.find_best_source(noisy).is_none());
    }

    #[test]
    fn test_title_hint_alone() {
        let (loader, library) = setup(vec![hymn_deck("a.pptx", &[("42", AMAZING, 2), ("7", ABIDE, 3)])]);
        let mut session = session(&loader, &library);

        let found = session
            .find_best_source(SongQuery::new(None, Some("Abide with me")))
            .unwrap();
        assert_eq!(found.run.hymn_number.as_deref(), Some("7"));
    }

    #[test]
    fn test_missing_hymn_and_unloadable_files() {
        let (loader, mut library) = setup(vec![hymn_deck("a.pptx", &[("42", AMAZING, 2)])]);
        library.service_files.push(PathBuf::from("broken.pptx"));
        let mut session = session(&loader, &library);

        assert!(session.find_best_source(SongQuery::number("500")).is_none());
        assert!(session.find_best_source(SongQuery::new(None, None)).is_none());
        assert!(session.presentation(Path::new("broken.pptx")).is_none());
        assert!(session.presentation(Path::new("a.pptx")).is_some());
    }

    #[test]
    fn test_compendium_is_last_resort() {
        let mut kk = Presentation::new("KK Hymns.pptx");
        let mut slide = ExtractedSlide::new(1);
        slide.add_shape(SlideShape::text("143"));
        slide.add_shape(SlideShape::text("Yeshu nallavan avan vallabhan"));
        slide.add_shape(SlideShape::text("Hymn #143 – 1 of 1"));
        kk.add_slide(slide);

        let (loader, library) = setup(vec![hymn_deck("a.pptx", &[("42", AMAZING, 2)]), kk]);
        let mut session = session(&loader, &library);

        let found = session.find_best_source(SongQuery::number("143")).unwrap();
        assert!(found.from_compendium);
        assert_eq!(found.path, PathBuf::from("KK Hymns.pptx"));

        let regular = session.find_best_source(SongQuery::number("42")).unwrap();
        assert!(!regular.from_compendium);
    }
}
