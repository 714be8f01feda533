//! Core domain types and algorithms for hymn slide identification,
//! extraction and service deck assembly.
//!
//! Source decks are read through a [`PresentationLoader`], split into
//! [`HymnRun`]s, matched against a [`ServicePlan`] and assembled into an
//! [`AssembledDeck`] that a [`DeckWriter`] turns into a file.

pub mod assembly;
pub mod compendium;
pub mod config;
pub mod error;
pub mod geometry;
pub mod library;
pub mod normalize;
pub mod outline;
pub mod plan;
pub mod report;
pub mod script;
pub mod section;
pub mod segment;
pub mod selector;
pub mod signals;
pub mod types;

pub use assembly::{
    assemble, backfill_summary, AssembledDeck, AssembledSlide, AssemblyOptions, ContentSlide,
    DeckWriter, ShapeAction, SummaryEntry, TitleSlide,
};
pub use compendium::{CompendiumSegmenter, CompendiumTitles};
pub use config::Config;
pub use error::{Error, Result};
pub use geometry::{Rect, SlideSize};
pub use library::SourceLibrary;
pub use normalize::TextNormalizer;
pub use outline::OutlineFormatter;
pub use plan::{ServicePlan, ServiceSongRequest};
pub use report::{HymnReport, ReportRow};
pub use script::ScriptProfile;
pub use section::SectionLabel;
pub use segment::{HymnRun, RunSegmenter};
pub use selector::{GenerationSession, SelectedSource, SongQuery, UsedSlideRanges};
pub use types::{ExtractedSlide, Presentation, PresentationLoader, ShapeKind, SlideShape};
