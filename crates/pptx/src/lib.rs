//! PPTX (Office Open XML) backend: reads hymn decks and writes service decks.
//!
//! A .pptx is a ZIP archive of XML parts. Reading goes through
//! [`PptxParser`], writing through [`PptxDeckWriter`], both over an
//! in-memory [`Package`].

mod drawing;
pub mod package;
pub mod parser;
mod shapes;
pub mod writer;
mod xml;

#[cfg(test)]
mod fixtures;

pub use package::Package;
pub use parser::PptxParser;
pub use writer::{DeckImages, PptxDeckWriter, SourceDecks};
