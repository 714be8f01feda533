//! PPTX file parser implementation.

use crate::package::Package;
use crate::shapes::{parse_shape, ShapeTree};
use hymn_core::{ExtractedSlide, Presentation, PresentationLoader, Result};
use log::debug;
use std::io::{Read, Seek};
use std::path::Path;

/// Parser for PPTX (Office Open XML) files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader.
    ///
    /// Media and embedded objects are never decompressed.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Presentation> {
        let package = Package::from_reader_filtered(reader, |name| {
            !name.starts_with("ppt/media/") && !name.starts_with("ppt/embeddings/")
        })?;
        self.parse_package(&package, filename)
    }

    /// Parse an already opened package.
    pub fn parse_package(&self, package: &Package, filename: &str) -> Result<Presentation> {
        let mut presentation = Presentation::new(filename);
        if let Some(size) = package.slide_size() {
            presentation.slide_size = size;
        }

        for (idx, slide_path) in package.slide_parts()?.iter().enumerate() {
            let xml = package.part_str(slide_path)?;
            presentation.add_slide(self.parse_slide(xml, idx + 1)?);
        }

        debug!("{}: {} slides", filename, presentation.slides.len());
        Ok(presentation)
    }

    /// Parse one slide part. Every shape-tree child becomes a shape, text or not.
    pub fn parse_slide(&self, xml: &str, slide_number: usize) -> Result<ExtractedSlide> {
        let tree = ShapeTree::parse(xml)?;
        let mut slide = ExtractedSlide::new(slide_number);

        for span in tree.shapes {
            slide.add_shape(parse_shape(&xml[span])?);
        }

        Ok(slide)
    }
}

impl PresentationLoader for PptxParser {
    fn load(&self, path: &Path) -> Result<Presentation> {
        let file = std::fs::File::open(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.parse(std::io::BufReader::new(file), &filename)
    }
}
