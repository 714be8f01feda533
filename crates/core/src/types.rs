//! Domain types for presentation content as the heuristics see it.

use crate::geometry::{Rect, SlideSize};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An entire source presentation, flattened to text and geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    /// Original filename (without path).
    pub filename: String,

    /// Slide dimensions.
    pub slide_size: SlideSize,

    /// Slides in presentation order.
    pub slides: Vec<ExtractedSlide>,
}

impl Presentation {
    /// Create an empty presentation with default 4:3 slide size.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            slide_size: SlideSize::default(),
            slides: Vec::new(),
        }
    }

    /// Build a presentation where every slide is a list of plain text boxes.
    ///
    /// Slides are numbered from 1 in the order given.
    pub fn from_text_slides(filename: impl Into<String>, slides: &[&[&str]]) -> Self {
        let mut presentation = Self::new(filename);
        for texts in slides {
            let mut slide = ExtractedSlide::new(presentation.slides.len() + 1);
            for text in texts.iter() {
                slide.add_shape(SlideShape::text(*text));
            }
            presentation.add_slide(slide);
        }
        presentation
    }

    /// Add a slide to the presentation.
    pub fn add_slide(&mut self, slide: ExtractedSlide) {
        self.slides.push(slide);
    }

    /// Look up a slide by its 1-based number.
    pub fn slide(&self, number: usize) -> Option<&ExtractedSlide> {
        number.checked_sub(1).and_then(|i| self.slides.get(i))
    }
}

/// Reads a presentation file into the flattened model.
///
/// Implemented by the document backend; the engine never parses files itself.
pub trait PresentationLoader {
    fn load(&self, path: &Path) -> Result<Presentation>;
}

/// A single slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSlide {
    /// 1-based slide number.
    pub number: usize,

    /// Shapes in document (z) order.
    pub shapes: Vec<SlideShape>,
}

impl ExtractedSlide {
    /// Create a new slide with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            shapes: Vec::new(),
        }
    }

    pub fn add_shape(&mut self, shape: SlideShape) {
        self.shapes.push(shape);
    }

    /// Shapes that carry non-blank text.
    pub fn text_shapes(&self) -> impl Iterator<Item = &SlideShape> {
        self.shapes.iter().filter(|s| !s.text.trim().is_empty())
    }

    /// Trimmed text of every text shape joined with single spaces.
    pub fn all_text(&self) -> String {
        self.text_shapes()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First line of each text shape.
    pub fn first_lines(&self) -> Vec<&str> {
        self.text_shapes()
            .filter_map(|s| s.text.trim().lines().next())
            .map(str::trim)
            .collect()
    }

    /// Every paragraph of every text shape, in order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.shapes
            .iter()
            .flat_map(|s| s.paragraphs.iter().map(String::as_str))
    }

    /// Picture shapes with known bounds.
    pub fn pictures(&self) -> impl Iterator<Item = &Rect> {
        self.shapes
            .iter()
            .filter(|s| s.kind == ShapeKind::Picture)
            .filter_map(|s| s.bounds.as_ref())
    }
}

/// What kind of drawing element a shape is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Preset auto shape (rectangle, banner, ...).
    Shape,
    /// Plain text box.
    TextBox,
    /// Auto shape with rounded rectangle geometry.
    RoundedRect,
    /// Embedded picture.
    Picture,
    /// Connector, graphic frame or anything else without text.
    Other,
}

/// Text and geometry of one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideShape {
    /// Whole text frame, paragraphs joined with `\n`.
    pub text: String,

    /// Paragraph texts (each the concatenation of its runs).
    pub paragraphs: Vec<String>,

    /// Position and size, if the shape declares one.
    pub bounds: Option<Rect>,

    pub kind: ShapeKind,
}

impl SlideShape {
    /// A plain text box without position information.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        let paragraphs = text.split('\n').map(|p| p.to_string()).collect();
        Self {
            text,
            paragraphs,
            bounds: None,
            kind: ShapeKind::Shape,
        }
    }

    /// A text box at a known position.
    pub fn text_at(text: impl Into<String>, bounds: Rect) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::text(text)
        }
    }

    /// A picture at a known position.
    pub fn picture(bounds: Rect) -> Self {
        Self {
            text: String::new(),
            paragraphs: Vec::new(),
            bounds: Some(bounds),
            kind: ShapeKind::Picture,
        }
    }

    pub fn with_kind(mut self, kind: ShapeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
