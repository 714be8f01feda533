//! Plain text outline of an assembled deck.
//!
//! One block per slide, blocks separated by a blank line:
//!
//! ```text
//! Song list
//! Opening
//! 91 Praise to the Lord the Almighty
//!
//! Opening
//! Hymn No 91
//! Praise to the Lord the Almighty
//! ```

use crate::assembly::{AssembledDeck, AssembledSlide};
use crate::normalize::TextNormalizer;

/// Formatter for deck outlines.
#[derive(Debug, Clone, Default)]
pub struct OutlineFormatter {
    /// Prefix each block with its slide number.
    numbered: bool,

    /// Strip punctuation from cloned lyric lines.
    normalizer: Option<TextNormalizer>,
}

impl OutlineFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slide_numbers(mut self, numbered: bool) -> Self {
        self.numbered = numbered;
        self
    }

    /// Normalize lyric lines the way song lyric imports expect.
    pub fn with_plain_lyrics(mut self, plain: bool) -> Self {
        self.normalizer = plain.then(TextNormalizer::new);
        self
    }

    /// Lines of one slide block.
    pub fn block(&self, number: usize, slide: &AssembledSlide) -> Vec<String> {
        let mut lines = slide.lines();

        if let (Some(normalizer), AssembledSlide::Content(_)) = (&self.normalizer, slide) {
            lines = lines
                .iter()
                .flat_map(|l| normalizer.normalize_to_lines(l))
                .collect();
        }

        if self.numbered {
            lines.insert(0, format!("[{number}]"));
        }
        lines
    }

    pub fn format(&self, deck: &AssembledDeck) -> String {
        deck.slides
            .iter()
            .enumerate()
            .map(|(i, slide)| self.block(i + 1, slide).join("\n"))
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Format, adding a trailing newline.
    pub fn format_with_newline(&self, deck: &AssembledDeck) -> String {
        let formatted = self.format(deck);
        if formatted.is_empty() {
            formatted
        } else {
            format!("{}\n", formatted)
        }
    }
}
