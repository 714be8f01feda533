//! Liturgical section labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The liturgical role of a hymn run or a service plan line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionLabel {
    Opening,
    Thanksgiving,
    Offertory,
    Message,
    Confession,
    Communion,
    Closing,
    Dedication,
    /// Any other label, kept as written.
    Other(String),
}

impl SectionLabel {
    /// Parse a label as users and slide headers write it.
    ///
    /// Never fails: unknown text becomes [`SectionLabel::Other`].
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let collapsed = trimmed
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        match collapsed.as_str() {
            "opening" | "opening hymn" | "opening song" => Self::Opening,
            "thanksgiving" | "thanksgiving prayers" | "thanksgiving prayer" | "b/a" => {
                Self::Thanksgiving
            }
            "offertory" => Self::Offertory,
            "message" => Self::Message,
            "confession" => Self::Confession,
            "communion" | "holy communion" | "holy communion hymn" => Self::Communion,
            "closing" | "closing hymn" | "closing song" => Self::Closing,
            "dedication" => Self::Dedication,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    /// Canonical name.
    pub fn name(&self) -> &str {
        match self {
            Self::Opening => "Opening",
            Self::Thanksgiving => "Thanksgiving",
            Self::Offertory => "Offertory",
            Self::Message => "Message",
            Self::Confession => "Confession",
            Self::Communion => "Communion",
            Self::Closing => "Closing",
            Self::Dedication => "Dedication",
            Self::Other(label) => label,
        }
    }

    /// Label printed in slide title bars.
    pub fn slide_label(&self) -> &str {
        match self {
            Self::Thanksgiving => "ThanksGiving",
            other => other.name(),
        }
    }

    /// Label printed on the summary slide.
    pub fn summary_label(&self) -> &str {
        match self {
            Self::Thanksgiving => "B/A",
            other => other.name(),
        }
    }

    pub fn is_communion(&self) -> bool {
        matches!(self, Self::Communion)
    }
}

impl fmt::Display for SectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_labels() {
        assert_eq!(SectionLabel::parse("Opening"), SectionLabel::Opening);
        assert_eq!(SectionLabel::parse("opening  hymn"), SectionLabel::Opening);
        assert_eq!(SectionLabel::parse("B/A"), SectionLabel::Thanksgiving);
        assert_eq!(SectionLabel::parse("ThanksGiving"), SectionLabel::Thanksgiving);
        assert_eq!(SectionLabel::parse("Holy Communion"), SectionLabel::Communion);
        assert_eq!(SectionLabel::parse("closing"), SectionLabel::Closing);
    }

    #[test]
    fn test_parse_unknown_label_is_kept() {
        assert_eq!(
            SectionLabel::parse(" Choir Special "),
            SectionLabel::Other("Choir Special".to_string())
        );
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(SectionLabel::Thanksgiving.slide_label(), "ThanksGiving");
        assert_eq!(SectionLabel::Thanksgiving.summary_label(), "B/A");
        assert_eq!(SectionLabel::Communion.summary_label(), "Communion");
        assert_eq!(SectionLabel::Other("Choir".into()).to_string(), "Choir");
    }
}
