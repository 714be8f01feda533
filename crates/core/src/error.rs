//! Error types for hymn extraction and service assembly.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading source decks or assembling a service.
///
/// Only [`Error::TemplateNotFound`] is fatal to a whole generation; every
/// other variant is raised for a single file, line or shape and the caller
/// logs it and moves on.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read a file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to interpret the structure of a presentation.
    #[error("Presentation parsing error: {0}")]
    PresentationParse(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML parsing or writing error (for PPTX).
    #[error("XML error: {0}")]
    Xml(String),

    /// The base template deck every generated service is cloned from is missing.
    #[error("Template presentation not found at '{}'. Place the base service deck there or set `template` in hymnal.toml", .0.display())]
    TemplateNotFound(PathBuf),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The curated compendium title table could not be loaded.
    #[error("Title lookup error: {0}")]
    Lookup(String),

    /// Failed to write the assembled output.
    #[error("Write error: {0}")]
    Write(String),
}
