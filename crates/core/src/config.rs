//! `hymnal.toml` configuration.
//!
//! Looked up in order: an explicit path, the `HYMNAL_CONFIG` environment
//! variable, then `./hymnal.toml`. With no file every key has a default.
//! Relative paths in a file are taken relative to that file's directory.
//!
//! ```toml
//! library_dirs = ["Holy Communion Services - Slides/English HCS"]
//! template = "templates/8 Feb 2026.pptx"
//! compendium_titles = "kk_hymn_mapping.json"
//! images_dir = "images"
//! language = "English"
//! ```

use crate::assembly::{AssemblyOptions, DEFAULT_CHURCH_NAME, DEFAULT_SERVICE_NAME};
use crate::compendium::CompendiumTitles;
use crate::error::Error;
use crate::library::{SourceLibrary, DEFAULT_COMPENDIUM_MARKERS};
use crate::script::ScriptProfile;
use crate::Result;
use log::{info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "HYMNAL_CONFIG";

/// Config file looked for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hymnal.toml";

pub const HOLY_COMMUNION_IMAGE: &str = "holy_communion.jpg";
pub const QR_CODE_IMAGE: &str = "qr_code.png";

/// Optional background behind section title slides.
pub const TITLE_BACKGROUND_IMAGE: &str = "title_background.jpg";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories searched recursively for source decks.
    pub library_dirs: Vec<PathBuf>,

    /// Base deck every generated service is cloned from.
    pub template: PathBuf,

    /// File-name substrings marking a reference compendium.
    pub compendium_markers: Vec<String>,

    /// JSON number → title table for the compendium.
    pub compendium_titles: Option<PathBuf>,

    /// Holds the communion image and the offertory QR code.
    pub images_dir: PathBuf,

    /// Where generated decks are written.
    pub output_dir: PathBuf,

    /// Script profile used when a plan names no language.
    pub language: String,

    pub church_name: String,
    pub service_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_dirs: vec![PathBuf::from(".")],
            template: PathBuf::from("template.pptx"),
            compendium_markers: DEFAULT_COMPENDIUM_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            compendium_titles: None,
            images_dir: PathBuf::from("images"),
            output_dir: PathBuf::from("."),
            language: "English".to_string(),
            church_name: DEFAULT_CHURCH_NAME.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read a config file, resolving its relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    /// Find and load the config file, or fall back to defaults.
    ///
    /// An explicit path or `HYMNAL_CONFIG` that does not exist is an error;
    /// a missing `./hymnal.toml` is not.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Config: {}", path.display());
            return Self::load(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            let path = PathBuf::from(path);
            info!("Config from {CONFIG_ENV}: {}", path.display());
            return Self::load(&path);
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            info!("Config: {}", local.display());
            return Self::load(local);
        }

        info!("No {DEFAULT_CONFIG_FILE} found, using defaults");
        Ok(Self::default())
    }

    fn relative_to(mut self, base: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.library_dirs.iter_mut().for_each(join);
        join(&mut self.template);
        self.compendium_titles.iter_mut().for_each(join);
        join(&mut self.images_dir);
        join(&mut self.output_dir);
        self
    }

    /// The template path, which must exist.
    pub fn template_path(&self) -> Result<&Path> {
        if self.template.is_file() {
            Ok(&self.template)
        } else {
            Err(Error::TemplateNotFound(self.template.clone()))
        }
    }

    pub fn library(&self) -> SourceLibrary {
        SourceLibrary::discover(&self.library_dirs, &self.compendium_markers)
    }

    /// Profile for a plan's language, or the configured default.
    pub fn profile(&self, plan_language: Option<&str>) -> ScriptProfile {
        ScriptProfile::for_language(plan_language.unwrap_or(&self.language))
    }

    /// The compendium title table; empty when unset or unreadable.
    pub fn compendium_titles(&self) -> CompendiumTitles {
        let Some(path) = &self.compendium_titles else {
            return CompendiumTitles::default();
        };
        match CompendiumTitles::load(path) {
            Ok(titles) => {
                info!("Loaded {} compendium titles from {}", titles.len(), path.display());
                titles
            }
            Err(e) => {
                warn!("Compendium titles unavailable ({}): {e}", path.display());
                CompendiumTitles::default()
            }
        }
    }

    pub fn assembly_options(&self, service_date: Option<String>) -> AssemblyOptions {
        AssemblyOptions {
            church_name: self.church_name.clone(),
            service_name: self.service_name.clone(),
            service_date,
        }
    }

    /// An image from `images_dir`, if present.
    pub fn image(&self, name: &str) -> Option<PathBuf> {
        let path = self.images_dir.join(name);
        path.is_file().then_some(path)
    }
}
