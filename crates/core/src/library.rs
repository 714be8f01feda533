//! Source library discovery.
//!
//! Collects every `.pptx` under the configured directories and splits them
//! into service recordings and reference compendiums.

use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// File-name substrings marking a reference compendium.
pub const DEFAULT_COMPENDIUM_MARKERS: &[&str] = &["KK", "Kristeeya"];

/// The presentations searched for hymns, in a stable order.
#[derive(Debug, Clone, Default)]
pub struct SourceLibrary {
    /// Recordings of past services, searched first.
    pub service_files: Vec<PathBuf>,

    /// Whole-hymnal decks, searched only when nothing else matched.
    pub compendiums: Vec<PathBuf>,
}

impl SourceLibrary {
    /// Walk `dirs` recursively for `.pptx` files.
    ///
    /// Missing directories and unreadable entries are logged and skipped.
    pub fn discover(dirs: &[PathBuf], markers: &[String]) -> Self {
        let mut files = Vec::new();

        for dir in dirs {
            if !dir.is_dir() {
                warn!("Library directory not found: {}", dir.display());
                continue;
            }

            let walker = WalkDir::new(dir)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| !is_hidden(e));

            for entry in walker {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_presentation(entry.path()) => {
                        files.push(entry.path().to_path_buf());
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Error accessing library entry: {}", e),
                }
            }
        }

        let library = Self::from_files(files, markers);
        debug!(
            "Library: {} service files, {} compendiums",
            library.service_files.len(),
            library.compendiums.len()
        );
        library
    }

    /// Sort and split an explicit file list.
    pub fn from_files(mut files: Vec<PathBuf>, markers: &[String]) -> Self {
        files.sort();
        files.dedup();

        let (compendiums, service_files) = files
            .into_iter()
            .partition(|path| is_compendium_file(path, markers));

        Self {
            service_files,
            compendiums,
        }
    }

    pub fn len(&self) -> usize {
        self.service_files.len() + self.compendiums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Service files followed by compendiums.
    pub fn all_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.service_files.iter().chain(self.compendiums.iter())
    }
}

/// Markers as owned strings, for callers without a config.
pub fn default_markers() -> Vec<String> {
    DEFAULT_COMPENDIUM_MARKERS
        .iter()
        .map(|m| m.to_string())
        .collect()
}

/// File name contains one of the markers (case-sensitive: "KK" must not
/// match words like "Bookkeeping").
pub fn is_compendium_file(path: &Path, markers: &[String]) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    markers.iter().any(|m| !m.is_empty() && name.contains(m.as_str()))
}

/// `.pptx` file that is not an Office lock file.
fn is_presentation(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if name.starts_with("~$") {
        return false;
    }
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pptx"))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_sort() {
        let library = SourceLibrary::from_files(
            vec![
                PathBuf::from("b/12 Jan 2025 HCS.pptx"),
                PathBuf::from("KK Hymns.pptx"),
                PathBuf::from("a/8 Feb 2026 HCS.pptx"),
                PathBuf::from("Kristeeya Keerthanangal.pptx"),
            ],
            &default_markers(),
        );

        assert_eq!(
            library.service_files,
            vec![
                PathBuf::from("a/8 Feb 2026 HCS.pptx"),
                PathBuf::from("b/12 Jan 2025 HCS.pptx"),
            ]
        );
        assert_eq!(library.compendiums.len(), 2);
        assert_eq!(library.all_files().count(), 4);
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let markers = default_markers();
        assert!(is_compendium_file(Path::new("x/KK.pptx"), &markers));
        assert!(!is_compendium_file(Path::new("x/Bookkeeping.pptx"), &markers));
    }

    #[test]
    fn test_presentation_filter() {
        assert!(is_presentation(Path::new("a/Service.PPTX")));
        assert!(!is_presentation(Path::new("a/~$Service.pptx")));
        assert!(!is_presentation(Path::new("a/Service.ppt")));
    }

    #[test]
    fn test_discover_skips_missing_dirs() {
        let library = SourceLibrary::discover(&[PathBuf::from("/nonexistent/hymn/library")], &[]);
        assert!(library.is_empty());
    }

    #[test]
    fn test_discover_walks_nested_dirs() {
        let root = std::env::temp_dir().join(format!("hymn-library-{}", std::process::id()));
        let nested = root.join("2025");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("HCS 1.pptx"), b"").unwrap();
        std::fs::write(nested.join("~$HCS 1.pptx"), b"").unwrap();
        std::fs::write(root.join("notes.txt"), b"").unwrap();

        let library = SourceLibrary::discover(&[root.clone()], &default_markers());
        assert_eq!(library.service_files, vec![nested.join("HCS 1.pptx")]);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
