//! Index of downloaded `.m4b` files and catalog-to-file resolution.
//!
//! Libation's export carries no file paths, so each catalog entry is matched
//! against lowercased file stems and relative paths found under the books
//! folder.

use std::path::{Path, PathBuf};

use bf_core::CatalogEntry;
use bf_split::sanitize_filename;
use walkdir::WalkDir;

/// Words this short are too common to identify a book.
const MIN_WORD_LEN: usize = 4;

#[derive(Debug, Clone)]
struct IndexedFile {
    stem: String,
    rel_path: String,
    path: PathBuf,
}

impl IndexedFile {
    fn keys(&self) -> [&str; 2] {
        [&self.stem, &self.rel_path]
    }

    fn any_key(&self, pred: impl Fn(&str) -> bool) -> bool {
        self.keys().into_iter().any(pred)
    }
}

/// All `.m4b` files under a books folder, in stable path order.
#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    files: Vec<IndexedFile>,
}

impl LibraryIndex {
    /// Walk `root` recursively. Unreadable entries are logged and skipped.
    pub fn scan(root: &Path) -> Self {
        let mut files = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_m4b(entry.path()) {
                continue;
            }

            let path = entry.path().to_path_buf();
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let rel_path = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_lowercase();

            files.push(IndexedFile {
                stem,
                rel_path,
                path,
            });
        }

        tracing::debug!("Indexed {} .m4b file(s) under {:?}", files.len(), root);
        Self { files }
    }

    /// Number of distinct files found.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Find the source file for a catalog entry.
    ///
    /// Strategies, strongest first, each tried across every file before the
    /// next: title (raw or sanitized) contained in a key; ASIN contained in
    /// a key; a significant title word and a significant author word both
    /// contained in the same key.
    pub fn resolve(&self, entry: &CatalogEntry) -> Option<&Path> {
        let title = entry
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        if let Some(title) = &title {
            let safe = sanitize_filename(title);
            if let Some(hit) = self.find(|k| k.contains(title.as_str()) || k.contains(&safe)) {
                return Some(hit);
            }
        }

        if let Some(asin) = entry.product_id.as_deref().filter(|a| !a.is_empty()) {
            let asin = asin.to_lowercase();
            if let Some(hit) = self.find(|k| k.contains(&asin)) {
                return Some(hit);
            }
        }

        let title_words = significant_words(title.as_deref().unwrap_or(""));
        let author_words: Vec<String> = entry
            .all_authors()
            .iter()
            .flat_map(|a| significant_words(&a.to_lowercase()))
            .collect();
        if title_words.is_empty() || author_words.is_empty() {
            return None;
        }

        self.files
            .iter()
            .find(|f| {
                f.any_key(|k| {
                    title_words.iter().any(|w| k.contains(w.as_str()))
                        && author_words.iter().any(|w| k.contains(w.as_str()))
                })
            })
            .map(|f| f.path.as_path())
    }

    fn find(&self, pred: impl Fn(&str) -> bool) -> Option<&Path> {
        self.files
            .iter()
            .find(|f| f.any_key(&pred))
            .map(|f| f.path.as_path())
    }
}

fn is_m4b(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("m4b"))
}

fn significant_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .map(str::to_string)
        .collect()
}
