//! Library catalog records as exported by Libation.
//!
//! The export is a JSON array of objects with PascalCase keys. Only the
//! fields the splitter needs are modeled; everything else is ignored.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Title used when an export record carries none.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Author used when no author field resolves.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Download/decrypt state of a book in the Libation library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookStatus {
    Liberated,
    NotLiberated,
    Error,
    PartialDownload,
    #[serde(other)]
    Unknown,
}

/// `AuthorNames` is exported either as one comma-joined string or as a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorNames {
    Many(Vec<String>),
    One(String),
}

/// One book from the exported catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "AuthorNames", default)]
    pub author_names: Option<AuthorNames>,
    #[serde(rename = "Author", default)]
    pub author: Option<String>,
    #[serde(rename = "AudibleProductId", default)]
    pub product_id: Option<String>,
    #[serde(rename = "LengthInMinutes", default)]
    pub length_minutes: Option<f64>,
    #[serde(rename = "BookStatus", default)]
    pub status: Option<BookStatus>,
}

impl CatalogEntry {
    /// Build a minimal entry, used for files processed outside a catalog.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Builder: set a single author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author_names = Some(AuthorNames::One(author.into()));
        self
    }

    /// The book title, or [`UNKNOWN_TITLE`].
    pub fn title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => UNKNOWN_TITLE,
        }
    }

    /// The author written into output metadata.
    ///
    /// First element of an `AuthorNames` list, else the `AuthorNames`
    /// string, else `Author`, else [`UNKNOWN_AUTHOR`].
    pub fn resolved_author(&self) -> &str {
        let from_names = match &self.author_names {
            Some(AuthorNames::Many(list)) => list.first().map(String::as_str),
            Some(AuthorNames::One(s)) => Some(s.as_str()),
            None => None,
        };

        from_names
            .filter(|s| !s.is_empty())
            .or_else(|| self.author.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(UNKNOWN_AUTHOR)
    }

    /// Every author string the record mentions, for searching.
    pub fn all_authors(&self) -> Vec<&str> {
        let mut out: Vec<&str> = match &self.author_names {
            Some(AuthorNames::Many(list)) => list.iter().map(String::as_str).collect(),
            Some(AuthorNames::One(s)) => vec![s.as_str()],
            None => Vec::new(),
        };
        if let Some(author) = self.author.as_deref() {
            out.push(author);
        }
        out.retain(|s| !s.is_empty());
        out
    }

    pub fn status(&self) -> BookStatus {
        self.status.unwrap_or(BookStatus::Unknown)
    }

    pub fn is_liberated(&self) -> bool {
        self.status() == BookStatus::Liberated
    }

    /// Case-insensitive substring match against any author.
    pub fn matches_author(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.all_authors()
            .iter()
            .any(|a| a.to_lowercase().contains(&needle))
    }

    /// Catalog duration in seconds, `0.0` when unknown.
    pub fn catalog_secs(&self) -> f64 {
        self.length_minutes
            .filter(|m| m.is_finite() && *m > 0.0)
            .map(|m| m * 60.0)
            .unwrap_or(0.0)
    }
}

/// Parse a Libation JSON export.
pub fn parse_catalog(json: &str) -> Result<Vec<CatalogEntry>> {
    serde_json::from_str(json).map_err(|e| Error::Catalog(format!("invalid export JSON: {e}")))
}
