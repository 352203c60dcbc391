//! Core domain types for bibtree: category paths and cited items.

use serde::{Deserialize, Serialize};

/// Separator between the segments of a category path.
pub const PATH_DELIMITER: &str = "::";

/// Location assigned to entries whose source supplied no category.
pub const NO_CATEGORY: &str = "no-category";

// ---------------------------------------------------------------------------
// Category paths
// ---------------------------------------------------------------------------

/// Number of delimiters in `path`; top-level categories have depth 0.
pub fn path_depth(path: &str) -> usize {
    path.matches(PATH_DELIMITER).count()
}

/// The final segment of `path` (the path itself for top-level categories).
pub fn last_segment(path: &str) -> &str {
    path.rsplit(PATH_DELIMITER).next().unwrap_or(path)
}

/// Whether `ancestor` equals `path` or is a prefix of it ending on a segment
/// boundary. `aug` covers `aug::crop` but not `augmentations`.
pub fn is_ancestor_or_self(ancestor: &str, path: &str) -> bool {
    match path.strip_prefix(ancestor) {
        Some("") => true,
        Some(rest) => rest.starts_with(PATH_DELIMITER),
        None => false,
    }
}

/// The parent path of `path`, or `None` for top-level categories.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(PATH_DELIMITER).map(|idx| &path[..idx])
}

/// Split a raw comma-separated location field into individual raw paths.
///
/// Pieces are trimmed and blank pieces dropped; an absent or blank field
/// yields the single [`NO_CATEGORY`] location.
pub fn split_locations(raw: Option<&str>) -> Vec<String> {
    let paths: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();

    if paths.is_empty() {
        vec![NO_CATEGORY.to_string()]
    } else {
        paths
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A bibliography entry as produced by an entry source, before its
/// locations are resolved against the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Bibliography key, used as the document cross-reference.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Comma-separated raw category paths (abbreviations allowed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// An immutable, ingested bibliography entry.
///
/// One item may be shared by several category buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CitedItem {
    /// Bibliography key.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Canonical category paths, in the order the source listed them.
    pub location: Vec<String>,
}

impl CitedItem {
    /// Whether the item was filed under the default location only.
    pub fn is_uncategorized(&self) -> bool {
        self.location.len() == 1 && self.location[0] == NO_CATEGORY
    }

    /// One enumerated-list entry: the title followed by a citation marker.
    pub fn to_latex(&self) -> String {
        format!("\\item {} \\cite{{{}}}", self.title, self.id)
    }
}

impl std::fmt::Display for CitedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.title, self.id)
    }
}
