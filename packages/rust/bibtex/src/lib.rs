//! BibTeX entry source for bibtree.
//!
//! Reads `.bib` files and yields [`RawEntry`] values: the citation key, the
//! title, and the raw category paths taken from the `keywords` field.

mod parser;

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, instrument, warn};

use bibtree_shared::{BibtreeError, RawEntry, Result};

pub use parser::BibEntry;

/// Field holding an entry's comma-separated category paths.
pub const LOCATION_FIELD: &str = "keywords";

/// Parse BibTeX source into its entries, in source order.
pub fn parse_bibtex(content: &str) -> Result<Vec<BibEntry>> {
    parser::parse_bibtex(content)
}

impl BibEntry {
    /// Reduce the entry to what the category map needs.
    pub fn into_raw_entry(mut self) -> Result<RawEntry> {
        let title = self.fields.remove("title").ok_or_else(|| {
            BibtreeError::validation(format!(
                "entry '{}' (line {}) has no title",
                self.key, self.line
            ))
        })?;
        let location = self
            .fields
            .remove(LOCATION_FIELD)
            .filter(|loc| !loc.trim().is_empty());

        Ok(RawEntry {
            id: self.key,
            title,
            location,
        })
    }
}

/// Parse BibTeX source into raw entries.
pub fn read_entries(content: &str) -> Result<Vec<RawEntry>> {
    let entries = parse_bibtex(content)?;

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if !seen.insert(entry.key.as_str()) {
            warn!(key = %entry.key, line = entry.line, "duplicate citation key");
        }
    }

    entries.into_iter().map(BibEntry::into_raw_entry).collect()
}

/// Read and parse a `.bib` file into raw entries.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_entries(path: &Path) -> Result<Vec<RawEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| BibtreeError::io(path, e))?;
    let entries = read_entries(&content)?;
    debug!(entries = entries.len(), "bibliography loaded");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_entries_from_fixture() {
        let entries = load_entries(Path::new("../../../fixtures/bib/bibliography.fixture.bib"))
            .expect("load fixture");
        assert_eq!(entries.len(), 5);

        assert_eq!(entries[2].id, "zhang2018mixup");
        assert_eq!(entries[2].title, "mixup: Beyond Empirical Risk Minimization");
        assert_eq!(entries[2].location.as_deref(), Some("aug::mixing, reg"));

        assert_eq!(entries[4].id, "lecun2015survey");
        assert_eq!(entries[4].location, None);
    }

    #[test]
    fn blank_keywords_become_none() {
        let entries = read_entries("@misc{k, title = {T}, keywords = { }}").unwrap();
        assert_eq!(entries[0].location, None);
    }

    #[test]
    fn missing_title_is_rejected() {
        let err = read_entries("@misc{untitled, year = 2020}").unwrap_err();
        assert!(matches!(err, BibtreeError::Validation { .. }));
        assert!(err.to_string().contains("untitled"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_entries(Path::new("/nonexistent/bibtree.bib")).unwrap_err();
        assert!(matches!(err, BibtreeError::Io { .. }));
    }
}
