//! End-to-end pipelines: taxonomy + bibliography → category map → document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use bibtree_shared::{BibtreeError, CitedItem, DocumentConfig, RawEntry, Result};
use bibtree_taxonomy::{AbbreviationTable, CategoryMap, Lookup};

use crate::assembler::{self, DocumentMeta};
use crate::sections::{self, RenderOptions};

/// Configuration for [`build_document`].
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Bibliography (`.bib`) file.
    pub bibfile: PathBuf,
    /// Taxonomy description (`.json`) file.
    pub taxonomy: PathBuf,
    /// Output `.tex` file.
    pub output: PathBuf,
    /// Preamble and trailer settings.
    pub document: DocumentConfig,
    /// Extra abbreviations merged over the built-in table.
    pub abbreviations: BTreeMap<String, String>,
}

/// Result of a successful build.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildReport {
    /// The written document.
    pub document: DocumentMeta,
    /// Number of bibliography entries ingested.
    pub entry_count: usize,
    /// Number of declared categories (one section each).
    pub section_count: usize,
    /// When the build finished.
    pub completed_at: DateTime<Utc>,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each entry is filed.
    fn entry_ingested(&self, id: &str, current: usize, total: usize);
    /// Called when the build completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn entry_ingested(&self, _id: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &BuildReport) {}
}

/// Options for [`query`].
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub lookup: Lookup,
    /// Keep entries whose only location is the default `no-category`.
    pub include_uncategorized: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            lookup: Lookup::Multilevel,
            include_uncategorized: false,
        }
    }
}

/// Built-in abbreviations extended with configured extras.
pub fn abbreviation_table(extra: &BTreeMap<String, String>) -> Result<AbbreviationTable> {
    AbbreviationTable::builtin_with(extra)
}

/// Read a taxonomy file and create an empty category map over it.
#[instrument(skip(abbrev))]
pub fn load_category_map(taxonomy: &Path, abbrev: AbbreviationTable) -> Result<CategoryMap> {
    let json = std::fs::read_to_string(taxonomy).map_err(|e| BibtreeError::io(taxonomy, e))?;
    let map = CategoryMap::from_json_str(&json, abbrev)?;
    info!(categories = map.toc().len(), "taxonomy loaded");
    Ok(map)
}

/// File every entry, in order. The first rejected entry aborts ingestion.
pub fn ingest_all(
    map: &mut CategoryMap,
    entries: Vec<RawEntry>,
    progress: &dyn ProgressReporter,
) -> Result<usize> {
    let total = entries.len();
    for (i, entry) in entries.into_iter().enumerate() {
        let item = map.ingest(entry)?;
        progress.entry_ingested(&item.id, i + 1, total);
    }
    Ok(total)
}

/// Load the taxonomy and file every entry of the bibliography under it.
#[instrument(skip_all, fields(taxonomy = %taxonomy.display(), bibfile = %bibfile.display()))]
pub fn build_category_map(
    taxonomy: &Path,
    bibfile: &Path,
    abbrev: AbbreviationTable,
    progress: &dyn ProgressReporter,
) -> Result<CategoryMap> {
    progress.phase("Loading taxonomy");
    let mut map = load_category_map(taxonomy, abbrev)?;

    progress.phase("Reading bibliography");
    let entries = bibtree_bibtex::load_entries(bibfile)?;

    progress.phase("Filing entries");
    let count = ingest_all(&mut map, entries, progress)?;
    info!(entries = count, "bibliography filed");

    Ok(map)
}

/// Run the full build: load, file, render, assemble, write.
#[instrument(skip_all, fields(output = %config.output.display()))]
pub fn build_document(
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
) -> Result<BuildReport> {
    let start = Instant::now();

    let abbrev = abbreviation_table(&config.abbreviations)?;
    let map = build_category_map(&config.taxonomy, &config.bibfile, abbrev, progress)?;

    progress.phase("Rendering sections");
    let body = sections::render(
        &map,
        &RenderOptions {
            toc_depth: config.document.toc_depth,
        },
    )?;

    progress.phase("Writing document");
    let bib_stem = assembler::bibliography_stem(&config.bibfile)?;
    let lines = assembler::assemble_document(&config.document, body, &bib_stem);
    let document = assembler::write_document(&config.output, &lines)?;

    let report = BuildReport {
        document,
        entry_count: map.item_count(),
        section_count: map.toc().len(),
        completed_at: Utc::now(),
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    info!(
        entries = report.entry_count,
        sections = report.section_count,
        sha256 = %report.document.sha256,
        "build complete"
    );
    progress.done(&report);

    Ok(report)
}

/// Look up the entries filed under `key`.
#[instrument(skip(map))]
pub fn query(map: &CategoryMap, key: &str, opts: QueryOptions) -> Result<Vec<Arc<CitedItem>>> {
    let items = map.get(key, opts.lookup)?;
    if opts.include_uncategorized {
        return Ok(items);
    }
    Ok(items
        .into_iter()
        .filter(|item| !item.is_uncategorized())
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(entries: &[(&str, Option<&str>)]) -> CategoryMap {
        let mut map = CategoryMap::from_json_str(
            r#"{"no-category": [], "aug": {"crop": []}}"#,
            AbbreviationTable::builtin(),
        )
        .unwrap();
        let raw = entries
            .iter()
            .map(|(id, loc)| RawEntry {
                id: (*id).into(),
                title: format!("Title {id}"),
                location: loc.map(String::from),
            })
            .collect();
        ingest_all(&mut map, raw, &SilentProgress).unwrap();
        map
    }

    #[test]
    fn query_hides_uncategorized_by_default() {
        let map = map_with(&[("a", Some("aug::crop")), ("b", None)]);

        let items = query(&map, "no-category", QueryOptions::default()).unwrap();
        assert!(items.is_empty());

        let all = query(
            &map,
            "no-category",
            QueryOptions {
                include_uncategorized: true,
                ..QueryOptions::default()
            },
        )
        .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn query_multilevel_by_default() {
        let map = map_with(&[("a", Some("aug::crop")), ("b", Some("aug"))]);
        let items = query(&map, "aug", QueryOptions::default()).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let exact = query(
            &map,
            "aug",
            QueryOptions {
                lookup: Lookup::Exact,
                ..QueryOptions::default()
            },
        )
        .unwrap();
        assert_eq!(exact.len(), 1);
    }

    #[test]
    fn ingest_all_stops_at_first_unknown_category() {
        let mut map = CategoryMap::from_json_str(r#"{"x": []}"#, AbbreviationTable::builtin())
            .unwrap();
        let raw = vec![
            RawEntry {
                id: "ok".into(),
                title: "Ok".into(),
                location: Some("x".into()),
            },
            RawEntry {
                id: "bad".into(),
                title: "Bad".into(),
                location: Some("y".into()),
            },
        ];
        let err = ingest_all(&mut map, raw, &SilentProgress).unwrap_err();
        assert!(matches!(err, BibtreeError::UnknownCategory { .. }));
    }

    #[test]
    fn missing_taxonomy_file_is_io_error() {
        let err = load_category_map(
            Path::new("/nonexistent/bibtree-toc.json"),
            AbbreviationTable::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, BibtreeError::Io { .. }));
    }
}
