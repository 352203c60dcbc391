//! The closed namespace of category paths and the items filed under them.
//!
//! Keys are fixed when the map is built from a taxonomy. Mutation requires
//! an exact key; queries additionally accept any prefix of a declared key,
//! so a whole subtree can be requested by its root.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use bibtree_shared::{
    BibtreeError, CitedItem, NO_CATEGORY, RawEntry, Result, is_ancestor_or_self, split_locations,
};

use crate::abbrev::AbbreviationTable;
use crate::tree::Taxonomy;

/// How [`CategoryMap::get`] matches a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Items filed directly under the key.
    Exact,
    /// Items filed under the key or any of its descendants.
    Multilevel,
}

/// Insertion-ordered, deduplicated set of shared items.
#[derive(Debug, Default)]
struct Bucket {
    items: Vec<Arc<CitedItem>>,
    seen: HashSet<Arc<CitedItem>>,
}

impl Bucket {
    fn insert(&mut self, item: &Arc<CitedItem>) {
        if self.seen.insert(Arc::clone(item)) {
            self.items.push(Arc::clone(item));
        }
    }
}

/// Mapping from declared category path to the items filed under it.
#[derive(Debug)]
pub struct CategoryMap {
    keys: Vec<String>,
    buckets: HashMap<String, Bucket>,
    abbrev: AbbreviationTable,
}

impl CategoryMap {
    /// Create an empty map over the given canonical keys, in section order.
    pub fn new(keys: Vec<String>, abbrev: AbbreviationTable) -> Self {
        let buckets = keys
            .iter()
            .map(|k| (k.clone(), Bucket::default()))
            .collect();
        Self {
            keys,
            buckets,
            abbrev,
        }
    }

    /// Create an empty map over every category a taxonomy declares.
    pub fn from_taxonomy(taxonomy: &Taxonomy, abbrev: AbbreviationTable) -> Result<Self> {
        Ok(Self::new(taxonomy.paths()?, abbrev))
    }

    /// Parse a JSON description and create an empty map over its categories.
    pub fn from_json_str(json: &str, abbrev: AbbreviationTable) -> Result<Self> {
        let taxonomy = Taxonomy::from_json_str(json, &abbrev)?;
        Self::from_taxonomy(&taxonomy, abbrev)
    }

    /// The abbreviation table used to canonicalize keys.
    pub fn abbreviations(&self) -> &AbbreviationTable {
        &self.abbrev
    }

    /// Canonicalize `raw_key` and require it to be a declared category.
    pub fn resolve_exact(&self, raw_key: &str) -> Result<String> {
        let key = self.abbrev.canonicalize(raw_key);
        if self.buckets.contains_key(&key) {
            Ok(key)
        } else {
            Err(BibtreeError::unknown_category(key, &self.keys))
        }
    }

    /// Canonicalize `raw_key` and require it to be a declared category or a
    /// segment-aligned prefix of one.
    pub fn validate_and_canonicalize(&self, raw_key: &str) -> Result<String> {
        let key = self.abbrev.canonicalize(raw_key);
        if self.buckets.contains_key(&key) || self.keys.iter().any(|k| is_ancestor_or_self(&key, k))
        {
            Ok(key)
        } else {
            Err(BibtreeError::unknown_category(key, &self.keys))
        }
    }

    /// File `item` under every path in its location.
    ///
    /// Locations may be abbreviated; the stored item carries their canonical
    /// form. An empty location means `no-category`. All paths are validated
    /// before any bucket is touched, so a rejected item leaves the map
    /// unchanged.
    pub fn add(&mut self, mut item: CitedItem) -> Result<Arc<CitedItem>> {
        if item.id.trim().is_empty() {
            return Err(BibtreeError::validation(format!(
                "entry '{}' has an empty identifier",
                item.title
            )));
        }
        if item.location.is_empty() {
            item.location.push(NO_CATEGORY.to_string());
        }

        item.location = item
            .location
            .iter()
            .map(|loc| self.resolve_exact(loc))
            .collect::<Result<Vec<_>>>()?;

        let item = Arc::new(item);
        for key in &item.location {
            if let Some(bucket) = self.buckets.get_mut(key) {
                bucket.insert(&item);
            }
        }

        debug!(id = %item.id, categories = ?item.location, "filed entry");
        Ok(item)
    }

    /// Turn a raw source entry into a [`CitedItem`] and file it.
    #[instrument(skip_all, fields(id = %entry.id))]
    pub fn ingest(&mut self, entry: RawEntry) -> Result<Arc<CitedItem>> {
        self.add(CitedItem {
            id: entry.id,
            title: entry.title,
            location: split_locations(entry.location.as_deref()),
        })
    }

    /// Items filed under `key`.
    ///
    /// [`Lookup::Exact`] requires a declared key. [`Lookup::Multilevel`] also
    /// accepts prefixes and returns the union, in section order, of every
    /// declared key at or below `key`, each item appearing once.
    pub fn get(&self, key: &str, lookup: Lookup) -> Result<Vec<Arc<CitedItem>>> {
        match lookup {
            Lookup::Exact => {
                let key = self.resolve_exact(key)?;
                Ok(self.bucket(&key).to_vec())
            }
            Lookup::Multilevel => {
                let key = self.validate_and_canonicalize(key)?;
                Ok(self.collect_subtree(&key))
            }
        }
    }

    /// Items filed directly under an already-canonical declared key.
    pub fn bucket(&self, key: &str) -> &[Arc<CitedItem>] {
        self.buckets
            .get(key)
            .map(|b| b.items.as_slice())
            .unwrap_or_default()
    }

    fn collect_subtree(&self, key: &str) -> Vec<Arc<CitedItem>> {
        let mut merged = Bucket::default();
        for k in self.keys.iter().filter(|k| is_ancestor_or_self(key, k)) {
            for item in self.bucket(k) {
                merged.insert(item);
            }
        }
        merged.items
    }

    /// Declared keys in section order.
    pub fn toc(&self) -> &[String] {
        &self.keys
    }

    /// Total number of distinct items across all buckets.
    pub fn item_count(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|b| b.items.iter())
            .collect::<HashSet<_>>()
            .len()
    }
}

impl<'a> IntoIterator for &'a CategoryMap {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(json: &str) -> CategoryMap {
        CategoryMap::from_json_str(json, AbbreviationTable::builtin()).expect("load taxonomy")
    }

    fn entry(id: &str, location: Option<&str>) -> RawEntry {
        RawEntry {
            id: id.into(),
            title: format!("Title of {id}"),
            location: location.map(String::from),
        }
    }

    fn ids(items: &[Arc<CitedItem>]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    const SMALL: &str = r#"{"x": {"crop": [], "flip": []}}"#;

    #[test]
    fn round_trip_exact_and_multilevel() {
        let mut m = map(SMALL);
        assert_eq!(m.toc(), &["x", "x::crop", "x::flip"]);

        m.ingest(entry("a", Some("x::crop"))).unwrap();

        assert_eq!(ids(&m.get("x", Lookup::Multilevel).unwrap()), vec!["a"]);
        assert!(m.get("x::flip", Lookup::Exact).unwrap().is_empty());
        assert_eq!(ids(&m.get("x::crop", Lookup::Exact).unwrap()), vec!["a"]);
        assert!(m.get("x", Lookup::Exact).unwrap().is_empty());
    }

    #[test]
    fn abbreviated_taxonomy_round_trip() {
        let mut m = map(r#"{"aug": {"crop": [], "flip": []}}"#);
        assert_eq!(
            m.toc(),
            &["augmentations", "augmentations::crop", "augmentations::flip"]
        );

        m.ingest(entry("a", Some("aug::crop"))).unwrap();
        assert_eq!(ids(&m.get("aug", Lookup::Multilevel).unwrap()), vec!["a"]);
        assert!(m.get("aug::flip", Lookup::Exact).unwrap().is_empty());
        assert_eq!(ids(&m.get("aug::crop", Lookup::Exact).unwrap()), vec!["a"]);
    }

    #[test]
    fn canonical_keys_validate_to_themselves() {
        let m = map(r#"{"aug": {"crop": []}, "reg": {"dropout": {"spatial": []}}}"#);
        for key in m.toc() {
            assert_eq!(&m.validate_and_canonicalize(key).unwrap(), key);
            assert_eq!(&m.resolve_exact(key).unwrap(), key);
        }
    }

    #[test]
    fn abbreviation_and_full_name_share_a_bucket() {
        let mut m = map(r#"{"augmentations": []}"#);
        m.ingest(entry("short", Some("aug"))).unwrap();
        m.ingest(entry("full", Some("augmentations"))).unwrap();
        assert_eq!(
            ids(&m.get("aug", Lookup::Exact).unwrap()),
            vec!["short", "full"]
        );
    }

    #[test]
    fn multi_tagged_item_is_shared() {
        let mut m = map(r#"{"a": [], "b": [], "c": []}"#);
        let item = m.ingest(entry("p", Some("a, c"))).unwrap();
        assert_eq!(item.location, vec!["a", "c"]);

        let in_a = m.get("a", Lookup::Exact).unwrap();
        let in_c = m.get("c", Lookup::Exact).unwrap();
        assert!(Arc::ptr_eq(&in_a[0], &in_c[0]));
        assert!(m.get("b", Lookup::Exact).unwrap().is_empty());
        assert_eq!(m.item_count(), 1);
    }

    #[test]
    fn multilevel_deduplicates_in_section_order() {
        let mut m = map(r#"{"t": {"u": [], "v": []}, "w": []}"#);
        m.ingest(entry("one", Some("t::v"))).unwrap();
        m.ingest(entry("two", Some("t::u, t::v"))).unwrap();
        m.ingest(entry("three", Some("t"))).unwrap();
        m.ingest(entry("four", Some("w"))).unwrap();

        let all = m.get("t", Lookup::Multilevel).unwrap();
        assert_eq!(ids(&all), vec!["three", "two", "one"]);

        let exact = m.get("t", Lookup::Exact).unwrap();
        assert!(exact.iter().all(|i| all.contains(i)));
    }

    #[test]
    fn multilevel_accepts_prefix_but_add_does_not() {
        // "a::b" is a grouping that was never declared as a key.
        let keys = vec!["a".to_string(), "a::b::c".to_string()];
        let mut m = CategoryMap::new(keys, AbbreviationTable::builtin());
        m.ingest(entry("deep", Some("a::b::c"))).unwrap();

        assert_eq!(m.validate_and_canonicalize("a::b").unwrap(), "a::b");
        assert_eq!(ids(&m.get("a::b", Lookup::Multilevel).unwrap()), vec!["deep"]);
        assert!(matches!(
            m.get("a::b", Lookup::Exact),
            Err(BibtreeError::UnknownCategory { .. })
        ));
        assert!(matches!(
            m.ingest(entry("bad", Some("a::b"))),
            Err(BibtreeError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn prefix_must_end_on_segment_boundary() {
        let m = map(r#"{"augmentations": []}"#);
        let err = m.validate_and_canonicalize("augment").unwrap_err();
        assert!(matches!(err, BibtreeError::UnknownCategory { .. }));
    }

    #[test]
    fn unknown_query_lists_every_key() {
        let m = map(SMALL);
        let err = m.get("xyz", Lookup::Multilevel).unwrap_err();
        match &err {
            BibtreeError::UnknownCategory { key, valid } => {
                assert_eq!(key, "xyz");
                assert_eq!(valid, &["x", "x::crop", "x::flip"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("[x, x::crop, x::flip]"));
    }

    #[test]
    fn missing_location_defaults_to_no_category() {
        let mut m = map(r#"{"no-category": [], "x": []}"#);
        let item = m.ingest(entry("plain", None)).unwrap();
        assert!(item.is_uncategorized());
        assert_eq!(ids(&m.get("no-category", Lookup::Exact).unwrap()), vec!["plain"]);

        let mut strict = map(SMALL);
        let err = strict.ingest(entry("plain", None)).unwrap_err();
        assert!(matches!(err, BibtreeError::UnknownCategory { ref key, .. } if key == "no-category"));
    }

    #[test]
    fn rejected_item_leaves_map_unchanged() {
        let mut m = map(SMALL);
        assert!(m.ingest(entry("half", Some("x::crop, nowhere"))).is_err());
        assert!(m.get("x::crop", Lookup::Exact).unwrap().is_empty());
        assert_eq!(m.item_count(), 0);
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let mut m = map(SMALL);
        let err = m.ingest(entry("  ", Some("x"))).unwrap_err();
        assert!(matches!(err, BibtreeError::Validation { .. }));
    }

    #[test]
    fn empty_location_files_under_no_category() {
        let mut m = map(r#"{"no-category": [], "x": []}"#);
        let item = m
            .add(CitedItem {
                id: "k".into(),
                title: "T".into(),
                location: vec![],
            })
            .unwrap();
        assert_eq!(item.location, vec!["no-category"]);
        assert_eq!(m.item_count(), 1);
        assert_eq!(ids(m.bucket("no-category")), vec!["k"]);

        let mut strict = map(SMALL);
        let err = strict
            .add(CitedItem {
                id: "k".into(),
                title: "T".into(),
                location: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, BibtreeError::UnknownCategory { ref key, .. } if key == "no-category"));
    }

    #[test]
    fn add_stores_canonical_locations() {
        let mut m = map(r#"{"aug": {"crop": []}}"#);
        let item = m
            .add(CitedItem {
                id: "k".into(),
                title: "T".into(),
                location: vec!["aug::crop".into()],
            })
            .unwrap();
        assert_eq!(item.location, vec!["augmentations::crop"]);
    }

    #[test]
    fn configured_pairs_keep_keys_stable() {
        let abbrev = AbbreviationTable::builtin_with([("rl", "reinforcement learning")])
            .expect("no conflict");
        let mut m = CategoryMap::from_json_str(r#"{"aug": {"crop": []}, "rl": []}"#, abbrev)
            .expect("load taxonomy");
        for key in m.toc() {
            assert_eq!(&m.validate_and_canonicalize(key).unwrap(), key);
        }
        m.ingest(entry("a", Some("aug::crop, reinforcement learning"))).unwrap();
        assert_eq!(ids(&m.get("rl", Lookup::Exact).unwrap()), vec!["a"]);
        assert_eq!(ids(&m.get("augmentations", Lookup::Multilevel).unwrap()), vec!["a"]);
    }

    #[test]
    fn duplicate_filing_is_idempotent() {
        let mut m = map(SMALL);
        m.ingest(entry("twice", Some("x::crop, x::crop"))).unwrap();
        assert_eq!(m.get("x::crop", Lookup::Exact).unwrap().len(), 1);
    }
}
