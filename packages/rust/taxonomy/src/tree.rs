//! Taxonomy description loader.
//!
//! A taxonomy is described as nested JSON objects. An object value marks an
//! internal category with children; a list value marks a leaf category:
//!
//! ```json
//! { "aug": { "crop": [], "flip": [] }, "reg": [] }
//! ```
//!
//! Loading produces the flat list of canonical `::`-joined paths in
//! traversal order, which is also the order sections are rendered in.

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use bibtree_shared::{BibtreeError, PATH_DELIMITER, Result};

use crate::abbrev::AbbreviationTable;

/// One node of a taxonomy description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyNode {
    /// A category with no children.
    Leaf,
    /// A category with ordered children (possibly none).
    Internal(Vec<(String, TaxonomyNode)>),
}

/// A parsed taxonomy description with canonical segment names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    roots: Vec<(String, TaxonomyNode)>,
}

impl Taxonomy {
    /// Parse a JSON taxonomy description.
    ///
    /// Unlike [`Taxonomy::from_value`], a name repeated inside one object is
    /// reported instead of silently keeping the last value.
    pub fn from_json_str(json: &str, abbrev: &AbbreviationTable) -> Result<Self> {
        let raw: RawNode = serde_json::from_str(json)
            .map_err(|e| BibtreeError::parse(format!("invalid taxonomy JSON: {e}")))?;
        Self::from_raw(&raw, abbrev)
    }

    /// Build a taxonomy from an already-parsed description.
    pub fn from_value(value: &Value, abbrev: &AbbreviationTable) -> Result<Self> {
        Self::from_raw(&RawNode::from(value), abbrev)
    }

    fn from_raw(raw: &RawNode, abbrev: &AbbreviationTable) -> Result<Self> {
        let RawNode::Object(entries) = raw else {
            return Err(BibtreeError::malformed(format!(
                "top level must be an object, found {}",
                raw.kind()
            )));
        };
        let roots = children_from_entries(entries, "", abbrev)?;
        Ok(Self { roots })
    }

    /// Top-level categories in declaration order.
    pub fn roots(&self) -> &[(String, TaxonomyNode)] {
        &self.roots
    }

    /// Every declared category as a canonical path, in depth-first order.
    ///
    /// Internal categories precede their children, so they are addressable
    /// keys in their own right.
    #[instrument(skip_all)]
    pub fn paths(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        let mut prefix = Vec::new();
        collect_paths(&self.roots, &mut prefix, &mut paths);

        let mut seen = HashSet::with_capacity(paths.len());
        for path in &paths {
            if !seen.insert(path.as_str()) {
                return Err(BibtreeError::malformed(format!(
                    "category '{path}' is declared more than once"
                )));
            }
        }

        debug!(categories = paths.len(), "taxonomy flattened");
        Ok(paths)
    }
}

/// Parse and flatten a JSON description in one step.
pub fn load_paths(json: &str, abbrev: &AbbreviationTable) -> Result<Vec<String>> {
    Taxonomy::from_json_str(json, abbrev)?.paths()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn children_from_entries(
    entries: &[(String, RawNode)],
    parent: &str,
    abbrev: &AbbreviationTable,
) -> Result<Vec<(String, TaxonomyNode)>> {
    let mut names = HashSet::with_capacity(entries.len());
    let mut children = Vec::with_capacity(entries.len());
    for (name, raw) in entries {
        if !names.insert(name.as_str()) {
            let at = if parent.is_empty() { "top level" } else { parent };
            return Err(BibtreeError::malformed(format!(
                "category name '{name}' appears twice under {at}"
            )));
        }
        let segment = canonical_segment(name, parent, abbrev)?;
        let path = if parent.is_empty() {
            segment.clone()
        } else {
            format!("{parent}{PATH_DELIMITER}{segment}")
        };
        let node = match raw {
            RawNode::Object(inner) => {
                TaxonomyNode::Internal(children_from_entries(inner, &path, abbrev)?)
            }
            RawNode::List(len) => {
                if *len > 0 {
                    warn!(category = %path, "ignoring contents of non-empty leaf list");
                }
                TaxonomyNode::Leaf
            }
            RawNode::Scalar(kind) => {
                return Err(BibtreeError::malformed(format!(
                    "category '{path}' must map to an object or a list, found {kind}"
                )));
            }
        };
        children.push((segment, node));
    }
    Ok(children)
}

fn canonical_segment(name: &str, parent: &str, abbrev: &AbbreviationTable) -> Result<String> {
    let at = if parent.is_empty() { "top level" } else { parent };
    if name.trim().is_empty() {
        return Err(BibtreeError::malformed(format!("empty category name under {at}")));
    }
    if name.contains(PATH_DELIMITER) {
        return Err(BibtreeError::malformed(format!(
            "category name '{name}' under {at} contains '{PATH_DELIMITER}'"
        )));
    }
    Ok(abbrev.resolve(name).to_string())
}

fn collect_paths(nodes: &[(String, TaxonomyNode)], prefix: &mut Vec<String>, out: &mut Vec<String>) {
    for (name, node) in nodes {
        prefix.push(name.clone());
        out.push(prefix.join(PATH_DELIMITER));
        if let TaxonomyNode::Internal(children) = node {
            collect_paths(children, prefix, out);
        }
        prefix.pop();
    }
}

// ---------------------------------------------------------------------------
// Raw description
// ---------------------------------------------------------------------------

/// A description as written: every object entry is kept, in source order.
#[derive(Debug)]
enum RawNode {
    Object(Vec<(String, RawNode)>),
    List(usize),
    Scalar(&'static str),
}

impl RawNode {
    fn kind(&self) -> &'static str {
        match self {
            RawNode::Object(_) => "an object",
            RawNode::List(_) => "a list",
            RawNode::Scalar(kind) => *kind,
        }
    }
}

impl From<&Value> for RawNode {
    fn from(value: &Value) -> Self {
        match value {
            Value::Object(map) => RawNode::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), RawNode::from(v)))
                    .collect(),
            ),
            Value::Array(items) => RawNode::List(items.len()),
            Value::Null => RawNode::Scalar("null"),
            Value::Bool(_) => RawNode::Scalar("a boolean"),
            Value::Number(_) => RawNode::Scalar("a number"),
            Value::String(_) => RawNode::Scalar("a string"),
        }
    }
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RawNodeVisitor)
    }
}

struct RawNodeVisitor;

impl<'de> Visitor<'de> for RawNodeVisitor {
    type Value = RawNode;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a taxonomy object, list, or scalar")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<RawNode, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value::<RawNode>()?;
            entries.push((key, value));
        }
        Ok(RawNode::Object(entries))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<RawNode, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut len = 0;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            len += 1;
        }
        Ok(RawNode::List(len))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar("null"))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar("a boolean"))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar("a number"))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar("a number"))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar("a number"))
    }

    fn visit_str<E: de::Error>(self, _: &str) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar("a string"))
    }
}
