//! Section tree renderer.
//!
//! Turns the flat category namespace into nested LaTeX sections, one per
//! declared category, each followed by an enumerated list of the entries
//! filed directly under it.
//!
//! Output for a section, in order:
//! 1. the heading (`\section`, `\subsection`, ... chosen by path depth)
//! 2. every child section, recursively
//! 3. the section's own entries as an `enumerate` list

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use bibtree_shared::{BibtreeError, Result, last_segment, parent_path, path_depth};
use bibtree_taxonomy::CategoryMap;

use crate::latex::latex_escape;

/// Heading commands indexed by category depth.
pub const HEADING_KINDS: [&str; 5] = [
    "section",
    "subsection",
    "subsubsection",
    "paragraph",
    "subparagraph",
];

/// Rendering options.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Table-of-contents depth set before each top-level section.
    pub toc_depth: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { toc_depth: 6 }
    }
}

/// One node of the section tree: a declared key and its nearest declared
/// descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionNode {
    pub key: String,
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Heading command for a category at `depth`.
pub fn heading_kind(key: &str, depth: usize) -> Result<&'static str> {
    HEADING_KINDS
        .get(depth)
        .copied()
        .ok_or_else(|| BibtreeError::InvalidDepth {
            key: key.to_string(),
            depth,
            max: HEADING_KINDS.len() - 1,
        })
}

/// Nest `keys` (in section order) into a tree.
///
/// Each key hangs under its nearest declared ancestor; keys without one
/// are roots. Sibling order follows `keys`.
pub fn build_section_tree(keys: &[String]) -> Vec<SectionNode> {
    let declared: HashSet<&str> = keys.iter().map(String::as_str).collect();
    let mut roots: Vec<&str> = Vec::new();
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();

    for key in keys {
        match nearest_declared_ancestor(key, &declared) {
            Some(parent) => children.entry(parent).or_default().push(key),
            None => roots.push(key),
        }
    }

    roots
        .into_iter()
        .map(|root| make_node(root, &children))
        .collect()
}

fn nearest_declared_ancestor<'a>(key: &'a str, declared: &HashSet<&str>) -> Option<&'a str> {
    let mut current = parent_path(key);
    while let Some(candidate) = current {
        if declared.contains(candidate) {
            return Some(candidate);
        }
        current = parent_path(candidate);
    }
    None
}

fn make_node(key: &str, children: &HashMap<&str, Vec<&str>>) -> SectionNode {
    SectionNode {
        key: key.to_string(),
        children: children
            .get(key)
            .map(|kids| kids.iter().map(|k| make_node(k, children)).collect())
            .unwrap_or_default(),
    }
}

/// Render every declared category of `map` as nested LaTeX sections.
#[instrument(skip_all, fields(categories = map.toc().len()))]
pub fn render(map: &CategoryMap, opts: &RenderOptions) -> Result<Vec<String>> {
    let tree = build_section_tree(map.toc());
    let mut writer = SectionWriter {
        map,
        opts,
        lines: Vec::new(),
        emitted: HashSet::new(),
    };
    writer.write_all(&tree)?;

    debug!(lines = writer.lines.len(), "sections rendered");
    Ok(writer.lines)
}

struct SectionWriter<'a> {
    map: &'a CategoryMap,
    opts: &'a RenderOptions,
    lines: Vec<String>,
    emitted: HashSet<String>,
}

impl SectionWriter<'_> {
    fn write_all(&mut self, nodes: &[SectionNode]) -> Result<()> {
        for node in nodes {
            self.write_node(node)?;
        }
        Ok(())
    }

    fn write_node(&mut self, node: &SectionNode) -> Result<()> {
        if !self.emitted.insert(node.key.clone()) {
            return Ok(());
        }

        let depth = path_depth(&node.key);
        let kind = heading_kind(&node.key, depth)?;
        let tab = "\t".repeat(depth);

        if depth == 0 {
            self.lines.push(format!(
                "{tab}\\addtocontents{{toc}}{{\\setcounter{{tocdepth}}{{{}}}}}",
                self.opts.toc_depth
            ));
        }
        self.lines.push(format!(
            "{tab}\\{kind}{{{}}}",
            latex_escape(last_segment(&node.key))
        ));

        self.write_all(&node.children)?;

        let items = self.map.bucket(&node.key);
        if !items.is_empty() {
            self.lines.push(format!("{tab}\\begin{{enumerate}}"));
            for item in items {
                self.lines.push(format!("{tab}\t{}", item.to_latex()));
            }
            self.lines.push(format!("{tab}\\end{{enumerate}}"));
        } else if node.is_leaf() {
            // An enumerate without items does not compile.
            self.lines.push(format!("{tab}\\begin{{enumerate}}"));
            self.lines.push(format!("{tab}\t\\item"));
            self.lines.push(format!("{tab}\\end{{enumerate}}"));
        }

        Ok(())
    }
}
