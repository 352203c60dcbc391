//! Category taxonomy for bibtree.
//!
//! - [`AbbreviationTable`]: short codes for category segment names
//! - [`Taxonomy`]: loader for nested JSON category descriptions
//! - [`CategoryMap`]: the closed set of category paths and their items

pub mod abbrev;
pub mod category_map;
pub mod tree;

pub use abbrev::{AbbreviationTable, BUILTIN_ABBREVIATIONS};
pub use category_map::{CategoryMap, Lookup};
pub use tree::{Taxonomy, TaxonomyNode, load_paths};
