//! Shared types, error model, and configuration for bibtree.
//!
//! This crate is the foundation depended on by all other bibtree crates.
//! It provides:
//! - [`BibtreeError`]: the unified error type
//! - Domain types ([`RawEntry`], [`CitedItem`]) and category path helpers
//! - Configuration ([`AppConfig`], [`DocumentConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, DocumentConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{BibtreeError, Result};
pub use types::{
    CitedItem, NO_CATEGORY, PATH_DELIMITER, RawEntry, is_ancestor_or_self, last_segment,
    parent_path, path_depth, split_locations,
};
