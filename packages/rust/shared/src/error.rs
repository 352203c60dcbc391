//! Error types for bibtree.
//!
//! Library crates use [`BibtreeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all bibtree operations.
#[derive(Debug, thiserror::Error)]
pub enum BibtreeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The taxonomy description is not a nested mapping of categories.
    #[error("malformed taxonomy: {message}")]
    MalformedTaxonomy { message: String },

    /// A category path that is not declared by the taxonomy.
    #[error("unknown category '{key}', expected one of:\n[{}]", .valid.join(", "))]
    UnknownCategory { key: String, valid: Vec<String> },

    /// Taxonomy nesting deeper than the document heading vocabulary.
    #[error("category '{key}' is at depth {depth}, the deepest supported depth is {max}")]
    InvalidDepth { key: String, depth: usize, max: usize },

    /// The abbreviation table is not a one-to-one mapping.
    #[error("abbreviation conflict: {message}")]
    AbbreviationConflict { message: String },

    /// Bibliography or taxonomy syntax error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Data validation error (empty identifier, missing title, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A required input or document support file does not exist.
    #[error("required file not found: {path:?}")]
    MissingFile { path: PathBuf },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BibtreeError>;

impl BibtreeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-taxonomy error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedTaxonomy {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an unknown-category error listing every declared key.
    pub fn unknown_category(key: impl Into<String>, valid: &[String]) -> Self {
        Self::UnknownCategory {
            key: key.into(),
            valid: valid.to_vec(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BibtreeError::config("missing work_dir");
        assert_eq!(err.to_string(), "config error: missing work_dir");

        let err = BibtreeError::malformed("segment 'a::b' contains '::'");
        assert!(err.to_string().contains("a::b"));
    }

    #[test]
    fn unknown_category_lists_valid_keys() {
        let valid = vec!["aug".to_string(), "aug::crop".to_string()];
        let err = BibtreeError::unknown_category("xyz", &valid);
        assert_eq!(
            err.to_string(),
            "unknown category 'xyz', expected one of:\n[aug, aug::crop]"
        );
    }

    #[test]
    fn invalid_depth_names_key() {
        let err = BibtreeError::InvalidDepth {
            key: "a::b::c::d::e::f".into(),
            depth: 5,
            max: 4,
        };
        assert!(err.to_string().contains("a::b::c::d::e::f"));
        assert!(err.to_string().contains("deepest supported depth is 4"));
    }
}
