//! Application configuration for bibtree.
//!
//! User config lives at `~/.bibtree/bibtree.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BibtreeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bibtree.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bibtree";

// ---------------------------------------------------------------------------
// Config structs (matching bibtree.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input/output locations.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Document preamble and support files.
    #[serde(default)]
    pub document: DocumentConfig,

    /// Extra `short = "canonical"` pairs merged over the built-in table.
    #[serde(default)]
    pub abbreviations: BTreeMap<String, String>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory that bare file names are resolved against.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Bibliography file (`.bib` appended when missing).
    #[serde(default = "default_bibfile")]
    pub bibfile: String,

    /// Taxonomy description (`.json` appended when missing).
    #[serde(default = "default_taxonomy")]
    pub taxonomy: String,

    /// Generated document (`.tex` appended when missing).
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            bibfile: default_bibfile(),
            taxonomy: default_taxonomy(),
            output: default_output(),
        }
    }
}

fn default_work_dir() -> String {
    "tex_stuff".into()
}
fn default_bibfile() -> String {
    "bibliography".into()
}
fn default_taxonomy() -> String {
    "toc".into()
}
fn default_output() -> String {
    "core".into()
}

/// `[document]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Option passed to the `acmart` document class.
    #[serde(default = "default_document_class")]
    pub document_class: String,

    /// Title shown on the first page.
    #[serde(default = "default_title")]
    pub title: String,

    /// Author name.
    #[serde(default)]
    pub author: String,

    /// Author contact address (omitted when empty).
    #[serde(default)]
    pub email: String,

    /// Argument to `\bibliographystyle`.
    #[serde(default = "default_bibliography_style")]
    pub bibliography_style: String,

    /// Table-of-contents depth set before each top-level section.
    #[serde(default = "default_toc_depth")]
    pub toc_depth: u8,

    /// Class and style files that must exist in the work directory.
    #[serde(default = "default_support_files")]
    pub support_files: Vec<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            document_class: default_document_class(),
            title: default_title(),
            author: String::new(),
            email: String::new(),
            bibliography_style: default_bibliography_style(),
            toc_depth: default_toc_depth(),
            support_files: default_support_files(),
        }
    }
}

fn default_document_class() -> String {
    "acmlarge".into()
}
fn default_title() -> String {
    "Deep Learning and Computer Vision Papers".into()
}
fn default_bibliography_style() -> String {
    "ACM-Reference-Format".into()
}
fn default_toc_depth() -> u8 {
    6
}
fn default_support_files() -> Vec<String> {
    [
        "acmart.cls",
        "ACM-Reference-Format.bbx",
        "ACM-Reference-Format.cbx",
        "ACM-Reference-Format.bst",
        "ACM-Reference-Format.dbx",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

impl DefaultsConfig {
    /// Resolve a file name against the work directory.
    ///
    /// A name without a directory component is placed inside `work_dir`;
    /// `extension` is appended when the name does not already carry it.
    pub fn resolve(&self, name: &str, extension: &str) -> PathBuf {
        let mut path = PathBuf::from(name);
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            let mut file_name = path.as_os_str().to_os_string();
            file_name.push(".");
            file_name.push(extension);
            path = PathBuf::from(file_name);
        }

        let bare = path
            .parent()
            .is_none_or(|parent| parent.as_os_str().is_empty());
        if bare {
            Path::new(&self.work_dir).join(path)
        } else {
            path
        }
    }

    /// Like [`resolve`](Self::resolve), but the file must already exist.
    pub fn resolve_existing(&self, name: &str, extension: &str) -> Result<PathBuf> {
        let path = self.resolve(name, extension);
        if !path.exists() {
            return Err(BibtreeError::MissingFile { path });
        }
        Ok(path)
    }

    /// Check that every support file exists inside the work directory.
    pub fn check_support_files(&self, files: &[String]) -> Result<()> {
        for file in files {
            let path = Path::new(&self.work_dir).join(file);
            if !path.exists() {
                return Err(BibtreeError::MissingFile { path });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bibtree/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BibtreeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bibtree/bibtree.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BibtreeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BibtreeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BibtreeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BibtreeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BibtreeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("work_dir"));
        assert!(toml_str.contains("ACM-Reference-Format"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.bibfile, "bibliography");
        assert_eq!(parsed.document.toc_depth, 6);
        assert_eq!(parsed.document.support_files.len(), 5);
    }

    #[test]
    fn config_with_abbreviations() {
        let toml_str = r#"
[defaults]
work_dir = "/tmp/papers"

[document]
author = "A. Reader"

[abbreviations]
rl = "reinforcement learning"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.work_dir, "/tmp/papers");
        assert_eq!(config.defaults.taxonomy, "toc");
        assert_eq!(config.document.author, "A. Reader");
        assert_eq!(
            config.abbreviations.get("rl").map(String::as_str),
            Some("reinforcement learning")
        );
    }

    #[test]
    fn resolve_places_bare_names_in_work_dir() {
        let defaults = DefaultsConfig::default();
        assert_eq!(
            defaults.resolve("bibliography", "bib"),
            PathBuf::from("tex_stuff/bibliography.bib")
        );
        assert_eq!(
            defaults.resolve("toc.json", "json"),
            PathBuf::from("tex_stuff/toc.json")
        );
        assert_eq!(
            defaults.resolve("other/core", "tex"),
            PathBuf::from("other/core.tex")
        );
    }

    #[test]
    fn resolve_existing_reports_missing_file() {
        let defaults = DefaultsConfig {
            work_dir: "/nonexistent-bibtree-dir".into(),
            ..DefaultsConfig::default()
        };
        let err = defaults.resolve_existing("toc", "json").unwrap_err();
        assert!(matches!(err, BibtreeError::MissingFile { .. }));
    }
}
