//! Short codes for category segment names.
//!
//! Abbreviations are optional sugar: any segment that is not a known short
//! code passes through unchanged, so abbreviated and full forms of a path
//! always canonicalize to the same string.

use std::collections::HashMap;

use bibtree_shared::{BibtreeError, PATH_DELIMITER, Result};

/// Built-in `(short code, canonical segment)` pairs.
pub const BUILTIN_ABBREVIATIONS: &[(&str, &str)] = &[
    ("aug", "augmentations"),
    ("reg", "regularization"),
    ("con", "consistency"),
    ("arch", "architectures"),
    ("act", "activations"),
    ("norm", "normalizations"),
    ("tr", "transformers"),
    ("cl", "contrastive learning"),
    ("kd", "knowledge-distillation"),
    ("wsl", "weakly-supervised learning"),
    ("ssl", "semi-supervised learning"),
    ("pseudo", "pseudo-labeling"),
    ("usl", "unsupervised learning"),
    ("tl", "transfer learning"),
    ("xsl", "x-shot learning"),
    ("fsl", "few-shot learning"),
    ("osl", "one-shot learning"),
    ("zsl", "zero-shot learning"),
    ("ft", "fine-tuning"),
    ("od", "detection"),
    ("det", "detectors"),
    ("sod", "salient object detection"),
    ("seg", "segmentation"),
    ("nas", "neural architecture search"),
    ("comp", "compression"),
    ("mob", "mobile vision"),
    ("gan", "generative adversarial networks"),
    ("adv", "adversarial"),
    ("ae", "autoencoders"),
    ("vb", "variational bayes"),
    ("opt", "optimization"),
    ("hyp", "hyperparameter"),
    ("da", "domain adaptation"),
    ("rec", "recognition"),
    ("ner", "perception and the visual cortex"),
    ("de", "differential evolution"),
    ("llvp", "low-level visual processing"),
    ("stat", "statistics"),
];

/// A one-to-one mapping between short codes and canonical segment names.
#[derive(Debug, Clone, Default)]
pub struct AbbreviationTable {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl AbbreviationTable {
    /// Build a table, rejecting any code or canonical name that appears twice.
    pub fn new<I, S, C>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: Into<String>,
    {
        let mut table = Self::default();
        for (short, canonical) in pairs {
            table.insert(short.into(), canonical.into())?;
        }
        Ok(table)
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (short, canonical) in BUILTIN_ABBREVIATIONS {
            table
                .forward
                .insert((*short).to_string(), (*canonical).to_string());
            table
                .reverse
                .insert((*canonical).to_string(), (*short).to_string());
        }
        table
    }

    /// The built-in table extended with user-supplied pairs.
    pub fn builtin_with<I, S, C>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: Into<String>,
    {
        let mut table = Self::builtin();
        for (short, canonical) in extra {
            table.insert(short.into(), canonical.into())?;
        }
        Ok(table)
    }

    fn insert(&mut self, short: String, canonical: String) -> Result<()> {
        if short.contains(PATH_DELIMITER) || canonical.contains(PATH_DELIMITER) {
            return Err(BibtreeError::AbbreviationConflict {
                message: format!("'{short}' -> '{canonical}' contains '{PATH_DELIMITER}'"),
            });
        }
        if short == canonical || self.reverse.contains_key(&short) {
            return Err(BibtreeError::AbbreviationConflict {
                message: format!("short code '{short}' is already a canonical name"),
            });
        }
        if self.forward.contains_key(&canonical) {
            return Err(BibtreeError::AbbreviationConflict {
                message: format!("canonical name '{canonical}' is already a short code"),
            });
        }
        if let Some(existing) = self.forward.get(&short) {
            return Err(BibtreeError::AbbreviationConflict {
                message: format!("'{short}' already maps to '{existing}', not '{canonical}'"),
            });
        }
        if let Some(existing) = self.reverse.get(&canonical) {
            return Err(BibtreeError::AbbreviationConflict {
                message: format!("'{canonical}' already abbreviated as '{existing}', not '{short}'"),
            });
        }
        self.forward.insert(short.clone(), canonical.clone());
        self.reverse.insert(canonical, short);
        Ok(())
    }

    /// Canonical name for `segment`, or `segment` itself when it is not a short code.
    pub fn resolve<'a>(&'a self, segment: &'a str) -> &'a str {
        self.forward.get(segment).map_or(segment, String::as_str)
    }

    /// Short code for a canonical segment name, if one exists.
    pub fn abbreviate(&self, canonical: &str) -> Option<&str> {
        self.reverse.get(canonical).map(String::as_str)
    }

    /// Resolve every segment of a `::`-joined path independently.
    pub fn canonicalize(&self, path: &str) -> String {
        path.split(PATH_DELIMITER)
            .map(|segment| self.resolve(segment))
            .collect::<Vec<_>>()
            .join(PATH_DELIMITER)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}
