//! Document building for bibtree.
//!
//! This crate ties the taxonomy, the bibliography source and the section
//! renderer together into end-to-end workflows (e.g., `build_document`).

pub mod assembler;
pub mod latex;
pub mod pipeline;
pub mod sections;
