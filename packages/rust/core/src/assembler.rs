//! Document assembler.
//!
//! Wraps the rendered section body in the document preamble and the
//! bibliography trailer, then writes the finished `.tex` file to disk.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use bibtree_shared::{BibtreeError, DocumentConfig, Result};

use crate::latex::latex_escape;

/// Metadata for a written document.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DocumentMeta {
    pub path: PathBuf,
    pub line_count: usize,
    pub size_bytes: usize,
    pub sha256: String,
}

/// Lines that open the document, up to and including the table of contents.
pub fn preamble(config: &DocumentConfig) -> Vec<String> {
    let mut lines = vec![
        format!("\\documentclass[{}]{{acmart}}", config.document_class),
        "\\AtBeginDocument{%".to_string(),
        "\\providecommand\\BibTeX{{%".to_string(),
        "\\normalfont B\\kern-0.5em{\\scshape i\\kern-0.25em b}\\kern-0.8em\\TeX}}}".to_string(),
        "\\usepackage{setspace}".to_string(),
    ];

    let author = latex_escape(config.author.trim());
    if !author.is_empty() {
        lines.push(format!("\\author{{{author}}}"));
    }

    lines.extend([
        "\\begin{document}".to_string(),
        "\\begin{center}".to_string(),
        format!("\\textbf{{{}}}", latex_escape(&config.title)),
        "\\end{center}".to_string(),
    ]);

    if !author.is_empty() {
        lines.push(author);
        lines.push("\\newline".to_string());
    }

    let email = config.email.trim();
    if !email.is_empty() {
        lines.push(format!("\\href{{mailto:{email}}}{{\\nolinkurl{{{email}}}}}"));
    }

    lines.extend([
        "\\singlespacing".to_string(),
        "\\tableofcontents".to_string(),
        "\\newpage".to_string(),
    ]);
    lines
}

/// Lines that close the document: bibliography style, database and end.
pub fn trailer(config: &DocumentConfig, bib_stem: &str) -> Vec<String> {
    vec![
        "\\newpage".to_string(),
        format!("\\bibliographystyle{{{}}}", config.bibliography_style),
        format!("\\bibliography{{{bib_stem}}}"),
        "\\end{document}".to_string(),
    ]
}

/// Assemble the full document around a rendered body.
pub fn assemble_document(config: &DocumentConfig, body: Vec<String>, bib_stem: &str) -> Vec<String> {
    let mut lines = preamble(config);
    lines.extend(body);
    lines.extend(trailer(config, bib_stem));
    lines
}

/// The name `\bibliography` expects: the file stem of the `.bib` path.
pub fn bibliography_stem(bibfile: &Path) -> Result<String> {
    bibfile
        .file_stem()
        .and_then(|s| s.to_str())
        .map(String::from)
        .ok_or_else(|| {
            BibtreeError::validation(format!(
                "cannot derive a bibliography name from {}",
                bibfile.display()
            ))
        })
}

/// Write document lines to `path` (write to temp, then rename).
#[instrument(skip_all, fields(path = %path.display(), lines = lines.len()))]
pub fn write_document(path: &Path, lines: &[String]) -> Result<DocumentMeta> {
    let content = lines.join("\n");

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| BibtreeError::io(&dir, e))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BibtreeError::validation(format!("invalid output path {}", path.display())))?;
    let temp = dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, &content).map_err(|e| BibtreeError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| BibtreeError::io(path, e))?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    debug!(temp = %temp.display(), "renamed temp file");
    info!(path = %path.display(), bytes = content.len(), sha256 = %hash, "document written");

    Ok(DocumentMeta {
        path: path.to_path_buf(),
        line_count: lines.len(),
        size_bytes: content.len(),
        sha256: hash,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
