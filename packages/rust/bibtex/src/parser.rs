//! BibTeX parser.
//!
//! Supports the subset of BibTeX found in hand-maintained bibliographies:
//! - Entries: `@type{key, field = value, ...}` or `@type(key, ...)`
//! - Values: `{balanced braces}`, `"quoted"`, numbers, or `@string` macros,
//!   joined with `#`
//! - `@comment` and `@preamble` blocks are skipped
//! - Text between entries is ignored

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use bibtree_shared::{BibtreeError, Result};
use regex::Regex;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single parsed bibliography entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    /// Entry type, lowercased (`article`, `inproceedings`, ...).
    pub entry_type: String,
    /// Citation key.
    pub key: String,
    /// Field values keyed by lowercased field name.
    pub fields: BTreeMap<String, String>,
    /// 1-based line the entry starts on.
    pub line: usize,
}

impl BibEntry {
    /// Look up a field by (case-insensitive) name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `@type{` or `@type(` at the cursor.
static ENTRY_HEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@\s*([A-Za-z][A-Za-z0-9_-]*)\s*([{(])").expect("entry head regex")
});

/// Matches a field or macro name at the cursor.
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-:.+/]+").expect("name regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse BibTeX source into its entries, in source order.
pub(crate) fn parse_bibtex(content: &str) -> Result<Vec<BibEntry>> {
    let mut cursor = Cursor::new(content);
    let mut macros: HashMap<String, String> = HashMap::new();
    let mut entries = Vec::new();

    while let Some(at) = cursor.find('@') {
        cursor.pos = at;
        let Some(caps) = ENTRY_HEAD_RE.captures(cursor.rest()) else {
            // Stray `@` in free text between entries.
            cursor.pos += 1;
            continue;
        };

        let line = cursor.line_at(at);
        let entry_type = caps[1].to_ascii_lowercase();
        let close = if &caps[2] == "{" { b'}' } else { b')' };
        cursor.pos += caps[0].len();

        match entry_type.as_str() {
            "comment" | "preamble" => {
                cursor.skip_balanced(close, line)?;
            }
            "string" => {
                cursor.skip_ws();
                let name = cursor.name(line)?.to_ascii_lowercase();
                cursor.expect(b'=', line)?;
                let value = cursor.value(&macros, line)?;
                cursor.skip_ws();
                cursor.expect(close, line)?;
                macros.insert(name, value);
            }
            _ => {
                let entry = cursor.entry(entry_type, close, &macros, line)?;
                entries.push(entry);
            }
        }
    }

    Ok(entries)
}

/// Byte cursor over the source text. All structural characters are ASCII,
/// so every position the cursor stops at is a `char` boundary.
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn find(&self, ch: char) -> Option<usize> {
        self.rest().find(ch).map(|i| self.pos + i)
    }

    fn line_at(&self, pos: usize) -> usize {
        self.src[..pos].matches('\n').count() + 1
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8, line: usize) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(BibtreeError::parse(format!(
                "expected '{}' but found '{}' on line {} (entry starting on line {line})",
                byte as char,
                b as char,
                self.line_at(self.pos)
            ))),
            None => Err(BibtreeError::parse(format!(
                "unexpected end of input in entry starting on line {line}"
            ))),
        }
    }

    fn name(&mut self, line: usize) -> Result<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let Some(m) = NAME_RE.find(rest) else {
            return Err(BibtreeError::parse(format!(
                "expected a name on line {} (entry starting on line {line})",
                self.line_at(self.pos)
            )));
        };
        self.pos += m.end();
        Ok(&rest[..m.end()])
    }

    /// Skip to just past the `close` that balances an already-consumed opener.
    fn skip_balanced(&mut self, close: u8, line: usize) -> Result<()> {
        let open = if close == b'}' { b'{' } else { b'(' };
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == open {
                depth += 1;
            } else if b == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        Err(BibtreeError::parse(format!(
            "unterminated block starting on line {line}"
        )))
    }

    /// Text up to the `}` balancing an already-consumed `{`.
    fn braced(&mut self, line: usize) -> Result<&'a str> {
        let start = self.pos;
        self.skip_balanced(b'}', line)?;
        Ok(&self.src[start..self.pos - 1])
    }

    /// Text up to the closing `"`, ignoring quotes nested inside braces.
    fn quoted(&mut self, line: usize) -> Result<&'a str> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                b'"' if depth == 0 => return Ok(&self.src[start..self.pos - 1]),
                _ => {}
            }
        }
        Err(BibtreeError::parse(format!(
            "unterminated quoted value in entry starting on line {line}"
        )))
    }

    /// A field value: one or more `#`-joined pieces.
    fn value(&mut self, macros: &HashMap<String, String>, line: usize) -> Result<String> {
        let mut out = String::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'{') => {
                    self.pos += 1;
                    out.push_str(self.braced(line)?);
                }
                Some(b'"') => {
                    self.pos += 1;
                    out.push_str(self.quoted(line)?);
                }
                Some(_) => {
                    let word = self.name(line)?;
                    match macros.get(&word.to_ascii_lowercase()) {
                        Some(expansion) => out.push_str(expansion),
                        None => out.push_str(word),
                    }
                }
                None => {
                    return Err(BibtreeError::parse(format!(
                        "missing value in entry starting on line {line}"
                    )));
                }
            }

            self.skip_ws();
            if self.peek() == Some(b'#') {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(normalize_whitespace(&out))
    }

    fn entry(
        &mut self,
        entry_type: String,
        close: u8,
        macros: &HashMap<String, String>,
        line: usize,
    ) -> Result<BibEntry> {
        // --- Citation key ---
        self.skip_ws();
        let key_end = self
            .rest()
            .find(|c| c == ',' || c == close as char)
            .map(|i| self.pos + i)
            .ok_or_else(|| {
                BibtreeError::parse(format!("unterminated entry starting on line {line}"))
            })?;
        let key = self.src[self.pos..key_end].trim().to_string();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(BibtreeError::parse(format!(
                "invalid citation key '{key}' on line {line}"
            )));
        }
        self.pos = key_end;

        // --- Fields ---
        let mut fields = BTreeMap::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b) if b == close => {
                    self.pos += 1;
                    break;
                }
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                    if self.peek() == Some(close) {
                        continue;
                    }
                    let name = self.name(line)?.to_ascii_lowercase();
                    self.expect(b'=', line)?;
                    let value = self.value(macros, line)?;
                    fields.insert(name, value);
                }
                Some(b) => {
                    return Err(BibtreeError::parse(format!(
                        "expected ',' or '{}' but found '{}' on line {} in entry '{key}'",
                        close as char,
                        b as char,
                        self.line_at(self.pos)
                    )));
                }
                None => {
                    return Err(BibtreeError::parse(format!(
                        "unterminated entry '{key}' starting on line {line}"
                    )));
                }
            }
        }

        Ok(BibEntry {
            entry_type,
            key,
            fields,
            line,
        })
    }
}

fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fixture() {
        let content = std::fs::read_to_string("../../../fixtures/bib/bibliography.fixture.bib")
            .expect("read fixture");
        let entries = parse_bibtex(&content).unwrap();

        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "he2016resnet",
                "dosovitskiy2021vit",
                "zhang2018mixup",
                "vaswani2017attention",
                "lecun2015survey"
            ]
        );

        let vit = &entries[1];
        assert_eq!(vit.entry_type, "article");
        assert_eq!(
            vit.field("title"),
            Some("An Image is Worth 16x16 Words: {Transformers} for Image Recognition at Scale")
        );
        assert_eq!(vit.field("KEYWORDS"), Some("arch::tr::vision"));
        assert_eq!(entries[0].field("booktitle"), Some("CVPR"));
        assert_eq!(entries[0].field("year"), Some("2016"));
        assert_eq!(entries[4].field("keywords"), None);
    }

    #[test]
    fn parse_empty_input() {
        assert!(parse_bibtex("").unwrap().is_empty());
        assert!(parse_bibtex("just some notes, mail me@example.com").unwrap().is_empty());
    }

    #[test]
    fn parse_concatenation_and_macros() {
        let content = r#"
@string{ venue = "Neural" }
@misc{k1, note = venue # " Networks " # {2020}}
"#;
        let entries = parse_bibtex(content).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].field("note"), Some("Neural Networks 2020"));
    }

    #[test]
    fn parse_trailing_comma_and_no_fields() {
        let entries = parse_bibtex("@misc{a, title = {A},}\n@misc{b}").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].field("title"), Some("A"));
        assert!(entries[1].fields.is_empty());
        assert_eq!(entries[1].line, 2);
    }

    #[test]
    fn quoted_value_may_contain_braced_quote() {
        let entries = parse_bibtex(r#"@misc{q, title = "A {"}quoted{"} word"}"#).unwrap();
        assert_eq!(entries[0].field("title"), Some(r#"A {"}quoted{"} word"#));
    }

    #[test]
    fn unterminated_entry_fails() {
        let err = parse_bibtex("@article{broken,\n title = {never closed").unwrap_err();
        assert!(matches!(err, BibtreeError::Parse { .. }));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn missing_equals_fails() {
        let err = parse_bibtex("@article{k,\n title {x}}").unwrap_err();
        assert!(err.to_string().contains("expected '='"));
    }
}
