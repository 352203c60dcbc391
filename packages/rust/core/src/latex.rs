//! LaTeX text helpers.

/// Escape characters that LaTeX treats specially in running text.
pub fn latex_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '$' => out.push_str("\\$"),
            '&' => out.push_str("\\&"),
            '#' => out.push_str("\\#"),
            '^' => out.push_str("\\^{}"),
            '_' => out.push_str("\\_"),
            '%' => out.push_str("\\%"),
            '~' => out.push_str("\\~{}"),
            '\u{2014}' => out.push_str("---"),
            '\u{2013}' => out.push_str("--"),
            '\u{201C}' => out.push_str("``"),
            '\u{201D}' => out.push_str("''"),
            '\u{2018}' => out.push('`'),
            '\u{2019}' => out.push('\''),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_specials() {
        assert_eq!(latex_escape("R&D 100%"), "R\\&D 100\\%");
        assert_eq!(latex_escape("x_1 {y}"), "x\\_1 \\{y\\}");
        assert_eq!(latex_escape("plain text"), "plain text");
    }

    #[test]
    fn normalizes_unicode_punctuation() {
        assert_eq!(latex_escape("a \u{2014} b \u{201C}q\u{201D}"), "a --- b ``q''");
    }
}
