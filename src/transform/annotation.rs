//! Rewrites `// @view` and `// @step` comment lines into breakpoint calls.

use regex::Regex;

lazy_static! {
    static ref MARKER: Regex = Regex::new(r"(?i)^(\s*)//\s*@(view|step)\b(.*)$").unwrap();
    static ref QUOTED_DESC_VAR: Regex = Regex::new(
        r#"^"((?:[^"\\]|\\.)*)"\s*->\s*"((?:[^"\\]|\\.)*)"\s*->\s*"((?:[^"\\]|\\.)*)"$"#
    )
    .unwrap();
    static ref BARE_DESC_VAR: Regex = Regex::new(
        r#"^(.+?)\s*->\s*"((?:[^"\\]|\\.)*)"\s*->\s*"((?:[^"\\]|\\.)*)"$"#
    )
    .unwrap();
    static ref QUOTED_DESC: Regex =
        Regex::new(r#"^"((?:[^"\\]|\\.)*)"\s*->\s*"((?:[^"\\]|\\.)*)"$"#).unwrap();
    static ref BARE_DESC: Regex = Regex::new(r#"^(.+?)\s*->\s*"((?:[^"\\]|\\.)*)"$"#).unwrap();
}

/// Payload parsed out of an annotation comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub marker: String,
    pub expression: String,
    pub description: String,
    pub index_variable: Option<String>,
}

/// Replaces every annotation line of `source`. Other lines are kept as they
/// are, line endings included.
pub fn rewrite_annotations(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        let (content, ending) = match line.strip_suffix('\n') {
            Some(content) => match content.strip_suffix('\r') {
                Some(content) => (content, "\r\n"),
                None => (content, "\n"),
            },
            None => (line, ""),
        };
        match rewrite_line(content) {
            Some(rewritten) => out.push_str(&rewritten),
            None => out.push_str(content),
        }
        out.push_str(ending);
    }
    out
}

/// The breakpoint call for one annotation line, `None` if it is not one.
pub fn rewrite_line(line: &str) -> Option<String> {
    let captures = MARKER.captures(line)?;
    let indent = &captures[1];
    let marker = captures[2].to_lowercase();
    match parse_payload(&marker, captures[3].trim()) {
        Some(annotation) => Some(format!("{}{}", indent, render_call(&annotation))),
        None => Some(format!("{}{}();", indent, marker)),
    }
}

/// Tries the payload grammars in order. Text that matches none of them
/// yields `None`.
pub fn parse_payload(marker: &str, payload: &str) -> Option<Annotation> {
    let annotation = |expression: &str, description: &str, index: Option<&str>| Annotation {
        marker: marker.to_string(),
        expression: expression.to_string(),
        description: description.to_string(),
        index_variable: index.map(|s| s.to_string()),
    };
    if payload.is_empty() {
        return None;
    }
    if let Some(c) = QUOTED_DESC_VAR.captures(payload) {
        return Some(annotation(
            &unescape(&c[1]),
            &unescape(&c[2]),
            Some(&unescape(&c[3])),
        ));
    }
    if let Some(c) = BARE_DESC_VAR.captures(payload) {
        return Some(annotation(c[1].trim(), &unescape(&c[2]), Some(&unescape(&c[3]))));
    }
    if let Some(c) = QUOTED_DESC.captures(payload) {
        return Some(annotation(&unescape(&c[1]), &unescape(&c[2]), None));
    }
    if let Some(c) = BARE_DESC.captures(payload) {
        return Some(annotation(c[1].trim(), &unescape(&c[2]), None));
    }
    None
}

pub fn render_call(annotation: &Annotation) -> String {
    let mut entry = format!(
        "\"{}\", \"{}\"",
        escape(&annotation.expression),
        escape(&annotation.description)
    );
    if let Some(index) = &annotation.index_variable {
        entry.push_str(&format!(", \"{}\"", escape(index)));
    }
    format!("{}([[{}]]);", annotation.marker, entry)
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_four_payload_grammars() {
        assert_eq!(
            rewrite_line(r#"// @view "a + b"->"sum"->"i""#).unwrap(),
            r#"view([["a + b", "sum", "i"]]);"#
        );
        assert_eq!(
            rewrite_line(r#"// @view a + b->"sum"->"i""#).unwrap(),
            r#"view([["a + b", "sum", "i"]]);"#
        );
        assert_eq!(
            rewrite_line(r#"// @view "a"->"first""#).unwrap(),
            r#"view([["a", "first"]]);"#
        );
        assert_eq!(
            rewrite_line(r#"// @step speed->"Current speed""#).unwrap(),
            r#"step([["speed", "Current speed"]]);"#
        );
    }

    #[test]
    fn marker_is_case_insensitive_and_keeps_indent() {
        assert_eq!(rewrite_line("    //@VIEW").unwrap(), "    view();");
        assert_eq!(rewrite_line("\t// @Step   ").unwrap(), "\tstep();");
    }

    #[test]
    fn unrecognised_payload_degrades_to_empty_call() {
        assert_eq!(rewrite_line("// @view just words").unwrap(), "view();");
    }

    #[test]
    fn ordinary_comments_are_untouched() {
        assert_eq!(rewrite_line("// compute @view later"), None);
        assert_eq!(rewrite_line("// @viewport"), None);
        assert_eq!(rewrite_line("var a = 1; // @view"), None);
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(
            rewrite_line(r#"// @view s->"say \"hi\" \\ bye""#).unwrap(),
            r#"view([["s", "say \"hi\" \\ bye"]]);"#
        );
        assert_eq!(
            rewrite_line(r#"// @view s["k"]->"key""#).unwrap(),
            r#"view([["s[\"k\"]", "key"]]);"#
        );
    }

    #[test]
    fn rewrite_preserves_line_endings() {
        let source = "a = 1;\r\n// @view a->\"A\"\r\nb = 2;";
        assert_eq!(
            rewrite_annotations(source),
            "a = 1;\r\nview([[\"a\", \"A\"]]);\r\nb = 2;"
        );
    }
}
