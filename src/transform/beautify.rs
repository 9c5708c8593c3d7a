//! Deterministic re-indentation.
//!
//! Lines are kept as the author broke them. Each one is trimmed and indented
//! two spaces per open `{` or `[`; a lone `{` or a leading `else` is pulled up
//! onto the line before it, and runs of blank lines are cut to two. Running
//! the output through again yields the same text.

const INDENT: &str = "  ";
const MAX_BLANK_LINES: usize = 2;

pub fn beautify(source: &str) -> String {
    let mut lines: Vec<String> = vec![];
    let mut depth: usize = 0;
    let mut in_block_comment = false;
    let mut blank_run = 0;

    for raw in source.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() && !in_block_comment {
            blank_run += 1;
            if !lines.is_empty() && blank_run <= MAX_BLANK_LINES {
                lines.push(String::new());
            }
            continue;
        }
        let started_in_comment = in_block_comment;
        let scan = scan_line(trimmed, &mut in_block_comment);
        let leading = if started_in_comment { 0 } else { scan.leading_closers };
        let indent = depth.saturating_sub(leading);
        depth = (depth as isize + scan.net).max(0) as usize;

        if blank_run == 0 && !started_in_comment {
            if let Some(previous) = lines.last_mut() {
                if joins_previous(previous, trimmed) {
                    previous.push(' ');
                    previous.push_str(trimmed);
                    continue;
                }
            }
        }
        blank_run = 0;
        lines.push(format!("{}{}", INDENT.repeat(indent), trimmed));
    }

    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines.join("\n")
}

fn joins_previous(previous: &str, line: &str) -> bool {
    let previous = previous.trim_end();
    if previous.is_empty() || previous.trim_start().starts_with("//") {
        return false;
    }
    if line.starts_with('{') {
        return previous.ends_with(')')
            || previous.ends_with("=>")
            || ends_with_word(previous, "else")
            || ends_with_word(previous, "do");
    }
    if starts_with_word(line, "else") {
        return previous.ends_with('}');
    }
    false
}

fn ends_with_word(text: &str, word: &str) -> bool {
    text.strip_suffix(word)
        .map(|rest| !rest.ends_with(|c: char| c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(false)
}

fn starts_with_word(text: &str, word: &str) -> bool {
    text.strip_prefix(word)
        .map(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(false)
}

struct LineScan {
    /// Closing brackets before any other code on the line.
    leading_closers: usize,
    net: isize,
}

/// Counts `{`/`[` nesting on one line, ignoring strings and comments.
fn scan_line(line: &str, in_block_comment: &mut bool) -> LineScan {
    let mut scan = LineScan {
        leading_closers: 0,
        net: 0,
    };
    let mut leading = true;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if *in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_block_comment = false;
            }
            continue;
        }
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '/' if chars.peek() == Some(&'/') => break,
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                *in_block_comment = true;
            }
            '"' | '\'' | '`' => {
                quote = Some(c);
                leading = false;
            }
            '{' | '[' => {
                scan.net += 1;
                leading = false;
            }
            '}' | ']' => {
                scan.net -= 1;
                if leading {
                    scan.leading_closers += 1;
                }
            }
            c if c.is_whitespace() => {}
            _ => leading = false,
        }
    }
    scan
}
