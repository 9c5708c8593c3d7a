use super::TransformError;

/// Returns the body of a function given its source text, trimmed.
///
/// A parameter list ahead of the first `{` or `=>` is skipped first so that
/// destructuring braces in it are not mistaken for the body. The body ends at
/// the last `}` of the text.
pub fn extract_body(source: &str) -> Result<&str, TransformError> {
    let header_end = [source.find('{'), source.find("=>")]
        .iter()
        .flatten()
        .copied()
        .min();
    let search_from = match source.find('(') {
        Some(open) if header_end.map_or(true, |end| open < end) => {
            skip_balanced(source, open).ok_or(TransformError::UnbalancedParameters)?
        }
        _ => 0,
    };
    let open_brace = source[search_from..]
        .find('{')
        .map(|i| search_from + i)
        .ok_or(TransformError::MissingOpeningBrace)?;
    let close_brace = source
        .rfind('}')
        .filter(|&i| i > open_brace)
        .ok_or(TransformError::MissingClosingBrace)?;
    Ok(source[open_brace + 1..close_brace].trim())
}

/// Index just past the parenthesis matching the one at `open`. Parentheses
/// inside string literals do not count.
fn skip_balanced(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in source[open..].char_indices() {
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
            '"' | '\'' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
