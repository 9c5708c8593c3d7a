//! Line-granular mapping from program text offsets to display text offsets.

/// Zero-based line containing `offset`. Offsets past the end land on the
/// last line.
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    let mut consumed = 0;
    let mut last = 0;
    for (line_index, line) in text.split('\n').enumerate() {
        last = line_index;
        consumed += line.len() + 1;
        if offset < consumed {
            return line_index;
        }
    }
    last
}

pub fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// Offset of the first character of `line`, clamped to the last line.
pub fn line_start(text: &str, line: usize) -> usize {
    text.split('\n')
        .take(line.min(line_count(text) - 1))
        .map(|l| l.len() + 1)
        .sum()
}

/// Offset just past the last character of `line`, clamped to the last line.
pub fn line_end(text: &str, line: usize) -> usize {
    let line = line.min(line_count(text) - 1);
    let len = text.split('\n').nth(line).map(str::len).unwrap_or(0);
    line_start(text, line) + len
}

pub fn line_text(text: &str, line: usize) -> &str {
    let start = line_start(text, line);
    let end = line_end(text, line);
    text.get(start..end).unwrap_or_default()
}

/// Start of the display line that corresponds to the program line holding
/// `offset`.
pub fn map_offset(program_text: &str, display_text: &str, offset: usize) -> usize {
    if program_text.is_empty() || display_text.is_empty() {
        return 0;
    }
    line_start(display_text, line_of_offset(program_text, offset))
}

/// Maps a range to the whole display lines it covers.
pub fn map_range(program_text: &str, display_text: &str, start: usize, end: usize) -> (usize, usize) {
    if program_text.is_empty() || display_text.is_empty() {
        return (0, 0);
    }
    let start_line = line_of_offset(program_text, start);
    let end_line = line_of_offset(program_text, end).max(start_line);
    (
        line_start(display_text, start_line),
        line_end(display_text, end_line),
    )
}
