//! Tests for mapping program offsets onto display text.

extern crate manual_stepper;

use pretty_assertions::assert_eq;
use rstest::rstest;

use manual_stepper::session::position::{
    line_end, line_of_offset, line_start, line_text, map_offset, map_range,
};

const PROGRAM: &str = "function __manual() {\n  var a = 1;\n  return a;\n}";
const DISPLAY: &str = "function({ x }) {\n  var a = 1;\n  return a;\n}";

#[rstest]
#[case(0, 0)]
#[case(21, 0)]
#[case(22, 1)]
#[case(26, 1)]
#[case(47, 3)]
#[case(1000, 3)]
fn finds_line_of_offset(#[case] offset: usize, #[case] line: usize) {
    assert_eq!(line_of_offset(PROGRAM, offset), line);
}

#[test]
fn test_line_bounds() {
    assert_eq!(line_start(PROGRAM, 1), 22);
    assert_eq!(line_end(PROGRAM, 1), 34);
    assert_eq!(line_text(PROGRAM, 2), "  return a;");
    assert_eq!(line_text(PROGRAM, 99), "}");
}

#[test]
fn test_offsets_map_to_display_line_starts() {
    let var_offset = PROGRAM.find("var").unwrap();
    assert_eq!(map_offset(PROGRAM, DISPLAY, var_offset), DISPLAY.find("  var").unwrap());
    assert_eq!(map_offset(PROGRAM, DISPLAY, 5), 0);
}

#[test]
fn test_ranges_cover_whole_display_lines() {
    let start = PROGRAM.find("var").unwrap();
    let end = PROGRAM.find("a;\n}").unwrap();
    let (s, e) = map_range(PROGRAM, DISPLAY, start, end);
    assert_eq!(&DISPLAY[s..e], "  var a = 1;\n  return a;");
}

#[test]
fn test_reversed_range_is_one_line() {
    let start = PROGRAM.find("return").unwrap();
    let (s, e) = map_range(PROGRAM, DISPLAY, start, 0);
    assert_eq!(&DISPLAY[s..e], "  return a;");
}

#[test]
fn test_empty_texts_map_to_zero() {
    assert_eq!(map_offset("", DISPLAY, 10), 0);
    assert_eq!(map_range(PROGRAM, "", 3, 9), (0, 0));
}
