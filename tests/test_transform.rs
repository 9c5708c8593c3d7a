//! Tests for turning a manual function into runnable program text.

extern crate manual_stepper;

use pretty_assertions::assert_eq;
use rstest::rstest;

use manual_stepper::parser::JsParser;
use manual_stepper::session::ManualConfig;
use manual_stepper::transform::{
    beautify, extract_body, parse_payload, rewrite_annotations, rewrite_line, Annotation,
    SourceTransformer, TransformError, Transformed,
};

fn config_with(function: &str) -> ManualConfig {
    ManualConfig {
        manual_function: Some(function.to_string()),
        ..Default::default()
    }
}

// ============================================================================
// Annotations
// ============================================================================

#[rstest]
#[case("// @view total->\"Total\"", "view([[\"total\", \"Total\"]]);")]
#[case("  // @view \"a + b\"->\"Sum\"", "  view([[\"a + b\", \"Sum\"]]);")]
#[case("//@VIEW xs[i] -> \"Item\" -> \"i\"", "view([[\"xs[i]\", \"Item\", \"i\"]]);")]
#[case("// @step \"x\"->\"Step x\"->\"k\"", "step([[\"x\", \"Step x\", \"k\"]]);")]
#[case("// @view", "view();")]
#[case("// @step not a payload", "step();")]
fn rewrites_annotation_lines(#[case] line: &str, #[case] expected: &str) {
    assert_eq!(rewrite_line(line).as_deref(), Some(expected));
}

#[rstest]
#[case("var a = 1; // @view a->\"A\"")]
#[case("// plain comment")]
#[case("// @viewer a->\"A\"")]
fn leaves_other_lines_alone(#[case] line: &str) {
    assert_eq!(rewrite_line(line), None);
}

#[test]
fn test_payload_with_escaped_quotes() {
    assert_eq!(
        parse_payload("view", r#""s"->"say \"hi\"""#),
        Some(Annotation {
            marker: "view".to_string(),
            expression: "s".to_string(),
            description: "say \"hi\"".to_string(),
            index_variable: None,
        })
    );
    assert_eq!(
        rewrite_line(r#"// @view s->"say \"hi\"""#).as_deref(),
        Some(r#"view([["s", "say \"hi\""]]);"#)
    );
}

#[test]
fn test_rewrite_keeps_other_lines_and_line_endings() {
    let source = "var a = 1;\r\n  // @view a->\"A\"\r\nreturn a;";
    assert_eq!(
        rewrite_annotations(source),
        "var a = 1;\r\n  view([[\"a\", \"A\"]]);\r\nreturn a;"
    );
}

// ============================================================================
// Body extraction
// ============================================================================

#[test]
fn test_extracts_body_after_destructured_parameters() {
    let source = "function({ speed, angle = 45 }) {\n  return speed * angle;\n}";
    assert_eq!(extract_body(source), Ok("return speed * angle;"));
}

#[test]
fn test_extracts_arrow_body() {
    assert_eq!(extract_body("({a}) => { return a; }"), Ok("return a;"));
}

#[test]
fn test_extracts_arrow_body_without_parameter_parentheses() {
    assert_eq!(extract_body("x => { return f(x); }"), Ok("return f(x);"));
    assert_eq!(
        extract_body("function() { var t = g(1); return t; }"),
        Ok("var t = g(1); return t;")
    );
}

#[test]
fn test_body_keeps_nested_braces() {
    let source = "function(x) { if (x) { return {k: 1}; } return {}; }";
    assert_eq!(
        extract_body(source),
        Ok("if (x) { return {k: 1}; } return {};")
    );
}

#[test]
fn test_parentheses_in_default_strings_do_not_end_parameters() {
    let source = "function({ label = \")\" }) { return label; }";
    assert_eq!(extract_body(source), Ok("return label;"));
}

#[rstest]
#[case("function(a) return a;", TransformError::MissingOpeningBrace)]
#[case("function(a { return a;", TransformError::UnbalancedParameters)]
#[case("function(a) { return a;", TransformError::MissingClosingBrace)]
fn reports_malformed_functions(#[case] source: &str, #[case] expected: TransformError) {
    assert_eq!(extract_body(source), Err(expected));
}

// ============================================================================
// Beautifier
// ============================================================================

#[test]
fn test_beautify_reindents() {
    let source = "function f() {\nif (a) {\nb();\n}\n    else {\nc();\n}\n}";
    assert_eq!(
        beautify(source),
        "function f() {\n  if (a) {\n    b();\n  } else {\n    c();\n  }\n}"
    );
}

#[test]
fn test_beautify_joins_opening_brace_lines() {
    assert_eq!(
        beautify("for (var i = 0; i < 3; i++)\n{\nx();\n}"),
        "for (var i = 0; i < 3; i++) {\n  x();\n}"
    );
}

#[test]
fn test_beautify_ignores_braces_in_strings_and_comments() {
    assert_eq!(
        beautify("var s = \"{\"; // {\nvar t = 1;"),
        "var s = \"{\"; // {\nvar t = 1;"
    );
}

// ============================================================================
// Whole transform
// ============================================================================

#[test]
fn test_transform_without_config_is_loading() {
    assert!(SourceTransformer::transform(None).is_loading());
}

#[test]
fn test_transform_without_function_fails() {
    let transformed = SourceTransformer::transform(Some(&ManualConfig::default()));
    assert_eq!(
        transformed.error(),
        Some(TransformError::MissingFunction.to_string().as_str())
    );
}

#[test]
fn test_transform_wraps_and_parses() {
    let config = config_with(
        "function({ a, b }) {\n  var sum = a + b;\n  // @view sum->\"Sum\"\n  return sum;\n}",
    );
    let code = match SourceTransformer::transform(Some(&config)) {
        Transformed::Ready { code } => code,
        other => panic!("unexpected transform result: {:?}", other),
    };
    assert_eq!(
        code,
        "function __manual() {\n  var sum = a + b;\n  view([[\"sum\", \"Sum\"]]);\n  return sum;\n}\nvar vars = JSON.parse(getVars());\nvar __result = __manual();"
    );
    assert!(JsParser::parse_to_ast_from_str(&code).is_ok());
}

#[test]
fn test_display_text_lines_up_with_program_text() {
    let source = "function({ a }) {\n  var b = a * 2;\n  // @view b->\"Double\"\n  return b;\n}";
    let config = config_with(source);
    let program = SourceTransformer::program_text(&config).unwrap();
    let display = SourceTransformer::display_text(source);
    let program_lines: Vec<&str> = program.lines().collect();
    let display_lines: Vec<&str> = display.lines().collect();
    assert_eq!(display_lines[0], "function({ a }) {");
    for line in 1..4 {
        assert_eq!(program_lines[line], display_lines[line]);
    }
}
