//! Tests for the stepping interpreter.
//!
//! Programs are run to completion one `step()` at a time and the resulting
//! globals are compared as JSON values.

extern crate manual_stepper;

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{json, Map, Value};

use manual_stepper::runner::ds::error::JErrorType;
use manual_stepper::runner::eval::{evaluate_detached, Interpreter};

/// Helper to run a program to completion.
fn run(code: &str) -> Interpreter {
    run_with(code, Map::new())
}

fn run_with(code: &str, externals: Map<String, Value>) -> Interpreter {
    let mut interpreter = Interpreter::initialize(code, &externals).unwrap();
    while interpreter.step().unwrap() {}
    interpreter
}

/// Helper to run a program and read one global as JSON.
fn global(code: &str, name: &str) -> Value {
    run(code)
        .get_global(name)
        .map(|v| v.to_native())
        .unwrap_or_else(|| panic!("{} is not a global", name))
}

/// Helper to run a program until it fails.
fn run_err(code: &str) -> (Interpreter, JErrorType) {
    let mut interpreter = Interpreter::initialize(code, &Map::new()).unwrap();
    loop {
        match interpreter.step() {
            Ok(true) => {}
            Ok(false) => panic!("program completed without error"),
            Err(e) => return (interpreter, e),
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[rstest]
#[case("var r = 1 + 2 * 3;", json!(7))]
#[case("var r = (1 + 2) * 3;", json!(9))]
#[case("var r = 7 / 2;", json!(3.5))]
#[case("var r = 6 / 2;", json!(3))]
#[case("var r = 2 ** 3 ** 2;", json!(512))]
#[case("var r = 10 % 4;", json!(2))]
#[case("var r = -3 + +\"4\";", json!(1))]
#[case("var r = \"a\" + 1 + 2;", json!("a12"))]
#[case("var r = 1 + 2 + \"a\";", json!("3a"))]
#[case("var r = 0.1 + 0.2;", json!(0.30000000000000004))]
#[case("var r = 1 / 0;", Value::Null)]
#[case("var r = 3 > 2 && 2 >= 2;", json!(true))]
#[case("var r = 1 == \"1\";", json!(true))]
#[case("var r = 1 === \"1\";", json!(false))]
#[case("var r = null == undefined;", json!(true))]
#[case("var r = !0;", json!(true))]
#[case("var r = typeof \"s\";", json!("string"))]
#[case("var r = typeof null;", json!("object"))]
#[case("var r = typeof missing;", json!("undefined"))]
#[case("var r = 0 || \"fallback\";", json!("fallback"))]
#[case("var r = 1 && 0;", json!(0))]
#[case("var r = 5 > 3 ? \"big\" : \"small\";", json!("big"))]
#[case("var r = (1, 2, 3);", json!(3))]
fn evaluates_expressions(#[case] code: &str, #[case] expected: Value) {
    assert_eq!(global(code, "r"), expected);
}

#[test]
fn test_compound_assignment_and_updates() {
    let code = "var a = 2; a += 3; a *= 2; a -= 1; a **= 2; var b = a++; var c = ++a; var d = a--;";
    let interpreter = run(code);
    let get = |name: &str| interpreter.get_global(name).unwrap().to_native();
    assert_eq!(get("b"), json!(81));
    assert_eq!(get("c"), json!(83));
    assert_eq!(get("d"), json!(83));
    assert_eq!(get("a"), json!(82));
}

#[test]
fn test_short_circuit_skips_right_side() {
    let code = "var calls = 0; function hit() { calls++; return true; } var r = false && hit(); var q = true || hit();";
    assert_eq!(global(code, "calls"), json!(0));
}

// ============================================================================
// Arrays and objects
// ============================================================================

#[test]
fn test_array_access_and_growth() {
    let code = "var xs = [1, 2]; xs[3] = 4; var n = xs.length; var first = xs[0];";
    let interpreter = run(code);
    assert_eq!(interpreter.get_global("xs").unwrap().to_native(), json!([1, 2, null, 4]));
    assert_eq!(interpreter.get_global("n").unwrap().to_native(), json!(4));
    assert_eq!(interpreter.get_global("first").unwrap().to_native(), json!(1));
}

#[test]
fn test_array_methods() {
    let code = "var xs = [3, 1]; xs.push(4); var joined = xs.join(\"-\"); var has = xs.includes(1); var last = xs.pop();";
    let interpreter = run(code);
    assert_eq!(interpreter.get_global("joined").unwrap().to_native(), json!("3-1-4"));
    assert_eq!(interpreter.get_global("has").unwrap().to_native(), json!(true));
    assert_eq!(interpreter.get_global("last").unwrap().to_native(), json!(4));
    assert_eq!(interpreter.get_global("xs").unwrap().to_native(), json!([3, 1]));
}

#[test]
fn test_object_members() {
    let code = "var o = {a: 1, \"b c\": 2}; o.d = 3; o[\"e\"] = o.a + o.d; o.a += 10; var missing = o.nope;";
    let interpreter = run(code);
    assert_eq!(
        interpreter.get_global("o").unwrap().to_native(),
        json!({"a": 11, "b c": 2, "d": 3, "e": 4})
    );
    assert_eq!(interpreter.get_global("missing").unwrap().to_native(), Value::Null);
}

#[test]
fn test_arrays_are_shared_by_reference() {
    let code = "var a = [1]; var b = a; b.push(2); b[0] = 9;";
    assert_eq!(global(code, "a"), json!([9, 2]));
}

#[test]
fn test_string_methods_and_index() {
    let code = "var s = \"Hello\"; var u = s.toUpperCase(); var c = s[1]; var n = s.length; var parts = \"a,b\".split(\",\");";
    let interpreter = run(code);
    assert_eq!(interpreter.get_global("u").unwrap().to_native(), json!("HELLO"));
    assert_eq!(interpreter.get_global("c").unwrap().to_native(), json!("e"));
    assert_eq!(interpreter.get_global("n").unwrap().to_native(), json!(5));
    assert_eq!(interpreter.get_global("parts").unwrap().to_native(), json!(["a", "b"]));
}

#[test]
fn test_builtin_globals() {
    let code = "var a = Math.max(1, 5, 3); var f = Math.floor(2.7); var p = parseInt(\"42px\"); var t = (2.5).toFixed(2);";
    let interpreter = run(code);
    assert_eq!(interpreter.get_global("a").unwrap().to_native(), json!(5));
    assert_eq!(interpreter.get_global("f").unwrap().to_native(), json!(2));
    assert_eq!(interpreter.get_global("p").unwrap().to_native(), json!(42));
    assert_eq!(interpreter.get_global("t").unwrap().to_native(), json!("2.50"));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_for_loop_sum() {
    assert_eq!(
        global("var s = 0; for (var i = 0; i < 3; i++) { s = s + i; }", "s"),
        json!(3)
    );
}

#[test]
fn test_break_and_continue() {
    let code = "var out = []; for (var i = 0; i < 10; i++) { if (i == 5) break; if (i % 2 == 0) continue; out.push(i); }";
    assert_eq!(global(code, "out"), json!([1, 3]));
}

#[test]
fn test_while_and_do_while() {
    let code = "var n = 0; while (n < 5) { n++; } var m = 10; do { m++; } while (m < 5);";
    let interpreter = run(code);
    assert_eq!(interpreter.get_global("n").unwrap().to_native(), json!(5));
    assert_eq!(interpreter.get_global("m").unwrap().to_native(), json!(11));
}

#[test]
fn test_continue_in_while_reevaluates_test() {
    let code = "var i = 0; var odd = 0; while (i < 6) { i++; if (i % 2 == 0) { continue; } odd++; }";
    assert_eq!(global(code, "odd"), json!(3));
}

#[test]
fn test_nested_loops_break_inner_only() {
    let code = "var pairs = 0; for (var i = 0; i < 3; i++) { for (var j = 0; j < 3; j++) { if (j > i) break; pairs++; } }";
    assert_eq!(global(code, "pairs"), json!(6));
}

#[test]
fn test_if_else_chain() {
    let code = "var x = 15; var r; if (x < 10) { r = \"low\"; } else if (x < 20) { r = \"mid\"; } else { r = \"high\"; }";
    assert_eq!(global(code, "r"), json!("mid"));
}

// ============================================================================
// Functions and scope
// ============================================================================

#[test]
fn test_function_call_and_return() {
    assert_eq!(global("function add(a, b) { return a + b; } var r = add(2, 3);", "r"), json!(5));
}

#[test]
fn test_missing_arguments_are_undefined() {
    assert_eq!(
        global("function f(a, b) { return typeof b; } var r = f(1);", "r"),
        json!("undefined")
    );
}

#[test]
fn test_recursion() {
    let code = "function fact(n) { if (n <= 1) return 1; return n * fact(n - 1); } var r = fact(5);";
    assert_eq!(global(code, "r"), json!(120));
}

#[test]
fn test_closures_keep_their_scope() {
    let code = "function counter() { var c = 0; return function() { c = c + 1; return c; }; } var next = counter(); next(); var v = next();";
    assert_eq!(global(code, "v"), json!(2));
}

#[test]
fn test_named_function_expression_refers_to_itself() {
    let code = "var fib = function f(n) { return n < 2 ? n : f(n - 1) + f(n - 2); }; var r = fib(10);";
    assert_eq!(global(code, "r"), json!(55));
}

#[test]
fn test_return_inside_loop_leaves_function() {
    let code = "function find(xs, x) { for (var i = 0; i < xs.length; i++) { if (xs[i] === x) { return i; } } return -1; } var a = find([4, 5, 6], 6); var b = find([1], 9);";
    let interpreter = run(code);
    assert_eq!(interpreter.get_global("a").unwrap().to_native(), json!(2));
    assert_eq!(interpreter.get_global("b").unwrap().to_native(), json!(-1));
}

#[test]
fn test_hoisting() {
    let code = "var r = later(); function later() { return 7; } var h = typeof hv; var hv = 1;";
    let interpreter = run(code);
    assert_eq!(interpreter.get_global("r").unwrap().to_native(), json!(7));
    assert_eq!(interpreter.get_global("h").unwrap().to_native(), json!("undefined"));
}

#[test]
fn test_let_is_block_scoped() {
    let interpreter = run("var r; { let x = 1; r = x; }");
    assert_eq!(interpreter.get_global("r").unwrap().to_native(), json!(1));
    assert!(interpreter.get_global("x").is_none());
}

#[test]
fn test_let_in_for_header_is_fresh_per_iteration() {
    let code = "var fs = []; for (let i = 0; i < 3; i++) { fs.push(function() { return i; }); } var first = fs[0](); var last = fs[2]();";
    let interpreter = run(code);
    assert_eq!(interpreter.get_global("first").unwrap().to_native(), json!(0));
    assert_eq!(interpreter.get_global("last").unwrap().to_native(), json!(2));
    assert!(interpreter.get_global("i").is_none());

    let shared = "var fs = []; for (var i = 0; i < 3; i++) { fs.push(function() { return i; }); } var first = fs[0]();";
    assert_eq!(global(shared, "first"), json!(3));
}

#[test]
fn test_var_in_function_stays_local() {
    let interpreter = run("function f() { var inner = 1; leak = 2; } f();");
    assert!(interpreter.get_global("inner").is_none());
    assert_eq!(interpreter.get_global("leak").unwrap().to_native(), json!(2));
}

// ============================================================================
// External values and intrinsics
// ============================================================================

#[test]
fn test_externals_become_globals() {
    let mut externals = Map::new();
    externals.insert("speed".to_string(), json!(3));
    externals.insert("not an identifier".to_string(), json!(1));
    let interpreter = run_with("var r = speed * 2;", externals);
    assert_eq!(interpreter.get_global("r").unwrap().to_native(), json!(6));
    assert!(interpreter.get_global("not an identifier").is_none());
}

#[test]
fn test_get_vars_serializes_externals() {
    let mut externals = Map::new();
    externals.insert("speed".to_string(), json!(3));
    externals.insert("font-size".to_string(), json!([1, 2]));
    let interpreter = run_with(
        "var vars = JSON.parse(getVars()); var a = vars.speed; var b = vars[\"font-size\"][1];",
        externals,
    );
    assert_eq!(interpreter.get_global("a").unwrap().to_native(), json!(3));
    assert_eq!(interpreter.get_global("b").unwrap().to_native(), json!(2));
}

#[test]
fn test_breakpoint_call_is_visible_on_the_stack() {
    let mut interpreter =
        Interpreter::initialize("var a = 1; view([[\"a\", \"A\"]]); var b = 2;", &Map::new()).unwrap();
    let mut at_breakpoint = 0;
    let mut was_at_breakpoint = false;
    let mut entered = 0;
    while interpreter.step().unwrap() {
        let now = interpreter.is_at_breakpoint();
        if now {
            at_breakpoint += 1;
            if !was_at_breakpoint {
                entered += 1;
            }
        }
        was_at_breakpoint = now;
    }
    assert!(at_breakpoint > 1);
    assert_eq!(entered, 1);
    assert!(!interpreter.is_at_breakpoint());
    assert_eq!(interpreter.get_global("b").unwrap().to_native(), json!(2));
}

#[test]
fn test_state_stack_tracks_function_frames() {
    let mut interpreter =
        Interpreter::initialize("function f() { return 1; } f();", &Map::new()).unwrap();
    let mut max_depth = 0;
    let mut saw_function = false;
    while interpreter.step().unwrap() {
        let stack = interpreter.state_stack();
        max_depth = max_depth.max(stack.len());
        if stack.iter().any(|frame| frame.function.as_ref().map(|f| f.name() == "f").unwrap_or(false)) {
            saw_function = true;
        }
    }
    assert!(saw_function);
    assert!(max_depth >= 4);
    assert_eq!(interpreter.state_stack().len(), 1);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_undeclared_read_is_reference_error() {
    let (interpreter, e) = run_err("var a = 1; var b = missing + 1;");
    assert_eq!(e, JErrorType::ReferenceError("missing is not defined".to_string()));
    let innermost = interpreter.state_stack().last().unwrap();
    assert_eq!(innermost.node.type_name(), "Identifier");
}

#[test]
fn test_const_reassignment_is_type_error() {
    let (_, e) = run_err("const k = 1; k = 2;");
    assert!(matches!(e, JErrorType::TypeError(_)));
}

#[test]
fn test_calling_non_function_is_type_error() {
    let (_, e) = run_err("var x = 1; x();");
    assert_eq!(e, JErrorType::TypeError("x is not a function".to_string()));
}

#[rstest]
#[case("var o = { list: [1] }; o.list.nope(1);", "o.list.nope is not a function")]
#[case("var r = [1, 2].nope();", "[1, 2].nope is not a function")]
#[case("function f() { return 1; } f()();", "f() is not a function")]
#[case("var o = { k: 1 }; o[\"k\"]();", "o[\"k\"] is not a function")]
fn non_function_callee_is_named_as_written(#[case] code: &str, #[case] message: &str) {
    let (_, e) = run_err(code);
    assert_eq!(e, JErrorType::TypeError(message.to_string()));
}

#[test]
fn test_reading_property_of_undefined() {
    let (_, e) = run_err("var o; var r = o.field;");
    assert!(e.to_string().contains("reading 'field'"));
}

#[test]
fn test_runaway_recursion_is_range_error() {
    let (_, e) = run_err("function f() { return f(); } f();");
    assert!(matches!(e, JErrorType::RangeError(_)));
}

#[test]
fn test_oversized_repeat_is_range_error() {
    let (_, e) = run_err("var s = 'ab'.repeat(1e19);");
    assert_eq!(e, JErrorType::RangeError("Invalid string length".to_string()));
    assert_eq!(global("var s = 'ab'.repeat(3);", "s"), json!("ababab"));
}

#[test]
fn test_empty_and_invalid_programs() {
    assert!(matches!(
        Interpreter::initialize("   \n", &Map::new()),
        Err(JErrorType::SyntaxError(_))
    ));
    assert!(matches!(
        Interpreter::initialize("var = ;", &Map::new()),
        Err(JErrorType::SyntaxError(_))
    ));
}

// ============================================================================
// Detached evaluation
// ============================================================================

#[test]
fn test_evaluate_detached_against_variables() {
    let mut variables = BTreeMap::new();
    variables.insert("a".to_string(), json!(21));
    variables.insert("xs".to_string(), json!([1, 2, 3]));
    assert_eq!(evaluate_detached("a * 2", &variables).unwrap(), json!(42));
    assert_eq!(evaluate_detached("xs[1] + xs.length", &variables).unwrap(), json!(5));
}

#[test]
fn test_evaluate_detached_errors() {
    let variables = BTreeMap::new();
    assert!(matches!(
        evaluate_detached("nope + 1", &variables),
        Err(JErrorType::ReferenceError(_))
    ));
    assert!(matches!(
        evaluate_detached("1 +", &variables),
        Err(JErrorType::SyntaxError(_))
    ));
}
