//! The fixed program text the function body runs inside.

/// Name of the function wrapping the author's body.
pub const HARNESS_FUNCTION: &str = "__manual";
/// Global receiving the return value of the wrapped function.
pub const RESULT_VARIABLE: &str = "__result";
/// Local holding the parsed external values.
pub const VALUES_BINDING: &str = "vars";

pub fn wrap(body: &str) -> String {
    format!(
        "function {func}() {{\n{body}\n}}\nvar {vars} = JSON.parse(getVars());\nvar {result} = {func}();\n",
        func = HARNESS_FUNCTION,
        body = body,
        vars = VALUES_BINDING,
        result = RESULT_VARIABLE,
    )
}
