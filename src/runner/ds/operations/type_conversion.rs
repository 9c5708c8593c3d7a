use crate::runner::ds::value::{JsNumberType, JsValue};

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";
pub const TYPE_STR_BOOLEAN: &str = "boolean";
pub const TYPE_STR_STRING: &str = "string";
pub const TYPE_STR_NUMBER: &str = "number";
pub const TYPE_STR_OBJECT: &str = "object";
pub const TYPE_STR_FUNCTION: &str = "function";

/// Internal type tag. `null` keeps its own tag here; see `type_of` for the
/// operator result.
pub fn get_type(a: &JsValue) -> &'static str {
    match a {
        JsValue::Undefined => TYPE_STR_UNDEFINED,
        JsValue::Null => TYPE_STR_NULL,
        JsValue::Boolean(_) => TYPE_STR_BOOLEAN,
        JsValue::String(_) => TYPE_STR_STRING,
        JsValue::Number(_) => TYPE_STR_NUMBER,
        JsValue::Array(_) | JsValue::Object(_) => TYPE_STR_OBJECT,
        JsValue::Function(_) => TYPE_STR_FUNCTION,
    }
}

/// Result of the `typeof` operator.
pub fn type_of(a: &JsValue) -> &'static str {
    match a {
        JsValue::Null => TYPE_STR_OBJECT,
        other => get_type(other),
    }
}

pub fn to_boolean(v: &JsValue) -> bool {
    match v {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::String(s) => !s.is_empty(),
        JsValue::Number(n) => {
            let f = n.as_f64();
            !(f.is_nan() || f == 0.0)
        }
        JsValue::Array(_) | JsValue::Object(_) | JsValue::Function(_) => true,
    }
}

pub fn to_number(v: &JsValue) -> f64 {
    match v {
        JsValue::Undefined => f64::NAN,
        JsValue::Null => 0.0,
        JsValue::Boolean(true) => 1.0,
        JsValue::Boolean(false) => 0.0,
        JsValue::Number(n) => n.as_f64(),
        JsValue::String(s) => string_to_number(s),
        JsValue::Array(items) => {
            let items = (**items).borrow();
            match items.len() {
                0 => 0.0,
                1 => to_number(&JsValue::String(items[0].to_string())),
                _ => f64::NAN,
            }
        }
        JsValue::Object(_) | JsValue::Function(_) => f64::NAN,
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts spellings such as "inf" and "nan" that JS does not.
        t if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        t => t.parse::<f64>().unwrap_or(f64::NAN),
    }
}

pub fn to_js_string(v: &JsValue) -> String {
    v.to_string()
}

pub fn number_value(f: f64) -> JsValue {
    JsValue::Number(JsNumberType::from_f64(f))
}

/// Formats a number the way JS `String(n)` does for everyday magnitudes.
pub fn number_to_string(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "Infinity".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if f == 0.0 {
        "0".to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{:.0}", f)
    } else if f.abs() >= 1e21 || f.abs() < 1e-6 {
        let formatted = format!("{:e}", f);
        // Rust prints `1e21`, JS prints `1e+21`.
        match formatted.find('e') {
            Some(pos) if !formatted[pos + 1..].starts_with('-') => {
                format!("{}e+{}", &formatted[..pos], &formatted[pos + 1..])
            }
            _ => formatted,
        }
    } else {
        format!("{}", f)
    }
}

/// Integer conversion used by array indexing; `None` for non-integral keys.
pub fn to_index(v: &JsValue) -> Option<usize> {
    let f = to_number(v);
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 {
        Some(f as usize)
    } else {
        None
    }
}
