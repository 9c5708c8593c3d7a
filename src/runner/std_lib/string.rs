//! String prototype methods.
//!
//! Indices count Unicode scalar values rather than UTF-16 code units.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::{number_value, to_js_string, to_number};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

/// Longest string a method may build, in bytes.
pub const MAX_STRING_LENGTH: usize = (1 << 29) - 24;

fn invalid_length() -> JErrorType {
    JErrorType::RangeError("Invalid string length".to_string())
}

/// Register the String method table with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let string = BuiltInObject::new("String")
        .as_prototype()
        .add_method("charAt", string_char_at)
        .add_method("indexOf", string_index_of)
        .add_method("includes", string_includes)
        .add_method("startsWith", string_starts_with)
        .add_method("endsWith", string_ends_with)
        .add_method("slice", string_slice)
        .add_method("substring", string_substring)
        .add_method("split", string_split)
        .add_method("trim", string_trim)
        .add_method("toUpperCase", string_to_upper_case)
        .add_method("toLowerCase", string_to_lower_case)
        .add_method("repeat", string_repeat)
        .add_method("padStart", string_pad_start)
        .add_method("concat", string_concat);

    registry.register_object(string);
}

fn this_string(this: &JsValue, method: &str) -> Result<String, JErrorType> {
    match this {
        JsValue::String(s) => Ok(s.clone()),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "String.prototype.{} called on null or undefined",
            method
        ))),
        other => Ok(to_js_string(other)),
    }
}

fn arg_string(args: &[JsValue], i: usize) -> String {
    match args.get(i) {
        None | Some(JsValue::Undefined) => "undefined".to_string(),
        Some(v) => to_js_string(v),
    }
}

fn arg_index(args: &[JsValue], i: usize, default: f64) -> f64 {
    match args.get(i) {
        None | Some(JsValue::Undefined) => default,
        Some(v) => {
            let n = to_number(v);
            if n.is_nan() {
                0.0
            } else {
                n.trunc()
            }
        }
    }
}

fn string_char_at(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "charAt")?;
    let i = arg_index(&args, 0, 0.0);
    let c = if i < 0.0 {
        None
    } else {
        s.chars().nth(i as usize)
    };
    Ok(JsValue::String(c.map(String::from).unwrap_or_default()))
}

fn string_index_of(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "indexOf")?;
    let needle = arg_string(&args, 0);
    let position = s
        .find(&needle)
        .map(|byte| s[..byte].chars().count() as f64)
        .unwrap_or(-1.0);
    Ok(number_value(position))
}

fn string_includes(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "includes")?;
    Ok(JsValue::Boolean(s.contains(&arg_string(&args, 0))))
}

fn string_starts_with(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "startsWith")?;
    Ok(JsValue::Boolean(s.starts_with(&arg_string(&args, 0))))
}

fn string_ends_with(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "endsWith")?;
    Ok(JsValue::Boolean(s.ends_with(&arg_string(&args, 0))))
}

fn char_range(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn string_slice(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "slice")?;
    let len = s.chars().count() as f64;
    let resolve = |n: f64| if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
    let start = resolve(arg_index(&args, 0, 0.0));
    let end = resolve(arg_index(&args, 1, len));
    Ok(JsValue::String(char_range(&s, start as usize, end as usize)))
}

fn string_substring(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "substring")?;
    let len = s.chars().count() as f64;
    let a = arg_index(&args, 0, 0.0).max(0.0).min(len);
    let b = arg_index(&args, 1, len).max(0.0).min(len);
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    Ok(JsValue::String(char_range(&s, start as usize, end as usize)))
}

fn string_split(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "split")?;
    let parts: Vec<JsValue> = match args.first() {
        None | Some(JsValue::Undefined) => vec![JsValue::String(s)],
        Some(sep) => {
            let sep = to_js_string(sep);
            if sep.is_empty() {
                s.chars().map(|c| JsValue::String(c.to_string())).collect()
            } else {
                s.split(sep.as_str())
                    .map(|p| JsValue::String(p.to_string()))
                    .collect()
            }
        }
    };
    Ok(JsValue::new_array(parts))
}

fn string_trim(_ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "trim")?;
    Ok(JsValue::String(s.trim().to_string()))
}

fn string_to_upper_case(_ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "toUpperCase")?;
    Ok(JsValue::String(s.to_uppercase()))
}

fn string_to_lower_case(_ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "toLowerCase")?;
    Ok(JsValue::String(s.to_lowercase()))
}

fn string_repeat(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "repeat")?;
    let count = arg_index(&args, 0, 0.0);
    if count < 0.0 || count.is_infinite() {
        return Err(JErrorType::RangeError(format!("Invalid count value: {}", count)));
    }
    if s.is_empty() {
        return Ok(JsValue::String(s));
    }
    if count > MAX_STRING_LENGTH as f64 {
        return Err(invalid_length());
    }
    let count = count as usize;
    match s.len().checked_mul(count) {
        Some(len) if len <= MAX_STRING_LENGTH => Ok(JsValue::String(s.repeat(count))),
        _ => Err(invalid_length()),
    }
}

fn string_pad_start(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(&this, "padStart")?;
    let target = arg_index(&args, 0, 0.0).max(0.0) as usize;
    let filler = match args.get(1) {
        None | Some(JsValue::Undefined) => " ".to_string(),
        Some(v) => to_js_string(v),
    };
    let len = s.chars().count();
    if target <= len || filler.is_empty() {
        return Ok(JsValue::String(s));
    }
    if target > MAX_STRING_LENGTH {
        return Err(invalid_length());
    }
    let padding: String = filler.chars().cycle().take(target - len).collect();
    Ok(JsValue::String(format!("{}{}", padding, s)))
}

fn string_concat(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut s = this_string(&this, "concat")?;
    for arg in &args {
        s.push_str(&to_js_string(arg));
    }
    Ok(JsValue::String(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(s: &str) -> JsValue {
        JsValue::String(s.to_string())
    }

    #[test]
    fn repeat_builds_short_strings() {
        let mut ctx = EvalContext::new();
        let r = string_repeat(&mut ctx, string("ab"), vec![number_value(3.0)]).unwrap();
        assert_eq!(r.to_native(), serde_json::json!("ababab"));
        let empty = string_repeat(&mut ctx, string(""), vec![number_value(1e19)]).unwrap();
        assert_eq!(empty.to_native(), serde_json::json!(""));
    }

    #[test]
    fn oversized_results_are_range_errors() {
        let mut ctx = EvalContext::new();
        assert_eq!(
            string_repeat(&mut ctx, string("ab"), vec![number_value(1e19)]).unwrap_err(),
            JErrorType::RangeError("Invalid string length".to_string())
        );
        assert_eq!(
            string_repeat(&mut ctx, string("ab"), vec![number_value(4e8)]).unwrap_err(),
            JErrorType::RangeError("Invalid string length".to_string())
        );
        assert!(matches!(
            string_pad_start(&mut ctx, string("a"), vec![number_value(1e12)]),
            Err(JErrorType::RangeError(_))
        ));
    }
}
