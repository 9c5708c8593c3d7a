//! Number prototype methods and the numeric global functions.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::{
    number_to_string, number_value, to_js_string, to_number,
};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInFn, BuiltInObject, EvalContext};

/// Register the Number method table and the global parse/test functions.
pub fn register(registry: &mut BuiltInRegistry) {
    let number = BuiltInObject::new("Number")
        .as_prototype()
        .add_method("toString", number_to_string_method)
        .add_method("toFixed", number_to_fixed);

    registry.register_object(number);
    registry.register_function("parseFloat", BuiltInFn::Native(parse_float));
    registry.register_function("parseInt", BuiltInFn::Native(parse_int));
    registry.register_function("isNaN", BuiltInFn::Native(is_nan));
    registry.register_function("isFinite", BuiltInFn::Native(is_finite));
}

fn this_number(this: &JsValue, method: &str) -> Result<f64, JErrorType> {
    match this {
        JsValue::Number(n) => Ok(n.as_f64()),
        other => Err(JErrorType::TypeError(format!(
            "Number.prototype.{} called on {}",
            method, other
        ))),
    }
}

/// Number.prototype.toString, radix 2 to 36 for integral values.
fn number_to_string_method(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let value = this_number(&this, "toString")?;
    let radix = match args.first() {
        None | Some(JsValue::Undefined) => 10,
        Some(v) => to_number(v) as u32,
    };
    if !(2..=36).contains(&radix) {
        return Err(JErrorType::RangeError(
            "toString() radix must be between 2 and 36".to_string(),
        ));
    }
    if radix == 10 || !value.is_finite() || value.fract() != 0.0 {
        return Ok(JsValue::String(number_to_string(value)));
    }
    let negative = value < 0.0;
    let mut n = value.abs() as u64;
    let mut digits = vec![];
    loop {
        let d = (n % radix as u64) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        n /= radix as u64;
        if n == 0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    Ok(JsValue::String(digits.into_iter().rev().collect()))
}

fn number_to_fixed(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let value = this_number(&this, "toFixed")?;
    let digits = args.first().map(to_number).unwrap_or(0.0);
    if !(0.0..=100.0).contains(&digits) {
        return Err(JErrorType::RangeError(
            "toFixed() digits argument must be between 0 and 100".to_string(),
        ));
    }
    if !value.is_finite() {
        return Ok(JsValue::String(number_to_string(value)));
    }
    Ok(JsValue::String(format!("{:.1$}", value, digits as usize)))
}

/// Longest numeric prefix of a string, as `parseFloat` reads it.
fn parse_float(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let text = args.first().map(to_js_string).unwrap_or_default();
    let text = text.trim_start();
    if text.starts_with("Infinity") || text.starts_with("+Infinity") {
        return Ok(number_value(f64::INFINITY));
    }
    if text.starts_with("-Infinity") {
        return Ok(number_value(f64::NEG_INFINITY));
    }
    let mut best = f64::NAN;
    for end in (1..=text.len()).rev() {
        if !text.is_char_boundary(end) {
            continue;
        }
        let candidate = &text[..end];
        if candidate.ends_with(|c: char| c.is_ascii_alphabetic()) {
            continue;
        }
        if let Ok(f) = candidate.parse::<f64>() {
            best = f;
            break;
        }
    }
    Ok(number_value(best))
}

fn parse_int(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let text = args.first().map(to_js_string).unwrap_or_default();
    let mut text = text.trim();
    let mut radix = match args.get(1) {
        None | Some(JsValue::Undefined) => 10,
        Some(v) => to_number(v) as u32,
    };
    let negative = text.starts_with('-');
    if negative || text.starts_with('+') {
        text = &text[1..];
    }
    if (radix == 16 || args.get(1).is_none()) && (text.starts_with("0x") || text.starts_with("0X")) {
        text = &text[2..];
        radix = 16;
    }
    if !(2..=36).contains(&radix) {
        return Ok(number_value(f64::NAN));
    }
    let digits: String = text.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return Ok(number_value(f64::NAN));
    }
    let mut value = 0f64;
    for c in digits.chars() {
        value = value * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64;
    }
    Ok(number_value(if negative { -value } else { value }))
}

fn is_nan(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let n = args.first().map(to_number).unwrap_or(f64::NAN);
    Ok(JsValue::Boolean(n.is_nan()))
}

fn is_finite(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let n = args.first().map(to_number).unwrap_or(f64::NAN);
    Ok(JsValue::Boolean(n.is_finite()))
}
