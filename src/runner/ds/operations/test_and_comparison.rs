use std::rc::Rc;

use crate::runner::ds::operations::type_conversion::{get_type, to_number, TYPE_STR_NULL, TYPE_STR_UNDEFINED};
use crate::runner::ds::value::JsValue;

/// `===`
pub fn strict_equal(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Number(x), JsValue::Number(y)) => x.as_f64() == y.as_f64(),
        (JsValue::String(x), JsValue::String(y)) => x == y,
        (JsValue::Boolean(x), JsValue::Boolean(y)) => x == y,
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Array(x), JsValue::Array(y)) => Rc::ptr_eq(x, y),
        (JsValue::Object(x), JsValue::Object(y)) => Rc::ptr_eq(x, y),
        (JsValue::Function(x), JsValue::Function(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// `==`
pub fn loose_equal(a: &JsValue, b: &JsValue) -> bool {
    let type_a = get_type(a);
    let type_b = get_type(b);
    if type_a == type_b {
        return strict_equal(a, b);
    }
    let nullish = |t: &str| t == TYPE_STR_UNDEFINED || t == TYPE_STR_NULL;
    if nullish(type_a) || nullish(type_b) {
        return nullish(type_a) && nullish(type_b);
    }
    match (a, b) {
        (JsValue::Array(_) | JsValue::Object(_), JsValue::String(s))
        | (JsValue::String(s), JsValue::Array(_) | JsValue::Object(_)) => {
            let other = if matches!(a, JsValue::String(_)) { b } else { a };
            other.to_string() == *s
        }
        _ => to_number(a) == to_number(b),
    }
}

/// Result of the abstract relational comparison `a < b`; `None` when either
/// side is NaN.
pub fn less_than(a: &JsValue, b: &JsValue) -> Option<bool> {
    if let (JsValue::String(x), JsValue::String(y)) = (a, b) {
        return Some(x < y);
    }
    let x = to_number(a);
    let y = to_number(b);
    if x.is_nan() || y.is_nan() {
        None
    } else {
        Some(x < y)
    }
}
