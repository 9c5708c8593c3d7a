//! JSON built-in object.
//!
//! Provides JSON.parse and JSON.stringify methods, backed by `serde_json`.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::to_js_string;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

/// Register the JSON object with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let json = BuiltInObject::new("JSON")
        .add_method("parse", json_parse)
        .add_method("stringify", json_stringify);

    registry.register_object(json);
}

/// JSON.parse - Parse JSON string to JavaScript value.
fn json_parse(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let text = match args.first() {
        Some(JsValue::String(s)) => s.clone(),
        Some(other) => to_js_string(other),
        None => return Err(JErrorType::SyntaxError("Unexpected end of JSON input".to_string())),
    };
    serde_json::from_str::<serde_json::Value>(&text)
        .map(|value| JsValue::from_native(&value))
        .map_err(|e| JErrorType::SyntaxError(format!("JSON.parse: {}", e)))
}

/// JSON.stringify - Serialize a value. A numeric third argument pretty prints.
fn json_stringify(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let value = match args.first() {
        None | Some(JsValue::Undefined) | Some(JsValue::Function(_)) => {
            return Ok(JsValue::Undefined)
        }
        Some(v) => v.to_native(),
    };
    let pretty = matches!(args.get(2), Some(JsValue::Number(_)) | Some(JsValue::String(_)));
    let text = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    text.map(JsValue::String)
        .map_err(|e| JErrorType::TypeError(format!("JSON.stringify: {}", e)))
}
