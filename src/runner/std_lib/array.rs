//! Array prototype methods.
//!
//! Callback taking methods (`map`, `forEach`, ...) are not provided: a native
//! cannot re-enter the stepper, and author code uses plain loops instead.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::test_and_comparison::strict_equal;
use crate::runner::ds::operations::type_conversion::{number_value, to_js_string, to_number};
use crate::runner::ds::value::{ArrayRef, JsValue};
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

/// Register the Array method table with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let array = BuiltInObject::new("Array")
        .as_prototype()
        .add_method("push", array_push)
        .add_method("pop", array_pop)
        .add_method("shift", array_shift)
        .add_method("unshift", array_unshift)
        .add_method("slice", array_slice)
        .add_method("indexOf", array_index_of)
        .add_method("includes", array_includes)
        .add_method("join", array_join)
        .add_method("concat", array_concat)
        .add_method("reverse", array_reverse);

    registry.register_object(array);
}

fn this_array(this: &JsValue, method: &str) -> Result<ArrayRef, JErrorType> {
    match this {
        JsValue::Array(items) => Ok(items.clone()),
        other => Err(JErrorType::TypeError(format!(
            "Array.prototype.{} called on {}",
            method, other
        ))),
    }
}

/// Resolves a relative index argument (negative counts from the end).
fn relative_index(arg: Option<&JsValue>, len: usize, default: usize) -> usize {
    match arg {
        None | Some(JsValue::Undefined) => default,
        Some(v) => {
            let n = to_number(v);
            if n.is_nan() {
                0
            } else if n < 0.0 {
                (len as f64 + n.trunc()).max(0.0) as usize
            } else {
                (n.trunc() as usize).min(len)
            }
        }
    }
}

fn array_push(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let items = this_array(&this, "push")?;
    let mut items = items.borrow_mut();
    items.extend(args);
    Ok(number_value(items.len() as f64))
}

fn array_pop(_ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let items = this_array(&this, "pop")?;
    let popped = items.borrow_mut().pop();
    Ok(popped.unwrap_or(JsValue::Undefined))
}

fn array_shift(_ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let items = this_array(&this, "shift")?;
    let mut items = items.borrow_mut();
    if items.is_empty() {
        Ok(JsValue::Undefined)
    } else {
        Ok(items.remove(0))
    }
}

fn array_unshift(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let items = this_array(&this, "unshift")?;
    let mut items = items.borrow_mut();
    for (i, arg) in args.into_iter().enumerate() {
        items.insert(i, arg);
    }
    Ok(number_value(items.len() as f64))
}

fn array_slice(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let items = this_array(&this, "slice")?;
    let items = items.borrow();
    let start = relative_index(args.first(), items.len(), 0);
    let end = relative_index(args.get(1), items.len(), items.len());
    let sliced = if start < end {
        items[start..end].to_vec()
    } else {
        vec![]
    };
    Ok(JsValue::new_array(sliced))
}

fn array_index_of(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let items = this_array(&this, "indexOf")?;
    let needle = args.first().cloned().unwrap_or(JsValue::Undefined);
    let position = items.borrow().iter().position(|v| strict_equal(v, &needle));
    Ok(number_value(position.map(|p| p as f64).unwrap_or(-1.0)))
}

fn array_includes(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let items = this_array(&this, "includes")?;
    let needle = args.first().cloned().unwrap_or(JsValue::Undefined);
    let found = items.borrow().iter().any(|v| {
        strict_equal(v, &needle) || (to_number(v).is_nan() && to_number(&needle).is_nan() && matches!(v, JsValue::Number(_)))
    });
    Ok(JsValue::Boolean(found))
}

fn array_join(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let items = this_array(&this, "join")?;
    let separator = match args.first() {
        None | Some(JsValue::Undefined) => ",".to_string(),
        Some(v) => to_js_string(v),
    };
    let parts: Vec<String> = items
        .borrow()
        .iter()
        .map(|v| match v {
            JsValue::Undefined | JsValue::Null => String::new(),
            other => to_js_string(other),
        })
        .collect();
    Ok(JsValue::String(parts.join(&separator)))
}

fn array_concat(_ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let items = this_array(&this, "concat")?;
    let mut result = items.borrow().clone();
    for arg in args {
        match arg {
            JsValue::Array(other) => result.extend(other.borrow().iter().cloned()),
            other => result.push(other),
        }
    }
    Ok(JsValue::new_array(result))
}

fn array_reverse(_ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let items = this_array(&this, "reverse")?;
    items.borrow_mut().reverse();
    Ok(this)
}
