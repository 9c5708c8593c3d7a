//! Math built-in object.
//!
//! Provides mathematical constants and functions.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::{number_value, to_number};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

/// Register the Math object with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let math = BuiltInObject::new("Math")
        // Constants
        .add_property("E", number_value(std::f64::consts::E))
        .add_property("LN10", number_value(std::f64::consts::LN_10))
        .add_property("LN2", number_value(std::f64::consts::LN_2))
        .add_property("LOG10E", number_value(std::f64::consts::LOG10_E))
        .add_property("LOG2E", number_value(std::f64::consts::LOG2_E))
        .add_property("PI", number_value(std::f64::consts::PI))
        .add_property("SQRT1_2", number_value(std::f64::consts::FRAC_1_SQRT_2))
        .add_property("SQRT2", number_value(std::f64::consts::SQRT_2))
        // Methods
        .add_method("abs", math_abs)
        .add_method("floor", math_floor)
        .add_method("ceil", math_ceil)
        .add_method("round", math_round)
        .add_method("trunc", math_trunc)
        .add_method("sign", math_sign)
        .add_method("min", math_min)
        .add_method("max", math_max)
        .add_method("sqrt", math_sqrt)
        .add_method("cbrt", math_cbrt)
        .add_method("pow", math_pow)
        .add_method("exp", math_exp)
        .add_method("log", math_log)
        .add_method("log10", math_log10)
        .add_method("log2", math_log2)
        .add_method("sin", math_sin)
        .add_method("cos", math_cos)
        .add_method("tan", math_tan)
        .add_method("asin", math_asin)
        .add_method("acos", math_acos)
        .add_method("atan", math_atan)
        .add_method("atan2", math_atan2)
        .add_method("hypot", math_hypot)
        .add_method("random", math_random);

    registry.register_object(math);
}

/// First argument as a number, `NaN` when missing.
fn first_arg(args: &[JsValue]) -> f64 {
    args.first().map(to_number).unwrap_or(f64::NAN)
}

fn unary(args: &[JsValue], op: fn(f64) -> f64) -> Result<JsValue, JErrorType> {
    Ok(number_value(op(first_arg(args))))
}

fn math_abs(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::abs)
}

fn math_floor(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::floor)
}

fn math_ceil(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::ceil)
}

/// Math.round - rounds half up, unlike `f64::round`.
fn math_round(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, |x| (x + 0.5).floor())
}

fn math_trunc(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::trunc)
}

fn math_sign(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, |x| {
        if x.is_nan() || x == 0.0 {
            x
        } else {
            x.signum()
        }
    })
}

fn math_min(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut result = f64::INFINITY;
    for arg in &args {
        let x = to_number(arg);
        if x.is_nan() {
            return Ok(number_value(f64::NAN));
        }
        if x < result {
            result = x;
        }
    }
    Ok(number_value(result))
}

fn math_max(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut result = f64::NEG_INFINITY;
    for arg in &args {
        let x = to_number(arg);
        if x.is_nan() {
            return Ok(number_value(f64::NAN));
        }
        if x > result {
            result = x;
        }
    }
    Ok(number_value(result))
}

fn math_sqrt(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::sqrt)
}

fn math_cbrt(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::cbrt)
}

fn math_pow(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let base = first_arg(&args);
    let exponent = args.get(1).map(to_number).unwrap_or(f64::NAN);
    Ok(number_value(base.powf(exponent)))
}

fn math_exp(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::exp)
}

fn math_log(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::ln)
}

fn math_log10(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::log10)
}

fn math_log2(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::log2)
}

fn math_sin(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::sin)
}

fn math_cos(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::cos)
}

fn math_tan(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::tan)
}

fn math_asin(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::asin)
}

fn math_acos(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::acos)
}

fn math_atan(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(&args, f64::atan)
}

fn math_atan2(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let y = first_arg(&args);
    let x = args.get(1).map(to_number).unwrap_or(f64::NAN);
    Ok(number_value(y.atan2(x)))
}

fn math_hypot(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let sum: f64 = args.iter().map(|a| to_number(a).powi(2)).sum();
    Ok(number_value(sum.sqrt()))
}

/// Math.random - time seeded LCG, good enough for demo formulas.
fn math_random(_ctx: &mut EvalContext, _this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    use std::time::{SystemTime, UNIX_EPOCH};
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let random = (seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407)
        >> 11) as f64
        / (1u64 << 53) as f64;
    Ok(number_value(random))
}
