//! Console built-in object.
//!
//! Author code runs inside a host that owns stdout, so console output is
//! routed to `tracing` instead of being printed.

use tracing::{error, info, warn};

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

/// Register the console object with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let console = BuiltInObject::new("console")
        .add_method("log", console_log)
        .add_method("error", console_error)
        .add_method("warn", console_warn)
        .add_method("info", console_log);

    registry.register_object(console);
}

/// Format a JsValue for console output.
fn format_value(value: &JsValue) -> String {
    match value {
        JsValue::Array(_) | JsValue::Object(_) => value.to_native().to_string(),
        other => other.to_string(),
    }
}

/// Format all arguments for console output.
pub(crate) fn format_args(args: &[JsValue]) -> String {
    args.iter()
        .map(format_value)
        .collect::<Vec<_>>()
        .join(" ")
}

fn console_log(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    info!(target: "manual_stepper::console", "{}", format_args(&args));
    Ok(JsValue::Undefined)
}

fn console_error(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    error!(target: "manual_stepper::console", "{}", format_args(&args));
    Ok(JsValue::Undefined)
}

fn console_warn(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    warn!(target: "manual_stepper::console", "{}", format_args(&args));
    Ok(JsValue::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::operations::type_conversion::number_value;

    #[test]
    fn formats_mixed_arguments() {
        let args = vec![
            JsValue::String("total".to_string()),
            number_value(1.5),
            JsValue::new_array(vec![number_value(1.0), number_value(2.0)]),
        ];
        assert_eq!(format_args(&args), "total 1.5 [1,2]");
    }
}
