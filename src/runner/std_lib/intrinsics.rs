//! Functions the harness and the breakpoint annotations rely on.
//!
//! `view` and `step` do nothing when called. The controller notices them by
//! looking for a call to one of these names on the interpreter stack.
//! `getVars` hands the external values to the harness as a JSON string.

use tracing::trace;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInFn, EvalContext};

pub const BREAKPOINT_FUNCTIONS: [&str; 2] = ["view", "step"];
pub const GET_VARS_FUNCTION: &str = "getVars";

pub fn is_breakpoint_function(name: &str) -> bool {
    BREAKPOINT_FUNCTIONS.contains(&name)
}

pub fn register(registry: &mut BuiltInRegistry) {
    for name in BREAKPOINT_FUNCTIONS {
        registry.register_function(
            name,
            BuiltInFn::Plugin(Box::new(move |_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>| {
                trace!("breakpoint marker {} reached with {} argument(s)", name, args.len());
                Ok(JsValue::Undefined)
            })),
        );
    }
    registry.register_function(GET_VARS_FUNCTION, BuiltInFn::Native(get_vars));
}

fn get_vars(ctx: &mut EvalContext, _this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    serde_json::to_string(&ctx.external_values)
        .map(JsValue::String)
        .map_err(|e| JErrorType::TypeError(format!("getVars: {}", e)))
}
