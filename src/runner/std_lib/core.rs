//! Registers every built-in the interpreter ships with.

use crate::runner::plugin::registry::BuiltInRegistry;

use super::array;
use super::console;
use super::intrinsics;
use super::json;
use super::math;
use super::number;
use super::string;

pub fn register_core_builtins(registry: &mut BuiltInRegistry) {
    array::register(registry);
    string::register(registry);
    number::register(registry);
    math::register(registry);
    json::register(registry);
    console::register(registry);
    intrinsics::register(registry);
}
