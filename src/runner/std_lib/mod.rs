//! Standard library built-in objects.
//!
//! Implementations of the built-ins available to manual functions: `Math`,
//! `JSON`, `console`, the array, string and number methods, and the breakpoint
//! intrinsics.

pub mod array;
pub mod console;
pub mod core;
pub mod intrinsics;
pub mod json;
pub mod math;
pub mod number;
pub mod string;

pub use core::register_core_builtins;
