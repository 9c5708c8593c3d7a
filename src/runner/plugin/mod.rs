//! Built-in objects and the registry they are installed from.
//!
//! Each built-in is described once as a [`BuiltInObject`] (a named table of
//! native methods and constant properties) and registered with a
//! [`BuiltInRegistry`]. The interpreter materializes the registry into its
//! intrinsic scope when it is initialized:
//!
//! ```text
//! Variable Lookup Order:
//! 1. Local scope (function/block)
//! 2. Outer scopes (lexical chain)
//! 3. Global scope           <- external values and author globals
//! 4. Intrinsic scope        <- Math, JSON, console, view, step, getVars
//! ```
//!
//! Objects registered with [`BuiltInKind::Prototype`] are not bound to a name.
//! They hold the methods that values of that kind expose (`[].push`,
//! `(1.5).toFixed`, ...), and the interpreter looks them up by receiver type.

pub mod registry;
pub mod types;

pub use registry::BuiltInRegistry;
pub use types::{BuiltInFn, BuiltInKind, BuiltInObject, EvalContext, NativeFn};
