//! Stepping evaluation of the parsed program.
//!
//! Statements and expressions are visited one frame at a time by
//! [`Interpreter`]; `statement` and `expression` hold the visits, `function`
//! the closure and hoisting helpers.

pub mod expression;
pub mod function;
pub mod interpreter;
pub mod statement;
pub mod types;

pub use interpreter::{evaluate_detached, Interpreter};
pub use types::{CompletionType, StateFrame, ValueResult};
