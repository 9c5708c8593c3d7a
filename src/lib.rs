//! # manual-stepper - step-through execution of manual functions
//!
//! An author writes a small JavaScript function computing a value from
//! external variables. This crate turns it into a program, runs it one AST
//! node at a time, records every intermediate state, and lets a viewer move
//! through that recording:
//! - source transformation (annotation comments become `view`/`step` calls)
//! - static linkage between locals and external variables
//! - a stepping tree-walking interpreter with an explicit frame stack
//! - a session that records the history and navigates it
//!
//! ## Quick Start
//!
//! ```
//! use manual_stepper::session::{ManualConfig, MemoryHost, Session};
//!
//! let config = ManualConfig {
//!     manual_function: Some(
//!         "function() {\n  var s = 0;\n  for (var i = 0; i < 3; i++) {\n    s = s + i;\n  }\n  // @view s->\"total\"\n  return s;\n}"
//!             .to_string(),
//!     ),
//!     ..Default::default()
//! };
//!
//! let mut session = Session::new(MemoryHost::default());
//! assert!(session.load(&config));
//! assert!(session.execution_error().is_none());
//! assert_eq!(session.breakpoint_points().len(), 1);
//!
//! assert!(session.step_to_next_breakpoint());
//! let step = session.current_step().unwrap();
//! assert_eq!(step.variables["s"], serde_json::json!(3));
//! ```
//!
//! ### Stepping the interpreter directly
//!
//! ```
//! use manual_stepper::runner::eval::Interpreter;
//!
//! let mut interpreter = Interpreter::initialize("var x = Math.abs(-42);", &Default::default()).unwrap();
//! while interpreter.step().unwrap() {
//!     let innermost = interpreter.state_stack().last().unwrap();
//!     println!("{}", innermost.node.type_name());
//! }
//! assert_eq!(interpreter.get_global("x").unwrap().to_native(), serde_json::json!(42));
//! ```
//!
//! ## Architecture
//!
//! - **[`transform`]** - Annotation rewrite, body extraction, harness, beautifier
//! - **[`analysis`]** - Linkage of locals to external variables
//! - **[`parser`]** - PEG parser and AST types
//! - **[`runner`]** - The stepping interpreter
//!   - **[`runner::ds`]** - Values, scopes, conversions
//!   - **[`runner::eval`]** - Frame visits and the interpreter driver
//!   - **[`runner::plugin`]** - Built-in registry
//!   - **[`runner::std_lib`]** - `Math`, `JSON`, `console`, value methods, intrinsics
//! - **[`session`]** - History recording, navigation, position mapping

#[macro_use]
extern crate lazy_static;

pub mod analysis;
pub mod parser;
pub mod runner;
pub mod session;
pub mod transform;
