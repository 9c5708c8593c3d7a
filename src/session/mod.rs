//! Recording a run and navigating it.

mod autoplay;
pub mod config;
mod controller;
mod history;
mod host;
pub mod position;
pub mod state;

pub use autoplay::Autoplay;
pub use config::{ConfigError, ManualConfig, VariableRole, VariableSpec};
pub use controller::{Session, SessionState};
pub use history::History;
pub use host::{Host, MemoryHost};
pub use position::{map_offset, map_range};
pub use state::{BreakpointPayload, HighlightRange, StateBuilder, Step, StepPayload, ViewEntry};
