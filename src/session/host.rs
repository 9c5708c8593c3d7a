//! The collaborator the session reports to.

use serde_json::{Map, Value};

use super::state::HighlightRange;

/// Everything the session needs from the surrounding application.
pub trait Host {
    /// Current value of every external variable, keyed by id.
    fn get_external_values(&self) -> Map<String, Value>;

    fn set_external_value(&mut self, id: &str, value: Value);

    /// Highlights a range of the displayed code; `None` clears it.
    fn highlight_range(&mut self, range: Option<HighlightRange>);

    fn apply_variable_cue(&mut self, ids: &[String]);

    fn clear_all_cues(&mut self);

    fn report_error(&mut self, message: &str);
}

/// A host that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    pub values: Map<String, Value>,
    pub highlighted: Option<HighlightRange>,
    pub cued: Vec<String>,
    pub errors: Vec<String>,
}

impl MemoryHost {
    pub fn new(values: Map<String, Value>) -> Self {
        MemoryHost {
            values,
            ..Default::default()
        }
    }
}

impl Host for MemoryHost {
    fn get_external_values(&self) -> Map<String, Value> {
        self.values.clone()
    }

    fn set_external_value(&mut self, id: &str, value: Value) {
        self.values.insert(id.to_string(), value);
    }

    fn highlight_range(&mut self, range: Option<HighlightRange>) {
        self.highlighted = range;
    }

    fn apply_variable_cue(&mut self, ids: &[String]) {
        self.cued = ids.to_vec();
    }

    fn clear_all_cues(&mut self) {
        self.cued.clear();
    }

    fn report_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
