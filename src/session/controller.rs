//! The execution controller.
//!
//! A [`Session`] runs the program once per refresh, records every
//! intermediate state, and then moves an index over that history. Moving
//! notifies the [`Host`]: the highlighted range, the values of linked
//! variables, and (on the next [`Session::flush_visual_cues`]) which external
//! variables changed.

use std::time::{Duration, Instant};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, debug_span, error, info, trace};
use uuid::Uuid;

use crate::analysis::{analyze, merge, KnownVariables, Linkage, LinkageMap};
use crate::runner::eval::Interpreter;
use crate::transform::{SourceTransformer, Transformed, RESULT_VARIABLE};

use super::autoplay::Autoplay;
use super::config::ManualConfig;
use super::history::{enters_block, History};
use super::host::Host;
use super::position::{line_of_offset, line_text, map_range};
use super::state::{HighlightRange, StateBuilder, Step};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Initializing,
    Ready,
}

pub struct Session<H: Host> {
    id: Uuid,
    host: H,
    state: SessionState,
    program_text: String,
    display_text: Option<String>,
    history: History,
    current: usize,
    linkage: LinkageMap,
    execution_error: Option<String>,
    active_variables: Vec<String>,
    pending_cue: Option<Vec<String>>,
    autoplay: Option<Autoplay>,
}

impl<H: Host> Session<H> {
    pub fn new(host: H) -> Self {
        Session {
            id: Uuid::new_v4(),
            host,
            state: SessionState::Idle,
            program_text: String::new(),
            display_text: None,
            history: History::new(),
            current: 0,
            linkage: LinkageMap::new(),
            execution_error: None,
            active_variables: vec![],
            pending_cue: None,
            autoplay: None,
        }
    }

    /// Transforms the configured function and refreshes with the result.
    /// Returns false while there is nothing to run.
    pub fn load(&mut self, config: &ManualConfig) -> bool {
        match SourceTransformer::transform(Some(config)) {
            Transformed::Loading => false,
            Transformed::Failed { error } => {
                self.fail(error);
                false
            }
            Transformed::Ready { code } => {
                self.display_text = config
                    .manual_function
                    .as_deref()
                    .map(SourceTransformer::display_text);
                self.refresh(&code, config);
                true
            }
        }
    }

    /// Sets the text highlights are mapped into. `None` highlights program
    /// text offsets as they are.
    pub fn set_display_text(&mut self, display_text: Option<String>) {
        self.display_text = display_text;
    }

    /// Discards the previous run and records a new one.
    pub fn refresh(&mut self, program_text: &str, config: &ManualConfig) {
        let span = debug_span!("refresh", session = %self.id);
        let _enter = span.enter();

        self.state = SessionState::Initializing;
        self.history.clear();
        self.current = 0;
        self.execution_error = None;
        self.active_variables.clear();
        self.pending_cue = None;
        self.autoplay = None;
        self.program_text = program_text.to_string();

        for variable in config.input_variables() {
            self.host
                .set_external_value(&variable.id, variable.default.clone());
        }
        let values = self.host.get_external_values();

        let known = KnownVariables::new(values.clone(), config.members());
        let mut auto = analyze(program_text, &known).linkage;
        if let Some(output) = &config.output {
            auto.insert(RESULT_VARIABLE.to_string(), Linkage::Single(output.clone()));
        }
        self.linkage = merge(&auto, &config.linkage);

        let mut interpreter = match Interpreter::initialize(program_text, &values) {
            Ok(interpreter) => interpreter,
            Err(e) => {
                self.fail(e.to_string());
                self.state = SessionState::Idle;
                self.host.highlight_range(None);
                self.host.clear_all_cues();
                return;
            }
        };
        if self.record(&mut interpreter, config.max_steps) {
            self.publish_result(&interpreter, config);
        }
        self.history.compute_block_points();

        info!(
            "recorded {} step(s), {} breakpoint(s), {} block(s)",
            self.history.len(),
            self.history.breakpoint_points().len(),
            self.history.block_points().len()
        );
        self.state = SessionState::Ready;
        self.host.highlight_range(None);
        self.host.clear_all_cues();
    }

    /// Drives `interpreter` to the end, appending every state. Returns
    /// whether the program completed.
    ///
    /// A breakpoint payload is read when its call first appears on the stack
    /// and attached to the next entry that enters a block, or to the last
    /// entry when no block is entered again.
    fn record(&mut self, interpreter: &mut Interpreter, max_steps: Option<usize>) -> bool {
        let first = StateBuilder::build(interpreter, 0, &self.program_text);
        let mut previous_node = first.node_type.clone();
        self.history.push(first);
        let mut pending = None;
        let mut was_at_breakpoint = false;
        let completed = loop {
            if let Some(max) = max_steps {
                if interpreter.steps_taken() >= max {
                    self.fail(format!("Execution stopped after {} steps", max));
                    break false;
                }
            }
            match interpreter.step() {
                Ok(true) => {}
                Ok(false) => break true,
                Err(e) => {
                    self.fail(e.to_string());
                    break false;
                }
            }
            let mut step = StateBuilder::build(interpreter, self.history.len(), &self.program_text);
            let at_breakpoint = interpreter.is_at_breakpoint();
            if at_breakpoint {
                if !was_at_breakpoint && pending.is_none() {
                    pending = StateBuilder::extract_breakpoint(
                        interpreter,
                        &self.program_text,
                        &step.variables,
                        &self.linkage,
                    );
                }
            } else if enters_block(&previous_node, &step.node_type) {
                if let Some(payload) = pending.take() {
                    step.breakpoint = Some(payload);
                }
            }
            was_at_breakpoint = at_breakpoint;
            previous_node = step.node_type.clone();
            self.history.push(step);
        };
        if let Some(payload) = pending {
            self.history.attach_to_last(payload);
        }
        completed
    }

    fn publish_result(&mut self, interpreter: &Interpreter, config: &ManualConfig) {
        if let Some(output) = &config.output {
            let value = interpreter
                .get_global(RESULT_VARIABLE)
                .map(|v| v.to_native())
                .unwrap_or(Value::Null);
            debug!("publishing result to '{}'", output);
            self.host.set_external_value(output, value);
        }
    }

    fn fail(&mut self, message: String) {
        error!("{}", message);
        self.host.report_error(&message);
        self.execution_error = Some(message);
    }

    fn is_navigable(&self) -> bool {
        self.state == SessionState::Ready && !self.history.is_empty()
    }

    pub fn step_forward(&mut self) -> bool {
        if !self.is_navigable() || self.current + 1 >= self.history.len() {
            return false;
        }
        self.arrive(self.current + 1);
        true
    }

    pub fn step_backward(&mut self) -> bool {
        if !self.is_navigable() || self.current == 0 {
            return false;
        }
        self.arrive(self.current - 1);
        true
    }

    pub fn step_to_next_breakpoint(&mut self) -> bool {
        let target = self.history.next_breakpoint(self.current);
        self.go_to(target)
    }

    pub fn step_to_prev_breakpoint(&mut self) -> bool {
        let target = self.history.prev_breakpoint(self.current);
        self.go_to(target)
    }

    pub fn step_to_next_block(&mut self) -> bool {
        let target = self.history.next_block(self.current);
        self.go_to(target)
    }

    pub fn step_to_prev_block(&mut self) -> bool {
        let target = self.history.prev_block(self.current);
        self.go_to(target)
    }

    pub fn step_to_index(&mut self, index: usize) -> bool {
        self.go_to(Some(index))
    }

    fn go_to(&mut self, target: Option<usize>) -> bool {
        match target {
            Some(index) if self.is_navigable() && index < self.history.len() => {
                self.arrive(index);
                true
            }
            _ => false,
        }
    }

    fn arrive(&mut self, index: usize) {
        self.current = index;
        trace!("arrived at step {}", index);
        let step = match self.history.get(index) {
            Some(step) => step,
            None => return,
        };

        let highlight = match &self.display_text {
            Some(display) => {
                let (start, end) =
                    map_range(&self.program_text, display, step.highlight.start, step.highlight.end);
                HighlightRange { start, end }
            }
            None => step.highlight,
        };
        self.host.highlight_range(Some(highlight));

        for (local, linkage) in &self.linkage {
            if let (Some(id), Some(value)) = (linkage.single(), step.variables.get(local)) {
                if !value.is_null() {
                    self.host.set_external_value(id, value.clone());
                }
            }
        }

        // A payload lands on a block entry; the line that made the call is the
        // entry before it.
        let line_source = match index.checked_sub(1).and_then(|i| self.history.get(i)) {
            Some(previous)
                if self.history.is_breakpoint_point(index) && self.history.is_block_point(index) =>
            {
                previous.highlight
            }
            _ => step.highlight,
        };
        self.active_variables = self.linked_on_line(line_source.start);

        let cue = match index.checked_sub(1).and_then(|i| self.history.get(i)) {
            Some(previous) => self.changed_externals(previous, step),
            None => vec![],
        };
        self.pending_cue = Some(cue);
    }

    /// External ids linked to identifiers on the program line holding `offset`.
    fn linked_on_line(&self, offset: usize) -> Vec<String> {
        let line = line_text(&self.program_text, line_of_offset(&self.program_text, offset));
        let mut ids: Vec<String> = vec![];
        for m in IDENTIFIER.find_iter(line) {
            if let Some(linkage) = self.linkage.get(m.as_str()) {
                for id in linkage.ids() {
                    if !ids.iter().any(|i| i == id) {
                        ids.push(id.to_string());
                    }
                }
            }
        }
        ids
    }

    fn changed_externals(&self, previous: &Step, step: &Step) -> Vec<String> {
        let mut ids: Vec<String> = vec![];
        for (local, linkage) in &self.linkage {
            if previous.variables.get(local) != step.variables.get(local) {
                for id in linkage.ids() {
                    if !ids.iter().any(|i| i == id) {
                        ids.push(id.to_string());
                    }
                }
            }
        }
        ids
    }

    /// Applies the cue recorded by the last move, if any.
    pub fn flush_visual_cues(&mut self) {
        if let Some(ids) = self.pending_cue.take() {
            self.host.clear_all_cues();
            if !ids.is_empty() {
                self.host.apply_variable_cue(&ids);
            }
        }
    }

    pub fn play(&mut self, interval: Duration, now: Instant) {
        if self.is_navigable() {
            self.autoplay = Some(Autoplay::new(interval, now));
        }
    }

    pub fn pause(&mut self) {
        self.autoplay = None;
    }

    pub fn is_playing(&self) -> bool {
        self.autoplay.is_some()
    }

    /// Advances auto-play when its interval has elapsed. Playing stops at the
    /// end of the history. Returns whether the index moved.
    pub fn tick(&mut self, now: Instant) -> bool {
        let due = match self.autoplay.as_mut() {
            Some(timer) => timer.due(now),
            None => return false,
        };
        if !due {
            return false;
        }
        let moved = if self.history.breakpoint_points().is_empty() {
            self.step_forward()
        } else {
            self.step_to_next_breakpoint()
        };
        if !moved {
            debug!("auto-play reached the end of the history");
            self.autoplay = None;
        }
        moved
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn breakpoint_points(&self) -> &[usize] {
        self.history.breakpoint_points()
    }

    pub fn block_points(&self) -> &[usize] {
        self.history.block_points()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.history.get(self.current)
    }

    pub fn active_variables(&self) -> &[String] {
        &self.active_variables
    }

    pub fn execution_error(&self) -> Option<&str> {
        self.execution_error.as_deref()
    }

    pub fn linkage(&self) -> &LinkageMap {
        &self.linkage
    }

    pub fn program_text(&self) -> &str {
        &self.program_text
    }

    pub fn display_text(&self) -> Option<&str> {
        self.display_text.as_deref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}
