//! The stepping interpreter.
//!
//! Execution state is an explicit stack of [`StateFrame`]s. Every call to
//! [`Interpreter::step`] pops the innermost frame, visits it once and applies
//! the resulting [`Action`], so the stack between two calls is exactly what a
//! debugger would show.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::parser::ast::NodeType;
use crate::parser::JsParser;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::scope::{self, Scope, ScopeKind, ScopeRef};
use crate::runner::ds::value::{FunctionObject, JsNumberType, JsValue};
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::EvalContext;
use crate::runner::std_lib::intrinsics::is_breakpoint_function;

use super::expression::visit_expression;
use super::function::{hoist_declarations, hoist_functions, prepare_call_scope};
use super::statement::{continue_progress, visit_statement};
use super::types::{Action, CompletionType, StateFrame};

const MAX_STACK_DEPTH: usize = 10_000;
const DETACHED_STEP_LIMIT: usize = 10_000;
const DETACHED_RESULT: &str = "__view";

pub struct Interpreter {
    stack: Vec<StateFrame>,
    ctx: EvalContext,
    registry: Rc<BuiltInRegistry>,
    global_scope: ScopeRef,
    /// Program text the node spans index into.
    source: Rc<str>,
    completion_value: JsValue,
    done: bool,
    steps: usize,
}

impl Interpreter {
    /// Parses `program_text` and prepares it for stepping. Every external value
    /// whose name is a valid identifier becomes a global binding.
    pub fn initialize(
        program_text: &str,
        external_values: &Map<String, Value>,
    ) -> Result<Interpreter, JErrorType> {
        Self::initialize_with_registry(
            program_text,
            external_values,
            Rc::new(BuiltInRegistry::with_core()),
        )
    }

    pub fn initialize_with_registry(
        program_text: &str,
        external_values: &Map<String, Value>,
        registry: Rc<BuiltInRegistry>,
    ) -> Result<Interpreter, JErrorType> {
        if program_text.trim().is_empty() {
            return Err(JErrorType::SyntaxError("Program text is empty".to_string()));
        }
        let program = JsParser::parse_to_ast_from_str(program_text)
            .map_err(|e| JErrorType::SyntaxError(e.to_string()))?;

        let intrinsic_scope = build_intrinsic_scope(&registry);
        let global_scope = Scope::new_child(&intrinsic_scope, ScopeKind::Global);
        {
            let mut global = global_scope.borrow_mut();
            for (name, value) in external_values {
                if is_identifier(name) {
                    global.declare(name, JsValue::from_native(value));
                }
            }
        }
        if let NodeType::Program { body } = &program.node_type {
            hoist_declarations(body, &global_scope);
        }
        debug!(
            "interpreter initialized with {} external value(s)",
            external_values.len()
        );

        Ok(Interpreter {
            stack: vec![StateFrame::new(program, global_scope.clone())],
            ctx: EvalContext::with_external_values(external_values.clone()),
            registry,
            global_scope,
            source: Rc::from(program_text),
            completion_value: JsValue::Undefined,
            done: false,
            steps: 0,
        })
    }

    /// Advances execution by one node visit. Returns `Ok(false)` once the
    /// program has completed, and on every call after that.
    pub fn step(&mut self) -> Result<bool, JErrorType> {
        let mut frame = match self.stack.pop() {
            Some(frame) => frame,
            None => return Ok(false),
        };
        if frame.done {
            self.stack.push(frame);
            return Ok(false);
        }
        self.steps += 1;
        trace!("step {}: {}", self.steps, frame.node.type_name());

        let visited = if is_statement(&frame.node.node_type) {
            visit_statement(&mut frame, &mut self.completion_value)
        } else {
            visit_expression(&mut frame, &self.registry, &self.source)
        };
        let action = match visited {
            Ok(action) => action,
            Err(e) => {
                self.stack.push(frame);
                debug!("runtime fault after {} step(s): {}", self.steps, e);
                return Err(e);
            }
        };
        self.apply(frame, action)
    }

    fn apply(&mut self, mut frame: StateFrame, action: Action) -> Result<bool, JErrorType> {
        match action {
            Action::Push(node) => {
                let scope = match &node.node_type {
                    NodeType::BlockStatement { body } => {
                        let block = Scope::new_child(&frame.scope, ScopeKind::Block);
                        hoist_functions(body, &block);
                        block
                    }
                    NodeType::ForStatement { .. } => {
                        Scope::new_child(&frame.scope, ScopeKind::Block)
                    }
                    _ => frame.scope.clone(),
                };
                self.stack.push(frame);
                self.push_frame(StateFrame::new(node, scope))?;
            }
            Action::Complete(value) => self.deliver(value),
            Action::Call { callee, this, args } => {
                let function = match &callee {
                    JsValue::Function(function) => function.clone(),
                    other => {
                        self.stack.push(frame);
                        return Err(JErrorType::TypeError(format!("{} is not a function", other)));
                    }
                };
                match function.as_ref() {
                    FunctionObject::BuiltIn { func, .. } => {
                        match func.call(&mut self.ctx, this, args) {
                            Ok(value) => self.deliver(value),
                            Err(e) => {
                                self.stack.push(frame);
                                return Err(e);
                            }
                        }
                    }
                    FunctionObject::Script { data, scope } => {
                        let call_scope = prepare_call_scope(data, scope, args);
                        self.stack.push(frame);
                        self.push_frame(StateFrame::new_function_body(data.clone(), call_scope))?;
                    }
                }
            }
            Action::Abrupt(CompletionType::Return, value) => {
                match self.stack.iter().rposition(|f| f.is_function_body()) {
                    Some(index) => {
                        self.stack.truncate(index);
                        self.deliver(value);
                    }
                    None => {
                        self.stack.push(frame);
                        return Err(JErrorType::SyntaxError("Illegal return statement".to_string()));
                    }
                }
            }
            Action::Abrupt(completion, _) => match self.enclosing_loop() {
                Some(index) if completion == CompletionType::Break => {
                    self.stack.truncate(index);
                    self.deliver(JsValue::Undefined);
                }
                Some(index) => {
                    self.stack.truncate(index + 1);
                    if let Some(looping) = self.stack.last_mut() {
                        if let Some(progress) = continue_progress(looping) {
                            looping.progress = progress;
                        }
                        looping.value = None;
                    }
                }
                None => {
                    let keyword = if completion == CompletionType::Break {
                        "break"
                    } else {
                        "continue"
                    };
                    self.stack.push(frame);
                    return Err(JErrorType::SyntaxError(format!("Illegal {} statement", keyword)));
                }
            },
            Action::Finished => {
                frame.done = true;
                self.done = true;
                self.stack.push(frame);
                debug!("program completed after {} step(s)", self.steps);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn push_frame(&mut self, frame: StateFrame) -> Result<(), JErrorType> {
        if self.stack.len() >= MAX_STACK_DEPTH {
            return Err(JErrorType::RangeError(
                "Maximum call stack size exceeded".to_string(),
            ));
        }
        self.stack.push(frame);
        Ok(())
    }

    fn deliver(&mut self, value: JsValue) {
        if let Some(parent) = self.stack.last_mut() {
            parent.value = Some(value);
        }
    }

    /// Index of the innermost loop frame within the current function.
    fn enclosing_loop(&self) -> Option<usize> {
        for (index, frame) in self.stack.iter().enumerate().rev() {
            if continue_progress(frame).is_some() {
                return Some(index);
            }
            if frame.is_function_body() {
                return None;
            }
        }
        None
    }

    /// The frames of the current execution state, innermost last.
    pub fn state_stack(&self) -> &[StateFrame] {
        &self.stack
    }

    /// The innermost frame that is a call to `view` or `step`.
    pub fn breakpoint_call(&self) -> Option<&StateFrame> {
        self.stack.iter().rev().find(|frame| match &frame.node.node_type {
            NodeType::CallExpression { callee, .. } => callee
                .as_identifier()
                .map(is_breakpoint_function)
                .unwrap_or(false),
            _ => false,
        })
    }

    pub fn is_at_breakpoint(&self) -> bool {
        self.breakpoint_call().is_some()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    pub fn global_scope(&self) -> &ScopeRef {
        &self.global_scope
    }

    /// Value of the last expression statement that completed.
    pub fn completion_value(&self) -> &JsValue {
        &self.completion_value
    }

    /// Reads a binding declared in the global scope itself.
    pub fn get_global(&self, name: &str) -> Option<JsValue> {
        if self.global_scope.borrow().has_own_binding(name) {
            scope::try_get(&self.global_scope, name)
        } else {
            None
        }
    }
}

/// Evaluates `expression` in a fresh interpreter whose globals are
/// `variables`. Execution is capped, a runaway expression is a `RangeError`.
pub fn evaluate_detached(
    expression: &str,
    variables: &BTreeMap<String, Value>,
) -> Result<Value, JErrorType> {
    let program = format!("var {} = ({});", DETACHED_RESULT, expression);
    let externals: Map<String, Value> = variables
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let mut interpreter = Interpreter::initialize(&program, &externals)?;
    let mut steps = 0;
    while interpreter.step()? {
        steps += 1;
        if steps > DETACHED_STEP_LIMIT {
            return Err(JErrorType::RangeError(format!(
                "Evaluation of '{}' did not finish",
                expression
            )));
        }
    }
    Ok(interpreter
        .get_global(DETACHED_RESULT)
        .map(|v| v.to_native())
        .unwrap_or(Value::Null))
}

fn build_intrinsic_scope(registry: &BuiltInRegistry) -> ScopeRef {
    let intrinsic = Scope::new_intrinsic();
    {
        let mut s = intrinsic.borrow_mut();
        s.declare("undefined", JsValue::Undefined);
        s.declare("NaN", JsValue::Number(JsNumberType::NaN));
        s.declare("Infinity", JsValue::Number(JsNumberType::PositiveInfinity));
        for object in registry.global_objects() {
            let mut members = BTreeMap::new();
            for (name, value) in &object.properties {
                members.insert(name.clone(), value.clone());
            }
            for (name, func) in &object.methods {
                members.insert(
                    name.clone(),
                    JsValue::Function(Rc::new(FunctionObject::BuiltIn {
                        name: format!("{}.{}", object.name, name),
                        func: func.clone(),
                    })),
                );
            }
            s.declare(&object.name, JsValue::new_object(members));
        }
        for (name, func) in registry.global_functions() {
            s.declare(
                name,
                JsValue::Function(Rc::new(FunctionObject::BuiltIn {
                    name: name.clone(),
                    func: func.clone(),
                })),
            );
        }
    }
    intrinsic
}

fn is_statement(node_type: &NodeType) -> bool {
    matches!(
        node_type,
        NodeType::Program { .. }
            | NodeType::BlockStatement { .. }
            | NodeType::EmptyStatement
            | NodeType::ExpressionStatement { .. }
            | NodeType::VariableDeclaration { .. }
            | NodeType::FunctionDeclaration(_)
            | NodeType::IfStatement { .. }
            | NodeType::ForStatement { .. }
            | NodeType::WhileStatement { .. }
            | NodeType::DoWhileStatement { .. }
            | NodeType::ReturnStatement { .. }
            | NodeType::BreakStatement
            | NodeType::ContinueStatement
    )
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(program: &str) -> Interpreter {
        let mut interpreter = Interpreter::initialize(program, &Map::new()).unwrap();
        while interpreter.step().unwrap() {}
        interpreter
    }

    #[test]
    fn identifiers_follow_js_rules() {
        assert!(is_identifier("speed"));
        assert!(is_identifier("$el"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("font-size"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn completion_value_tracks_last_expression_statement() {
        let interpreter = run("var a = 2; a * 21;");
        assert_eq!(interpreter.completion_value().to_native(), serde_json::json!(42));
    }

    #[test]
    fn step_after_completion_keeps_returning_false() {
        let mut interpreter = run("1;");
        assert!(interpreter.is_done());
        assert!(!interpreter.step().unwrap());
        assert!(!interpreter.step().unwrap());
    }
}
