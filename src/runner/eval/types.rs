//! Core types for the stepping evaluator.

use std::rc::Rc;

use crate::parser::ast::{FunctionData, NodeRef};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::scope::ScopeRef;
use crate::runner::ds::value::JsValue;

/// One entry of the interpreter stack: a node being executed, the scope it
/// executes in and how far it got.
pub struct StateFrame {
    pub node: NodeRef,
    pub scope: ScopeRef,
    /// Set on the frame of a function body; identifies the enclosing function
    /// for every frame above it.
    pub function: Option<Rc<FunctionData>>,
    pub(crate) progress: usize,
    /// Value delivered by the child frame that completed last.
    pub(crate) value: Option<JsValue>,
    /// Values gathered so far (operands, arguments, member targets).
    pub(crate) operands: Vec<JsValue>,
    pub(crate) done: bool,
}

impl StateFrame {
    pub fn new(node: NodeRef, scope: ScopeRef) -> Self {
        StateFrame {
            node,
            scope,
            function: None,
            progress: 0,
            value: None,
            operands: vec![],
            done: false,
        }
    }

    pub fn new_function_body(data: Rc<FunctionData>, scope: ScopeRef) -> Self {
        let mut frame = StateFrame::new(data.body.clone(), scope);
        frame.function = Some(data);
        frame
    }

    pub fn is_function_body(&self) -> bool {
        self.function.is_some()
    }

    /// Takes the delivered child value, `undefined` when there is none.
    pub(crate) fn take_value(&mut self) -> JsValue {
        self.value.take().unwrap_or(JsValue::Undefined)
    }
}

/// Completion record type for abrupt completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionType {
    /// Return completion - function returns.
    Return,
    /// Break completion - break from loop.
    Break,
    /// Continue completion - continue loop iteration.
    Continue,
}

/// What the interpreter does with the top frame after visiting it.
pub(crate) enum Action {
    /// Keep the frame and push a child executing in the frame's scope.
    Push(NodeRef),
    /// Pop the frame and hand the value to its parent.
    Complete(JsValue),
    /// Keep the frame and invoke a function. The result comes back as the
    /// frame's `value`, except for built-ins, whose result completes the frame.
    Call {
        callee: JsValue,
        this: JsValue,
        args: Vec<JsValue>,
    },
    /// Unwind to the enclosing function or loop.
    Abrupt(CompletionType, JsValue),
    /// The program has run to completion.
    Finished,
}

/// Result type for value-returning operations.
pub type ValueResult = Result<JsValue, JErrorType>;

pub(crate) type ActionResult = Result<Action, JErrorType>;
