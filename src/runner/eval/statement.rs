//! Statement visits.
//!
//! Each visit either pushes one child, completes the frame or unwinds. Loops
//! keep their phase in `progress`; the `*_TEST`/`*_UPDATE` constants are also
//! where a `continue` resumes.

use crate::parser::ast::{NodeRef, NodeType, VariableDeclarationKind};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::to_boolean;
use crate::runner::ds::scope::{Scope, ScopeKind, ScopeRef};
use crate::runner::ds::value::JsValue;

use super::types::{Action, ActionResult, CompletionType, StateFrame};

pub(crate) const FOR_INIT: usize = 0;
pub(crate) const FOR_TEST: usize = 1;
const FOR_TEST_RESULT: usize = 2;
const FOR_BODY: usize = 3;
pub(crate) const FOR_UPDATE: usize = 4;
const FOR_UPDATE_DONE: usize = 5;

pub(crate) const WHILE_TEST: usize = 0;
const WHILE_TEST_RESULT: usize = 1;
const WHILE_BODY_DONE: usize = 2;

const DO_BODY: usize = 0;
pub(crate) const DO_TEST: usize = 1;
const DO_TEST_RESULT: usize = 2;

/// Visits a statement frame. `last_value` receives the value of every
/// completed expression statement.
pub(crate) fn visit_statement(frame: &mut StateFrame, last_value: &mut JsValue) -> ActionResult {
    let node = frame.node.clone();
    match &node.node_type {
        NodeType::Program { body } => {
            frame.value = None;
            if frame.progress < body.len() {
                frame.progress += 1;
                Ok(Action::Push(body[frame.progress - 1].clone()))
            } else {
                Ok(Action::Finished)
            }
        }
        NodeType::BlockStatement { body } => {
            frame.value = None;
            if frame.progress < body.len() {
                frame.progress += 1;
                Ok(Action::Push(body[frame.progress - 1].clone()))
            } else {
                Ok(Action::Complete(JsValue::Undefined))
            }
        }
        NodeType::EmptyStatement | NodeType::FunctionDeclaration(_) => {
            Ok(Action::Complete(JsValue::Undefined))
        }
        NodeType::ExpressionStatement { expression } => {
            if frame.progress == 0 {
                frame.progress = 1;
                Ok(Action::Push(expression.clone()))
            } else {
                let value = frame.take_value();
                *last_value = value.clone();
                Ok(Action::Complete(value))
            }
        }
        NodeType::VariableDeclaration { kind, declarations } => loop {
            let index = frame.progress;
            let declarator = match declarations.get(index) {
                Some(d) => d,
                None => return Ok(Action::Complete(JsValue::Undefined)),
            };
            let (id, init) = match &declarator.node_type {
                NodeType::VariableDeclarator { id, init } => (id, init),
                _ => {
                    return Err(JErrorType::SyntaxError(format!(
                        "Unexpected {} in variable declaration",
                        declarator.type_name()
                    )))
                }
            };
            match frame.value.take() {
                Some(value) => {
                    bind_declared(*kind, &id.name, value, &frame.scope)?;
                    frame.progress += 1;
                }
                None => match init {
                    Some(init) => return Ok(Action::Push(init.clone())),
                    None => {
                        if *kind != VariableDeclarationKind::Var {
                            bind_declared(*kind, &id.name, JsValue::Undefined, &frame.scope)?;
                        }
                        frame.progress += 1;
                    }
                },
            }
        },
        NodeType::IfStatement {
            test,
            consequent,
            alternate,
        } => match frame.progress {
            0 => {
                frame.progress = 1;
                Ok(Action::Push(test.clone()))
            }
            1 => {
                frame.progress = 2;
                if to_boolean(&frame.take_value()) {
                    Ok(Action::Push(consequent.clone()))
                } else if let Some(alternate) = alternate {
                    Ok(Action::Push(alternate.clone()))
                } else {
                    Ok(Action::Complete(JsValue::Undefined))
                }
            }
            _ => Ok(Action::Complete(JsValue::Undefined)),
        },
        NodeType::ForStatement {
            init,
            test,
            update,
            body,
        } => loop {
            match frame.progress {
                FOR_INIT => {
                    frame.progress = FOR_TEST;
                    if let Some(init) = init {
                        return Ok(Action::Push(init.clone()));
                    }
                }
                FOR_TEST => {
                    frame.value = None;
                    match test {
                        Some(test) => {
                            frame.progress = FOR_TEST_RESULT;
                            return Ok(Action::Push(test.clone()));
                        }
                        None => frame.progress = FOR_BODY,
                    }
                }
                FOR_TEST_RESULT => {
                    if !to_boolean(&frame.take_value()) {
                        return Ok(Action::Complete(JsValue::Undefined));
                    }
                    frame.progress = FOR_BODY;
                }
                FOR_BODY => {
                    frame.progress = FOR_UPDATE;
                    return Ok(Action::Push(body.clone()));
                }
                FOR_UPDATE => {
                    frame.value = None;
                    if declares_lexically(init) {
                        frame.scope = Scope::copy_for_iteration(&frame.scope);
                    }
                    match update {
                        Some(update) => {
                            frame.progress = FOR_UPDATE_DONE;
                            return Ok(Action::Push(update.clone()));
                        }
                        None => frame.progress = FOR_TEST,
                    }
                }
                _ => {
                    frame.value = None;
                    frame.progress = FOR_TEST;
                }
            }
        },
        NodeType::WhileStatement { test, body } => match frame.progress {
            WHILE_TEST => {
                frame.value = None;
                frame.progress = WHILE_TEST_RESULT;
                Ok(Action::Push(test.clone()))
            }
            WHILE_TEST_RESULT => {
                if to_boolean(&frame.take_value()) {
                    frame.progress = WHILE_BODY_DONE;
                    Ok(Action::Push(body.clone()))
                } else {
                    Ok(Action::Complete(JsValue::Undefined))
                }
            }
            _ => {
                frame.value = None;
                frame.progress = WHILE_TEST_RESULT;
                Ok(Action::Push(test.clone()))
            }
        },
        NodeType::DoWhileStatement { body, test } => match frame.progress {
            DO_BODY => {
                frame.value = None;
                frame.progress = DO_TEST;
                Ok(Action::Push(body.clone()))
            }
            DO_TEST => {
                frame.value = None;
                frame.progress = DO_TEST_RESULT;
                Ok(Action::Push(test.clone()))
            }
            _ => {
                if to_boolean(&frame.take_value()) {
                    frame.progress = DO_TEST;
                    Ok(Action::Push(body.clone()))
                } else {
                    Ok(Action::Complete(JsValue::Undefined))
                }
            }
        },
        NodeType::ReturnStatement { argument } => match (frame.progress, argument) {
            (0, Some(argument)) => {
                frame.progress = 1;
                Ok(Action::Push(argument.clone()))
            }
            (0, None) => Ok(Action::Abrupt(CompletionType::Return, JsValue::Undefined)),
            _ => Ok(Action::Abrupt(CompletionType::Return, frame.take_value())),
        },
        NodeType::BreakStatement => Ok(Action::Abrupt(CompletionType::Break, JsValue::Undefined)),
        NodeType::ContinueStatement => {
            Ok(Action::Abrupt(CompletionType::Continue, JsValue::Undefined))
        }
        _ => Err(JErrorType::SyntaxError(format!(
            "{} is not a statement",
            node.type_name()
        ))),
    }
}

/// Progress a loop frame resumes at after `continue`.
pub(crate) fn continue_progress(frame: &StateFrame) -> Option<usize> {
    match frame.node.node_type {
        NodeType::ForStatement { .. } => Some(FOR_UPDATE),
        NodeType::WhileStatement { .. } => Some(WHILE_TEST),
        NodeType::DoWhileStatement { .. } => Some(DO_TEST),
        _ => None,
    }
}

fn bind_declared(
    kind: VariableDeclarationKind,
    name: &str,
    value: JsValue,
    scope: &ScopeRef,
) -> Result<(), JErrorType> {
    match kind {
        VariableDeclarationKind::Var => {
            let target = nearest_var_scope(scope);
            target.borrow_mut().declare(name, value);
            Ok(())
        }
        VariableDeclarationKind::Let | VariableDeclarationKind::Const => {
            let mut s = scope.borrow_mut();
            if kind == VariableDeclarationKind::Const {
                s.declare_const(name, value);
            } else {
                s.declare(name, value);
            }
            Ok(())
        }
    }
}

/// Whether a `for` header declares `let` or `const` bindings.
fn declares_lexically(init: &Option<NodeRef>) -> bool {
    matches!(
        init.as_ref().map(|n| &n.node_type),
        Some(NodeType::VariableDeclaration {
            kind: VariableDeclarationKind::Let | VariableDeclarationKind::Const,
            ..
        })
    )
}

/// The function or global scope `var` declarations belong to.
fn nearest_var_scope(scope: &ScopeRef) -> ScopeRef {
    let mut current = scope.clone();
    loop {
        let parent = {
            let s = current.borrow();
            match s.kind() {
                ScopeKind::Function | ScopeKind::Global | ScopeKind::Intrinsic => None,
                ScopeKind::Block => s.parent(),
            }
        };
        match parent {
            Some(p) => current = p,
            None => return current,
        }
    }
}
