//! Closures, hoisting and call setup.

use std::rc::Rc;

use crate::parser::ast::{FunctionData, Node, NodeRef, NodeType, VariableDeclarationKind};
use crate::runner::ds::scope::{Scope, ScopeKind, ScopeRef};
use crate::runner::ds::value::{FunctionObject, JsValue};

/// Creates a function value closing over `scope`. Named function expressions
/// can refer to themselves through an extra scope holding their name.
pub fn make_closure(data: &Rc<FunctionData>, scope: &ScopeRef, bind_own_name: bool) -> JsValue {
    let closure_scope = if bind_own_name && data.id.is_some() {
        Scope::new_child(scope, ScopeKind::Block)
    } else {
        scope.clone()
    };
    let value = JsValue::Function(Rc::new(FunctionObject::Script {
        data: data.clone(),
        scope: closure_scope.clone(),
    }));
    if bind_own_name {
        if let Some(id) = &data.id {
            closure_scope.borrow_mut().declare(&id.name, value.clone());
        }
    }
    value
}

/// Binds the function declarations among `body` in `scope`.
pub fn hoist_functions(body: &[NodeRef], scope: &ScopeRef) {
    for statement in body {
        if let NodeType::FunctionDeclaration(data) = &statement.node_type {
            let closure = make_closure(data, scope, false);
            scope.borrow_mut().declare(data.name(), closure);
        }
    }
}

/// Hoists `var` names found anywhere in `body` (outside nested functions) and
/// the function declarations at its top level.
pub fn hoist_declarations(body: &[NodeRef], scope: &ScopeRef) {
    let mut names = vec![];
    for statement in body {
        collect_var_names(statement, &mut names);
    }
    {
        let mut s = scope.borrow_mut();
        for name in &names {
            s.declare_hoisted(name);
        }
    }
    hoist_functions(body, scope);
}

fn collect_var_names(node: &Node, names: &mut Vec<String>) {
    match &node.node_type {
        NodeType::VariableDeclaration {
            kind: VariableDeclarationKind::Var,
            declarations,
        } => {
            for declarator in declarations {
                if let NodeType::VariableDeclarator { id, .. } = &declarator.node_type {
                    names.push(id.name.clone());
                }
            }
        }
        NodeType::BlockStatement { body } => {
            for statement in body {
                collect_var_names(statement, names);
            }
        }
        NodeType::IfStatement {
            consequent,
            alternate,
            ..
        } => {
            collect_var_names(consequent, names);
            if let Some(alternate) = alternate {
                collect_var_names(alternate, names);
            }
        }
        NodeType::ForStatement { init, body, .. } => {
            if let Some(init) = init {
                collect_var_names(init, names);
            }
            collect_var_names(body, names);
        }
        NodeType::WhileStatement { body, .. } | NodeType::DoWhileStatement { body, .. } => {
            collect_var_names(body, names);
        }
        _ => {}
    }
}

/// Creates the scope a call to `data` runs in: parameters bound to the
/// arguments (missing ones `undefined`) and the body's declarations hoisted.
pub fn prepare_call_scope(data: &FunctionData, closure_scope: &ScopeRef, args: Vec<JsValue>) -> ScopeRef {
    let scope = Scope::new_child(closure_scope, ScopeKind::Function);
    {
        let mut s = scope.borrow_mut();
        let mut args = args.into_iter();
        for param in &data.params {
            s.declare(&param.name, args.next().unwrap_or(JsValue::Undefined));
        }
    }
    if let NodeType::BlockStatement { body } = &data.body.node_type {
        hoist_declarations(body, &scope);
    }
    scope
}
