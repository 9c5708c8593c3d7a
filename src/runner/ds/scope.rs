use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;

pub type ScopeRef = Rc<RefCell<Scope>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Holds the built-ins and breakpoint intrinsics. Never part of snapshots.
    Intrinsic,
    Global,
    Function,
    Block,
}

/// One lexical scope. Lookups walk the parent chain, innermost first.
pub struct Scope {
    kind: ScopeKind,
    bindings: HashMap<String, JsValue>,
    /// Declaration order, so snapshots list names deterministically.
    order: Vec<String>,
    constants: HashSet<String>,
    parent: Option<ScopeRef>,
}

impl Scope {
    pub fn new_intrinsic() -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            kind: ScopeKind::Intrinsic,
            bindings: HashMap::new(),
            order: vec![],
            constants: HashSet::new(),
            parent: None,
        }))
    }

    pub fn new_child(parent: &ScopeRef, kind: ScopeKind) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            kind,
            bindings: HashMap::new(),
            order: vec![],
            constants: HashSet::new(),
            parent: Some(parent.clone()),
        }))
    }

    /// A sibling of `scope` holding the same bindings, so a loop iteration
    /// gets its own `let` bindings while closures keep the previous ones.
    pub fn copy_for_iteration(scope: &ScopeRef) -> ScopeRef {
        let s = scope.borrow();
        Rc::new(RefCell::new(Scope {
            kind: s.kind,
            bindings: s.bindings.clone(),
            order: s.order.clone(),
            constants: s.constants.clone(),
            parent: s.parent.clone(),
        }))
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ScopeRef> {
        self.parent.clone()
    }

    pub fn has_own_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Own bindings in declaration order.
    pub fn bindings(&self) -> Vec<(String, JsValue)> {
        self.order
            .iter()
            .filter_map(|name| self.bindings.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }

    /// Creates or overwrites a binding in this scope.
    pub fn declare(&mut self, name: &str, value: JsValue) {
        if !self.bindings.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.bindings.insert(name.to_string(), value);
    }

    pub fn declare_const(&mut self, name: &str, value: JsValue) {
        self.declare(name, value);
        self.constants.insert(name.to_string());
    }

    /// `var` hoisting: creates `undefined` unless the name already exists here.
    pub fn declare_hoisted(&mut self, name: &str) {
        if !self.bindings.contains_key(name) {
            self.declare(name, JsValue::Undefined);
        }
    }
}

/// Resolves `name` through the scope chain.
pub fn try_get(scope: &ScopeRef, name: &str) -> Option<JsValue> {
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        let s = s.borrow();
        if let Some(v) = s.bindings.get(name) {
            return Some(v.clone());
        }
        current = s.parent.clone();
    }
    None
}

/// Assigns to the nearest binding of `name`. Unknown names become globals.
pub fn assign(scope: &ScopeRef, name: &str, value: JsValue) -> Result<(), JErrorType> {
    let mut current = Some(scope.clone());
    let mut global: Option<ScopeRef> = None;
    while let Some(s) = current {
        let next = {
            let mut borrowed = s.borrow_mut();
            if borrowed.bindings.contains_key(name) {
                if borrowed.constants.contains(name) {
                    return Err(JErrorType::TypeError(format!(
                        "Assignment to constant variable '{}'",
                        name
                    )));
                }
                borrowed.bindings.insert(name.to_string(), value);
                return Ok(());
            }
            borrowed.parent.clone()
        };
        if s.borrow().kind == ScopeKind::Global {
            global = Some(s.clone());
        }
        current = next;
    }
    match global {
        Some(g) => {
            g.borrow_mut().declare(name, value);
            Ok(())
        }
        None => Err(JErrorType::ReferenceError(format!("{} is not defined", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::value::JsNumberType;

    fn num(i: i64) -> JsValue {
        JsValue::Number(JsNumberType::Integer(i))
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let global = Scope::new_child(&Scope::new_intrinsic(), ScopeKind::Global);
        global.borrow_mut().declare("x", num(1));
        let block = Scope::new_child(&global, ScopeKind::Block);
        block.borrow_mut().declare("x", num(2));
        assert_eq!(try_get(&block, "x"), Some(num(2)));
        assert_eq!(try_get(&global, "x"), Some(num(1)));
        assert_eq!(try_get(&block, "y"), None);
    }

    #[test]
    fn undeclared_assignment_lands_in_global() {
        let global = Scope::new_child(&Scope::new_intrinsic(), ScopeKind::Global);
        let function = Scope::new_child(&global, ScopeKind::Function);
        assign(&function, "leak", num(3)).unwrap();
        assert!(global.borrow().has_own_binding("leak"));
        assert!(!function.borrow().has_own_binding("leak"));
    }

    #[test]
    fn iteration_copy_is_independent() {
        let global = Scope::new_child(&Scope::new_intrinsic(), ScopeKind::Global);
        let header = Scope::new_child(&global, ScopeKind::Block);
        header.borrow_mut().declare("i", num(0));
        let next = Scope::copy_for_iteration(&header);
        assign(&next, "i", num(1)).unwrap();
        assert_eq!(try_get(&header, "i"), Some(num(0)));
        assert_eq!(try_get(&next, "i"), Some(num(1)));
        assert_eq!(next.borrow().kind(), ScopeKind::Block);
    }

    #[test]
    fn constants_reject_assignment() {
        let global = Scope::new_child(&Scope::new_intrinsic(), ScopeKind::Global);
        global.borrow_mut().declare_const("c", num(1));
        assert!(matches!(
            assign(&global, "c", num(2)),
            Err(JErrorType::TypeError(_))
        ));
    }
}
