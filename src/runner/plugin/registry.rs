//! Built-in registry for managing built-in objects and global functions.

use std::collections::HashMap;
use std::rc::Rc;

use super::types::{BuiltInFn, BuiltInKind, BuiltInObject};
use crate::runner::std_lib::register_core_builtins;

/// Registry for built-in objects.
pub struct BuiltInRegistry {
    /// All registered built-in objects.
    objects: HashMap<String, BuiltInObject>,

    /// Free functions bound directly to a global name (`view`, `getVars`).
    functions: HashMap<String, Rc<BuiltInFn>>,
}

impl BuiltInRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        BuiltInRegistry {
            objects: HashMap::new(),
            functions: HashMap::new(),
        }
    }

    /// Create a registry with the core built-ins and the breakpoint intrinsics.
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        register_core_builtins(&mut registry);
        registry
    }

    /// Register a built-in object (programmatic API).
    pub fn register_object(&mut self, obj: BuiltInObject) {
        self.objects.insert(obj.name.clone(), obj);
    }

    /// Register a global function.
    pub fn register_function(&mut self, name: impl Into<String>, func: BuiltInFn) {
        self.functions.insert(name.into(), Rc::new(func));
    }

    /// Get a registered object by name.
    pub fn get_object(&self, name: &str) -> Option<&BuiltInObject> {
        self.objects.get(name)
    }

    /// Get a built-in function for execution.
    pub fn get_method(&self, object: &str, method: &str) -> Option<Rc<BuiltInFn>> {
        self.objects
            .get(object)
            .and_then(|obj| obj.methods.get(method))
            .cloned()
    }

    pub fn get_function(&self, name: &str) -> Option<Rc<BuiltInFn>> {
        self.functions.get(name).cloned()
    }

    /// Check if an object exists in the registry.
    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Objects that are bound to a global name, sorted by name.
    pub fn global_objects(&self) -> Vec<&BuiltInObject> {
        let mut globals: Vec<&BuiltInObject> = self
            .objects
            .values()
            .filter(|obj| obj.kind == BuiltInKind::Global)
            .collect();
        globals.sort_by(|a, b| a.name.cmp(&b.name));
        globals
    }

    /// Global functions, sorted by name.
    pub fn global_functions(&self) -> Vec<(&String, &Rc<BuiltInFn>)> {
        let mut functions: Vec<(&String, &Rc<BuiltInFn>)> = self.functions.iter().collect();
        functions.sort_by(|a, b| a.0.cmp(b.0));
        functions
    }
}

impl Default for BuiltInRegistry {
    fn default() -> Self {
        Self::with_core()
    }
}
