//! Core types for the built-in machinery.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;

/// Execution context passed to native functions.
pub struct EvalContext {
    /// External values as supplied when the interpreter was initialized.
    /// `getVars()` serializes exactly this map.
    pub external_values: Map<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext {
            external_values: Map::new(),
        }
    }

    pub fn with_external_values(external_values: Map<String, Value>) -> Self {
        EvalContext { external_values }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A built-in implemented as a plain function. `this` is the receiver for
/// methods and `undefined` for global functions.
pub type NativeFn = fn(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType>;

/// Built-in function - either compiled-in or a closure built at registration.
pub enum BuiltInFn {
    /// Direct function pointer.
    Native(NativeFn),

    /// Closure, for built-ins that carry their own state (their name, say).
    Plugin(Box<dyn Fn(&mut EvalContext, JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType> + Send + Sync>),
}

impl BuiltInFn {
    pub fn call(
        &self,
        ctx: &mut EvalContext,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JErrorType> {
        match self {
            BuiltInFn::Native(f) => f(ctx, this, args),
            BuiltInFn::Plugin(f) => f(ctx, this, args),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltInKind {
    /// Bound as a global object (`Math`, `JSON`, `console`).
    Global,
    /// Method table for values of a kind (`Array`, `String`, `Number`).
    Prototype,
}

/// A named table of built-in methods and constants.
pub struct BuiltInObject {
    /// Name of the object (e.g., "Array", "Math").
    pub name: String,

    pub kind: BuiltInKind,

    /// Methods defined on this object or its prototype.
    pub methods: HashMap<String, Rc<BuiltInFn>>,

    /// Static properties.
    pub properties: HashMap<String, JsValue>,
}

impl BuiltInObject {
    /// Create a new global built-in object with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        BuiltInObject {
            name: name.into(),
            kind: BuiltInKind::Global,
            methods: HashMap::new(),
            properties: HashMap::new(),
        }
    }

    /// Mark this object as the method table of a value kind.
    pub fn as_prototype(mut self) -> Self {
        self.kind = BuiltInKind::Prototype;
        self
    }

    /// Add a native method.
    pub fn add_method(mut self, name: impl Into<String>, func: NativeFn) -> Self {
        self.methods
            .insert(name.into(), Rc::new(BuiltInFn::Native(func)));
        self
    }

    /// Add a property.
    pub fn add_property(mut self, name: impl Into<String>, value: JsValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}
