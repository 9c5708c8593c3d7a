//! Runtime data structures: values, scopes and errors.

pub mod error;
pub mod scope;
pub mod value;

pub mod operations {
    pub mod test_and_comparison;
    pub mod type_conversion;
}

pub use error::JErrorType;
pub use scope::{Scope, ScopeKind, ScopeRef};
pub use value::{FunctionObject, JsNumberType, JsValue};
