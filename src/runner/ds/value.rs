use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use serde_json::{Map, Number, Value};

use crate::parser::ast::FunctionData;
use crate::runner::ds::operations::type_conversion::{
    number_to_string, TYPE_STR_NULL, TYPE_STR_UNDEFINED,
};
use crate::runner::ds::scope::ScopeRef;
use crate::runner::plugin::types::BuiltInFn;

pub type ArrayRef = Rc<RefCell<Vec<JsValue>>>;
pub type ObjectRef = Rc<RefCell<BTreeMap<String, JsValue>>>;

#[derive(Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    String(String),
    Number(JsNumberType),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<FunctionObject>),
}

impl JsValue {
    pub fn new_array(items: Vec<JsValue>) -> Self {
        JsValue::Array(Rc::new(RefCell::new(items)))
    }

    pub fn new_object(properties: BTreeMap<String, JsValue>) -> Self {
        JsValue::Object(Rc::new(RefCell::new(properties)))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, JsValue::Function(_))
    }

    /// Converts to a JSON value. Integral numbers become integers, non-finite
    /// numbers and `undefined` become `null`, functions are dropped from
    /// objects and turn into `null` elsewhere.
    pub fn to_native(&self) -> Value {
        match self {
            JsValue::Undefined | JsValue::Null | JsValue::Function(_) => Value::Null,
            JsValue::Boolean(b) => Value::Bool(*b),
            JsValue::String(s) => Value::String(s.clone()),
            JsValue::Number(n) => match n {
                JsNumberType::Integer(i) => Value::Number(Number::from(*i)),
                JsNumberType::Float(f) => Number::from_f64(*f)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            },
            JsValue::Array(items) => {
                Value::Array((**items).borrow().iter().map(|v| v.to_native()).collect())
            }
            JsValue::Object(properties) => {
                let mut map = Map::new();
                for (key, value) in (**properties).borrow().iter() {
                    if !value.is_function() {
                        map.insert(key.clone(), value.to_native());
                    }
                }
                Value::Object(map)
            }
        }
    }

    pub fn from_native(value: &Value) -> Self {
        match value {
            Value::Null => JsValue::Null,
            Value::Bool(b) => JsValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => JsValue::Number(JsNumberType::Integer(i)),
                None => JsValue::Number(JsNumberType::from_f64(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => JsValue::String(s.clone()),
            Value::Array(items) => JsValue::new_array(items.iter().map(JsValue::from_native).collect()),
            Value::Object(map) => JsValue::new_object(
                map.iter()
                    .map(|(k, v)| (k.clone(), JsValue::from_native(v)))
                    .collect(),
            ),
        }
    }
}

impl Display for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "{}", TYPE_STR_UNDEFINED),
            JsValue::Null => write!(f, "{}", TYPE_STR_NULL),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::String(s) => write!(f, "{}", s),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::Array(items) => {
                let parts: Vec<String> = (**items)
                    .borrow()
                    .iter()
                    .map(|v| match v {
                        JsValue::Undefined | JsValue::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "{}", parts.join(","))
            }
            JsValue::Object(_) => write!(f, "[object Object]"),
            JsValue::Function(func) => write!(f, "function {}() {{ [code] }}", func.name()),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "JsValue::Undefined"),
            JsValue::Null => write!(f, "JsValue::Null"),
            JsValue::Boolean(b) => write!(f, "JsValue::Boolean({})", b),
            JsValue::String(s) => write!(f, "JsValue::String({:?})", s),
            JsValue::Number(n) => write!(f, "JsValue::Number({:?})", n),
            JsValue::Array(items) => write!(f, "JsValue::Array({:?})", (**items).borrow()),
            JsValue::Object(properties) => {
                write!(f, "JsValue::Object({:?})", (**properties).borrow())
            }
            JsValue::Function(func) => write!(f, "JsValue::Function({})", func.name()),
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a.as_f64() == b.as_f64(),
            (JsValue::Array(a), JsValue::Array(b)) => Rc::ptr_eq(a, b),
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            (JsValue::Function(a), JsValue::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsNumberType {
    Integer(i64),
    Float(f64),
    NaN,
    PositiveInfinity,
    NegativeInfinity,
}

impl JsNumberType {
    /// Normalizes an `f64` so that integral values are stored as integers.
    pub fn from_f64(f: f64) -> Self {
        if f.is_nan() {
            JsNumberType::NaN
        } else if f == f64::INFINITY {
            JsNumberType::PositiveInfinity
        } else if f == f64::NEG_INFINITY {
            JsNumberType::NegativeInfinity
        } else if f.fract() == 0.0 && f.abs() < 9007199254740992.0 && !(f == 0.0 && f.is_sign_negative()) {
            JsNumberType::Integer(f as i64)
        } else {
            JsNumberType::Float(f)
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            JsNumberType::Integer(i) => *i as f64,
            JsNumberType::Float(f) => *f,
            JsNumberType::NaN => f64::NAN,
            JsNumberType::PositiveInfinity => f64::INFINITY,
            JsNumberType::NegativeInfinity => f64::NEG_INFINITY,
        }
    }
}

impl Display for JsNumberType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", number_to_string(self.as_f64()))
    }
}

/// A callable value: either a closure over author code or a built-in.
pub enum FunctionObject {
    Script {
        data: Rc<FunctionData>,
        scope: ScopeRef,
    },
    BuiltIn {
        name: String,
        func: Rc<BuiltInFn>,
    },
}

impl FunctionObject {
    pub fn name(&self) -> &str {
        match self {
            FunctionObject::Script { data, .. } => data.name(),
            FunctionObject::BuiltIn { name, .. } => name,
        }
    }
}
