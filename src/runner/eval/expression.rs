//! Expression visits and the operators they apply.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::parser::ast::{
    BinaryOperator, HasMeta, LiteralType, LogicalOperator, MemberProperty, Node, NodeType,
    UnaryOperator, UpdateOperator,
};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::test_and_comparison::{less_than, loose_equal, strict_equal};
use crate::runner::ds::operations::type_conversion::{
    number_value, to_boolean, to_index, to_js_string, to_number, type_of,
};
use crate::runner::ds::scope;
use crate::runner::ds::value::{FunctionObject, JsValue};
use crate::runner::plugin::registry::BuiltInRegistry;

use super::function::make_closure;
use super::types::{Action, ActionResult, StateFrame, ValueResult};

const CALL_OBJECT: usize = 1;
const CALL_KEY: usize = 2;
const CALL_CALLEE: usize = 3;
const CALL_ARGUMENTS: usize = 4;
const CALL_RETURNED: usize = 5;

pub(crate) fn visit_expression(
    frame: &mut StateFrame,
    registry: &BuiltInRegistry,
    source: &str,
) -> ActionResult {
    let node = frame.node.clone();
    match &node.node_type {
        NodeType::Identifier(id) => {
            let value = scope::try_get(&frame.scope, &id.name)
                .ok_or_else(|| JErrorType::ReferenceError(format!("{} is not defined", id.name)))?;
            Ok(Action::Complete(value))
        }
        NodeType::Literal(literal) => Ok(Action::Complete(match literal {
            LiteralType::StringLiteral(s) => JsValue::String(s.clone()),
            LiteralType::BooleanLiteral(b) => JsValue::Boolean(*b),
            LiteralType::NullLiteral => JsValue::Null,
            LiteralType::NumberLiteral(n) => number_value(*n),
        })),
        NodeType::ArrayExpression { elements } => {
            if let Some(next) = gather(frame, elements) {
                return Ok(Action::Push(next));
            }
            Ok(Action::Complete(JsValue::new_array(std::mem::take(&mut frame.operands))))
        }
        NodeType::ObjectExpression { properties } => {
            if let Some(v) = frame.value.take() {
                frame.operands.push(v);
            }
            if let Some(property) = properties.get(frame.operands.len()) {
                return Ok(Action::Push(property.value.clone()));
            }
            let mut map = BTreeMap::new();
            for (property, value) in properties.iter().zip(frame.operands.drain(..)) {
                map.insert(property.key.clone(), value);
            }
            Ok(Action::Complete(JsValue::new_object(map)))
        }
        NodeType::FunctionExpression(data) => {
            Ok(Action::Complete(make_closure(data, &frame.scope, true)))
        }
        NodeType::SequenceExpression { expressions } => {
            if let Some(next) = gather(frame, expressions) {
                return Ok(Action::Push(next));
            }
            Ok(Action::Complete(frame.operands.pop().unwrap_or(JsValue::Undefined)))
        }
        NodeType::MemberExpression { object, property } => match frame.progress {
            0 => {
                frame.progress = 1;
                Ok(Action::Push(object.clone()))
            }
            1 => {
                let target = frame.take_value();
                match property {
                    MemberProperty::Named(name) => {
                        let key = JsValue::String(name.name.clone());
                        Ok(Action::Complete(get_property(registry, &target, &key)?))
                    }
                    MemberProperty::Computed(key) => {
                        frame.operands.push(target);
                        frame.progress = 2;
                        Ok(Action::Push(key.clone()))
                    }
                }
            }
            _ => {
                let key = frame.take_value();
                let target = frame.operands.pop().unwrap_or(JsValue::Undefined);
                Ok(Action::Complete(get_property(registry, &target, &key)?))
            }
        },
        NodeType::CallExpression { callee, arguments } => loop {
            match frame.progress {
                0 => {
                    if let NodeType::MemberExpression { object, .. } = &callee.node_type {
                        frame.progress = CALL_OBJECT;
                        return Ok(Action::Push(object.clone()));
                    }
                    frame.progress = CALL_CALLEE;
                    return Ok(Action::Push(callee.clone()));
                }
                CALL_OBJECT => {
                    let this = frame.take_value();
                    match &callee.node_type {
                        NodeType::MemberExpression {
                            property: MemberProperty::Computed(key),
                            ..
                        } => {
                            frame.operands.push(this);
                            frame.progress = CALL_KEY;
                            return Ok(Action::Push(key.clone()));
                        }
                        NodeType::MemberExpression {
                            property: MemberProperty::Named(name),
                            ..
                        } => {
                            let key = JsValue::String(name.name.clone());
                            let func = get_property(registry, &this, &key)?;
                            frame.operands = vec![func, this];
                            frame.progress = CALL_ARGUMENTS;
                        }
                        _ => return Err(unexpected(&node)),
                    }
                }
                CALL_KEY => {
                    let key = frame.take_value();
                    let this = frame.operands.pop().unwrap_or(JsValue::Undefined);
                    let func = get_property(registry, &this, &key)?;
                    frame.operands = vec![func, this];
                    frame.progress = CALL_ARGUMENTS;
                }
                CALL_CALLEE => {
                    let func = frame.take_value();
                    frame.operands = vec![func, JsValue::Undefined];
                    frame.progress = CALL_ARGUMENTS;
                }
                CALL_ARGUMENTS => {
                    if let Some(v) = frame.value.take() {
                        frame.operands.push(v);
                    }
                    let supplied = frame.operands.len().saturating_sub(2);
                    if let Some(next) = arguments.get(supplied) {
                        return Ok(Action::Push(next.clone()));
                    }
                    let mut operands = std::mem::take(&mut frame.operands).into_iter();
                    let callee_value = operands.next().unwrap_or(JsValue::Undefined);
                    let this = operands.next().unwrap_or(JsValue::Undefined);
                    if !callee_value.is_function() {
                        return Err(JErrorType::TypeError(format!(
                            "{} is not a function",
                            describe_callee(callee, source)
                        )));
                    }
                    frame.progress = CALL_RETURNED;
                    return Ok(Action::Call {
                        callee: callee_value,
                        this,
                        args: operands.collect(),
                    });
                }
                _ => return Ok(Action::Complete(frame.take_value())),
            }
        },
        NodeType::UnaryExpression { operator, argument } => {
            if frame.progress == 0 {
                if let (UnaryOperator::TypeOf, Some(name)) = (operator, argument.as_identifier()) {
                    let kind = scope::try_get(&frame.scope, name)
                        .map(|v| type_of(&v))
                        .unwrap_or("undefined");
                    return Ok(Action::Complete(JsValue::String(kind.to_string())));
                }
                frame.progress = 1;
                return Ok(Action::Push(argument.clone()));
            }
            let value = frame.take_value();
            Ok(Action::Complete(apply_unary(*operator, &value)))
        }
        NodeType::BinaryExpression {
            operator,
            left,
            right,
        } => {
            if let Some(v) = frame.value.take() {
                frame.operands.push(v);
            }
            match frame.operands.len() {
                0 => Ok(Action::Push(left.clone())),
                1 => Ok(Action::Push(right.clone())),
                _ => {
                    let b = frame.operands.pop().unwrap_or(JsValue::Undefined);
                    let a = frame.operands.pop().unwrap_or(JsValue::Undefined);
                    Ok(Action::Complete(apply_binary(*operator, &a, &b)))
                }
            }
        }
        NodeType::LogicalExpression {
            operator,
            left,
            right,
        } => match frame.progress {
            0 => {
                frame.progress = 1;
                Ok(Action::Push(left.clone()))
            }
            1 => {
                let value = frame.take_value();
                let short_circuit = match operator {
                    LogicalOperator::Or => to_boolean(&value),
                    LogicalOperator::And => !to_boolean(&value),
                };
                if short_circuit {
                    Ok(Action::Complete(value))
                } else {
                    frame.progress = 2;
                    Ok(Action::Push(right.clone()))
                }
            }
            _ => Ok(Action::Complete(frame.take_value())),
        },
        NodeType::ConditionalExpression {
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
                } else {
                    Ok(Action::Push(alternate.clone()))
                }
            }
            _ => Ok(Action::Complete(frame.take_value())),
        },
        NodeType::AssignmentExpression {
            operator,
            left,
            right,
        } => {
            let compound = operator.binary_operator();
            match &left.node_type {
                NodeType::Identifier(id) => {
                    if frame.progress == 0 {
                        frame.progress = 1;
                        return Ok(Action::Push(right.clone()));
                    }
                    let rhs = frame.take_value();
                    let result = match compound {
                        Some(op) => {
                            let current = scope::try_get(&frame.scope, &id.name).ok_or_else(|| {
                                JErrorType::ReferenceError(format!("{} is not defined", id.name))
                            })?;
                            apply_binary(op, &current, &rhs)
                        }
                        None => rhs,
                    };
                    scope::assign(&frame.scope, &id.name, result.clone())?;
                    Ok(Action::Complete(result))
                }
                NodeType::MemberExpression { object, property } => match frame.progress {
                    0 => {
                        frame.progress = 1;
                        Ok(Action::Push(object.clone()))
                    }
                    1 => {
                        let target = frame.take_value();
                        frame.operands.push(target);
                        match property {
                            MemberProperty::Named(name) => {
                                frame.operands.push(JsValue::String(name.name.clone()));
                                frame.progress = 3;
                                Ok(Action::Push(right.clone()))
                            }
                            MemberProperty::Computed(key) => {
                                frame.progress = 2;
                                Ok(Action::Push(key.clone()))
                            }
                        }
                    }
                    2 => {
                        let key = frame.take_value();
                        frame.operands.push(key);
                        frame.progress = 3;
                        Ok(Action::Push(right.clone()))
                    }
                    _ => {
                        let rhs = frame.take_value();
                        let key = frame.operands.pop().unwrap_or(JsValue::Undefined);
                        let target = frame.operands.pop().unwrap_or(JsValue::Undefined);
                        let result = match compound {
                            Some(op) => {
                                let current = get_property(registry, &target, &key)?;
                                apply_binary(op, &current, &rhs)
                            }
                            None => rhs,
                        };
                        set_property(&target, &key, result.clone())?;
                        Ok(Action::Complete(result))
                    }
                },
                _ => Err(JErrorType::SyntaxError(
                    "Invalid left-hand side in assignment".to_string(),
                )),
            }
        }
        NodeType::UpdateExpression {
            operator,
            prefix,
            argument,
        } => {
            let delta = match operator {
                UpdateOperator::PlusPlus => 1.0,
                UpdateOperator::MinusMinus => -1.0,
            };
            match &argument.node_type {
                NodeType::Identifier(id) => {
                    let current = scope::try_get(&frame.scope, &id.name).ok_or_else(|| {
                        JErrorType::ReferenceError(format!("{} is not defined", id.name))
                    })?;
                    let old = to_number(&current);
                    let new = old + delta;
                    scope::assign(&frame.scope, &id.name, number_value(new))?;
                    Ok(Action::Complete(number_value(if *prefix { new } else { old })))
                }
                NodeType::MemberExpression { object, property } => match frame.progress {
                    0 => {
                        frame.progress = 1;
                        Ok(Action::Push(object.clone()))
                    }
                    1 => {
                        let target = frame.take_value();
                        match property {
                            MemberProperty::Named(name) => {
                                let key = JsValue::String(name.name.clone());
                                update_property(registry, &target, &key, delta, *prefix)
                            }
                            MemberProperty::Computed(key) => {
                                frame.operands.push(target);
                                frame.progress = 2;
                                Ok(Action::Push(key.clone()))
                            }
                        }
                    }
                    _ => {
                        let key = frame.take_value();
                        let target = frame.operands.pop().unwrap_or(JsValue::Undefined);
                        update_property(registry, &target, &key, delta, *prefix)
                    }
                },
                _ => Err(JErrorType::SyntaxError(
                    "Invalid left-hand side expression in update operation".to_string(),
                )),
            }
        }
        _ => Err(unexpected(&node)),
    }
}

/// Collects the delivered value and returns the next node to evaluate, if any.
fn gather(frame: &mut StateFrame, nodes: &[Rc<Node>]) -> Option<Rc<Node>> {
    if let Some(v) = frame.value.take() {
        frame.operands.push(v);
    }
    nodes.get(frame.operands.len()).cloned()
}

fn unexpected(node: &Node) -> JErrorType {
    JErrorType::SyntaxError(format!("Unexpected {}", node.type_name()))
}

/// The callee as written, with whitespace runs collapsed.
fn describe_callee(callee: &Node, source: &str) -> String {
    let text = callee.source_text(source).split_whitespace().collect::<Vec<_>>().join(" ");
    match &callee.node_type {
        NodeType::Identifier(id) if text.is_empty() => id.name.clone(),
        _ if text.is_empty() => "expression".to_string(),
        _ => text,
    }
}

fn update_property(
    registry: &BuiltInRegistry,
    target: &JsValue,
    key: &JsValue,
    delta: f64,
    prefix: bool,
) -> ActionResult {
    let old = to_number(&get_property(registry, target, key)?);
    let new = old + delta;
    set_property(target, key, number_value(new))?;
    Ok(Action::Complete(number_value(if prefix { new } else { old })))
}

fn builtin_method(registry: &BuiltInRegistry, table: &str, key: &str) -> JsValue {
    match registry.get_method(table, key) {
        Some(func) => JsValue::Function(Rc::new(FunctionObject::BuiltIn {
            name: format!("{}.{}", table, key),
            func,
        })),
        None => JsValue::Undefined,
    }
}

/// Property read, including `length` and the prototype method tables.
pub fn get_property(registry: &BuiltInRegistry, target: &JsValue, key: &JsValue) -> ValueResult {
    let name = to_js_string(key);
    match target {
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot read properties of {} (reading '{}')",
            target, name
        ))),
        JsValue::Array(items) => {
            if name == "length" {
                return Ok(number_value((**items).borrow().len() as f64));
            }
            if let Some(index) = to_index(key).filter(|_| !matches!(key, JsValue::String(s) if s.is_empty())) {
                return Ok((**items)
                    .borrow()
                    .get(index)
                    .cloned()
                    .unwrap_or(JsValue::Undefined));
            }
            Ok(builtin_method(registry, "Array", &name))
        }
        JsValue::String(s) => {
            if name == "length" {
                return Ok(number_value(s.chars().count() as f64));
            }
            if let Some(index) = to_index(key) {
                return Ok(s
                    .chars()
                    .nth(index)
                    .map(|c| JsValue::String(c.to_string()))
                    .unwrap_or(JsValue::Undefined));
            }
            Ok(builtin_method(registry, "String", &name))
        }
        JsValue::Number(_) => Ok(builtin_method(registry, "Number", &name)),
        JsValue::Object(properties) => Ok((**properties)
            .borrow()
            .get(&name)
            .cloned()
            .unwrap_or(JsValue::Undefined)),
        JsValue::Function(func) if name == "name" => Ok(JsValue::String(func.name().to_string())),
        JsValue::Boolean(_) | JsValue::Function(_) => Ok(JsValue::Undefined),
    }
}

pub fn set_property(target: &JsValue, key: &JsValue, value: JsValue) -> Result<(), JErrorType> {
    let name = to_js_string(key);
    match target {
        JsValue::Array(items) => {
            let mut items = items.borrow_mut();
            if name == "length" {
                let len = to_index(&value).ok_or_else(|| {
                    JErrorType::RangeError("Invalid array length".to_string())
                })?;
                items.resize(len, JsValue::Undefined);
                return Ok(());
            }
            match to_index(key) {
                Some(index) => {
                    if index >= items.len() {
                        items.resize(index + 1, JsValue::Undefined);
                    }
                    items[index] = value;
                    Ok(())
                }
                None => Err(JErrorType::TypeError(format!(
                    "Cannot set property '{}' on an array",
                    name
                ))),
            }
        }
        JsValue::Object(properties) => {
            properties.borrow_mut().insert(name, value);
            Ok(())
        }
        other => Err(JErrorType::TypeError(format!(
            "Cannot set properties of {} (setting '{}')",
            other, name
        ))),
    }
}

pub fn apply_unary(operator: UnaryOperator, value: &JsValue) -> JsValue {
    match operator {
        UnaryOperator::Minus => number_value(-to_number(value)),
        UnaryOperator::Plus => number_value(to_number(value)),
        UnaryOperator::LogicalNot => JsValue::Boolean(!to_boolean(value)),
        UnaryOperator::TypeOf => JsValue::String(type_of(value).to_string()),
    }
}

pub fn apply_binary(operator: BinaryOperator, a: &JsValue, b: &JsValue) -> JsValue {
    match operator {
        BinaryOperator::Add => {
            let stringy = |v: &JsValue| {
                matches!(v, JsValue::String(_) | JsValue::Array(_) | JsValue::Object(_) | JsValue::Function(_))
            };
            if stringy(a) || stringy(b) {
                JsValue::String(format!("{}{}", to_js_string(a), to_js_string(b)))
            } else {
                number_value(to_number(a) + to_number(b))
            }
        }
        BinaryOperator::Subtract => number_value(to_number(a) - to_number(b)),
        BinaryOperator::Multiply => number_value(to_number(a) * to_number(b)),
        BinaryOperator::Divide => number_value(to_number(a) / to_number(b)),
        BinaryOperator::Modulo => number_value(to_number(a) % to_number(b)),
        BinaryOperator::Exponent => number_value(to_number(a).powf(to_number(b))),
        BinaryOperator::LooselyEqual => JsValue::Boolean(loose_equal(a, b)),
        BinaryOperator::LooselyUnequal => JsValue::Boolean(!loose_equal(a, b)),
        BinaryOperator::StrictlyEqual => JsValue::Boolean(strict_equal(a, b)),
        BinaryOperator::StrictlyUnequal => JsValue::Boolean(!strict_equal(a, b)),
        BinaryOperator::LessThan => JsValue::Boolean(less_than(a, b) == Some(true)),
        BinaryOperator::GreaterThan => JsValue::Boolean(less_than(b, a) == Some(true)),
        BinaryOperator::LessThanEqual => JsValue::Boolean(less_than(b, a) == Some(false)),
        BinaryOperator::GreaterThanEqual => JsValue::Boolean(less_than(a, b) == Some(false)),
    }
}
