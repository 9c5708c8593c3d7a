//! Snapshots of the interpreter and the breakpoint payloads attached to them.

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::analysis::LinkageMap;
use crate::parser::ast::{HasMeta, LiteralType, Node, NodeType, UnaryOperator};
use crate::runner::ds::operations::type_conversion::number_value;
use crate::runner::ds::scope::ScopeKind;
use crate::runner::eval::{evaluate_detached, Interpreter};

/// Expression text of the entry reported when a payload cannot be read.
pub const VIEW_ERROR: &str = "[View Error]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewEntry {
    pub expression: String,
    pub description: String,
    pub value: Value,
    /// External variable the expression is linked to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_variable: Option<String>,
    /// Value of `index_variable`: the active element of `linked`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepPayload {
    pub value: Value,
    pub description: Option<String>,
    pub index: Option<Value>,
    /// `(formula, description)` pairs.
    pub formulas: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum BreakpointPayload {
    View(Vec<ViewEntry>),
    Step(StepPayload),
}

impl BreakpointPayload {
    fn view_error(message: &str) -> Self {
        BreakpointPayload::View(vec![ViewEntry {
            expression: VIEW_ERROR.to_string(),
            description: message.to_string(),
            value: Value::Null,
            linked: None,
            index_variable: None,
            index: None,
        }])
    }
}

/// One entry of the history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub index: usize,
    pub highlight: HighlightRange,
    pub variables: BTreeMap<String, Value>,
    pub stack_trace: Vec<String>,
    /// Kind of the innermost node, empty when the stack is empty.
    pub node_type: String,
    pub timestamp: DateTime<Utc>,
    pub breakpoint: Option<BreakpointPayload>,
}

pub struct StateBuilder;

impl StateBuilder {
    pub fn build(interpreter: &Interpreter, index: usize, program_text: &str) -> Step {
        let stack = interpreter.state_stack();
        let (highlight, node_type) = match stack.last() {
            Some(frame) => {
                let meta = frame.node.get_meta();
                let end = meta.end_index.min(program_text.len());
                (
                    HighlightRange {
                        start: meta.start_index.min(end),
                        end,
                    },
                    frame.node.type_name().to_string(),
                )
            }
            None => (HighlightRange::default(), String::new()),
        };
        Step {
            index,
            highlight,
            variables: Self::variables(interpreter),
            stack_trace: Self::stack_trace(interpreter),
            node_type,
            timestamp: Utc::now(),
            breakpoint: None,
        }
    }

    /// Every binding visible from some frame, innermost frame first, the
    /// first binding of a name winning. Functions and built-ins are left out.
    pub fn variables(interpreter: &Interpreter) -> BTreeMap<String, Value> {
        let mut variables = BTreeMap::new();
        let mut seen = HashSet::new();
        for frame in interpreter.state_stack().iter().rev() {
            let mut current = Some(frame.scope.clone());
            while let Some(scope) = current {
                if !seen.insert(Rc::as_ptr(&scope)) {
                    break;
                }
                let s = scope.borrow();
                if s.kind() == ScopeKind::Intrinsic {
                    break;
                }
                for (name, value) in s.bindings() {
                    if !value.is_function() && !variables.contains_key(&name) {
                        variables.insert(name, value.to_native());
                    }
                }
                current = s.parent();
            }
        }
        variables
    }

    /// `Frame <i>: <node> (<function>)` lines, innermost frame first.
    pub fn stack_trace(interpreter: &Interpreter) -> Vec<String> {
        let stack = interpreter.state_stack();
        let mut function: Vec<Option<String>> = Vec::with_capacity(stack.len());
        let mut enclosing: Option<String> = None;
        for frame in stack {
            if let Some(data) = &frame.function {
                enclosing = Some(match data.name() {
                    "" => "anonymous".to_string(),
                    name => name.to_string(),
                });
            }
            function.push(enclosing.clone());
        }
        stack
            .iter()
            .zip(function)
            .rev()
            .enumerate()
            .map(|(i, (frame, function))| match function {
                Some(name) => format!("Frame {}: {} ({})", i, frame.node.type_name(), name),
                None => format!("Frame {}: {}", i, frame.node.type_name()),
            })
            .collect()
    }

    /// Reads the payload of the innermost breakpoint call on the stack.
    /// Problems with the payload are reported inside it.
    pub fn extract_breakpoint(
        interpreter: &Interpreter,
        program_text: &str,
        variables: &BTreeMap<String, Value>,
        linkage: &LinkageMap,
    ) -> Option<BreakpointPayload> {
        let frame = interpreter.breakpoint_call()?;
        let arguments = match &frame.node.node_type {
            NodeType::CallExpression { arguments, .. } => arguments,
            _ => return None,
        };
        let reader = PayloadReader {
            program_text,
            variables,
            linkage,
        };
        Some(reader.read(arguments).unwrap_or_else(|e| {
            warn!("could not read breakpoint payload: {}", e);
            BreakpointPayload::view_error(&e)
        }))
    }
}

struct PayloadReader<'a> {
    program_text: &'a str,
    variables: &'a BTreeMap<String, Value>,
    linkage: &'a LinkageMap,
}

impl<'a> PayloadReader<'a> {
    fn read(&self, arguments: &[Rc<Node>]) -> Result<BreakpointPayload, String> {
        let first = match arguments.first() {
            Some(first) => first,
            None => return Ok(BreakpointPayload::View(vec![])),
        };
        match &first.node_type {
            NodeType::ArrayExpression { elements } => {
                let nested = !elements.is_empty()
                    && elements
                        .iter()
                        .all(|e| matches!(e.node_type, NodeType::ArrayExpression { .. }));
                if nested {
                    let entries = elements
                        .iter()
                        .map(|e| match &e.node_type {
                            NodeType::ArrayExpression { elements } => self.entry(elements),
                            _ => Err("malformed view entry".to_string()),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(BreakpointPayload::View(entries))
                } else {
                    Ok(BreakpointPayload::View(vec![self.entry(elements)?]))
                }
            }
            NodeType::ObjectExpression { properties } => {
                let get = |key: &str| properties.iter().find(|p| p.key == key).map(|p| &p.value);
                let value_node = get("value").ok_or("step payload has no 'value'")?;
                let description = get("description").map(|n| self.text(n)).transpose()?;
                let index = match get("index") {
                    Some(n) => Some(self.resolve_node(n)?),
                    None => None,
                };
                let formulas = match get("formulas").map(|n| &n.node_type) {
                    Some(NodeType::ArrayExpression { elements }) => elements
                        .iter()
                        .map(|pair| match &pair.node_type {
                            NodeType::ArrayExpression { elements } if elements.len() == 2 => {
                                Ok((self.text(&elements[0])?, self.text(&elements[1])?))
                            }
                            _ => Err("formulas must be pairs".to_string()),
                        })
                        .collect::<Result<Vec<_>, String>>()?,
                    Some(_) => return Err("formulas must be a list".to_string()),
                    None => vec![],
                };
                Ok(BreakpointPayload::Step(StepPayload {
                    value: self.resolve_node(value_node)?,
                    description,
                    index,
                    formulas,
                }))
            }
            _ => Ok(BreakpointPayload::View(vec![self.entry(arguments)?])),
        }
    }

    /// `[expression, description, indexVariable?]`.
    fn entry(&self, parts: &[Rc<Node>]) -> Result<ViewEntry, String> {
        let expression_node = parts.first().ok_or("empty view entry")?;
        let expression = match expression_node.as_string_literal() {
            Some(text) => text.to_string(),
            None => expression_node.source_text(self.program_text).to_string(),
        };
        let description = match parts.get(1) {
            Some(n) => self.text(n)?,
            None => String::new(),
        };
        let index_variable = match parts.get(2) {
            Some(n) => Some(self.text(n)?),
            None => None,
        };
        let value = self.resolve(&expression)?;
        let index = index_variable
            .as_ref()
            .map(|name| self.resolve(name))
            .transpose()?;
        let linked = self
            .linkage
            .get(&expression)
            .and_then(|l| l.single())
            .map(String::from);
        Ok(ViewEntry {
            expression,
            description,
            value,
            linked,
            index_variable,
            index,
        })
    }

    /// String content of a literal; other nodes are evaluated and printed.
    fn text(&self, node: &Node) -> Result<String, String> {
        match &node.node_type {
            NodeType::Literal(LiteralType::StringLiteral(s)) => Ok(s.clone()),
            _ => match self.resolve_node(node)? {
                Value::String(s) => Ok(s),
                other => Ok(other.to_string()),
            },
        }
    }

    fn resolve_node(&self, node: &Node) -> Result<Value, String> {
        match &node.node_type {
            NodeType::Literal(LiteralType::StringLiteral(s)) => self.resolve(s),
            NodeType::Literal(LiteralType::NumberLiteral(n)) => Ok(number(*n)),
            NodeType::Literal(LiteralType::BooleanLiteral(b)) => Ok(Value::Bool(*b)),
            NodeType::Literal(LiteralType::NullLiteral) => Ok(Value::Null),
            NodeType::UnaryExpression {
                operator: UnaryOperator::Minus,
                argument,
            } => match &argument.node_type {
                NodeType::Literal(LiteralType::NumberLiteral(n)) => Ok(number(-*n)),
                _ => self.resolve(node.source_text(self.program_text)),
            },
            _ => self.resolve(node.source_text(self.program_text)),
        }
    }

    /// A visible local by name, anything else through a detached evaluation.
    fn resolve(&self, expression: &str) -> Result<Value, String> {
        let expression = expression.trim();
        if let Some(value) = self.variables.get(expression) {
            return Ok(value.clone());
        }
        evaluate_detached(expression, self.variables).map_err(|e| e.to_string())
    }
}

fn number(n: f64) -> Value {
    number_value(n).to_native()
}
