use std::fmt::Debug;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Meta {
    pub start_index: usize,
    pub end_index: usize,
}

impl Meta {
    pub fn new(start_index: usize, end_index: usize) -> Self {
        Meta {
            start_index,
            end_index,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(&self, other: &Meta) -> Meta {
        Meta {
            start_index: self.start_index.min(other.start_index),
            end_index: self.end_index.max(other.end_index),
        }
    }
}

pub trait HasMeta {
    fn get_meta(&self) -> &Meta;

    fn source_text<'a>(&self, script: &'a str) -> &'a str {
        let meta = self.get_meta();
        script
            .get(meta.start_index..meta.end_index)
            .unwrap_or_default()
    }
}

/// A node of the syntax tree. Children are shared so that interpreter frames
/// can hold on to the node they are executing.
#[derive(Debug)]
pub struct Node {
    pub meta: Meta,
    pub node_type: NodeType,
}

impl HasMeta for Node {
    fn get_meta(&self) -> &Meta {
        &self.meta
    }
}

pub type NodeRef = Rc<Node>;

#[derive(Debug)]
pub enum NodeType {
    Program {
        body: Vec<NodeRef>,
    },
    BlockStatement {
        body: Vec<NodeRef>,
    },
    EmptyStatement,
    ExpressionStatement {
        expression: NodeRef,
    },
    VariableDeclaration {
        kind: VariableDeclarationKind,
        declarations: Vec<NodeRef>,
    },
    VariableDeclarator {
        id: IdentifierData,
        init: Option<NodeRef>,
    },
    FunctionDeclaration(Rc<FunctionData>),
    IfStatement {
        test: NodeRef,
        consequent: NodeRef,
        alternate: Option<NodeRef>,
    },
    ForStatement {
        init: Option<NodeRef>,
        test: Option<NodeRef>,
        update: Option<NodeRef>,
        body: NodeRef,
    },
    WhileStatement {
        test: NodeRef,
        body: NodeRef,
    },
    DoWhileStatement {
        body: NodeRef,
        test: NodeRef,
    },
    ReturnStatement {
        argument: Option<NodeRef>,
    },
    //Labels are not supported, hence break & continue always target the innermost loop
    BreakStatement,
    ContinueStatement,
    Identifier(IdentifierData),
    Literal(LiteralType),
    ArrayExpression {
        elements: Vec<NodeRef>,
    },
    ObjectExpression {
        properties: Vec<PropertyData>,
    },
    FunctionExpression(Rc<FunctionData>),
    MemberExpression {
        object: NodeRef,
        property: MemberProperty,
    },
    CallExpression {
        callee: NodeRef,
        arguments: Vec<NodeRef>,
    },
    UnaryExpression {
        operator: UnaryOperator,
        argument: NodeRef,
    },
    UpdateExpression {
        operator: UpdateOperator,
        prefix: bool,
        argument: NodeRef,
    },
    BinaryExpression {
        operator: BinaryOperator,
        left: NodeRef,
        right: NodeRef,
    },
    LogicalExpression {
        operator: LogicalOperator,
        left: NodeRef,
        right: NodeRef,
    },
    ConditionalExpression {
        test: NodeRef,
        consequent: NodeRef,
        alternate: NodeRef,
    },
    AssignmentExpression {
        operator: AssignmentOperator,
        left: NodeRef,
        right: NodeRef,
    },
    SequenceExpression {
        expressions: Vec<NodeRef>,
    },
}

impl Node {
    /// ESTree name of the node kind, used in stack traces and block detection.
    pub fn type_name(&self) -> &'static str {
        match &self.node_type {
            NodeType::Program { .. } => "Program",
            NodeType::BlockStatement { .. } => "BlockStatement",
            NodeType::EmptyStatement => "EmptyStatement",
            NodeType::ExpressionStatement { .. } => "ExpressionStatement",
            NodeType::VariableDeclaration { .. } => "VariableDeclaration",
            NodeType::VariableDeclarator { .. } => "VariableDeclarator",
            NodeType::FunctionDeclaration(_) => "FunctionDeclaration",
            NodeType::IfStatement { .. } => "IfStatement",
            NodeType::ForStatement { .. } => "ForStatement",
            NodeType::WhileStatement { .. } => "WhileStatement",
            NodeType::DoWhileStatement { .. } => "DoWhileStatement",
            NodeType::ReturnStatement { .. } => "ReturnStatement",
            NodeType::BreakStatement => "BreakStatement",
            NodeType::ContinueStatement => "ContinueStatement",
            NodeType::Identifier(_) => "Identifier",
            NodeType::Literal(_) => "Literal",
            NodeType::ArrayExpression { .. } => "ArrayExpression",
            NodeType::ObjectExpression { .. } => "ObjectExpression",
            NodeType::FunctionExpression(_) => "FunctionExpression",
            NodeType::MemberExpression { .. } => "MemberExpression",
            NodeType::CallExpression { .. } => "CallExpression",
            NodeType::UnaryExpression { .. } => "UnaryExpression",
            NodeType::UpdateExpression { .. } => "UpdateExpression",
            NodeType::BinaryExpression { .. } => "BinaryExpression",
            NodeType::LogicalExpression { .. } => "LogicalExpression",
            NodeType::ConditionalExpression { .. } => "ConditionalExpression",
            NodeType::AssignmentExpression { .. } => "AssignmentExpression",
            NodeType::SequenceExpression { .. } => "SequenceExpression",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.node_type, NodeType::BlockStatement { .. })
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.node_type {
            NodeType::Identifier(id) => Some(id.name.as_str()),
            _ => None,
        }
    }

    pub fn as_string_literal(&self) -> Option<&str> {
        match &self.node_type {
            NodeType::Literal(LiteralType::StringLiteral(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Visits `self` and every descendant in source order. Function bodies are
    /// entered as well.
    pub fn walk<'a, F: FnMut(&'a Node)>(&'a self, visitor: &mut F) {
        visitor(self);
        for child in self.children() {
            child.walk(visitor);
        }
    }

    pub fn children(&self) -> Vec<&Node> {
        let mut children: Vec<&Node> = vec![];
        match &self.node_type {
            NodeType::Program { body } | NodeType::BlockStatement { body } => {
                children.extend(body.iter().map(|n| n.as_ref()));
            }
            NodeType::EmptyStatement
            | NodeType::BreakStatement
            | NodeType::ContinueStatement
            | NodeType::Identifier(_)
            | NodeType::Literal(_) => {}
            NodeType::ExpressionStatement { expression } => children.push(expression),
            NodeType::VariableDeclaration { declarations, .. } => {
                children.extend(declarations.iter().map(|n| n.as_ref()));
            }
            NodeType::VariableDeclarator { init, .. } => {
                if let Some(init) = init {
                    children.push(init);
                }
            }
            NodeType::FunctionDeclaration(f) | NodeType::FunctionExpression(f) => {
                children.push(&f.body)
            }
            NodeType::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                children.push(test);
                children.push(consequent);
                if let Some(alternate) = alternate {
                    children.push(alternate);
                }
            }
            NodeType::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                for part in [init, test, update].iter().copied().flatten() {
                    children.push(part);
                }
                children.push(body);
            }
            NodeType::WhileStatement { test, body } => {
                children.push(test);
                children.push(body);
            }
            NodeType::DoWhileStatement { body, test } => {
                children.push(body);
                children.push(test);
            }
            NodeType::ReturnStatement { argument } => {
                if let Some(argument) = argument {
                    children.push(argument);
                }
            }
            NodeType::ArrayExpression { elements } => {
                children.extend(elements.iter().map(|n| n.as_ref()));
            }
            NodeType::ObjectExpression { properties } => {
                children.extend(properties.iter().map(|p| p.value.as_ref()));
            }
            NodeType::MemberExpression { object, property } => {
                children.push(object);
                if let MemberProperty::Computed(p) = property {
                    children.push(p);
                }
            }
            NodeType::CallExpression { callee, arguments } => {
                children.push(callee);
                children.extend(arguments.iter().map(|n| n.as_ref()));
            }
            NodeType::UnaryExpression { argument, .. }
            | NodeType::UpdateExpression { argument, .. } => children.push(argument),
            NodeType::BinaryExpression { left, right, .. }
            | NodeType::LogicalExpression { left, right, .. }
            | NodeType::AssignmentExpression { left, right, .. } => {
                children.push(left);
                children.push(right);
            }
            NodeType::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                children.push(test);
                children.push(consequent);
                children.push(alternate);
            }
            NodeType::SequenceExpression { expressions } => {
                children.extend(expressions.iter().map(|n| n.as_ref()));
            }
        }
        children
    }
}

#[derive(Debug, Clone)]
pub struct IdentifierData {
    pub name: String,
    pub meta: Meta,
}

impl HasMeta for IdentifierData {
    fn get_meta(&self) -> &Meta {
        &self.meta
    }
}

#[derive(Debug)]
pub struct FunctionData {
    pub meta: Meta,
    pub id: Option<IdentifierData>,
    pub params: Vec<IdentifierData>,
    /// Always a `BlockStatement`.
    pub body: NodeRef,
}

impl FunctionData {
    pub fn name(&self) -> &str {
        self.id.as_ref().map(|id| id.name.as_str()).unwrap_or("")
    }
}

impl HasMeta for FunctionData {
    fn get_meta(&self) -> &Meta {
        &self.meta
    }
}

#[derive(Debug)]
pub struct PropertyData {
    pub meta: Meta,
    pub key: String,
    pub value: NodeRef,
}

#[derive(Debug)]
pub enum MemberProperty {
    Named(IdentifierData),
    Computed(NodeRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableDeclarationKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    StringLiteral(String),
    BooleanLiteral(bool),
    NullLiteral,
    NumberLiteral(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Equals,
    AddEquals,
    SubtractEquals,
    MultiplyEquals,
    DivideEquals,
    ModuloEquals,
    ExponentEquals,
}

impl AssignmentOperator {
    /// The binary operator a compound assignment applies; `None` for `=`.
    pub fn binary_operator(&self) -> Option<BinaryOperator> {
        match self {
            AssignmentOperator::Equals => None,
            AssignmentOperator::AddEquals => Some(BinaryOperator::Add),
            AssignmentOperator::SubtractEquals => Some(BinaryOperator::Subtract),
            AssignmentOperator::MultiplyEquals => Some(BinaryOperator::Multiply),
            AssignmentOperator::DivideEquals => Some(BinaryOperator::Divide),
            AssignmentOperator::ModuloEquals => Some(BinaryOperator::Modulo),
            AssignmentOperator::ExponentEquals => Some(BinaryOperator::Exponent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Plus,
    LogicalNot,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    PlusPlus,
    MinusMinus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    LooselyEqual,
    LooselyUnequal,
    StrictlyEqual,
    StrictlyUnequal,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    Or,
    And,
}
