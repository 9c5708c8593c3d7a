use std::rc::Rc;
use std::time::Instant;

use pest::error::{Error, ErrorVariant};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use tracing::trace;

use super::ast::*;

#[derive(Parser)]
#[grammar = "parser/js_grammar.pest"] // relative to src
pub struct JsParser;

const TAB_WIDTH: usize = 2;

pub type ParseResult<T> = Result<T, Error<Rule>>;

impl JsParser {
    /// Parses a whole script into a `Program` node.
    pub fn parse_to_ast_from_str(script: &str) -> ParseResult<NodeRef> {
        let start = Instant::now();
        let pairs = JsParser::parse(Rule::script, script)?;
        let program = build_ast_from_script(pairs)?;
        trace!(
            "Parsed {} bytes in {}us",
            script.len(),
            start.elapsed().as_micros()
        );
        Ok(program)
    }

    /// Debug rendering of the token tree: one line per pair with its span.
    pub fn parse_to_token_tree(script: &str) -> Result<String, String> {
        let mut tree = vec![];
        match JsParser::parse(Rule::script, script) {
            Ok(pairs) => {
                for pair in pairs {
                    tree.push(pair_to_string(pair, 0).join("\n"));
                }
            }
            Err(rule) => {
                return Err(format!("Parse error due to {:?}", rule));
            }
        }
        Ok(tree.join("\n"))
    }
}

fn pair_to_string(pair: Pair<Rule>, level: usize) -> Vec<String> {
    let mut tree = vec![];
    let span = pair.as_span();
    let rule_name = format!(
        "{:?} => ({},{}) #{:?}",
        pair.as_rule(),
        span.start(),
        span.end(),
        span.as_str()
    );
    tree.push(format!("{}{}", " ".repeat(level * TAB_WIDTH), rule_name));
    for child_pair in pair.into_inner() {
        tree.append(pair_to_string(child_pair, level + 1).as_mut());
    }
    tree
}

fn get_unexpected_error(src: &'static str, pair: &Pair<Rule>) -> Error<Rule> {
    let message = format!("Unexpected state reached - {:?} ({})", pair.as_rule(), src);
    Error::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

fn get_meta(pair: &Pair<Rule>) -> Meta {
    let span = pair.as_span();
    Meta::new(span.start(), span.end())
}

fn new_node(meta: Meta, node_type: NodeType) -> NodeRef {
    Rc::new(Node { meta, node_type })
}

fn is_keyword_token(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_function
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_for
            | Rule::kw_while
            | Rule::kw_do
            | Rule::kw_return
            | Rule::kw_break
            | Rule::kw_continue
    )
}

/// Inner pairs with keyword tokens filtered out.
fn significant_inner(pair: Pair<Rule>) -> Vec<Pair<Rule>> {
    pair.into_inner()
        .filter(|p| !is_keyword_token(p.as_rule()))
        .collect()
}

fn next_pair<'a>(
    iter: &mut impl Iterator<Item = Pair<'a, Rule>>,
    parent: &Pair<'a, Rule>,
    src: &'static str,
) -> ParseResult<Pair<'a, Rule>> {
    iter.next().ok_or_else(|| get_unexpected_error(src, parent))
}

fn build_ast_from_script(pairs: Pairs<Rule>) -> ParseResult<NodeRef> {
    let mut body = vec![];
    let mut meta = Meta::default();
    for pair in pairs {
        if pair.as_rule() != Rule::script {
            return Err(get_unexpected_error("script", &pair));
        }
        meta = get_meta(&pair);
        for inner in pair.into_inner() {
            if inner.as_rule() == Rule::EOI {
                continue;
            }
            body.push(build_ast_from_statement(inner)?);
        }
    }
    Ok(new_node(meta, NodeType::Program { body }))
}

fn build_ast_from_statement(pair: Pair<Rule>) -> ParseResult<NodeRef> {
    let meta = get_meta(&pair);
    Ok(match pair.as_rule() {
        Rule::block_statement => {
            let mut body = vec![];
            for stmt in pair.into_inner() {
                body.push(build_ast_from_statement(stmt)?);
            }
            new_node(meta, NodeType::BlockStatement { body })
        }
        Rule::empty_statement => new_node(meta, NodeType::EmptyStatement),
        Rule::variable_statement => {
            let inner = next_pair(&mut pair.clone().into_inner(), &pair, "variable_statement")?;
            let declaration = build_ast_from_variable_declaration(inner)?;
            // The statement span includes the trailing semicolon.
            match Rc::try_unwrap(declaration) {
                Ok(node) => new_node(meta, node.node_type),
                Err(shared) => shared,
            }
        }
        Rule::function_declaration => {
            let function = build_function_data(pair)?;
            new_node(meta, NodeType::FunctionDeclaration(Rc::new(function)))
        }
        Rule::if_statement => {
            let mut iter = significant_inner(pair.clone()).into_iter();
            let test = build_ast_from_expression(next_pair(&mut iter, &pair, "if test")?)?;
            let consequent =
                build_ast_from_statement(next_pair(&mut iter, &pair, "if consequent")?)?;
            let alternate = match iter.next() {
                Some(p) => Some(build_ast_from_statement(p)?),
                None => None,
            };
            new_node(
                meta,
                NodeType::IfStatement {
                    test,
                    consequent,
                    alternate,
                },
            )
        }
        Rule::for_statement => {
            let mut init = None;
            let mut test = None;
            let mut update = None;
            let mut body = None;
            for part in significant_inner(pair.clone()) {
                match part.as_rule() {
                    Rule::for_init => {
                        let inner = next_pair(&mut part.clone().into_inner(), &part, "for_init")?;
                        init = Some(if inner.as_rule() == Rule::variable_declaration {
                            build_ast_from_variable_declaration(inner)?
                        } else {
                            build_ast_from_expression(inner)?
                        });
                    }
                    Rule::for_test => {
                        let inner = next_pair(&mut part.clone().into_inner(), &part, "for_test")?;
                        test = Some(build_ast_from_expression(inner)?);
                    }
                    Rule::for_update => {
                        let inner =
                            next_pair(&mut part.clone().into_inner(), &part, "for_update")?;
                        update = Some(build_ast_from_expression(inner)?);
                    }
                    _ => body = Some(build_ast_from_statement(part)?),
                }
            }
            let body = body.ok_or_else(|| get_unexpected_error("for body", &pair))?;
            new_node(
                meta,
                NodeType::ForStatement {
                    init,
                    test,
                    update,
                    body,
                },
            )
        }
        Rule::while_statement => {
            let mut iter = significant_inner(pair.clone()).into_iter();
            let test = build_ast_from_expression(next_pair(&mut iter, &pair, "while test")?)?;
            let body = build_ast_from_statement(next_pair(&mut iter, &pair, "while body")?)?;
            new_node(meta, NodeType::WhileStatement { test, body })
        }
        Rule::do_while_statement => {
            let mut iter = significant_inner(pair.clone()).into_iter();
            let body = build_ast_from_statement(next_pair(&mut iter, &pair, "do body")?)?;
            let test = build_ast_from_expression(next_pair(&mut iter, &pair, "do test")?)?;
            new_node(meta, NodeType::DoWhileStatement { body, test })
        }
        Rule::return_statement => {
            let argument = match significant_inner(pair).into_iter().next() {
                Some(p) => Some(build_ast_from_expression(p)?),
                None => None,
            };
            new_node(meta, NodeType::ReturnStatement { argument })
        }
        Rule::break_statement => new_node(meta, NodeType::BreakStatement),
        Rule::continue_statement => new_node(meta, NodeType::ContinueStatement),
        Rule::expression_statement => {
            let inner = next_pair(&mut pair.clone().into_inner(), &pair, "expression_statement")?;
            let expression = build_ast_from_expression(inner)?;
            new_node(meta, NodeType::ExpressionStatement { expression })
        }
        _ => return Err(get_unexpected_error("statement", &pair)),
    })
}

fn build_ast_from_variable_declaration(pair: Pair<Rule>) -> ParseResult<NodeRef> {
    let meta = get_meta(&pair);
    let mut iter = pair.clone().into_inner();
    let kind = match next_pair(&mut iter, &pair, "var_kind")?.as_str() {
        "let" => VariableDeclarationKind::Let,
        "const" => VariableDeclarationKind::Const,
        _ => VariableDeclarationKind::Var,
    };
    let mut declarations = vec![];
    for declarator in iter {
        let declarator_meta = get_meta(&declarator);
        let mut inner = declarator.clone().into_inner();
        let id_pair = next_pair(&mut inner, &declarator, "variable_declarator")?;
        let id = build_identifier_data(&id_pair);
        let init = match inner.next() {
            Some(p) => Some(build_ast_from_expression(p)?),
            None => None,
        };
        if kind == VariableDeclarationKind::Const && init.is_none() {
            return Err(Error::new_from_span(
                ErrorVariant::CustomError {
                    message: "Missing initializer in const declaration".to_string(),
                },
                declarator.as_span(),
            ));
        }
        declarations.push(new_node(
            declarator_meta,
            NodeType::VariableDeclarator { id, init },
        ));
    }
    Ok(new_node(
        meta,
        NodeType::VariableDeclaration { kind, declarations },
    ))
}

fn build_identifier_data(pair: &Pair<Rule>) -> IdentifierData {
    IdentifierData {
        name: pair.as_str().to_string(),
        meta: get_meta(pair),
    }
}

fn build_function_data(pair: Pair<Rule>) -> ParseResult<FunctionData> {
    let meta = get_meta(&pair);
    let mut id = None;
    let mut params = vec![];
    let mut body = None;
    for part in significant_inner(pair.clone()) {
        match part.as_rule() {
            Rule::identifier => id = Some(build_identifier_data(&part)),
            Rule::formal_parameters => {
                for param in part.into_inner() {
                    params.push(build_identifier_data(&param));
                }
            }
            Rule::block_statement => body = Some(build_ast_from_statement(part)?),
            _ => return Err(get_unexpected_error("function", &part)),
        }
    }
    let body = body.ok_or_else(|| get_unexpected_error("function body", &pair))?;
    Ok(FunctionData {
        meta,
        id,
        params,
        body,
    })
}

fn build_ast_from_expression(pair: Pair<Rule>) -> ParseResult<NodeRef> {
    let meta = get_meta(&pair);
    match pair.as_rule() {
        Rule::expression => {
            let mut expressions = vec![];
            for p in pair.into_inner() {
                expressions.push(build_ast_from_expression(p)?);
            }
            if expressions.len() == 1 {
                Ok(expressions.remove(0))
            } else {
                Ok(new_node(meta, NodeType::SequenceExpression { expressions }))
            }
        }
        Rule::assignment_expression => {
            let mut inner: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
            if inner.len() == 1 {
                return build_ast_from_expression(inner.remove(0));
            }
            if inner.len() != 3 {
                return Err(get_unexpected_error("assignment_expression", &pair));
            }
            let right = build_ast_from_expression(inner.remove(2))?;
            let operator = match inner[1].as_str() {
                "=" => AssignmentOperator::Equals,
                "+=" => AssignmentOperator::AddEquals,
                "-=" => AssignmentOperator::SubtractEquals,
                "*=" => AssignmentOperator::MultiplyEquals,
                "/=" => AssignmentOperator::DivideEquals,
                "%=" => AssignmentOperator::ModuloEquals,
                "**=" => AssignmentOperator::ExponentEquals,
                _ => return Err(get_unexpected_error("assign_op", &inner[1])),
            };
            let left = build_ast_from_expression(inner.remove(0))?;
            match left.node_type {
                NodeType::Identifier(_) | NodeType::MemberExpression { .. } => {}
                _ => {
                    return Err(Error::new_from_span(
                        ErrorVariant::CustomError {
                            message: "Invalid left-hand side in assignment".to_string(),
                        },
                        pair.as_span(),
                    ))
                }
            }
            Ok(new_node(
                meta,
                NodeType::AssignmentExpression {
                    operator,
                    left,
                    right,
                },
            ))
        }
        Rule::conditional_expression => {
            let mut inner: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
            match inner.len() {
                1 => build_ast_from_expression(inner.remove(0)),
                3 => {
                    let alternate = build_ast_from_expression(inner.remove(2))?;
                    let consequent = build_ast_from_expression(inner.remove(1))?;
                    let test = build_ast_from_expression(inner.remove(0))?;
                    Ok(new_node(
                        meta,
                        NodeType::ConditionalExpression {
                            test,
                            consequent,
                            alternate,
                        },
                    ))
                }
                _ => Err(get_unexpected_error("conditional_expression", &pair)),
            }
        }
        Rule::logical_or
        | Rule::logical_and
        | Rule::equality
        | Rule::relational
        | Rule::additive
        | Rule::multiplicative => build_left_associative_chain(pair),
        Rule::exponentiation => {
            let mut inner: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
            match inner.len() {
                1 => build_ast_from_expression(inner.remove(0)),
                3 => {
                    let right = build_ast_from_expression(inner.remove(2))?;
                    let left = build_ast_from_expression(inner.remove(0))?;
                    Ok(new_node(
                        meta,
                        NodeType::BinaryExpression {
                            operator: BinaryOperator::Exponent,
                            left,
                            right,
                        },
                    ))
                }
                _ => Err(get_unexpected_error("exponentiation", &pair)),
            }
        }
        Rule::unary_expression => {
            let mut inner: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
            match inner.len() {
                1 => build_ast_from_expression(inner.remove(0)),
                2 => {
                    let argument = build_ast_from_expression(inner.remove(1))?;
                    let operator = match inner[0].as_str() {
                        "-" => UnaryOperator::Minus,
                        "+" => UnaryOperator::Plus,
                        "!" => UnaryOperator::LogicalNot,
                        "typeof" => UnaryOperator::TypeOf,
                        _ => return Err(get_unexpected_error("unary_op", &inner[0])),
                    };
                    Ok(new_node(
                        meta,
                        NodeType::UnaryExpression { operator, argument },
                    ))
                }
                _ => Err(get_unexpected_error("unary_expression", &pair)),
            }
        }
        Rule::update_expression => {
            let mut inner: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
            match inner.len() {
                1 => build_ast_from_expression(inner.remove(0)),
                2 => {
                    let prefix = inner[0].as_rule() == Rule::update_op;
                    let (op_pair, target_pair) = if prefix {
                        (inner.remove(0), inner.remove(0))
                    } else {
                        let target = inner.remove(0);
                        (inner.remove(0), target)
                    };
                    let operator = if op_pair.as_str() == "++" {
                        UpdateOperator::PlusPlus
                    } else {
                        UpdateOperator::MinusMinus
                    };
                    let argument = build_ast_from_expression(target_pair)?;
                    match argument.node_type {
                        NodeType::Identifier(_) | NodeType::MemberExpression { .. } => {}
                        _ => {
                            return Err(Error::new_from_span(
                                ErrorVariant::CustomError {
                                    message: "Invalid left-hand side expression in update operation"
                                        .to_string(),
                                },
                                pair.as_span(),
                            ))
                        }
                    }
                    Ok(new_node(
                        meta,
                        NodeType::UpdateExpression {
                            operator,
                            prefix,
                            argument,
                        },
                    ))
                }
                _ => Err(get_unexpected_error("update_expression", &pair)),
            }
        }
        Rule::call_expression => build_call_member_chain(pair),
        Rule::parenthesized_expression => {
            let inner = next_pair(&mut pair.clone().into_inner(), &pair, "parenthesized")?;
            build_ast_from_expression(inner)
        }
        Rule::function_expression => {
            let function = build_function_data(pair)?;
            Ok(new_node(meta, NodeType::FunctionExpression(Rc::new(function))))
        }
        Rule::identifier => Ok(new_node(
            meta,
            NodeType::Identifier(build_identifier_data(&pair)),
        )),
        Rule::null_literal => Ok(new_node(meta, NodeType::Literal(LiteralType::NullLiteral))),
        Rule::boolean_literal => Ok(new_node(
            meta,
            NodeType::Literal(LiteralType::BooleanLiteral(pair.as_str() == "true")),
        )),
        Rule::numeric_literal => {
            let value = parse_numeric_literal(&pair)?;
            Ok(new_node(
                meta,
                NodeType::Literal(LiteralType::NumberLiteral(value)),
            ))
        }
        Rule::string_literal => {
            let value = parse_string_literal(&pair)?;
            Ok(new_node(
                meta,
                NodeType::Literal(LiteralType::StringLiteral(value)),
            ))
        }
        Rule::array_literal => {
            let mut elements = vec![];
            for p in pair.into_inner() {
                elements.push(build_ast_from_expression(p)?);
            }
            Ok(new_node(meta, NodeType::ArrayExpression { elements }))
        }
        Rule::object_literal => {
            let mut properties = vec![];
            for property in pair.into_inner() {
                let property_meta = get_meta(&property);
                let mut inner = property.clone().into_inner();
                let key_pair = next_pair(&mut inner, &property, "property key")?;
                let key = match key_pair.as_rule() {
                    Rule::string_literal => parse_string_literal(&key_pair)?,
                    Rule::numeric_literal => {
                        crate::runner::ds::operations::type_conversion::number_to_string(
                            parse_numeric_literal(&key_pair)?,
                        )
                    }
                    _ => key_pair.as_str().to_string(),
                };
                let value =
                    build_ast_from_expression(next_pair(&mut inner, &property, "property value")?)?;
                properties.push(PropertyData {
                    meta: property_meta,
                    key,
                    value,
                });
            }
            Ok(new_node(meta, NodeType::ObjectExpression { properties }))
        }
        _ => Err(get_unexpected_error("expression", &pair)),
    }
}

/// Folds `a op b op c` into `((a op b) op c)`.
fn build_left_associative_chain(pair: Pair<Rule>) -> ParseResult<NodeRef> {
    let mut inner = pair.clone().into_inner();
    let mut left = build_ast_from_expression(next_pair(&mut inner, &pair, "chain head")?)?;
    while let Some(op_pair) = inner.next() {
        let right = build_ast_from_expression(next_pair(&mut inner, &pair, "chain operand")?)?;
        let meta = left.meta.cover(&right.meta);
        let node_type = match op_pair.as_str() {
            "||" => NodeType::LogicalExpression {
                operator: LogicalOperator::Or,
                left,
                right,
            },
            "&&" => NodeType::LogicalExpression {
                operator: LogicalOperator::And,
                left,
                right,
            },
            op => {
                let operator = match op {
                    "==" => BinaryOperator::LooselyEqual,
                    "!=" => BinaryOperator::LooselyUnequal,
                    "===" => BinaryOperator::StrictlyEqual,
                    "!==" => BinaryOperator::StrictlyUnequal,
                    "<" => BinaryOperator::LessThan,
                    "<=" => BinaryOperator::LessThanEqual,
                    ">" => BinaryOperator::GreaterThan,
                    ">=" => BinaryOperator::GreaterThanEqual,
                    "+" => BinaryOperator::Add,
                    "-" => BinaryOperator::Subtract,
                    "*" => BinaryOperator::Multiply,
                    "/" => BinaryOperator::Divide,
                    "%" => BinaryOperator::Modulo,
                    _ => return Err(get_unexpected_error("binary operator", &op_pair)),
                };
                NodeType::BinaryExpression {
                    operator,
                    left,
                    right,
                }
            }
        };
        left = new_node(meta, node_type);
    }
    Ok(left)
}

/// Folds `f(a).b[c]` into nested call / member nodes.
fn build_call_member_chain(pair: Pair<Rule>) -> ParseResult<NodeRef> {
    let start = pair.as_span().start();
    let mut inner = pair.clone().into_inner();
    let mut current = build_ast_from_expression(next_pair(&mut inner, &pair, "call head")?)?;
    for suffix in inner {
        let meta = Meta::new(start, suffix.as_span().end());
        let node_type = match suffix.as_rule() {
            Rule::call_arguments => {
                let mut arguments = vec![];
                for p in suffix.into_inner() {
                    arguments.push(build_ast_from_expression(p)?);
                }
                NodeType::CallExpression {
                    callee: current,
                    arguments,
                }
            }
            Rule::member_dot => {
                let name = next_pair(&mut suffix.clone().into_inner(), &suffix, "member name")?;
                NodeType::MemberExpression {
                    object: current,
                    property: MemberProperty::Named(build_identifier_data(&name)),
                }
            }
            Rule::member_index => {
                let index = next_pair(&mut suffix.clone().into_inner(), &suffix, "member index")?;
                NodeType::MemberExpression {
                    object: current,
                    property: MemberProperty::Computed(build_ast_from_expression(index)?),
                }
            }
            _ => return Err(get_unexpected_error("call suffix", &suffix)),
        };
        current = new_node(meta, node_type);
    }
    Ok(current)
}

fn parse_numeric_literal(pair: &Pair<Rule>) -> ParseResult<f64> {
    let text = pair.as_str();
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map(|v| v as f64).ok()
    } else {
        text.parse::<f64>().ok()
    };
    parsed.ok_or_else(|| {
        Error::new_from_span(
            ErrorVariant::CustomError {
                message: format!("Invalid numeric literal {}", text),
            },
            pair.as_span(),
        )
    })
}

fn parse_string_literal(pair: &Pair<Rule>) -> ParseResult<String> {
    let raw = match pair.clone().into_inner().next() {
        Some(inner) => inner.as_str(),
        None => "",
    };
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('b') => result.push('\u{0008}'),
            Some('f') => result.push('\u{000C}'),
            Some('v') => result.push('\u{000B}'),
            Some('0') => result.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        Error::new_from_span(
                            ErrorVariant::CustomError {
                                message: "Invalid Unicode escape sequence".to_string(),
                            },
                            pair.as_span(),
                        )
                    })?;
                result.push(decoded);
            }
            Some(other) => result.push(other),
            None => {}
        }
    }
    Ok(result)
}
