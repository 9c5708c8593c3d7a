use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::parser::ast::{AssignmentOperator, MemberProperty, Node, NodeType};
use crate::parser::JsParser;
use crate::transform::VALUES_BINDING;

/// The external variable(s) a local name stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Single(String),
    Multi(Vec<String>),
}

impl Linkage {
    fn from_ids(mut ids: Vec<String>) -> Option<Linkage> {
        match ids.len() {
            0 => None,
            1 => ids.pop().map(Linkage::Single),
            _ => Some(Linkage::Multi(ids)),
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        match self {
            Linkage::Single(id) => vec![id.as_str()],
            Linkage::Multi(ids) => ids.iter().map(|s| s.as_str()).collect(),
        }
    }

    pub fn single(&self) -> Option<&str> {
        match self {
            Linkage::Single(id) => Some(id),
            Linkage::Multi(_) => None,
        }
    }
}

pub type LinkageMap = BTreeMap<String, Linkage>;

/// What the analyzer knows about the external variables.
#[derive(Debug, Clone, Default)]
pub struct KnownVariables {
    pub values: Map<String, Value>,
    /// Member variable id → parent array variable id.
    pub members: BTreeMap<String, String>,
}

impl KnownVariables {
    pub fn new(values: Map<String, Value>, members: BTreeMap<String, String>) -> Self {
        KnownVariables { values, members }
    }

    fn is_array(&self, id: &str) -> bool {
        matches!(self.values.get(id), Some(Value::Array(_)))
    }

    fn member_of(&self, parent: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, p)| p.as_str() == parent)
            .map(|(member, _)| member.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkageAnalysis {
    pub linkage: LinkageMap,
    /// Local name → external array variable it aliases.
    pub array_aliases: BTreeMap<String, String>,
}

enum Reference {
    Local(String),
    External(String),
}

enum Source {
    Direct(String),
    /// `alias[i]`; read as an expression when `alias` turns out not to be an
    /// array alias.
    ArrayIndexOfAlias(String, Vec<Reference>),
    ArrayIndexOfExternal(String),
    Expression(Vec<Reference>),
}

/// Infers the linkage of the locals in `program_text`. Never fails: an
/// unparsable program yields an empty analysis.
pub fn analyze(program_text: &str, known: &KnownVariables) -> LinkageAnalysis {
    let program = match JsParser::parse_to_ast_from_str(program_text) {
        Ok(program) => program,
        Err(e) => {
            warn!("linkage analysis skipped, program does not parse: {}", e);
            return LinkageAnalysis::default();
        }
    };

    let mut assignments: Vec<(String, Source)> = vec![];
    program.walk(&mut |node: &Node| match &node.node_type {
        NodeType::VariableDeclarator {
            id,
            init: Some(init),
        } => assignments.push((id.name.clone(), classify(init))),
        NodeType::AssignmentExpression {
            operator,
            left,
            right,
        } => {
            if let Some(name) = left.as_identifier() {
                let source = if *operator == AssignmentOperator::Equals {
                    classify(right)
                } else {
                    Source::Expression(references(right))
                };
                assignments.push((name.to_string(), source));
            }
        }
        _ => {}
    });

    let mut analysis = LinkageAnalysis::default();
    for (name, source) in &assignments {
        if let Source::Direct(id) = source {
            if known.is_array(id) {
                analysis.array_aliases.insert(name.clone(), id.clone());
            }
            analysis
                .linkage
                .insert(name.clone(), Linkage::Single(id.clone()));
        }
    }

    for (name, source) in &assignments {
        let parent = match source {
            Source::ArrayIndexOfAlias(alias, _) => match analysis.array_aliases.get(alias) {
                Some(parent) => parent.clone(),
                None => continue,
            },
            Source::ArrayIndexOfExternal(id) => id.clone(),
            _ => continue,
        };
        if analysis.linkage.contains_key(name) {
            continue;
        }
        if let Some(member) = known.member_of(&parent) {
            analysis
                .linkage
                .insert(name.clone(), Linkage::Single(member.to_string()));
        } else if known.is_array(&parent) {
            analysis.linkage.insert(name.clone(), Linkage::Single(parent));
        }
    }

    let direct: Vec<&String> = assignments
        .iter()
        .filter(|(_, s)| matches!(s, Source::Direct(_)))
        .map(|(n, _)| n)
        .collect();
    for (name, source) in &assignments {
        let refs: Vec<&Reference> = match source {
            Source::Expression(refs) => refs.iter().collect(),
            Source::ArrayIndexOfAlias(alias, refs) if !analysis.array_aliases.contains_key(alias) => {
                refs.iter().collect()
            }
            _ => continue,
        };
        if direct.contains(&name) {
            continue;
        }
        let mut ids: Vec<String> = analysis
            .linkage
            .get(name)
            .map(|l| l.ids().into_iter().map(String::from).collect())
            .unwrap_or_default();
        for reference in refs {
            let resolved: Vec<String> = match reference {
                Reference::External(id) => vec![id.clone()],
                Reference::Local(local) => match analysis.linkage.get(local) {
                    Some(l) => l.ids().into_iter().map(String::from).collect(),
                    None if known.values.contains_key(local) => vec![local.clone()],
                    None => vec![],
                },
            };
            for id in resolved {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        if let Some(linkage) = Linkage::from_ids(ids) {
            analysis.linkage.insert(name.clone(), linkage);
        }
    }

    debug!(
        "linkage analysis found {} link(s) and {} array alias(es)",
        analysis.linkage.len(),
        analysis.array_aliases.len()
    );
    analysis
}

/// Author-declared entries replace inferred ones of the same name.
pub fn merge(auto: &LinkageMap, declared: &LinkageMap) -> LinkageMap {
    let mut merged = auto.clone();
    for (name, linkage) in declared {
        merged.insert(name.clone(), linkage.clone());
    }
    merged
}

/// `vars.X` or `vars["X"]`.
fn external_member(node: &Node) -> Option<String> {
    match &node.node_type {
        NodeType::MemberExpression { object, property } => {
            if object.as_identifier() != Some(VALUES_BINDING) {
                return None;
            }
            match property {
                MemberProperty::Named(name) => Some(name.name.clone()),
                MemberProperty::Computed(key) => key.as_string_literal().map(String::from),
            }
        }
        _ => None,
    }
}

fn classify(node: &Node) -> Source {
    if let Some(id) = external_member(node) {
        return Source::Direct(id);
    }
    if let NodeType::MemberExpression {
        object,
        property: MemberProperty::Computed(_),
    } = &node.node_type
    {
        if let Some(id) = external_member(object) {
            return Source::ArrayIndexOfExternal(id);
        }
        if let Some(alias) = object.as_identifier() {
            return Source::ArrayIndexOfAlias(alias.to_string(), references(node));
        }
    }
    Source::Expression(references(node))
}

fn references(node: &Node) -> Vec<Reference> {
    let mut refs = vec![];
    collect_references(node, &mut refs);
    refs
}

fn collect_references(node: &Node, refs: &mut Vec<Reference>) {
    if let Some(id) = external_member(node) {
        refs.push(Reference::External(id));
        return;
    }
    match &node.node_type {
        NodeType::Identifier(id) if id.name != VALUES_BINDING => {
            refs.push(Reference::Local(id.name.clone()))
        }
        _ => {
            for child in node.children() {
                collect_references(child, refs);
            }
        }
    }
}
