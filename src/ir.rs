//! Structural type model produced by the compiler.
//!
//! A closed set of node variants with no emission semantics of its own. The
//! `Display` impl is a neutral debug rendering (used by the CLI and fixtures);
//! turning nodes into concrete language syntax is left to the consumer.
use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Int,
    /// int ∪ float
    Number,
    Bool,
    Null,
    Any,
}

/// A single JSON scalar usable as a literal type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Int(i64),
    Float(OrderedFloat<f64>),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum TypeNode {
    Scalar(ScalarKind),
    Literal(LiteralValue),
    /// Encounter order, no de-duplication.
    Union(Vec<TypeNode>),
    List(Box<TypeNode>),
    /// Fixed length, positional.
    Tuple(Vec<TypeNode>),
    /// Untyped generic mapping keyed by string (`object` without `properties`).
    Mapping(Box<TypeNode>),
    Record(RecordType),
    /// "Compiled to nothing": the enclosing container skips this member.
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordType {
    /// Synthesized from the outer name plus the property path to this record.
    pub name: String,
    /// Only the root record is named for emission; nested records are structural.
    pub outer: bool,
    /// Schema `properties` encounter order.
    pub fields: IndexMap<String, Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub ty: TypeNode,
    pub required: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTORS
// ————————————————————————————————————————————————————————————————————————————

impl LiteralValue {
    /// `None` for arrays and objects, which have no literal form in this model.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else {
                    n.as_f64().map(|f| Self::Float(OrderedFloat(f)))
                }
            }
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::String(_) => ScalarKind::String,
            Self::Int(_) => ScalarKind::Int,
            Self::Float(_) => ScalarKind::Number,
            Self::Bool(_) => ScalarKind::Bool,
            Self::Null => ScalarKind::Null,
        }
    }
}

impl TypeNode {
    pub fn any() -> Self { Self::Scalar(ScalarKind::Any) }
    pub fn string() -> Self { Self::Scalar(ScalarKind::String) }
    pub fn int() -> Self { Self::Scalar(ScalarKind::Int) }
    pub fn number() -> Self { Self::Scalar(ScalarKind::Number) }
    pub fn bool() -> Self { Self::Scalar(ScalarKind::Bool) }
    pub fn null() -> Self { Self::Scalar(ScalarKind::Null) }

    pub fn list(element: TypeNode) -> Self { Self::List(Box::new(element)) }

    pub fn any_mapping() -> Self { Self::Mapping(Box::new(Self::any())) }

    pub fn literal(value: LiteralValue) -> Self { Self::Literal(value) }

    pub fn is_nothing(&self) -> bool { matches!(self, Self::Nothing) }

    pub fn as_record(&self) -> Option<&RecordType> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Element positions cannot be skipped, so "nothing" widens to `any` there.
    pub(crate) fn or_any(self) -> Self {
        if self.is_nothing() { Self::any() } else { self }
    }
}

impl RecordType {
    pub fn empty(name: impl Into<String>, outer: bool) -> Self {
        Self { name: name.into(), outer, fields: IndexMap::new() }
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|(_, f)| f.required).map(|(k, _)| k.as_str())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

static PLAIN_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex")
});

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Null => "null",
            Self::Any => "any",
        };
        f.write_str(s)
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", Value::String(s.clone())),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, head: &str, items: &[TypeNode]) -> fmt::Result {
    write!(f, "{head}[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 { f.write_str(", ")?; }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Literal(value) => write!(f, "literal[{value}]"),
            Self::Union(members) => write_list(f, "union", members),
            Self::List(element) => write!(f, "list[{element}]"),
            Self::Tuple(elements) => write_list(f, "tuple", elements),
            Self::Mapping(value) => write!(f, "map[string, {value}]"),
            Self::Record(record) => write!(f, "{record}"),
            Self::Nothing => f.write_str("nothing"),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.outer {
            f.write_str(&self.name)?;
        }
        f.write_str("{")?;
        for (i, (key, field)) in self.fields.iter().enumerate() {
            if i > 0 { f.write_str(", ")?; }
            if PLAIN_KEY.is_match(key) {
                f.write_str(key)?;
            } else {
                write!(f, "{}", Value::String(key.clone()))?;
            }
            let marker = if field.required { "" } else { "?" };
            write!(f, "{marker}: {}", field.ty)?;
        }
        f.write_str("}")
    }
}
