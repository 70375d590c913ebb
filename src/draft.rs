//! Draft dispatch.
//!
//! Each draft is a base rule table plus a short chain of per-draft overrides,
//! flattened once into a [`RuleSet`] when a compile starts.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compile::{array, object, scalar, Compiler};
use crate::error::Result;
use crate::ir::TypeNode;

static DRAFT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"draft-\d+").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Draft {
    #[serde(rename = "draft-04")]
    Draft4,
    #[serde(rename = "draft-06")]
    Draft6,
    #[serde(rename = "draft-07")]
    Draft7,
}

impl Draft {
    pub const LATEST: Draft = Draft::Draft7;

    /// Pick the rule-set for a `$schema` value. The first `draft-NN` token
    /// decides; absent, unmatched or unknown drafts get [`Draft::LATEST`].
    pub fn detect(schema_uri: Option<&str>) -> Draft {
        schema_uri
            .and_then(|uri| DRAFT_TOKEN.find(uri))
            .and_then(|token| Self::from_token(token.as_str()))
            .unwrap_or(Self::LATEST)
    }

    pub fn detect_in(schema: &Value) -> Draft {
        Self::detect(schema.get("$schema").and_then(Value::as_str))
    }

    fn from_token(token: &str) -> Option<Draft> {
        match token {
            "draft-04" => Some(Draft::Draft4),
            "draft-06" => Some(Draft::Draft6),
            "draft-07" => Some(Draft::Draft7),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Draft::Draft4 => "draft-04",
            Draft::Draft6 => "draft-06",
            Draft::Draft7 => "draft-07",
        }
    }

    /// Override tables from the oldest draft up to and including `self`.
    fn override_chain(&self) -> &'static [RuleTable] {
        const DRAFT4_CHAIN: &[RuleTable] = &[];
        const DRAFT6_CHAIN: &[RuleTable] = &[DRAFT6_OVERRIDES];
        const DRAFT7_CHAIN: &[RuleTable] = &[DRAFT6_OVERRIDES, DRAFT7_OVERRIDES];
        match self {
            Draft::Draft4 => DRAFT4_CHAIN,
            Draft::Draft6 => DRAFT6_CHAIN,
            Draft::Draft7 => DRAFT7_CHAIN,
        }
    }
}

impl fmt::Display for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Draft {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| format!("unknown draft {s:?}, expected draft-04, draft-06 or draft-07"))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE KINDS & HANDLERS
// ————————————————————————————————————————————————————————————————————————————

/// The primitive `type` strings the compiler has a handler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaTypeKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    /// draft-03 `"any"`
    Any,
}

impl SchemaTypeKind {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "object" => Self::Object,
            "array" => Self::Array,
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            "any" => Self::Any,
            _ => return None,
        })
    }
}

/// `(compiler, schema, outer) -> type`
pub type Handler = fn(&mut Compiler<'_>, &Map<String, Value>, bool) -> Result<TypeNode>;

type RuleTable = &'static [(SchemaTypeKind, Handler)];

const BASE_RULES: RuleTable = &[
    (SchemaTypeKind::Object, object::object as Handler),
    (SchemaTypeKind::Array, array::array as Handler),
    (SchemaTypeKind::String, scalar::string as Handler),
    (SchemaTypeKind::Number, scalar::number as Handler),
    (SchemaTypeKind::Integer, scalar::integer as Handler),
    (SchemaTypeKind::Boolean, scalar::boolean as Handler),
    (SchemaTypeKind::Null, scalar::null as Handler),
    (SchemaTypeKind::Any, scalar::any as Handler),
];

const DRAFT6_OVERRIDES: RuleTable = &[
    (SchemaTypeKind::Integer, scalar::integer_or_number as Handler),
];

const DRAFT7_OVERRIDES: RuleTable = &[];

/// Flat handler table for one draft.
#[derive(Clone)]
pub struct RuleSet {
    draft: Draft,
    handlers: HashMap<SchemaTypeKind, Handler>,
}

impl RuleSet {
    pub fn for_draft(draft: Draft) -> Self {
        let mut handlers: HashMap<SchemaTypeKind, Handler> = BASE_RULES.iter().copied().collect();
        for table in draft.override_chain() {
            handlers.extend(table.iter().copied());
        }
        log::debug!("rule-set {draft}: {} handlers", handlers.len());
        Self { draft, handlers }
    }

    pub fn draft(&self) -> Draft { self.draft }

    pub fn handler(&self, kind: SchemaTypeKind) -> Option<Handler> {
        self.handlers.get(&kind).copied()
    }

    /// The identifying URI of a schema node, if any. draft-04 still accepts
    /// the legacy `id` keyword.
    pub fn id_of<'v>(&self, schema: &'v Map<String, Value>) -> Option<&'v str> {
        if let Some(id) = schema.get("$id").and_then(Value::as_str) {
            return Some(id);
        }
        match self.draft {
            Draft::Draft4 => schema.get("id").and_then(Value::as_str),
            _ => None,
        }
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet").field("draft", &self.draft).finish_non_exhaustive()
    }
}
