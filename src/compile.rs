//! Schema → type model compiler.
//!
//! Walks a schema recursively. A node's `type` selects a handler from the
//! draft's [`RuleSet`]; untyped nodes dispatch on the structural keywords
//! `$ref`, `allOf`, `anyOf`, `oneOf`, `enum`, `default` in that order.
//! Approximations are reported through [`Diagnostics`], never as errors.
pub mod array;
pub mod combinator;
pub mod object;
pub mod scalar;

use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::draft::{Draft, RuleSet, SchemaTypeKind};
use crate::error::{Error, Result};
use crate::ir::TypeNode;
use crate::scope::{escape_token, Resolver};

pub const DEFAULT_OUTER_NAME: &str = "JSONSchema";
pub const DEFAULT_MAX_REF_DEPTH: usize = 32;

/// Per-compile settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Overrides the name synthesized from the schema `title`.
    pub name: Option<String>,
    /// Overrides `$schema` detection.
    pub draft: Option<Draft>,
    /// How many `$ref`s may be followed inside one another.
    pub max_ref_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { name: None, draft: None, max_ref_depth: DEFAULT_MAX_REF_DEPTH }
    }
}

/// `"complicated-json schema"` → `"ComplicatedJsonSchema"`.
///
/// Dashes count as spaces; each word is capitalised with the rest of it
/// lowercased (a word starts after any non-letter), then spaces are dropped.
pub fn sanitize_name(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_word = false;
    for ch in title.chars() {
        let ch = if ch == '-' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            in_word = false;
            if ch != ' ' {
                out.push(ch);
            }
        }
    }
    out
}

/// Sanitized `title`, or [`DEFAULT_OUTER_NAME`] as-is.
pub fn outer_name_for(schema: &Value) -> String {
    match schema.get("title").and_then(Value::as_str) {
        Some(title) => sanitize_name(title),
        None => DEFAULT_OUTER_NAME.to_string(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LOCATION
// ————————————————————————————————————————————————————————————————————————————

/// Where in which document the compiler currently is.
#[derive(Debug, Clone)]
struct Location {
    base: String,
    tokens: Vec<String>,
}

impl Location {
    fn at(url: &Url) -> Self {
        let mut base = url.clone();
        base.set_fragment(None);
        let pointer = url.fragment().filter(|f| f.starts_with('/')).unwrap_or("");
        Self::in_document(&base, pointer)
    }

    fn in_document(document: &Url, pointer: &str) -> Self {
        let tokens = match pointer.strip_prefix('/') {
            Some(pointer) => pointer.split('/').map(|t| t.replace("~1", "/").replace("~0", "~")).collect(),
            None => Vec::new(),
        };
        Self { base: document.to_string(), tokens }
    }

    fn render(&self) -> String {
        let mut out = self.base.clone();
        out.push('#');
        for token in &self.tokens {
            out.push('/');
            out.push_str(&escape_token(token));
        }
        out
    }
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILER
// ————————————————————————————————————————————————————————————————————————————

pub struct Compiler<'r> {
    rules: RuleSet,
    resolver: Resolver<'r>,
    outer_name: String,
    max_ref_depth: usize,
    /// Absolute URLs of the `$ref`s currently being expanded.
    active_refs: Vec<String>,
    /// Property names from the root to the node being compiled.
    names: Vec<String>,
    location: Location,
    diagnostics: Diagnostics,
}

impl<'r> Compiler<'r> {
    pub fn new(resolver: Resolver<'r>, rules: RuleSet, outer_name: impl Into<String>) -> Self {
        let location = Location::at(resolver.resolution_scope());
        Self {
            rules,
            resolver,
            outer_name: outer_name.into(),
            max_ref_depth: DEFAULT_MAX_REF_DEPTH,
            active_refs: Vec::new(),
            names: Vec::new(),
            location,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn with_max_ref_depth(mut self, depth: usize) -> Self {
        self.max_ref_depth = depth;
        self
    }

    pub fn draft(&self) -> Draft { self.rules.draft() }

    pub fn outer_name(&self) -> &str { &self.outer_name }

    pub fn diagnostics(&self) -> &Diagnostics { &self.diagnostics }

    pub fn into_diagnostics(self) -> Diagnostics { self.diagnostics }

    /// Compile `schema` into a type node. `outer` marks the root position,
    /// whose record receives the outer name.
    ///
    /// Any scope pushed for the node's `$id` is popped before this returns,
    /// on every path.
    pub fn compile(&mut self, schema: &Value, outer: bool) -> Result<TypeNode> {
        let map = match schema {
            Value::Object(map) => map,
            Value::Bool(true) => return Ok(TypeNode::any()),
            Value::Bool(false) => {
                return Err(Error::unsupported(self.location(), "the `false` schema admits no value"));
            }
            other => {
                return Err(Error::malformed(
                    self.location(),
                    format!("expected an object or boolean schema, found {}", json_kind(other)),
                ));
            }
        };

        let Some(scope) = self.rules.id_of(map) else {
            return self.compile_map(map, outer);
        };
        self.resolver
            .push_scope(scope)
            .map_err(|e| Error::malformed(self.location(), format!("bad identifier {scope:?}: {e}")))?;
        let result = self.compile_map(map, outer);
        self.resolver.pop_scope();
        result
    }

    fn compile_map(&mut self, schema: &Map<String, Value>, outer: bool) -> Result<TypeNode> {
        match schema.get("type") {
            Some(Value::String(name)) => self.dispatch(schema, name, outer),
            Some(Value::Array(names)) => {
                let names = names
                    .iter()
                    .map(|n| n.as_str().ok_or_else(|| self.malformed("`type` entries must be strings")))
                    .collect::<Result<Vec<_>>>()?;
                // the root-only rules hold for the document root itself, not for `$ref` targets
                if outer && self.active_refs.is_empty() {
                    if !names.contains(&"object") {
                        return Err(Error::UnsupportedRootType {
                            types: names.iter().map(|n| n.to_string()).collect(),
                            location: self.location(),
                        });
                    }
                    self.warn(
                        DiagnosticKind::RootTypeFallback,
                        format!("root type {names:?} is out of scope, falling back to `object`"),
                    );
                    return self.dispatch(schema, "object", outer);
                }
                let members = names
                    .iter()
                    .map(|name| self.dispatch(schema, name, outer))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TypeNode::Union(members))
            }
            Some(other) => Err(self.malformed(format!(
                "`type` must be a string or an array, found {}",
                json_kind(other)
            ))),
            None => self.compile_structural(schema, outer),
        }
    }

    /// Untyped nodes; first matching keyword wins.
    fn compile_structural(&mut self, schema: &Map<String, Value>, outer: bool) -> Result<TypeNode> {
        if let Some(reference) = schema.get("$ref") {
            let reference = reference.as_str().ok_or_else(|| self.malformed("`$ref` must be a string"))?;
            return combinator::reference(self, reference, outer);
        }
        if let Some(branches) = schema.get("allOf") {
            return combinator::all_of(self, branches);
        }
        if let Some(branches) = schema.get("anyOf") {
            return combinator::any_of(self, "anyOf", branches);
        }
        if let Some(branches) = schema.get("oneOf") {
            self.warn(
                DiagnosticKind::OneOfAsAnyOf,
                "`oneOf` has no exact counterpart, treating it as `anyOf`",
            );
            return combinator::any_of(self, "oneOf", branches);
        }
        if let Some(values) = schema.get("enum") {
            return combinator::enumeration(self, values);
        }
        if schema.contains_key("default") {
            return Ok(combinator::default(self));
        }
        self.warn(DiagnosticKind::UntypedSchema, "schema has no `type` or structural keyword, using `any`");
        Ok(TypeNode::any())
    }

    /// `enum` beats the `type` handler even when the two disagree.
    fn dispatch(&mut self, schema: &Map<String, Value>, type_name: &str, outer: bool) -> Result<TypeNode> {
        if let Some(values) = schema.get("enum") {
            return combinator::enumeration(self, values);
        }
        let handler = SchemaTypeKind::parse(type_name).and_then(|kind| self.rules.handler(kind));
        match handler {
            Some(handler) => handler(self, schema, outer),
            None => {
                self.warn(
                    DiagnosticKind::UnknownType,
                    format!("no handler for type `{type_name}`, using `any`"),
                );
                Ok(TypeNode::any())
            }
        }
    }

    /// Follow `reference` and compile its target inside the target's scope.
    pub(crate) fn follow_ref(&mut self, reference: &str, outer: bool) -> Result<TypeNode> {
        if self.active_refs.len() >= self.max_ref_depth {
            return Err(Error::RefCycle {
                reference: reference.to_string(),
                location: self.location(),
                depth: self.active_refs.len(),
            });
        }
        let (url, target) = self.resolver.resolve(reference)?;
        let key = url.to_string();
        if self.active_refs.contains(&key) {
            return Err(Error::RefCycle {
                reference: reference.to_string(),
                location: self.location(),
                depth: self.active_refs.len(),
            });
        }
        log::trace!("{}: $ref {reference} -> {key}", self.location());

        // anchors are reported by their JSON pointer so later tokens extend it
        let location = match self.resolver.locate_anchor(&url) {
            Some((document, pointer)) => Location::in_document(document, pointer),
            None => Location::at(&url),
        };
        let saved = std::mem::replace(&mut self.location, location);
        self.active_refs.push(key);
        self.resolver.push_resolved(url);
        let result = self.compile(target, outer);
        self.resolver.pop_scope();
        self.active_refs.pop();
        self.location = saved;
        result
    }

    // ---- traversal helpers ------------------------------------------------

    pub(crate) fn descend<T>(&mut self, tokens: &[&str], f: impl FnOnce(&mut Self) -> T) -> T {
        let mark = self.location.tokens.len();
        self.location.tokens.extend(tokens.iter().map(|t| t.to_string()));
        let out = f(self);
        self.location.tokens.truncate(mark);
        out
    }

    /// Like [`descend`](Self::descend), also extending the record-name path.
    pub(crate) fn descend_property<T>(&mut self, key: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.names.push(key.to_string());
        let out = self.descend(&["properties", key], f);
        self.names.pop();
        out
    }

    /// Outer name followed by each property on the path, e.g. `FooSchemaAwesomeNested`.
    pub(crate) fn record_name(&self) -> String {
        let mut name = self.outer_name.clone();
        for segment in &self.names {
            name.push_str(&sanitize_name(segment));
        }
        name
    }

    pub(crate) fn location(&self) -> String { self.location.render() }

    pub(crate) fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let location = self.location();
        self.diagnostics.warn(kind, location, message);
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.location(), reason)
    }

    pub(crate) fn unsupported(&self, reason: impl Into<String>) -> Error {
        Error::unsupported(self.location(), reason)
    }

    #[cfg(test)]
    pub(crate) fn scope_depth(&self) -> usize { self.resolver.depth() }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ir::{LiteralValue, ScalarKind};
    use crate::scope::{Registry, DEFAULT_BASE_URI};
    use serde_json::json;

    /// Compile `schema` as a standalone document.
    pub(crate) fn compile_with(schema: Value, outer: bool) -> (Result<TypeNode>, Diagnostics, usize) {
        let base = Url::parse(DEFAULT_BASE_URI).unwrap();
        let mut registry = Registry::new();
        registry.insert(&base, schema.clone());
        let rules = RuleSet::for_draft(Draft::detect_in(&schema));
        let mut compiler = Compiler::new(Resolver::new(&registry, base), rules, outer_name_for(&schema));
        let result = compiler.compile(&schema, outer);
        let depth = compiler.scope_depth();
        (result, compiler.into_diagnostics(), depth)
    }

    pub(crate) fn compile_ok(schema: Value) -> TypeNode {
        compile_with(schema, true).0.unwrap()
    }

    #[test]
    fn sanitizes_titles_like_title_case() {
        assert_eq!(sanitize_name("Foo Schema"), "FooSchema");
        assert_eq!(sanitize_name("complicated-json"), "ComplicatedJson");
        assert_eq!(sanitize_name("FooSchema"), "Fooschema");
        assert_eq!(sanitize_name("Array of objects"), "ArrayOfObjects");
        assert_eq!(sanitize_name("v2 thing_x"), "V2Thing_X");
        assert_eq!(outer_name_for(&json!({})), "JSONSchema");
        assert_eq!(outer_name_for(&json!({"title": "Nested Foo Schema awesome"})), "NestedFooSchemaAwesome");
    }

    #[test]
    fn enum_wins_over_type() {
        let ty = compile_ok(json!({"type": "string", "enum": [1, 2, 3]}));
        assert_eq!(ty, TypeNode::Union(vec![
            TypeNode::Literal(LiteralValue::Int(1)),
            TypeNode::Literal(LiteralValue::Int(2)),
            TypeNode::Literal(LiteralValue::Int(3)),
        ]));
    }

    #[test]
    fn type_arrays_become_unions_below_the_root() {
        let ty = compile_ok(json!({
            "type": "object",
            "properties": {"x": {"type": ["string", "null"]}}
        }));
        let record = ty.as_record().unwrap();
        assert_eq!(record.fields["x"].ty, TypeNode::Union(vec![TypeNode::string(), TypeNode::null()]));
    }

    #[test]
    fn root_type_array_without_object_is_rejected() {
        let (result, _, _) = compile_with(json!({"type": ["string", "null"]}), true);
        assert!(matches!(result, Err(Error::UnsupportedRootType { .. })));
    }

    #[test]
    fn root_type_array_with_object_falls_back() {
        let props = json!({"a": {"type": "string"}});
        let (fallback, diagnostics, _) =
            compile_with(json!({"type": ["object", "string"], "properties": props.clone()}), true);
        let plain = compile_ok(json!({"type": "object", "properties": props}));
        assert_eq!(fallback.unwrap(), plain);
        assert!(diagnostics.has(DiagnosticKind::RootTypeFallback));
    }

    #[test]
    fn unknown_types_warn_and_become_any() {
        let (result, diagnostics, _) = compile_with(json!({"type": "datetime"}), false);
        assert_eq!(result.unwrap(), TypeNode::any());
        assert!(diagnostics.has(DiagnosticKind::UnknownType));
    }

    #[test]
    fn untyped_schemas_become_any() {
        let (result, diagnostics, _) = compile_with(json!({"description": "anything"}), false);
        assert_eq!(result.unwrap(), TypeNode::Scalar(ScalarKind::Any));
        assert!(diagnostics.has(DiagnosticKind::UntypedSchema));
    }

    #[test]
    fn boolean_schemas() {
        assert_eq!(compile_with(json!(true), false).0.unwrap(), TypeNode::any());
        assert!(matches!(compile_with(json!(false), false).0, Err(Error::UnsupportedSchema { .. })));
        assert!(matches!(compile_with(json!(3), false).0, Err(Error::MalformedSchema { .. })));
    }

    #[test]
    fn scopes_are_balanced_on_every_path() {
        let schema = json!({
            "$id": "http://example.com/root.json",
            "type": "object",
            "properties": {
                "a": {"$id": "a.json", "$ref": "#/definitions/x"},
                "b": {"$id": "b.json", "type": ["string", "null"]},
                "c": {"$id": "c.json", "anyOf": [{"type": "string"}]},
                "d": {"$id": "d.json", "enum": ["x"]}
            },
            "definitions": {"x": {"type": "integer"}}
        });
        // `a.json` has no definitions, so its $ref fails; the stack must still unwind
        let (result, _, depth) = compile_with(schema, true);
        assert!(matches!(result, Err(Error::RefResolution { .. })));
        assert_eq!(depth, 0);
    }

    #[test]
    fn scopes_are_balanced_after_success() {
        let schema = json!({
            "$id": "http://example.com/root.json",
            "type": "object",
            "properties": {
                "a": {"$ref": "#/definitions/x"},
                "b": {"$id": "b.json", "type": ["string", "null"]}
            },
            "definitions": {"x": {"$id": "x.json", "type": "integer"}}
        });
        let (result, _, depth) = compile_with(schema, true);
        assert!(result.is_ok());
        assert_eq!(depth, 0);
    }

    #[test]
    fn locations_point_into_the_schema() {
        let (_, diagnostics, _) = compile_with(json!({
            "type": "object",
            "properties": {"a/b": {"type": "array", "items": {"type": "mystery"}}}
        }), true);
        let d = diagnostics.iter().next().unwrap();
        assert_eq!(d.location, "file:///schema.json#/properties/a~1b/items");
    }

    #[test]
    fn locations_through_anchors_are_json_pointers() {
        let (result, diagnostics, _) = compile_with(json!({
            "type": "object",
            "properties": {"a": {"$ref": "#thing"}},
            "definitions": {
                "thing": {"$id": "#thing", "type": "object", "properties": {"x": {"type": "mystery"}}}
            }
        }), true);
        assert!(result.is_ok());
        let d = diagnostics.iter().next().unwrap();
        assert_eq!(d.location, "file:///schema.json#/definitions/thing/properties/x");
    }
}
