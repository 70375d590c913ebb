//! Compile JSON Schema documents into a structural type model.
//!
//! ```no_run
//! use jsonschema_typed::{compile, CompileOptions, SchemaDocument};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "title": "Foo Schema",
//!     "type": "object",
//!     "properties": {"awesome": {"type": "integer"}},
//!     "required": ["awesome"]
//! });
//! let out = compile(SchemaDocument::anonymous(schema), &[] as &[&str], &CompileOptions::default())?;
//! assert_eq!(out.root.to_string(), "FooSchema{awesome: union[int, number]}");
//! # Ok::<(), jsonschema_typed::Error>(())
//! ```
pub mod compile;
pub mod diagnostics;
pub mod draft;
pub mod error;
pub mod ir;
pub mod optionalize;
pub mod scope;
pub mod source;
pub mod subschema;
pub mod vars;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use url::Url;

pub use compile::{outer_name_for, sanitize_name, CompileOptions, Compiler};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use draft::{Draft, RuleSet};
pub use error::{Error, Result};
pub use ir::{Field, LiteralValue, RecordType, ScalarKind, TypeNode};
pub use optionalize::optionalize;
pub use scope::{Registry, Resolver, DEFAULT_BASE_URI};
pub use subschema::narrow;
pub use vars::Namespace;

static DEFAULT_BASE: Lazy<Url> = Lazy::new(|| Url::parse(DEFAULT_BASE_URI).expect("static url"));

/// A parsed schema and the absolute URI it was loaded from.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub uri: Url,
    pub schema: Value,
}

impl SchemaDocument {
    pub fn new(uri: Url, schema: Value) -> Self {
        Self { uri, schema }
    }

    /// A document with no location of its own, placed at [`DEFAULT_BASE_URI`].
    pub fn anonymous(schema: Value) -> Self {
        let uri = schema
            .get("$id")
            .and_then(Value::as_str)
            .and_then(|id| Url::parse(id).ok())
            .unwrap_or_else(|| DEFAULT_BASE.clone());
        Self::new(uri, schema)
    }
}

/// Result of compiling one document, or one narrowed part of it.
#[derive(Debug, Clone, Serialize)]
pub struct Compilation {
    pub uri: String,
    pub path: Vec<String>,
    /// Outer name given to the root record.
    pub name: String,
    pub draft: Draft,
    pub root: TypeNode,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    /// Make every root field optional. A non-record root is kept and reported.
    pub fn optionalize(mut self) -> Self {
        let mut diagnostics = Diagnostics::new();
        let location = format!("{}#", self.uri);
        self.root = optionalize::optionalize_with(self.root, &mut diagnostics, &location);
        self.diagnostics.extend(diagnostics.into_vec());
        self
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SESSION
// ————————————————————————————————————————————————————————————————————————————

/// Loaded documents that `$ref`s may point into. A session is read-only
/// while compiling, so one session can serve many compiles in parallel.
#[derive(Debug, Default)]
pub struct Session {
    registry: Registry,
}

impl Session {
    pub fn new() -> Self { Self::default() }

    /// Register a document; returns the URI to compile it by.
    pub fn add_document(&mut self, document: SchemaDocument) -> Url {
        self.registry.insert(&document.uri, document.schema);
        document.uri
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.registry.contains(document_key(uri).as_str())
    }

    /// Compile the document at `uri`, first narrowed to `path` if not empty.
    pub fn compile<S: AsRef<str>>(&self, uri: &Url, path: &[S], options: &CompileOptions) -> Result<Compilation> {
        let base = document_key(uri);
        let original = self.registry.get(base.as_str()).ok_or_else(|| Error::RefResolution {
            reference: uri.to_string(),
            scope: base.to_string(),
            reason: "no document is registered under this URI".to_string(),
        })?;
        let schema = if path.is_empty() { original.clone() } else { narrow(original, path)? };

        let draft = options.draft.unwrap_or_else(|| Draft::detect_in(&schema));
        let rules = RuleSet::for_draft(draft);
        let name = options.name.clone().unwrap_or_else(|| outer_name_for(&schema));
        let mut resolver = Resolver::new(&self.registry, base.clone());

        // a narrowed `$id` carries the path; lookups through it belong to the original document
        if !path.is_empty() {
            let narrowed_id = schema.as_object().and_then(|map| rules.id_of(map));
            let original_id = original.as_object().and_then(|map| rules.id_of(map));
            if let Some(narrowed_id) = narrowed_id {
                let narrowed_scope = base.join(narrowed_id);
                let original_scope = match original_id {
                    Some(id) => base.join(id),
                    None => Ok(base.clone()),
                };
                if let (Ok(narrowed_scope), Ok(original_scope)) = (narrowed_scope, original_scope) {
                    resolver.alias(&narrowed_scope, &original_scope);
                }
            }
        }

        log::info!("compiling {uri} {:?} as {name} ({draft})", path.iter().map(|s| s.as_ref()).collect::<Vec<&str>>());
        let mut compiler = Compiler::new(resolver, rules, name.clone()).with_max_ref_depth(options.max_ref_depth);
        let root = compiler.compile(&schema, true)?;
        Ok(Compilation {
            uri: uri.to_string(),
            path: path.iter().map(|s| s.as_ref().to_string()).collect(),
            name,
            draft,
            root,
            diagnostics: compiler.into_diagnostics().into_vec(),
        })
    }
}

fn document_key(uri: &Url) -> Url {
    let mut key = uri.clone();
    key.set_fragment(None);
    key
}

/// Compile a single standalone document.
pub fn compile<S: AsRef<str>>(document: SchemaDocument, path: &[S], options: &CompileOptions) -> Result<Compilation> {
    let mut session = Session::new();
    let uri = session.add_document(document);
    session.compile(&uri, path, options)
}
