//! `$ref` resolution.
//!
//! A [`Registry`] owns every loaded document and indexes them (and their
//! embedded `$id`s) by absolute URI. A [`Resolver`] borrows the registry and
//! keeps the stack of base URIs that relative references resolve against.
//! Each compile owns its own `Resolver`; the registry is shared read-only.
use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use serde_json::Value;
use url::Url;

use crate::draft::{Draft, RuleSet};
use crate::error::{Error, Result};

/// Base URI for schemas that arrive without a location.
pub const DEFAULT_BASE_URI: &str = "file:///schema.json";

/// Keywords whose values are data, not sub-schemas; `$id`s inside are not indexed.
const DATA_KEYWORDS: [&str; 4] = ["enum", "const", "default", "examples"];

#[derive(Debug, Clone)]
struct Entry {
    document: usize,
    pointer: String,
}

#[derive(Debug, Default)]
pub struct Registry {
    documents: Vec<Value>,
    uris: Vec<Url>,
    index: HashMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Register `document` under `uri` and under every `$id` it embeds.
    pub fn insert(&mut self, uri: &Url, document: Value) {
        let slot = self.documents.len();
        let rules = RuleSet::for_draft(Draft::detect_in(&document));
        let base = strip_fragment(uri);
        self.index.insert(base.to_string(), Entry { document: slot, pointer: String::new() });
        let mut found = Vec::new();
        collect_ids(&rules, &document, &base, String::new(), &mut found);
        for (key, pointer) in found {
            log::trace!("indexed {key} -> {pointer:?}");
            self.index.entry(key).or_insert(Entry { document: slot, pointer });
        }
        self.documents.push(document);
        self.uris.push(base);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.index.contains_key(uri)
    }

    pub fn get(&self, uri: &str) -> Option<&Value> {
        let entry = self.index.get(uri)?;
        self.documents.get(entry.document)?.pointer(&entry.pointer)
    }

    /// The registered document an indexed URI lives in, and its JSON pointer there.
    pub fn locate(&self, uri: &str) -> Option<(&Url, &str)> {
        let entry = self.index.get(uri)?;
        Some((self.uris.get(entry.document)?, entry.pointer.as_str()))
    }
}

fn strip_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

fn collect_ids(rules: &RuleSet, value: &Value, base: &Url, pointer: String, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            let mut base = base.clone();
            if let Some(id) = rules.id_of(map) {
                if let Ok(joined) = base.join(id) {
                    match joined.fragment() {
                        // plain-name anchor, e.g. `"$id": "#item"`
                        Some(anchor) if !anchor.is_empty() && id.starts_with('#') => {
                            out.push((joined.to_string(), pointer.clone()));
                        }
                        _ => {
                            base = strip_fragment(&joined);
                            out.push((base.to_string(), pointer.clone()));
                        }
                    }
                }
            }
            for (key, child) in map {
                if DATA_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                collect_ids(rules, child, &base, format!("{pointer}/{}", escape_token(key)), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_ids(rules, child, base, format!("{pointer}/{i}"), out);
            }
        }
        _ => {}
    }
}

pub(crate) fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

// ————————————————————————————————————————————————————————————————————————————
// RESOLVER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
pub struct Resolver<'r> {
    registry: &'r Registry,
    scopes: Vec<Url>,
    aliases: HashMap<String, String>,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry, base: Url) -> Self {
        Self { registry, scopes: vec![base], aliases: HashMap::new() }
    }

    /// Make document lookups for `alias` land on `target`.
    pub fn alias(&mut self, alias: &Url, target: &Url) {
        let alias = strip_fragment(alias).to_string();
        let target = strip_fragment(target).to_string();
        if alias != target {
            log::debug!("scope alias {alias} -> {target}");
            self.aliases.insert(alias, target);
        }
    }

    pub fn resolution_scope(&self) -> &Url {
        // the base scope is never popped
        &self.scopes[self.scopes.len() - 1]
    }

    /// Number of scopes above the base.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Enter a node carrying an identifying URI, relative to the current scope.
    pub fn push_scope(&mut self, scope: &str) -> Result<(), url::ParseError> {
        let joined = self.resolution_scope().join(scope)?;
        self.scopes.push(joined);
        Ok(())
    }

    pub fn push_resolved(&mut self, scope: Url) {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        } else {
            log::error!("scope stack underflow; keeping base scope {}", self.scopes[0]);
        }
    }

    /// Where a plain-name anchor URL such as `.../a.json#item` points, as a
    /// document URI and JSON pointer. `None` for any other URL.
    pub fn locate_anchor(&self, url: &Url) -> Option<(&'r Url, &'r str)> {
        let anchor = url.fragment().filter(|f| !f.is_empty() && !f.starts_with('/'))?;
        let anchor = percent_decode_str(anchor).decode_utf8().ok()?;
        let document = strip_fragment(url).to_string();
        let document = self.aliases.get(&document).cloned().unwrap_or(document);
        self.registry.locate(&format!("{document}#{anchor}"))
    }

    /// Resolve `reference` against the current scope. Returns the scope to
    /// enter (the absolute reference URL) and the schema fragment it names.
    pub fn resolve(&self, reference: &str) -> Result<(Url, &'r Value)> {
        let scope = self.resolution_scope();
        let fail = |reason: String| Error::RefResolution {
            reference: reference.to_string(),
            scope: scope.to_string(),
            reason,
        };

        let url = scope.join(reference).map_err(|e| fail(e.to_string()))?;
        let document = strip_fragment(&url).to_string();
        let document = self.aliases.get(&document).cloned().unwrap_or(document);
        let fragment = percent_decode_str(url.fragment().unwrap_or(""))
            .decode_utf8()
            .map_err(|e| fail(format!("fragment is not UTF-8: {e}")))?;

        let root = self
            .registry
            .get(&document)
            .ok_or_else(|| fail(format!("no document is registered as {document}")))?;

        let target = if fragment.is_empty() {
            Some(root)
        } else if fragment.starts_with('/') {
            root.pointer(&fragment)
        } else {
            self.registry.get(&format!("{document}#{fragment}"))
        };

        match target {
            Some(target) => Ok((url, target)),
            None => Err(fail(format!("{document} has nothing at #{fragment}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url(s: &str) -> Url { Url::parse(s).unwrap() }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.insert(&url(DEFAULT_BASE_URI), json!({
            "definitions": {
                "name": {"type": "string"},
                "a/b": {"type": "integer"},
                "with space": {"type": "null"},
                "embedded": {"$id": "http://example.com/item.json", "type": "boolean"},
                "anchored": {"$id": "#thing", "type": "number"}
            },
            "enum": [{"$id": "http://example.com/not-a-schema.json"}]
        }));
        registry.insert(&url("http://example.com/other.json"), json!({
            "definitions": {"flag": {"type": "boolean"}}
        }));
        registry
    }

    #[test]
    fn resolves_local_pointers() {
        let registry = registry();
        let resolver = Resolver::new(&registry, url(DEFAULT_BASE_URI));
        let (scope, target) = resolver.resolve("#/definitions/name").unwrap();
        assert_eq!(target, &json!({"type": "string"}));
        assert_eq!(scope.as_str(), "file:///schema.json#/definitions/name");
    }

    #[test]
    fn decodes_escaped_pointer_tokens() {
        let registry = registry();
        let resolver = Resolver::new(&registry, url(DEFAULT_BASE_URI));
        assert_eq!(resolver.resolve("#/definitions/a~1b").unwrap().1, &json!({"type": "integer"}));
        assert_eq!(resolver.resolve("#/definitions/with%20space").unwrap().1, &json!({"type": "null"}));
    }

    #[test]
    fn resolves_embedded_ids_and_anchors() {
        let registry = registry();
        let resolver = Resolver::new(&registry, url(DEFAULT_BASE_URI));
        let (_, target) = resolver.resolve("http://example.com/item.json").unwrap();
        assert_eq!(target["type"], "boolean");
        let (_, target) = resolver.resolve("#thing").unwrap();
        assert_eq!(target["type"], "number");
        assert!(!registry.contains("http://example.com/not-a-schema.json"));
    }

    #[test]
    fn anchors_locate_to_json_pointers() {
        let registry = registry();
        let resolver = Resolver::new(&registry, url(DEFAULT_BASE_URI));
        let (scope, _) = resolver.resolve("#thing").unwrap();
        let (document, pointer) = resolver.locate_anchor(&scope).unwrap();
        assert_eq!(document.as_str(), DEFAULT_BASE_URI);
        assert_eq!(pointer, "/definitions/anchored");
        assert!(resolver.locate_anchor(&url("file:///schema.json#/definitions/name")).is_none());
    }

    #[test]
    fn relative_refs_follow_the_scope_stack() {
        let registry = registry();
        let mut resolver = Resolver::new(&registry, url(DEFAULT_BASE_URI));
        assert!(resolver.resolve("other.json#/definitions/flag").is_err());
        resolver.push_scope("http://example.com/root.json").unwrap();
        let (_, target) = resolver.resolve("other.json#/definitions/flag").unwrap();
        assert_eq!(target, &json!({"type": "boolean"}));
        resolver.pop_scope();
        assert_eq!(resolver.resolution_scope().as_str(), DEFAULT_BASE_URI);
        assert_eq!(resolver.depth(), 0);
    }

    #[test]
    fn aliases_redirect_document_lookups() {
        let registry = registry();
        let mut resolver = Resolver::new(&registry, url(DEFAULT_BASE_URI));
        resolver.alias(&url("file:///schema.json/awesome"), &url(DEFAULT_BASE_URI));
        resolver.push_scope("file:///schema.json/awesome").unwrap();
        assert_eq!(resolver.resolve("#/definitions/name").unwrap().1, &json!({"type": "string"}));
    }

    #[test]
    fn unresolvable_refs_name_the_ref_and_scope() {
        let registry = registry();
        let resolver = Resolver::new(&registry, url(DEFAULT_BASE_URI));
        match resolver.resolve("#/definitions/missing") {
            Err(Error::RefResolution { reference, scope, .. }) => {
                assert_eq!(reference, "#/definitions/missing");
                assert_eq!(scope, DEFAULT_BASE_URI);
            }
            other => panic!("expected RefResolution, got {other:?}"),
        }
    }

    #[test]
    fn pop_never_drops_the_base_scope() {
        let registry = Registry::new();
        let mut resolver = Resolver::new(&registry, url(DEFAULT_BASE_URI));
        resolver.pop_scope();
        assert_eq!(resolver.resolution_scope().as_str(), DEFAULT_BASE_URI);
    }
}
