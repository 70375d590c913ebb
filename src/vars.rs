//! `var:module:dotted.name` indirection for schema locations and path segments.
//!
//! A namespace is a JSON object of modules, each a tree of named values:
//!
//! ```json
//! {"settings": {"schema_path": "schema/nested.json", "Awesome": {"key": "awesome"}}}
//! ```
//!
//! Against it, `var:settings:Awesome.key` resolves to `"awesome"`. Anything
//! without the `var:` prefix is taken literally.
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::source::{read_json, SourceError};

pub const VAR_PREFIX: &str = "var:";

#[derive(Debug, Clone, Default)]
pub struct Namespace {
    modules: Map<String, Value>,
}

impl Namespace {
    pub fn new(modules: Map<String, Value>) -> Self {
        Self { modules }
    }

    pub fn empty() -> Self { Self::default() }

    /// Read a namespace file; the top level must be an object of modules.
    pub fn load(path: &Path) -> std::result::Result<Self, SourceError> {
        read_json(path).map(Self::new)
    }

    pub fn is_var(value: &str) -> bool {
        value.starts_with(VAR_PREFIX)
    }

    /// Expand `value` when it is a `var:` reference.
    pub fn resolve(&self, value: &str) -> Result<String> {
        let Some(reference) = value.strip_prefix(VAR_PREFIX) else {
            return Ok(value.to_string());
        };
        let fail = |reason: String| Error::VarReference { reference: value.to_string(), reason };

        let (module, name) = reference
            .split_once(':')
            .ok_or_else(|| fail("expected `var:<module>:<name>`".to_string()))?;
        if module.is_empty() || name.is_empty() || name.contains(':') {
            return Err(fail("expected `var:<module>:<name>`".to_string()));
        }
        let mut current = self
            .modules
            .get(module)
            .ok_or_else(|| fail(format!("no module named {module:?}")))?;
        for attr in name.split('.') {
            current = current
                .get(attr)
                .ok_or_else(|| fail(format!("{module:?} has no attribute path {name:?}")))?;
        }
        match current {
            Value::String(s) => {
                log::debug!("{value} -> {s:?}");
                Ok(s.clone())
            }
            other => Err(fail(format!("expected a string, found {other}"))),
        }
    }

    pub fn resolve_all<S: AsRef<str>>(&self, values: &[S]) -> Result<Vec<String>> {
        values.iter().map(|v| self.resolve(v.as_ref())).collect()
    }
}
