use std::collections::HashSet;

use serde_json::{Map, Value};

use super::Compiler;
use crate::error::Result;
use crate::ir::{Field, RecordType, TypeNode};

/// Keyword markers that may sit under `properties` without being properties.
const RESERVED_PROPERTY_NAMES: [&str; 2] = ["default", "const"];

/// A record built from `properties`, or an untyped mapping without them.
pub(crate) fn object(c: &mut Compiler<'_>, schema: &Map<String, Value>, outer: bool) -> Result<TypeNode> {
    let Some(properties) = schema.get("properties") else {
        return Ok(TypeNode::any_mapping());
    };
    let properties = properties
        .as_object()
        .ok_or_else(|| c.malformed("`properties` must be an object"))?;
    let required = required_keys(schema);

    let mut record = RecordType::empty(c.record_name(), outer);
    for (key, subschema) in properties {
        if RESERVED_PROPERTY_NAMES.contains(&key.as_str()) {
            continue;
        }
        let ty = c.descend_property(key, |c| c.compile(subschema, false))?;
        if ty.is_nothing() {
            log::debug!("{}: skipping property {key:?}", c.location());
            continue;
        }
        record.fields.insert(key.clone(), Field { ty, required: required.contains(key.as_str()) });
    }
    Ok(TypeNode::Record(record))
}

/// Names listed in `required`. draft-03 style booleans are ignored.
fn required_keys(schema: &Map<String, Value>) -> HashSet<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|keys| keys.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
