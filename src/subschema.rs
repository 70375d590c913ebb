//! Narrowing a schema to the part a key path points at.
//!
//! `narrow(schema, ["status", "diagnostics"])` describes the value found at
//! `obj["status"][i]["diagnostics"]` of any `obj` the schema admits: array
//! levels on the way are looked through, so indices never appear in a path.
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Keywords kept on the root before descending. `required` and friends
/// constrain the container, not the value being narrowed to.
const KEPT_KEYWORDS: [&str; 6] = ["$schema", "$id", "title", "type", "properties", "items"];

/// Keywords a property schema inherits from its parent when it has none.
const INHERITED_KEYWORDS: [&str; 3] = ["$schema", "$id", "title"];

/// Path segment that stops at the current object schema.
pub const SELF_SEGMENT: &str = "#";

/// Return the sub-schema `path` names. The input is left untouched.
///
/// Fails with [`Error::InvalidSubschemaPath`] when a segment meets a schema
/// that is not an object with `properties`, or names a missing property.
pub fn narrow<S: AsRef<str>>(schema: &Value, path: &[S]) -> Result<Value> {
    let Value::Object(root) = schema else {
        return Err(Error::invalid_path(
            path.first().map(|s| s.as_ref()).unwrap_or(SELF_SEGMENT),
            "the root schema is not an object",
        ));
    };
    let mut current: Map<String, Value> = root
        .iter()
        .filter(|(key, _)| KEPT_KEYWORDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for segment in path {
        let segment = segment.as_ref();
        if type_is(&current, "array") {
            unwrap_items(&mut current, segment)?;
            if !type_is(&current, "object") {
                log::debug!("narrowing stopped at {segment:?} inside a non-object array");
                return Ok(Value::Object(current));
            }
        }
        if !type_is(&current, "object") {
            return Err(Error::invalid_path(
                segment,
                format!("expected an `object` schema, found type {}", type_name(&current)),
            ));
        }
        let properties = current
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::invalid_path(segment, "the schema has no `properties`"))?;
        if segment == SELF_SEGMENT {
            continue;
        }
        let child = match properties.get(segment) {
            Some(Value::Object(child)) => child.clone(),
            Some(_) => return Err(Error::invalid_path(segment, "the property schema is not an object")),
            None => return Err(Error::invalid_path(segment, "no such property")),
        };
        current = enter_property(&current, child, segment);
    }

    if current.contains_key("properties") && !type_is(&current, "object") {
        current.remove("properties");
    }
    Ok(Value::Object(current))
}

/// The property schema, plus identity keywords carried down from the parent
/// with the segment appended so the result stays traceable.
fn enter_property(parent: &Map<String, Value>, mut child: Map<String, Value>, segment: &str) -> Map<String, Value> {
    for keyword in INHERITED_KEYWORDS {
        if !child.contains_key(keyword) {
            if let Some(value) = parent.get(keyword) {
                child.insert(keyword.to_string(), value.clone());
            }
        }
    }
    if let Some(Value::String(id)) = child.get_mut("$id") {
        id.push('/');
        id.push_str(segment);
    }
    if let Some(Value::String(title)) = child.get_mut("title") {
        title.push(' ');
        title.push_str(segment);
    }
    child
}

/// Flatten `items` wrappers into `schema` while it describes an array.
fn unwrap_items(schema: &mut Map<String, Value>, segment: &str) -> Result<()> {
    while type_is(schema, "array") {
        match schema.remove("items") {
            None | Some(Value::Bool(true)) => break,
            Some(Value::Object(items)) => schema.extend(items),
            Some(_) => {
                return Err(Error::invalid_path(
                    segment,
                    "tuple or `false` `items` cannot be looked through",
                ));
            }
        }
    }
    Ok(())
}

fn type_is(schema: &Map<String, Value>, name: &str) -> bool {
    schema.get("type").and_then(Value::as_str) == Some(name)
}

fn type_name(schema: &Map<String, Value>) -> String {
    schema.get("type").map_or_else(|| "(none)".to_string(), Value::to_string)
}
