use serde_json::{Map, Value};

use super::Compiler;
use crate::error::Result;
use crate::ir::TypeNode;

/// `items` decides the shape: one schema is a list, a sequence of schemas is
/// a fixed-length tuple.
pub(crate) fn array(c: &mut Compiler<'_>, schema: &Map<String, Value>, _: bool) -> Result<TypeNode> {
    match schema.get("items") {
        None | Some(Value::Bool(true)) => Ok(TypeNode::list(TypeNode::any())),
        Some(Value::Bool(false)) => Err(c.unsupported("`\"items\": false` is not representable")),
        Some(Value::Array(items)) => {
            fixed_length_bound(c, schema, "minItems", items.len())?;
            fixed_length_bound(c, schema, "maxItems", items.len())?;
            let mut elements = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let index = i.to_string();
                let ty = c.descend(&["items", index.as_str()], |c| c.compile(item, false))?;
                elements.push(ty.or_any());
            }
            Ok(TypeNode::Tuple(elements))
        }
        Some(item) => {
            let ty = c.descend(&["items"], |c| c.compile(item, false))?;
            Ok(TypeNode::list(ty.or_any()))
        }
    }
}

/// Tuple validation only maps onto a tuple when its length cannot vary.
fn fixed_length_bound(c: &Compiler<'_>, schema: &Map<String, Value>, keyword: &str, len: usize) -> Result<()> {
    match schema.get(keyword) {
        None => Ok(()),
        Some(bound) if bound.as_f64() == Some(len as f64) => Ok(()),
        Some(bound) => Err(c.unsupported(format!(
            "tuple `items` of length {len} needs `{keyword}` absent or equal to {len}, found {bound}"
        ))),
    }
}
