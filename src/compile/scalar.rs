use serde_json::{Map, Value};

use super::{combinator, Compiler};
use crate::diagnostics::DiagnosticKind;
use crate::error::Result;
use crate::ir::TypeNode;

pub(crate) fn string(_: &mut Compiler<'_>, _: &Map<String, Value>, _: bool) -> Result<TypeNode> {
    Ok(TypeNode::string())
}

pub(crate) fn number(_: &mut Compiler<'_>, _: &Map<String, Value>, _: bool) -> Result<TypeNode> {
    Ok(TypeNode::number())
}

/// draft-04: `integer` is its own, narrower type.
pub(crate) fn integer(_: &mut Compiler<'_>, _: &Map<String, Value>, _: bool) -> Result<TypeNode> {
    Ok(TypeNode::int())
}

/// draft-06 on: any number with a zero fractional part is an integer, which
/// cannot be told apart without the value, so both are admitted.
pub(crate) fn integer_or_number(_: &mut Compiler<'_>, _: &Map<String, Value>, _: bool) -> Result<TypeNode> {
    Ok(TypeNode::Union(vec![TypeNode::int(), TypeNode::number()]))
}

pub(crate) fn null(_: &mut Compiler<'_>, _: &Map<String, Value>, _: bool) -> Result<TypeNode> {
    Ok(TypeNode::null())
}

pub(crate) fn any(_: &mut Compiler<'_>, _: &Map<String, Value>, _: bool) -> Result<TypeNode> {
    Ok(TypeNode::any())
}

/// Plain `bool`, unless a `const` is nested under `properties`, in which case
/// that single value is the type.
pub(crate) fn boolean(c: &mut Compiler<'_>, schema: &Map<String, Value>, _: bool) -> Result<TypeNode> {
    if let Some(Value::Object(properties)) = schema.get("properties") {
        if properties.contains_key("default") {
            c.descend(&["properties", "default"], |c| {
                c.warn(DiagnosticKind::DefaultUnsupported, "`default` keyword is not supported")
            });
        }
        if let Some(value) = properties.get("const") {
            return Ok(c.descend(&["properties", "const"], |c| combinator::literal(c, value)));
        }
    }
    Ok(TypeNode::bool())
}

#[cfg(test)]
mod tests {
    use crate::compile::tests::{compile_ok, compile_with};
    use crate::diagnostics::DiagnosticKind;
    use crate::ir::{LiteralValue, TypeNode};
    use serde_json::json;

    #[test]
    fn integer_depends_on_draft() {
        let draft4 = json!({"$schema": "http://json-schema.org/draft-04/schema#", "type": "integer"});
        let draft6 = json!({"$schema": "http://json-schema.org/draft-06/schema#", "type": "integer"});
        let draft7 = json!({"$schema": "http://json-schema.org/draft-07/schema#", "type": "integer"});
        let unspecified = json!({"type": "integer"});
        let widened = TypeNode::Union(vec![TypeNode::int(), TypeNode::number()]);

        assert_eq!(compile_ok(draft4), TypeNode::int());
        assert_eq!(compile_ok(draft6), widened);
        assert_eq!(compile_ok(draft7), widened);
        assert_eq!(compile_ok(unspecified), widened);
    }

    #[test]
    fn primitive_scalars() {
        assert_eq!(compile_ok(json!({"type": "string"})), TypeNode::string());
        assert_eq!(compile_ok(json!({"type": "number"})), TypeNode::number());
        assert_eq!(compile_ok(json!({"type": "null"})), TypeNode::null());
        assert_eq!(compile_ok(json!({"type": "any"})), TypeNode::any());
        assert_eq!(compile_ok(json!({"type": "boolean"})), TypeNode::bool());
    }

    #[test]
    fn boolean_with_nested_const_is_a_literal() {
        let ty = compile_ok(json!({"type": "boolean", "properties": {"const": true}}));
        assert_eq!(ty, TypeNode::Literal(LiteralValue::Bool(true)));
    }

    #[test]
    fn boolean_with_nested_default_warns() {
        let (result, diagnostics, _) =
            compile_with(json!({"type": "boolean", "properties": {"default": false}}), false);
        assert_eq!(result.unwrap(), TypeNode::bool());
        assert!(diagnostics.has(DiagnosticKind::DefaultUnsupported));
    }
}
