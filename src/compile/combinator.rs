//! Keywords that combine or point at other schemas, plus the literal forms.
use serde_json::Value;

use super::{json_kind, Compiler};
use crate::diagnostics::DiagnosticKind;
use crate::error::Result;
use crate::ir::{LiteralValue, RecordType, TypeNode};

/// `allOf` is an intersection, which the type model cannot express; it is
/// approximated by the union of its branches.
pub(crate) fn all_of(c: &mut Compiler<'_>, branches: &Value) -> Result<TypeNode> {
    c.warn(
        DiagnosticKind::AllOfAsUnion,
        "no intersection type is available, `allOf` is interpreted as a union",
    );
    any_of(c, "allOf", branches)
}

/// Union of the branches, skipping branches that compiled to nothing.
pub(crate) fn any_of(c: &mut Compiler<'_>, keyword: &str, branches: &Value) -> Result<TypeNode> {
    let branches = branches
        .as_array()
        .ok_or_else(|| c.malformed(format!("`{keyword}` must be an array, found {}", json_kind(branches))))?;
    let mut members = Vec::with_capacity(branches.len());
    for (i, branch) in branches.iter().enumerate() {
        let index = i.to_string();
        let ty = c.descend(&[keyword, index.as_str()], |c| c.compile(branch, false))?;
        if !ty.is_nothing() {
            members.push(ty);
        }
    }
    Ok(TypeNode::Union(members))
}

/// One literal per value, in `enum` order.
pub(crate) fn enumeration(c: &mut Compiler<'_>, values: &Value) -> Result<TypeNode> {
    let values = values
        .as_array()
        .ok_or_else(|| c.malformed(format!("`enum` must be an array, found {}", json_kind(values))))?;
    let members = values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let index = i.to_string();
            c.descend(&["enum", index.as_str()], |c| literal(c, value))
        })
        .collect();
    Ok(TypeNode::Union(members))
}

pub(crate) fn literal(c: &mut Compiler<'_>, value: &Value) -> TypeNode {
    match LiteralValue::from_json(value) {
        Some(value) => TypeNode::Literal(value),
        None => {
            c.warn(
                DiagnosticKind::NonScalarLiteral,
                format!("{} cannot be a literal type, using `any`", json_kind(value)),
            );
            TypeNode::any()
        }
    }
}

pub(crate) fn reference(c: &mut Compiler<'_>, reference: &str, outer: bool) -> Result<TypeNode> {
    if reference == "#" {
        c.warn(
            DiagnosticKind::SelfReference,
            "recursive self references are not supported, substituting an empty record",
        );
        return Ok(TypeNode::Record(RecordType::empty(c.outer_name(), true)));
    }
    c.follow_ref(reference, outer)
}

pub(crate) fn default(c: &mut Compiler<'_>) -> TypeNode {
    c.warn(DiagnosticKind::DefaultUnsupported, "`default` keyword is not supported");
    TypeNode::Nothing
}

#[cfg(test)]
mod tests {
    use crate::compile::tests::{compile_ok, compile_with};
    use crate::compile::{outer_name_for, Compiler};
    use crate::diagnostics::DiagnosticKind;
    use crate::draft::{Draft, RuleSet};
    use crate::error::{Error, Result};
    use crate::ir::{LiteralValue, TypeNode};
    use crate::scope::{Registry, Resolver, DEFAULT_BASE_URI};
    use serde_json::json;
    use url::Url;

    #[test]
    fn enum_literals_keep_order() {
        let ty = compile_ok(json!({"enum": ["b", "a", null, true, 1.5, "b"]}));
        assert_eq!(ty.to_string(), r#"union[literal["b"], literal["a"], literal[null], literal[true], literal[1.5], literal["b"]]"#);
    }

    #[test]
    fn non_scalar_enum_values_widen() {
        let (result, diagnostics, _) = compile_with(json!({"enum": [[1], "x"]}), false);
        assert_eq!(
            result.unwrap(),
            TypeNode::Union(vec![TypeNode::any(), TypeNode::Literal(LiteralValue::String("x".into()))])
        );
        assert!(diagnostics.has(DiagnosticKind::NonScalarLiteral));
    }

    #[test]
    fn combinators_union_their_branches() {
        let branches = json!([{"type": "string"}, {"default": 1}, {"type": "null"}]);
        let expected = TypeNode::Union(vec![TypeNode::string(), TypeNode::null()]);

        let (all, diagnostics, _) = compile_with(json!({"allOf": branches.clone()}), false);
        assert_eq!(all.unwrap(), expected);
        assert!(diagnostics.has(DiagnosticKind::AllOfAsUnion));

        let (any, diagnostics, _) = compile_with(json!({"anyOf": branches.clone()}), false);
        assert_eq!(any.unwrap(), expected);
        assert!(!diagnostics.has(DiagnosticKind::OneOfAsAnyOf));

        let (one, diagnostics, _) = compile_with(json!({"oneOf": branches}), false);
        assert_eq!(one.unwrap(), expected);
        assert!(diagnostics.has(DiagnosticKind::OneOfAsAnyOf));
    }

    #[test]
    fn structural_keywords_are_prioritised() {
        let ty = compile_ok(json!({
            "$ref": "#/definitions/s",
            "anyOf": [{"type": "null"}],
            "definitions": {"s": {"type": "string"}}
        }));
        assert_eq!(ty, TypeNode::string());
        let ty = compile_ok(json!({"anyOf": [{"type": "null"}], "enum": ["x"]}));
        assert_eq!(ty, TypeNode::Union(vec![TypeNode::null()]));
    }

    #[test]
    fn default_compiles_to_nothing() {
        let (result, diagnostics, _) = compile_with(json!({"default": 42}), false);
        assert_eq!(result.unwrap(), TypeNode::Nothing);
        assert!(diagnostics.has(DiagnosticKind::DefaultUnsupported));
    }

    #[test]
    fn refs_compile_their_targets() {
        let ty = compile_ok(json!({
            "title": "Root",
            "type": "object",
            "properties": {"child": {"$ref": "#/definitions/child"}},
            "definitions": {
                "child": {"type": "object", "properties": {"id": {"$ref": "#/definitions/id"}}},
                "id": {"type": "string"}
            }
        }));
        assert_eq!(ty.to_string(), "Root{child?: {id?: string}}");
    }

    #[test]
    fn root_refs_keep_the_outer_name() {
        let ty = compile_ok(json!({
            "title": "Wrapper",
            "$ref": "#/definitions/inner",
            "definitions": {"inner": {"type": "object", "properties": {"a": {"type": "null"}}}}
        }));
        assert_eq!(ty.to_string(), "Wrapper{a?: null}");
    }

    #[test]
    fn root_refs_to_type_arrays_compile_to_unions() {
        let ty = compile_ok(json!({
            "$ref": "#/definitions/x",
            "definitions": {"x": {"type": ["string", "null"]}}
        }));
        assert_eq!(ty, TypeNode::Union(vec![TypeNode::string(), TypeNode::null()]));

        let (result, diagnostics, _) = compile_with(json!({
            "title": "Maybe",
            "$ref": "#/definitions/x",
            "definitions": {"x": {"type": ["object", "null"], "properties": {"a": {"type": "string"}}}}
        }), true);
        assert_eq!(result.unwrap().to_string(), "union[Maybe{a?: string}, null]");
        assert!(!diagnostics.has(DiagnosticKind::RootTypeFallback));
    }

    fn compile_with_depth(schema: serde_json::Value, max_ref_depth: usize) -> Result<TypeNode> {
        let base = Url::parse(DEFAULT_BASE_URI).unwrap();
        let mut registry = Registry::new();
        registry.insert(&base, schema.clone());
        let rules = RuleSet::for_draft(Draft::detect_in(&schema));
        let mut compiler = Compiler::new(Resolver::new(&registry, base), rules, outer_name_for(&schema))
            .with_max_ref_depth(max_ref_depth);
        compiler.compile(&schema, true)
    }

    #[test]
    fn ref_chains_longer_than_the_depth_limit_fail() {
        // three distinct refs, none repeated
        let schema = json!({
            "type": "object",
            "properties": {"a": {"$ref": "#/definitions/d1"}},
            "definitions": {
                "d1": {"$ref": "#/definitions/d2"},
                "d2": {"$ref": "#/definitions/d3"},
                "d3": {"type": "string"}
            }
        });
        assert_eq!(compile_with_depth(schema.clone(), 3).unwrap().to_string(), "JSONSchema{a?: string}");
        match compile_with_depth(schema, 2) {
            Err(Error::RefCycle { reference, depth, .. }) => {
                assert_eq!(reference, "#/definitions/d3");
                assert_eq!(depth, 2);
            }
            other => panic!("expected a ref cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_becomes_an_empty_record() {
        let (result, diagnostics, _) = compile_with(json!({
            "title": "Tree",
            "type": "object",
            "properties": {"parent": {"$ref": "#"}}
        }), true);
        assert_eq!(result.unwrap().to_string(), "Tree{parent?: Tree{}}");
        assert!(diagnostics.has(DiagnosticKind::SelfReference));
    }

    #[test]
    fn reference_cycles_are_bounded() {
        let (result, _, depth) = compile_with(json!({
            "type": "object",
            "properties": {"node": {"$ref": "#/definitions/node"}},
            "definitions": {
                "node": {"type": "object", "properties": {"next": {"$ref": "#/definitions/node"}}}
            }
        }), true);
        assert!(matches!(result, Err(Error::RefCycle { .. })));
        assert_eq!(depth, 0);
    }

    #[test]
    fn unresolvable_refs_fail() {
        let (result, _, _) = compile_with(json!({"$ref": "#/definitions/missing"}), false);
        assert!(matches!(result, Err(Error::RefResolution { .. })));
    }
}
