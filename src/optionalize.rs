//! Relaxing a record so that none of its fields are required.
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::ir::TypeNode;

/// Every field of a record becomes optional; field order, names and value
/// types are kept. Anything that is not a record passes through unchanged.
pub fn optionalize(ty: TypeNode) -> TypeNode {
    let mut diagnostics = Diagnostics::new();
    optionalize_with(ty, &mut diagnostics, "")
}

/// Like [`optionalize`], reporting a non-record input to `diagnostics`.
pub fn optionalize_with(ty: TypeNode, diagnostics: &mut Diagnostics, location: &str) -> TypeNode {
    match ty {
        TypeNode::Record(mut record) => {
            for field in record.fields.values_mut() {
                field.required = false;
            }
            TypeNode::Record(record)
        }
        other => {
            diagnostics.error(
                DiagnosticKind::NotARecord,
                location,
                format!("only records can be made optional, got `{other}`; leaving it unchanged"),
            );
            other
        }
    }
}
