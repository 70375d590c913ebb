use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal compile failures. Each names the schema location it was raised at,
/// rendered as `<base-uri>#<json-pointer>`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{location}: root type {types:?} is not supported, the root must be an `object`")]
    UnsupportedRootType { types: Vec<String>, location: String },

    #[error("{location}: unsupported schema: {reason}")]
    UnsupportedSchema { reason: String, location: String },

    #[error("cannot resolve `$ref` {reference:?} in scope {scope}: {reason}")]
    RefResolution { reference: String, scope: String, reason: String },

    #[error("`$ref` {reference:?} at {location} recurses without bound (depth {depth})")]
    RefCycle { reference: String, location: String, depth: usize },

    #[error("invalid sub-schema path at segment {segment:?}: {reason}")]
    InvalidSubschemaPath { segment: String, reason: String },

    #[error("{location}: malformed schema: {reason}")]
    MalformedSchema { reason: String, location: String },

    #[error("variable reference {reference:?}: {reason}")]
    VarReference { reference: String, reason: String },
}

impl Error {
    /// Variant name, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedRootType { .. } => "UnsupportedRootType",
            Self::UnsupportedSchema { .. } => "UnsupportedSchema",
            Self::RefResolution { .. } => "RefResolution",
            Self::RefCycle { .. } => "RefCycle",
            Self::InvalidSubschemaPath { .. } => "InvalidSubschemaPath",
            Self::MalformedSchema { .. } => "MalformedSchema",
            Self::VarReference { .. } => "VarReference",
        }
    }

    pub(crate) fn unsupported(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedSchema { reason: reason.into(), location: location.into() }
    }

    pub(crate) fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSchema { reason: reason.into(), location: location.into() }
    }

    pub(crate) fn invalid_path(segment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSubschemaPath { segment: segment.into(), reason: reason.into() }
    }
}
