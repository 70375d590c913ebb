//! Reading schema documents and other JSON inputs from disk.
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::SchemaDocument;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to parse {} at JSON path {pointer}: {message}", path.display())]
    Parse { path: PathBuf, pointer: String, message: String },

    #[error("cannot turn {} into a file URI", path.display())]
    Uri { path: PathBuf },
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str, path: &Path) -> Result<T, SourceError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| SourceError::Parse {
        path: path.to_path_buf(),
        pointer: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let src = std::fs::read_to_string(path)
        .map_err(|source| SourceError::Io { path: path.to_path_buf(), source })?;
    from_str_with_path(&src, path)
}

/// Parse a schema file. Its canonical `file://` URI becomes the base for
/// relative `$ref`s.
pub fn load_document(path: &Path) -> Result<SchemaDocument, SourceError> {
    let schema: Value = read_json(path)?;
    let absolute = std::fs::canonicalize(path)
        .map_err(|source| SourceError::Io { path: path.to_path_buf(), source })?;
    let uri = Url::from_file_path(&absolute).map_err(|()| SourceError::Uri { path: absolute.clone() })?;
    log::debug!("loaded {uri}");
    Ok(SchemaDocument::new(uri, schema))
}
