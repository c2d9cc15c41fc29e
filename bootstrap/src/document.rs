//! Reading raw configuration documents from disk.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{BootstrapError, Result};

/// Reads and parses the document at `path`.
///
/// Returns `Ok(None)` when the file does not exist.
pub(crate) fn read_document(path: &Path) -> Result<Option<Value>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Skipped missing configuration file");
            return Ok(None);
        }
        Err(source) => {
            return Err(BootstrapError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    debug!(path = %path.display(), bytes = content.len(), "Read configuration file");
    parse_document(path, &content).map(Some)
}

/// Parses `content` by the extension of `path`: `.json` as JSON, anything
/// else as YAML. Blank content is an empty mapping.
pub(crate) fn parse_document(path: &Path, content: &str) -> Result<Value> {
    if content.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(content).map_err(|source| BootstrapError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(content).map_err(|source| BootstrapError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }
}
