//! Merging of normalized configuration trees.
//!
//! When the same setting comes from several documents, the later document
//! wins. Mappings merge key by key, sequences append, and every other node
//! is replaced wholesale.
//!
//! # Example
//!
//! ```
//! use pli_core::merge_values;
//! use serde_json::json;
//!
//! let merged = merge_values(
//!     json!({"db": {"host": "localhost", "port": 5432}}),
//!     json!({"db": {"host": "db.internal"}}),
//! );
//! assert_eq!(merged, json!({"db": {"host": "db.internal", "port": 5432}}));
//! ```

use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::types::{NodeKind, TreeNode, child_path, value_type_name};

/// Deep-merges two untyped values.
///
/// Mappings are merged recursively; for any other pair of values `overlay`
/// replaces `base`. Used for undeclared keys and variable nodes, where no
/// schema drives the merge.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

impl TreeNode {
    pub(crate) fn merge_at(&self, left: Value, right: Value, path: &str) -> Result<Value> {
        if left.is_null() {
            return Ok(right);
        }
        if right.is_null() {
            return Ok(left);
        }

        match self.kind() {
            NodeKind::Mapping { children, .. } => {
                let (Value::Object(mut merged), Value::Object(overlay)) = (left, right) else {
                    return Err(SchemaError::InvalidValue {
                        path: path.to_string(),
                        message: "both sides of a mapping merge must be mappings".to_string(),
                    });
                };

                for (key, value) in overlay {
                    let value = match (merged.remove(&key), children.get(&key)) {
                        (Some(existing), Some(child)) => {
                            child.merge_at(existing, value, &child_path(path, &key))?
                        }
                        (Some(existing), None) => merge_values(existing, value),
                        (None, _) => value,
                    };
                    merged.insert(key, value);
                }
                Ok(Value::Object(merged))
            }
            NodeKind::Sequence(_) => match (left, right) {
                (Value::Array(mut items), Value::Array(more)) => {
                    items.extend(more);
                    Ok(Value::Array(items))
                }
                (left, right) => Err(SchemaError::InvalidValue {
                    path: path.to_string(),
                    message: format!(
                        "cannot append {} to {}",
                        value_type_name(&right),
                        value_type_name(&left)
                    ),
                }),
            },
            _ => Ok(right),
        }
    }
}
