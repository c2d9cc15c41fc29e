//! Normalization and finalization of configuration trees.
//!
//! Normalization runs on each raw document before it is merged: it checks
//! types, rejects undeclared keys and turns `foo-bar` keys into `foo_bar`
//! when only the underscore form is declared. Finalization runs once on the
//! merged tree: it fills defaults, enforces required keys and rejects empty
//! values where the node forbids them.

use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::types::{NodeKind, TreeNode, child_path, value_type_name};

impl TreeNode {
    pub(crate) fn normalize_at(&self, value: Value, path: &str) -> Result<Value> {
        match self.kind() {
            NodeKind::Variable => Ok(value),
            NodeKind::Mapping {
                children,
                allow_extra_keys,
            } => {
                let entries = match value {
                    Value::Null => return Ok(Value::Object(Map::new())),
                    Value::Object(entries) => entries,
                    other => return Err(invalid_type(path, "mapping", &other)),
                };

                let mut normalized = Map::new();
                for (key, child_value) in entries {
                    let key = normalize_key(&key, |k| children.contains_key(k));
                    match children.get(&key) {
                        Some(child) => {
                            let child_value =
                                child.normalize_at(child_value, &child_path(path, &key))?;
                            normalized.insert(key, child_value);
                        }
                        None if *allow_extra_keys => {
                            normalized.insert(key, child_value);
                        }
                        None => {
                            return Err(SchemaError::UnrecognizedOption {
                                path: path.to_string(),
                                key,
                            });
                        }
                    }
                }
                Ok(Value::Object(normalized))
            }
            NodeKind::Sequence(prototype) => {
                let items = match value {
                    Value::Null => return Ok(Value::Array(Vec::new())),
                    Value::Array(items) => items,
                    other => return Err(invalid_type(path, "sequence", &other)),
                };
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        prototype.normalize_at(item, &child_path(path, &index.to_string()))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            _ => self.normalize_leaf(value, path),
        }
    }

    fn normalize_leaf(&self, value: Value, path: &str) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }

        let accepted = match (self.kind(), &value) {
            (NodeKind::Boolean, Value::Bool(_)) => true,
            (NodeKind::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (NodeKind::Float, Value::Number(_)) => true,
            (NodeKind::String, Value::String(_)) => true,
            (NodeKind::Enum(choices), Value::String(s)) => {
                if !choices.iter().any(|c| c == s) {
                    return Err(SchemaError::InvalidValue {
                        path: path.to_string(),
                        message: format!(
                            "\"{s}\" is not one of {}",
                            choices
                                .iter()
                                .map(|c| format!("\"{c}\""))
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    });
                }
                true
            }
            _ => false,
        };

        if accepted {
            Ok(value)
        } else {
            Err(invalid_type(path, self.expected_type(), &value))
        }
    }

    pub(crate) fn finalize_at(&self, value: Value, path: &str) -> Result<Value> {
        let value = match (self.kind(), value) {
            (
                NodeKind::Mapping { children, .. },
                Value::Object(mut entries),
            ) => {
                for (key, child) in children {
                    let current_path = child_path(path, key);
                    match entries.remove(key) {
                        Some(child_value) => {
                            let finalized = child.finalize_at(child_value, &current_path)?;
                            entries.insert(key.clone(), finalized);
                        }
                        None => {
                            if let Some(default) = child.implicit_value(&current_path)? {
                                entries.insert(key.clone(), default);
                            } else if child.is_required() {
                                return Err(SchemaError::MissingRequired {
                                    path: path.to_string(),
                                    key: key.clone(),
                                });
                            }
                        }
                    }
                }
                Value::Object(entries)
            }
            (NodeKind::Sequence(prototype), Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    prototype.finalize_at(item, &child_path(path, &index.to_string()))
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)?,
            (_, other) => other,
        };

        if !self.allows_empty() && is_empty(&value) {
            return Err(SchemaError::InvalidValue {
                path: path.to_string(),
                message: "the value cannot be empty".to_string(),
            });
        }

        Ok(value)
    }

    /// Value used for an absent key: the declared default, or the finalized
    /// empty container for mappings and sequences without a default.
    fn implicit_value(&self, path: &str) -> Result<Option<Value>> {
        if let Some(default) = self.default() {
            return Ok(Some(default.clone()));
        }
        if self.is_required() {
            return Ok(None);
        }
        match self.kind() {
            NodeKind::Mapping { .. } => self
                .finalize_at(Value::Object(Map::new()), path)
                .map(Some),
            NodeKind::Sequence(_) => self.finalize_at(Value::Array(Vec::new()), path).map(Some),
            _ => Ok(None),
        }
    }

    fn expected_type(&self) -> &'static str {
        match self.kind() {
            NodeKind::Variable => "any",
            NodeKind::Boolean => "boolean",
            NodeKind::Integer => "integer",
            NodeKind::Float => "float",
            NodeKind::String | NodeKind::Enum(_) => "string",
            NodeKind::Mapping { .. } => "mapping",
            NodeKind::Sequence(_) => "sequence",
        }
    }
}

fn normalize_key(key: &str, is_declared: impl Fn(&str) -> bool) -> String {
    if key.contains('-') && !is_declared(key) {
        let underscored = key.replace('-', "_");
        if is_declared(&underscored) {
            return underscored;
        }
    }
    key.to_string()
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        _ => false,
    }
}

fn invalid_type(path: &str, expected: &'static str, found: &Value) -> SchemaError {
    SchemaError::InvalidType {
        path: path.to_string(),
        expected,
        found: value_type_name(found),
    }
}
