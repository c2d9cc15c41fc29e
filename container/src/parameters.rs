//! Container parameters and `%name%` placeholder resolution.
//!
//! A string value that is exactly `%name%` resolves to the parameter value
//! with its original type. Placeholders embedded in a longer string are
//! replaced by the scalar's text. `%%` is an escaped percent sign.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{ContainerError, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%|%([^%\s]+)%").expect("static regex must compile"));

static WHOLE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%([^%\s]+)%$").expect("static regex must compile"));

/// Named parameter values of a container.
///
/// # Examples
///
/// ```
/// use pli_container::ParameterBag;
/// use serde_json::json;
///
/// let mut bag = ParameterBag::new();
/// bag.set("root", json!("/srv/app"));
/// bag.set("cache_dir", json!("%root%/cache"));
/// bag.resolve().unwrap();
///
/// assert_eq!(bag.get("cache_dir").unwrap(), &json!("/srv/app/cache"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBag {
    parameters: BTreeMap<String, Value>,
}

impl ParameterBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, replacing any earlier value with the same name.
    ///
    /// Returns the replaced value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.parameters.insert(name.into(), value)
    }

    /// Returns a parameter value.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ParameterNotFound`] if `name` is not set.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.parameters
            .get(name)
            .ok_or_else(|| ContainerError::ParameterNotFound {
                name: name.to_string(),
            })
    }

    /// Returns `true` if `name` is set.
    pub fn has(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Removes and returns the value of `name`.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.parameters.remove(name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Iterates over parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolves placeholders in every parameter value in place.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ParameterNotFound`] for a placeholder naming
    /// an unknown parameter and [`ContainerError::CircularReference`] when
    /// parameters refer to each other in a loop.
    pub fn resolve(&mut self) -> Result<()> {
        let mut resolved = BTreeMap::new();
        for (name, value) in &self.parameters {
            let mut stack = vec![name.clone()];
            resolved.insert(name.clone(), self.resolve_with_stack(value, &mut stack)?);
        }
        self.parameters = resolved;
        Ok(())
    }

    /// Returns a copy of `value` with every placeholder replaced.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub fn resolve_value(&self, value: &Value) -> Result<Value> {
        self.resolve_with_stack(value, &mut Vec::new())
    }

    fn resolve_with_stack(&self, value: &Value, stack: &mut Vec<String>) -> Result<Value> {
        match value {
            Value::String(s) => self.resolve_string(s, stack),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_with_stack(item, stack))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(entries) => {
                let mut resolved = Map::new();
                for (key, item) in entries {
                    resolved.insert(key.clone(), self.resolve_with_stack(item, stack)?);
                }
                Ok(Value::Object(resolved))
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&self, text: &str, stack: &mut Vec<String>) -> Result<Value> {
        if let Some(captures) = WHOLE_PLACEHOLDER.captures(text) {
            return self.lookup(&captures[1], stack);
        }

        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        for captures in PLACEHOLDER.captures_iter(text) {
            let whole = captures.get(0).map_or(0..0, |m| m.range());
            output.push_str(&text[last..whole.start]);
            match captures.get(1) {
                None => output.push('%'),
                Some(name) => {
                    let value = self.lookup(name.as_str(), stack)?;
                    output.push_str(&scalar_text(name.as_str(), &value)?);
                }
            }
            last = whole.end;
        }
        output.push_str(&text[last..]);
        Ok(Value::String(output))
    }

    fn lookup(&self, name: &str, stack: &mut Vec<String>) -> Result<Value> {
        if stack.iter().any(|entry| entry == name) {
            let mut path = stack.clone();
            path.push(name.to_string());
            return Err(ContainerError::CircularReference {
                path: path.join(" -> "),
            });
        }

        let raw = self.get(name)?;
        stack.push(name.to_string());
        let resolved = self.resolve_with_stack(raw, stack);
        stack.pop();
        resolved
    }
}

impl FromIterator<(String, Value)> for ParameterBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            parameters: iter.into_iter().collect(),
        }
    }
}

fn scalar_text(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(ContainerError::InvalidDefinition {
            id: format!("%{name}%"),
            reason: "a mapping or sequence parameter cannot be embedded in a string".to_string(),
        }),
    }
}
