//! Node definitions for the default configuration tree engine.
//!
//! A configuration shape is declared as a tree of [`TreeNode`]s. Leaves carry
//! a scalar kind, mappings carry named children and sequences carry a single
//! prototype node applied to every element.

use std::collections::BTreeMap;

use serde_json::Value;

/// Kind of value a [`TreeNode`] accepts.
///
/// # Examples
///
/// ```
/// use pli_core::{NodeKind, TreeNode};
///
/// let node = TreeNode::enumeration("format", ["json", "yaml"]);
/// assert!(matches!(node.kind(), NodeKind::Enum(choices) if choices.len() == 2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Any value, replaced wholesale on merge.
    Variable,
    /// `true` or `false`.
    Boolean,
    /// A signed integer.
    Integer,
    /// Any number.
    Float,
    /// A string.
    String,
    /// A string restricted to the listed choices.
    Enum(Vec<String>),
    /// A mapping with declared children.
    Mapping {
        children: BTreeMap<String, TreeNode>,
        /// Keep undeclared keys instead of rejecting them.
        allow_extra_keys: bool,
    },
    /// A list whose elements all follow the prototype node.
    Sequence(Box<TreeNode>),
}

/// A single node of a declared configuration tree.
///
/// Nodes are built with the constructor for their kind and refined with the
/// chained setters.
///
/// # Examples
///
/// ```
/// use pli_core::TreeNode;
/// use serde_json::json;
///
/// let root = TreeNode::mapping("app")
///     .child(TreeNode::string("name").required())
///     .child(TreeNode::integer("workers").default_value(json!(4)));
///
/// assert_eq!(root.name(), "app");
/// assert!(root.find_child("name").unwrap().is_required());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    name: String,
    kind: NodeKind,
    default: Option<Value>,
    required: bool,
    allow_empty: bool,
}

impl TreeNode {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            required: false,
            allow_empty: true,
        }
    }

    /// Creates a node accepting any value.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Variable)
    }

    /// Creates a boolean leaf.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Boolean)
    }

    /// Creates an integer leaf.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Integer)
    }

    /// Creates a numeric leaf.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Float)
    }

    /// Creates a string leaf.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::String)
    }

    /// Creates a string leaf restricted to `choices`.
    pub fn enumeration<I, S>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            NodeKind::Enum(choices.into_iter().map(Into::into).collect()),
        )
    }

    /// Creates a mapping node without children.
    pub fn mapping(name: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeKind::Mapping {
                children: BTreeMap::new(),
                allow_extra_keys: false,
            },
        )
    }

    /// Creates a sequence node whose elements follow `prototype`.
    pub fn sequence(name: impl Into<String>, prototype: TreeNode) -> Self {
        Self::new(name, NodeKind::Sequence(Box::new(prototype)))
    }

    /// Adds a child to a mapping node.
    ///
    /// Has no effect on other node kinds. A child with the same name replaces
    /// the earlier one.
    pub fn child(mut self, child: TreeNode) -> Self {
        if let NodeKind::Mapping { children, .. } = &mut self.kind {
            children.insert(child.name.clone(), child);
        }
        self
    }

    /// Keeps undeclared keys of a mapping node instead of rejecting them.
    pub fn allow_extra_keys(mut self) -> Self {
        if let NodeKind::Mapping {
            allow_extra_keys, ..
        } = &mut self.kind
        {
            *allow_extra_keys = true;
        }
        self
    }

    /// Sets the value used when the key is absent from every document.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Marks the node as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Rejects empty strings, sequences and mappings at finalize time.
    pub fn cannot_be_empty(mut self) -> Self {
        self.allow_empty = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn allows_empty(&self) -> bool {
        self.allow_empty
    }

    /// Looks up a declared child of a mapping node.
    pub fn find_child(&self, name: &str) -> Option<&TreeNode> {
        match &self.kind {
            NodeKind::Mapping { children, .. } => children.get(name),
            _ => None,
        }
    }
}

/// Returns a short, human-readable name for the JSON type of `value`.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_child_replaces_same_name() {
        let node = TreeNode::mapping("root")
            .child(TreeNode::string("name"))
            .child(TreeNode::integer("name"));
        assert_eq!(
            node.find_child("name").map(TreeNode::kind),
            Some(&NodeKind::Integer)
        );
    }

    #[test]
    fn test_child_ignored_on_leaf() {
        let node = TreeNode::string("leaf").child(TreeNode::string("name"));
        assert!(node.find_child("name").is_none());
    }

    #[test]
    fn test_value_type_name() {
        assert_eq!(value_type_name(&json!(null)), "null");
        assert_eq!(value_type_name(&json!(3)), "integer");
        assert_eq!(value_type_name(&json!(3.5)), "float");
        assert_eq!(value_type_name(&json!({"a": 1})), "mapping");
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("", "app"), "app");
        assert_eq!(child_path("app", "name"), "app.name");
    }
}
