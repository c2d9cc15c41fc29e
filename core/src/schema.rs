//! Schema capability contracts and the document processing pipeline.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::{NodeKind, TreeNode};

/// Root node of a configuration tree.
///
/// Implementations own the merge semantics: [`Processor`] only decides the
/// order in which the three steps run.
pub trait SchemaNode {
    /// Validates one raw document and brings it to canonical form.
    fn normalize(&self, value: Value) -> Result<Value>;

    /// Merges a normalized document (`right`) over the accumulated tree
    /// (`left`). Values in `right` take precedence.
    fn merge(&self, left: Value, right: Value) -> Result<Value>;

    /// Applies defaults and final checks to the merged tree.
    fn finalize(&self, value: Value) -> Result<Value>;

    /// Tree the first document is merged into. Defaults to an empty mapping.
    fn empty(&self) -> Value {
        Value::Object(Map::new())
    }
}

/// A declared configuration shape.
pub trait ConfigurationSchema {
    /// Builds the root node of the tree.
    fn build_tree(&self) -> Box<dyn SchemaNode>;
}

/// Runs the normalize / merge / finalize pipeline.
pub struct Processor;

impl Processor {
    /// Processes `documents` in order against `root`.
    ///
    /// Each document is normalized and merged over the result of the
    /// previous ones, starting from [`SchemaNode::empty`]. The merged tree
    /// is finalized once. With no documents only `finalize` runs, on that
    /// empty tree.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the node.
    pub fn process(root: &dyn SchemaNode, documents: Vec<Value>) -> Result<Value> {
        let mut current = root.empty();
        for document in documents {
            let normalized = root.normalize(document)?;
            current = root.merge(current, normalized)?;
        }
        root.finalize(current)
    }
}

impl SchemaNode for TreeNode {
    fn normalize(&self, value: Value) -> Result<Value> {
        self.normalize_at(value, self.name())
    }

    fn merge(&self, left: Value, right: Value) -> Result<Value> {
        self.merge_at(left, right, self.name())
    }

    fn finalize(&self, value: Value) -> Result<Value> {
        self.finalize_at(value, self.name())
    }

    fn empty(&self) -> Value {
        match self.kind() {
            NodeKind::Mapping { .. } => Value::Object(Map::new()),
            NodeKind::Sequence(_) => Value::Array(Vec::new()),
            _ => Value::Null,
        }
    }
}

/// A [`ConfigurationSchema`] backed by a declared [`TreeNode`].
#[derive(Debug, Clone)]
pub struct TreeSchema {
    root: TreeNode,
}

impl TreeSchema {
    /// Wraps `root` as a schema.
    pub fn new(root: TreeNode) -> Self {
        Self { root }
    }

    /// Declared root node.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }
}

impl ConfigurationSchema for TreeSchema {
    fn build_tree(&self) -> Box<dyn SchemaNode> {
        Box::new(self.root.clone())
    }
}
