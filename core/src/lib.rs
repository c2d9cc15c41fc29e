//! Configuration tree schema engine.
//!
//! This crate defines the capability contracts the bootstrapper uses to turn
//! a list of raw configuration documents into a single finalized value:
//!
//! - [`ConfigurationSchema`]: builds the root [`SchemaNode`] of a declared
//!   configuration shape.
//! - [`SchemaNode`]: normalizes one document, merges two normalized trees
//!   and finalizes the merged result.
//! - [`Processor`]: drives the normalize / merge / finalize pipeline over an
//!   ordered list of documents.
//!
//! A default engine is provided by [`TreeNode`] and [`TreeSchema`]: a small
//! declarative node tree with typed leaves, defaults and required keys.
//!
//! # Example
//!
//! ```
//! use pli_core::*;
//! use serde_json::json;
//!
//! let schema = TreeSchema::new(
//!     TreeNode::mapping("app")
//!         .child(TreeNode::string("greeting").default_value(json!("Hello")))
//!         .child(TreeNode::sequence("plugins", TreeNode::string("plugin"))),
//! );
//!
//! let root = schema.build_tree();
//! let config = Processor::process(
//!     root.as_ref(),
//!     vec![json!({"plugins": ["a"]}), json!({"greeting": "Hi", "plugins": ["b"]})],
//! )
//! .unwrap();
//!
//! assert_eq!(config, json!({"greeting": "Hi", "plugins": ["a", "b"]}));
//! ```

mod error;
mod merge;
mod schema;
mod types;
mod validate;

pub use error::{Result, SchemaError};
pub use merge::merge_values;
pub use schema::{ConfigurationSchema, Processor, SchemaNode, TreeSchema};
pub use types::{NodeKind, TreeNode, value_type_name};

/// Configuration values are plain JSON trees.
pub use serde_json::{Map, Value};
