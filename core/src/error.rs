//! Error types for configuration tree processing.

use thiserror::Error;

/// Errors raised while normalizing, merging or finalizing a configuration
/// tree.
///
/// Every variant carries the dotted path of the offending node (for example
/// `app.plugins.0`) so the message points at the source of the problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A value has the wrong shape for its node.
    #[error("invalid type for path \"{path}\": expected {expected}, got {found}")]
    InvalidType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A mapping contains a key the schema does not declare.
    #[error("unrecognized option \"{key}\" under \"{path}\"")]
    UnrecognizedOption { path: String, key: String },

    /// A required key is absent after all documents were merged.
    #[error("the child node \"{key}\" at path \"{path}\" must be configured")]
    MissingRequired { path: String, key: String },

    /// A value has the right type but is not acceptable.
    #[error("invalid value for path \"{path}\": {message}")]
    InvalidValue { path: String, message: String },
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
