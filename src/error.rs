//! Error types for the element runtime.
//!
//! Rendering never fails hard on template problems (malformed directives,
//! unresolved paths, refused methods); those are logged and recovered where
//! they happen. The variants here are the few failures a Rust caller can act on.

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced to the embedding application
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// No component registered under this selector
    #[error("No component registered for selector '{0}'")]
    UnknownSelector(String),

    /// The method table of a component has no entry with this name
    #[error("Component '{component}' has no method named '{method}'")]
    UnknownMethod { component: String, method: String },

    /// A method invoked through the programmatic API failed
    #[error("Method '{method}' failed: {source}")]
    Method {
        method: String,
        #[source]
        source: MethodError,
    },

    /// Template or stylesheet could not be read
    #[error("Failed to load asset {path:?}: {source}")]
    AssetLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// html5ever rejected the template input
    #[error("Failed to parse template: {0}")]
    Parse(String),
}

/// Error returned by a component method
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MethodError {
    /// An argument had the wrong shape for this method
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The method ran but could not complete
    #[error("{0}")]
    Failed(String),
}

impl MethodError {
    pub fn failed(message: impl Into<String>) -> Self {
        MethodError::Failed(message.into())
    }
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
