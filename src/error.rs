//! Error handling for the calibrig core
//!
//! This module defines the custom error type and a Result alias used
//! throughout the crate. Load/save operations are "best-effort union":
//! most of these errors are reported and counted at the world boundary
//! rather than aborting a whole load.

use thiserror::Error;

/// Main error type for calibrig operations
#[derive(Error, Debug)]
pub enum CalibError {
    /// A required field is absent or of the wrong shape during deserialization
    #[error("Malformed document at '{path}': {message}")]
    MalformedDocument { path: String, message: String },

    /// A node type name in a document has no registered factory
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// A connection target identity was not found during wiring
    #[error("Dangling connection on node '{node}' pin '{pin}': target '{target}' not found")]
    DanglingConnection {
        node: String,
        pin: String,
        target: String,
    },

    /// A node failed during its update tick
    #[error("Node '{node}' update failed: {message}")]
    NodeUpdate { node: String, message: String },

    /// Errors related to node graph composition (duplicate identity, bad pin)
    #[error("Graph error: {0}")]
    Graph(String),

    /// Errors from the calibration solve collaborator
    #[error("Solve error: {0}")]
    Solve(String),

    /// Errors related to world file persistence
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CalibError>,
    },
}

impl CalibError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CalibError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a malformed-document error for a field path
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        CalibError::MalformedDocument {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for calibrig operations
pub type Result<T> = std::result::Result<T, CalibError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CalibError::UnknownNodeType("FrobnicatorNode".to_string());
        assert_eq!(err.to_string(), "Unknown node type: FrobnicatorNode");
    }

    #[test]
    fn test_malformed_document_path() {
        let err = CalibError::malformed("captures[2].timestamp", "expected integer");
        assert!(err.to_string().contains("captures[2].timestamp"));
        assert!(err.to_string().contains("expected integer"));
    }

    #[test]
    fn test_error_with_context() {
        let err: Result<()> = Err(CalibError::Graph("no such pin".to_string()));
        let with_ctx = err.context("Failed to connect");
        assert!(with_ctx
            .unwrap_err()
            .to_string()
            .contains("Failed to connect"));
    }
}
