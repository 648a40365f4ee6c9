//! Error types for eager loading
//!
//! Every failure surfaces to the immediate caller. Nothing in this crate
//! retries, logs an error away or returns partial results.

use thiserror::Error;

/// Result type alias for inclusion operations
pub type IncludeResult<T> = Result<T, IncludeError>;

/// Error types for inclusion and eager loading operations
#[derive(Error, Debug)]
pub enum IncludeError {
    /// Options, metadata or nesting declared with the wrong shape
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The document store failed to answer a batched lookup
    #[error("Lookup failed for '{target}': {message}")]
    Lookup { target: String, message: String },

    /// Relation metadata could not be copied onto a concrete target class
    #[error("Cannot retarget relation '{relation}' to '{class_name}': {reason}")]
    Retarget {
        relation: String,
        class_name: String,
        reason: String,
    },

    /// Relation not declared for a model
    #[error("Relationship error: {0}")]
    Relationship(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IncludeError {
    /// Create a lookup failure for the given target class
    pub fn lookup(target: impl Into<String>, message: impl Into<String>) -> Self {
        IncludeError::Lookup {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error came from the document store
    pub fn is_lookup(&self) -> bool {
        matches!(self, IncludeError::Lookup { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = IncludeError::Configuration("bad option".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad option");

        let err = IncludeError::lookup("Dog", "connection reset");
        assert_eq!(err.to_string(), "Lookup failed for 'Dog': connection reset");
        assert!(err.is_lookup());

        let err = IncludeError::Retarget {
            relation: "pet".to_string(),
            class_name: "Fish".to_string(),
            reason: "not an allowed type".to_string(),
        };
        assert!(err.to_string().contains("'pet'"));
        assert!(!err.is_lookup());
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: IncludeError = parse_err.into();
        assert!(matches!(err, IncludeError::Serialization(_)));
    }
}
