//! Error types for the Remold core library
//!
//! This module defines the error handling system for Remold, using thiserror
//! for ergonomic error definitions and anyhow for flexible error sources.

use thiserror::Error;

/// Main error type for Remold operations
#[derive(Error, Debug)]
pub enum Error {
    /// Null or structurally invalid inputs to any public API
    #[error("Invalid argument `{argument}`: {message}")]
    InvalidArgument {
        argument: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A supplied factory or value does not have the expected shape
    #[error("Type mismatch: expected {expected}, got {actual} ({context})")]
    TypeMismatch {
        expected: String,
        actual: String,
        context: String,
    },

    /// No compiled transform/merge exists for the requested type pair
    #[error("No injection resolved for {source_type} -> {target_type}")]
    UnresolvedInjection {
        source_type: String,
        target_type: String,
    },

    /// The configured "throw on null source" strategy fired
    #[error("Null source rejected: {message}")]
    NullSourcePolicy { message: String },

    /// Primitive conversion failure after the locale-aware fallback
    #[error("Cannot convert `{value}` to {target_type}")]
    Conversion {
        value: String,
        target_type: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an `InvalidArgument` without an underlying cause
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for an `UnresolvedInjection` from a type pair
    pub fn unresolved(source_type: impl Into<String>, target_type: impl Into<String>) -> Self {
        Error::UnresolvedInjection {
            source_type: source_type.into(),
            target_type: target_type.into(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_display() {
        let err = Error::invalid_argument("pattern", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid argument `pattern`: must not be empty"
        );
    }

    #[test]
    fn test_unresolved_display() {
        let err = Error::unresolved("Person", "PersonDto");
        assert_eq!(err.to_string(), "No injection resolved for Person -> PersonDto");
    }

    #[test]
    fn test_conversion_display() {
        let err = Error::Conversion {
            value: "abc".to_string(),
            target_type: "f64".to_string(),
            source: None,
        };
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("f64"));
    }
}
