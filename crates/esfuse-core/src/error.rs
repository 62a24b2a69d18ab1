//! Error types for esfuse.

use thiserror::Error;

/// Result type alias using SearchError.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while building, issuing or fusing queries.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The search backend (or the client talking to it) failed.
    #[error("Search backend error: {message}")]
    Backend { message: String },

    /// A hit's source record has no product identifier.
    #[error("Hit {doc_id} has no product identifier field '{field}'")]
    MissingProductId { doc_id: String, field: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SearchError {
    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::MissingProductId { .. } => "MISSING_PRODUCT_ID",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SearchError::MissingProductId {
            doc_id: "doc-7".to_string(),
            field: "product_uid".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("doc-7"));
        assert!(msg.contains("product_uid"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(SearchError::backend("timeout").error_code(), "BACKEND_ERROR");
        assert_eq!(
            SearchError::invalid_argument("num_results").error_code(),
            "INVALID_ARGUMENT"
        );
        assert_eq!(SearchError::config("bad").error_code(), "CONFIG_ERROR");
    }
}
