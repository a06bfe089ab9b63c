//! Error types for the word pack catalog.

use thiserror::Error;

use crate::types::{Language, PackId};

/// Result type alias using CatalogError.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur in the word pack catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Word pack not found.
    #[error("Word pack not found: {id}")]
    PackNotFound { id: PackId },

    /// No default word pack exists for the language.
    #[error("Failed to get default word pack by language: {language}")]
    DefaultPackNotFound { language: Language },

    /// A batch of words was empty or spanned several packs.
    #[error("Invalid word batch: {message}")]
    InvalidBatch { message: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The remote group was already merged into the pack.
    #[error("Group {group} has already been saved")]
    GroupAlreadySaved { pack_id: PackId, group: u32 },

    /// Fetching a remote group failed.
    #[error("Failed to fetch group {group} for {language}: {reason}")]
    Fetch {
        language: Language,
        group: u32,
        reason: String,
    },

    /// Database error.
    #[error("Database error: {message}")]
    Database { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CatalogError {
    /// Create an invalid batch error.
    pub fn invalid_batch(message: impl Into<String>) -> Self {
        Self::InvalidBatch {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a fetch error for a language/group pair.
    pub fn fetch(language: Language, group: u32, reason: impl Into<String>) -> Self {
        Self::Fetch {
            language,
            group,
            reason: reason.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    ///
    /// Only fetch failures qualify. A `GroupAlreadySaved` conflict is a
    /// caller bug and retrying it can never succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Get a stable error code for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PackNotFound { .. } => "PACK_NOT_FOUND",
            Self::DefaultPackNotFound { .. } => "DEFAULT_PACK_NOT_FOUND",
            Self::InvalidBatch { .. } => "INVALID_BATCH",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::GroupAlreadySaved { .. } => "GROUP_ALREADY_SAVED",
            Self::Fetch { .. } => "FETCH_FAILED",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::GroupAlreadySaved {
            pack_id: 2,
            group: 1,
        };
        assert_eq!(err.to_string(), "Group 1 has already been saved");

        let err = CatalogError::PackNotFound { id: 42 };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CatalogError::PackNotFound { id: 1 }.error_code(),
            "PACK_NOT_FOUND"
        );
        assert_eq!(
            CatalogError::database("test").error_code(),
            "DATABASE_ERROR"
        );
        assert_eq!(
            CatalogError::fetch(Language::En, 3, "timeout").error_code(),
            "FETCH_FAILED"
        );
    }

    #[test]
    fn test_only_fetch_is_retryable() {
        assert!(CatalogError::fetch(Language::De, 0, "HTTP 503").is_retryable());
        assert!(!CatalogError::GroupAlreadySaved {
            pack_id: 1,
            group: 0
        }
        .is_retryable());
        assert!(!CatalogError::invalid_batch("empty").is_retryable());
    }
}
