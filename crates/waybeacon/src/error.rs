//! Error types for waybeacon.
//!
//! This module defines the crate-level error type used throughout waybeacon.
//! Delivery failures are deliberately *not* surfaced through this enum on the
//! flush path; they travel in [`crate::uplink::FlushOutcome`] so that a failed
//! uplink can never abort the capture path.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for waybeacon operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Store Errors ===
    /// Failed to open or create the durable store.
    #[error("failed to open store at {path}: {source}")]
    StoreOpen {
        /// Path to the store file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A store query failed.
    #[error("store query failed: {0}")]
    StoreQuery(#[from] rusqlite::Error),

    /// Failed to run store schema migrations.
    #[error("store migration failed: {message}")]
    StoreMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Sample Errors ===
    /// A location sample failed its invariant checks.
    #[error("invalid sample: {reason}")]
    InvalidSample {
        /// Which invariant was violated.
        reason: String,
    },

    // === Delivery Errors ===
    /// Delivery to the collector failed.
    ///
    /// Only produced by code that explicitly asks for a hard error (such as
    /// the CLI); the flush path reports failures through
    /// [`crate::uplink::FlushOutcome`] instead.
    #[error("delivery failed: {0}")]
    Delivery(#[from] crate::transport::DeliveryError),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for waybeacon operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new invalid-sample error.
    #[must_use]
    pub fn invalid_sample(reason: impl Into<String>) -> Self {
        Self::InvalidSample {
            reason: reason.into(),
        }
    }

    /// Create a new store migration error.
    #[must_use]
    pub fn store_migration(message: impl Into<String>) -> Self {
        Self::StoreMigration {
            message: message.into(),
        }
    }

    /// Check if this error rejects a malformed sample.
    #[must_use]
    pub fn is_invalid_sample(&self) -> bool {
        matches!(self, Self::InvalidSample { .. })
    }

    /// Check if this error originates in the durable store.
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::StoreOpen { .. } | Self::StoreQuery(_) | Self::StoreMigration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_sample("latitude out of range");
        assert_eq!(err.to_string(), "invalid sample: latitude out of range");

        let err = Error::store_migration("version mismatch");
        assert_eq!(err.to_string(), "store migration failed: version mismatch");
    }

    #[test]
    fn test_error_is_invalid_sample() {
        assert!(Error::invalid_sample("nan").is_invalid_sample());
        assert!(!Error::store_migration("x").is_invalid_sample());
    }

    #[test]
    fn test_error_is_store_error() {
        assert!(Error::store_migration("x").is_store_error());
        assert!(!Error::invalid_sample("x").is_store_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::StoreQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "capacity must be at least 1".to_string(),
        };
        assert!(err.to_string().contains("capacity must be at least 1"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }

    #[test]
    fn test_delivery_error_wrapped() {
        let err: Error = crate::transport::DeliveryError::MissingToken.into();
        assert!(matches!(err, Error::Delivery(_)));
        assert!(err.to_string().contains("delivery failed"));
    }
}
