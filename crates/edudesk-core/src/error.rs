//! Core error types for edudesk-core.
//!
//! Errors are grouped by the layer that raises them. Sync failures live in
//! [`crate::sync::SyncError`] and master-data violations in
//! [`crate::reconcile::ReconcileError`]; both fold into [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

use crate::reconcile::ReconcileError;
use crate::sync::SyncError;

/// Core error type for edudesk-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Local database errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// OAuth errors
    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthError),

    /// Remote sync errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Master-data errors
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// OAuth-specific errors.
#[derive(Error, Debug)]
pub enum OAuthError {
    /// Authorization failed
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Token exchange failed
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Token refresh failed
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Callback timeout
    #[error("OAuth callback timeout: no callback received within {timeout_secs} seconds")]
    CallbackTimeout { timeout_secs: u64 },

    /// Invalid callback
    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    /// Access token expired
    #[error("Access token expired and no refresh token available")]
    TokenExpired,

    /// Credentials not configured
    #[error("OAuth credentials not configured for {service}")]
    CredentialsNotConfigured { service: String },

    /// OS keyring failure
    #[error("Keyring error: {0}")]
    Keyring(String),

    /// Transport failure while talking to the token endpoint
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Local IO failure (loopback listener, browser launch)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Attendance cannot be marked on a holiday
    #[error("{date} is a holiday ({name}); attendance is closed")]
    Holiday { date: chrono::NaiveDate, name: String },

    /// Value outside its allowed range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Missing required value
    #[error("{0} is required")]
    Required(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Operation requires a different role
    #[error("{action} requires an administrator")]
    Forbidden { action: String },

    /// Referenced record does not exist
    #[error("No {entity} with id '{id}'")]
    NotFound { entity: String, id: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<keyring::Error> for OAuthError {
    fn from(err: keyring::Error) -> Self {
        OAuthError::Keyring(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for OAuthError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        OAuthError::CallbackTimeout { timeout_secs: 300 }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holiday_message_names_the_day() {
        let err = ValidationError::Holiday {
            date: chrono::NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
            name: "Christmas".into(),
        };
        assert_eq!(
            err.to_string(),
            "2024-12-25 is a holiday (Christmas); attendance is closed"
        );
    }

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let raw = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::DatabaseLocked,
                extended_code: 6,
            },
            None,
        );
        assert!(matches!(DatabaseError::from(raw), DatabaseError::Locked));
    }

    #[test]
    fn reconcile_error_is_transparent() {
        let err: CoreError = ReconcileError::DuplicateValue {
            kind: crate::model::MasterKind::Department,
            value: "CSE".into(),
        }
        .into();
        assert_eq!(err.to_string(), "\"CSE\" already exists in the department list");
    }
}
