use std::time::Duration;

use thiserror::Error;

use crate::model::PlannedOperation;

/// Exit status for configuration and readiness failures.
pub const EXIT_PREFLIGHT_FAILURE: u8 = 2;
/// Exit status when one or more databases failed to reconcile.
pub const EXIT_PARTIAL_FAILURE: u8 = 1;

/// Errors raised by the SQL transport.
#[derive(Debug, Error)]
pub enum SqlError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Unexpected result shape: {0}")]
    ResultError(String),
}

/// Invalid or missing configuration. Raised before any connection attempt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("{field} must be a positive integer, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} must be one of 1/true/yes/on or 0/false/no/off, got {value:?}")]
    InvalidFlag { field: &'static str, value: String },

    #[error("database list looks like JSON but could not be parsed: {0}")]
    InvalidDbList(String),

    #[error("database list contains no names")]
    EmptyDbList,

    #[error("database list contains an empty name at position {0}")]
    EmptyName(usize),

    #[error("database name {name:?} is {len} bytes; PostgreSQL identifiers are limited to 63")]
    NameTooLong { name: String, len: usize },

    #[error("database list must not contain the superuser {0:?}")]
    SuperuserInDbList(String),

    #[error("unknown sslmode {0:?}")]
    InvalidSslMode(String),

    #[error("sslmode {0:?} requires TLS, which this build does not provide")]
    UnsupportedSslMode(String),
}

/// The server never answered the probe within the configured timeout.
#[derive(Debug, Error)]
#[error("postgres not ready after {}s ({attempts} attempts): {}", .timeout.as_secs(), last_error_text(.last_error))]
pub struct ReadinessError {
    pub timeout: Duration,
    pub attempts: u32,
    pub last_error: Option<SqlError>,
}

fn last_error_text(err: &Option<SqlError>) -> String {
    err.as_ref()
        .map_or_else(|| "no attempt completed".to_string(), ToString::to_string)
}

/// Inspecting one database name failed. Other names are unaffected.
#[derive(Debug, Error)]
#[error("failed to inspect {name}: {source}")]
pub struct StateError {
    pub name: String,
    #[source]
    pub source: SqlError,
}

/// Applying one operation failed. The name's remaining operations are abandoned.
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct ExecutionError {
    pub operation: PlannedOperation,
    #[source]
    pub source: SqlError,
}

/// Run-level failures that abort the whole bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    #[error("failed to open maintenance session: {0}")]
    Connect(#[source] SqlError),
}

impl BootstrapError {
    /// Process exit status for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        EXIT_PREFLIGHT_FAILURE
    }
}
