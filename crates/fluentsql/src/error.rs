//! Error types for fluentsql

use thiserror::Error;

/// Result type alias for fluentsql operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Error types for query building and execution.
///
/// Every variant that originates from a statement keeps the SQL text that was
/// sent, so callers can log exactly what the database rejected.
#[derive(Debug, Clone, Error)]
pub enum SqlError {
    /// Acquiring a connection from the pool failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// The database selection statement failed
    #[error("Select DB error: {message}")]
    DatabaseSelect { message: String, sql: String },

    /// Malformed input, reported before any connection is requested
    #[error("Validation error: {0}")]
    Validation(String),

    /// Statement rejected by the database
    #[error("Query error: {message}")]
    Query { message: String, sql: String },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl SqlError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a query error carrying the offending SQL
    pub fn query(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: sql.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// The failure message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Connection(message) | Self::Validation(message) => message,
            Self::DatabaseSelect { message, .. }
            | Self::Query { message, .. }
            | Self::Decode { message, .. } => message,
        }
    }

    /// The SQL text that produced this error, or `""` when none was sent.
    pub fn sql(&self) -> &str {
        match self {
            Self::DatabaseSelect { sql, .. } | Self::Query { sql, .. } => sql,
            _ => "",
        }
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a connection error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Opaque failure reported by the pool or driver underneath a router.
///
/// The router decides which [`SqlError`] variant it becomes.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(feature = "pool")]
impl From<tokio_postgres::Error> for DriverError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_err) => Self::new(format!("{}: {}", db_err.code().code(), db_err.message())),
            None => Self::new(err.to_string()),
        }
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DriverError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_keeps_sql() {
        let err = SqlError::query("syntax error", "SELECT * FORM users");
        assert_eq!(err.message(), "syntax error");
        assert_eq!(err.sql(), "SELECT * FORM users");
        assert_eq!(err.to_string(), "Query error: syntax error");
    }

    #[test]
    fn validation_error_has_no_sql() {
        let err = SqlError::validation("empty table");
        assert!(err.is_validation());
        assert!(!err.is_connection());
        assert_eq!(err.sql(), "");
    }
}
