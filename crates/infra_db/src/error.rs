//! Database error types
//!
//! This module defines the error types that can occur during database
//! operations, providing meaningful error messages, Postgres error code
//! classification, and the mapping onto [`PortError`] that the adapters
//! hand back across the port boundary.

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur during database operations
///
/// This enum captures all possible database-related errors, including
/// connection issues, query failures, and constraint violations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Invalid pool or connection configuration
    #[error("Invalid database configuration: {0}")]
    Configuration(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("{entity} with id '{id}' not found")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Optimistic concurrency check failed; the row was modified by a
    /// concurrent writer between read and write
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// Serialization failure or deadlock; the transaction can be retried
    #[error("Transient database failure: {0}")]
    TransientFailure(String),

    /// Transaction error
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Row decoding error, usually a schema/struct mismatch
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Generic SQL error
    #[error("SQL error: {0}")]
    SqlError(#[source] sqlx::Error),
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    ///
    /// # Arguments
    ///
    /// * `entity` - The type of entity (e.g., "Schedule", "Invoice")
    /// * `id` - The identifier that was not found
    ///
    /// # Example
    ///
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("Schedule", "SCH-123");
    /// assert!(error.to_string().contains("Schedule"));
    /// ```
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a duplicate entry error
    ///
    /// # Arguments
    ///
    /// * `entity` - The type of entity
    /// * `field` - The field that caused the duplicate
    /// * `value` - The duplicate value
    pub fn duplicate(entity: &str, field: &str, value: impl std::fmt::Display) -> Self {
        DatabaseError::DuplicateEntry(format!(
            "{} with {} '{}' already exists",
            entity, field, value
        ))
    }

    /// Creates a version conflict error for an optimistic concurrency miss
    ///
    /// # Arguments
    ///
    /// * `entity` - The type of entity
    /// * `id` - The identifier whose version check failed
    pub fn version_conflict(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::VersionConflict(format!(
            "{} with id '{}' was modified by a concurrent writer",
            entity, id
        ))
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }

    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }

    /// Checks if the failed operation is worth retrying
    ///
    /// Serialization failures, deadlocks, and pool exhaustion are
    /// transient; the same statement can succeed on a fresh attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DatabaseError::TransientFailure(_)
                | DatabaseError::PoolExhausted
                | DatabaseError::ConnectionFailed(_)
        )
    }

    /// Checks if this error is an optimistic concurrency conflict
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, DatabaseError::VersionConflict(_))
    }
}

/// Converts SQLx errors to more specific DatabaseError variants
///
/// This function analyzes the SQLx error and maps it to the appropriate
/// DatabaseError variant based on the PostgreSQL error code.
impl From<&sqlx::Error> for DatabaseError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::not_found("Record", "unknown"),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed => {
                DatabaseError::ConnectionFailed("connection pool closed".to_string())
            }
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::ColumnDecode { index, source } => DatabaseError::SerializationError(
                format!("failed to decode column {}: {}", index, source),
            ),
            sqlx::Error::Database(db_err) => {
                // PostgreSQL error codes
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => DatabaseError::DuplicateEntry(db_err.message().to_string()),
                        "23503" => {
                            DatabaseError::ForeignKeyViolation(db_err.message().to_string())
                        }
                        "23514" => {
                            DatabaseError::ConstraintViolation(db_err.message().to_string())
                        }
                        // serialization_failure and deadlock_detected
                        "40001" | "40P01" => {
                            DatabaseError::TransientFailure(db_err.message().to_string())
                        }
                        _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                    }
                } else {
                    DatabaseError::QueryFailed(db_err.message().to_string())
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Database(_) => DatabaseError::from(&error),
            // Keep the original error for source chaining when no
            // classification applies
            _ => DatabaseError::SqlError(error),
        }
    }
}

/// Maps database errors onto the port error vocabulary
///
/// Adapters return `PortError` across the port boundary; this mapping keeps
/// the semantics the domain relies on: not-found stays not-found, version
/// conflicts and duplicates surface as `Conflict`, and anything transient
/// becomes `Connection` so that `PortError::is_transient` holds.
impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { entity, id } => PortError::not_found(entity, id),
            DatabaseError::DuplicateEntry(msg) | DatabaseError::VersionConflict(msg) => {
                PortError::conflict(msg)
            }
            DatabaseError::ForeignKeyViolation(msg) | DatabaseError::ConstraintViolation(msg) => {
                PortError::validation(msg)
            }
            DatabaseError::ConnectionFailed(msg) | DatabaseError::TransientFailure(msg) => {
                PortError::connection(msg)
            }
            DatabaseError::PoolExhausted => PortError::connection("connection pool exhausted"),
            DatabaseError::SqlError(e) => PortError::Internal {
                message: "database operation failed".to_string(),
                source: Some(Box::new(e)),
            },
            other => PortError::internal(other.to_string()),
        }
    }
}
