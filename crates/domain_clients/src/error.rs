//! Client domain errors
//!
//! This module defines all error types that can occur in the client domain,
//! including validation errors, not found errors, and state errors.

use thiserror::Error;

/// Errors that can occur in the client domain
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client with the given ID was not found
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Attempted to create a client that already exists
    #[error("Duplicate client: {0}")]
    DuplicateClient(String),

    /// Invalid client data provided
    #[error("Invalid client data: {0}")]
    InvalidData(String),

    /// Client validation failed
    #[error("Client validation failed: {0}")]
    ValidationFailed(String),

    /// Cannot modify an inactive client
    #[error("Cannot modify inactive client")]
    InactiveClient,

    /// Attempted a state change the client is not in a position to make
    #[error("Invalid client state transition: {0}")]
    InvalidStateTransition(String),
}

impl ClientError {
    /// Creates a ClientNotFound error from any ID type
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        ClientError::ClientNotFound(id.to_string())
    }

    /// Creates an InvalidData error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        ClientError::InvalidData(message.into())
    }

    /// Creates a ValidationFailed error from validation messages
    pub fn validation_failed(errors: Vec<String>) -> Self {
        ClientError::ValidationFailed(errors.join("; "))
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ClientError::ValidationFailed(errors.to_string())
    }
}
