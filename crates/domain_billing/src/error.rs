//! Billing domain errors
//!
//! This module defines all error types that can occur in the billing domain,
//! including cadence validation, schedule lifecycle, invoice workflow, and
//! persistence failures surfaced through ports.

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Cadence parameters are out of range or inconsistent
    #[error("Invalid cadence: {0}")]
    InvalidCadence(String),

    /// Schedule construction or mutation violated an invariant
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// A required builder field was not provided
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Requested status change not permitted from the current state
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// Line items can only be changed while the invoice is a draft
    #[error("Invoice can only be modified in draft status")]
    InvoiceNotDraft,

    /// Referenced line item does not exist on the invoice
    #[error("Line item not found: {0}")]
    LineItemNotFound(String),

    /// Monetary amounts with mismatched currencies were combined
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),

    /// The client cannot be billed (missing or deactivated)
    #[error("Client not billable: {0}")]
    ClientNotBillable(String),

    /// The schedule belongs to a different tenant than the operation context
    #[error("Schedule does not belong to the operating tenant")]
    TenantMismatch,

    /// A port operation failed
    #[error("Port operation failed: {0}")]
    Port(#[from] PortError),
}

impl BillingError {
    /// Creates an InvalidCadence error with a message
    pub fn invalid_cadence(message: impl Into<String>) -> Self {
        BillingError::InvalidCadence(message.into())
    }

    /// Creates an InvalidSchedule error with a message
    pub fn invalid_schedule(message: impl Into<String>) -> Self {
        BillingError::InvalidSchedule(message.into())
    }

    /// Creates an InvalidStatusTransition error from any displayable states
    pub fn invalid_transition(
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        BillingError::InvalidStatusTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// True when the error came from a transient port failure worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Port(e) if e.is_transient())
    }
}

// Adapters that apply domain transitions inside a port method need to hand
// the domain error back across the port boundary.
impl From<BillingError> for PortError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::Port(inner) => inner,
            other => PortError::validation(other.to_string()),
        }
    }
}
