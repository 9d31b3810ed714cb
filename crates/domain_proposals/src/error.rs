//! Proposal domain errors

use thiserror::Error;

/// Errors that can occur in the proposal domain
#[derive(Debug, Error)]
pub enum ProposalError {
    /// Proposal construction or mutation violated an invariant
    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    /// Requested status change not permitted from the current state
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// Items can only be changed while the proposal is a draft
    #[error("Proposal can only be modified in draft status")]
    ProposalNotDraft,

    /// Referenced item does not exist on the proposal
    #[error("Proposal item not found: {0}")]
    ItemNotFound(String),

    /// Monetary amounts with mismatched currencies were combined
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
}

impl ProposalError {
    /// Creates an InvalidProposal error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        ProposalError::InvalidProposal(message.into())
    }

    /// Creates an InvalidStatusTransition error from any displayable states
    pub fn invalid_transition(
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        ProposalError::InvalidStatusTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
