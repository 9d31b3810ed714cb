//! Proposal Domain - Quotes and Acceptance Workflow
//!
//! This crate implements client proposals: the item and totals math shared
//! with invoicing, a validity window, and the acceptance workflow in which
//! rejected or expired proposals can loop back to draft for revision.

pub mod error;
pub mod proposal;

pub use error::ProposalError;
pub use proposal::{Proposal, ProposalItem, ProposalStatus};
