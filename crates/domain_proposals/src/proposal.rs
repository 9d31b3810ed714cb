//! Proposal aggregate and status workflow
//!
//! Proposals are quotes sent to clients ahead of any invoicing. The money
//! math mirrors the invoice: per-item amounts rounded to the currency,
//! then subtotal, tax, and a flat discount with the total floored at zero.
//!
//! The status workflow parallels the invoice table with one difference:
//! a rejected or expired proposal may loop back to draft for revision, so
//! the only truly terminal state is `Accepted`.
//!
//! ```text
//! draft -> sent -> viewed -> accepted
//!            \        \---> rejected -> draft (revise)
//!             \------------> expired -> draft (revise)
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{ClientId, Currency, Money, ProposalId, Rate, TenantId};

use crate::error::ProposalError;

/// Proposal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Being drafted; items are mutable
    Draft,
    /// Delivered to the client
    Sent,
    /// Opened by the client
    Viewed,
    /// Client accepted; terminal
    Accepted,
    /// Client declined; may be revised back to draft
    Rejected,
    /// Validity date passed without a decision; may be revised
    Expired,
}

impl ProposalStatus {
    /// All statuses
    pub const ALL: [ProposalStatus; 6] = [
        ProposalStatus::Draft,
        ProposalStatus::Sent,
        ProposalStatus::Viewed,
        ProposalStatus::Accepted,
        ProposalStatus::Rejected,
        ProposalStatus::Expired,
    ];

    /// Returns the lowercase name used in storage and serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Sent => "sent",
            ProposalStatus::Viewed => "viewed",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Expired => "expired",
        }
    }

    /// True for the state a proposal can never leave
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Accepted)
    }

    /// True while the client can still act on the proposal
    pub fn is_open(&self) -> bool {
        matches!(self, ProposalStatus::Sent | ProposalStatus::Viewed)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = ProposalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(ProposalStatus::Draft),
            "sent" => Ok(ProposalStatus::Sent),
            "viewed" => Ok(ProposalStatus::Viewed),
            "accepted" => Ok(ProposalStatus::Accepted),
            "rejected" => Ok(ProposalStatus::Rejected),
            "expired" => Ok(ProposalStatus::Expired),
            other => Err(ProposalError::invalid(format!(
                "unknown proposal status: {}",
                other
            ))),
        }
    }
}

/// A line on a proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalItem {
    /// Unique item identifier
    pub id: Uuid,
    /// Description shown to the client
    pub description: String,
    /// Quantity
    pub quantity: Decimal,
    /// Price per unit
    pub unit_price: Money,
    /// Extended amount, rounded to the currency
    pub amount: Money,
}

impl ProposalItem {
    /// Creates an item, computing the rounded extended amount
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Money) -> Self {
        let amount = unit_price.multiply(quantity).round_to_currency();
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            quantity,
            unit_price,
            amount,
        }
    }
}

/// A proposal within a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique proposal identifier
    pub id: ProposalId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Client the proposal is addressed to
    pub client_id: ClientId,
    /// Title shown to the client
    pub title: String,
    /// Proposal lines
    pub items: Vec<ProposalItem>,
    /// Tax rate applied to the subtotal
    pub tax_rate: Rate,
    /// Flat discount
    pub discount_amount: Money,
    /// Sum of item amounts
    pub subtotal: Money,
    /// Tax on the subtotal
    pub tax_amount: Money,
    /// subtotal + tax - discount, floored at zero
    pub total: Money,
    /// Last date the client can act on the proposal
    pub valid_until: NaiveDate,
    /// Current workflow status
    pub status: ProposalStatus,
    /// When the proposal was sent
    pub sent_at: Option<DateTime<Utc>>,
    /// When the client accepted
    pub accepted_at: Option<DateTime<Utc>>,
    /// When the client rejected
    pub rejected_at: Option<DateTime<Utc>>,
    /// Proposal currency
    pub currency: Currency,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Creates an empty draft proposal
    pub fn new(
        tenant_id: TenantId,
        client_id: ClientId,
        title: impl Into<String>,
        valid_until: NaiveDate,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProposalId::new_v7(),
            tenant_id,
            client_id,
            title: title.into(),
            items: Vec::new(),
            tax_rate: Rate::zero(),
            discount_amount: Money::zero(currency),
            subtotal: Money::zero(currency),
            tax_amount: Money::zero(currency),
            total: Money::zero(currency),
            valid_until,
            status: ProposalStatus::Draft,
            sent_at: None,
            accepted_at: None,
            rejected_at: None,
            currency,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds an item and recomputes totals
    ///
    /// # Errors
    ///
    /// `ProposalError::ProposalNotDraft` outside draft;
    /// `ProposalError::CurrencyMismatch` if the item price disagrees with
    /// the proposal currency.
    pub fn add_item(&mut self, item: ProposalItem) -> Result<(), ProposalError> {
        self.ensure_draft()?;
        if item.unit_price.currency() != self.currency {
            return Err(ProposalError::CurrencyMismatch(format!(
                "item '{}' is {}, proposal is {}",
                item.description,
                item.unit_price.currency(),
                self.currency
            )));
        }
        self.items.push(item);
        self.recalculate_totals();
        Ok(())
    }

    /// Removes an item by ID and recomputes totals
    ///
    /// # Errors
    ///
    /// `ProposalError::ItemNotFound` if no item carries the ID.
    pub fn remove_item(&mut self, item_id: Uuid) -> Result<(), ProposalError> {
        self.ensure_draft()?;
        let position = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| ProposalError::ItemNotFound(item_id.to_string()))?;
        self.items.remove(position);
        self.recalculate_totals();
        Ok(())
    }

    /// Sets the tax rate and recomputes totals
    pub fn set_tax_rate(&mut self, rate: Rate) -> Result<(), ProposalError> {
        self.ensure_draft()?;
        self.tax_rate = rate;
        self.recalculate_totals();
        Ok(())
    }

    /// Sets the flat discount and recomputes totals
    pub fn set_discount(&mut self, discount: Money) -> Result<(), ProposalError> {
        self.ensure_draft()?;
        if discount.currency() != self.currency {
            return Err(ProposalError::CurrencyMismatch(format!(
                "discount is {}, proposal is {}",
                discount.currency(),
                self.currency
            )));
        }
        self.discount_amount = discount;
        self.recalculate_totals();
        Ok(())
    }

    /// True when `to` is reachable from the current status
    pub fn can_transition_to(&self, to: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self.status, to),
            (Draft, Sent)
                | (Sent, Viewed)
                | (Sent, Accepted)
                | (Sent, Rejected)
                | (Sent, Expired)
                | (Viewed, Accepted)
                | (Viewed, Rejected)
                | (Viewed, Expired)
                | (Rejected, Draft)
                | (Expired, Draft)
        )
    }

    /// Applies a status transition, stamping the matching timestamp
    ///
    /// `sent` sets `sent_at`, `accepted` sets `accepted_at`, `rejected`
    /// sets `rejected_at`.
    ///
    /// # Errors
    ///
    /// `ProposalError::InvalidStatusTransition` if the pair is not in the
    /// table; the proposal is left unchanged.
    pub fn update_status(&mut self, to: ProposalStatus) -> Result<(), ProposalError> {
        if !self.can_transition_to(to) {
            return Err(ProposalError::invalid_transition(self.status, to));
        }

        let now = Utc::now();
        self.status = to;
        match to {
            ProposalStatus::Sent => self.sent_at = Some(now),
            ProposalStatus::Accepted => self.accepted_at = Some(now),
            ProposalStatus::Rejected => self.rejected_at = Some(now),
            _ => {}
        }
        self.updated_at = now;
        Ok(())
    }

    /// Expires an open proposal whose validity date has passed
    ///
    /// Returns true when the proposal transitioned to expired. Drafts,
    /// decided proposals, and proposals still within their validity
    /// window are left untouched.
    pub fn mark_expired_if_past(&mut self, today: NaiveDate) -> bool {
        if self.status.is_open() && today > self.valid_until {
            // Both open states may expire, so this cannot fail
            self.update_status(ProposalStatus::Expired).is_ok()
        } else {
            false
        }
    }

    /// Reopens a rejected or expired proposal for revision
    ///
    /// The proposal returns to draft with its items mutable again. The
    /// decision timestamps are kept as history of the previous round.
    ///
    /// # Errors
    ///
    /// `ProposalError::InvalidStatusTransition` unless the proposal is
    /// rejected or expired.
    pub fn revise(&mut self) -> Result<(), ProposalError> {
        self.update_status(ProposalStatus::Draft)
    }

    /// Recomputes subtotal, tax, and total from the current items
    fn recalculate_totals(&mut self) {
        self.subtotal = self
            .items
            .iter()
            .fold(Money::zero(self.currency), |acc, item| acc + item.amount);
        self.tax_amount = self.tax_rate.apply(&self.subtotal).round_to_currency();

        let total = (self.subtotal + self.tax_amount - self.discount_amount).round_to_currency();
        self.total = if total.is_negative() {
            Money::zero(self.currency)
        } else {
            total
        };
    }

    fn ensure_draft(&self) -> Result<(), ProposalError> {
        if self.status != ProposalStatus::Draft {
            return Err(ProposalError::ProposalNotDraft);
        }
        Ok(())
    }
}
