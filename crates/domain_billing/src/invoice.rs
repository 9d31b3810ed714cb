//! Invoice aggregate and status workflow
//!
//! Invoices are either created directly or materialized from a recurrence
//! schedule by the generator. Financial fields are recomputed on every
//! line mutation; once an invoice leaves draft, only its status and the
//! status timestamps may change.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{ClientId, Currency, InvoiceId, Money, ProjectId, Rate, ScheduleId, TenantId};

use crate::error::BillingError;
use crate::events::BillingEvent;

/// Invoice lifecycle status
///
/// Transitions are gated by a fixed table; see
/// [`Invoice::can_transition_to`]. `Paid` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Invoice is being drafted; lines may still change
    Draft,
    /// Invoice has been sent to the client
    Sent,
    /// Client has opened the invoice
    Viewed,
    /// Fully paid
    Paid,
    /// Past due date without payment
    Overdue,
    /// Cancelled/voided
    Cancelled,
}

impl InvoiceStatus {
    /// All statuses, for exhaustive transition checks
    pub const ALL: [InvoiceStatus; 6] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Viewed,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
    ];

    /// Returns the lowercase name used in storage and serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// True for states that admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "viewed" => Ok(InvoiceStatus::Viewed),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(BillingError::invalid_schedule(format!(
                "unknown invoice status: {}",
                other
            ))),
        }
    }
}

/// A line item on an invoice
///
/// The amount is fixed at construction as quantity × unit price, rounded
/// to the currency's precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Item ID
    pub id: Uuid,
    /// Description shown to the client
    pub description: String,
    /// Quantity
    pub quantity: Decimal,
    /// Price per unit
    pub unit_price: Money,
    /// quantity × unit_price at currency precision
    pub amount: Money,
}

impl LineItem {
    /// Creates a new line item, computing its amount
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Money) -> Self {
        let amount = (unit_price * quantity).round_to_currency();
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            quantity,
            unit_price,
            amount,
        }
    }
}

/// An invoice issued to a client
///
/// Invoices generated from a schedule carry the originating
/// `schedule_id`; manually created invoices leave it unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Client being billed
    pub client_id: ClientId,
    /// Related project, if any
    pub project_id: Option<ProjectId>,
    /// Originating recurrence schedule, if generated
    pub schedule_id: Option<ScheduleId>,
    /// Human-readable invoice number
    pub invoice_number: String,
    /// Date the invoice was issued
    pub issue_date: NaiveDate,
    /// Payment due date
    pub due_date: NaiveDate,
    /// Invoice currency
    pub currency: Currency,
    /// Line items, ordered
    pub line_items: Vec<LineItem>,
    /// Tax rate applied to the subtotal
    pub tax_rate: Rate,
    /// Sum of line amounts
    pub subtotal: Money,
    /// subtotal × tax_rate at currency precision
    pub tax_amount: Money,
    /// Flat discount subtracted from the total
    pub discount_amount: Money,
    /// subtotal + tax - discount, floored at zero
    pub total: Money,
    /// Current lifecycle status
    pub status: InvoiceStatus,
    /// When the invoice was sent
    pub sent_at: Option<DateTime<Utc>>,
    /// When the client first viewed it
    pub viewed_at: Option<DateTime<Utc>>,
    /// When payment was recorded
    pub paid_at: Option<DateTime<Utc>>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Domain events to be published
    #[serde(skip)]
    pub events: Vec<BillingEvent>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a new draft invoice with no lines
    pub fn new(
        tenant_id: TenantId,
        client_id: ClientId,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::new_v7(),
            tenant_id,
            client_id,
            project_id: None,
            schedule_id: None,
            invoice_number: generate_invoice_number(),
            issue_date,
            due_date,
            currency,
            line_items: Vec::new(),
            tax_rate: Rate::zero(),
            subtotal: Money::zero(currency),
            tax_amount: Money::zero(currency),
            discount_amount: Money::zero(currency),
            total: Money::zero(currency),
            status: InvoiceStatus::Draft,
            sent_at: None,
            viewed_at: None,
            paid_at: None,
            notes: None,
            events: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns accumulated domain events and clears them
    pub fn take_events(&mut self) -> Vec<BillingEvent> {
        std::mem::take(&mut self.events)
    }

    /// Adds a line item and recomputes totals
    ///
    /// # Errors
    ///
    /// `BillingError::InvoiceNotDraft` past draft;
    /// `BillingError::CurrencyMismatch` if the item currency differs.
    pub fn add_line(&mut self, item: LineItem) -> Result<(), BillingError> {
        self.ensure_draft()?;
        if item.unit_price.currency() != self.currency {
            return Err(BillingError::CurrencyMismatch(format!(
                "line item is {}, invoice is {}",
                item.unit_price.currency(),
                self.currency
            )));
        }
        self.line_items.push(item);
        self.recalculate_totals();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Removes a line item by ID and recomputes totals
    ///
    /// # Errors
    ///
    /// `BillingError::InvoiceNotDraft` past draft;
    /// `BillingError::LineItemNotFound` if no such line exists.
    pub fn remove_line(&mut self, line_id: Uuid) -> Result<(), BillingError> {
        self.ensure_draft()?;
        let index = self
            .line_items
            .iter()
            .position(|item| item.id == line_id)
            .ok_or_else(|| BillingError::LineItemNotFound(line_id.to_string()))?;
        self.line_items.remove(index);
        self.recalculate_totals();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Sets the tax rate and recomputes totals. Draft-only.
    pub fn set_tax_rate(&mut self, rate: Rate) -> Result<(), BillingError> {
        self.ensure_draft()?;
        self.tax_rate = rate;
        self.recalculate_totals();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Sets the flat discount and recomputes totals. Draft-only.
    ///
    /// # Errors
    ///
    /// `BillingError::CurrencyMismatch` if the discount currency differs.
    pub fn set_discount(&mut self, discount: Money) -> Result<(), BillingError> {
        self.ensure_draft()?;
        if discount.currency() != self.currency {
            return Err(BillingError::CurrencyMismatch(format!(
                "discount is {}, invoice is {}",
                discount.currency(),
                self.currency
            )));
        }
        self.discount_amount = discount;
        self.recalculate_totals();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Checks whether the status workflow permits a transition
    ///
    /// The table, with `paid` and `cancelled` terminal:
    ///
    /// | from    | allowed to                    |
    /// |---------|-------------------------------|
    /// | draft   | sent, cancelled               |
    /// | sent    | viewed, paid, overdue, cancelled |
    /// | viewed  | paid, overdue, cancelled      |
    /// | overdue | paid, cancelled               |
    pub fn can_transition_to(&self, to: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self.status, to),
            (Draft, Sent)
                | (Draft, Cancelled)
                | (Sent, Viewed)
                | (Sent, Paid)
                | (Sent, Overdue)
                | (Sent, Cancelled)
                | (Viewed, Paid)
                | (Viewed, Overdue)
                | (Viewed, Cancelled)
                | (Overdue, Paid)
                | (Overdue, Cancelled)
        )
    }

    /// Applies a status transition, stamping the matching timestamp
    ///
    /// `sent` sets `sent_at`, `viewed` sets `viewed_at`, `paid` sets
    /// `paid_at`. Emits an `InvoiceStatusChanged` event.
    ///
    /// # Errors
    ///
    /// `BillingError::InvalidStatusTransition` if the pair is not in the
    /// table; the invoice is left unchanged.
    pub fn update_status(&mut self, to: InvoiceStatus) -> Result<(), BillingError> {
        if !self.can_transition_to(to) {
            return Err(BillingError::invalid_transition(self.status, to));
        }

        let from = self.status;
        let now = Utc::now();
        self.status = to;
        match to {
            InvoiceStatus::Sent => self.sent_at = Some(now),
            InvoiceStatus::Viewed => self.viewed_at = Some(now),
            InvoiceStatus::Paid => self.paid_at = Some(now),
            _ => {}
        }
        self.updated_at = now;

        self.events.push(BillingEvent::InvoiceStatusChanged {
            tenant_id: self.tenant_id,
            invoice_id: self.id,
            schedule_id: self.schedule_id,
            from,
            to,
            occurred_at: now,
        });

        Ok(())
    }

    /// True when the due date has passed and the invoice is still open
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        today > self.due_date && !self.status.is_terminal()
    }

    /// Recomputes subtotal, tax, and total from the current lines
    ///
    /// total = subtotal + tax - discount, floored at zero so an oversized
    /// discount can never produce a negative invoice.
    fn recalculate_totals(&mut self) {
        self.subtotal = self
            .line_items
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

    fn ensure_draft(&self) -> Result<(), BillingError> {
        if self.status != InvoiceStatus::Draft {
            return Err(BillingError::InvoiceNotDraft);
        }
        Ok(())
    }
}

/// Generates a unique invoice number
fn generate_invoice_number() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("INV-{}", duration.as_millis() % 10_000_000_000)
}
