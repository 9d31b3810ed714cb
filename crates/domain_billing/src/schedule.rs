//! Recurrence schedule aggregate
//!
//! A schedule is the template plus cadence describing when and how an
//! invoice gets generated automatically. It owns the lifecycle counters
//! (occurrences generated, bounds) and the runtime state the generator
//! advances on every successful run.
//!
//! # State machine
//!
//! - Active -> Paused (via pause): next_run_date is frozen
//! - Paused -> Active (via resume): a stale next_run_date is re-advanced
//!   past the resume date; missed occurrences are skipped, not back-billed
//! - Active | Paused -> Cancelled (via cancel): next_run_date cleared
//! - Active -> Completed (inside record_generation, when the occurrence
//!   cap or end date is reached): next_run_date cleared
//!
//! `next_run_date` is `None` exactly when the status is Completed or
//! Cancelled; `invoice_count` never exceeds `max_occurrences`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use core_kernel::{ClientId, Currency, InvoiceId, Money, ProjectId, Rate, ScheduleId, TenantId};

use crate::cadence::Cadence;
use crate::error::BillingError;
use crate::events::BillingEvent;

/// Schedule lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    /// Eligible for generation when due
    Active,
    /// Temporarily suspended; next run date frozen
    Paused,
    /// Reached its occurrence cap or end date
    Completed,
    /// Explicitly cancelled
    Cancelled,
}

impl ScheduleStatus {
    /// All statuses
    pub const ALL: [ScheduleStatus; 4] = [
        ScheduleStatus::Active,
        ScheduleStatus::Paused,
        ScheduleStatus::Completed,
        ScheduleStatus::Cancelled,
    ];

    /// Returns the lowercase name used in storage and serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Active => "active",
            ScheduleStatus::Paused => "paused",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }

    /// True for states the schedule can never leave
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScheduleStatus::Completed | ScheduleStatus::Cancelled)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScheduleStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(ScheduleStatus::Active),
            "paused" => Ok(ScheduleStatus::Paused),
            "completed" => Ok(ScheduleStatus::Completed),
            "cancelled" => Ok(ScheduleStatus::Cancelled),
            other => Err(BillingError::invalid_schedule(format!(
                "unknown schedule status: {}",
                other
            ))),
        }
    }
}

/// Why a schedule was skipped rather than generated
///
/// These are the generator's preconditions; none of them is a crash.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Schedule is not in the Active state
    #[error("schedule status is {0}")]
    NotActive(ScheduleStatus),
    /// The next run date falls after the schedule's end date
    #[error("next run date falls after the schedule end date")]
    EndDateExceeded,
    /// invoice_count has reached max_occurrences
    #[error("occurrence cap reached")]
    OccurrenceCapReached,
}

/// A template line carried by the schedule and copied onto every
/// generated invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemTemplate {
    /// Description shown to the client
    pub description: String,
    /// Quantity
    pub quantity: Decimal,
    /// Price per unit
    pub unit_price: Money,
}

impl LineItemTemplate {
    /// Creates a new template line
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Money) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }
}

/// Result of recording a successful generation against a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The schedule stays active; next occurrence is scheduled
    Continuing { next_run_date: NaiveDate },
    /// The schedule reached its cap or end date and completed
    Completed,
}

impl GenerationOutcome {
    /// True when the generation completed the schedule
    pub fn is_completed(&self) -> bool {
        matches!(self, GenerationOutcome::Completed)
    }
}

/// A recurring invoice schedule within a tenant
///
/// Constructed through [`ScheduleBuilder`]; persisted state is rebuilt
/// through [`RecurrenceSchedule::restore`], which re-checks the
/// invariants. Runtime state is mutated only by the lifecycle operations
/// and [`RecurrenceSchedule::record_generation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceSchedule {
    /// Unique schedule identifier
    id: ScheduleId,
    /// Owning tenant
    tenant_id: TenantId,
    /// Client to bill
    client_id: ClientId,
    /// Related project, if any
    project_id: Option<ProjectId>,
    /// Human-readable title
    title: String,
    /// How often invoices are generated
    cadence: Cadence,
    /// First occurrence date
    start_date: NaiveDate,
    /// Generation stops after this date, if set
    end_date: Option<NaiveDate>,
    /// Generation stops after this many invoices, if set
    max_occurrences: Option<u32>,
    /// Invoices generated so far
    invoice_count: u32,
    /// Date of the next generation; None iff terminal
    next_run_date: Option<NaiveDate>,
    /// Date of the last successful generation
    last_run_date: Option<NaiveDate>,
    /// Current lifecycle status
    status: ScheduleStatus,
    /// Template lines copied onto every generated invoice
    line_items: Vec<LineItemTemplate>,
    /// Tax rate applied to generated invoices
    tax_rate: Rate,
    /// Flat discount applied to generated invoices
    discount: Money,
    /// Payment terms; when None the client default applies
    payment_terms_days: Option<u16>,
    /// Whether generated invoices are moved straight to sent
    auto_send: bool,
    /// The most recently generated invoice
    last_invoice_id: Option<InvoiceId>,
    /// Schedule currency; template and discount must match
    currency: Currency,
    /// Domain events to be published
    #[serde(skip)]
    events: Vec<BillingEvent>,
    /// Version for optimistic concurrency
    version: u32,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Last update timestamp
    updated_at: DateTime<Utc>,
}

impl RecurrenceSchedule {
    /// Returns the schedule ID
    pub fn id(&self) -> ScheduleId {
        self.id
    }

    /// Returns the owning tenant
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the billed client
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Returns the related project, if any
    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Returns the title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the cadence
    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    /// Returns the first occurrence date
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Returns the end date bound, if set
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Returns the occurrence cap, if set
    pub fn max_occurrences(&self) -> Option<u32> {
        self.max_occurrences
    }

    /// Returns how many invoices have been generated
    pub fn invoice_count(&self) -> u32 {
        self.invoice_count
    }

    /// Returns the date of the next generation; None iff terminal
    pub fn next_run_date(&self) -> Option<NaiveDate> {
        self.next_run_date
    }

    /// Returns the date of the last successful generation
    pub fn last_run_date(&self) -> Option<NaiveDate> {
        self.last_run_date
    }

    /// Returns the lifecycle status
    pub fn status(&self) -> ScheduleStatus {
        self.status
    }

    /// Returns the template lines
    pub fn line_items(&self) -> &[LineItemTemplate] {
        &self.line_items
    }

    /// Returns the tax rate
    pub fn tax_rate(&self) -> Rate {
        self.tax_rate
    }

    /// Returns the flat discount
    pub fn discount(&self) -> Money {
        self.discount
    }

    /// Returns the payment terms override, if set
    pub fn payment_terms_days(&self) -> Option<u16> {
        self.payment_terms_days
    }

    /// Whether generated invoices are sent automatically
    pub fn auto_send(&self) -> bool {
        self.auto_send
    }

    /// Returns the most recently generated invoice ID
    pub fn last_invoice_id(&self) -> Option<InvoiceId> {
        self.last_invoice_id
    }

    /// Returns the schedule currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns the optimistic concurrency version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns accumulated domain events and clears them
    pub fn take_events(&mut self) -> Vec<BillingEvent> {
        std::mem::take(&mut self.events)
    }

    /// Checks the generation preconditions
    ///
    /// # Errors
    ///
    /// The [`SkipReason`] explaining why the schedule cannot generate:
    /// not active, next run date past the end date, or occurrence cap
    /// reached. Callers treat these as a no-op, not a failure.
    pub fn eligibility(&self) -> Result<(), SkipReason> {
        if self.status != ScheduleStatus::Active {
            return Err(SkipReason::NotActive(self.status));
        }
        let next = match self.next_run_date {
            Some(date) => date,
            None => return Err(SkipReason::NotActive(self.status)),
        };
        if let Some(end) = self.end_date {
            if next > end {
                return Err(SkipReason::EndDateExceeded);
            }
        }
        if let Some(max) = self.max_occurrences {
            if self.invoice_count >= max {
                return Err(SkipReason::OccurrenceCapReached);
            }
        }
        Ok(())
    }

    /// True when the schedule is active and its next run date has arrived
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.status == ScheduleStatus::Active
            && self.next_run_date.map_or(false, |next| next <= today)
    }

    /// Pauses an active schedule, freezing its next run date
    ///
    /// # Errors
    ///
    /// `BillingError::InvalidStatusTransition` unless the schedule is
    /// Active.
    pub fn pause(&mut self) -> Result<(), BillingError> {
        if self.status != ScheduleStatus::Active {
            return Err(BillingError::invalid_transition(
                self.status,
                ScheduleStatus::Paused,
            ));
        }
        let now = Utc::now();
        self.status = ScheduleStatus::Paused;
        self.updated_at = now;
        self.events.push(BillingEvent::SchedulePaused {
            tenant_id: self.tenant_id,
            schedule_id: self.id,
            occurred_at: now,
        });
        Ok(())
    }

    /// Resumes a paused schedule
    ///
    /// A next run date that fell into the past while paused is advanced
    /// through the cadence until it lands strictly after `today`; the
    /// missed occurrences are skipped, not back-billed. A next run date
    /// of today or later is kept as-is.
    ///
    /// # Errors
    ///
    /// `BillingError::InvalidStatusTransition` unless the schedule is
    /// Paused.
    pub fn resume(&mut self, today: NaiveDate) -> Result<(), BillingError> {
        if self.status != ScheduleStatus::Paused {
            return Err(BillingError::invalid_transition(
                self.status,
                ScheduleStatus::Active,
            ));
        }
        if let Some(current) = self.next_run_date {
            if current < today {
                let mut next = current;
                while next <= today {
                    next = self.cadence.next_occurrence(next);
                }
                self.next_run_date = Some(next);
            }
        }

        let now = Utc::now();
        self.status = ScheduleStatus::Active;
        self.updated_at = now;
        self.events.push(BillingEvent::ScheduleResumed {
            tenant_id: self.tenant_id,
            schedule_id: self.id,
            next_run_date: self.next_run_date,
            occurred_at: now,
        });
        Ok(())
    }

    /// Cancels an active or paused schedule
    ///
    /// Clears the next run date; generated invoices are unaffected.
    ///
    /// # Errors
    ///
    /// `BillingError::InvalidStatusTransition` if the schedule is
    /// already Completed or Cancelled.
    pub fn cancel(&mut self) -> Result<(), BillingError> {
        if self.status.is_terminal() {
            return Err(BillingError::invalid_transition(
                self.status,
                ScheduleStatus::Cancelled,
            ));
        }
        let now = Utc::now();
        self.status = ScheduleStatus::Cancelled;
        self.next_run_date = None;
        self.updated_at = now;
        self.events.push(BillingEvent::ScheduleCancelled {
            tenant_id: self.tenant_id,
            schedule_id: self.id,
            occurred_at: now,
        });
        Ok(())
    }

    /// Records a successful invoice generation
    ///
    /// Increments the occurrence counter, stamps the run, and advances
    /// the next run date from the previous next run date (not from
    /// `today`, so anchored cadences stay on their anchor). When the
    /// occurrence cap is reached or the new date falls past the end
    /// date, the schedule completes and the next run date is cleared.
    pub fn record_generation(
        &mut self,
        today: NaiveDate,
        invoice_id: InvoiceId,
    ) -> GenerationOutcome {
        let now = Utc::now();
        let base = self.next_run_date.unwrap_or(today);

        self.invoice_count += 1;
        self.last_run_date = Some(today);
        self.last_invoice_id = Some(invoice_id);
        self.events.push(BillingEvent::InvoiceGenerated {
            tenant_id: self.tenant_id,
            schedule_id: self.id,
            invoice_id,
            occurrence: self.invoice_count,
            occurred_at: now,
        });

        let advanced = self.cadence.next_occurrence(base);
        let cap_reached = self
            .max_occurrences
            .map_or(false, |max| self.invoice_count >= max);
        let past_end = self.end_date.map_or(false, |end| advanced > end);

        self.updated_at = now;
        if cap_reached || past_end {
            self.status = ScheduleStatus::Completed;
            self.next_run_date = None;
            self.events.push(BillingEvent::ScheduleCompleted {
                tenant_id: self.tenant_id,
                schedule_id: self.id,
                total_invoices: self.invoice_count,
                occurred_at: now,
            });
            GenerationOutcome::Completed
        } else {
            self.next_run_date = Some(advanced);
            GenerationOutcome::Continuing {
                next_run_date: advanced,
            }
        }
    }

    /// Rebuilds a schedule from persisted state
    ///
    /// # Errors
    ///
    /// `BillingError::InvalidSchedule` when the snapshot violates an
    /// invariant: a missing next run date on a non-terminal schedule (or
    /// vice versa), an invoice count above the occurrence cap, or a zero
    /// version.
    pub fn restore(snapshot: ScheduleSnapshot) -> Result<Self, BillingError> {
        match (snapshot.next_run_date, snapshot.status.is_terminal()) {
            (None, false) => {
                return Err(BillingError::invalid_schedule(
                    "non-terminal schedule must have a next run date",
                ));
            }
            (Some(_), true) => {
                return Err(BillingError::invalid_schedule(
                    "terminal schedule cannot have a next run date",
                ));
            }
            _ => {}
        }
        if let Some(max) = snapshot.max_occurrences {
            if snapshot.invoice_count > max {
                return Err(BillingError::invalid_schedule(
                    "invoice_count exceeds max_occurrences",
                ));
            }
        }
        if snapshot.version == 0 {
            return Err(BillingError::invalid_schedule("version must be at least 1"));
        }
        validate_currency_uniformity(
            snapshot.currency,
            &snapshot.line_items,
            &snapshot.discount,
        )?;

        Ok(Self {
            id: snapshot.id,
            tenant_id: snapshot.tenant_id,
            client_id: snapshot.client_id,
            project_id: snapshot.project_id,
            title: snapshot.title,
            cadence: snapshot.cadence,
            start_date: snapshot.start_date,
            end_date: snapshot.end_date,
            max_occurrences: snapshot.max_occurrences,
            invoice_count: snapshot.invoice_count,
            next_run_date: snapshot.next_run_date,
            last_run_date: snapshot.last_run_date,
            status: snapshot.status,
            line_items: snapshot.line_items,
            tax_rate: snapshot.tax_rate,
            discount: snapshot.discount,
            payment_terms_days: snapshot.payment_terms_days,
            auto_send: snapshot.auto_send,
            last_invoice_id: snapshot.last_invoice_id,
            currency: snapshot.currency,
            events: Vec::new(),
            version: snapshot.version,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        })
    }
}

/// Plain data for rebuilding a persisted schedule
///
/// Produced by storage adapters and test builders; consumed by
/// [`RecurrenceSchedule::restore`].
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    pub id: ScheduleId,
    pub tenant_id: TenantId,
    pub client_id: ClientId,
    pub project_id: Option<ProjectId>,
    pub title: String,
    pub cadence: Cadence,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub max_occurrences: Option<u32>,
    pub invoice_count: u32,
    pub next_run_date: Option<NaiveDate>,
    pub last_run_date: Option<NaiveDate>,
    pub status: ScheduleStatus,
    pub line_items: Vec<LineItemTemplate>,
    pub tax_rate: Rate,
    pub discount: Money,
    pub payment_terms_days: Option<u16>,
    pub auto_send: bool,
    pub last_invoice_id: Option<InvoiceId>,
    pub currency: Currency,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Builder for new recurrence schedules
///
/// Validates eagerly in [`ScheduleBuilder::build`] and seeds the runtime
/// state: the first run is the start date.
///
/// # Example
///
/// ```rust
/// use domain_billing::cadence::{Cadence, Frequency};
/// use domain_billing::schedule::{LineItemTemplate, ScheduleBuilder};
/// use core_kernel::{ClientId, Currency, Money, TenantId};
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
///
/// let schedule = ScheduleBuilder::new()
///     .tenant(TenantId::new_v7())
///     .client(ClientId::new_v7())
///     .title("Monthly retainer")
///     .cadence(Cadence::new(Frequency::Monthly, 1).unwrap())
///     .start_date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
///     .add_item(LineItemTemplate::new(
///         "Retainer",
///         dec!(1),
///         Money::new(dec!(500), Currency::USD),
///     ))
///     .build()
///     .unwrap();
///
/// assert_eq!(schedule.invoice_count(), 0);
/// assert_eq!(schedule.next_run_date(), Some(schedule.start_date()));
/// ```
#[derive(Debug, Clone)]
pub struct ScheduleBuilder {
    tenant_id: Option<TenantId>,
    client_id: Option<ClientId>,
    project_id: Option<ProjectId>,
    title: Option<String>,
    cadence: Option<Cadence>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    max_occurrences: Option<u32>,
    line_items: Vec<LineItemTemplate>,
    tax_rate: Rate,
    discount: Option<Money>,
    payment_terms_days: Option<u16>,
    auto_send: bool,
    currency: Currency,
}

impl ScheduleBuilder {
    /// Creates a builder with USD currency and no bounds
    pub fn new() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            project_id: None,
            title: None,
            cadence: None,
            start_date: None,
            end_date: None,
            max_occurrences: None,
            line_items: Vec::new(),
            tax_rate: Rate::zero(),
            discount: None,
            payment_terms_days: None,
            auto_send: false,
            currency: Currency::USD,
        }
    }

    /// Sets the owning tenant
    pub fn tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Sets the client to bill
    pub fn client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Sets the related project
    pub fn project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Sets the title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the cadence
    pub fn cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = Some(cadence);
        self
    }

    /// Sets the first occurrence date
    pub fn start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Sets the end date bound
    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Sets the occurrence cap
    pub fn max_occurrences(mut self, max: u32) -> Self {
        self.max_occurrences = Some(max);
        self
    }

    /// Adds a template line
    pub fn add_item(mut self, item: LineItemTemplate) -> Self {
        self.line_items.push(item);
        self
    }

    /// Replaces the template lines
    pub fn items(mut self, items: Vec<LineItemTemplate>) -> Self {
        self.line_items = items;
        self
    }

    /// Sets the tax rate
    pub fn tax_rate(mut self, rate: Rate) -> Self {
        self.tax_rate = rate;
        self
    }

    /// Sets the flat discount
    pub fn discount(mut self, discount: Money) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Sets the payment terms override
    pub fn payment_terms_days(mut self, days: u16) -> Self {
        self.payment_terms_days = Some(days);
        self
    }

    /// Sends generated invoices automatically
    pub fn auto_send(mut self, auto_send: bool) -> Self {
        self.auto_send = auto_send;
        self
    }

    /// Sets the schedule currency
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Builds the schedule
    ///
    /// # Errors
    ///
    /// `BillingError::MissingRequiredField` for absent tenant, client,
    /// title, cadence, or start date; `BillingError::InvalidSchedule`
    /// for an empty title or template, a zero occurrence cap, or an end
    /// date before the start date; `BillingError::CurrencyMismatch`
    /// when template lines or the discount disagree with the schedule
    /// currency.
    pub fn build(self) -> Result<RecurrenceSchedule, BillingError> {
        let tenant_id = self
            .tenant_id
            .ok_or_else(|| BillingError::MissingRequiredField("tenant_id".to_string()))?;
        let client_id = self
            .client_id
            .ok_or_else(|| BillingError::MissingRequiredField("client_id".to_string()))?;
        let title = self
            .title
            .ok_or_else(|| BillingError::MissingRequiredField("title".to_string()))?;
        let cadence = self
            .cadence
            .ok_or_else(|| BillingError::MissingRequiredField("cadence".to_string()))?;
        let start_date = self
            .start_date
            .ok_or_else(|| BillingError::MissingRequiredField("start_date".to_string()))?;

        if title.trim().is_empty() {
            return Err(BillingError::invalid_schedule("title must not be empty"));
        }
        if self.line_items.is_empty() {
            return Err(BillingError::invalid_schedule(
                "at least one line item template is required",
            ));
        }
        if let Some(end) = self.end_date {
            if end < start_date {
                return Err(BillingError::invalid_schedule(
                    "end_date must not be before start_date",
                ));
            }
        }
        if self.max_occurrences == Some(0) {
            return Err(BillingError::invalid_schedule(
                "max_occurrences must be at least 1",
            ));
        }

        let discount = self
            .discount
            .unwrap_or_else(|| Money::zero(self.currency));
        validate_currency_uniformity(self.currency, &self.line_items, &discount)?;

        let now = Utc::now();
        let id = ScheduleId::new_v7();

        Ok(RecurrenceSchedule {
            id,
            tenant_id,
            client_id,
            project_id: self.project_id,
            title,
            cadence,
            start_date,
            end_date: self.end_date,
            max_occurrences: self.max_occurrences,
            invoice_count: 0,
            next_run_date: Some(start_date),
            last_run_date: None,
            status: ScheduleStatus::Active,
            line_items: self.line_items,
            tax_rate: self.tax_rate,
            discount,
            payment_terms_days: self.payment_terms_days,
            auto_send: self.auto_send,
            last_invoice_id: None,
            currency: self.currency,
            events: vec![BillingEvent::ScheduleCreated {
                tenant_id,
                schedule_id: id,
                start_date,
                occurred_at: now,
            }],
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Default for ScheduleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that the template and discount share the schedule currency
fn validate_currency_uniformity(
    currency: Currency,
    line_items: &[LineItemTemplate],
    discount: &Money,
) -> Result<(), BillingError> {
    for item in line_items {
        if item.unit_price.currency() != currency {
            return Err(BillingError::CurrencyMismatch(format!(
                "template line '{}' is {}, schedule is {}",
                item.description,
                item.unit_price.currency(),
                currency
            )));
        }
    }
    if discount.currency() != currency {
        return Err(BillingError::CurrencyMismatch(format!(
            "discount is {}, schedule is {}",
            discount.currency(),
            currency
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::Frequency;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_on_31() -> Cadence {
        Cadence::new(Frequency::Monthly, 1)
            .unwrap()
            .with_day_of_month(31)
            .unwrap()
    }

    fn builder() -> ScheduleBuilder {
        ScheduleBuilder::new()
            .tenant(TenantId::new_v7())
            .client(ClientId::new_v7())
            .title("Monthly retainer")
            .cadence(monthly_on_31())
            .start_date(date(2024, 1, 31))
            .add_item(LineItemTemplate::new(
                "Retainer",
                dec!(1),
                Money::new(dec!(500), Currency::USD),
            ))
    }

    #[test]
    fn test_build_seeds_runtime_state() {
        let mut schedule = builder().build().unwrap();

        assert_eq!(schedule.status(), ScheduleStatus::Active);
        assert_eq!(schedule.invoice_count(), 0);
        assert_eq!(schedule.next_run_date(), Some(date(2024, 1, 31)));
        assert_eq!(schedule.last_run_date(), None);
        assert_eq!(schedule.version(), 1);

        let events = schedule.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "ScheduleCreated");
    }

    #[test]
    fn test_build_requires_core_fields() {
        let result = ScheduleBuilder::new().build();
        assert!(matches!(
            result,
            Err(BillingError::MissingRequiredField(_))
        ));
    }

    #[test]
    fn test_build_rejects_empty_template() {
        let result = builder().items(Vec::new()).build();
        assert!(matches!(result, Err(BillingError::InvalidSchedule(_))));
    }

    #[test]
    fn test_build_rejects_end_before_start() {
        let result = builder().end_date(date(2024, 1, 1)).build();
        assert!(matches!(result, Err(BillingError::InvalidSchedule(_))));
    }

    #[test]
    fn test_build_rejects_currency_mismatch() {
        let result = builder()
            .add_item(LineItemTemplate::new(
                "Euros",
                dec!(1),
                Money::new(dec!(10), Currency::EUR),
            ))
            .build();
        assert!(matches!(result, Err(BillingError::CurrencyMismatch(_))));

        let result = builder()
            .discount(Money::new(dec!(5), Currency::EUR))
            .build();
        assert!(matches!(result, Err(BillingError::CurrencyMismatch(_))));
    }

    #[test]
    fn test_eligibility_and_dueness() {
        let schedule = builder().build().unwrap();

        assert!(schedule.eligibility().is_ok());
        assert!(!schedule.is_due(date(2024, 1, 30)));
        assert!(schedule.is_due(date(2024, 1, 31)));
        assert!(schedule.is_due(date(2024, 2, 15)));
    }

    #[test]
    fn test_eligibility_respects_cap() {
        let mut schedule = builder().max_occurrences(1).build().unwrap();
        schedule.record_generation(date(2024, 1, 31), InvoiceId::new_v7());

        assert_eq!(
            schedule.eligibility(),
            Err(SkipReason::NotActive(ScheduleStatus::Completed))
        );
    }

    #[test]
    fn test_eligibility_respects_end_date() {
        let mut schedule = builder().end_date(date(2024, 2, 15)).build().unwrap();
        // First run is within bounds; the advanced date 2024-02-29 is not.
        let outcome = schedule.record_generation(date(2024, 1, 31), InvoiceId::new_v7());
        assert!(outcome.is_completed());
        assert_eq!(schedule.status(), ScheduleStatus::Completed);
        assert_eq!(schedule.next_run_date(), None);
    }

    #[test]
    fn test_record_generation_advances_from_previous_next() {
        let mut schedule = builder().build().unwrap();
        let invoice_id = InvoiceId::new_v7();

        // Run late: today is past the scheduled date, but the cadence
        // advances from the scheduled date to stay on its anchor.
        let outcome = schedule.record_generation(date(2024, 2, 5), invoice_id);

        assert_eq!(schedule.invoice_count(), 1);
        assert_eq!(schedule.last_run_date(), Some(date(2024, 2, 5)));
        assert_eq!(schedule.last_invoice_id(), Some(invoice_id));
        assert_eq!(schedule.next_run_date(), Some(date(2024, 2, 29)));
        assert_eq!(
            outcome,
            GenerationOutcome::Continuing {
                next_run_date: date(2024, 2, 29)
            }
        );
    }

    #[test]
    fn test_occurrence_cap_scenario() {
        let mut schedule = builder().max_occurrences(2).build().unwrap();

        let first = schedule.record_generation(date(2024, 1, 31), InvoiceId::new_v7());
        assert_eq!(schedule.invoice_count(), 1);
        assert_eq!(schedule.next_run_date(), Some(date(2024, 2, 29)));
        assert!(!first.is_completed());

        let second = schedule.record_generation(date(2024, 2, 29), InvoiceId::new_v7());
        assert_eq!(schedule.invoice_count(), 2);
        assert_eq!(schedule.next_run_date(), None);
        assert_eq!(schedule.status(), ScheduleStatus::Completed);
        assert!(second.is_completed());

        let events = schedule.take_events();
        assert!(events
            .iter()
            .any(|e| e.event_type() == "ScheduleCompleted"));
    }

    #[test]
    fn test_pause_freezes_next_run_date() {
        let mut schedule = builder().build().unwrap();
        schedule.pause().unwrap();

        assert_eq!(schedule.status(), ScheduleStatus::Paused);
        assert_eq!(schedule.next_run_date(), Some(date(2024, 1, 31)));

        // Pausing twice is rejected
        assert!(matches!(
            schedule.pause(),
            Err(BillingError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_resume_keeps_future_date() {
        let mut schedule = builder().build().unwrap();
        schedule.pause().unwrap();
        schedule.resume(date(2024, 1, 15)).unwrap();

        assert_eq!(schedule.status(), ScheduleStatus::Active);
        assert_eq!(schedule.next_run_date(), Some(date(2024, 1, 31)));
    }

    #[test]
    fn test_resume_advances_stale_date_past_today() {
        let mut schedule = builder().build().unwrap();
        schedule.pause().unwrap();

        // Resumed long after the frozen date: catch up past today.
        schedule.resume(date(2024, 4, 10)).unwrap();

        assert_eq!(schedule.next_run_date(), Some(date(2024, 4, 30)));
        assert!(schedule.next_run_date().unwrap() > date(2024, 4, 10));
    }

    #[test]
    fn test_cancel_clears_next_run_date() {
        let mut schedule = builder().build().unwrap();
        schedule.cancel().unwrap();

        assert_eq!(schedule.status(), ScheduleStatus::Cancelled);
        assert_eq!(schedule.next_run_date(), None);

        assert!(matches!(
            schedule.cancel(),
            Err(BillingError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_from_paused() {
        let mut schedule = builder().build().unwrap();
        schedule.pause().unwrap();
        schedule.cancel().unwrap();
        assert_eq!(schedule.status(), ScheduleStatus::Cancelled);
    }

    #[test]
    fn test_lifecycle_events() {
        let mut schedule = builder().build().unwrap();
        schedule.take_events();

        schedule.pause().unwrap();
        schedule.resume(date(2024, 1, 15)).unwrap();
        schedule.cancel().unwrap();

        let types: Vec<_> = schedule
            .take_events()
            .into_iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            types,
            vec!["SchedulePaused", "ScheduleResumed", "ScheduleCancelled"]
        );
    }

    #[test]
    fn test_restore_round_trip() {
        let schedule = builder().build().unwrap();
        let snapshot = ScheduleSnapshot {
            id: schedule.id(),
            tenant_id: schedule.tenant_id(),
            client_id: schedule.client_id(),
            project_id: schedule.project_id(),
            title: schedule.title().to_string(),
            cadence: *schedule.cadence(),
            start_date: schedule.start_date(),
            end_date: schedule.end_date(),
            max_occurrences: schedule.max_occurrences(),
            invoice_count: schedule.invoice_count(),
            next_run_date: schedule.next_run_date(),
            last_run_date: schedule.last_run_date(),
            status: schedule.status(),
            line_items: schedule.line_items().to_vec(),
            tax_rate: schedule.tax_rate(),
            discount: schedule.discount(),
            payment_terms_days: schedule.payment_terms_days(),
            auto_send: schedule.auto_send(),
            last_invoice_id: schedule.last_invoice_id(),
            currency: schedule.currency(),
            version: schedule.version(),
            created_at: schedule.created_at(),
            updated_at: schedule.updated_at(),
        };

        let restored = RecurrenceSchedule::restore(snapshot).unwrap();
        assert_eq!(restored.id(), schedule.id());
        assert_eq!(restored.next_run_date(), schedule.next_run_date());
    }

    #[test]
    fn test_restore_rejects_invariant_violations() {
        let schedule = builder().build().unwrap();
        let base = ScheduleSnapshot {
            id: schedule.id(),
            tenant_id: schedule.tenant_id(),
            client_id: schedule.client_id(),
            project_id: None,
            title: schedule.title().to_string(),
            cadence: *schedule.cadence(),
            start_date: schedule.start_date(),
            end_date: None,
            max_occurrences: Some(2),
            invoice_count: 0,
            next_run_date: Some(schedule.start_date()),
            last_run_date: None,
            status: ScheduleStatus::Active,
            line_items: schedule.line_items().to_vec(),
            tax_rate: schedule.tax_rate(),
            discount: schedule.discount(),
            payment_terms_days: None,
            auto_send: false,
            last_invoice_id: None,
            currency: schedule.currency(),
            version: 1,
            created_at: schedule.created_at(),
            updated_at: schedule.updated_at(),
        };

        // Active without a next run date
        let mut bad = base.clone();
        bad.next_run_date = None;
        assert!(RecurrenceSchedule::restore(bad).is_err());

        // Completed with a lingering next run date
        let mut bad = base.clone();
        bad.status = ScheduleStatus::Completed;
        assert!(RecurrenceSchedule::restore(bad).is_err());

        // Count above the cap
        let mut bad = base.clone();
        bad.invoice_count = 3;
        assert!(RecurrenceSchedule::restore(bad).is_err());

        // Zero version
        let mut bad = base;
        bad.version = 0;
        assert!(RecurrenceSchedule::restore(bad).is_err());
    }
}
