//! Port definitions for the billing domain
//!
//! # Architecture
//!
//! The billing domain defines two ports and owns no adapter code:
//!
//! - [`BillingStore`]: persistence for schedules and invoices, including
//!   the atomic generation commit
//! - [`ClientDirectory`]: read-only lookup of billing defaults from the
//!   client registry
//!
//! Adapters live in `infra_db` (PostgreSQL) and `test_utils` (in-memory).
//! The generator and lifecycle operations consume the traits only.
//!
//! # Tenancy
//!
//! Every method takes an [`OperationContext`]; implementations must scope
//! reads and writes to `ctx.tenant_id`. A row that exists under another
//! tenant is reported as not found, never leaked.
//!
//! # Concurrency
//!
//! Schedule writes use optimistic concurrency. [`BillingStore::update_schedule`]
//! and [`BillingStore::commit_generation`] compare the aggregate's version
//! against the stored row: on a match the row is written with the version
//! incremented, otherwise the call fails with [`PortError::Conflict`] and
//! the caller must re-read before retrying. [`BillingStore::claim_due_schedules`]
//! lets concurrent workers partition due schedules without double-claiming.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    ClientId, Currency, DomainPort, HealthCheckable, InvoiceId, OperationContext, PortError,
    ScheduleId,
};

use crate::invoice::{Invoice, InvoiceStatus};
use crate::schedule::RecurrenceSchedule;

/// Billing defaults for a client, as seen by the invoice generator
///
/// A projection of the client registry: enough to address an invoice and
/// fill in defaults the schedule does not override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingProfile {
    /// The client this profile describes
    pub client_id: ClientId,
    /// Display name used on invoices
    pub name: String,
    /// Default payment terms in days
    pub payment_terms_days: u16,
    /// Default invoicing currency
    pub currency: Currency,
    /// Whether the client can currently be billed
    pub is_active: bool,
}

/// Persistence port for schedules and invoices
#[async_trait]
pub trait BillingStore: DomainPort + HealthCheckable {
    /// Persists a new schedule
    ///
    /// # Errors
    ///
    /// `PortError::Conflict` if a schedule with the same ID already
    /// exists.
    async fn insert_schedule(
        &self,
        ctx: &OperationContext,
        schedule: &RecurrenceSchedule,
    ) -> Result<(), PortError>;

    /// Loads a schedule by ID
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if no schedule with that ID exists under
    /// the context tenant.
    async fn get_schedule(
        &self,
        ctx: &OperationContext,
        schedule_id: ScheduleId,
    ) -> Result<RecurrenceSchedule, PortError>;

    /// Persists schedule state under optimistic concurrency
    ///
    /// The stored row is replaced only when its version matches
    /// `schedule.version()`; the write stores `version + 1`.
    ///
    /// # Errors
    ///
    /// `PortError::Conflict` when a concurrent writer advanced the
    /// version first; the schedule must be re-read before retrying.
    async fn update_schedule(
        &self,
        ctx: &OperationContext,
        schedule: &RecurrenceSchedule,
    ) -> Result<(), PortError>;

    /// Claims up to `limit` schedules due on or before `as_of`
    ///
    /// Returns active schedules whose next run date has arrived, skipping
    /// any currently claimed by another worker. Each returned schedule is
    /// claimed for this caller until the next write or transaction end.
    async fn claim_due_schedules(
        &self,
        ctx: &OperationContext,
        as_of: NaiveDate,
        limit: u32,
    ) -> Result<Vec<RecurrenceSchedule>, PortError>;

    /// Atomically persists a generated invoice and the advanced schedule
    ///
    /// Either both the invoice (with its lines) and the schedule update
    /// are committed, or neither is. The schedule write carries the same
    /// version check as [`BillingStore::update_schedule`].
    ///
    /// # Errors
    ///
    /// `PortError::Conflict` when the schedule version no longer matches;
    /// nothing is persisted in that case.
    async fn commit_generation(
        &self,
        ctx: &OperationContext,
        invoice: &Invoice,
        schedule: &RecurrenceSchedule,
    ) -> Result<(), PortError>;

    /// Persists a standalone invoice
    async fn insert_invoice(
        &self,
        ctx: &OperationContext,
        invoice: &Invoice,
    ) -> Result<(), PortError>;

    /// Loads an invoice by ID
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if no invoice with that ID exists under the
    /// context tenant.
    async fn get_invoice(
        &self,
        ctx: &OperationContext,
        invoice_id: InvoiceId,
    ) -> Result<Invoice, PortError>;

    /// Transitions an invoice's status and returns the updated invoice
    ///
    /// Implementations load the invoice, apply the domain transition
    /// rules, and persist the result with its timestamps.
    ///
    /// # Errors
    ///
    /// `PortError::Validation` when the transition is not allowed from
    /// the invoice's current status.
    async fn update_invoice_status(
        &self,
        ctx: &OperationContext,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Invoice, PortError>;

    /// True when an invoice generated from `schedule_id` on `run_date`
    /// already exists
    ///
    /// The generator's idempotency probe: one invoice per schedule per
    /// run date.
    async fn invoice_exists_for_run(
        &self,
        ctx: &OperationContext,
        schedule_id: ScheduleId,
        run_date: NaiveDate,
    ) -> Result<bool, PortError>;
}

/// Extension methods for [`BillingStore`] implementations
#[async_trait]
pub trait BillingStoreExt: BillingStore {
    /// Checks whether a schedule exists without surfacing NotFound
    async fn schedule_exists(
        &self,
        ctx: &OperationContext,
        schedule_id: ScheduleId,
    ) -> Result<bool, PortError> {
        match self.get_schedule(ctx, schedule_id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Checks whether an invoice exists without surfacing NotFound
    async fn invoice_exists(
        &self,
        ctx: &OperationContext,
        invoice_id: InvoiceId,
    ) -> Result<bool, PortError> {
        match self.get_invoice(ctx, invoice_id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<T: BillingStore + ?Sized> BillingStoreExt for T {}

/// Read-only port into the client registry
///
/// The generator resolves the billed client through this port instead of
/// depending on the client domain crate directly.
#[async_trait]
pub trait ClientDirectory: DomainPort {
    /// Loads the billing profile for a client
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if the client does not exist under the
    /// context tenant.
    async fn billing_profile(
        &self,
        ctx: &OperationContext,
        client_id: ClientId,
    ) -> Result<BillingProfile, PortError>;
}
