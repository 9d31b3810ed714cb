//! Invoice generation from recurrence schedules
//!
//! The generator turns a due schedule into an invoice: it materializes the
//! template lines, resolves payment terms through the client registry, and
//! commits the invoice together with the advanced schedule in one atomic
//! store call. Failure before the commit leaves both the store and the
//! caller's schedule untouched, so a crashed run can simply be retried.
//!
//! Sweeps over all due schedules go through [`InvoiceGenerator::run_due`],
//! which claims a batch from the store and processes each schedule
//! independently: one failing schedule is logged and skipped, never
//! aborting the rest of the sweep.

use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use core_kernel::{Clock, OperationContext};

use crate::error::BillingError;
use crate::events::BillingEvent;
use crate::invoice::{Invoice, InvoiceStatus, LineItem};
use crate::ports::{BillingStore, ClientDirectory};
use crate::schedule::{GenerationOutcome, RecurrenceSchedule};

/// The product of one successful generation
#[derive(Debug, Clone)]
pub struct GeneratedInvoice {
    /// The invoice that was committed
    pub invoice: Invoice,
    /// The schedule with its counters and next run date advanced
    pub schedule: RecurrenceSchedule,
    /// Whether the schedule continues or completed on this run
    pub outcome: GenerationOutcome,
}

/// Summary of one [`InvoiceGenerator::run_due`] sweep
#[derive(Debug, Clone)]
pub struct GenerationRun {
    /// The date the sweep ran as
    pub as_of: chrono::NaiveDate,
    /// Schedules that produced an invoice
    pub generated: u32,
    /// Schedules skipped by a precondition or the idempotency probe
    pub skipped: u32,
    /// Schedules whose generation failed
    pub failed: u32,
    /// IDs of the invoices generated during the sweep
    pub invoice_ids: Vec<core_kernel::InvoiceId>,
}

/// Generates invoices from due recurrence schedules
///
/// Holds the two ports and a clock; all date arithmetic runs off
/// [`Clock::today`] so tests can pin the generation date.
pub struct InvoiceGenerator {
    store: Arc<dyn BillingStore>,
    clients: Arc<dyn ClientDirectory>,
    clock: Arc<dyn Clock>,
}

impl InvoiceGenerator {
    /// Creates a generator over the given ports
    pub fn new(
        store: Arc<dyn BillingStore>,
        clients: Arc<dyn ClientDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clients,
            clock,
        }
    }

    /// Generates one invoice from a schedule, if it is eligible
    ///
    /// Returns `Ok(None)` when a precondition fails (schedule not active,
    /// past its bounds) or when an invoice for this schedule and run date
    /// already exists. The caller's schedule is never mutated; the
    /// advanced copy is returned inside [`GeneratedInvoice`].
    ///
    /// # Errors
    ///
    /// - `BillingError::TenantMismatch` when the schedule belongs to a
    ///   different tenant than the context
    /// - `BillingError::ClientNotBillable` when the client is missing or
    ///   inactive
    /// - `BillingError::Port` when a store call fails; a Conflict means
    ///   another worker committed this run first
    pub async fn generate(
        &self,
        ctx: &OperationContext,
        schedule: &RecurrenceSchedule,
    ) -> Result<Option<GeneratedInvoice>, BillingError> {
        if schedule.tenant_id() != ctx.tenant_id {
            return Err(BillingError::TenantMismatch);
        }

        if let Err(reason) = schedule.eligibility() {
            info!(
                schedule_id = %schedule.id(),
                reason = %reason,
                "skipping schedule"
            );
            return Ok(None);
        }

        let today = self.clock.today();

        if self
            .store
            .invoice_exists_for_run(ctx, schedule.id(), today)
            .await?
        {
            info!(
                schedule_id = %schedule.id(),
                run_date = %today,
                "invoice already generated for this run"
            );
            return Ok(None);
        }

        let profile = match self.clients.billing_profile(ctx, schedule.client_id()).await {
            Ok(profile) => profile,
            Err(e) if e.is_not_found() => {
                return Err(BillingError::ClientNotBillable(format!(
                    "client {} not found",
                    schedule.client_id()
                )));
            }
            Err(e) => return Err(BillingError::Port(e)),
        };
        if !profile.is_active {
            return Err(BillingError::ClientNotBillable(format!(
                "client {} is inactive",
                schedule.client_id()
            )));
        }

        let terms = schedule
            .payment_terms_days()
            .unwrap_or(profile.payment_terms_days);
        let due_date = today + Duration::days(i64::from(terms));

        let mut invoice = Invoice::new(
            schedule.tenant_id(),
            schedule.client_id(),
            today,
            due_date,
            schedule.currency(),
        );
        invoice.project_id = schedule.project_id();
        invoice.schedule_id = Some(schedule.id());
        invoice.set_tax_rate(schedule.tax_rate())?;
        invoice.set_discount(schedule.discount())?;
        for template in schedule.line_items() {
            invoice.add_line(LineItem::new(
                template.description.clone(),
                template.quantity,
                template.unit_price,
            ))?;
        }

        if schedule.auto_send() {
            invoice.update_status(InvoiceStatus::Sent)?;
            invoice.events.push(BillingEvent::InvoiceAutoSent {
                tenant_id: invoice.tenant_id,
                schedule_id: schedule.id(),
                invoice_id: invoice.id,
                occurred_at: invoice.updated_at,
            });
        }

        let mut advanced = schedule.clone();
        let outcome = advanced.record_generation(today, invoice.id);

        self.store.commit_generation(ctx, &invoice, &advanced).await?;

        info!(
            schedule_id = %schedule.id(),
            invoice_id = %invoice.id,
            occurrence = advanced.invoice_count(),
            completed = outcome.is_completed(),
            "invoice generated"
        );

        Ok(Some(GeneratedInvoice {
            invoice,
            schedule: advanced,
            outcome,
        }))
    }

    /// Claims and processes every schedule due as of today
    ///
    /// Each schedule is handled independently. A failure is counted and
    /// logged at `warn` but never aborts the sweep, so one bad schedule
    /// cannot starve the rest of the tenant's billing.
    ///
    /// # Errors
    ///
    /// Only the initial claim can fail the sweep; per-schedule errors are
    /// absorbed into [`GenerationRun::failed`].
    pub async fn run_due(
        &self,
        ctx: &OperationContext,
        limit: u32,
    ) -> Result<GenerationRun, BillingError> {
        let today = self.clock.today();
        let due = self.store.claim_due_schedules(ctx, today, limit).await?;

        let mut run = GenerationRun {
            as_of: today,
            generated: 0,
            skipped: 0,
            failed: 0,
            invoice_ids: Vec::new(),
        };

        for schedule in &due {
            match self.generate(ctx, schedule).await {
                Ok(Some(result)) => {
                    run.generated += 1;
                    run.invoice_ids.push(result.invoice.id);
                }
                Ok(None) => run.skipped += 1,
                Err(e) => {
                    run.failed += 1;
                    warn!(
                        schedule_id = %schedule.id(),
                        error = %e,
                        "schedule generation failed"
                    );
                }
            }
        }

        info!(
            as_of = %today,
            claimed = due.len(),
            generated = run.generated,
            skipped = run.skipped,
            failed = run.failed,
            "generation sweep finished"
        );

        Ok(run)
    }
}
