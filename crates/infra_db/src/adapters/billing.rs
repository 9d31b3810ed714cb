//! PostgreSQL Billing Adapter
//!
//! This module provides the database adapter for the billing domain,
//! implementing the `BillingStore` trait over the schedule and invoice
//! repositories.
//!
//! # Overview
//!
//! The `PostgresBillingAdapter` serves as the bridge between the billing
//! domain's port interface and the database layer. It:
//!
//! - Maps domain aggregates to raw rows and back
//! - Runs `commit_generation` as a single transaction so an invoice and its
//!   schedule advance are persisted together or not at all
//! - Translates database errors to port errors
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBillingAdapter;
//! use domain_billing::BillingStore;
//! use std::sync::Arc;
//!
//! let adapter = PostgresBillingAdapter::new(pool);
//! let store: Arc<dyn BillingStore> = Arc::new(adapter);
//! let schedule = store.get_schedule(&ctx, schedule_id).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, ClientId, Currency, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId,
    Money, OperationContext, PortError, ProjectId, Rate, ScheduleId, TenantId,
};
use domain_billing::{
    BillingStore, Cadence, Frequency, Invoice, InvoiceStatus, LineItem, LineItemTemplate,
    RecurrenceSchedule, ScheduleSnapshot,
};

use crate::error::DatabaseError;
use crate::repositories::invoices::{InvoiceItemRow, InvoiceRepository, InvoiceRow};
use crate::repositories::schedules::{ScheduleItemRow, ScheduleRepository, ScheduleRow};

/// PostgreSQL-backed implementation of the BillingStore trait
///
/// # Concurrency
///
/// Schedule writes go through the repository's version guard: the stored
/// row is replaced only when its version matches the version the caller
/// read, and the write stores version + 1. A guard miss surfaces as
/// `PortError::Conflict`.
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants through the
/// `DatabaseError` mapping: not-found stays not-found, duplicates and
/// version misses become `Conflict`, transient failures become
/// `Connection`.
#[derive(Debug, Clone)]
pub struct PostgresBillingAdapter {
    schedules: ScheduleRepository,
    invoices: InvoiceRepository,
    pool: PgPool,
}

impl PostgresBillingAdapter {
    /// Creates a new PostgreSQL billing adapter
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            schedules: ScheduleRepository::new(pool.clone()),
            invoices: InvoiceRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresBillingAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBillingAdapter {
    /// Checks database connectivity
    ///
    /// Performs a simple SELECT 1 query to verify the connection pool
    /// is operational and the database is responsive.
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-billing-adapter".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-billing-adapter".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl BillingStore for PostgresBillingAdapter {
    #[instrument(skip(self, ctx, schedule), fields(tenant_id = %ctx.tenant_id, schedule_id = %schedule.id()))]
    async fn insert_schedule(
        &self,
        ctx: &OperationContext,
        schedule: &RecurrenceSchedule,
    ) -> Result<(), PortError> {
        debug!("Inserting schedule");
        guard_tenant(ctx, schedule.tenant_id(), "schedule")?;

        let row = schedule_to_row(schedule);
        let items = schedule_item_rows(schedule);
        self.schedules
            .insert(&row, &items)
            .await
            .map_err(PortError::from)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, schedule_id = %schedule_id))]
    async fn get_schedule(
        &self,
        ctx: &OperationContext,
        schedule_id: ScheduleId,
    ) -> Result<RecurrenceSchedule, PortError> {
        debug!("Fetching schedule");

        let (row, items) = self
            .schedules
            .fetch(*ctx.tenant_id.as_uuid(), *schedule_id.as_uuid())
            .await
            .map_err(PortError::from)?;

        row_to_schedule(row, items)
    }

    #[instrument(skip(self, ctx, schedule), fields(tenant_id = %ctx.tenant_id, schedule_id = %schedule.id(), version = schedule.version()))]
    async fn update_schedule(
        &self,
        ctx: &OperationContext,
        schedule: &RecurrenceSchedule,
    ) -> Result<(), PortError> {
        debug!("Updating schedule");
        guard_tenant(ctx, schedule.tenant_id(), "schedule")?;

        let row = schedule_to_row(schedule);
        let items = schedule_item_rows(schedule);
        self.schedules
            .update(&row, &items, schedule.version() as i32)
            .await
            .map_err(PortError::from)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, as_of = %as_of, limit))]
    async fn claim_due_schedules(
        &self,
        ctx: &OperationContext,
        as_of: NaiveDate,
        limit: u32,
    ) -> Result<Vec<RecurrenceSchedule>, PortError> {
        debug!("Claiming due schedules");

        let tenant = *ctx.tenant_id.as_uuid();
        let rows = self
            .schedules
            .list_due(tenant, as_of, i64::from(limit))
            .await
            .map_err(PortError::from)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items_by_schedule: HashMap<Uuid, Vec<ScheduleItemRow>> = HashMap::new();
        for item in self
            .schedules
            .fetch_items(tenant, &ids)
            .await
            .map_err(PortError::from)?
        {
            items_by_schedule
                .entry(item.schedule_id)
                .or_default()
                .push(item);
        }

        let mut schedules = Vec::with_capacity(rows.len());
        for row in rows {
            let items = items_by_schedule.remove(&row.id).unwrap_or_default();
            schedules.push(row_to_schedule(row, items)?);
        }

        debug!(count = schedules.len(), "Claimed due schedules");
        Ok(schedules)
    }

    #[instrument(skip(self, ctx, invoice, schedule), fields(tenant_id = %ctx.tenant_id, schedule_id = %schedule.id(), invoice_id = %invoice.id))]
    async fn commit_generation(
        &self,
        ctx: &OperationContext,
        invoice: &Invoice,
        schedule: &RecurrenceSchedule,
    ) -> Result<(), PortError> {
        debug!("Committing generated invoice and schedule advance");
        guard_tenant(ctx, schedule.tenant_id(), "schedule")?;
        guard_tenant(ctx, invoice.tenant_id, "invoice")?;

        let (invoice_row, invoice_items) = invoice_to_rows(invoice);
        let schedule_row = schedule_to_row(schedule);
        let schedule_items = schedule_item_rows(schedule);

        // One transaction: a version miss on the schedule rolls back the
        // invoice insert as well
        let mut tx = self.pool.begin().await.map_err(sql_to_port)?;
        InvoiceRepository::insert_on(&mut tx, &invoice_row, &invoice_items)
            .await
            .map_err(PortError::from)?;
        ScheduleRepository::update_on(
            &mut tx,
            &schedule_row,
            &schedule_items,
            schedule.version() as i32,
        )
        .await
        .map_err(PortError::from)?;
        tx.commit().await.map_err(sql_to_port)?;

        Ok(())
    }

    #[instrument(skip(self, ctx, invoice), fields(tenant_id = %ctx.tenant_id, invoice_id = %invoice.id))]
    async fn insert_invoice(
        &self,
        ctx: &OperationContext,
        invoice: &Invoice,
    ) -> Result<(), PortError> {
        debug!("Inserting invoice");
        guard_tenant(ctx, invoice.tenant_id, "invoice")?;

        let (row, items) = invoice_to_rows(invoice);
        self.invoices
            .insert(&row, &items)
            .await
            .map_err(PortError::from)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, invoice_id = %invoice_id))]
    async fn get_invoice(
        &self,
        ctx: &OperationContext,
        invoice_id: InvoiceId,
    ) -> Result<Invoice, PortError> {
        debug!("Fetching invoice");

        let (row, items) = self
            .invoices
            .fetch(*ctx.tenant_id.as_uuid(), *invoice_id.as_uuid())
            .await
            .map_err(PortError::from)?;

        row_to_invoice(row, items)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, invoice_id = %invoice_id, status = %status))]
    async fn update_invoice_status(
        &self,
        ctx: &OperationContext,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Invoice, PortError> {
        debug!("Updating invoice status");

        // The domain validates the transition and stamps the lifecycle
        // timestamps; the repository persists the result
        let mut invoice = self.get_invoice(ctx, invoice_id).await?;
        invoice.update_status(status)?;

        self.invoices
            .update_status(
                *ctx.tenant_id.as_uuid(),
                *invoice_id.as_uuid(),
                invoice.status.as_str(),
                invoice.sent_at,
                invoice.viewed_at,
                invoice.paid_at,
                invoice.updated_at,
            )
            .await
            .map_err(PortError::from)?;

        Ok(invoice)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, schedule_id = %schedule_id, run_date = %run_date))]
    async fn invoice_exists_for_run(
        &self,
        ctx: &OperationContext,
        schedule_id: ScheduleId,
        run_date: NaiveDate,
    ) -> Result<bool, PortError> {
        debug!("Probing for existing invoice run");

        self.invoices
            .exists_for_run(*ctx.tenant_id.as_uuid(), *schedule_id.as_uuid(), run_date)
            .await
            .map_err(PortError::from)
    }
}

// =============================================================================
// Conversion Functions
// =============================================================================

/// Rejects writes whose aggregate belongs to a different tenant than the
/// operation context
fn guard_tenant(ctx: &OperationContext, owner: TenantId, entity: &str) -> Result<(), PortError> {
    if owner != ctx.tenant_id {
        return Err(PortError::validation(format!(
            "{} belongs to a different tenant",
            entity
        )));
    }
    Ok(())
}

/// Converts a pool-level error to a port error
fn sql_to_port(e: sqlx::Error) -> PortError {
    PortError::from(DatabaseError::from(e))
}

/// Flags a stored row that no longer satisfies the domain's invariants
fn corrupt_row(entity: &str, id: Uuid, detail: impl std::fmt::Display) -> PortError {
    PortError::internal(format!("corrupt {} row {}: {}", entity, id, detail))
}

/// Converts a schedule aggregate to its database row
fn schedule_to_row(schedule: &RecurrenceSchedule) -> ScheduleRow {
    let cadence = schedule.cadence();
    ScheduleRow {
        id: *schedule.id().as_uuid(),
        tenant_id: *schedule.tenant_id().as_uuid(),
        client_id: *schedule.client_id().as_uuid(),
        project_id: schedule.project_id().map(|id| *id.as_uuid()),
        title: schedule.title().to_string(),
        frequency: cadence.frequency().as_str().to_string(),
        interval_count: cadence.interval_count() as i32,
        day_of_week: cadence.day_of_week().map(i16::from),
        day_of_month: cadence.day_of_month().map(i16::from),
        start_date: schedule.start_date(),
        end_date: schedule.end_date(),
        max_occurrences: schedule.max_occurrences().map(|m| m as i32),
        invoice_count: schedule.invoice_count() as i32,
        next_run_date: schedule.next_run_date(),
        last_run_date: schedule.last_run_date(),
        status: schedule.status().as_str().to_string(),
        tax_rate: schedule.tax_rate().as_decimal(),
        discount: schedule.discount().amount(),
        payment_terms_days: schedule.payment_terms_days().map(i32::from),
        auto_send: schedule.auto_send(),
        last_invoice_id: schedule.last_invoice_id().map(|id| *id.as_uuid()),
        currency: schedule.currency().code().to_string(),
        version: schedule.version() as i32,
        created_at: schedule.created_at(),
        updated_at: schedule.updated_at(),
    }
}

/// Converts a schedule's line item templates to database rows
fn schedule_item_rows(schedule: &RecurrenceSchedule) -> Vec<ScheduleItemRow> {
    schedule
        .line_items()
        .iter()
        .enumerate()
        .map(|(position, item)| ScheduleItemRow {
            schedule_id: *schedule.id().as_uuid(),
            tenant_id: *schedule.tenant_id().as_uuid(),
            position: position as i32,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.amount(),
        })
        .collect()
}

/// Rebuilds a schedule aggregate from its database rows
///
/// Text columns are parsed through the domain `FromStr` implementations;
/// any value the domain rejects means the row was corrupted outside the
/// application and surfaces as `PortError::Internal`.
fn row_to_schedule(
    row: ScheduleRow,
    items: Vec<ScheduleItemRow>,
) -> Result<RecurrenceSchedule, PortError> {
    let id = row.id;
    let currency = row
        .currency
        .parse::<Currency>()
        .map_err(|e| corrupt_row("schedule", id, e))?;
    let frequency = row
        .frequency
        .parse::<Frequency>()
        .map_err(|e| corrupt_row("schedule", id, e))?;
    let status = row
        .status
        .parse()
        .map_err(|e| corrupt_row("schedule", id, e))?;

    let interval = u32::try_from(row.interval_count)
        .map_err(|_| corrupt_row("schedule", id, "negative interval_count"))?;
    let mut cadence =
        Cadence::new(frequency, interval).map_err(|e| corrupt_row("schedule", id, e))?;
    if let Some(day) = row.day_of_week {
        let day =
            u8::try_from(day).map_err(|_| corrupt_row("schedule", id, "day_of_week out of range"))?;
        cadence = cadence
            .with_day_of_week(day)
            .map_err(|e| corrupt_row("schedule", id, e))?;
    }
    if let Some(day) = row.day_of_month {
        let day = u8::try_from(day)
            .map_err(|_| corrupt_row("schedule", id, "day_of_month out of range"))?;
        cadence = cadence
            .with_day_of_month(day)
            .map_err(|e| corrupt_row("schedule", id, e))?;
    }

    let line_items = items
        .into_iter()
        .map(|item| {
            LineItemTemplate::new(
                item.description,
                item.quantity,
                Money::new(item.unit_price, currency),
            )
        })
        .collect();

    let snapshot = ScheduleSnapshot {
        id: ScheduleId::from_uuid(row.id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        client_id: ClientId::from_uuid(row.client_id),
        project_id: row.project_id.map(ProjectId::from_uuid),
        title: row.title,
        cadence,
        start_date: row.start_date,
        end_date: row.end_date,
        max_occurrences: row
            .max_occurrences
            .map(|m| {
                u32::try_from(m).map_err(|_| corrupt_row("schedule", id, "negative max_occurrences"))
            })
            .transpose()?,
        invoice_count: u32::try_from(row.invoice_count)
            .map_err(|_| corrupt_row("schedule", id, "negative invoice_count"))?,
        next_run_date: row.next_run_date,
        last_run_date: row.last_run_date,
        status,
        line_items,
        tax_rate: Rate::new(row.tax_rate),
        discount: Money::new(row.discount, currency),
        payment_terms_days: row
            .payment_terms_days
            .map(|d| {
                u16::try_from(d)
                    .map_err(|_| corrupt_row("schedule", id, "payment_terms_days out of range"))
            })
            .transpose()?,
        auto_send: row.auto_send,
        last_invoice_id: row.last_invoice_id.map(InvoiceId::from_uuid),
        currency,
        version: u32::try_from(row.version)
            .map_err(|_| corrupt_row("schedule", id, "negative version"))?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    };

    RecurrenceSchedule::restore(snapshot).map_err(|e| corrupt_row("schedule", id, e))
}

/// Converts an invoice aggregate to its database rows
fn invoice_to_rows(invoice: &Invoice) -> (InvoiceRow, Vec<InvoiceItemRow>) {
    let row = InvoiceRow {
        id: *invoice.id.as_uuid(),
        tenant_id: *invoice.tenant_id.as_uuid(),
        client_id: *invoice.client_id.as_uuid(),
        project_id: invoice.project_id.map(|id| *id.as_uuid()),
        schedule_id: invoice.schedule_id.map(|id| *id.as_uuid()),
        invoice_number: invoice.invoice_number.clone(),
        issue_date: invoice.issue_date,
        due_date: invoice.due_date,
        currency: invoice.currency.code().to_string(),
        tax_rate: invoice.tax_rate.as_decimal(),
        subtotal: invoice.subtotal.amount(),
        tax_amount: invoice.tax_amount.amount(),
        discount_amount: invoice.discount_amount.amount(),
        total: invoice.total.amount(),
        status: invoice.status.as_str().to_string(),
        sent_at: invoice.sent_at,
        viewed_at: invoice.viewed_at,
        paid_at: invoice.paid_at,
        notes: invoice.notes.clone(),
        created_at: invoice.created_at,
        updated_at: invoice.updated_at,
    };

    let items = invoice
        .line_items
        .iter()
        .enumerate()
        .map(|(position, item)| InvoiceItemRow {
            id: item.id,
            invoice_id: *invoice.id.as_uuid(),
            tenant_id: *invoice.tenant_id.as_uuid(),
            position: position as i32,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.amount(),
            amount: item.amount.amount(),
        })
        .collect();

    (row, items)
}

/// Rebuilds an invoice aggregate from its database rows
fn row_to_invoice(row: InvoiceRow, items: Vec<InvoiceItemRow>) -> Result<Invoice, PortError> {
    let id = row.id;
    let currency = row
        .currency
        .parse::<Currency>()
        .map_err(|e| corrupt_row("invoice", id, e))?;
    let status = row
        .status
        .parse::<InvoiceStatus>()
        .map_err(|e| corrupt_row("invoice", id, e))?;

    let line_items = items
        .into_iter()
        .map(|item| LineItem {
            id: item.id,
            description: item.description,
            quantity: item.quantity,
            unit_price: Money::new(item.unit_price, currency),
            amount: Money::new(item.amount, currency),
        })
        .collect();

    Ok(Invoice {
        id: InvoiceId::from_uuid(row.id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        client_id: ClientId::from_uuid(row.client_id),
        project_id: row.project_id.map(ProjectId::from_uuid),
        schedule_id: row.schedule_id.map(ScheduleId::from_uuid),
        invoice_number: row.invoice_number,
        issue_date: row.issue_date,
        due_date: row.due_date,
        currency,
        line_items,
        tax_rate: Rate::new(row.tax_rate),
        subtotal: Money::new(row.subtotal, currency),
        tax_amount: Money::new(row.tax_amount, currency),
        discount_amount: Money::new(row.discount_amount, currency),
        total: Money::new(row.total, currency),
        status,
        sent_at: row.sent_at,
        viewed_at: row.viewed_at,
        paid_at: row.paid_at,
        notes: row.notes,
        events: Vec::new(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
