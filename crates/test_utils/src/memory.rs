//! In-Memory Port Implementations
//!
//! Mutex-backed stand-ins for the PostgreSQL adapters. They enforce the
//! same port contracts: every call is scoped to the context tenant,
//! schedule writes carry the optimistic version check, and the generation
//! commit is all-or-nothing. [`InMemoryBillingStore::fail_next_commit`]
//! arms a one-shot failure so tests can prove that a crashed commit leaves
//! no partial state behind.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    ClientId, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId, OperationContext,
    PortError, ScheduleId, TenantId,
};
use domain_billing::{
    BillingProfile, BillingStore, ClientDirectory, Invoice, InvoiceStatus, RecurrenceSchedule,
    ScheduleSnapshot, ScheduleStatus,
};

/// Mutable store state behind the mutex
#[derive(Default)]
struct BillingState {
    schedules: HashMap<(TenantId, ScheduleId), ScheduleSnapshot>,
    invoices: HashMap<(TenantId, InvoiceId), Invoice>,
    fail_next_commit: bool,
}

/// In-memory implementation of [`BillingStore`]
///
/// Schedules are held as snapshots, mirroring a database row: aggregates
/// go in through [`snapshot_of`] and come out through
/// `RecurrenceSchedule::restore`, so the store exercises the same
/// round trip as the PostgreSQL adapter.
#[derive(Default)]
pub struct InMemoryBillingStore {
    state: Mutex<BillingState>,
}

impl InMemoryBillingStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a one-shot failure for the next `commit_generation` call
    ///
    /// The failed call returns a transient `PortError::Connection` and
    /// writes nothing; the call after it proceeds normally.
    pub fn fail_next_commit(&self) {
        self.state.lock().unwrap().fail_next_commit = true;
    }

    /// Number of invoices stored for a tenant, bypassing the port
    pub fn invoice_count(&self, tenant_id: TenantId) -> usize {
        self.state
            .lock()
            .unwrap()
            .invoices
            .keys()
            .filter(|(tenant, _)| *tenant == tenant_id)
            .count()
    }

    /// Stored version of a schedule, bypassing the port
    pub fn stored_version(&self, tenant_id: TenantId, schedule_id: ScheduleId) -> Option<u32> {
        self.state
            .lock()
            .unwrap()
            .schedules
            .get(&(tenant_id, schedule_id))
            .map(|snapshot| snapshot.version)
    }
}

impl DomainPort for InMemoryBillingStore {}

#[async_trait]
impl HealthCheckable for InMemoryBillingStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("in-memory-billing-store", 0)
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn insert_schedule(
        &self,
        ctx: &OperationContext,
        schedule: &RecurrenceSchedule,
    ) -> Result<(), PortError> {
        guard_tenant(ctx, schedule.tenant_id(), "schedule")?;
        let mut state = self.state.lock().unwrap();
        let key = (ctx.tenant_id, schedule.id());
        if state.schedules.contains_key(&key) {
            return Err(PortError::conflict(format!(
                "schedule {} already exists",
                schedule.id()
            )));
        }
        state.schedules.insert(key, snapshot_of(schedule));
        Ok(())
    }

    async fn get_schedule(
        &self,
        ctx: &OperationContext,
        schedule_id: ScheduleId,
    ) -> Result<RecurrenceSchedule, PortError> {
        let state = self.state.lock().unwrap();
        let snapshot = state
            .schedules
            .get(&(ctx.tenant_id, schedule_id))
            .cloned()
            .ok_or_else(|| PortError::not_found("Schedule", schedule_id))?;
        restore(snapshot)
    }

    async fn update_schedule(
        &self,
        ctx: &OperationContext,
        schedule: &RecurrenceSchedule,
    ) -> Result<(), PortError> {
        guard_tenant(ctx, schedule.tenant_id(), "schedule")?;
        let mut state = self.state.lock().unwrap();
        versioned_write(&mut state, ctx.tenant_id, schedule)
    }

    async fn claim_due_schedules(
        &self,
        ctx: &OperationContext,
        as_of: NaiveDate,
        limit: u32,
    ) -> Result<Vec<RecurrenceSchedule>, PortError> {
        let state = self.state.lock().unwrap();
        let mut due: Vec<ScheduleSnapshot> = state
            .schedules
            .values()
            .filter(|snapshot| snapshot.tenant_id == ctx.tenant_id)
            .filter(|snapshot| snapshot.status == ScheduleStatus::Active)
            .filter(|snapshot| snapshot.next_run_date.map_or(false, |date| date <= as_of))
            .cloned()
            .collect();
        due.sort_by_key(|snapshot| (snapshot.next_run_date, *snapshot.id.as_uuid()));
        due.truncate(limit as usize);
        due.into_iter().map(restore).collect()
    }

    async fn commit_generation(
        &self,
        ctx: &OperationContext,
        invoice: &Invoice,
        schedule: &RecurrenceSchedule,
    ) -> Result<(), PortError> {
        guard_tenant(ctx, invoice.tenant_id, "invoice")?;
        guard_tenant(ctx, schedule.tenant_id(), "schedule")?;
        let mut state = self.state.lock().unwrap();
        if state.fail_next_commit {
            state.fail_next_commit = false;
            return Err(PortError::connection("injected commit failure"));
        }
        // Version miss leaves the invoice unwritten, like the rolled-back
        // database transaction.
        versioned_write(&mut state, ctx.tenant_id, schedule)?;
        state
            .invoices
            .insert((ctx.tenant_id, invoice.id), invoice.clone());
        Ok(())
    }

    async fn insert_invoice(
        &self,
        ctx: &OperationContext,
        invoice: &Invoice,
    ) -> Result<(), PortError> {
        guard_tenant(ctx, invoice.tenant_id, "invoice")?;
        let mut state = self.state.lock().unwrap();
        let key = (ctx.tenant_id, invoice.id);
        if state.invoices.contains_key(&key) {
            return Err(PortError::conflict(format!(
                "invoice {} already exists",
                invoice.id
            )));
        }
        state.invoices.insert(key, invoice.clone());
        Ok(())
    }

    async fn get_invoice(
        &self,
        ctx: &OperationContext,
        invoice_id: InvoiceId,
    ) -> Result<Invoice, PortError> {
        self.state
            .lock()
            .unwrap()
            .invoices
            .get(&(ctx.tenant_id, invoice_id))
            .cloned()
            .ok_or_else(|| PortError::not_found("Invoice", invoice_id))
    }

    async fn update_invoice_status(
        &self,
        ctx: &OperationContext,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Invoice, PortError> {
        let mut state = self.state.lock().unwrap();
        let invoice = state
            .invoices
            .get_mut(&(ctx.tenant_id, invoice_id))
            .ok_or_else(|| PortError::not_found("Invoice", invoice_id))?;
        invoice.update_status(status)?;
        Ok(invoice.clone())
    }

    async fn invoice_exists_for_run(
        &self,
        ctx: &OperationContext,
        schedule_id: ScheduleId,
        run_date: NaiveDate,
    ) -> Result<bool, PortError> {
        let state = self.state.lock().unwrap();
        Ok(state.invoices.values().any(|invoice| {
            invoice.tenant_id == ctx.tenant_id
                && invoice.schedule_id == Some(schedule_id)
                && invoice.issue_date == run_date
        }))
    }
}

/// In-memory implementation of [`ClientDirectory`]
#[derive(Default)]
pub struct InMemoryClientDirectory {
    profiles: Mutex<HashMap<(TenantId, ClientId), BillingProfile>>,
}

impl InMemoryClientDirectory {
    /// Creates an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a billing profile under a tenant
    pub fn insert(&self, tenant_id: TenantId, profile: BillingProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert((tenant_id, profile.client_id), profile);
    }

    /// Flips the active flag on a registered profile
    pub fn set_active(&self, tenant_id: TenantId, client_id: ClientId, is_active: bool) {
        if let Some(profile) = self
            .profiles
            .lock()
            .unwrap()
            .get_mut(&(tenant_id, client_id))
        {
            profile.is_active = is_active;
        }
    }
}

impl DomainPort for InMemoryClientDirectory {}

#[async_trait]
impl ClientDirectory for InMemoryClientDirectory {
    async fn billing_profile(
        &self,
        ctx: &OperationContext,
        client_id: ClientId,
    ) -> Result<BillingProfile, PortError> {
        self.profiles
            .lock()
            .unwrap()
            .get(&(ctx.tenant_id, client_id))
            .cloned()
            .ok_or_else(|| PortError::not_found("Client", client_id))
    }
}

/// Rejects aggregates owned by a tenant other than the context's
fn guard_tenant(ctx: &OperationContext, owner: TenantId, entity: &str) -> Result<(), PortError> {
    if owner != ctx.tenant_id {
        return Err(PortError::validation(format!(
            "{} belongs to a different tenant",
            entity
        )));
    }
    Ok(())
}

/// Replaces a stored schedule under the optimistic version check
///
/// The stored snapshot must carry the same version the caller's aggregate
/// was read at; the replacement is written with the version incremented.
fn versioned_write(
    state: &mut BillingState,
    tenant_id: TenantId,
    schedule: &RecurrenceSchedule,
) -> Result<(), PortError> {
    let key = (tenant_id, schedule.id());
    let stored = state
        .schedules
        .get(&key)
        .ok_or_else(|| PortError::not_found("Schedule", schedule.id()))?;
    if stored.version != schedule.version() {
        return Err(PortError::conflict(format!(
            "Schedule {} was modified by a concurrent writer",
            schedule.id()
        )));
    }
    let mut snapshot = snapshot_of(schedule);
    snapshot.version = schedule.version() + 1;
    state.schedules.insert(key, snapshot);
    Ok(())
}

/// Captures a schedule's persisted fields into a snapshot
fn snapshot_of(schedule: &RecurrenceSchedule) -> ScheduleSnapshot {
    ScheduleSnapshot {
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
    }
}

/// Rebuilds an aggregate from a stored snapshot
fn restore(snapshot: ScheduleSnapshot) -> Result<RecurrenceSchedule, PortError> {
    RecurrenceSchedule::restore(snapshot)
        .map_err(|e| PortError::internal(format!("corrupt schedule state: {e}")))
}
