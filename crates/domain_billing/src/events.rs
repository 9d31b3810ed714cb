//! Domain events for the billing aggregates
//!
//! Domain events represent significant occurrences within the billing
//! lifecycle. They are used for:
//! - Audit trails
//! - Event-driven integrations
//! - Triggering downstream processes (delivery, notifications)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, ScheduleId, TenantId};

use crate::invoice::InvoiceStatus;

/// Domain events emitted by the billing aggregates
///
/// Schedule lifecycle events are emitted by `RecurrenceSchedule`; invoice
/// events are emitted by `Invoice` and the generator pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BillingEvent {
    /// A recurrence schedule has been created
    ScheduleCreated {
        tenant_id: TenantId,
        schedule_id: ScheduleId,
        start_date: NaiveDate,
        occurred_at: DateTime<Utc>,
    },

    /// A schedule has been paused; its next run date is frozen
    SchedulePaused {
        tenant_id: TenantId,
        schedule_id: ScheduleId,
        occurred_at: DateTime<Utc>,
    },

    /// A paused schedule has been resumed
    ScheduleResumed {
        tenant_id: TenantId,
        schedule_id: ScheduleId,
        next_run_date: Option<NaiveDate>,
        occurred_at: DateTime<Utc>,
    },

    /// A schedule has been cancelled; no further invoices will be generated
    ScheduleCancelled {
        tenant_id: TenantId,
        schedule_id: ScheduleId,
        occurred_at: DateTime<Utc>,
    },

    /// A schedule reached its occurrence cap or end date
    ScheduleCompleted {
        tenant_id: TenantId,
        schedule_id: ScheduleId,
        total_invoices: u32,
        occurred_at: DateTime<Utc>,
    },

    /// An invoice was generated from a schedule
    InvoiceGenerated {
        tenant_id: TenantId,
        schedule_id: ScheduleId,
        invoice_id: InvoiceId,
        occurrence: u32,
        occurred_at: DateTime<Utc>,
    },

    /// A generated invoice was automatically moved to sent
    InvoiceAutoSent {
        tenant_id: TenantId,
        schedule_id: ScheduleId,
        invoice_id: InvoiceId,
        occurred_at: DateTime<Utc>,
    },

    /// An invoice status transition was applied
    InvoiceStatusChanged {
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        schedule_id: Option<ScheduleId>,
        from: InvoiceStatus,
        to: InvoiceStatus,
        occurred_at: DateTime<Utc>,
    },
}

impl BillingEvent {
    /// Returns the schedule ID associated with this event, if any
    ///
    /// Only `InvoiceStatusChanged` can lack one, for invoices created
    /// outside of a recurrence schedule.
    pub fn schedule_id(&self) -> Option<ScheduleId> {
        match self {
            BillingEvent::ScheduleCreated { schedule_id, .. } => Some(*schedule_id),
            BillingEvent::SchedulePaused { schedule_id, .. } => Some(*schedule_id),
            BillingEvent::ScheduleResumed { schedule_id, .. } => Some(*schedule_id),
            BillingEvent::ScheduleCancelled { schedule_id, .. } => Some(*schedule_id),
            BillingEvent::ScheduleCompleted { schedule_id, .. } => Some(*schedule_id),
            BillingEvent::InvoiceGenerated { schedule_id, .. } => Some(*schedule_id),
            BillingEvent::InvoiceAutoSent { schedule_id, .. } => Some(*schedule_id),
            BillingEvent::InvoiceStatusChanged { schedule_id, .. } => *schedule_id,
        }
    }

    /// Returns the tenant that owns the aggregate this event came from
    pub fn tenant_id(&self) -> TenantId {
        match self {
            BillingEvent::ScheduleCreated { tenant_id, .. } => *tenant_id,
            BillingEvent::SchedulePaused { tenant_id, .. } => *tenant_id,
            BillingEvent::ScheduleResumed { tenant_id, .. } => *tenant_id,
            BillingEvent::ScheduleCancelled { tenant_id, .. } => *tenant_id,
            BillingEvent::ScheduleCompleted { tenant_id, .. } => *tenant_id,
            BillingEvent::InvoiceGenerated { tenant_id, .. } => *tenant_id,
            BillingEvent::InvoiceAutoSent { tenant_id, .. } => *tenant_id,
            BillingEvent::InvoiceStatusChanged { tenant_id, .. } => *tenant_id,
        }
    }

    /// Returns when this event occurred
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BillingEvent::ScheduleCreated { occurred_at, .. } => *occurred_at,
            BillingEvent::SchedulePaused { occurred_at, .. } => *occurred_at,
            BillingEvent::ScheduleResumed { occurred_at, .. } => *occurred_at,
            BillingEvent::ScheduleCancelled { occurred_at, .. } => *occurred_at,
            BillingEvent::ScheduleCompleted { occurred_at, .. } => *occurred_at,
            BillingEvent::InvoiceGenerated { occurred_at, .. } => *occurred_at,
            BillingEvent::InvoiceAutoSent { occurred_at, .. } => *occurred_at,
            BillingEvent::InvoiceStatusChanged { occurred_at, .. } => *occurred_at,
        }
    }

    /// Returns the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            BillingEvent::ScheduleCreated { .. } => "ScheduleCreated",
            BillingEvent::SchedulePaused { .. } => "SchedulePaused",
            BillingEvent::ScheduleResumed { .. } => "ScheduleResumed",
            BillingEvent::ScheduleCancelled { .. } => "ScheduleCancelled",
            BillingEvent::ScheduleCompleted { .. } => "ScheduleCompleted",
            BillingEvent::InvoiceGenerated { .. } => "InvoiceGenerated",
            BillingEvent::InvoiceAutoSent { .. } => "InvoiceAutoSent",
            BillingEvent::InvoiceStatusChanged { .. } => "InvoiceStatusChanged",
        }
    }
}
