//! Billing Domain - Recurring Invoice Engine
//!
//! This crate implements the recurring billing engine: cadence date math,
//! the recurrence schedule lifecycle, the invoice workflow, and the
//! generator that turns due schedules into invoices.
//!
//! # Architecture
//!
//! The crate is pure domain logic. Persistence and the client registry are
//! reached through the ports in [`ports`]; adapters are provided by
//! `infra_db` (PostgreSQL) and `test_utils` (in-memory). All date-driven
//! behavior runs off the `Clock` from `core_kernel`, so schedule runs are
//! deterministic under test.
//!
//! # Example
//!
//! ```rust
//! use domain_billing::{Cadence, Frequency, LineItemTemplate, ScheduleBuilder};
//! use core_kernel::{ClientId, Currency, Money, TenantId};
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let schedule = ScheduleBuilder::new()
//!     .tenant(TenantId::new_v7())
//!     .client(ClientId::new_v7())
//!     .title("Monthly retainer")
//!     .cadence(Cadence::new(Frequency::Monthly, 1)?.with_day_of_month(31)?)
//!     .start_date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
//!     .add_item(LineItemTemplate::new(
//!         "Retainer",
//!         dec!(1),
//!         Money::new(dec!(500), Currency::USD),
//!     ))
//!     .build()?;
//!
//! // Month-end aware: the occurrence after Jan 31 is Feb 29 in a leap year.
//! let next = schedule.cadence().next_occurrence(schedule.start_date());
//! assert_eq!(next, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
//! # Ok::<(), domain_billing::BillingError>(())
//! ```

pub mod cadence;
pub mod error;
pub mod events;
pub mod generator;
pub mod invoice;
pub mod ports;
pub mod schedule;

pub use cadence::{Cadence, Frequency};
pub use error::BillingError;
pub use events::BillingEvent;
pub use generator::{GeneratedInvoice, GenerationRun, InvoiceGenerator};
pub use invoice::{Invoice, InvoiceStatus, LineItem};
pub use ports::{BillingProfile, BillingStore, BillingStoreExt, ClientDirectory};
pub use schedule::{
    GenerationOutcome, LineItemTemplate, RecurrenceSchedule, ScheduleBuilder, ScheduleSnapshot,
    ScheduleStatus, SkipReason,
};
