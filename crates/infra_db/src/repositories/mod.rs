//! Repository implementations for domain entities
//!
//! This module provides concrete repository implementations that handle
//! database access for each domain aggregate. Repositories encapsulate
//! SQL statements and raw row types; mapping between rows and domain
//! aggregates happens in the adapter layer.
//!
//! # Architecture
//!
//! Each repository follows these principles:
//! - Every statement bound by `tenant_id`
//! - Transaction support for multi-row writes
//! - Optimistic concurrency control where the domain requires it

pub mod clients;
pub mod invoices;
pub mod schedules;

pub use clients::ClientRepository;
pub use invoices::InvoiceRepository;
pub use schedules::ScheduleRepository;
