//! Domain Adapters
//!
//! This module provides adapter implementations for domain ports,
//! connecting domain interfaces to the PostgreSQL database layer.
//!
//! # Architecture
//!
//! Each adapter:
//! - Implements one or more domain port traits
//! - Translates between domain aggregates and database row types
//! - Uses the repository layer for database operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBillingAdapter;
//! use domain_billing::BillingStore;
//!
//! let adapter = PostgresBillingAdapter::new(pool);
//! let schedule = adapter.get_schedule(&ctx, schedule_id).await?;
//! ```

pub mod billing;
pub mod clients;

pub use billing::PostgresBillingAdapter;
pub use clients::PostgresClientAdapter;
