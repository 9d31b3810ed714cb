//! Infrastructure Database Layer
//!
//! This crate provides the PostgreSQL persistence for the billing system:
//! connection pooling, tenant-scoped repositories for schedules, invoices,
//! and clients, and the adapters that implement the domain port traits.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. Repositories own the SQL and
//! the raw row types; adapters map rows to domain aggregates and implement
//! the ports (`BillingStore`, `ClientPort`, `ClientDirectory`). Every
//! statement is scoped by `tenant_id`, and schedule writes carry an
//! optimistic version guard.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, create_pool, run_migrations};
//! use infra_db::adapters::PostgresBillingAdapter;
//!
//! let pool = create_pool(DatabaseConfig::from_env()?).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresBillingAdapter::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresBillingAdapter, PostgresClientAdapter};
pub use error::DatabaseError;
pub use pool::{
    create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool,
};
