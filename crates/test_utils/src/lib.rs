//! Test Utilities Crate
//!
//! Provides shared test infrastructure for the billing workspace:
//! fixtures, builders for domain aggregates, in-memory implementations of
//! the billing ports, and property-based generators.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for aggregates in arbitrary states
//! - `memory`: In-memory ports with failure injection
//! - `generators`: Property-based test data generators

pub mod builders;
pub mod fixtures;
pub mod generators;
pub mod memory;

pub use builders::*;
pub use fixtures::*;
pub use generators::*;
pub use memory::*;

use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

static TRACING: Lazy<()> = Lazy::new(|| {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

/// Installs the tracing subscriber for tests, once per process
///
/// Honors `RUST_LOG`; defaults to `info` when it is unset. Safe to call
/// from every test.
pub fn init_test_tracing() {
    Lazy::force(&TRACING);
}
