//! Client Registry Domain
//!
//! This crate manages the billable clients of each tenant: display names,
//! contact details, and the billing defaults that recurring schedules fall
//! back to when they do not specify their own payment terms or currency.
//!
//! # Examples
//!
//! ```rust
//! use domain_clients::{Client, ContactInfo};
//! use core_kernel::{Currency, TenantId};
//!
//! let client = Client::new(
//!     TenantId::new_v7(),
//!     "Acme Corp",
//!     ContactInfo::new("billing@acme.example")
//!         .with_phone("+1-555-0100")
//!         .with_address_lines(vec![
//!             "100 Main St".to_string(),
//!             "Springfield".to_string(),
//!         ]),
//!     30,
//!     Currency::USD,
//! )
//! .unwrap();
//!
//! assert!(client.is_active());
//! ```

pub mod client;
pub mod error;
pub mod ports;

pub use client::{Client, ContactInfo};
pub use error::ClientError;
pub use ports::{ClientPort, ClientPortExt, CreateClientRequest, UpdateClientRequest};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockClientPort;
