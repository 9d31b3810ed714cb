//! Core Kernel - Foundational types and utilities for the billing engine
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers and tenancy context
//! - A clock abstraction so date-driven logic stays testable
//! - Port error vocabulary for the hexagonal architecture

pub mod money;
pub mod identifiers;
pub mod clock;
pub mod ports;

pub use money::{Money, Currency, Rate, MoneyError};
pub use identifiers::{
    TenantId, UserId, ClientId, ProjectId,
    ScheduleId, InvoiceId, ProposalId,
};
pub use clock::{Clock, SystemClock, FixedClock};
pub use ports::{
    PortError, DomainPort, OperationContext, Actor,
    AdapterHealth, HealthCheckResult, HealthCheckable,
};
