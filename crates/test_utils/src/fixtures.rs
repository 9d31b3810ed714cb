//! Pre-built Test Fixtures
//!
//! Ready-to-use values for the entities the billing tests touch most:
//! deterministic identifiers, dates around the 2024 billing year, and
//! money in the currencies the engine is exercised with.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{
    Actor, ClientId, Currency, InvoiceId, Money, OperationContext, ProjectId, ScheduleId,
    TenantId, UserId,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Creates a standard USD amount for testing
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    /// Creates a typical monthly retainer amount
    pub fn usd_retainer() -> Money {
        Money::new(dec!(1500.00), Currency::USD)
    }

    /// Creates a typical hourly rate
    pub fn usd_hourly() -> Money {
        Money::new(dec!(150.00), Currency::USD)
    }

    /// Creates a zero amount
    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }

    /// Creates a EUR amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }

    /// Creates a JPY amount (zero decimal places)
    pub fn jpy_10000() -> Money {
        Money::new(dec!(10000), Currency::JPY)
    }
}

/// Fixture for date test data
///
/// The billing year under test is 2024, a leap year, so month-end
/// clamping scenarios are reachable.
pub struct DateFixtures;

impl DateFixtures {
    /// Standard schedule start date (Jan 1, 2024)
    pub fn schedule_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Month-end start date for clamping scenarios (Jan 31, 2024)
    pub fn month_end_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    /// The 2024 leap day (Feb 29, 2024)
    pub fn leap_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
    }

    /// Mid-year date for catch-up scenarios (Jun 15, 2024)
    pub fn mid_year() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    /// End of the billing year (Dec 31, 2024)
    pub fn year_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    /// Deterministic creation timestamp for restored aggregates
    pub fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Creates the deterministic tenant every default fixture belongs to
    pub fn tenant_id() -> TenantId {
        TenantId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    /// Creates a second tenant for isolation tests
    pub fn other_tenant_id() -> TenantId {
        TenantId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }

    /// Creates a deterministic client ID for testing
    pub fn client_id() -> ClientId {
        ClientId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440003").unwrap())
    }

    /// Creates a deterministic project ID for testing
    pub fn project_id() -> ProjectId {
        ProjectId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440004").unwrap())
    }

    /// Creates a deterministic schedule ID for testing
    pub fn schedule_id() -> ScheduleId {
        ScheduleId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440005").unwrap())
    }

    /// Creates a deterministic invoice ID for testing
    pub fn invoice_id() -> InvoiceId {
        InvoiceId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440006").unwrap())
    }

    /// Creates a deterministic user ID for testing
    pub fn user_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440007").unwrap())
    }
}

/// Fixture for operation contexts
///
/// The builders in this crate default to [`IdFixtures::tenant_id`], so
/// [`ContextFixtures::billing_ctx`] matches them without further setup.
pub struct ContextFixtures;

impl ContextFixtures {
    /// Creates a system context under the default test tenant
    pub fn billing_ctx() -> OperationContext {
        OperationContext::system(IdFixtures::tenant_id(), "billing-test")
    }

    /// Creates a user context under the default test tenant
    pub fn user_ctx() -> OperationContext {
        OperationContext::new(IdFixtures::tenant_id(), Actor::User(IdFixtures::user_id()))
    }

    /// Creates a context under a different tenant for isolation tests
    pub fn foreign_ctx() -> OperationContext {
        OperationContext::system(IdFixtures::other_tenant_id(), "billing-test")
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    /// Standard schedule title
    pub fn schedule_title() -> &'static str {
        "Monthly retainer"
    }

    /// Standard line item description
    pub fn line_description() -> &'static str {
        "Retainer services"
    }

    /// Standard client display name
    pub fn client_name() -> &'static str {
        "Acme Consulting"
    }

    /// Test email address
    pub fn email() -> &'static str {
        "billing@acme.example"
    }

    /// Test phone number
    pub fn phone() -> &'static str {
        "+1-555-0100"
    }
}
