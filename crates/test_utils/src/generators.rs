//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use chrono::{Duration, NaiveDate};
use core_kernel::{ClientId, Currency, Money, Rate, ScheduleId, TenantId};
use domain_billing::{Cadence, Frequency, LineItemTemplate, RecurrenceSchedule, ScheduleBuilder};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating valid Currency values
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::JPY),
        Just(Currency::CHF),
        Just(Currency::INR),
        Just(Currency::AUD),
        Just(Currency::CAD),
        Just(Currency::SGD),
        Just(Currency::HKD),
    ]
}

/// Strategy for generating valid positive amounts in minor units
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000i64
}

/// Strategy for generating valid Money values with positive amounts
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

/// Strategy for generating valid USD Money values
pub fn usd_money_strategy() -> impl Strategy<Value = Money> {
    positive_amount_minor_strategy().prop_map(|amount| Money::from_minor(amount, Currency::USD))
}

/// Strategy for generating tax rates between 0% and 100%
pub fn rate_strategy() -> impl Strategy<Value = Rate> {
    (0u32..10000u32).prop_map(|n| Rate::new(Decimal::new(i64::from(n), 4)))
}

/// Strategy for generating line item quantities (0.25 to 1000, 2 dp)
pub fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (25i64..100_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for generating dates within the 2024 billing year
pub fn date_2024_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..366i64).prop_map(|days| {
        NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid anchor date") + Duration::days(days)
    })
}

/// Strategy for generating dates across several years, including both
/// leap and common Februaries
pub fn billing_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..1461i64).prop_map(|days| {
        NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid anchor date") + Duration::days(days)
    })
}

/// Strategy for generating valid Frequency values
pub fn frequency_strategy() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Daily),
        Just(Frequency::Weekly),
        Just(Frequency::Biweekly),
        Just(Frequency::Monthly),
        Just(Frequency::Quarterly),
        Just(Frequency::Yearly),
    ]
}

/// Strategy for generating interval multipliers (1 to 12)
pub fn interval_strategy() -> impl Strategy<Value = u32> {
    1u32..13u32
}

/// Strategy for generating valid cadences
///
/// Anchors are applied only where they are meaningful: a weekday anchor
/// on weekly cadences, a day-of-month anchor on the monthly family.
pub fn cadence_strategy() -> impl Strategy<Value = Cadence> {
    (
        frequency_strategy(),
        interval_strategy(),
        proptest::option::of(1u8..=7u8),
        proptest::option::of(1u8..=31u8),
    )
        .prop_map(|(frequency, interval, weekday, day)| {
            let cadence = Cadence::new(frequency, interval).expect("interval is at least 1");
            match frequency {
                Frequency::Weekly => match weekday {
                    Some(anchor) => cadence
                        .with_day_of_week(anchor)
                        .expect("weekday anchor in 1..=7"),
                    None => cadence,
                },
                Frequency::Monthly | Frequency::Quarterly | Frequency::Yearly => match day {
                    Some(anchor) => cadence
                        .with_day_of_month(anchor)
                        .expect("day anchor in 1..=31"),
                    None => cadence,
                },
                Frequency::Daily | Frequency::Biweekly => cadence,
            }
        })
}

/// Strategy for generating TenantId values
pub fn tenant_id_strategy() -> impl Strategy<Value = TenantId> {
    any::<[u8; 16]>().prop_map(|bytes| TenantId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// Strategy for generating ClientId values
pub fn client_id_strategy() -> impl Strategy<Value = ClientId> {
    any::<[u8; 16]>().prop_map(|bytes| ClientId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// Strategy for generating ScheduleId values
pub fn schedule_id_strategy() -> impl Strategy<Value = ScheduleId> {
    any::<[u8; 16]>().prop_map(|bytes| ScheduleId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// Strategy for generating USD template line items
pub fn line_item_strategy() -> impl Strategy<Value = LineItemTemplate> {
    ("[a-z]{4,12}", quantity_strategy(), usd_money_strategy())
        .prop_map(|(description, quantity, unit_price)| {
            LineItemTemplate::new(description, quantity, unit_price)
        })
}

/// Strategy for generating freshly built USD schedules
///
/// Covers the constructible surface: random cadence, start date, one to
/// three line items, an optional occurrence cap, and an optional tax rate.
pub fn schedule_strategy() -> impl Strategy<Value = RecurrenceSchedule> {
    (
        tenant_id_strategy(),
        client_id_strategy(),
        cadence_strategy(),
        date_2024_strategy(),
        proptest::collection::vec(line_item_strategy(), 1..4),
        proptest::option::of(1u32..25u32),
        rate_strategy(),
    )
        .prop_map(
            |(tenant_id, client_id, cadence, start_date, items, cap, tax_rate)| {
                let mut builder = ScheduleBuilder::new()
                    .tenant(tenant_id)
                    .client(client_id)
                    .title("Generated schedule")
                    .cadence(cadence)
                    .start_date(start_date)
                    .items(items)
                    .tax_rate(tax_rate);
                if let Some(max) = cap {
                    builder = builder.max_occurrences(max);
                }
                builder.build().expect("generated schedule is valid")
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_billing::ScheduleStatus;

    proptest! {
        #[test]
        fn positive_money_is_always_positive(money in positive_money_strategy()) {
            prop_assert!(money.amount() > Decimal::ZERO);
        }

        #[test]
        fn rate_stays_in_unit_range(rate in rate_strategy()) {
            prop_assert!(rate.as_decimal() >= Decimal::ZERO);
            prop_assert!(rate.as_decimal() < Decimal::ONE);
        }

        #[test]
        fn cadence_advances_strictly(
            cadence in cadence_strategy(),
            from in billing_date_strategy(),
        ) {
            prop_assert!(cadence.next_occurrence(from) > from);
        }

        #[test]
        fn generated_schedules_start_fresh(schedule in schedule_strategy()) {
            prop_assert_eq!(schedule.status(), ScheduleStatus::Active);
            prop_assert_eq!(schedule.invoice_count(), 0);
            prop_assert_eq!(schedule.next_run_date(), Some(schedule.start_date()));
            prop_assert_eq!(schedule.version(), 1);
            prop_assert!(!schedule.line_items().is_empty());
        }
    }
}
