//! Integration tests for the recurring billing pipeline
//!
//! These tests wire [`InvoiceGenerator`] to the in-memory ports and verify
//! the cross-crate workflows end to end, the same paths the PostgreSQL
//! adapters serve in production.
//!
//! # Test Coverage
//!
//! - Single-schedule generation: invoice contents, counters, due dates,
//!   auto-send
//! - Idempotency: a failed commit leaves no partial state; replaying a
//!   claimed schedule on the same day is skipped
//! - Completion: occurrence caps retire schedules across month-end
//!   boundaries
//! - Optimistic concurrency: stale copies lose the commit race and must
//!   re-read
//! - Client gating: unknown or inactive clients block generation
//! - Sweeps: `run_due` claiming, failure isolation, and claim limits

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use core_kernel::{ClientId, Currency, FixedClock, Money, OperationContext, PortError, Rate};
use domain_billing::{
    BillingError, BillingStore, Cadence, Frequency, GenerationOutcome, InvoiceGenerator,
    InvoiceStatus, LineItemTemplate, RecurrenceSchedule, ScheduleStatus,
};
use domain_clients::{Client, ContactInfo};
use rust_decimal_macros::dec;
use test_utils::{
    init_test_tracing, ContextFixtures, IdFixtures, InMemoryBillingStore, InMemoryClientDirectory,
    StringFixtures, TestClientBuilder, TestInvoiceBuilder, TestScheduleBuilder,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

fn monthly_on(day: u8) -> Cadence {
    Cadence::new(Frequency::Monthly, 1)
        .and_then(|c| c.with_day_of_month(day))
        .expect("valid cadence")
}

/// Generator wired to in-memory ports, with the default test client
/// registered as billable under the default tenant
struct Harness {
    store: Arc<InMemoryBillingStore>,
    directory: Arc<InMemoryClientDirectory>,
    clock: Arc<FixedClock>,
    generator: InvoiceGenerator,
    ctx: OperationContext,
}

fn harness(today: NaiveDate) -> Harness {
    init_test_tracing();
    let store = Arc::new(InMemoryBillingStore::new());
    let directory = Arc::new(InMemoryClientDirectory::new());
    let clock = Arc::new(FixedClock::from_date(today));
    directory.insert(
        IdFixtures::tenant_id(),
        TestClientBuilder::new().build_profile(),
    );
    let generator = InvoiceGenerator::new(store.clone(), directory.clone(), clock.clone());
    Harness {
        store,
        directory,
        clock,
        generator,
        ctx: ContextFixtures::billing_ctx(),
    }
}

/// Inserts the schedule and returns the copy a claiming worker would hold
async fn seed(h: &Harness, schedule: &RecurrenceSchedule) -> RecurrenceSchedule {
    h.store
        .insert_schedule(&h.ctx, schedule)
        .await
        .expect("insert schedule");
    h.store
        .get_schedule(&h.ctx, schedule.id())
        .await
        .expect("read back schedule")
}

mod single_schedule_generation {
    use super::*;

    /// A due schedule produces an invoice and the persisted schedule
    /// carries the advanced counters
    #[tokio::test]
    async fn test_generation_advances_counters_and_persists() {
        let h = harness(date(2024, 1, 1));
        let claimed = seed(&h, &TestScheduleBuilder::new().build()).await;

        let generated = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect("generation succeeds")
            .expect("schedule was due");

        assert_eq!(generated.invoice.issue_date, date(2024, 1, 1));
        assert_eq!(generated.invoice.status, InvoiceStatus::Draft);
        assert_eq!(generated.invoice.schedule_id, Some(claimed.id()));
        assert_eq!(generated.invoice.client_id, claimed.client_id());
        assert_eq!(generated.schedule.invoice_count(), 1);
        assert!(matches!(
            generated.outcome,
            GenerationOutcome::Continuing { next_run_date } if next_run_date == date(2024, 2, 1)
        ));

        let stored = h
            .store
            .get_schedule(&h.ctx, claimed.id())
            .await
            .expect("schedule persisted");
        assert_eq!(stored.invoice_count(), 1);
        assert_eq!(stored.next_run_date(), Some(date(2024, 2, 1)));
        assert_eq!(stored.last_run_date(), Some(date(2024, 1, 1)));
        assert_eq!(stored.last_invoice_id(), Some(generated.invoice.id));
        assert_eq!(stored.version(), 2);

        let stored_invoice = h
            .store
            .get_invoice(&h.ctx, generated.invoice.id)
            .await
            .expect("invoice persisted");
        assert_eq!(stored_invoice.total, generated.invoice.total);
    }

    /// Line items, tax rate, and discount flow from the schedule into the
    /// invoice totals
    #[tokio::test]
    async fn test_invoice_totals_follow_schedule_terms() {
        let h = harness(date(2024, 1, 1));
        let schedule = TestScheduleBuilder::new()
            .with_items(vec![LineItemTemplate::new(
                "Support hours",
                dec!(2),
                Money::new(dec!(50.00), Currency::USD),
            )])
            .with_tax_rate(Rate::from_percentage(dec!(10)))
            .with_discount(Money::new(dec!(5.00), Currency::USD))
            .build();
        let claimed = seed(&h, &schedule).await;

        let generated = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect("generation succeeds")
            .expect("schedule was due");

        let invoice = &generated.invoice;
        assert_eq!(invoice.line_items.len(), 1);
        assert_eq!(invoice.subtotal, Money::new(dec!(100.00), Currency::USD));
        assert_eq!(invoice.tax_amount, Money::new(dec!(10.00), Currency::USD));
        assert_eq!(
            invoice.discount_amount,
            Money::new(dec!(5.00), Currency::USD)
        );
        assert_eq!(invoice.total, Money::new(dec!(105.00), Currency::USD));
    }

    /// Without a schedule override the due date comes from the client's
    /// billing profile
    #[tokio::test]
    async fn test_due_date_defaults_to_profile_terms() {
        let h = harness(date(2024, 1, 1));
        let claimed = seed(&h, &TestScheduleBuilder::new().build()).await;

        let generated = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect("generation succeeds")
            .expect("schedule was due");

        // TestClientBuilder registers a 30-day profile
        assert_eq!(
            generated.invoice.due_date,
            date(2024, 1, 1) + Duration::days(30)
        );
    }

    /// Schedule-level payment terms override the profile default
    #[tokio::test]
    async fn test_schedule_payment_terms_override_profile() {
        let h = harness(date(2024, 1, 1));
        let schedule = TestScheduleBuilder::new().with_payment_terms_days(14).build();
        let claimed = seed(&h, &schedule).await;

        let generated = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect("generation succeeds")
            .expect("schedule was due");

        assert_eq!(
            generated.invoice.due_date,
            date(2024, 1, 1) + Duration::days(14)
        );
    }

    /// Auto-send schedules commit the invoice already in `Sent`
    #[tokio::test]
    async fn test_auto_send_marks_invoice_sent() {
        let h = harness(date(2024, 1, 1));
        let schedule = TestScheduleBuilder::new().with_auto_send().build();
        let claimed = seed(&h, &schedule).await;

        let generated = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect("generation succeeds")
            .expect("schedule was due");

        assert_eq!(generated.invoice.status, InvoiceStatus::Sent);
        assert!(generated.invoice.sent_at.is_some());

        let stored = h
            .store
            .get_invoice(&h.ctx, generated.invoice.id)
            .await
            .expect("invoice persisted");
        assert_eq!(stored.status, InvoiceStatus::Sent);
    }

    /// A schedule from another tenant is rejected before any port call
    #[tokio::test]
    async fn test_generator_rejects_foreign_tenant_schedule() {
        let h = harness(date(2024, 1, 1));
        let foreign = TestScheduleBuilder::new()
            .with_tenant(IdFixtures::other_tenant_id())
            .build();

        let err = h
            .generator
            .generate(&h.ctx, &foreign)
            .await
            .expect_err("tenant mismatch");

        assert!(matches!(err, BillingError::TenantMismatch));
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 0);
    }
}

mod idempotency_and_retry {
    use super::*;

    /// A commit failure persists nothing, and retrying the same claimed
    /// copy succeeds without a duplicate
    #[tokio::test]
    async fn test_failed_commit_leaves_no_partial_state_and_retry_succeeds() {
        let h = harness(date(2024, 1, 1));
        let claimed = seed(&h, &TestScheduleBuilder::new().build()).await;

        h.store.fail_next_commit();
        let err = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect_err("injected commit failure");
        assert!(err.is_retryable(), "commit failure should be retryable: {err}");

        // Neither side of the commit landed
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 0);
        let stored = h
            .store
            .get_schedule(&h.ctx, claimed.id())
            .await
            .expect("schedule still present");
        assert_eq!(stored.invoice_count(), 0);
        assert_eq!(stored.next_run_date(), claimed.next_run_date());
        assert_eq!(stored.version(), 1);

        // The same claimed copy is still valid for a retry
        let generated = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect("retry succeeds")
            .expect("schedule still due");
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 1);
        assert_eq!(generated.schedule.invoice_count(), 1);
        assert_eq!(
            h.store.stored_version(IdFixtures::tenant_id(), claimed.id()),
            Some(2)
        );
    }

    /// Replaying an already-generated run on the same day hits the
    /// idempotency probe and is skipped
    #[tokio::test]
    async fn test_replaying_a_claimed_schedule_is_skipped() {
        let h = harness(date(2024, 1, 1));
        let claimed = seed(&h, &TestScheduleBuilder::new().build()).await;

        h.generator
            .generate(&h.ctx, &claimed)
            .await
            .expect("first run succeeds")
            .expect("schedule was due");

        let replay = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect("replay is not an error");
        assert!(replay.is_none(), "replay should be skipped");
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 1);
    }
}

mod schedule_completion {
    use super::*;

    /// A schedule anchored to the 31st with a two-occurrence cap bills
    /// January 31st and the clamped February 29th, then completes
    #[tokio::test]
    async fn test_monthly_on_the_31st_caps_after_two_runs() {
        let h = harness(date(2024, 1, 31));
        let schedule = TestScheduleBuilder::new()
            .with_cadence(monthly_on(31))
            .with_start_date(date(2024, 1, 31))
            .with_max_occurrences(2)
            .build();
        let first_claim = seed(&h, &schedule).await;

        let first = h
            .generator
            .generate(&h.ctx, &first_claim)
            .await
            .expect("first run succeeds")
            .expect("schedule was due");
        assert_eq!(first.invoice.issue_date, date(2024, 1, 31));
        assert!(matches!(
            first.outcome,
            GenerationOutcome::Continuing { next_run_date } if next_run_date == date(2024, 2, 29)
        ));

        // The second run must work from the re-read, version-advanced row
        h.clock.set_date(date(2024, 2, 29));
        let second_claim = h
            .store
            .get_schedule(&h.ctx, schedule.id())
            .await
            .expect("re-read schedule");
        let second = h
            .generator
            .generate(&h.ctx, &second_claim)
            .await
            .expect("second run succeeds")
            .expect("schedule was due");
        assert_eq!(second.invoice.issue_date, date(2024, 2, 29));
        assert!(second.outcome.is_completed());
        assert_eq!(second.schedule.status(), ScheduleStatus::Completed);
        assert_eq!(second.schedule.next_run_date(), None);
        assert_eq!(second.schedule.invoice_count(), 2);

        let stored = h
            .store
            .get_schedule(&h.ctx, schedule.id())
            .await
            .expect("completed schedule persisted");
        assert_eq!(stored.status(), ScheduleStatus::Completed);
        assert_eq!(stored.version(), 3);

        // Completed schedules never claim again
        h.clock.set_date(date(2024, 3, 31));
        let run = h
            .generator
            .run_due(&h.ctx, 10)
            .await
            .expect("sweep succeeds");
        assert_eq!(run.generated, 0);
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 2);
    }
}

mod optimistic_concurrency {
    use super::*;

    /// Two workers claim the same schedule; the slower one fails the
    /// version check at commit and persists nothing
    #[tokio::test]
    async fn test_stale_claim_loses_the_commit_race() {
        let h = harness(date(2024, 1, 1));
        let schedule = TestScheduleBuilder::new().build();
        let worker_a = seed(&h, &schedule).await;
        let worker_b = h
            .store
            .get_schedule(&h.ctx, schedule.id())
            .await
            .expect("second claim");

        h.generator
            .generate(&h.ctx, &worker_a)
            .await
            .expect("winning run succeeds")
            .expect("schedule was due");

        // Next day the stale copy still looks due and the idempotency
        // probe misses, so only the version check can stop it
        h.clock.set_date(date(2024, 1, 2));
        match h.generator.generate(&h.ctx, &worker_b).await {
            Err(BillingError::Port(e)) => assert!(e.is_conflict()),
            other => panic!("expected version conflict, got {other:?}"),
        }

        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 1);
        assert_eq!(
            h.store.stored_version(IdFixtures::tenant_id(), schedule.id()),
            Some(2)
        );
    }

    /// A lifecycle write from a stale copy is rejected and the stored
    /// state keeps the winning write
    #[tokio::test]
    async fn test_stale_lifecycle_write_is_rejected() {
        let h = harness(date(2024, 1, 1));
        let schedule = TestScheduleBuilder::new().build();
        let mut copy_a = seed(&h, &schedule).await;
        let mut copy_b = h
            .store
            .get_schedule(&h.ctx, schedule.id())
            .await
            .expect("second copy");

        copy_a.pause().expect("pause active schedule");
        h.store
            .update_schedule(&h.ctx, &copy_a)
            .await
            .expect("first write wins");

        copy_b.cancel().expect("cancel active schedule");
        let err = h
            .store
            .update_schedule(&h.ctx, &copy_b)
            .await
            .expect_err("stale write rejected");
        assert!(err.is_conflict());

        let stored = h
            .store
            .get_schedule(&h.ctx, schedule.id())
            .await
            .expect("schedule present");
        assert_eq!(stored.status(), ScheduleStatus::Paused);
        assert_eq!(stored.version(), 2);
    }
}

mod client_gating {
    use super::*;

    /// A schedule pointing at a client the directory does not know is not
    /// billable
    #[tokio::test]
    async fn test_unknown_client_blocks_generation() {
        let h = harness(date(2024, 1, 1));
        let schedule = TestScheduleBuilder::new()
            .with_client(ClientId::new())
            .build();
        let claimed = seed(&h, &schedule).await;

        let err = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect_err("unknown client");

        assert!(matches!(err, BillingError::ClientNotBillable(_)));
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 0);
    }

    /// Deactivating a client stops generation until it is reactivated
    #[tokio::test]
    async fn test_inactive_client_blocks_generation_until_reactivated() {
        let h = harness(date(2024, 1, 1));
        let claimed = seed(&h, &TestScheduleBuilder::new().build()).await;

        h.directory
            .set_active(IdFixtures::tenant_id(), IdFixtures::client_id(), false);
        let err = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect_err("inactive client");
        assert!(matches!(err, BillingError::ClientNotBillable(_)));
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 0);
        assert_eq!(
            h.store.stored_version(IdFixtures::tenant_id(), claimed.id()),
            Some(1)
        );

        h.directory
            .set_active(IdFixtures::tenant_id(), IdFixtures::client_id(), true);
        let generated = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect("generation succeeds after reactivation")
            .expect("schedule still due");
        assert_eq!(generated.schedule.invoice_count(), 1);
    }

    /// Contact details are validated when the client aggregate is created,
    /// before anything reaches the billing pipeline
    #[test]
    fn test_contact_email_is_validated_at_client_creation() {
        let invalid = Client::new(
            IdFixtures::tenant_id(),
            StringFixtures::client_name(),
            ContactInfo::new("not-an-email"),
            30,
            Currency::USD,
        );
        assert!(invalid.is_err());

        let valid = Client::new(
            IdFixtures::tenant_id(),
            StringFixtures::client_name(),
            ContactInfo::new(StringFixtures::email()),
            30,
            Currency::USD,
        )
        .expect("valid contact details");
        assert!(valid.active);
    }
}

mod generation_sweeps {
    use super::*;

    /// A sweep bills every due schedule and leaves future ones alone
    #[tokio::test]
    async fn test_sweep_processes_all_due_schedules() {
        let h = harness(date(2024, 1, 1));
        seed(&h, &TestScheduleBuilder::new().build()).await;
        seed(&h, &TestScheduleBuilder::new().build()).await;
        seed(
            &h,
            &TestScheduleBuilder::new()
                .with_start_date(date(2024, 2, 1))
                .build(),
        )
        .await;

        let run = h
            .generator
            .run_due(&h.ctx, 10)
            .await
            .expect("sweep succeeds");

        assert_eq!(run.as_of, date(2024, 1, 1));
        assert_eq!(run.generated, 2);
        assert_eq!(run.skipped, 0);
        assert_eq!(run.failed, 0);
        assert_eq!(run.invoice_ids.len(), 2);
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 2);
    }

    /// One failing schedule does not stop the rest of the sweep
    #[tokio::test]
    async fn test_sweep_isolates_failures() {
        let h = harness(date(2024, 1, 1));
        seed(&h, &TestScheduleBuilder::new().build()).await;
        seed(
            &h,
            &TestScheduleBuilder::new()
                .with_client(ClientId::new())
                .build(),
        )
        .await;

        let run = h
            .generator
            .run_due(&h.ctx, 10)
            .await
            .expect("sweep succeeds");

        assert_eq!(run.generated, 1);
        assert_eq!(run.failed, 1);
        assert_eq!(run.skipped, 0);
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 1);
    }

    /// A run that already has an invoice for today is counted as skipped,
    /// not regenerated
    #[tokio::test]
    async fn test_sweep_skips_already_invoiced_runs() {
        let h = harness(date(2024, 1, 1));
        let schedule = TestScheduleBuilder::new().build();
        seed(&h, &schedule).await;
        let existing = TestInvoiceBuilder::new()
            .with_schedule(schedule.id())
            .with_issue_date(date(2024, 1, 1))
            .build();
        h.store
            .insert_invoice(&h.ctx, &existing)
            .await
            .expect("insert existing invoice");

        let run = h
            .generator
            .run_due(&h.ctx, 10)
            .await
            .expect("sweep succeeds");

        assert_eq!(run.generated, 0);
        assert_eq!(run.skipped, 1);
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 1);
    }

    /// The claim limit bounds how many schedules one sweep touches
    #[tokio::test]
    async fn test_sweep_honors_the_claim_limit() {
        let h = harness(date(2024, 1, 1));
        for _ in 0..3 {
            seed(&h, &TestScheduleBuilder::new().build()).await;
        }

        let run = h
            .generator
            .run_due(&h.ctx, 2)
            .await
            .expect("sweep succeeds");

        assert_eq!(run.generated, 2);
        assert_eq!(run.invoice_ids.len(), 2);
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 2);
    }

    /// Paused schedules sit out sweeps and return on resume
    #[tokio::test]
    async fn test_paused_schedule_sits_out_sweeps_until_resumed() {
        let h = harness(date(2024, 1, 1));
        let schedule = TestScheduleBuilder::new().build();
        let mut claimed = seed(&h, &schedule).await;

        claimed.pause().expect("pause active schedule");
        h.store
            .update_schedule(&h.ctx, &claimed)
            .await
            .expect("persist pause");

        let run = h
            .generator
            .run_due(&h.ctx, 10)
            .await
            .expect("sweep succeeds");
        assert_eq!(run.generated, 0);
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 0);

        let mut resumed = h
            .store
            .get_schedule(&h.ctx, schedule.id())
            .await
            .expect("re-read paused schedule");
        resumed.resume(date(2024, 1, 1)).expect("resume schedule");
        h.store
            .update_schedule(&h.ctx, &resumed)
            .await
            .expect("persist resume");

        let run = h
            .generator
            .run_due(&h.ctx, 10)
            .await
            .expect("sweep succeeds");
        assert_eq!(run.generated, 1);
        assert_eq!(h.store.invoice_count(IdFixtures::tenant_id()), 1);
    }
}

mod invoice_status_flow {
    use super::*;

    /// Status updates go through the store, stamp their timestamps, and
    /// stop at terminal states
    #[tokio::test]
    async fn test_invoice_status_updates_flow_through_the_store() {
        let h = harness(date(2024, 1, 1));
        let claimed = seed(&h, &TestScheduleBuilder::new().build()).await;
        let generated = h
            .generator
            .generate(&h.ctx, &claimed)
            .await
            .expect("generation succeeds")
            .expect("schedule was due");
        let invoice_id = generated.invoice.id;

        let sent = h
            .store
            .update_invoice_status(&h.ctx, invoice_id, InvoiceStatus::Sent)
            .await
            .expect("draft to sent");
        assert_eq!(sent.status, InvoiceStatus::Sent);
        assert!(sent.sent_at.is_some());

        let paid = h
            .store
            .update_invoice_status(&h.ctx, invoice_id, InvoiceStatus::Paid)
            .await
            .expect("sent to paid");
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert!(paid.paid_at.is_some());

        let err = h
            .store
            .update_invoice_status(&h.ctx, invoice_id, InvoiceStatus::Sent)
            .await
            .expect_err("paid is terminal");
        assert!(matches!(err, PortError::Validation { .. }));

        let stored = h
            .store
            .get_invoice(&h.ctx, invoice_id)
            .await
            .expect("invoice present");
        assert_eq!(stored.status, InvoiceStatus::Paid);
    }
}
