//! Test Data Builders
//!
//! Builders for constructing domain aggregates in arbitrary states with
//! sensible defaults. Tests override only the fields they care about and
//! call `build()` for the finished aggregate.
//!
//! [`TestScheduleBuilder`] assembles a `ScheduleSnapshot` and restores it,
//! so mid-life states (non-zero counters, paused, completed) can be set up
//! directly without replaying the runs that would produce them.

use chrono::{Duration, NaiveDate};
use core_kernel::{
    ClientId, Currency, InvoiceId, Money, ProjectId, Rate, ScheduleId, TenantId,
};
use domain_billing::{
    BillingProfile, Cadence, Frequency, Invoice, LineItem, LineItemTemplate, RecurrenceSchedule,
    ScheduleSnapshot, ScheduleStatus,
};
use domain_clients::{Client, ContactInfo};
use rust_decimal_macros::dec;

use crate::fixtures::{DateFixtures, IdFixtures, StringFixtures};

/// Builder for recurrence schedules in any lifecycle state
pub struct TestScheduleBuilder {
    id: ScheduleId,
    tenant_id: TenantId,
    client_id: ClientId,
    project_id: Option<ProjectId>,
    title: String,
    cadence: Cadence,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    max_occurrences: Option<u32>,
    invoice_count: u32,
    // None means "derive from status and start date" at build time
    next_run_date: Option<Option<NaiveDate>>,
    last_run_date: Option<NaiveDate>,
    status: ScheduleStatus,
    line_items: Option<Vec<LineItemTemplate>>,
    tax_rate: Rate,
    discount: Option<Money>,
    payment_terms_days: Option<u16>,
    auto_send: bool,
    last_invoice_id: Option<InvoiceId>,
    currency: Currency,
    version: u32,
}

impl Default for TestScheduleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestScheduleBuilder {
    /// Creates a builder for an active monthly schedule with one line item
    pub fn new() -> Self {
        Self {
            id: ScheduleId::new_v7(),
            tenant_id: IdFixtures::tenant_id(),
            client_id: IdFixtures::client_id(),
            project_id: None,
            title: StringFixtures::schedule_title().to_string(),
            cadence: Cadence::new(Frequency::Monthly, 1).unwrap(),
            start_date: DateFixtures::schedule_start(),
            end_date: None,
            max_occurrences: None,
            invoice_count: 0,
            next_run_date: None,
            last_run_date: None,
            status: ScheduleStatus::Active,
            line_items: None,
            tax_rate: Rate::zero(),
            discount: None,
            payment_terms_days: None,
            auto_send: false,
            last_invoice_id: None,
            currency: Currency::USD,
            version: 1,
        }
    }

    /// Sets the schedule ID
    pub fn with_id(mut self, id: ScheduleId) -> Self {
        self.id = id;
        self
    }

    /// Sets the owning tenant
    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Sets the billed client
    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    /// Sets the related project
    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Sets the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the cadence
    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    /// Sets the start date; the next run date follows it unless set
    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = date;
        self
    }

    /// Sets the end date
    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Caps the number of occurrences
    pub fn with_max_occurrences(mut self, max: u32) -> Self {
        self.max_occurrences = Some(max);
        self
    }

    /// Sets the number of invoices already generated
    pub fn with_invoice_count(mut self, count: u32) -> Self {
        self.invoice_count = count;
        self
    }

    /// Pins the next run date
    pub fn with_next_run_date(mut self, date: NaiveDate) -> Self {
        self.next_run_date = Some(Some(date));
        self
    }

    /// Sets the last run date
    pub fn with_last_run_date(mut self, date: NaiveDate) -> Self {
        self.last_run_date = Some(date);
        self
    }

    /// Sets the lifecycle status; terminal statuses clear the derived
    /// next run date
    pub fn with_status(mut self, status: ScheduleStatus) -> Self {
        self.status = status;
        self
    }

    /// Replaces the template line items
    pub fn with_items(mut self, items: Vec<LineItemTemplate>) -> Self {
        self.line_items = Some(items);
        self
    }

    /// Appends a template line item
    pub fn add_item(mut self, item: LineItemTemplate) -> Self {
        self.line_items.get_or_insert_with(Vec::new).push(item);
        self
    }

    /// Sets the tax rate
    pub fn with_tax_rate(mut self, rate: Rate) -> Self {
        self.tax_rate = rate;
        self
    }

    /// Sets the flat discount
    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Overrides the client's payment terms
    pub fn with_payment_terms_days(mut self, days: u16) -> Self {
        self.payment_terms_days = Some(days);
        self
    }

    /// Marks generated invoices for automatic sending
    pub fn with_auto_send(mut self) -> Self {
        self.auto_send = true;
        self
    }

    /// Records the last generated invoice
    pub fn with_last_invoice_id(mut self, invoice_id: InvoiceId) -> Self {
        self.last_invoice_id = Some(invoice_id);
        self
    }

    /// Sets the schedule currency; default items and discount follow it
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Sets the aggregate version
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Builds the schedule
    ///
    /// # Panics
    ///
    /// Panics when the configured fields violate a schedule invariant,
    /// e.g. an invoice count above the occurrence cap.
    pub fn build(self) -> RecurrenceSchedule {
        let currency = self.currency;
        let next_run_date = self.next_run_date.unwrap_or({
            if self.status.is_terminal() {
                None
            } else {
                Some(self.start_date)
            }
        });
        let line_items = self.line_items.unwrap_or_else(|| {
            vec![LineItemTemplate::new(
                StringFixtures::line_description(),
                dec!(1),
                Money::new(dec!(1500.00), currency),
            )]
        });
        let snapshot = ScheduleSnapshot {
            id: self.id,
            tenant_id: self.tenant_id,
            client_id: self.client_id,
            project_id: self.project_id,
            title: self.title,
            cadence: self.cadence,
            start_date: self.start_date,
            end_date: self.end_date,
            max_occurrences: self.max_occurrences,
            invoice_count: self.invoice_count,
            next_run_date,
            last_run_date: self.last_run_date,
            status: self.status,
            line_items,
            tax_rate: self.tax_rate,
            discount: self.discount.unwrap_or_else(|| Money::zero(currency)),
            payment_terms_days: self.payment_terms_days,
            auto_send: self.auto_send,
            last_invoice_id: self.last_invoice_id,
            currency,
            version: self.version,
            created_at: DateFixtures::created_at(),
            updated_at: DateFixtures::created_at(),
        };
        RecurrenceSchedule::restore(snapshot).expect("test schedule satisfies invariants")
    }
}

/// Builder for clients and their billing profiles
pub struct TestClientBuilder {
    id: ClientId,
    tenant_id: TenantId,
    name: String,
    email: String,
    phone: Option<String>,
    payment_terms_days: u16,
    currency: Currency,
    active: bool,
}

impl Default for TestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClientBuilder {
    /// Creates a builder for an active USD client on 30-day terms
    pub fn new() -> Self {
        Self {
            id: IdFixtures::client_id(),
            tenant_id: IdFixtures::tenant_id(),
            name: StringFixtures::client_name().to_string(),
            email: StringFixtures::email().to_string(),
            phone: None,
            payment_terms_days: 30,
            currency: Currency::USD,
            active: true,
        }
    }

    /// Sets the client ID
    pub fn with_id(mut self, id: ClientId) -> Self {
        self.id = id;
        self
    }

    /// Sets the owning tenant
    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Sets the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the contact email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Sets the contact phone
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the default payment terms
    pub fn with_payment_terms_days(mut self, days: u16) -> Self {
        self.payment_terms_days = days;
        self
    }

    /// Sets the default currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Marks the client as deactivated
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Builds the client aggregate
    pub fn build(self) -> Client {
        let mut contact = ContactInfo::new(self.email);
        if let Some(phone) = self.phone {
            contact = contact.with_phone(phone);
        }
        Client {
            id: self.id,
            tenant_id: self.tenant_id,
            name: self.name,
            contact,
            default_payment_terms_days: self.payment_terms_days,
            default_currency: self.currency,
            active: self.active,
            created_at: DateFixtures::created_at(),
            updated_at: DateFixtures::created_at(),
        }
    }

    /// Builds the billing profile the generator would see for this client
    pub fn build_profile(self) -> BillingProfile {
        BillingProfile {
            client_id: self.id,
            name: self.name,
            payment_terms_days: self.payment_terms_days,
            currency: self.currency,
            is_active: self.active,
        }
    }
}

/// Builder for standalone invoices
pub struct TestInvoiceBuilder {
    tenant_id: TenantId,
    client_id: ClientId,
    project_id: Option<ProjectId>,
    schedule_id: Option<ScheduleId>,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    currency: Currency,
    line_items: Option<Vec<LineItem>>,
    tax_rate: Rate,
    discount: Option<Money>,
}

impl Default for TestInvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestInvoiceBuilder {
    /// Creates a builder for a draft USD invoice with one line item
    pub fn new() -> Self {
        Self {
            tenant_id: IdFixtures::tenant_id(),
            client_id: IdFixtures::client_id(),
            project_id: None,
            schedule_id: None,
            issue_date: DateFixtures::schedule_start(),
            due_date: None,
            currency: Currency::USD,
            line_items: None,
            tax_rate: Rate::zero(),
            discount: None,
        }
    }

    /// Sets the owning tenant
    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Sets the billed client
    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    /// Links the invoice to a project
    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Links the invoice to an originating schedule
    pub fn with_schedule(mut self, schedule_id: ScheduleId) -> Self {
        self.schedule_id = Some(schedule_id);
        self
    }

    /// Sets the issue date; the due date stays 14 days after it unless set
    pub fn with_issue_date(mut self, date: NaiveDate) -> Self {
        self.issue_date = date;
        self
    }

    /// Pins the due date
    pub fn with_due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    /// Sets the invoice currency; the default line item follows it
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Replaces the line items
    pub fn with_lines(mut self, lines: Vec<LineItem>) -> Self {
        self.line_items = Some(lines);
        self
    }

    /// Appends a line item
    pub fn add_line(mut self, line: LineItem) -> Self {
        self.line_items.get_or_insert_with(Vec::new).push(line);
        self
    }

    /// Sets the tax rate
    pub fn with_tax_rate(mut self, rate: Rate) -> Self {
        self.tax_rate = rate;
        self
    }

    /// Sets the flat discount
    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Builds the invoice with totals computed by the domain
    ///
    /// # Panics
    ///
    /// Panics when a line or the discount does not match the invoice
    /// currency.
    pub fn build(self) -> Invoice {
        let due_date = self
            .due_date
            .unwrap_or(self.issue_date + Duration::days(14));
        let mut invoice = Invoice::new(
            self.tenant_id,
            self.client_id,
            self.issue_date,
            due_date,
            self.currency,
        );
        invoice.project_id = self.project_id;
        invoice.schedule_id = self.schedule_id;
        invoice
            .set_tax_rate(self.tax_rate)
            .expect("draft invoice accepts a tax rate");
        if let Some(discount) = self.discount {
            invoice
                .set_discount(discount)
                .expect("discount matches invoice currency");
        }
        let lines = self.line_items.unwrap_or_else(|| {
            vec![LineItem::new(
                StringFixtures::line_description(),
                dec!(1),
                Money::new(dec!(1500.00), self.currency),
            )]
        });
        for line in lines {
            invoice
                .add_line(line)
                .expect("line matches invoice currency");
        }
        invoice
    }
}
