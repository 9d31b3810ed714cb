//! Invoice repository
//!
//! This module provides database access for invoices and their line items.
//! An invoice and its lines are always written in one transaction; a
//! half-persisted invoice is never observable. Every statement is scoped
//! by `tenant_id`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

/// One row of the `invoices` table
///
/// Monetary columns are `NUMERIC` and carry the totals exactly as the
/// domain computed them; the `status` and `currency` columns are text and
/// parsed back through the domain `FromStr` implementations.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub client_id: Uuid,
    pub project_id: Option<Uuid>,
    pub schedule_id: Option<Uuid>,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub tax_rate: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the `invoice_line_items` table
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceItemRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub tenant_id: Uuid,
    pub position: i32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

const INVOICE_COLUMNS: &str = "id, tenant_id, client_id, project_id, schedule_id, \
     invoice_number, issue_date, due_date, currency, tax_rate, subtotal, tax_amount, \
     discount_amount, total, status, sent_at, viewed_at, paid_at, notes, created_at, updated_at";

/// Repository for invoice rows
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository with the given connection pool
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an invoice with its line items in one transaction
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::DuplicateEntry` if an invoice with the same
    /// ID already exists.
    pub async fn insert(
        &self,
        row: &InvoiceRow,
        items: &[InvoiceItemRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        Self::insert_on(&mut tx, row, items).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Inserts an invoice and its items on an existing connection
    pub(crate) async fn insert_on(
        conn: &mut PgConnection,
        row: &InvoiceRow,
        items: &[InvoiceItemRow],
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, tenant_id, client_id, project_id, schedule_id, invoice_number,
                issue_date, due_date, currency, tax_rate, subtotal, tax_amount,
                discount_amount, total, status, sent_at, viewed_at, paid_at,
                notes, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21
            )
            "#,
        )
        .bind(row.id)
        .bind(row.tenant_id)
        .bind(row.client_id)
        .bind(row.project_id)
        .bind(row.schedule_id)
        .bind(&row.invoice_number)
        .bind(row.issue_date)
        .bind(row.due_date)
        .bind(&row.currency)
        .bind(row.tax_rate)
        .bind(row.subtotal)
        .bind(row.tax_amount)
        .bind(row.discount_amount)
        .bind(row.total)
        .bind(&row.status)
        .bind(row.sent_at)
        .bind(row.viewed_at)
        .bind(row.paid_at)
        .bind(&row.notes)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *conn)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO invoice_line_items (
                    id, invoice_id, tenant_id, position, description,
                    quantity, unit_price, amount
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(item.invoice_id)
            .bind(item.tenant_id)
            .bind(item.position)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.amount)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Fetches an invoice with its line items
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no invoice with that ID exists
    /// under the tenant.
    pub async fn fetch(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<(InvoiceRow, Vec<InvoiceItemRow>), DatabaseError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE tenant_id = $1 AND id = $2",
            INVOICE_COLUMNS
        ))
        .bind(tenant_id)
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Invoice", invoice_id))?;

        let items = sqlx::query_as::<_, InvoiceItemRow>(
            r#"
            SELECT id, invoice_id, tenant_id, position, description,
                   quantity, unit_price, amount
            FROM invoice_line_items
            WHERE tenant_id = $1 AND invoice_id = $2
            ORDER BY position
            "#,
        )
        .bind(tenant_id)
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok((row, items))
    }

    /// Persists an invoice status change with its lifecycle timestamps
    ///
    /// The caller is responsible for validating the transition through the
    /// domain rules before persisting.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no invoice with that ID exists
    /// under the tenant.
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
        status: &str,
        sent_at: Option<DateTime<Utc>>,
        viewed_at: Option<DateTime<Utc>>,
        paid_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status = $3,
                sent_at = $4,
                viewed_at = $5,
                paid_at = $6,
                updated_at = $7
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(invoice_id)
        .bind(status)
        .bind(sent_at)
        .bind(viewed_at)
        .bind(paid_at)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Invoice", invoice_id));
        }
        Ok(())
    }

    /// True when an invoice generated from `schedule_id` was issued on
    /// `run_date`
    ///
    /// This is the generator's idempotency probe: at most one invoice per
    /// schedule per run date.
    pub async fn exists_for_run(
        &self,
        tenant_id: Uuid,
        schedule_id: Uuid,
        run_date: NaiveDate,
    ) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM invoices
                WHERE tenant_id = $1 AND schedule_id = $2 AND issue_date = $3
            )
            "#,
        )
        .bind(tenant_id)
        .bind(schedule_id)
        .bind(run_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
