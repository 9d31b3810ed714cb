//! Recurrence schedule repository
//!
//! This module provides database access for recurrence schedules and their
//! line item templates. Every statement is scoped by `tenant_id`; a row
//! belonging to another tenant is indistinguishable from a missing row.
//!
//! # Concurrency
//!
//! Schedule writes use optimistic concurrency: the `UPDATE` carries a
//! `WHERE version = $expected` guard and bumps the stored version by one.
//! A guard miss on an existing row surfaces as
//! [`DatabaseError::VersionConflict`]. Due-schedule listing additionally
//! uses `FOR UPDATE SKIP LOCKED` so parallel sweepers do not contend over
//! the same rows.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

/// One row of the `recurrence_schedules` table
///
/// Enum-valued columns (`frequency`, `status`, `currency`) are stored as
/// lowercase/uppercase text and parsed back through the domain `FromStr`
/// implementations by the adapter layer.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduleRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub client_id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub frequency: String,
    pub interval_count: i32,
    pub day_of_week: Option<i16>,
    pub day_of_month: Option<i16>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub max_occurrences: Option<i32>,
    pub invoice_count: i32,
    pub next_run_date: Option<NaiveDate>,
    pub last_run_date: Option<NaiveDate>,
    pub status: String,
    pub tax_rate: Decimal,
    pub discount: Decimal,
    pub payment_terms_days: Option<i32>,
    pub auto_send: bool,
    pub last_invoice_id: Option<Uuid>,
    pub currency: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the `schedule_line_items` table
///
/// Line item templates are replaced wholesale on every schedule update;
/// `position` preserves their display order.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduleItemRow {
    pub schedule_id: Uuid,
    pub tenant_id: Uuid,
    pub position: i32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

const SCHEDULE_COLUMNS: &str = "id, tenant_id, client_id, project_id, title, frequency, \
     interval_count, day_of_week, day_of_month, start_date, end_date, max_occurrences, \
     invoice_count, next_run_date, last_run_date, status, tax_rate, discount, \
     payment_terms_days, auto_send, last_invoice_id, currency, version, created_at, updated_at";

/// Repository for recurrence schedule rows
#[derive(Debug, Clone)]
pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    /// Creates a new ScheduleRepository with the given connection pool
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a schedule with its line item templates in one transaction
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::DuplicateEntry` if a schedule with the same
    /// ID already exists.
    pub async fn insert(
        &self,
        row: &ScheduleRow,
        items: &[ScheduleItemRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        Self::insert_on(&mut tx, row, items).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Inserts a schedule and its items on an existing connection
    pub(crate) async fn insert_on(
        conn: &mut PgConnection,
        row: &ScheduleRow,
        items: &[ScheduleItemRow],
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO recurrence_schedules (
                id, tenant_id, client_id, project_id, title, frequency,
                interval_count, day_of_week, day_of_month, start_date, end_date,
                max_occurrences, invoice_count, next_run_date, last_run_date,
                status, tax_rate, discount, payment_terms_days, auto_send,
                last_invoice_id, currency, version, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
            )
            "#,
        )
        .bind(row.id)
        .bind(row.tenant_id)
        .bind(row.client_id)
        .bind(row.project_id)
        .bind(&row.title)
        .bind(&row.frequency)
        .bind(row.interval_count)
        .bind(row.day_of_week)
        .bind(row.day_of_month)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.max_occurrences)
        .bind(row.invoice_count)
        .bind(row.next_run_date)
        .bind(row.last_run_date)
        .bind(&row.status)
        .bind(row.tax_rate)
        .bind(row.discount)
        .bind(row.payment_terms_days)
        .bind(row.auto_send)
        .bind(row.last_invoice_id)
        .bind(&row.currency)
        .bind(row.version)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *conn)
        .await?;

        Self::insert_items_on(conn, items).await
    }

    async fn insert_items_on(
        conn: &mut PgConnection,
        items: &[ScheduleItemRow],
    ) -> Result<(), DatabaseError> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO schedule_line_items (
                    schedule_id, tenant_id, position, description, quantity, unit_price
                ) VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(item.schedule_id)
            .bind(item.tenant_id)
            .bind(item.position)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Fetches a schedule with its line item templates
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no schedule with that ID exists
    /// under the tenant.
    pub async fn fetch(
        &self,
        tenant_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<(ScheduleRow, Vec<ScheduleItemRow>), DatabaseError> {
        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM recurrence_schedules WHERE tenant_id = $1 AND id = $2",
            SCHEDULE_COLUMNS
        ))
        .bind(tenant_id)
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Schedule", schedule_id))?;

        let items = self.fetch_items(tenant_id, &[schedule_id]).await?;
        Ok((row, items))
    }

    /// Fetches the line item templates for the given schedules, ordered by
    /// schedule and position
    pub async fn fetch_items(
        &self,
        tenant_id: Uuid,
        schedule_ids: &[Uuid],
    ) -> Result<Vec<ScheduleItemRow>, DatabaseError> {
        if schedule_ids.is_empty() {
            return Ok(Vec::new());
        }

        let items = sqlx::query_as::<_, ScheduleItemRow>(
            r#"
            SELECT schedule_id, tenant_id, position, description, quantity, unit_price
            FROM schedule_line_items
            WHERE tenant_id = $1 AND schedule_id = ANY($2)
            ORDER BY schedule_id, position
            "#,
        )
        .bind(tenant_id)
        .bind(schedule_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Replaces a schedule row under an optimistic concurrency guard
    ///
    /// The row is written only when the stored version equals
    /// `expected_version`; the write stores `expected_version + 1`. Line
    /// item templates are replaced wholesale inside the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::VersionConflict` when the stored version has
    /// moved on, or `DatabaseError::NotFound` when the row does not exist
    /// under the tenant.
    pub async fn update(
        &self,
        row: &ScheduleRow,
        items: &[ScheduleItemRow],
        expected_version: i32,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        Self::update_on(&mut tx, row, items, expected_version).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Applies the guarded schedule update on an existing connection
    pub(crate) async fn update_on(
        conn: &mut PgConnection,
        row: &ScheduleRow,
        items: &[ScheduleItemRow],
        expected_version: i32,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE recurrence_schedules SET
                client_id = $3,
                project_id = $4,
                title = $5,
                frequency = $6,
                interval_count = $7,
                day_of_week = $8,
                day_of_month = $9,
                start_date = $10,
                end_date = $11,
                max_occurrences = $12,
                invoice_count = $13,
                next_run_date = $14,
                last_run_date = $15,
                status = $16,
                tax_rate = $17,
                discount = $18,
                payment_terms_days = $19,
                auto_send = $20,
                last_invoice_id = $21,
                currency = $22,
                version = $23 + 1,
                updated_at = $24
            WHERE tenant_id = $1 AND id = $2 AND version = $23
            "#,
        )
        .bind(row.tenant_id)
        .bind(row.id)
        .bind(row.client_id)
        .bind(row.project_id)
        .bind(&row.title)
        .bind(&row.frequency)
        .bind(row.interval_count)
        .bind(row.day_of_week)
        .bind(row.day_of_month)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.max_occurrences)
        .bind(row.invoice_count)
        .bind(row.next_run_date)
        .bind(row.last_run_date)
        .bind(&row.status)
        .bind(row.tax_rate)
        .bind(row.discount)
        .bind(row.payment_terms_days)
        .bind(row.auto_send)
        .bind(row.last_invoice_id)
        .bind(&row.currency)
        .bind(expected_version)
        .bind(row.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a stale version from a missing row
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM recurrence_schedules WHERE tenant_id = $1 AND id = $2)",
            )
            .bind(row.tenant_id)
            .bind(row.id)
            .fetch_one(&mut *conn)
            .await?;

            return if exists {
                Err(DatabaseError::version_conflict("Schedule", row.id))
            } else {
                Err(DatabaseError::not_found("Schedule", row.id))
            };
        }

        sqlx::query("DELETE FROM schedule_line_items WHERE tenant_id = $1 AND schedule_id = $2")
            .bind(row.tenant_id)
            .bind(row.id)
            .execute(&mut *conn)
            .await?;

        Self::insert_items_on(conn, items).await
    }

    /// Lists schedules due on or before `as_of`, skipping rows locked by
    /// concurrent sweepers
    ///
    /// Rows are ordered oldest due date first so backlogged schedules are
    /// generated before fresh ones. The `FOR UPDATE SKIP LOCKED` clause
    /// keeps two parallel sweeps from claiming the same rows; the version
    /// guard on the subsequent write remains the actual correctness
    /// barrier.
    pub async fn list_due(
        &self,
        tenant_id: Uuid,
        as_of: NaiveDate,
        limit: i64,
    ) -> Result<Vec<ScheduleRow>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            r#"
            SELECT {}
            FROM recurrence_schedules
            WHERE tenant_id = $1
              AND status = 'active'
              AND next_run_date IS NOT NULL
              AND next_run_date <= $2
            ORDER BY next_run_date, id
            LIMIT $3
            FOR UPDATE SKIP LOCKED
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(tenant_id)
        .bind(as_of)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rows)
    }
}
