//! Client repository
//!
//! This module provides database access for client records. Clients are
//! soft-deleted: deactivation flips `is_active` and existing schedules and
//! invoices keep their references. Every statement is scoped by
//! `tenant_id`.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

/// One row of the `clients` table
///
/// Postal address lines are stored as a `TEXT[]` column in display order.
#[derive(Debug, Clone, FromRow)]
pub struct ClientRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address_lines: Vec<String>,
    pub default_payment_terms_days: i32,
    pub default_currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CLIENT_COLUMNS: &str = "id, tenant_id, name, email, phone, address_lines, \
     default_payment_terms_days, default_currency, is_active, created_at, updated_at";

/// Repository for client rows
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    /// Creates a new ClientRepository with the given connection pool
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a client row
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::DuplicateEntry` if a client with the same ID
    /// already exists.
    pub async fn insert(&self, row: &ClientRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO clients (
                id, tenant_id, name, email, phone, address_lines,
                default_payment_terms_days, default_currency, is_active,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(row.id)
        .bind(row.tenant_id)
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.address_lines)
        .bind(row.default_payment_terms_days)
        .bind(&row.default_currency)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches a client by ID
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no client with that ID exists
    /// under the tenant.
    pub async fn fetch(&self, tenant_id: Uuid, client_id: Uuid) -> Result<ClientRow, DatabaseError> {
        sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {} FROM clients WHERE tenant_id = $1 AND id = $2",
            CLIENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Client", client_id))
    }

    /// Replaces a client row
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no client with that ID exists
    /// under the tenant.
    pub async fn update(&self, row: &ClientRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE clients SET
                name = $3,
                email = $4,
                phone = $5,
                address_lines = $6,
                default_payment_terms_days = $7,
                default_currency = $8,
                is_active = $9,
                updated_at = $10
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(row.tenant_id)
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.address_lines)
        .bind(row.default_payment_terms_days)
        .bind(&row.default_currency)
        .bind(row.is_active)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Client", row.id));
        }
        Ok(())
    }

    /// Sets the active flag on a client
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no client with that ID exists
    /// under the tenant.
    pub async fn set_active(
        &self,
        tenant_id: Uuid,
        client_id: Uuid,
        is_active: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE clients SET is_active = $3, updated_at = $4 WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(client_id)
        .bind(is_active)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Client", client_id));
        }
        Ok(())
    }

    /// Lists active clients under the tenant, ordered by name
    pub async fn list_active(&self, tenant_id: Uuid) -> Result<Vec<ClientRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {} FROM clients WHERE tenant_id = $1 AND is_active ORDER BY name, id",
            CLIENT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
