//! PostgreSQL Client Adapter
//!
//! This module provides the database adapter for the client domain,
//! implementing `ClientPort` for full client management and the billing
//! domain's read-only `ClientDirectory` for invoice generation.
//!
//! Both traits are served by the same adapter so the generator and the
//! client management surface observe one consistent view of a client.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};
use validator::Validate;

use core_kernel::{
    AdapterHealth, ClientId, Currency, DomainPort, HealthCheckResult, HealthCheckable,
    OperationContext, PortError, TenantId,
};
use domain_billing::{BillingProfile, ClientDirectory};
use domain_clients::{Client, ClientPort, ContactInfo, CreateClientRequest, UpdateClientRequest};

use crate::error::DatabaseError;
use crate::repositories::clients::{ClientRepository, ClientRow};

/// PostgreSQL-backed implementation of ClientPort and ClientDirectory
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants through the
/// `DatabaseError` mapping; request validation failures surface as
/// `PortError::Validation` before any statement runs.
#[derive(Debug, Clone)]
pub struct PostgresClientAdapter {
    clients: ClientRepository,
    pool: PgPool,
}

impl PostgresClientAdapter {
    /// Creates a new PostgreSQL client adapter
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            clients: ClientRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresClientAdapter {}

#[async_trait]
impl HealthCheckable for PostgresClientAdapter {
    /// Checks database connectivity
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-client-adapter".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-client-adapter".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl ClientPort for PostgresClientAdapter {
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, client_id = %id))]
    async fn get_client(&self, ctx: &OperationContext, id: ClientId) -> Result<Client, PortError> {
        debug!("Fetching client");

        let row = self
            .clients
            .fetch(*ctx.tenant_id.as_uuid(), *id.as_uuid())
            .await
            .map_err(PortError::from)?;

        row_to_client(row)
    }

    #[instrument(skip(self, ctx, request), fields(tenant_id = %ctx.tenant_id))]
    async fn create_client(
        &self,
        ctx: &OperationContext,
        request: CreateClientRequest,
    ) -> Result<Client, PortError> {
        debug!("Creating client");

        request
            .validate()
            .map_err(|e| PortError::validation(e.to_string()))?;

        let client = Client::new(
            ctx.tenant_id,
            request.name,
            request.contact,
            request.default_payment_terms_days,
            request.default_currency,
        )
        .map_err(|e| PortError::validation(e.to_string()))?;

        self.clients
            .insert(&client_to_row(&client))
            .await
            .map_err(PortError::from)?;

        Ok(client)
    }

    #[instrument(skip(self, ctx, request), fields(tenant_id = %ctx.tenant_id, client_id = %id))]
    async fn update_client(
        &self,
        ctx: &OperationContext,
        id: ClientId,
        request: UpdateClientRequest,
    ) -> Result<Client, PortError> {
        debug!("Updating client");

        request
            .validate()
            .map_err(|e| PortError::validation(e.to_string()))?;

        let mut client = self.get_client(ctx, id).await?;
        if let Some(name) = request.name {
            client.name = name;
        }
        if let Some(contact) = request.contact {
            client.contact = contact;
        }
        if let Some(days) = request.default_payment_terms_days {
            client.default_payment_terms_days = days;
        }
        if let Some(currency) = request.default_currency {
            client.default_currency = currency;
        }
        if let Some(is_active) = request.is_active {
            client.active = is_active;
        }
        client.updated_at = Utc::now();

        self.clients
            .update(&client_to_row(&client))
            .await
            .map_err(PortError::from)?;

        Ok(client)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, client_id = %id))]
    async fn deactivate_client(
        &self,
        ctx: &OperationContext,
        id: ClientId,
    ) -> Result<(), PortError> {
        debug!("Deactivating client");

        self.clients
            .set_active(*ctx.tenant_id.as_uuid(), *id.as_uuid(), false, Utc::now())
            .await
            .map_err(PortError::from)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    async fn list_active(&self, ctx: &OperationContext) -> Result<Vec<Client>, PortError> {
        debug!("Listing active clients");

        self.clients
            .list_active(*ctx.tenant_id.as_uuid())
            .await
            .map_err(PortError::from)?
            .into_iter()
            .map(row_to_client)
            .collect()
    }
}

#[async_trait]
impl ClientDirectory for PostgresClientAdapter {
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, client_id = %client_id))]
    async fn billing_profile(
        &self,
        ctx: &OperationContext,
        client_id: ClientId,
    ) -> Result<BillingProfile, PortError> {
        debug!("Resolving billing profile");

        let row = self
            .clients
            .fetch(*ctx.tenant_id.as_uuid(), *client_id.as_uuid())
            .await
            .map_err(PortError::from)?;
        let client = row_to_client(row)?;

        Ok(BillingProfile {
            client_id: client.id,
            name: client.name,
            payment_terms_days: client.default_payment_terms_days,
            currency: client.default_currency,
            is_active: client.active,
        })
    }
}

// =============================================================================
// Conversion Functions
// =============================================================================

/// Converts a client aggregate to its database row
fn client_to_row(client: &Client) -> ClientRow {
    ClientRow {
        id: *client.id.as_uuid(),
        tenant_id: *client.tenant_id.as_uuid(),
        name: client.name.clone(),
        email: client.contact.email.clone(),
        phone: client.contact.phone.clone(),
        address_lines: client.contact.address_lines.clone(),
        default_payment_terms_days: i32::from(client.default_payment_terms_days),
        default_currency: client.default_currency.code().to_string(),
        is_active: client.active,
        created_at: client.created_at,
        updated_at: client.updated_at,
    }
}

/// Rebuilds a client aggregate from its database row
fn row_to_client(row: ClientRow) -> Result<Client, PortError> {
    let currency = row.default_currency.parse::<Currency>().map_err(|e| {
        PortError::internal(format!("corrupt client row {}: {}", row.id, e))
    })?;
    let terms = u16::try_from(row.default_payment_terms_days).map_err(|_| {
        PortError::internal(format!(
            "corrupt client row {}: payment terms out of range",
            row.id
        ))
    })?;

    Ok(Client {
        id: ClientId::from_uuid(row.id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        name: row.name,
        contact: ContactInfo {
            email: row.email,
            phone: row.phone,
            address_lines: row.address_lines,
        },
        default_payment_terms_days: terms,
        default_currency: currency,
        active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
