//! Client Domain Ports
//!
//! This module defines the port interfaces for the client domain, enabling
//! swappable implementations (internal database, external CRM, mock, etc.).
//!
//! # Architecture
//!
//! The `ClientPort` trait defines all operations the client domain needs
//! from its data source. Multiple adapters can implement this trait:
//!
//! - **Internal Adapter**: Uses PostgreSQL database (infra_db)
//! - **External API Adapter**: Calls an external CRM or customer system
//! - **Mock Adapter**: For testing without external dependencies
//!
//! # Tenancy
//!
//! Every operation takes an [`OperationContext`] and is scoped to its
//! `tenant_id`. A client belonging to another tenant is indistinguishable
//! from a client that does not exist.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_clients::ports::ClientPort;
//! use std::sync::Arc;
//!
//! pub struct ClientService {
//!     clients: Arc<dyn ClientPort>,
//! }
//!
//! impl ClientService {
//!     pub async fn get(&self, ctx: &OperationContext, id: ClientId) -> Result<Client, PortError> {
//!         self.clients.get_client(ctx, id).await
//!     }
//! }
//! ```

use async_trait::async_trait;
use validator::Validate;

use core_kernel::{
    ClientId, Currency, DomainPort, HealthCheckable, HealthCheckResult, OperationContext,
    PortError,
};

use crate::client::{Client, ContactInfo};

/// Request for creating a new client
#[derive(Debug, Clone, Validate)]
pub struct CreateClientRequest {
    /// Display name shown on invoices and proposals
    #[validate(length(min = 1, message = "display name must not be empty"))]
    pub name: String,
    /// Contact details
    #[validate(nested)]
    pub contact: ContactInfo,
    /// Payment terms applied when a schedule does not set its own
    pub default_payment_terms_days: u16,
    /// Currency applied when a schedule does not set its own
    pub default_currency: Currency,
}

impl CreateClientRequest {
    /// Creates a request with the common defaults (net 30, USD)
    pub fn new(name: impl Into<String>, contact: ContactInfo) -> Self {
        Self {
            name: name.into(),
            contact,
            default_payment_terms_days: 30,
            default_currency: Currency::USD,
        }
    }

    /// Sets the default payment terms
    pub fn with_payment_terms(mut self, days: u16) -> Self {
        self.default_payment_terms_days = days;
        self
    }

    /// Sets the default currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.default_currency = currency;
        self
    }
}

/// Request for updating a client
///
/// All fields are optional; only the fields that are set are applied.
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateClientRequest {
    /// New display name
    #[validate(length(min = 1, message = "display name must not be empty"))]
    pub name: Option<String>,
    /// New contact details (replaces the existing details wholesale)
    #[validate(nested)]
    pub contact: Option<ContactInfo>,
    /// New default payment terms
    pub default_payment_terms_days: Option<u16>,
    /// New default currency
    pub default_currency: Option<Currency>,
    /// Whether the client is active
    pub is_active: Option<bool>,
}

/// The main port trait for client domain operations
///
/// All methods are async and return `Result<T, PortError>` for consistent
/// error handling across different adapter implementations.
#[async_trait]
pub trait ClientPort: DomainPort + HealthCheckable {
    /// Retrieves a client by ID within the context's tenant
    ///
    /// # Returns
    ///
    /// The client if found, or `PortError::NotFound`
    async fn get_client(
        &self,
        ctx: &OperationContext,
        id: ClientId,
    ) -> Result<Client, PortError>;

    /// Creates a new client in the context's tenant
    ///
    /// The request is validated before persistence; a malformed request
    /// yields `PortError::Validation`.
    ///
    /// # Returns
    ///
    /// The created client with its generated ID
    async fn create_client(
        &self,
        ctx: &OperationContext,
        request: CreateClientRequest,
    ) -> Result<Client, PortError>;

    /// Updates an existing client
    ///
    /// # Returns
    ///
    /// The updated client
    async fn update_client(
        &self,
        ctx: &OperationContext,
        id: ClientId,
        request: UpdateClientRequest,
    ) -> Result<Client, PortError>;

    /// Deactivates a client (soft delete)
    ///
    /// Existing invoices and schedules keep their references; new invoice
    /// generation against the client is blocked.
    async fn deactivate_client(
        &self,
        ctx: &OperationContext,
        id: ClientId,
    ) -> Result<(), PortError>;

    /// Lists all active clients in the context's tenant
    async fn list_active(&self, ctx: &OperationContext) -> Result<Vec<Client>, PortError>;
}

/// Extension trait for ClientPort with convenience methods
#[async_trait]
pub trait ClientPortExt: ClientPort {
    /// Gets a client and requires it to be active
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if absent, `PortError::Validation` if the
    /// client exists but has been deactivated.
    async fn get_active_client(
        &self,
        ctx: &OperationContext,
        id: ClientId,
    ) -> Result<Client, PortError> {
        let client = self.get_client(ctx, id).await?;
        if !client.is_active() {
            return Err(PortError::validation(format!("client {} is inactive", id)));
        }
        Ok(client)
    }

    /// Creates a client from just a name and email with default terms
    async fn create_basic(
        &self,
        ctx: &OperationContext,
        name: impl Into<String> + Send,
        email: impl Into<String> + Send,
    ) -> Result<Client, PortError> {
        self.create_client(ctx, CreateClientRequest::new(name, ContactInfo::new(email)))
            .await
    }

    /// Checks whether a client exists in the context's tenant
    async fn client_exists(
        &self,
        ctx: &OperationContext,
        id: ClientId,
    ) -> Result<bool, PortError> {
        match self.get_client(ctx, id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// Blanket implementation for all ClientPort implementors
impl<T: ClientPort> ClientPortExt for T {}

/// Mock implementation of ClientPort for testing
///
/// This adapter stores clients in memory and is useful for unit testing
/// without database or external API dependencies.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory mock implementation of ClientPort
    #[derive(Debug, Default)]
    pub struct MockClientPort {
        clients: Arc<RwLock<HashMap<ClientId, Client>>>,
    }

    impl MockClientPort {
        /// Creates a new mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with clients for testing
        pub async fn with_clients(clients: Vec<Client>) -> Self {
            let port = Self::new();
            for client in clients {
                port.clients.write().await.insert(client.id, client);
            }
            port
        }
    }

    impl DomainPort for MockClientPort {}

    #[async_trait]
    impl HealthCheckable for MockClientPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-client-port".to_string(),
                status: core_kernel::AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl ClientPort for MockClientPort {
        async fn get_client(
            &self,
            ctx: &OperationContext,
            id: ClientId,
        ) -> Result<Client, PortError> {
            self.clients
                .read()
                .await
                .get(&id)
                .filter(|c| c.tenant_id == ctx.tenant_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Client", id))
        }

        async fn create_client(
            &self,
            ctx: &OperationContext,
            request: CreateClientRequest,
        ) -> Result<Client, PortError> {
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

            self.clients.write().await.insert(client.id, client.clone());
            Ok(client)
        }

        async fn update_client(
            &self,
            ctx: &OperationContext,
            id: ClientId,
            request: UpdateClientRequest,
        ) -> Result<Client, PortError> {
            request
                .validate()
                .map_err(|e| PortError::validation(e.to_string()))?;

            let mut clients = self.clients.write().await;
            let client = clients
                .get_mut(&id)
                .filter(|c| c.tenant_id == ctx.tenant_id)
                .ok_or_else(|| PortError::not_found("Client", id))?;

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

            Ok(client.clone())
        }

        async fn deactivate_client(
            &self,
            ctx: &OperationContext,
            id: ClientId,
        ) -> Result<(), PortError> {
            let mut clients = self.clients.write().await;
            let client = clients
                .get_mut(&id)
                .filter(|c| c.tenant_id == ctx.tenant_id)
                .ok_or_else(|| PortError::not_found("Client", id))?;
            client.deactivate();
            Ok(())
        }

        async fn list_active(&self, ctx: &OperationContext) -> Result<Vec<Client>, PortError> {
            let clients = self.clients.read().await;
            let mut active: Vec<_> = clients
                .values()
                .filter(|c| c.tenant_id == ctx.tenant_id && c.is_active())
                .cloned()
                .collect();
            active.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(active)
        }
    }
}
