//! Client aggregate
//!
//! A client is the billable counterparty for schedules, invoices, and
//! proposals. Clients belong to exactly one tenant and carry the billing
//! defaults (payment terms, currency) that recurring schedules fall back to
//! when they do not specify their own.

use chrono::{DateTime, Utc};
use core_kernel::{ClientId, Currency, TenantId};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ClientError;

/// Contact details for a client
///
/// The email address is mandatory and must be well formed; phone and postal
/// address lines are free-form and optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ContactInfo {
    /// Primary email address for invoice delivery
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// Contact phone number
    pub phone: Option<String>,
    /// Postal address as display lines, top to bottom
    pub address_lines: Vec<String>,
}

impl ContactInfo {
    /// Creates contact info with just an email address
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            phone: None,
            address_lines: Vec::new(),
        }
    }

    /// Sets the phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the postal address lines
    pub fn with_address_lines(mut self, lines: Vec<String>) -> Self {
        self.address_lines = lines;
        self
    }

    /// Formats the postal address for display, one line per entry
    ///
    /// Returns `None` when no address lines are recorded.
    pub fn format_address(&self) -> Option<String> {
        if self.address_lines.is_empty() {
            None
        } else {
            Some(self.address_lines.join("\n"))
        }
    }
}

/// A billable client within a tenant
///
/// Deactivated clients are retained for history but are excluded from
/// active listings and block new invoice generation against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier
    pub id: ClientId,
    /// Owning tenant; every read and write is scoped to this
    pub tenant_id: TenantId,
    /// Display name shown on invoices and proposals
    pub name: String,
    /// Contact details
    pub contact: ContactInfo,
    /// Payment terms applied when a schedule does not set its own
    pub default_payment_terms_days: u16,
    /// Currency applied when a schedule does not set its own
    pub default_currency: Currency,
    /// Whether the client can be billed
    pub active: bool,
    /// When the client was created
    pub created_at: DateTime<Utc>,
    /// When the client was last modified
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Creates a new active client
    ///
    /// Validates the display name and contact details before constructing
    /// the aggregate.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidData` for an empty name or
    /// `ClientError::ValidationFailed` for malformed contact details.
    pub fn new(
        tenant_id: TenantId,
        name: impl Into<String>,
        contact: ContactInfo,
        default_payment_terms_days: u16,
        default_currency: Currency,
    ) -> Result<Self, ClientError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ClientError::invalid("display name must not be empty"));
        }
        contact.validate()?;

        let now = Utc::now();
        Ok(Self {
            id: ClientId::new_v7(),
            tenant_id,
            name,
            contact,
            default_payment_terms_days,
            default_currency,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the client can currently be billed
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Replaces the contact details
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InactiveClient` if the client has been
    /// deactivated, or `ClientError::ValidationFailed` for malformed
    /// contact details.
    pub fn update_contact(&mut self, contact: ContactInfo) -> Result<(), ClientError> {
        if !self.active {
            return Err(ClientError::InactiveClient);
        }
        contact.validate()?;
        self.contact = contact;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Deactivates the client (soft delete)
    ///
    /// Existing invoices and schedules keep their references; new
    /// generation against this client is blocked. Idempotent.
    pub fn deactivate(&mut self) {
        if self.active {
            self.active = false;
            self.updated_at = Utc::now();
        }
    }

    /// Reactivates a previously deactivated client. Idempotent.
    pub fn reactivate(&mut self) {
        if !self.active {
            self.active = true;
            self.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_contact() -> ContactInfo {
        ContactInfo::new("billing@acme.example")
            .with_phone("+1-555-0100")
            .with_address_lines(vec![
                "100 Main St".to_string(),
                "Springfield".to_string(),
            ])
    }

    fn test_client() -> Client {
        Client::new(
            TenantId::new_v7(),
            "Acme Corp",
            test_contact(),
            30,
            Currency::USD,
        )
        .unwrap()
    }

    #[test]
    fn test_new_client_is_active_with_defaults() {
        let client = test_client();
        assert!(client.is_active());
        assert_eq!(client.name, "Acme Corp");
        assert_eq!(client.default_payment_terms_days, 30);
        assert_eq!(client.default_currency, Currency::USD);
        assert_eq!(client.created_at, client.updated_at);
    }

    #[test]
    fn test_new_rejects_empty_name() {
        let result = Client::new(
            TenantId::new_v7(),
            "   ",
            test_contact(),
            30,
            Currency::USD,
        );
        assert!(matches!(result, Err(ClientError::InvalidData(_))));
    }

    #[test]
    fn test_new_rejects_malformed_email() {
        let result = Client::new(
            TenantId::new_v7(),
            "Acme Corp",
            ContactInfo::new("not-an-email"),
            30,
            Currency::USD,
        );
        assert!(matches!(result, Err(ClientError::ValidationFailed(_))));
    }

    #[test]
    fn test_update_contact() {
        let mut client = test_client();
        let before = client.updated_at;

        client
            .update_contact(ContactInfo::new("accounts@acme.example"))
            .unwrap();

        assert_eq!(client.contact.email, "accounts@acme.example");
        assert!(client.updated_at >= before);
    }

    #[test]
    fn test_update_contact_rejects_malformed_email() {
        let mut client = test_client();
        let result = client.update_contact(ContactInfo::new("nope"));
        assert!(matches!(result, Err(ClientError::ValidationFailed(_))));
        assert_eq!(client.contact.email, "billing@acme.example");
    }

    #[test]
    fn test_update_contact_blocked_when_inactive() {
        let mut client = test_client();
        client.deactivate();

        let result = client.update_contact(ContactInfo::new("new@acme.example"));
        assert!(matches!(result, Err(ClientError::InactiveClient)));
    }

    #[test]
    fn test_deactivate_and_reactivate() {
        let mut client = test_client();

        client.deactivate();
        assert!(!client.is_active());

        // Idempotent
        client.deactivate();
        assert!(!client.is_active());

        client.reactivate();
        assert!(client.is_active());
    }

    #[test]
    fn test_format_address() {
        let contact = test_contact();
        assert_eq!(
            contact.format_address(),
            Some("100 Main St\nSpringfield".to_string())
        );

        let bare = ContactInfo::new("a@b.example");
        assert_eq!(bare.format_address(), None);
    }

    #[test]
    fn test_client_serde_roundtrip() {
        let client = test_client();
        let json = serde_json::to_string(&client).unwrap();
        let back: Client = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, client.id);
        assert_eq!(back.contact, client.contact);
        assert_eq!(back.default_currency, client.default_currency);
    }
}
