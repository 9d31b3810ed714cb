//! Comprehensive tests for domain_clients

use core_kernel::{Currency, TenantId};
use validator::Validate;

use domain_clients::client::{Client, ContactInfo};
use domain_clients::error::ClientError;
use domain_clients::ports::{CreateClientRequest, UpdateClientRequest};

// ============================================================================
// Contact Info Tests
// ============================================================================

mod contact_info_tests {
    use super::*;

    #[test]
    fn test_contact_with_all_fields() {
        let contact = ContactInfo::new("billing@acme.example")
            .with_phone("+1 555 0100")
            .with_address_lines(vec![
                "Acme Corp".to_string(),
                "1 Market Street".to_string(),
                "San Francisco, CA 94105".to_string(),
            ]);

        assert!(contact.validate().is_ok());
        assert_eq!(contact.phone.as_deref(), Some("+1 555 0100"));
        assert_eq!(
            contact.format_address().as_deref(),
            Some("Acme Corp\n1 Market Street\nSan Francisco, CA 94105")
        );
    }

    #[test]
    fn test_contact_without_address() {
        let contact = ContactInfo::new("billing@acme.example");
        assert_eq!(contact.format_address(), None);
    }

    #[test]
    fn test_contact_rejects_bad_email() {
        let contact = ContactInfo::new("not-an-email");
        assert!(contact.validate().is_err());
    }

    #[test]
    fn test_contact_serde_round_trip() {
        let contact = ContactInfo::new("a@b.example").with_phone("555");
        let json = serde_json::to_string(&contact).unwrap();
        let back: ContactInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, contact);
    }
}

// ============================================================================
// Client Aggregate Tests
// ============================================================================

mod client_tests {
    use super::*;

    fn create_test_client() -> Client {
        Client::new(
            TenantId::new_v7(),
            "Acme Corp",
            ContactInfo::new("billing@acme.example"),
            30,
            Currency::USD,
        )
        .expect("test client should build")
    }

    #[test]
    fn test_new_client_is_active() {
        let client = create_test_client();

        assert!(client.is_active());
        assert_eq!(client.name, "Acme Corp");
        assert_eq!(client.default_payment_terms_days, 30);
        assert_eq!(client.default_currency, Currency::USD);
    }

    #[test]
    fn test_new_client_rejects_blank_name() {
        let result = Client::new(
            TenantId::new_v7(),
            "  ",
            ContactInfo::new("a@b.example"),
            30,
            Currency::USD,
        );
        assert!(matches!(result, Err(ClientError::InvalidData(_))));
    }

    #[test]
    fn test_new_client_rejects_bad_email() {
        let result = Client::new(
            TenantId::new_v7(),
            "Acme",
            ContactInfo::new("nope"),
            30,
            Currency::USD,
        );
        assert!(matches!(result, Err(ClientError::ValidationFailed(_))));
    }

    #[test]
    fn test_deactivate_reactivate_cycle() {
        let mut client = create_test_client();

        client.deactivate();
        assert!(!client.is_active());

        // Contact changes are blocked while inactive
        let result = client.update_contact(ContactInfo::new("new@acme.example"));
        assert!(matches!(result, Err(ClientError::InactiveClient)));

        client.reactivate();
        assert!(client.is_active());
        assert!(client
            .update_contact(ContactInfo::new("new@acme.example"))
            .is_ok());
        assert_eq!(client.contact.email, "new@acme.example");
    }

    #[test]
    fn test_update_contact_validates() {
        let mut client = create_test_client();
        let result = client.update_contact(ContactInfo::new("broken"));
        assert!(result.is_err());
        assert_eq!(
            client.contact.email, "billing@acme.example",
            "Failed update must not change the contact"
        );
    }
}

// ============================================================================
// Request DTO Tests
// ============================================================================

mod request_tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let request = CreateClientRequest::new("Acme", ContactInfo::new("a@b.example"));

        assert!(request.validate().is_ok());
        assert_eq!(request.default_payment_terms_days, 30);
        assert_eq!(request.default_currency, Currency::USD);
    }

    #[test]
    fn test_create_request_builders() {
        let request = CreateClientRequest::new("Acme", ContactInfo::new("a@b.example"))
            .with_payment_terms(14)
            .with_currency(Currency::EUR);

        assert_eq!(request.default_payment_terms_days, 14);
        assert_eq!(request.default_currency, Currency::EUR);
    }

    #[test]
    fn test_create_request_rejects_empty_name() {
        let request = CreateClientRequest::new("", ContactInfo::new("a@b.example"));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_request_validates_nested_contact() {
        let request = CreateClientRequest::new("Acme", ContactInfo::new("broken"));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_request_default_changes_nothing() {
        let request = UpdateClientRequest::default();

        assert!(request.validate().is_ok());
        assert!(request.name.is_none());
        assert!(request.contact.is_none());
        assert!(request.default_payment_terms_days.is_none());
        assert!(request.default_currency.is_none());
        assert!(request.is_active.is_none());
    }
}
