//! Ticket model
//!
//! Structured sale data as it arrives from the point of sale. Values are
//! printed as given; the renderer never recomputes totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One sale receipt
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[validate(length(min = 1, message = "business name is required"))]
    pub business_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    /// Tax registration number (RFC)
    #[serde(default)]
    pub tax_id: String,
    /// Already formatted by the caller
    #[validate(length(min = 1, message = "date is required"))]
    pub date_time: String,
    #[validate(length(min = 1, message = "ticket number is required"))]
    pub ticket_number: String,
    #[serde(default)]
    pub cashier_name: String,
    #[validate(length(min = 1, message = "at least one item is required"))]
    #[validate(nested)]
    pub items: Vec<TicketItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub qr_content: Option<String>,
}

/// One line of a ticket
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TicketItem {
    #[validate(length(min = 1, message = "item name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl Ticket {
    /// QR payload, if one was given and is not blank
    ///
    /// The content is returned as sent; surrounding whitespace is part of it.
    pub fn qr_payload(&self) -> Option<&str> {
        self.qr_content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_json() -> &'static str {
        r#"{
            "businessName": "Tienda X",
            "address": "Av. Juárez 12",
            "dateTime": "2024-03-01 10:15",
            "ticketNumber": "A-001",
            "cashierName": "Ana",
            "items": [
                {"name": "Pan", "quantity": 2, "unitPrice": 1.5, "total": 3.0}
            ],
            "subtotal": 5.0,
            "tax": 0.8,
            "total": 5.8,
            "paymentMethod": "Efectivo"
        }"#
    }

    #[test]
    fn test_deserialize_camel_case() {
        let ticket: Ticket = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(ticket.business_name, "Tienda X");
        assert_eq!(ticket.phone, "");
        assert_eq!(ticket.items[0].quantity, 2);
        assert_eq!(ticket.items[0].unit_price, Decimal::from_str("1.5").unwrap());
        assert_eq!(ticket.total, Decimal::from_str("5.8").unwrap());
        assert!(ticket.qr_content.is_none());
        assert!(ticket.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_items() {
        let mut ticket: Ticket = serde_json::from_str(sample_json()).unwrap();
        ticket.items.clear();
        let errors = ticket.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn test_validation_rejects_zero_quantity() {
        let mut ticket: Ticket = serde_json::from_str(sample_json()).unwrap();
        ticket.items[0].quantity = 0;
        assert!(ticket.validate().is_err());
    }

    #[test]
    fn test_qr_payload_ignores_blank() {
        let mut ticket: Ticket = serde_json::from_str(sample_json()).unwrap();
        ticket.qr_content = Some("   ".to_string());
        assert_eq!(ticket.qr_payload(), None);

        ticket.qr_content = Some("https://example.com/t/1".to_string());
        assert_eq!(ticket.qr_payload(), Some("https://example.com/t/1"));

        ticket.qr_content = Some(" abc ".to_string());
        assert_eq!(ticket.qr_payload(), Some(" abc "));
    }
}
