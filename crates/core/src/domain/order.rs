use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{ProductId, VariantId};
use crate::domain::shop::ShopId;
use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Confirmed,
    Waiting,
    Sent,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Waiting => "waiting",
            Self::Sent => "sent",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "confirmed" => Some(Self::Confirmed),
            "waiting" => Some(Self::Waiting),
            "sent" => Some(Self::Sent),
            "cancelled" => Some(Self::Cancelled),
            "returned" => Some(Self::Returned),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Confirmed => "Confirmed",
            Self::Waiting => "Waiting",
            Self::Sent => "Sent",
            Self::Cancelled => "Cancelled",
            Self::Returned => "Returned",
        }
    }

    /// Entering one of these states hands each line's quantity back to the
    /// product or variant stock pool. Sale history rows stay untouched.
    pub fn restocks_inventory(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }

    /// Terminal states cannot be left again; otherwise a second pass through
    /// cancelled/returned would restock the same lines twice.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }
}

/// One line of a placed order. Lines are the immutable sales ledger: once
/// persisted they are never mutated or deleted, even if the order is later
/// cancelled or returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub shop_id: ShopId,
    pub customer_id: Option<UserId>,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        !self.status.is_terminal() && next != self.status
    }

    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidOrderTransition { from: self.status, to: next })
    }

    pub fn contact_email(&self) -> Option<&str> {
        let email = self.customer_email.trim();
        (!email.is_empty()).then_some(email)
    }

    pub fn contact_name(&self) -> &str {
        let name = self.customer_name.trim();
        if name.is_empty() {
            "Customer"
        } else {
            name
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusRecord {
    pub id: String,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
}

/// Human-facing order numbers keep the legacy `0535001` series: base 535000
/// plus a 1-based sequence, zero-padded to seven digits.
pub fn order_number_for_sequence(sequence: u64) -> String {
    format!("{:07}", 535_000 + sequence)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::shop::ShopId;
    use crate::errors::DomainError;

    use super::{order_number_for_sequence, Order, OrderId, OrderStatus};

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId("O-1".to_string()),
            shop_id: ShopId("S-1".to_string()),
            customer_id: None,
            order_number: "0535001".to_string(),
            status,
            total_amount: Decimal::new(4_500, 2),
            customer_name: String::new(),
            customer_email: String::new(),
            customer_phone: String::new(),
            customer_address: String::new(),
            payment_method: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn seller_driven_transitions_between_active_states_are_allowed() {
        let mut order = order(OrderStatus::Waiting);
        order.transition_to(OrderStatus::Confirmed).expect("waiting -> confirmed");
        order.transition_to(OrderStatus::Sent).expect("confirmed -> sent");
        order.transition_to(OrderStatus::Returned).expect("sent -> returned");
        assert_eq!(order.status, OrderStatus::Returned);
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut cancelled = order(OrderStatus::Cancelled);
        let error = cancelled
            .transition_to(OrderStatus::Confirmed)
            .expect_err("cancelled orders stay cancelled");
        assert!(matches!(
            error,
            DomainError::InvalidOrderTransition { from: OrderStatus::Cancelled, .. }
        ));

        let mut returned = order(OrderStatus::Returned);
        assert!(returned.transition_to(OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn same_status_transition_is_rejected() {
        let mut order = order(OrderStatus::Confirmed);
        assert!(order.transition_to(OrderStatus::Confirmed).is_err());
    }

    #[test]
    fn restocking_states_are_exactly_cancelled_and_returned() {
        assert!(OrderStatus::Cancelled.restocks_inventory());
        assert!(OrderStatus::Returned.restocks_inventory());
        assert!(!OrderStatus::Sent.restocks_inventory());
        assert!(!OrderStatus::Draft.restocks_inventory());
    }

    #[test]
    fn contact_fields_fall_back_for_guests() {
        let mut guest = order(OrderStatus::Draft);
        assert_eq!(guest.contact_email(), None);
        assert_eq!(guest.contact_name(), "Customer");

        guest.customer_email = "nora@example.com".to_string();
        guest.customer_name = "Nora".to_string();
        assert_eq!(guest.contact_email(), Some("nora@example.com"));
        assert_eq!(guest.contact_name(), "Nora");
    }

    #[test]
    fn order_numbers_continue_the_legacy_series() {
        assert_eq!(order_number_for_sequence(1), "0535001");
        assert_eq!(order_number_for_sequence(2), "0535002");
        assert_eq!(order_number_for_sequence(10_000), "0545000");
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            OrderStatus::Draft,
            OrderStatus::Confirmed,
            OrderStatus::Waiting,
            OrderStatus::Sent,
            OrderStatus::Cancelled,
            OrderStatus::Returned,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("archived"), None);
    }
}
