use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::Order;
use crate::domain::product::{Product, ProductId};
use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    LowStock,
    OrderUpdate,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewOrder => "new_order",
            Self::LowStock => "low_stock",
            Self::OrderUpdate => "order_update",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new_order" => Some(Self::NewOrder),
            "low_stock" => Some(Self::LowStock),
            "order_update" => Some(Self::OrderUpdate),
            _ => None,
        }
    }
}

/// In-app notification row. `product_id` is set only for low-stock alerts and
/// is the dedup key for the one-active-unread-alert-per-product invariant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub product_id: Option<ProductId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn fresh(
        user_id: UserId,
        kind: NotificationKind,
        title: String,
        message: String,
        product_id: Option<ProductId>,
    ) -> Self {
        Self {
            id: NotificationId(Uuid::new_v4().to_string()),
            user_id,
            kind,
            title,
            message,
            product_id,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn low_stock(owner: UserId, product: &Product, remaining: u32) -> Self {
        Self::fresh(
            owner,
            NotificationKind::LowStock,
            "Low Stock Alert".to_string(),
            format!(
                "Product \"{}\" is running low on stock ({remaining} remaining)",
                product.name
            ),
            Some(product.id.clone()),
        )
    }

    pub fn new_order(owner: UserId, order: &Order) -> Self {
        Self::fresh(
            owner,
            NotificationKind::NewOrder,
            format!("New Order #{}", order.order_number),
            format!(
                "You received a new order worth ${} from {}",
                order.total_amount,
                order.contact_name()
            ),
            None,
        )
    }

    pub fn order_update(customer: UserId, order: &Order) -> Self {
        Self::fresh(
            customer,
            NotificationKind::OrderUpdate,
            format!("Order #{} Updated", order.order_number),
            format!("Your order status has been changed to {}", order.status.display_name()),
            None,
        )
    }

    pub fn order_reminder(owner: UserId, order: &Order) -> Self {
        Self::fresh(
            owner,
            NotificationKind::OrderUpdate,
            format!("Reminder: Order #{}", order.order_number),
            format!(
                "Order #{} is still confirmed and waiting to be sent",
                order.order_number
            ),
            None,
        )
    }
}
