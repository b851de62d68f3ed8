use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use bazari_core::domain::notification::{Notification, NotificationId};
use bazari_core::domain::order::{Order, OrderId, OrderLine, OrderStatus, OrderStatusRecord};
use bazari_core::domain::product::{Product, ProductId, ProductVariant, VariantId};
use bazari_core::domain::shop::{Shop, ShopId};
use bazari_core::domain::user::{User, UserId};

pub mod memory;
pub mod notification;
pub mod order;
pub mod product;
pub mod sales;
pub mod shop;
pub mod user;

pub use memory::{
    InMemoryNotificationRepository, InMemoryOrderRepository, InMemoryProductRepository,
    InMemoryShopRepository, InMemoryUserRepository,
};
pub use notification::SqlNotificationRepository;
pub use order::SqlOrderRepository;
pub use product::SqlProductRepository;
pub use sales::SqlSalesLedger;
pub use shop::SqlShopRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn save(&self, user: &User) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ShopRepository: Send + Sync {
    async fn find_by_id(&self, id: &ShopId) -> Result<Option<Shop>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Shop>, RepositoryError>;
    async fn save(&self, shop: &Shop) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: &Product) -> Result<(), RepositoryError>;
    async fn find_variant(&self, id: &VariantId)
        -> Result<Option<ProductVariant>, RepositoryError>;
    async fn save_variant(&self, variant: &ProductVariant) -> Result<(), RepositoryError>;

    /// Atomic compare-and-decrement. Returns the remaining quantity, or `None`
    /// when the product is missing or has less stock than requested (nothing
    /// is taken in that case).
    async fn decrement_stock(
        &self,
        id: &ProductId,
        units: u32,
    ) -> Result<Option<u32>, RepositoryError>;

    async fn restock(&self, id: &ProductId, units: u32) -> Result<(), RepositoryError>;

    async fn decrement_variant_stock(
        &self,
        id: &VariantId,
        units: u32,
    ) -> Result<Option<u32>, RepositoryError>;

    async fn restock_variant(&self, id: &VariantId, units: u32) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: &Order, lines: &[OrderLine]) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn lines_for(&self, id: &OrderId) -> Result<Vec<OrderLine>, RepositoryError>;
    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    async fn append_status_history(
        &self,
        record: &OrderStatusRecord,
    ) -> Result<(), RepositoryError>;
    async fn status_history(
        &self,
        id: &OrderId,
    ) -> Result<Vec<OrderStatusRecord>, RepositoryError>;
    async fn next_order_number(&self) -> Result<String, RepositoryError>;
    async fn list_with_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<(), RepositoryError>;

    /// Dedup probe for the one-active-unread-alert-per-product invariant.
    async fn has_unread_low_stock(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<bool, RepositoryError>;

    async fn recent_for_user(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError>;
    async fn unread_count(&self, user: &UserId) -> Result<u64, RepositoryError>;
    async fn mark_read(
        &self,
        id: &NotificationId,
        user: &UserId,
    ) -> Result<bool, RepositoryError>;
    async fn mark_all_read(&self, user: &UserId) -> Result<u64, RepositoryError>;
}

pub(crate) fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value)
        .map_err(|error| RepositoryError::Decode(format!("invalid decimal for {field}: {error}")))
}

pub(crate) fn quantity_from_i64(field: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{field} value `{value}` does not fit in u32")))
}
