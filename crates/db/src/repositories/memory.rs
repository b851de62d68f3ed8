use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use bazari_core::domain::notification::{Notification, NotificationId};
use bazari_core::domain::order::{
    order_number_for_sequence, Order, OrderId, OrderLine, OrderStatus, OrderStatusRecord,
};
use bazari_core::domain::product::{Product, ProductId, ProductVariant, VariantId};
use bazari_core::domain::shop::{Shop, ShopId};
use bazari_core::domain::user::{User, UserId};

use super::{
    NotificationRepository, OrderRepository, ProductRepository, RepositoryError, ShopRepository,
    UserRepository,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id.0).cloned())
    }

    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id.0.clone(), user.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryShopRepository {
    shops: RwLock<Vec<Shop>>,
}

#[async_trait]
impl ShopRepository for InMemoryShopRepository {
    async fn find_by_id(&self, id: &ShopId) -> Result<Option<Shop>, RepositoryError> {
        let shops = self.shops.read().await;
        Ok(shops.iter().find(|shop| shop.id == *id).cloned())
    }

    async fn list(&self) -> Result<Vec<Shop>, RepositoryError> {
        let shops = self.shops.read().await;
        Ok(shops.clone())
    }

    async fn save(&self, shop: &Shop) -> Result<(), RepositoryError> {
        let mut shops = self.shops.write().await;
        if let Some(existing) = shops.iter_mut().find(|candidate| candidate.id == shop.id) {
            *existing = shop.clone();
        } else {
            shops.push(shop.clone());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
    variants: RwLock<HashMap<String, ProductVariant>>,
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).cloned())
    }

    async fn save(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.0.clone(), product.clone());
        Ok(())
    }

    async fn find_variant(
        &self,
        id: &VariantId,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        let variants = self.variants.read().await;
        Ok(variants.get(&id.0).cloned())
    }

    async fn save_variant(&self, variant: &ProductVariant) -> Result<(), RepositoryError> {
        let mut variants = self.variants.write().await;
        variants.insert(variant.id.0.clone(), variant.clone());
        Ok(())
    }

    async fn decrement_stock(
        &self,
        id: &ProductId,
        units: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        let mut products = self.products.write().await;
        match products.get_mut(&id.0) {
            Some(product) if product.quantity >= units => {
                product.quantity -= units;
                Ok(Some(product.quantity))
            }
            _ => Ok(None),
        }
    }

    async fn restock(&self, id: &ProductId, units: u32) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        if let Some(product) = products.get_mut(&id.0) {
            product.quantity += units;
        }
        Ok(())
    }

    async fn decrement_variant_stock(
        &self,
        id: &VariantId,
        units: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        let mut variants = self.variants.write().await;
        match variants.get_mut(&id.0) {
            Some(variant) if variant.quantity >= units => {
                variant.quantity -= units;
                Ok(Some(variant.quantity))
            }
            _ => Ok(None),
        }
    }

    async fn restock_variant(&self, id: &VariantId, units: u32) -> Result<(), RepositoryError> {
        let mut variants = self.variants.write().await;
        if let Some(variant) = variants.get_mut(&id.0) {
            variant.quantity += units;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<(Order, Vec<OrderLine>)>>,
    history: RwLock<Vec<OrderStatusRecord>>,
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order, lines: &[OrderLine]) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.push((order.clone(), lines.to_vec()));
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|(order, _)| order.id == *id).map(|(order, _)| order.clone()))
    }

    async fn lines_for(&self, id: &OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .find(|(order, _)| order.id == *id)
            .map(|(_, lines)| lines.clone())
            .unwrap_or_default())
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if let Some((order, _)) = orders.iter_mut().find(|(order, _)| order.id == *id) {
            order.status = status;
            order.updated_at = updated_at;
        }
        Ok(())
    }

    async fn append_status_history(
        &self,
        record: &OrderStatusRecord,
    ) -> Result<(), RepositoryError> {
        let mut history = self.history.write().await;
        history.push(record.clone());
        Ok(())
    }

    async fn status_history(
        &self,
        id: &OrderId,
    ) -> Result<Vec<OrderStatusRecord>, RepositoryError> {
        let history = self.history.read().await;
        let mut records: Vec<OrderStatusRecord> =
            history.iter().filter(|record| record.order_id == *id).cloned().collect();
        records.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
        Ok(records)
    }

    async fn next_order_number(&self) -> Result<String, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(order_number_for_sequence(orders.len() as u64 + 1))
    }

    async fn list_with_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .filter(|(order, _)| order.status == status)
            .map(|(order, _)| order.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationRepository {
    pub async fn all(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.write().await;
        notifications.push(notification.clone());
        Ok(())
    }

    async fn has_unread_low_stock(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let notifications = self.notifications.read().await;
        Ok(notifications.iter().any(|notification| {
            notification.user_id == *user
                && notification.product_id.as_ref() == Some(product)
                && !notification.is_read
        }))
    }

    async fn recent_for_user(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = self.notifications.read().await;
        let mut matching: Vec<Notification> =
            notifications.iter().filter(|n| n.user_id == *user).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn unread_count(&self, user: &UserId) -> Result<u64, RepositoryError> {
        let notifications = self.notifications.read().await;
        Ok(notifications.iter().filter(|n| n.user_id == *user && !n.is_read).count() as u64)
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        user: &UserId,
    ) -> Result<bool, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        match notifications.iter_mut().find(|n| n.id == *id && n.user_id == *user) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user: &UserId) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        let mut marked = 0;
        for notification in notifications.iter_mut() {
            if notification.user_id == *user && !notification.is_read {
                notification.is_read = true;
                marked += 1;
            }
        }
        Ok(marked)
    }
}
