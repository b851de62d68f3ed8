//! Order lifecycle: placement and seller-driven status transitions.
//!
//! JSON API Endpoints:
//! - `POST /orders`               — place an order (stock is taken atomically per line)
//! - `POST /orders/{id}/status`   — transition status; appends history, restores
//!                                  inventory for cancelled/returned, notifies the customer
//!
//! Email and in-app notification failures never abort the primary mutation;
//! they are logged and reported through the side-effect flags.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use bazari_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use bazari_core::config::InitialOrderStatus;
use bazari_core::domain::notification::Notification;
use bazari_core::domain::order::{Order, OrderId, OrderLine, OrderStatus, OrderStatusRecord};
use bazari_core::domain::product::{Product, ProductId, ProductVariant, VariantId};
use bazari_core::domain::shop::{Shop, ShopId};
use bazari_core::domain::user::UserId;
use bazari_core::errors::{ApplicationError, DomainError, InterfaceError};
use bazari_db::repositories::{
    NotificationRepository, OrderRepository, ProductRepository, RepositoryError, ShopRepository,
    UserRepository,
};
use bazari_notify::{messages, EmailGateway, LineSummary};

pub struct OrderLifecycleService {
    users: Arc<dyn UserRepository>,
    shops: Arc<dyn ShopRepository>,
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
    notifications: Arc<dyn NotificationRepository>,
    mailer: Arc<dyn EmailGateway>,
    audit: Arc<dyn AuditSink>,
    initial_status: InitialOrderStatus,
}

#[derive(Clone, Debug)]
pub struct NewOrder {
    pub shop_id: ShopId,
    pub customer_id: Option<UserId>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub payment_method: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Clone, Debug)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

#[derive(Clone, Debug)]
pub struct StatusUpdateOutcome {
    pub history: OrderStatusRecord,
    pub inventory_restored: bool,
    pub customer_notified: bool,
}

struct ResolvedLine {
    product: Product,
    variant: Option<ProductVariant>,
    quantity: u32,
    unit_price: Decimal,
}

impl OrderLifecycleService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        shops: Arc<dyn ShopRepository>,
        products: Arc<dyn ProductRepository>,
        orders: Arc<dyn OrderRepository>,
        notifications: Arc<dyn NotificationRepository>,
        mailer: Arc<dyn EmailGateway>,
        audit: Arc<dyn AuditSink>,
        initial_status: InitialOrderStatus,
    ) -> Self {
        Self { users, shops, products, orders, notifications, mailer, audit, initial_status }
    }

    pub async fn place_order(&self, request: NewOrder) -> Result<Order, ApplicationError> {
        if request.lines.is_empty() {
            return Err(DomainError::InvariantViolation("order has no lines".to_string()).into());
        }

        let shop = self
            .shops
            .find_by_id(&request.shop_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| {
                ApplicationError::Domain(DomainError::InvariantViolation(format!(
                    "unknown shop `{}`",
                    request.shop_id.0
                )))
            })?;

        let resolved = self.resolve_lines(&shop, &request.lines).await?;
        let total_amount = resolved
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc + line.unit_price * Decimal::from(line.quantity));

        let order_number = self.orders.next_order_number().await.map_err(persistence)?;
        let now = Utc::now();
        let order = Order {
            id: OrderId(Uuid::new_v4().to_string()),
            shop_id: shop.id.clone(),
            customer_id: request.customer_id.clone(),
            order_number,
            status: self.initial_status.as_order_status(),
            total_amount,
            customer_name: request.customer_name,
            customer_email: request.customer_email,
            customer_phone: request.customer_phone,
            customer_address: request.customer_address,
            payment_method: request.payment_method,
            created_at: now,
            updated_at: now,
        };

        let remaining_stock = self.take_stock(&resolved).await?;

        let lines: Vec<OrderLine> = resolved
            .iter()
            .map(|line| OrderLine {
                product_id: line.product.id.clone(),
                variant_id: line.variant.as_ref().map(|variant| variant.id.clone()),
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();

        if let Err(error) = self.orders.create(&order, &lines).await {
            // The order row never landed; hand the stock back before failing.
            self.return_stock(&resolved, resolved.len()).await;
            return Err(persistence(error));
        }

        for (line, remaining) in resolved.iter().zip(remaining_stock.iter()) {
            if *remaining <= line.product.low_stock_threshold {
                self.raise_low_stock_alert(&shop, &line.product, *remaining).await;
            }
        }

        let created = Notification::new_order(shop.owner_id.clone(), &order);
        if let Err(error) = self.notifications.create(&created).await {
            warn!(
                event_name = "orders.notification.create_failed",
                order_id = %order.id.0,
                error = %error,
                "failed to record new-order notification"
            );
        }

        self.send_placement_emails(&shop, &order, &resolved).await;

        self.audit.emit(
            AuditEvent::new(
                Some(order.id.clone()),
                order.order_number.clone(),
                "order.placed",
                AuditCategory::Orders,
                "order-service",
                AuditOutcome::Success,
            )
            .with_metadata("shop_id", shop.id.0.clone())
            .with_metadata("total", order.total_amount.to_string()),
        );
        info!(
            event_name = "orders.placed",
            order_id = %order.id.0,
            order_number = %order.order_number,
            shop_id = %shop.id.0,
            "order placed"
        );

        Ok(order)
    }

    pub async fn update_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatus,
        acting_user_id: &UserId,
    ) -> Result<StatusUpdateOutcome, ApplicationError> {
        let mut order = self
            .orders
            .find_by_id(order_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::OrderNotFound { order_id: order_id.clone() })?;

        let actor = self
            .users
            .find_by_id(acting_user_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::NotPermitted { actor: acting_user_id.clone() })?;

        let shop = self
            .shops
            .find_by_id(&order.shop_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| {
                ApplicationError::Domain(DomainError::InvariantViolation(format!(
                    "order `{}` references unknown shop `{}`",
                    order.id.0, order.shop_id.0
                )))
            })?;

        if actor.id != shop.owner_id && !actor.is_platform_admin() {
            return Err(DomainError::NotPermitted { actor: actor.id }.into());
        }

        order.transition_to(new_status).map_err(ApplicationError::Domain)?;
        order.updated_at = Utc::now();
        self.orders
            .update_status(&order.id, new_status, order.updated_at)
            .await
            .map_err(persistence)?;

        // Compensating action only: the order lines themselves stay in the
        // sales ledger, so ratings are unaffected by cancellations.
        let mut inventory_restored = false;
        if new_status.restocks_inventory() {
            let lines = self.orders.lines_for(&order.id).await.map_err(persistence)?;
            for line in &lines {
                match &line.variant_id {
                    Some(variant_id) => self
                        .products
                        .restock_variant(variant_id, line.quantity)
                        .await
                        .map_err(persistence)?,
                    None => self
                        .products
                        .restock(&line.product_id, line.quantity)
                        .await
                        .map_err(persistence)?,
                }
            }
            inventory_restored = true;
        }

        let record = OrderStatusRecord {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            status: new_status,
            changed_by: actor.id.clone(),
            changed_at: order.updated_at,
        };
        self.orders.append_status_history(&record).await.map_err(persistence)?;

        let customer_notified = self.notify_customer_of_update(&shop, &order).await;

        self.audit.emit(
            AuditEvent::new(
                Some(order.id.clone()),
                order.order_number.clone(),
                "order.status_changed",
                AuditCategory::Orders,
                actor.id.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("to", new_status.as_str())
            .with_metadata("inventory_restored", inventory_restored.to_string()),
        );
        info!(
            event_name = "orders.status_changed",
            order_id = %order.id.0,
            status = new_status.as_str(),
            inventory_restored,
            "order status changed"
        );

        Ok(StatusUpdateOutcome { history: record, inventory_restored, customer_notified })
    }

    async fn resolve_lines(
        &self,
        shop: &Shop,
        lines: &[NewOrderLine],
    ) -> Result<Vec<ResolvedLine>, ApplicationError> {
        let mut resolved = Vec::with_capacity(lines.len());

        for line in lines {
            if line.quantity == 0 {
                return Err(DomainError::InvariantViolation(format!(
                    "zero-quantity line for product `{}`",
                    line.product_id.0
                ))
                .into());
            }

            let product = self
                .products
                .find_by_id(&line.product_id)
                .await
                .map_err(persistence)?
                .ok_or_else(|| {
                    ApplicationError::Domain(DomainError::InvariantViolation(format!(
                        "unknown product `{}`",
                        line.product_id.0
                    )))
                })?;

            if product.shop_id != shop.id {
                return Err(DomainError::InvariantViolation(format!(
                    "product `{}` does not belong to shop `{}`",
                    product.id.0, shop.id.0
                ))
                .into());
            }

            let variant = match &line.variant_id {
                Some(variant_id) => {
                    let variant = self
                        .products
                        .find_variant(variant_id)
                        .await
                        .map_err(persistence)?
                        .filter(|variant| variant.product_id == product.id)
                        .ok_or_else(|| {
                            ApplicationError::Domain(DomainError::InvariantViolation(format!(
                                "unknown variant `{}` for product `{}`",
                                variant_id.0, product.id.0
                            )))
                        })?;
                    Some(variant)
                }
                None => None,
            };

            let unit_price = variant
                .as_ref()
                .map(|variant| variant.effective_price(product.price))
                .unwrap_or(product.price);

            resolved.push(ResolvedLine { product, variant, quantity: line.quantity, unit_price });
        }

        Ok(resolved)
    }

    /// Take stock line by line with the guarded decrement. On a refusal, the
    /// lines already taken are handed back before the error surfaces.
    async fn take_stock(&self, resolved: &[ResolvedLine]) -> Result<Vec<u32>, ApplicationError> {
        let mut remaining_stock = Vec::with_capacity(resolved.len());

        for (index, line) in resolved.iter().enumerate() {
            let taken = match &line.variant {
                Some(variant) => self
                    .products
                    .decrement_variant_stock(&variant.id, line.quantity)
                    .await
                    .map_err(persistence)?,
                None => self
                    .products
                    .decrement_stock(&line.product.id, line.quantity)
                    .await
                    .map_err(persistence)?,
            };

            match taken {
                Some(remaining) => remaining_stock.push(remaining),
                None => {
                    self.return_stock(resolved, index).await;
                    return Err(DomainError::InsufficientStock {
                        product_id: line.product.id.clone(),
                        requested: line.quantity,
                    }
                    .into());
                }
            }
        }

        Ok(remaining_stock)
    }

    async fn return_stock(&self, resolved: &[ResolvedLine], up_to: usize) {
        for line in &resolved[..up_to] {
            let result = match &line.variant {
                Some(variant) => self.products.restock_variant(&variant.id, line.quantity).await,
                None => self.products.restock(&line.product.id, line.quantity).await,
            };
            if let Err(error) = result {
                warn!(
                    event_name = "orders.stock.compensation_failed",
                    product_id = %line.product.id.0,
                    error = %error,
                    "failed to return stock after aborted order"
                );
            }
        }
    }

    /// One active unread alert per product: suppressed while an unread alert
    /// for the same product exists, re-armed once the owner reads it. A
    /// failing dedup probe skips the alert rather than failing the order.
    async fn raise_low_stock_alert(&self, shop: &Shop, product: &Product, remaining: u32) {
        match self.notifications.has_unread_low_stock(&shop.owner_id, &product.id).await {
            Ok(true) => {}
            Ok(false) => {
                let alert = Notification::low_stock(shop.owner_id.clone(), product, remaining);
                if let Err(error) = self.notifications.create(&alert).await {
                    warn!(
                        event_name = "orders.low_stock.create_failed",
                        product_id = %product.id.0,
                        error = %error,
                        "failed to record low-stock alert"
                    );
                }
            }
            Err(error) => {
                warn!(
                    event_name = "orders.low_stock.dedup_failed",
                    product_id = %product.id.0,
                    error = %error,
                    "low-stock dedup probe failed, skipping alert"
                );
            }
        }
    }

    async fn send_placement_emails(&self, shop: &Shop, order: &Order, resolved: &[ResolvedLine]) {
        let summaries: Vec<LineSummary> = resolved
            .iter()
            .map(|line| LineSummary {
                name: match &line.variant {
                    Some(variant) => format!("{} ({})", line.product.name, variant.label()),
                    None => line.product.name.clone(),
                },
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();

        match self.users.find_by_id(&shop.owner_id).await {
            Ok(Some(owner)) => {
                let mail =
                    messages::seller_new_order(order, &owner.username, &shop.name, &summaries);
                if let Err(error) = self.mailer.send(&owner.email, &mail.subject, &mail.body).await
                {
                    warn!(
                        event_name = "orders.email.seller_failed",
                        order_id = %order.id.0,
                        error = %error,
                        "seller new-order email failed"
                    );
                }
            }
            Ok(None) => warn!(
                event_name = "orders.email.owner_missing",
                shop_id = %shop.id.0,
                "shop owner account not found, skipping seller email"
            ),
            Err(error) => warn!(
                event_name = "orders.email.owner_lookup_failed",
                shop_id = %shop.id.0,
                error = %error,
                "owner lookup failed, skipping seller email"
            ),
        }

        if let Some(email) = order.contact_email() {
            let mail = messages::buyer_order_placed(order, &shop.name, &summaries);
            if let Err(error) = self.mailer.send(email, &mail.subject, &mail.body).await {
                warn!(
                    event_name = "orders.email.buyer_failed",
                    order_id = %order.id.0,
                    error = %error,
                    "buyer confirmation email failed"
                );
            }
        }
    }

    async fn notify_customer_of_update(&self, shop: &Shop, order: &Order) -> bool {
        let mut notified = false;

        if let Some(email) = order.contact_email() {
            let mail = messages::customer_status_update(order, &shop.name);
            match self.mailer.send(email, &mail.subject, &mail.body).await {
                Ok(()) => notified = true,
                Err(error) => warn!(
                    event_name = "orders.email.status_update_failed",
                    order_id = %order.id.0,
                    error = %error,
                    "customer status email failed"
                ),
            }
        }

        if let Some(customer_id) = &order.customer_id {
            let update = Notification::order_update(customer_id.clone(), order);
            if let Err(error) = self.notifications.create(&update).await {
                warn!(
                    event_name = "orders.notification.update_failed",
                    order_id = %order.id.0,
                    error = %error,
                    "failed to record order-update notification"
                );
            }
        }

        notified
    }
}

/// Audit sink that forwards events onto the tracing pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(
            event_name = %event.event_type,
            correlation_id = %event.correlation_id,
            order_id = event.order_id.as_ref().map(|id| id.0.as_str()).unwrap_or("unknown"),
            actor = %event.actor,
            outcome = ?event.outcome,
            "audit event"
        );
    }
}

// ---------------------------------------------------------------------------
// HTTP surface
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct OrdersState {
    service: Arc<OrderLifecycleService>,
}

pub fn router(service: Arc<OrderLifecycleService>) -> Router {
    Router::new()
        .route("/orders", post(place_order))
        .route("/orders/{id}/status", post(update_status))
        .with_state(OrdersState { service })
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderBody {
    pub shop_id: String,
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub customer_address: String,
    pub payment_method: Option<String>,
    pub lines: Vec<PlaceOrderLineBody>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderLineBody {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub status: &'static str,
    pub total_amount: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
    pub acting_user_id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub order_id: String,
    pub status: &'static str,
    pub history_id: String,
    pub changed_at: String,
    pub inventory_restored: bool,
    pub customer_notified: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

fn error_response(error: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let correlation_id = Uuid::new_v4().to_string();
    let interface = error.into_interface(correlation_id.clone());
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(ApiError { error: interface.user_message().to_string(), correlation_id }))
}

async fn place_order(
    State(state): State<OrdersState>,
    Json(body): Json<PlaceOrderBody>,
) -> Result<(StatusCode, Json<OrderResponse>), (StatusCode, Json<ApiError>)> {
    let request = NewOrder {
        shop_id: ShopId(body.shop_id),
        customer_id: body.customer_id.map(UserId),
        customer_name: body.customer_name,
        customer_email: body.customer_email,
        customer_phone: body.customer_phone,
        customer_address: body.customer_address,
        payment_method: body.payment_method,
        lines: body
            .lines
            .into_iter()
            .map(|line| NewOrderLine {
                product_id: ProductId(line.product_id),
                variant_id: line.variant_id.map(VariantId),
                quantity: line.quantity,
            })
            .collect(),
    };

    let order = state.service.place_order(request).await.map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            id: order.id.0,
            order_number: order.order_number,
            status: order.status.as_str(),
            total_amount: order.total_amount.to_string(),
            created_at: order.created_at.to_rfc3339(),
        }),
    ))
}

async fn update_status(
    State(state): State<OrdersState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<StatusUpdateResponse>, (StatusCode, Json<ApiError>)> {
    let new_status = OrderStatus::parse(&body.status).ok_or_else(|| {
        error_response(ApplicationError::Domain(DomainError::InvariantViolation(format!(
            "unknown order status `{}`",
            body.status
        ))))
    })?;

    let outcome = state
        .service
        .update_status(&OrderId(id), new_status, &UserId(body.acting_user_id))
        .await
        .map_err(error_response)?;

    Ok(Json(StatusUpdateResponse {
        order_id: outcome.history.order_id.0.clone(),
        status: outcome.history.status.as_str(),
        history_id: outcome.history.id.clone(),
        changed_at: outcome.history.changed_at.to_rfc3339(),
        inventory_restored: outcome.inventory_restored,
        customer_notified: outcome.customer_notified,
    }))
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use bazari_core::audit::InMemoryAuditSink;
    use bazari_core::config::InitialOrderStatus;
    use bazari_core::domain::notification::{Notification, NotificationId, NotificationKind};
    use bazari_core::domain::order::OrderStatus;
    use bazari_core::domain::product::{Product, ProductId, ProductVariant, VariantId};
    use bazari_core::domain::shop::{ReminderPeriod, Shop, ShopId};
    use bazari_core::domain::user::{Role, User, UserId};
    use bazari_core::errors::{ApplicationError, DomainError};
    use bazari_db::repositories::{
        InMemoryNotificationRepository, InMemoryOrderRepository, InMemoryProductRepository,
        InMemoryShopRepository, InMemoryUserRepository, NotificationRepository,
        OrderRepository, ProductRepository, RepositoryError, ShopRepository, UserRepository,
    };
    use bazari_notify::{EmailError, EmailGateway, NoopGateway};

    use super::{NewOrder, NewOrderLine, OrderLifecycleService};

    struct FailingGateway;

    #[async_trait]
    impl EmailGateway for FailingGateway {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), EmailError> {
            Err(EmailError::Gateway { status: 503 })
        }
    }

    /// Notification store whose dedup probe always fails; creates still work.
    #[derive(Default)]
    struct BrokenDedupStore {
        inner: InMemoryNotificationRepository,
    }

    #[async_trait]
    impl NotificationRepository for BrokenDedupStore {
        async fn create(&self, notification: &Notification) -> Result<(), RepositoryError> {
            self.inner.create(notification).await
        }

        async fn has_unread_low_stock(
            &self,
            _user: &UserId,
            _product: &ProductId,
        ) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Decode("dedup index unavailable".to_string()))
        }

        async fn recent_for_user(
            &self,
            user: &UserId,
            limit: u32,
        ) -> Result<Vec<Notification>, RepositoryError> {
            self.inner.recent_for_user(user, limit).await
        }

        async fn unread_count(&self, user: &UserId) -> Result<u64, RepositoryError> {
            self.inner.unread_count(user).await
        }

        async fn mark_read(
            &self,
            id: &NotificationId,
            user: &UserId,
        ) -> Result<bool, RepositoryError> {
            self.inner.mark_read(id, user).await
        }

        async fn mark_all_read(&self, user: &UserId) -> Result<u64, RepositoryError> {
            self.inner.mark_all_read(user).await
        }
    }

    struct Harness {
        users: Arc<InMemoryUserRepository>,
        shops: Arc<InMemoryShopRepository>,
        products: Arc<InMemoryProductRepository>,
        orders: Arc<InMemoryOrderRepository>,
        notifications: Arc<InMemoryNotificationRepository>,
        audit: InMemoryAuditSink,
    }

    impl Harness {
        fn service(&self, mailer: Arc<dyn EmailGateway>) -> OrderLifecycleService {
            OrderLifecycleService::new(
                self.users.clone(),
                self.shops.clone(),
                self.products.clone(),
                self.orders.clone(),
                self.notifications.clone(),
                mailer,
                Arc::new(self.audit.clone()),
                InitialOrderStatus::Draft,
            )
        }
    }

    async fn harness() -> Harness {
        let harness = Harness {
            users: Arc::new(InMemoryUserRepository::default()),
            shops: Arc::new(InMemoryShopRepository::default()),
            products: Arc::new(InMemoryProductRepository::default()),
            orders: Arc::new(InMemoryOrderRepository::default()),
            notifications: Arc::new(InMemoryNotificationRepository::default()),
            audit: InMemoryAuditSink::default(),
        };

        harness
            .users
            .save(&User {
                id: UserId("U-owner".to_string()),
                username: "malik".to_string(),
                email: "malik@example.com".to_string(),
                role: Role::Seller,
                created_at: Utc::now(),
            })
            .await
            .expect("save owner");
        harness
            .users
            .save(&User {
                id: UserId("U-admin".to_string()),
                username: "root".to_string(),
                email: "admin@bazari.example".to_string(),
                role: Role::Admin,
                created_at: Utc::now(),
            })
            .await
            .expect("save admin");
        harness
            .users
            .save(&User {
                id: UserId("U-buyer".to_string()),
                username: "nora".to_string(),
                email: "nora@example.com".to_string(),
                role: Role::Buyer,
                created_at: Utc::now(),
            })
            .await
            .expect("save buyer");

        harness
            .shops
            .save(&Shop {
                id: ShopId("S-1".to_string()),
                owner_id: UserId("U-owner".to_string()),
                name: "Atlas Traders".to_string(),
                slug: "atlas-traders".to_string(),
                description: String::new(),
                reminder_period: ReminderPeriod::Days1,
                created_at: Utc::now(),
            })
            .await
            .expect("save shop");

        harness
            .products
            .save(&Product {
                id: ProductId("P-mug".to_string()),
                shop_id: ShopId("S-1".to_string()),
                name: "Ceramic Mug".to_string(),
                category: "Home & Garden".to_string(),
                price: Decimal::new(1_250, 2),
                old_price: None,
                quantity: 10,
                low_stock_threshold: 5,
                created_at: Utc::now(),
            })
            .await
            .expect("save product");

        harness
    }

    fn order_for(product: &str, quantity: u32) -> NewOrder {
        NewOrder {
            shop_id: ShopId("S-1".to_string()),
            customer_id: Some(UserId("U-buyer".to_string())),
            customer_name: "Nora".to_string(),
            customer_email: "nora@example.com".to_string(),
            customer_phone: String::new(),
            customer_address: "12 Rue des Oliviers".to_string(),
            payment_method: Some("cash_on_delivery".to_string()),
            lines: vec![NewOrderLine {
                product_id: ProductId(product.to_string()),
                variant_id: None,
                quantity,
            }],
        }
    }

    #[tokio::test]
    async fn placing_an_order_takes_stock_and_notifies_the_owner() {
        let harness = harness().await;
        let service = harness.service(Arc::new(NoopGateway));

        let order = service.place_order(order_for("P-mug", 3)).await.expect("place order");
        assert_eq!(order.status, OrderStatus::Draft);
        assert_eq!(order.order_number, "0535001");
        assert_eq!(order.total_amount, Decimal::new(3_750, 2));

        let product = harness
            .products
            .find_by_id(&ProductId("P-mug".to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(product.quantity, 7);

        let owner = UserId("U-owner".to_string());
        let feed = harness.notifications.recent_for_user(&owner, 10).await.expect("feed");
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, NotificationKind::NewOrder);

        assert_eq!(harness.audit.events().len(), 1);
        assert_eq!(harness.audit.events()[0].event_type, "order.placed");
    }

    #[tokio::test]
    async fn low_stock_alerts_are_deduplicated_while_unread() {
        let harness = harness().await;
        let service = harness.service(Arc::new(NoopGateway));
        let owner = UserId("U-owner".to_string());
        let product = ProductId("P-mug".to_string());

        // 10 -> 5 crosses the threshold; 5 -> 4 would alert again if unread
        // dedup were broken.
        service.place_order(order_for("P-mug", 5)).await.expect("first order");
        service.place_order(order_for("P-mug", 1)).await.expect("second order");

        let low_stock_alerts: Vec<Notification> = harness
            .notifications
            .all()
            .await
            .into_iter()
            .filter(|n| n.kind == NotificationKind::LowStock)
            .collect();
        assert_eq!(low_stock_alerts.len(), 1, "one active unread alert per product");
        assert_eq!(low_stock_alerts[0].product_id, Some(product.clone()));

        // Reading the alert re-arms it; the next triggering event alerts again.
        harness
            .notifications
            .mark_read(&low_stock_alerts[0].id, &owner)
            .await
            .expect("mark read");
        service.place_order(order_for("P-mug", 1)).await.expect("third order");

        let alert_count = harness
            .notifications
            .all()
            .await
            .into_iter()
            .filter(|n| n.kind == NotificationKind::LowStock)
            .count();
        assert_eq!(alert_count, 2);
    }

    #[tokio::test]
    async fn oversell_is_refused_and_taken_stock_is_returned() {
        let harness = harness().await;
        let service = harness.service(Arc::new(NoopGateway));

        harness
            .products
            .save(&Product {
                id: ProductId("P-rare".to_string()),
                shop_id: ShopId("S-1".to_string()),
                name: "Berber Rug".to_string(),
                category: "Home & Garden".to_string(),
                price: Decimal::new(18_000, 2),
                old_price: None,
                quantity: 1,
                low_stock_threshold: 0,
                created_at: Utc::now(),
            })
            .await
            .expect("save product");

        let mut request = order_for("P-mug", 4);
        request.lines.push(NewOrderLine {
            product_id: ProductId("P-rare".to_string()),
            variant_id: None,
            quantity: 2,
        });

        let error = service.place_order(request).await.expect_err("oversell must fail");
        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::InsufficientStock { ref product_id, requested: 2 })
                if product_id.0 == "P-rare"
        ));

        // The first line's decrement was compensated.
        let mug = harness
            .products
            .find_by_id(&ProductId("P-mug".to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(mug.quantity, 10);
    }

    #[tokio::test]
    async fn variant_lines_price_and_decrement_the_variant_pool() {
        let harness = harness().await;
        let service = harness.service(Arc::new(NoopGateway));

        harness
            .products
            .save_variant(&ProductVariant {
                id: VariantId("V-large".to_string()),
                product_id: ProductId("P-mug".to_string()),
                name: "Size".to_string(),
                value: "Large".to_string(),
                price_adjustment: Decimal::new(200, 2),
                quantity: 4,
            })
            .await
            .expect("save variant");

        let mut request = order_for("P-mug", 2);
        request.lines[0].variant_id = Some(VariantId("V-large".to_string()));

        let order = service.place_order(request).await.expect("place order");
        assert_eq!(order.total_amount, Decimal::new(2_900, 2));

        let variant = harness
            .products
            .find_variant(&VariantId("V-large".to_string()))
            .await
            .expect("find variant")
            .expect("exists");
        assert_eq!(variant.quantity, 2);

        let base = harness
            .products
            .find_by_id(&ProductId("P-mug".to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(base.quantity, 10, "base pool untouched by variant sale");
    }

    #[tokio::test]
    async fn cancelling_restores_stock_but_keeps_the_sales_ledger() {
        let harness = harness().await;
        let service = harness.service(Arc::new(NoopGateway));

        let order = service.place_order(order_for("P-mug", 4)).await.expect("place order");
        let outcome = service
            .update_status(&order.id, OrderStatus::Cancelled, &UserId("U-owner".to_string()))
            .await
            .expect("cancel order");

        assert!(outcome.inventory_restored);
        assert_eq!(outcome.history.status, OrderStatus::Cancelled);

        let product = harness
            .products
            .find_by_id(&ProductId("P-mug".to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(product.quantity, 10, "cancellation restores the decremented stock");

        // The sale rows survive: ratings derived from them are unchanged.
        let lines = harness.orders.lines_for(&order.id).await.expect("lines");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 4);

        // Terminal state: no further transitions.
        let error = service
            .update_status(&order.id, OrderStatus::Confirmed, &UserId("U-owner".to_string()))
            .await
            .expect_err("cancelled is terminal");
        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::InvalidOrderTransition { .. })
        ));
    }

    #[tokio::test]
    async fn status_update_survives_a_failing_email_gateway() {
        let harness = harness().await;
        let service = harness.service(Arc::new(FailingGateway));

        let order = service.place_order(order_for("P-mug", 1)).await.expect("place order");
        let outcome = service
            .update_status(&order.id, OrderStatus::Confirmed, &UserId("U-owner".to_string()))
            .await
            .expect("status update must not depend on email");

        assert!(!outcome.customer_notified);
        assert_eq!(outcome.history.status, OrderStatus::Confirmed);

        // The in-app notification for the registered buyer still lands.
        let buyer_feed = harness
            .notifications
            .recent_for_user(&UserId("U-buyer".to_string()), 10)
            .await
            .expect("feed");
        assert!(buyer_feed.iter().any(|n| n.kind == NotificationKind::OrderUpdate));
    }

    #[tokio::test]
    async fn failing_dedup_store_does_not_block_order_placement() {
        let harness = harness().await;
        let broken = Arc::new(BrokenDedupStore::default());
        let service = OrderLifecycleService::new(
            harness.users.clone(),
            harness.shops.clone(),
            harness.products.clone(),
            harness.orders.clone(),
            broken.clone(),
            Arc::new(NoopGateway),
            Arc::new(harness.audit.clone()),
            InitialOrderStatus::Draft,
        );

        // Crosses the low-stock threshold, so the dedup probe runs and fails.
        let order = service.place_order(order_for("P-mug", 6)).await.expect("order placed");
        assert_eq!(order.order_number, "0535001");

        let alerts = broken
            .inner
            .all()
            .await
            .into_iter()
            .filter(|n| n.kind == NotificationKind::LowStock)
            .count();
        assert_eq!(alerts, 0, "alert skipped when the dedup probe is unavailable");
    }

    #[tokio::test]
    async fn only_the_owner_or_a_platform_admin_may_transition() {
        let harness = harness().await;
        let service = harness.service(Arc::new(NoopGateway));

        let order = service.place_order(order_for("P-mug", 1)).await.expect("place order");

        let error = service
            .update_status(&order.id, OrderStatus::Confirmed, &UserId("U-buyer".to_string()))
            .await
            .expect_err("buyers cannot drive transitions");
        assert!(matches!(error, ApplicationError::Domain(DomainError::NotPermitted { .. })));

        service
            .update_status(&order.id, OrderStatus::Confirmed, &UserId("U-admin".to_string()))
            .await
            .expect("platform admin may transition");
    }

    #[tokio::test]
    async fn waiting_deployments_start_orders_in_waiting() {
        let harness = harness().await;
        let service = OrderLifecycleService::new(
            harness.users.clone(),
            harness.shops.clone(),
            harness.products.clone(),
            harness.orders.clone(),
            harness.notifications.clone(),
            Arc::new(NoopGateway),
            Arc::new(harness.audit.clone()),
            InitialOrderStatus::Waiting,
        );

        let order = service.place_order(order_for("P-mug", 1)).await.expect("place order");
        assert_eq!(order.status, OrderStatus::Waiting);
    }
}
