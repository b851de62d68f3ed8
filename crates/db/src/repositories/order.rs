use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use bazari_core::domain::order::{
    order_number_for_sequence, Order, OrderId, OrderLine, OrderStatus, OrderStatusRecord,
};
use bazari_core::domain::product::{ProductId, VariantId};
use bazari_core::domain::shop::ShopId;
use bazari_core::domain::user::UserId;

use super::{parse_decimal, quantity_from_i64, OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn order_from_row(row: &SqliteRow) -> Result<Order, RepositoryError> {
        let status_raw: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_raw).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown order status `{status_raw}`"))
        })?;
        let total_text: String = row.try_get("total_text")?;
        let customer_id: Option<String> = row.try_get("customer_id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(Order {
            id: OrderId(row.try_get("id")?),
            shop_id: ShopId(row.try_get("shop_id")?),
            customer_id: customer_id.map(UserId),
            order_number: row.try_get("order_number")?,
            status,
            total_amount: parse_decimal("order.total_amount", &total_text)?,
            customer_name: row.try_get("customer_name")?,
            customer_email: row.try_get("customer_email")?,
            customer_phone: row.try_get("customer_phone")?,
            customer_address: row.try_get("customer_address")?,
            payment_method: row.try_get("payment_method")?,
            created_at,
            updated_at,
        })
    }

    fn line_from_row(row: &SqliteRow) -> Result<OrderLine, RepositoryError> {
        let variant_id: Option<String> = row.try_get("variant_id")?;
        let quantity_raw: i64 = row.try_get("quantity")?;
        let unit_price_text: String = row.try_get("unit_price_text")?;

        Ok(OrderLine {
            product_id: ProductId(row.try_get("product_id")?),
            variant_id: variant_id.map(VariantId),
            quantity: quantity_from_i64("order_line.quantity", quantity_raw)?,
            unit_price: parse_decimal("order_line.unit_price", &unit_price_text)?,
        })
    }

    const SELECT_ORDER: &'static str = r#"
        SELECT
            id, shop_id, customer_id, order_number, status,
            CAST(total_amount AS TEXT) AS total_text,
            customer_name, customer_email, customer_phone, customer_address,
            payment_method, created_at, updated_at
        FROM customer_order
    "#;
}

#[async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn create(&self, order: &Order, lines: &[OrderLine]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO customer_order (
                id, shop_id, customer_id, order_number, status, total_amount,
                customer_name, customer_email, customer_phone, customer_address,
                payment_method, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id.0)
        .bind(&order.shop_id.0)
        .bind(order.customer_id.as_ref().map(|id| id.0.clone()))
        .bind(&order.order_number)
        .bind(order.status.as_str())
        .bind(order.total_amount.to_string())
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(&order.customer_address)
        .bind(order.payment_method.clone())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_line (id, order_id, product_id, variant_id, quantity, unit_price)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&order.id.0)
            .bind(&line.product_id.0)
            .bind(line.variant_id.as_ref().map(|id| id.0.clone()))
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", Self::SELECT_ORDER))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::order_from_row(&row)).transpose()
    }

    async fn lines_for(&self, id: &OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                product_id, variant_id, quantity,
                CAST(unit_price AS TEXT) AS unit_price_text
            FROM order_line
            WHERE order_id = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::line_from_row).collect()
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE customer_order SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(updated_at)
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_status_history(
        &self,
        record: &OrderStatusRecord,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO order_status_history (id, order_id, status, changed_by, changed_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.order_id.0)
        .bind(record.status.as_str())
        .bind(&record.changed_by.0)
        .bind(record.changed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn status_history(
        &self,
        id: &OrderId,
    ) -> Result<Vec<OrderStatusRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, status, changed_by, changed_at
            FROM order_status_history
            WHERE order_id = ?
            ORDER BY changed_at DESC, rowid DESC
            "#,
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let status_raw: String = row.try_get("status")?;
                let status = OrderStatus::parse(&status_raw).ok_or_else(|| {
                    RepositoryError::Decode(format!("unknown order status `{status_raw}`"))
                })?;
                let changed_at: DateTime<Utc> = row.try_get("changed_at")?;

                Ok(OrderStatusRecord {
                    id: row.try_get("id")?,
                    order_id: OrderId(row.try_get("order_id")?),
                    status,
                    changed_by: UserId(row.try_get("changed_by")?),
                    changed_at,
                })
            })
            .collect()
    }

    async fn next_order_number(&self) -> Result<String, RepositoryError> {
        let placed: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM customer_order").fetch_one(&self.pool).await?;

        Ok(order_number_for_sequence(placed as u64 + 1))
    }

    async fn list_with_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        let rows =
            sqlx::query(&format!("{} WHERE status = ? ORDER BY created_at ASC", Self::SELECT_ORDER))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(Self::order_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use bazari_core::domain::order::{Order, OrderId, OrderLine, OrderStatus, OrderStatusRecord};
    use bazari_core::domain::product::{Product, ProductId};
    use bazari_core::domain::shop::{ReminderPeriod, Shop, ShopId};
    use bazari_core::domain::user::{Role, User, UserId};

    use super::SqlOrderRepository;
    use crate::repositories::product::SqlProductRepository;
    use crate::repositories::shop::SqlShopRepository;
    use crate::repositories::user::SqlUserRepository;
    use crate::repositories::{OrderRepository, ProductRepository, ShopRepository, UserRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn seed_catalog(pool: &DbPool) -> (ShopId, UserId, ProductId) {
        let users = SqlUserRepository::new(pool.clone());
        let owner = User {
            id: UserId("U-owner".to_string()),
            username: "malik".to_string(),
            email: "malik@example.com".to_string(),
            role: Role::Seller,
            created_at: Utc::now(),
        };
        users.save(&owner).await.expect("save owner");

        let shop = Shop {
            id: ShopId("S-1".to_string()),
            owner_id: owner.id.clone(),
            name: "Atlas Traders".to_string(),
            slug: "atlas-traders".to_string(),
            description: String::new(),
            reminder_period: ReminderPeriod::Days1,
            created_at: Utc::now(),
        };
        SqlShopRepository::new(pool.clone()).save(&shop).await.expect("save shop");

        let product = Product {
            id: ProductId("P-1".to_string()),
            shop_id: shop.id.clone(),
            name: "Ceramic Mug".to_string(),
            category: "Home & Garden".to_string(),
            price: Decimal::new(1_250, 2),
            old_price: None,
            quantity: 20,
            low_stock_threshold: 5,
            created_at: Utc::now(),
        };
        SqlProductRepository::new(pool.clone()).save(&product).await.expect("save product");

        (shop.id, owner.id, product.id)
    }

    fn order(id: &str, shop_id: &ShopId, number: &str) -> Order {
        Order {
            id: OrderId(id.to_string()),
            shop_id: shop_id.clone(),
            customer_id: None,
            order_number: number.to_string(),
            status: OrderStatus::Draft,
            total_amount: Decimal::new(2_500, 2),
            customer_name: "Nora".to_string(),
            customer_email: "nora@example.com".to_string(),
            customer_phone: String::new(),
            customer_address: "12 Rue des Oliviers".to_string(),
            payment_method: Some("cash_on_delivery".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trips_order_and_lines() {
        let pool = setup_pool().await;
        let (shop_id, _, product_id) = seed_catalog(&pool).await;
        let repo = SqlOrderRepository::new(pool.clone());

        let stored = order("O-1", &shop_id, "0535001");
        let lines = vec![OrderLine {
            product_id: product_id.clone(),
            variant_id: None,
            quantity: 2,
            unit_price: Decimal::new(1_250, 2),
        }];
        repo.create(&stored, &lines).await.expect("create order");

        let loaded = repo
            .find_by_id(&OrderId("O-1".to_string()))
            .await
            .expect("find order")
            .expect("order exists");
        assert_eq!(loaded.order_number, "0535001");
        assert_eq!(loaded.status, OrderStatus::Draft);
        assert_eq!(loaded.total_amount, Decimal::new(2_500, 2));

        let loaded_lines = repo.lines_for(&loaded.id).await.expect("lines");
        assert_eq!(loaded_lines.len(), 1);
        assert_eq!(loaded_lines[0].product_id, product_id);
        assert_eq!(loaded_lines[0].quantity, 2);

        pool.close().await;
    }

    #[tokio::test]
    async fn status_history_is_appended_newest_first() {
        let pool = setup_pool().await;
        let (shop_id, owner_id, product_id) = seed_catalog(&pool).await;
        let repo = SqlOrderRepository::new(pool.clone());

        let stored = order("O-2", &shop_id, "0535002");
        repo.create(
            &stored,
            &[OrderLine {
                product_id,
                variant_id: None,
                quantity: 1,
                unit_price: Decimal::new(1_250, 2),
            }],
        )
        .await
        .expect("create order");

        for (index, status) in [OrderStatus::Confirmed, OrderStatus::Sent].iter().enumerate() {
            repo.update_status(&stored.id, *status, Utc::now()).await.expect("update status");
            repo.append_status_history(&OrderStatusRecord {
                id: Uuid::new_v4().to_string(),
                order_id: stored.id.clone(),
                status: *status,
                changed_by: owner_id.clone(),
                changed_at: Utc::now() + chrono::Duration::seconds(index as i64),
            })
            .await
            .expect("append history");
        }

        let history = repo.status_history(&stored.id).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, OrderStatus::Sent);
        assert_eq!(history[1].status, OrderStatus::Confirmed);

        let current =
            repo.find_by_id(&stored.id).await.expect("find").expect("exists");
        assert_eq!(current.status, OrderStatus::Sent);

        pool.close().await;
    }

    #[tokio::test]
    async fn order_numbers_continue_the_sequence() {
        let pool = setup_pool().await;
        let (shop_id, _, product_id) = seed_catalog(&pool).await;
        let repo = SqlOrderRepository::new(pool.clone());

        assert_eq!(repo.next_order_number().await.expect("first number"), "0535001");

        repo.create(
            &order("O-3", &shop_id, "0535001"),
            &[OrderLine {
                product_id,
                variant_id: None,
                quantity: 1,
                unit_price: Decimal::new(1_250, 2),
            }],
        )
        .await
        .expect("create order");

        assert_eq!(repo.next_order_number().await.expect("second number"), "0535002");

        pool.close().await;
    }

    #[tokio::test]
    async fn list_with_status_filters_orders() {
        let pool = setup_pool().await;
        let (shop_id, _, product_id) = seed_catalog(&pool).await;
        let repo = SqlOrderRepository::new(pool.clone());

        let line = OrderLine {
            product_id,
            variant_id: None,
            quantity: 1,
            unit_price: Decimal::new(1_250, 2),
        };
        repo.create(&order("O-a", &shop_id, "0535001"), std::slice::from_ref(&line))
            .await
            .expect("create order a");
        repo.create(&order("O-b", &shop_id, "0535002"), std::slice::from_ref(&line))
            .await
            .expect("create order b");
        repo.update_status(&OrderId("O-b".to_string()), OrderStatus::Confirmed, Utc::now())
            .await
            .expect("confirm order b");

        let confirmed = repo.list_with_status(OrderStatus::Confirmed).await.expect("list");
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, OrderId("O-b".to_string()));

        pool.close().await;
    }
}
