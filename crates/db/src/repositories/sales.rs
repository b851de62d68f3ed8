use async_trait::async_trait;
use sqlx::Row;

use bazari_core::domain::product::ProductId;
use bazari_core::domain::shop::ShopId;
use bazari_core::rating::service::{SalesSource, SalesSourceError};

use crate::DbPool;

/// One-pass sales aggregation over the immutable `order_line` ledger.
///
/// Both queries return the *whole* population — zero-sales entities included
/// via LEFT JOIN — in insertion order, which is the tie-break order the rank
/// computer relies on. Cancelled and returned orders still count: their lines
/// are never retracted.
pub struct SqlSalesLedger {
    pool: DbPool,
}

impl SqlSalesLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn unavailable(error: sqlx::Error) -> SalesSourceError {
        SalesSourceError::Unavailable(error.to_string())
    }
}

#[async_trait]
impl SalesSource for SqlSalesLedger {
    async fn product_population(&self) -> Result<Vec<(ProductId, u64)>, SalesSourceError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id AS entity_id, COALESCE(SUM(l.quantity), 0) AS units_sold
            FROM product p
            LEFT JOIN order_line l ON l.product_id = p.id
            GROUP BY p.id
            ORDER BY p.created_at ASC, p.rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Self::unavailable)?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("entity_id").map_err(Self::unavailable)?;
                let units: i64 = row.try_get("units_sold").map_err(Self::unavailable)?;
                Ok((ProductId(id), units.max(0) as u64))
            })
            .collect()
    }

    async fn shop_population(&self) -> Result<Vec<(ShopId, u64)>, SalesSourceError> {
        let rows = sqlx::query(
            r#"
            SELECT s.id AS entity_id, COALESCE(SUM(l.quantity), 0) AS units_sold
            FROM shop s
            LEFT JOIN product p ON p.shop_id = s.id
            LEFT JOIN order_line l ON l.product_id = p.id
            GROUP BY s.id
            ORDER BY s.created_at ASC, s.rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Self::unavailable)?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("entity_id").map_err(Self::unavailable)?;
                let units: i64 = row.try_get("units_sold").map_err(Self::unavailable)?;
                Ok((ShopId(id), units.max(0) as u64))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use bazari_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
    use bazari_core::domain::product::{Product, ProductId};
    use bazari_core::domain::shop::{ReminderPeriod, Shop, ShopId};
    use bazari_core::domain::user::{Role, User, UserId};
    use bazari_core::rating::service::{RatingService, SalesSource};

    use super::SqlSalesLedger;
    use crate::repositories::order::SqlOrderRepository;
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

    async fn seed_shop(pool: &DbPool, index: usize) -> ShopId {
        let owner = User {
            id: UserId(format!("U-{index}")),
            username: format!("owner{index}"),
            email: format!("owner{index}@example.com"),
            role: Role::Seller,
            created_at: Utc::now() + Duration::seconds(index as i64),
        };
        SqlUserRepository::new(pool.clone()).save(&owner).await.expect("save owner");

        let shop = Shop {
            id: ShopId(format!("S-{index}")),
            owner_id: owner.id,
            name: format!("Shop {index}"),
            slug: format!("shop-{index}"),
            description: String::new(),
            reminder_period: ReminderPeriod::Days1,
            created_at: Utc::now() + Duration::seconds(index as i64),
        };
        SqlShopRepository::new(pool.clone()).save(&shop).await.expect("save shop");
        shop.id
    }

    async fn seed_product(pool: &DbPool, shop_id: &ShopId, index: usize) -> ProductId {
        let product = Product {
            id: ProductId(format!("P-{index}")),
            shop_id: shop_id.clone(),
            name: format!("Product {index}"),
            category: "Other".to_string(),
            price: Decimal::new(1_000, 2),
            old_price: None,
            quantity: 100,
            low_stock_threshold: 5,
            created_at: Utc::now() + Duration::seconds(index as i64),
        };
        SqlProductRepository::new(pool.clone()).save(&product).await.expect("save product");
        product.id
    }

    async fn seed_order(pool: &DbPool, shop_id: &ShopId, id: &str, lines: &[(ProductId, u32)]) {
        let order = Order {
            id: OrderId(id.to_string()),
            shop_id: shop_id.clone(),
            customer_id: None,
            order_number: format!("N-{id}"),
            status: OrderStatus::Draft,
            total_amount: Decimal::new(1_000, 2),
            customer_name: String::new(),
            customer_email: String::new(),
            customer_phone: String::new(),
            customer_address: String::new(),
            payment_method: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let lines: Vec<OrderLine> = lines
            .iter()
            .map(|(product_id, quantity)| OrderLine {
                product_id: product_id.clone(),
                variant_id: None,
                quantity: *quantity,
                unit_price: Decimal::new(1_000, 2),
            })
            .collect();
        SqlOrderRepository::new(pool.clone()).create(&order, &lines).await.expect("create order");
    }

    #[tokio::test]
    async fn product_population_includes_zero_sales_in_insertion_order() {
        let pool = setup_pool().await;
        let shop_id = seed_shop(&pool, 0).await;
        let first = seed_product(&pool, &shop_id, 0).await;
        let second = seed_product(&pool, &shop_id, 1).await;
        let third = seed_product(&pool, &shop_id, 2).await;

        seed_order(&pool, &shop_id, "O-1", &[(second.clone(), 4)]).await;
        seed_order(&pool, &shop_id, "O-2", &[(second.clone(), 3), (third.clone(), 2)]).await;

        let ledger = SqlSalesLedger::new(pool.clone());
        let population = ledger.product_population().await.expect("aggregate");

        assert_eq!(
            population,
            vec![(first, 0), (second, 7), (third, 2)],
            "population keeps insertion order with zero-sales entities present"
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn shop_population_aggregates_transitively_through_products() {
        let pool = setup_pool().await;
        let busy = seed_shop(&pool, 0).await;
        let quiet = seed_shop(&pool, 1).await;
        let product_a = seed_product(&pool, &busy, 0).await;
        let product_b = seed_product(&pool, &busy, 1).await;
        let _unsold = seed_product(&pool, &quiet, 2).await;

        seed_order(&pool, &busy, "O-1", &[(product_a, 5), (product_b, 1)]).await;

        let ledger = SqlSalesLedger::new(pool.clone());
        let population = ledger.shop_population().await.expect("aggregate");

        assert_eq!(population, vec![(busy, 6), (quiet, 0)]);

        pool.close().await;
    }

    #[tokio::test]
    async fn aggregation_is_idempotent_between_orders() {
        let pool = setup_pool().await;
        let shop_id = seed_shop(&pool, 0).await;
        let product = seed_product(&pool, &shop_id, 0).await;
        seed_order(&pool, &shop_id, "O-1", &[(product.clone(), 3)]).await;

        let ledger = SqlSalesLedger::new(pool.clone());
        let first = ledger.product_population().await.expect("aggregate");
        let second = ledger.product_population().await.expect("aggregate");
        assert_eq!(first, second);

        pool.close().await;
    }

    #[tokio::test]
    async fn cancellation_restock_does_not_change_sales_totals() {
        let pool = setup_pool().await;
        let shop_id = seed_shop(&pool, 0).await;
        let product = seed_product(&pool, &shop_id, 0).await;
        seed_order(&pool, &shop_id, "O-1", &[(product.clone(), 5)]).await;

        let ledger = SqlSalesLedger::new(pool.clone());
        let before = ledger.product_population().await.expect("aggregate");

        // Cancel and restock, the way the lifecycle service compensates.
        let orders = SqlOrderRepository::new(pool.clone());
        orders
            .update_status(&OrderId("O-1".to_string()), OrderStatus::Cancelled, Utc::now())
            .await
            .expect("cancel order");
        SqlProductRepository::new(pool.clone()).restock(&product, 5).await.expect("restock");

        let after = ledger.product_population().await.expect("aggregate");
        assert_eq!(before, after, "order lines are immutable, totals must not move");

        pool.close().await;
    }

    #[tokio::test]
    async fn rating_service_reads_through_the_ledger() {
        let pool = setup_pool().await;
        let shop_id = seed_shop(&pool, 0).await;
        let star = seed_product(&pool, &shop_id, 0).await;
        let laggard = seed_product(&pool, &shop_id, 1).await;
        seed_order(&pool, &shop_id, "O-1", &[(star.clone(), 9)]).await;

        let service = RatingService::new(SqlSalesLedger::new(pool.clone()));
        assert_eq!(service.product_rating(&star).await.expect("rating"), 5);
        assert_eq!(service.product_rating(&laggard).await.expect("rating"), 4);
        assert_eq!(service.product_sales_total(&star).await.expect("total"), 9);
        assert_eq!(service.shop_rating(&shop_id).await.expect("rating"), 5);

        pool.close().await;
    }
}
