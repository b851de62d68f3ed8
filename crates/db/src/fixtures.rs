//! Deterministic demo dataset for the `seed` CLI command and smoke checks.
//!
//! Seeds two shops with a seven-product catalog and enough order history to
//! spread the sales leaderboard across rating bands (a seven-entity population
//! floors the quintile width to one).

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use bazari_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
use bazari_core::domain::product::{Product, ProductId};
use bazari_core::domain::shop::{slugify, ReminderPeriod, Shop, ShopId};
use bazari_core::domain::user::{Role, User, UserId};

use crate::repositories::{
    OrderRepository, ProductRepository, RepositoryError, ShopRepository, SqlOrderRepository,
    SqlProductRepository, SqlShopRepository, SqlUserRepository, UserRepository,
};
use crate::DbPool;

pub struct DemoDataset;

#[derive(Clone, Debug)]
pub struct SeedResult {
    pub shops: usize,
    pub products: usize,
    pub orders: usize,
}

#[derive(Clone, Debug)]
pub struct SeedVerification {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

const SHOPS: &[(&str, &str, &str)] = &[
    ("S-atlas", "U-malik", "Atlas Traders"),
    ("S-nora", "U-nora", "Chez Nora"),
];

// (id, shop, name, price cents, stock, units already sold)
const PRODUCTS: &[(&str, &str, &str, i64, u32, u32)] = &[
    ("P-mug", "S-atlas", "Ceramic Mug", 1_250, 40, 26),
    ("P-tray", "S-atlas", "Walnut Tray", 3_000, 25, 17),
    ("P-lamp", "S-atlas", "Brass Lamp", 5_500, 12, 11),
    ("P-rug", "S-nora", "Berber Rug", 18_000, 6, 7),
    ("P-scarf", "S-nora", "Silk Scarf", 2_200, 30, 4),
    ("P-bowl", "S-nora", "Olivewood Bowl", 1_800, 18, 2),
    ("P-vase", "S-nora", "Clay Vase", 2_600, 9, 0),
];

impl DemoDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let users = SqlUserRepository::new(pool.clone());
        let shops = SqlShopRepository::new(pool.clone());
        let products = SqlProductRepository::new(pool.clone());
        let orders = SqlOrderRepository::new(pool.clone());

        let base = Utc::now() - Duration::days(30);

        users
            .save(&User {
                id: UserId("U-admin".to_string()),
                username: "admin".to_string(),
                email: "admin@bazari.example".to_string(),
                role: Role::Admin,
                created_at: base,
            })
            .await?;

        for (index, (shop_id, owner_id, name)) in SHOPS.iter().enumerate() {
            users
                .save(&User {
                    id: UserId(owner_id.to_string()),
                    username: name.split_whitespace().next().unwrap_or(name).to_lowercase(),
                    email: format!("{}@bazari.example", owner_id.to_lowercase()),
                    role: Role::Seller,
                    created_at: base + Duration::minutes(index as i64),
                })
                .await?;

            shops
                .save(&Shop {
                    id: ShopId(shop_id.to_string()),
                    owner_id: UserId(owner_id.to_string()),
                    name: name.to_string(),
                    slug: slugify(name),
                    description: format!("{name} demo shop"),
                    reminder_period: ReminderPeriod::Days1,
                    created_at: base + Duration::minutes(index as i64),
                })
                .await?;
        }

        for (index, (product_id, shop_id, name, price_cents, stock, _)) in
            PRODUCTS.iter().enumerate()
        {
            products
                .save(&Product {
                    id: ProductId(product_id.to_string()),
                    shop_id: ShopId(shop_id.to_string()),
                    name: name.to_string(),
                    category: "Home & Garden".to_string(),
                    price: Decimal::new(*price_cents, 2),
                    old_price: None,
                    quantity: *stock,
                    low_stock_threshold: 5,
                    created_at: base + Duration::minutes(10 + index as i64),
                })
                .await?;
        }

        let mut order_count = 0;
        for (product_id, shop_id, _, price_cents, _, units_sold) in PRODUCTS {
            if *units_sold == 0 {
                continue;
            }

            order_count += 1;
            let unit_price = Decimal::new(*price_cents, 2);
            let order_number = orders.next_order_number().await?;
            let placed_at = base + Duration::hours(order_count as i64);

            orders
                .create(
                    &Order {
                        id: OrderId(format!("O-seed-{order_count:03}")),
                        shop_id: ShopId(shop_id.to_string()),
                        customer_id: None,
                        order_number,
                        status: OrderStatus::Sent,
                        total_amount: unit_price * Decimal::from(*units_sold),
                        customer_name: "Demo Buyer".to_string(),
                        customer_email: "buyer@bazari.example".to_string(),
                        customer_phone: String::new(),
                        customer_address: "1 Demo Street".to_string(),
                        payment_method: Some("cash_on_delivery".to_string()),
                        created_at: placed_at,
                        updated_at: placed_at,
                    },
                    &[OrderLine {
                        product_id: ProductId(product_id.to_string()),
                        variant_id: None,
                        quantity: *units_sold,
                        unit_price,
                    }],
                )
                .await?;
        }

        Ok(SeedResult { shops: SHOPS.len(), products: PRODUCTS.len(), orders: order_count })
    }

    pub async fn verify(pool: &DbPool) -> Result<SeedVerification, RepositoryError> {
        let shop_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop").fetch_one(pool).await?;
        let product_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product").fetch_one(pool).await?;
        let line_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM order_line").fetch_one(pool).await?;

        let checks = vec![
            ("shops", shop_count >= SHOPS.len() as i64),
            ("products", product_count >= PRODUCTS.len() as i64),
            ("order-lines", line_count > 0),
        ];
        let all_present = checks.iter().all(|(_, passed)| *passed);

        Ok(SeedVerification { all_present, checks })
    }
}
