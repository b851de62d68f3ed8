use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use bazari_core::domain::product::{Product, ProductId, ProductVariant, VariantId};
use bazari_core::domain::shop::ShopId;

use super::{parse_decimal, quantity_from_i64, ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
        let price_text: String = row.try_get("price_text")?;
        let old_price_text: Option<String> = row.try_get("old_price_text")?;
        let quantity_raw: i64 = row.try_get("quantity")?;
        let threshold_raw: i64 = row.try_get("low_stock_threshold")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(Product {
            id: ProductId(row.try_get("id")?),
            shop_id: ShopId(row.try_get("shop_id")?),
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            price: parse_decimal("product.price", &price_text)?,
            old_price: old_price_text
                .map(|value| parse_decimal("product.old_price", &value))
                .transpose()?,
            quantity: quantity_from_i64("product.quantity", quantity_raw)?,
            low_stock_threshold: quantity_from_i64("product.low_stock_threshold", threshold_raw)?,
            created_at,
        })
    }

    fn variant_from_row(row: &SqliteRow) -> Result<ProductVariant, RepositoryError> {
        let adjustment_text: String = row.try_get("price_adjustment_text")?;
        let quantity_raw: i64 = row.try_get("quantity")?;

        Ok(ProductVariant {
            id: VariantId(row.try_get("id")?),
            product_id: ProductId(row.try_get("product_id")?),
            name: row.try_get("name")?,
            value: row.try_get("value")?,
            price_adjustment: parse_decimal("variant.price_adjustment", &adjustment_text)?,
            quantity: quantity_from_i64("variant.quantity", quantity_raw)?,
        })
    }
}

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, shop_id, name, category,
                CAST(price AS TEXT) AS price_text,
                CAST(old_price AS TEXT) AS old_price_text,
                quantity, low_stock_threshold, created_at
            FROM product
            WHERE id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::product_from_row(&row)).transpose()
    }

    async fn save(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO product (
                id, shop_id, name, category, price, old_price,
                quantity, low_stock_threshold, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                price = excluded.price,
                old_price = excluded.old_price,
                quantity = excluded.quantity,
                low_stock_threshold = excluded.low_stock_threshold
            "#,
        )
        .bind(&product.id.0)
        .bind(&product.shop_id.0)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price.to_string())
        .bind(product.old_price.map(|value| value.to_string()))
        .bind(i64::from(product.quantity))
        .bind(i64::from(product.low_stock_threshold))
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_variant(
        &self,
        id: &VariantId,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, product_id, name, value,
                CAST(price_adjustment AS TEXT) AS price_adjustment_text,
                quantity
            FROM product_variant
            WHERE id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::variant_from_row(&row)).transpose()
    }

    async fn save_variant(&self, variant: &ProductVariant) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO product_variant (id, product_id, name, value, price_adjustment, quantity)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                value = excluded.value,
                price_adjustment = excluded.price_adjustment,
                quantity = excluded.quantity
            "#,
        )
        .bind(&variant.id.0)
        .bind(&variant.product_id.0)
        .bind(&variant.name)
        .bind(&variant.value)
        .bind(variant.price_adjustment.to_string())
        .bind(i64::from(variant.quantity))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn decrement_stock(
        &self,
        id: &ProductId,
        units: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        // Guarded single-statement decrement; concurrent checkouts cannot
        // interleave a read-modify-write and oversell.
        let row = sqlx::query(
            r#"
            UPDATE product
            SET quantity = quantity - ?2
            WHERE id = ?1 AND quantity >= ?2
            RETURNING quantity
            "#,
        )
        .bind(&id.0)
        .bind(i64::from(units))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let remaining: i64 = row.try_get("quantity")?;
            quantity_from_i64("product.quantity", remaining)
        })
        .transpose()
    }

    async fn restock(&self, id: &ProductId, units: u32) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE product SET quantity = quantity + ?2 WHERE id = ?1")
            .bind(&id.0)
            .bind(i64::from(units))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn decrement_variant_stock(
        &self,
        id: &VariantId,
        units: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        let row = sqlx::query(
            r#"
            UPDATE product_variant
            SET quantity = quantity - ?2
            WHERE id = ?1 AND quantity >= ?2
            RETURNING quantity
            "#,
        )
        .bind(&id.0)
        .bind(i64::from(units))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let remaining: i64 = row.try_get("quantity")?;
            quantity_from_i64("variant.quantity", remaining)
        })
        .transpose()
    }

    async fn restock_variant(&self, id: &VariantId, units: u32) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE product_variant SET quantity = quantity + ?2 WHERE id = ?1")
            .bind(&id.0)
            .bind(i64::from(units))
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
