use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use bazari_core::domain::shop::{ReminderPeriod, Shop, ShopId};
use bazari_core::domain::user::UserId;

use super::{RepositoryError, ShopRepository};
use crate::DbPool;

pub struct SqlShopRepository {
    pool: DbPool,
}

impl SqlShopRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn shop_from_row(row: &SqliteRow) -> Result<Shop, RepositoryError> {
        let reminder_raw: String = row.try_get("reminder_period")?;
        let reminder_period = ReminderPeriod::parse(&reminder_raw).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown reminder period `{reminder_raw}`"))
        })?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(Shop {
            id: ShopId(row.try_get("id")?),
            owner_id: UserId(row.try_get("owner_id")?),
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
            reminder_period,
            created_at,
        })
    }
}

#[async_trait]
impl ShopRepository for SqlShopRepository {
    async fn find_by_id(&self, id: &ShopId) -> Result<Option<Shop>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, owner_id, name, slug, description, reminder_period, created_at
             FROM shop WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::shop_from_row(&row)).transpose()
    }

    async fn list(&self) -> Result<Vec<Shop>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, owner_id, name, slug, description, reminder_period, created_at
             FROM shop ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::shop_from_row).collect()
    }

    async fn save(&self, shop: &Shop) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO shop (id, owner_id, name, slug, description, reminder_period, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                slug = excluded.slug,
                description = excluded.description,
                reminder_period = excluded.reminder_period
            "#,
        )
        .bind(&shop.id.0)
        .bind(&shop.owner_id.0)
        .bind(&shop.name)
        .bind(&shop.slug)
        .bind(&shop.description)
        .bind(shop.reminder_period.as_str())
        .bind(shop.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use bazari_core::domain::shop::{ReminderPeriod, Shop, ShopId};
    use bazari_core::domain::user::{Role, User, UserId};

    use super::SqlShopRepository;
    use crate::repositories::user::SqlUserRepository;
    use crate::repositories::{ShopRepository, UserRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn save_and_list_preserves_insertion_order() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");

        let users = SqlUserRepository::new(pool.clone());
        let shops = SqlShopRepository::new(pool.clone());

        for (index, name) in ["Atlas Traders", "Chez Nora"].iter().enumerate() {
            let owner = User {
                id: UserId(format!("U-{index}")),
                username: format!("owner{index}"),
                email: format!("owner{index}@example.com"),
                role: Role::Seller,
                created_at: Utc::now(),
            };
            users.save(&owner).await.expect("save owner");

            shops
                .save(&Shop {
                    id: ShopId(format!("S-{index}")),
                    owner_id: owner.id,
                    name: name.to_string(),
                    slug: format!("shop-{index}"),
                    description: String::new(),
                    reminder_period: ReminderPeriod::Hours12,
                    created_at: Utc::now(),
                })
                .await
                .expect("save shop");
        }

        let listed = shops.list().await.expect("list shops");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Atlas Traders");
        assert_eq!(listed[1].name, "Chez Nora");
        assert_eq!(listed[0].reminder_period, ReminderPeriod::Hours12);

        let found =
            shops.find_by_id(&ShopId("S-1".to_string())).await.expect("find").expect("exists");
        assert_eq!(found.slug, "shop-1");

        pool.close().await;
    }
}
