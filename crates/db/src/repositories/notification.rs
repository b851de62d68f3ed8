use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use bazari_core::domain::notification::{Notification, NotificationId, NotificationKind};
use bazari_core::domain::product::ProductId;
use bazari_core::domain::user::UserId;

use super::{NotificationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn notification_from_row(row: &SqliteRow) -> Result<Notification, RepositoryError> {
        let kind_raw: String = row.try_get("kind")?;
        let kind = NotificationKind::parse(&kind_raw).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown notification kind `{kind_raw}`"))
        })?;
        let product_id: Option<String> = row.try_get("product_id")?;
        let is_read: i64 = row.try_get("is_read")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(Notification {
            id: NotificationId(row.try_get("id")?),
            user_id: UserId(row.try_get("user_id")?),
            kind,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            product_id: product_id.map(ProductId),
            is_read: is_read != 0,
            created_at,
        })
    }
}

#[async_trait]
impl NotificationRepository for SqlNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO notification (id, user_id, kind, title, message, product_id, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id.0)
        .bind(&notification.user_id.0)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.product_id.as_ref().map(|id| id.0.clone()))
        .bind(i64::from(notification.is_read))
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn has_unread_low_stock(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM notification
            WHERE user_id = ? AND kind = 'low_stock' AND product_id = ? AND is_read = 0
            "#,
        )
        .bind(&user.0)
        .bind(&product.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn recent_for_user(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, kind, title, message, product_id, is_read, created_at
            FROM notification
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(&user.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::notification_from_row).collect()
    }

    async fn unread_count(&self, user: &UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification WHERE user_id = ? AND is_read = 0",
        )
        .bind(&user.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        user: &UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE notification SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(&id.0)
            .bind(&user.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user: &UserId) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("UPDATE notification SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                .bind(&user.0)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
