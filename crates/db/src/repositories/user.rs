use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use bazari_core::domain::user::{Role, User, UserId};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn user_from_row(row: &SqliteRow) -> Result<User, RepositoryError> {
        let role_raw: String = row.try_get("role")?;
        let role = Role::parse(&role_raw)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown role `{role_raw}`")))?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(User {
            id: UserId(row.try_get("id")?),
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            role,
            created_at,
        })
    }
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, username, email, role, created_at FROM user_account WHERE id = ?")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|row| Self::user_from_row(&row)).transpose()
    }

    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO user_account (id, username, email, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                username = excluded.username,
                email = excluded.email,
                role = excluded.role
            "#,
        )
        .bind(&user.id.0)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
