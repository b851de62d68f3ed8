use std::sync::Arc;

use bazari_core::config::{AppConfig, ConfigError, LoadOptions};
use bazari_db::{connect_with_settings, migrations, DbPool};
use bazari_notify::{gateway_from_config, EmailError, EmailGateway};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub mailer: Arc<dyn EmailGateway>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("email gateway setup failed: {0}")]
    Email(#[from] EmailError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let mailer = gateway_from_config(&config.email)?;

    Ok(Application { config, db_pool, mailer })
}

#[cfg(test)]
mod tests {
    use bazari_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_when_email_is_enabled_without_a_key() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                email_enabled: Some(true),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("bootstrap must fail").to_string();
        assert!(message.contains("email.api_key"));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_for_the_order_path() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with defaults");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('customer_order', 'order_line', 'order_status_history', 'notification')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected order tables after bootstrap");
        assert_eq!(table_count, 4, "bootstrap should expose the order lifecycle tables");

        app.db_pool.close().await;
    }
}
