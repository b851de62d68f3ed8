mod bootstrap;
mod health;
mod notifications;
mod orders;
mod ratings;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use bazari_core::config::{AppConfig, LoadOptions};
use bazari_db::repositories::{
    SqlNotificationRepository, SqlOrderRepository, SqlProductRepository, SqlShopRepository,
    SqlUserRepository,
};

use crate::orders::{OrderLifecycleService, TracingAuditSink};

fn init_logging(config: &AppConfig) {
    use bazari_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let db_pool = app.db_pool.clone();

    let order_service = Arc::new(OrderLifecycleService::new(
        Arc::new(SqlUserRepository::new(db_pool.clone())),
        Arc::new(SqlShopRepository::new(db_pool.clone())),
        Arc::new(SqlProductRepository::new(db_pool.clone())),
        Arc::new(SqlOrderRepository::new(db_pool.clone())),
        Arc::new(SqlNotificationRepository::new(db_pool.clone())),
        app.mailer.clone(),
        Arc::new(TracingAuditSink),
        app.config.orders.initial_status,
    ));

    let api = Router::new()
        .merge(ratings::router(db_pool.clone()))
        .merge(orders::router(order_service))
        .merge(notifications::router(db_pool.clone()));

    let router = Router::new().merge(health::router(db_pool.clone())).nest("/api", api);

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "bazari-server started"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "bazari-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
