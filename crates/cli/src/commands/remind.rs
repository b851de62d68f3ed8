use chrono::Utc;

use crate::commands::{build_runtime, CommandResult};
use bazari_core::config::{AppConfig, LoadOptions};
use bazari_core::domain::notification::Notification;
use bazari_core::domain::order::OrderStatus;
use bazari_db::repositories::{
    NotificationRepository, OrderRepository, ShopRepository, SqlNotificationRepository,
    SqlOrderRepository, SqlShopRepository, SqlUserRepository, UserRepository,
};
use bazari_db::{connect_with_settings, migrations};
use bazari_notify::{gateway_from_config, messages};

/// Scan confirmed orders and nudge shop owners whose reminder window has
/// lapsed since the last status change. Email failures are counted but never
/// abort the sweep.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "remind",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("remind") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let mailer = gateway_from_config(&config.email)
            .map_err(|error| ("email_gateway", error.to_string(), 5u8))?;

        let shops = SqlShopRepository::new(pool.clone());
        let users = SqlUserRepository::new(pool.clone());
        let orders = SqlOrderRepository::new(pool.clone());
        let notifications = SqlNotificationRepository::new(pool.clone());

        let confirmed = orders
            .list_with_status(OrderStatus::Confirmed)
            .await
            .map_err(|error| ("order_scan", error.to_string(), 5u8))?;

        let now = Utc::now();
        let mut reminded = 0usize;
        let mut email_failures = 0usize;

        for order in &confirmed {
            let Some(shop) = shops
                .find_by_id(&order.shop_id)
                .await
                .map_err(|error| ("shop_lookup", error.to_string(), 5u8))?
            else {
                continue;
            };

            if now - order.updated_at < shop.reminder_period.as_duration() {
                continue;
            }

            let Some(owner) = users
                .find_by_id(&shop.owner_id)
                .await
                .map_err(|error| ("owner_lookup", error.to_string(), 5u8))?
            else {
                continue;
            };

            let mail = messages::owner_order_reminder(
                order,
                &owner.username,
                &shop.name,
                shop.reminder_period.as_str(),
            );
            if mailer.send(&owner.email, &mail.subject, &mail.body).await.is_err() {
                email_failures += 1;
            }

            notifications
                .create(&Notification::order_reminder(owner.id.clone(), order))
                .await
                .map_err(|error| ("notification_create", error.to_string(), 5u8))?;
            reminded += 1;
        }

        pool.close().await;
        Ok::<(usize, usize, usize), (&'static str, String, u8)>((
            confirmed.len(),
            reminded,
            email_failures,
        ))
    });

    match result {
        Ok((scanned, reminded, email_failures)) => CommandResult::success(
            "remind",
            format!(
                "scanned {scanned} confirmed orders, reminded {reminded} (email failures: {email_failures})"
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("remind", error_class, message, exit_code)
        }
    }
}
