use crate::commands::{build_runtime, CommandResult};
use bazari_core::config::{AppConfig, LoadOptions};
use bazari_db::{connect_with_settings, migrations, DemoDataset};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("seed") {
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

        let seeded = DemoDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if !verification.all_present {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            let message = if failed_checks.is_empty() {
                "Some seed data failed to load".to_string()
            } else {
                format!("Seed verification failed for checks: {}", failed_checks.join(", "))
            };
            Err(("seed_verification", message, 6u8))
        } else {
            Ok(seeded)
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success(
            "seed",
            format!(
                "demo dataset loaded: {} shops, {} products, {} orders",
                seeded.shops, seeded.products, seeded.orders
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
