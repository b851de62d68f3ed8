use crate::commands::{build_runtime, CommandResult};
use bazari_core::config::{AppConfig, LoadOptions};
use bazari_core::rating::service::RatingService;
use bazari_core::rating::{quintile_rating, RankedEntity};
use bazari_db::repositories::SqlSalesLedger;
use bazari_db::{connect_with_settings, migrations};

/// Render one leaderboard the way the storefront explains it: rank, units
/// sold, stars, and the percentile each rank lands on.
fn render<Id>(kind: &str, entries: &[RankedEntity<Id>], label: impl Fn(&Id) -> String) -> String {
    if entries.is_empty() {
        return format!("{kind}: population is empty\n");
    }

    let population = entries.len();
    let mut out = format!("{kind} ({population} ranked):\n");
    for entry in entries {
        let stars = quintile_rating(entry.rank, population);
        let percentile = (entry.rank as f64 / population as f64) * 100.0;
        out.push_str(&format!(
            "{rank:3}. {name:<30} | sold: {sold:4} | {stars} stars | top {percentile:.1}%\n",
            rank = entry.rank,
            name = label(&entry.id),
            sold = entry.units_sold,
        ));
    }
    out
}

pub fn run(shops: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ratings",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("ratings") {
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

        let service = RatingService::new(SqlSalesLedger::new(pool.clone()));
        let report = if shops {
            let board = service
                .shop_leaderboard()
                .await
                .map_err(|error| ("rating_read", error.to_string(), 5u8))?;
            render("Shop leaderboard", board.entries(), |id| id.0.clone())
        } else {
            let board = service
                .product_leaderboard()
                .await
                .map_err(|error| ("rating_read", error.to_string(), 5u8))?;
            render("Product leaderboard", board.entries(), |id| id.0.clone())
        };

        pool.close().await;
        Ok::<String, (&'static str, String, u8)>(report)
    });

    match result {
        Ok(report) => CommandResult::success("ratings", report),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ratings", error_class, message, exit_code)
        }
    }
}
