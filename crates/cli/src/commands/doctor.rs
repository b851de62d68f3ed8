use serde::Serialize;

use crate::commands::{build_runtime, CommandResult};
use bazari_core::config::{AppConfig, LoadOptions};
use bazari_db::connect_with_settings;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckOutcome,
    database: CheckOutcome,
    email: CheckOutcome,
}

#[derive(Debug, Serialize)]
struct CheckOutcome {
    status: &'static str,
    detail: String,
}

impl CheckOutcome {
    fn ok(detail: impl Into<String>) -> Self {
        Self { status: "ok", detail: detail.into() }
    }

    fn failed(detail: impl Into<String>) -> Self {
        Self { status: "failed", detail: detail.into() }
    }
}

pub fn run(json: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            let report = DoctorReport {
                config: CheckOutcome::failed(error.to_string()),
                database: CheckOutcome::failed("skipped: configuration invalid".to_string()),
                email: CheckOutcome::failed("skipped: configuration invalid".to_string()),
            };
            return render(report, json, 2);
        }
    };

    let runtime = match build_runtime("doctor") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let database = runtime.block_on(async {
        match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => {
                let check = match pool.acquire().await {
                    Ok(_connection) => {
                        CheckOutcome::ok(format!("connected to {}", config.database.url))
                    }
                    Err(error) => CheckOutcome::failed(format!("probe failed: {error}")),
                };
                pool.close().await;
                check
            }
            Err(error) => CheckOutcome::failed(format!("connect failed: {error}")),
        }
    });

    let email = if config.email.enabled {
        CheckOutcome::ok(format!("enabled, sender {}", config.email.sender_email))
    } else {
        CheckOutcome::ok("disabled (notifications stay in-app)".to_string())
    };

    let healthy = database.status == "ok";
    let report = DoctorReport {
        config: CheckOutcome::ok("configuration loaded and validated".to_string()),
        database,
        email,
    };

    render(report, json, if healthy { 0 } else { 4 })
}

fn render(report: DoctorReport, json: bool, exit_code: u8) -> CommandResult {
    let message = if json {
        serde_json::to_string(&report)
            .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"))
    } else {
        format!(
            "config:   {} ({})\ndatabase: {} ({})\nemail:    {} ({})",
            report.config.status,
            report.config.detail,
            report.database.status,
            report.database.detail,
            report.email.status,
            report.email.detail,
        )
    };

    if exit_code == 0 {
        CommandResult::success("doctor", message)
    } else {
        CommandResult::failure("doctor", "preflight", message, exit_code)
    }
}
