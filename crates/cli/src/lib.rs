pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "bazari",
    about = "Bazari operator CLI",
    long_about = "Operate Bazari migrations, demo data, rating reports, and order reminders.",
    after_help = "Examples:\n  bazari migrate\n  bazari seed\n  bazari ratings --shops\n  bazari remind"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo marketplace dataset")]
    Seed,
    #[command(about = "Print the sales leaderboard with quintile star ratings")]
    Ratings {
        #[arg(long, help = "Rank shops instead of products")]
        shops: bool,
    },
    #[command(about = "Email shop owners about confirmed orders past their reminder period")]
    Remind,
    #[command(about = "Validate config and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Ratings { shops } => commands::ratings::run(shops),
        Command::Remind => commands::remind::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
