//! Vacancy bot: watches a career page for QA vacancies and reports them to
//! Telegram chats on a per-chat schedule.

mod platform;

use anyhow::Result;
use clap::Parser;

use crate::platform::config::{Cli, Command, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let settings = Settings::resolve(&cli, |key| std::env::var(key).ok())?;
    monitor_logging::initialize(&settings.log_destination, settings.log_level);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => platform::app::run_bot(settings).await,
        Command::Check => platform::app::run_check(settings).await,
    }
}
