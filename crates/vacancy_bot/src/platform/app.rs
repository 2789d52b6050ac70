use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use monitor_logging::{monitor_info, monitor_warn};
use tokio_util::sync::CancellationToken;
use vacancy_core::{format_chat_summary, format_console_summary};
use vacancy_engine::{
    BotApi, EngineHandle, Extractor, FetchSettings, FreeSpaceGuard, Monitor, PollerSettings,
    ReqwestFetcher, SchedulerSettings, Services, SubscriptionStore, SystemClock, TelegramClient,
    TelegramSettings,
};

use super::config::Settings;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn build_monitor(settings: &Settings) -> Result<Monitor> {
    let fetcher = ReqwestFetcher::new(FetchSettings {
        max_bytes: settings.max_response_bytes,
        ..FetchSettings::default()
    })
    .context("failed to build HTTP client")?;
    Ok(Monitor::new(Arc::new(fetcher), Extractor::default()))
}

fn build_client(token: &str, settings: &Settings) -> Result<TelegramClient> {
    TelegramClient::new(
        token,
        TelegramSettings {
            muted: !settings.notify,
            ..TelegramSettings::default()
        },
    )
    .context("failed to build Telegram client")
}

/// Long-running bot: scheduler and poller until Ctrl-C or SIGTERM.
pub async fn run_bot(settings: Settings) -> Result<()> {
    let token = settings
        .bot_token
        .clone()
        .context("TELEGRAM_BOT_TOKEN must be set in the environment or .env")?;

    let store = SubscriptionStore::open(
        settings.state_file.clone(),
        settings.store_limits,
        Box::new(FreeSpaceGuard::new(
            settings.state_dir(),
            settings.store_limits.min_free_disk_mb,
        )),
    );
    let services = Services {
        store: Arc::new(store),
        api: Arc::new(build_client(&token, &settings)?),
        monitor: build_monitor(&settings)?,
        clock: Arc::new(SystemClock),
        source_url: settings.source_url.clone(),
    };

    let engine = EngineHandle::start(
        services,
        SchedulerSettings::default(),
        PollerSettings::default(),
        CancellationToken::new(),
    );
    monitor_info!(
        "Bot started for {}, state in {:?}",
        settings.source_url,
        settings.state_file
    );

    let cancel = engine.cancel_token();
    tokio::select! {
        signal = shutdown_signal() => signal?,
        _ = cancel.cancelled() => {}
    }
    monitor_info!("Stopping...");
    engine.shutdown(SHUTDOWN_GRACE).await;
    Ok(())
}

/// One monitoring pass printed to stdout, optionally sent to the configured chat.
pub async fn run_check(settings: Settings) -> Result<()> {
    let monitor = build_monitor(&settings)?;
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let Ok(result) = monitor.run(&settings.source_url, &cancel).await else {
        monitor_warn!("Check interrupted");
        return Ok(());
    };
    println!("{}", format_console_summary(&result));

    if !settings.notify {
        return Ok(());
    }
    match (settings.bot_token.as_deref(), settings.chat_id) {
        (Some(token), Some(chat_id)) => {
            let client = build_client(token, &settings)?;
            let text = format_chat_summary(&result, &settings.source_url);
            if !client.send_message(chat_id, &text, None).await {
                monitor_warn!("Summary was not delivered to chat {}", chat_id);
            }
        }
        _ => monitor_warn!(
            "TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set, notification skipped"
        ),
    }
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl-C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")
}
