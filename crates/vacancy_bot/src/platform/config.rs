//! Command-line flags and environment, resolved into one `Settings` value.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use monitor_logging::LogDestination;
use thiserror::Error;
use url::Url;
use vacancy_core::ChatId;
use vacancy_engine::StoreLimits;

pub const DEFAULT_SOURCE_URL: &str = "https://career.avito.com/vacancies/razrabotka/?q=&action=filter&direction=razrabotka&tags%5B%5D=s26502";
const DEFAULT_STATE_FILE: &str = "./bot_subscriptions.json";
const DEFAULT_LOG_FILE: &str = "./vacancy_bot.log";

#[derive(Parser, Debug)]
#[command(
    name = "vacancy_bot",
    version,
    about = "Watches a career page for QA vacancies and reports them over Telegram"
)]
pub struct Cli {
    /// Vacancy listing page [env: VACANCY_URL]
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Log notifications instead of sending them
    #[arg(long, global = true)]
    pub no_telegram: bool,

    /// Recipient for `check` [env: TELEGRAM_CHAT_ID]
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub chat_id: Option<String>,

    /// Subscription state file [env: VACANCY_STATE_FILE]
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = 5 * 1024 * 1024)]
    pub max_response_bytes: u64,

    #[arg(long, global = true, default_value_t = 1024 * 1024)]
    pub max_state_bytes: u64,

    #[arg(long, global = true, default_value_t = 10)]
    pub min_disk_mb: u64,

    #[arg(long, global = true, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    #[arg(long, global = true, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the bot until interrupted (default)
    Run,
    /// Check the page once and print what was found
    Check,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid source url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("TELEGRAM_CHAT_ID must be an integer, got {0:?}")]
    InvalidChatId(String),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub source_url: String,
    pub notify: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<ChatId>,
    pub state_file: PathBuf,
    pub max_response_bytes: u64,
    pub store_limits: StoreLimits,
    pub log_destination: LogDestination,
    pub log_level: LevelFilter,
}

impl Settings {
    /// Flags win over environment; blank environment values count as unset.
    pub fn resolve(
        cli: &Cli,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            env(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let source_url = cli
            .url
            .clone()
            .or_else(|| var("VACANCY_URL"))
            .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());
        validate_url(&source_url)?;

        let chat_id = match cli.chat_id.clone().or_else(|| var("TELEGRAM_CHAT_ID")) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<ChatId>()
                    .map_err(|_| ConfigError::InvalidChatId(raw.clone()))?,
            ),
            None => None,
        };

        let state_file = cli
            .state_file
            .clone()
            .or_else(|| var("VACANCY_STATE_FILE").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));

        let log_destination = match cli.log {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File(cli.log_file.clone()),
            LogTarget::Both => LogDestination::Both(cli.log_file.clone()),
        };

        Ok(Self {
            source_url,
            notify: !cli.no_telegram,
            bot_token: var("TELEGRAM_BOT_TOKEN"),
            chat_id,
            state_file,
            max_response_bytes: cli.max_response_bytes,
            store_limits: StoreLimits {
                max_state_bytes: cli.max_state_bytes,
                min_free_disk_mb: cli.min_disk_mb,
            },
            log_destination,
            log_level: if cli.verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
        })
    }

    /// Directory holding the state file; `.` for a bare file name.
    pub fn state_dir(&self) -> PathBuf {
        match self.state_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

fn validate_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn resolve(args: &[&str], env: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let cli = Cli::try_parse_from(std::iter::once("vacancy_bot").chain(args.iter().copied()))
            .unwrap();
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::resolve(&cli, |key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_flags_or_environment() {
        let settings = resolve(&[], &[]).unwrap();
        assert_eq!(settings.source_url, DEFAULT_SOURCE_URL);
        assert!(settings.notify);
        assert_eq!(settings.bot_token, None);
        assert_eq!(settings.chat_id, None);
        assert_eq!(settings.state_file, PathBuf::from("./bot_subscriptions.json"));
        assert_eq!(settings.state_dir(), PathBuf::from("."));
        assert_eq!(settings.store_limits, StoreLimits::default());
        assert_eq!(settings.max_response_bytes, 5 * 1024 * 1024);
        assert_eq!(settings.log_destination, LogDestination::Terminal);
        assert_eq!(settings.log_level, LevelFilter::Info);
    }

    #[test]
    fn flags_override_environment() {
        let settings = resolve(
            &["check", "--url", "https://example.com/jobs", "--chat-id", "-1001"],
            &[
                ("VACANCY_URL", "https://other.example.com/"),
                ("TELEGRAM_CHAT_ID", "42"),
                ("TELEGRAM_BOT_TOKEN", " 123:abc \n"),
            ],
        )
        .unwrap();
        assert_eq!(settings.source_url, "https://example.com/jobs");
        assert_eq!(settings.chat_id, Some(-1001));
        assert_eq!(settings.bot_token.as_deref(), Some("123:abc"));
    }

    #[test]
    fn environment_fills_missing_flags() {
        let settings = resolve(
            &["--no-telegram", "-v", "--log", "both"],
            &[
                ("TELEGRAM_CHAT_ID", "77"),
                ("VACANCY_STATE_FILE", "/var/lib/bot/state.json"),
                ("TELEGRAM_BOT_TOKEN", "   "),
            ],
        )
        .unwrap();
        assert!(!settings.notify);
        assert_eq!(settings.chat_id, Some(77));
        assert_eq!(settings.bot_token, None);
        assert_eq!(settings.state_dir(), PathBuf::from("/var/lib/bot"));
        assert_eq!(settings.log_level, LevelFilter::Debug);
        assert_eq!(
            settings.log_destination,
            LogDestination::Both(PathBuf::from("./vacancy_bot.log"))
        );
    }

    #[test]
    fn rejects_bad_url_and_chat_id() {
        assert!(matches!(
            resolve(&["--url", "not a url"], &[]),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            resolve(&["--url", "ftp://example.com/"], &[]),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert_eq!(
            resolve(&[], &[("TELEGRAM_CHAT_ID", "@channel")]).unwrap_err(),
            ConfigError::InvalidChatId("@channel".into())
        );
    }
}
