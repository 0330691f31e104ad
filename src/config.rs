use crate::error::{MonitorError, Result};
use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub address: String,
    pub password: String,
    // Defaults to `address`
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub check_interval: Duration,
    pub cooldown: chrono::Duration,
    pub max_csv_bytes: u64,
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    // `None` disables the channel
    pub email: Option<EmailConfig>,
    pub telegram: Option<TelegramConfig>,
    pub monitor: MonitorConfig,
    pub thresholds_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Don't fail if .env doesn't exist
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let email = match (get("EMAIL_ADDRESS"), get("EMAIL_PASSWORD")) {
            (Some(address), Some(password)) => Some(EmailConfig {
                smtp_server: get("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                smtp_port: parse_or(&get, "SMTP_PORT", 587)?,
                recipient: get("EMAIL_TO").unwrap_or_else(|| address.clone()),
                address,
                password,
            }),
            _ => {
                warn!("EMAIL_ADDRESS/EMAIL_PASSWORD not set, email alerts disabled");
                None
            }
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                bot_token,
                chat_id,
                api_url: get("TELEGRAM_API_URL")
                    .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            }),
            _ => {
                warn!("TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set, Telegram alerts disabled");
                None
            }
        };

        let interval_minutes: u64 = parse_or(&get, "CHECK_INTERVAL_MINUTES", 5)?;
        let check_interval = interval_minutes
            .checked_mul(60)
            .filter(|_| interval_minutes >= 1)
            .map(Duration::from_secs)
            .ok_or_else(|| out_of_range("CHECK_INTERVAL_MINUTES", interval_minutes))?;

        let cooldown = match get("ALERT_COOLDOWN_MINUTES") {
            Some(_) => cooldown_from(
                "ALERT_COOLDOWN_MINUTES",
                parse_or(&get, "ALERT_COOLDOWN_MINUTES", 60)?,
                chrono::Duration::try_minutes,
            )?,
            None => cooldown_from(
                "ALERT_COOLDOWN_HOURS",
                parse_or(&get, "ALERT_COOLDOWN_HOURS", 1)?,
                chrono::Duration::try_hours,
            )?,
        };

        let max_csv_mb: u64 = parse_or(&get, "MAX_CSV_SIZE_MB", 10)?;
        let max_csv_bytes = max_csv_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| out_of_range("MAX_CSV_SIZE_MB", max_csv_mb))?;

        let timeout_secs: u64 = parse_or(&get, "HTTP_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            return Err(out_of_range("HTTP_TIMEOUT_SECS", timeout_secs));
        }

        Ok(Self {
            email,
            telegram,
            monitor: MonitorConfig {
                check_interval,
                cooldown,
                max_csv_bytes,
                http_timeout: Duration::from_secs(timeout_secs),
            },
            thresholds_path: get("THRESHOLDS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("thresholds.json")),
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
        })
    }

    pub fn alert_state_path(&self) -> PathBuf {
        self.data_dir.join("last_alerts.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.csv")
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            MonitorError::ConfigError(format!("{} has invalid value '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

fn cooldown_from(
    key: &str,
    value: i64,
    build: fn(i64) -> Option<chrono::Duration>,
) -> Result<chrono::Duration> {
    if value < 0 {
        return Err(out_of_range(key, value));
    }
    build(value).ok_or_else(|| out_of_range(key, value))
}

fn out_of_range(key: &str, value: impl std::fmt::Display) -> MonitorError {
    MonitorError::ConfigError(format!("{} is out of range: {}", key, value))
}
