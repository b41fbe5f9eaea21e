//! Process configuration, read once from the environment at startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "https://saferwebapi.com/v2/mcmx/snapshot/";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// `None` disables the email-delivery variant.
    pub credentials: Option<SmtpCredentials>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub api_timeout: Duration,
    pub smtp: SmtpConfig,
    pub chrome_binary: Option<PathBuf>,
    pub render_timeout: Duration,
    pub item_delay: Duration,
    pub output_dir: PathBuf,
    pub debug_dir: Option<PathBuf>,
    pub bind_addr: String,
}

impl AppConfig {
    /// Loads `.env` (if any) and then reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source, which keeps
    /// tests away from the real process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("SAFER_API_KEY").ok_or(ConfigError::Missing("SAFER_API_KEY"))?;

        let credentials = match (get("SMTP_USERNAME"), get("SMTP_PASSWORD")) {
            (Some(username), Some(password)) => Some(SmtpCredentials { username, password }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialSmtpCredentials),
        };

        Ok(AppConfig {
            api_key,
            api_base_url: get("SAFER_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            api_timeout: Duration::from_secs(parse_or("API_TIMEOUT_SECS", get("API_TIMEOUT_SECS"), 30)?),
            smtp: SmtpConfig {
                host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                port: parse_or("SMTP_PORT", get("SMTP_PORT"), DEFAULT_SMTP_PORT)?,
                credentials,
            },
            chrome_binary: get("CHROME_BIN").map(PathBuf::from),
            render_timeout: Duration::from_secs(parse_or(
                "RENDER_TIMEOUT_SECS",
                get("RENDER_TIMEOUT_SECS"),
                20,
            )?),
            item_delay: Duration::from_secs(parse_or("SCRAPE_DELAY_SECS", get("SCRAPE_DELAY_SECS"), 5)?),
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("outputs")),
            debug_dir: get("SCRAPE_DEBUG_DIR").map(PathBuf::from),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }

    pub fn email_delivery_enabled(&self) -> bool {
        self.smtp.credentials.is_some()
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
