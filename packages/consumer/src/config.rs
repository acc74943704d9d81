use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use url_validation::validator::DEFAULT_USER_AGENT;

/// Where batches are consumed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Postgres,
    Sqs,
}

impl FromStr for QueueBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "sqs" => Ok(Self::Sqs),
            other => bail!("unknown queue backend {other:?} (expected postgres or sqs)"),
        }
    }
}

/// Consumer configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub queue_backend: QueueBackend,
    pub queue_name: String,
    pub aws_region: Option<String>,
    pub visibility_timeout: Duration,
    pub url_timeout: Duration,
    pub tweet_timeout: Duration,
    pub accept_invalid_certs: bool,
    pub user_agent: String,
    /// Skips the lookup service when set
    pub source_ip: Option<String>,
    pub ip_lookup_url: String,
    pub init_schema: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let seconds = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{key} must be a whole number of seconds")),
                None => Ok(Duration::from_secs(default)),
            }
        };
        let flag = |key: &str, default: bool| -> Result<bool> {
            match lookup(key) {
                Some(raw) => parse_flag(&raw).with_context(|| format!("{key} must be a boolean")),
                None => Ok(default),
            }
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            queue_backend: lookup("QUEUE_BACKEND")
                .unwrap_or_else(|| "postgres".to_string())
                .parse()
                .context("QUEUE_BACKEND is invalid")?,
            queue_name: lookup("QUEUE_NAME").unwrap_or_else(|| "url_validation".to_string()),
            aws_region: lookup("AWS_REGION"),
            visibility_timeout: seconds("QUEUE_VISIBILITY_TIMEOUT_SECS", 30)?,
            url_timeout: seconds("URL_VALIDATION_TIMEOUT_SECS", 15)?,
            tweet_timeout: seconds("TWEET_VALIDATION_TIMEOUT_SECS", 5)?,
            accept_invalid_certs: flag("ACCEPT_INVALID_CERTS", true)?,
            user_agent: lookup("HTTP_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            source_ip: lookup("SOURCE_IP").filter(|ip| !ip.trim().is_empty()),
            ip_lookup_url: lookup("IP_LOOKUP_URL")
                .unwrap_or_else(|| "http://checkip.amazonaws.com".to_string()),
            init_schema: flag("INIT_SCHEMA", false)?,
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected true or false, got {other:?}"),
    }
}
