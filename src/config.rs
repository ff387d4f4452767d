//! Runtime configuration, read from the environment (and `.env` when present).

use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_PREFIX: &str = "https://webexapis.com";
pub const DEFAULT_NAME_SOURCE_URL: &str = "https://swapi.dev/api/people/";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the webhook registry, e.g. `https://hooks.example.com/`
    pub webhook_server_url: String,
    /// Account added to every room that gets a webhook, so it can post there
    pub bot_email: String,
    /// Token pre-filled into new sessions
    pub access_token: Option<String>,
    pub api_prefix: String,
    pub name_source_url: String,
    pub request_timeout: Duration,
    /// Draw budget of the suffix allocator
    pub max_attempts: usize,
    pub bind_address: String,
    pub session_idle: time::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        fn parsed<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            match value {
                Some(value) => value
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} is not valid: {value:?}")),
                None => Ok(default),
            }
        }

        let webhook_server_url = var("WEBHOOK_SERVER_URL").context("WEBHOOK_SERVER_URL must be set")?;
        let bot_email = var("BOT_EMAIL").context("BOT_EMAIL must be set")?;

        let max_attempts = parsed(var("ALLOCATOR_MAX_ATTEMPTS"), "ALLOCATOR_MAX_ATTEMPTS", 16usize)?;
        if max_attempts == 0 {
            anyhow::bail!("ALLOCATOR_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            webhook_server_url,
            bot_email,
            access_token: var("WEBEX_ACCESS_TOKEN").filter(|token| !token.trim().is_empty()),
            api_prefix: var("WEBEX_API_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.to_owned()),
            name_source_url: var("NAME_SOURCE_URL").unwrap_or_else(|| DEFAULT_NAME_SOURCE_URL.to_owned()),
            request_timeout: Duration::from_secs(parsed(var("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 10u64)?),
            max_attempts,
            bind_address: var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_owned()),
            session_idle: time::Duration::minutes(parsed(var("SESSION_IDLE_MINUTES"), "SESSION_IDLE_MINUTES", 30i64)?),
        })
    }

    /// `{base}/{path}` with exactly one slash between them.
    pub fn registry_url(&self, path: &str) -> String {
        join(&self.webhook_server_url, path)
    }

    pub fn payload_url(&self, hook: &str) -> String {
        self.registry_url(&format!("process/{hook}"))
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
