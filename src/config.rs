//! Configuration management

use std::time::Duration;

use anyhow::{self, Context, Result};

use crate::services::mailing::MailingConfig;
use crate::services::rate_limiter::RateLimitConfig;

/// Resend's upper bound for one batch request
pub const MAX_PROVIDER_BATCH: usize = 100;

const DEFAULT_FROM: &str = "Mail Assist <noreply@mailassist.app>";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string (required by `serve` and `migrate`)
    pub database_url: Option<String>,

    /// Resend API key; without it mail is only logged
    pub resend_api_key: Option<String>,

    /// `From` header of outgoing mail
    pub from_address: String,

    /// Messages per provider batch call
    pub max_batch_size: usize,

    /// Send requests allowed per owner per window
    pub send_rate_limit_max: usize,

    pub send_rate_limit_window_secs: u64,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", name, e)),
        _ => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());

        let resend_api_key = std::env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty());

        let from_address = std::env::var("EMAIL_FROM_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_FROM.to_string());

        let max_batch_size = parse_var("MAX_BATCH_SIZE", MAX_PROVIDER_BATCH)?;
        if max_batch_size == 0 || max_batch_size > MAX_PROVIDER_BATCH {
            anyhow::bail!(
                "MAX_BATCH_SIZE must be between 1 and {} (current: {})",
                MAX_PROVIDER_BATCH,
                max_batch_size
            );
        }

        let send_rate_limit_max = parse_var("SEND_RATE_LIMIT_MAX", 10usize)?;
        let send_rate_limit_window_secs = parse_var("SEND_RATE_LIMIT_WINDOW_SECS", 3600u64)?;

        Ok(Self {
            nats_url,
            database_url,
            resend_api_key,
            from_address,
            max_batch_size,
            send_rate_limit_max,
            send_rate_limit_window_secs,
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set")
    }

    pub fn mailing_config(&self) -> MailingConfig {
        MailingConfig {
            from: self.from_address.clone(),
            max_batch_size: self.max_batch_size,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.send_rate_limit_max,
            window: Duration::from_secs(self.send_rate_limit_window_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            nats_url: "nats://localhost:4222".to_string(),
            database_url: None,
            resend_api_key: None,
            from_address: DEFAULT_FROM.to_string(),
            max_batch_size: 50,
            send_rate_limit_max: 3,
            send_rate_limit_window_secs: 120,
        }
    }

    #[test]
    fn test_missing_database_url_is_an_error() {
        let err = config().require_database_url().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_derived_configs() {
        let config = config();
        assert_eq!(config.mailing_config().max_batch_size, 50);
        assert_eq!(config.rate_limit_config().window, Duration::from_secs(120));
        assert_eq!(config.rate_limit_config().max_requests, 3);
    }

    #[test]
    fn test_parse_var_uses_default_when_unset() {
        std::env::remove_var("MAIL_ASSIST_TEST_UNSET_VAR");
        assert_eq!(parse_var("MAIL_ASSIST_TEST_UNSET_VAR", 7usize).unwrap(), 7);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        std::env::set_var("MAIL_ASSIST_TEST_BAD_VAR", "lots");
        let err = parse_var("MAIL_ASSIST_TEST_BAD_VAR", 7usize).unwrap_err();
        assert!(err.to_string().contains("MAIL_ASSIST_TEST_BAD_VAR"));
        std::env::remove_var("MAIL_ASSIST_TEST_BAD_VAR");
    }
}
