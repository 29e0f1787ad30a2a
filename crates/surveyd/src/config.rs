//! Configuration management for Surveyd.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use survey_common::constants::{DEFAULT_LISTEN_ADDR, DEFAULT_REDIS_URL, DEFAULT_SITEVERIFY_URL};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Turnstile configuration
    #[serde(default)]
    pub turnstile: TurnstileConfig,
}

/// Turnstile-specific configuration
#[derive(Clone, Deserialize)]
pub struct TurnstileConfig {
    /// Server-side secret key
    #[serde(default)]
    pub secret: String,

    /// Verification endpoint URL
    #[serde(default = "default_siteverify_url")]
    pub siteverify_url: String,
}

// The secret must never reach logs, so Debug redacts it.
impl fmt::Debug for TurnstileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnstileConfig")
            .field("secret", &"<redacted>")
            .field("siteverify_url", &self.siteverify_url)
            .finish()
    }
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            siteverify_url: default_siteverify_url(),
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_siteverify_url() -> String { DEFAULT_SITEVERIFY_URL.to_string() }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref secret) = args.turnstile_secret {
            config.turnstile.secret = secret.clone();
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            turnstile: TurnstileConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.turnstile.siteverify_url, DEFAULT_SITEVERIFY_URL);
        assert!(config.turnstile.secret.is_empty());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let turnstile = TurnstileConfig {
            secret: "0x4AAAAAAA_secret".into(),
            ..Default::default()
        };
        let rendered = format!("{turnstile:?}");
        assert!(!rendered.contains("0x4AAAAAAA_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
