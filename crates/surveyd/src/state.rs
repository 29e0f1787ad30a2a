//! Application state and shared resources.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{RedisStore, SurveyStore};
use crate::turnstile::{TokenVerifier, TurnstileVerifier};

/// Shared application state
///
/// The verifier and store sit behind capability traits so handlers
/// never touch a concrete client.
#[derive(Clone)]
pub struct AppState {
    /// Turnstile token verifier
    pub verifier: Arc<dyn TokenVerifier>,

    /// Survey answer store
    pub store: Arc<dyn SurveyStore>,
}

impl AppState {
    /// Create new application state, connecting to Redis
    pub async fn new(config: &AppConfig) -> Result<Self> {
        // Connect to Redis with connection manager (handles reconnection)
        let client = redis::Client::open(config.redis_url.as_str())
            .context("Failed to create Redis client")?;

        let redis = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            verifier: Arc::new(TurnstileVerifier::new(config.turnstile.clone())),
            store: Arc::new(RedisStore::new(redis)),
        })
    }
}
