//! Remote tier shared across instances.
//!
//! Values cross this boundary as JSON text. The Redis client is created on
//! first use and reused for the life of the process.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::info;

use super::error::CacheError;

/// Key/value store with per-key expiry reachable over the network.
#[async_trait]
pub trait RemoteTier: Send + Sync {
    /// False when the tier has no endpoint; callers skip it entirely.
    fn is_configured(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

pub fn encode<T: Serialize>(value: &T) -> Result<String, CacheError> {
    serde_json::to_string(value).map_err(|err| CacheError::codec(err.to_string()))
}

pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CacheError> {
    serde_json::from_str(raw).map_err(|err| CacheError::codec(err.to_string()))
}

/// Redis-backed remote tier.
pub struct RedisTier {
    url: Option<String>,
    connection: OnceCell<ConnectionManager>,
}

impl RedisTier {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: url.filter(|value| !value.trim().is_empty()),
            connection: OnceCell::new(),
        }
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| CacheError::configuration("no redis url set"))?;

        let manager = self
            .connection
            .get_or_try_init(|| async {
                let client = redis::Client::open(url)
                    .map_err(|err| CacheError::configuration(err.to_string()))?;
                let manager = ConnectionManager::new(client)
                    .await
                    .map_err(|err| CacheError::remote(err.to_string()))?;
                info!(target = "folio::cache::remote", "Connected to remote cache");
                Ok::<_, CacheError>(manager)
            })
            .await?;

        Ok(manager.clone())
    }
}

#[async_trait]
impl RemoteTier for RedisTier {
    fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|err| CacheError::remote(err.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|err| CacheError::remote(err.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|err| CacheError::remote(err.to_string()))
    }
}
