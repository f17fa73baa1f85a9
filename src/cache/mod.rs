//! Key/value cache with per-entry TTL
//!
//! [`Cache`] is object safe and byte oriented so one `Arc<dyn Cache>` can be
//! shared by every provider and service. Typed access goes through
//! [`CacheExt`], which stores values as JSON. The backend is chosen by
//! `cache.backend`: the in-process LRU or a shared Redis server.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{CacheBackend, CacheConfig};
use crate::errors::{CacheError, CacheResult};

pub mod memory;
pub mod redis_cache;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

#[async_trait]
pub trait Cache: Send + Sync {
    /// Raw payload for `key`; a missing or expired entry is [`CacheError::Miss`]
    async fn get_raw(&self, key: &str) -> CacheResult<Vec<u8>>;

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, keys: &[String]) -> CacheResult<()>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    async fn ping(&self) -> CacheResult<()>;

    async fn close(&self) -> CacheResult<()>;
}

/// JSON (de)serialization on top of any [`Cache`]
#[async_trait]
pub trait CacheExt {
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> CacheResult<T>;

    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration)
    -> CacheResult<()>;
}

#[async_trait]
impl<C: Cache + ?Sized> CacheExt for C {
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> CacheResult<T> {
        let raw = self.get_raw(key).await?;
        serde_json::from_slice(&raw).map_err(|e| CacheError::InvalidPayload {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let raw = serde_json::to_vec(value).map_err(|e| CacheError::WriteFailed {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set_raw(key, raw, ttl).await
    }
}

/// Build the configured backend and make sure it answers
pub async fn create_cache(config: &CacheConfig) -> CacheResult<Arc<dyn Cache>> {
    let cache: Arc<dyn Cache> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::new(config.capacity)?),
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| CacheError::Unavailable {
                    message: "cache.redis_url is required for the redis backend".to_string(),
                })?;
            Arc::new(RedisCache::connect(url).await?)
        }
    };
    cache.ping().await?;
    info!("Cache backend ready: {:?}", config.backend);
    Ok(cache)
}
