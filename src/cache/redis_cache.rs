//! Shared cache backed by a Redis server
//!
//! Payloads are stored as-is under the caller's key. Expiry is delegated to
//! Redis (`SET ... EX`), so sub-second TTLs round up to one second.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, error};

use super::Cache;
use crate::errors::{CacheError, CacheResult};

pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Open a managed connection to `url` (`redis://[:password@]host:port/db`)
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let connection = ConnectionManager::new(client).await.map_err(unavailable)?;
        debug!("Connected to Redis cache");
        Ok(Self { connection })
    }
}

fn unavailable(e: redis::RedisError) -> CacheError {
    CacheError::Unavailable {
        message: e.to_string(),
    }
}

/// Whole seconds for `SET EX`; zero means no expiry
fn expiry_seconds(ttl: Duration) -> u64 {
    if ttl.is_zero() {
        return 0;
    }
    ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> CacheResult<Vec<u8>> {
        let mut conn = self.connection.clone();
        let payload: Option<Vec<u8>> = conn.get(key).await.map_err(|e| {
            error!("Failed to get cache key {}: {}", key, e);
            unavailable(e)
        })?;
        payload.ok_or_else(|| CacheError::miss(key))
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<()> = match expiry_seconds(ttl) {
            0 => conn.set(key, value).await,
            seconds => conn.set_ex(key, value, seconds).await,
        };
        result.map_err(|e| {
            error!("Failed to set cache key {}: {}", key, e);
            CacheError::WriteFailed {
                key: key.to_string(),
                message: e.to_string(),
            }
        })
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let _: () = conn.del(keys).await.map_err(|e| {
            error!("Failed to delete cache keys {:?}: {}", keys, e);
            unavailable(e)
        })?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        conn.exists(key).await.map_err(unavailable)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    /// The managed connection closes when the last clone is dropped
    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }
}
