//! State and helpers shared by every provider adapter

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde_json::Value;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{Cache, CacheExt};
use crate::config::{
    DEFAULT_PROVIDER_MAX_RETRIES, DEFAULT_PROVIDER_RATE_LIMIT, DEFAULT_PROVIDER_TIMEOUT_SECS,
    DEFAULT_TIMEZONE,
};
use crate::errors::{ProviderError, ProviderResult};
use crate::models::{Program, ProviderChannel, ProviderConfig};
use crate::utils::{format_date, parse_date};

use super::adapters::DEFAULT_USER_AGENT;
use super::http_client::ProviderHttpClient;
use super::traits::ProgramsByDate;

/// Lifetime of one cached (provider channel, canonical channel, date) listing
pub const EPG_CACHE_TTL: Duration = Duration::from_secs(20 * 60);

pub struct ProviderBase {
    config: ProviderConfig,
    channels: Vec<ProviderChannel>,
    timezone: Tz,
    http: ProviderHttpClient,
    cache: RwLock<Option<Arc<dyn Cache>>>,
}

impl ProviderBase {
    pub fn new(config: ProviderConfig, channels: Vec<ProviderChannel>) -> ProviderResult<Self> {
        let timezone = match config.settings.get("timezone").and_then(Value::as_str) {
            Some(name) => Tz::from_str(name).map_err(|_| {
                ProviderError::invalid_config(&config.id, format!("unknown timezone '{name}'"))
            })?,
            None => Tz::from_str(DEFAULT_TIMEZONE).unwrap_or(Tz::UTC),
        };
        let timeout = config
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS));
        let http = ProviderHttpClient::new(&config.base_url, timeout)?;

        Ok(Self {
            config,
            channels,
            timezone,
            http,
            cache: RwLock::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn priority(&self) -> i32 {
        self.config.priority
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn channels(&self) -> &[ProviderChannel] {
        &self.channels
    }

    /// The upstream's local zone
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn http(&self) -> &ProviderHttpClient {
        &self.http
    }

    pub fn get_string_setting(&self, key: &str) -> Option<&str> {
        self.config.settings.get(key).and_then(Value::as_str)
    }

    /// `user_agent` setting, else a desktop browser string
    pub fn user_agent(&self) -> &str {
        self.get_string_setting("user_agent")
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Integer setting; numeric strings are accepted too
    pub fn get_int_setting(&self, key: &str) -> Option<i64> {
        match self.config.settings.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.config
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS))
    }

    pub fn max_retries(&self) -> u32 {
        if self.config.max_retries > 0 {
            return self.config.max_retries;
        }
        self.get_int_setting("max_retries")
            .filter(|n| *n > 0)
            .map(|n| n as u32)
            .unwrap_or(DEFAULT_PROVIDER_MAX_RETRIES)
    }

    /// Upper bound on concurrent fetches for one batch
    pub fn rate_limit(&self) -> usize {
        if self.config.rate_limit > 0 {
            return self.config.rate_limit;
        }
        self.get_int_setting("rate_limit")
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_PROVIDER_RATE_LIMIT)
    }

    /// The mapping must name this provider and the catalog must list the channel
    pub fn supports_channel(&self, provider_id: &str, provider_channel_id: &str) -> bool {
        provider_id == self.id() && self.lists_channel(provider_channel_id)
    }

    pub fn lists_channel(&self, provider_channel_id: &str) -> bool {
        self.channels.iter().any(|c| c.id == provider_channel_id)
    }

    pub fn validate(&self) -> ProviderResult<()> {
        if self.config.id.trim().is_empty() {
            return Err(ProviderError::invalid_config("<unnamed>", "provider id is empty"));
        }
        if self.config.name.trim().is_empty() {
            return Err(ProviderError::invalid_config(&self.config.id, "provider name is empty"));
        }
        Ok(())
    }

    pub fn set_cache(&self, cache: Arc<dyn Cache>) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(cache);
    }

    pub fn cache(&self) -> Option<Arc<dyn Cache>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn cache_key(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        date: NaiveDate,
    ) -> String {
        format!(
            "epg:provider_{}:{}_{}_{}",
            self.id(),
            provider_channel_id,
            canonical_id,
            format_date(date)
        )
    }

    /// Cached listing, `None` on a miss, an unreadable entry, or no cache at all
    pub async fn get_from_cache(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        date: NaiveDate,
    ) -> Option<Vec<Program>> {
        let cache = self.cache()?;
        let key = self.cache_key(provider_channel_id, canonical_id, date);
        match cache.get_json::<Vec<Program>>(&key).await {
            Ok(programs) => {
                debug!("Cache hit for {}", key);
                Some(programs)
            }
            Err(e) if e.is_miss() => None,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn put_to_cache(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        date: NaiveDate,
        programs: &[Program],
    ) {
        let Some(cache) = self.cache() else { return };
        let key = self.cache_key(provider_channel_id, canonical_id, date);
        if let Err(e) = cache.set_json(&key, &programs, EPG_CACHE_TTL).await {
            warn!("Failed to cache {}: {}", key, e);
        }
    }

    /// Write each date of a multi-day result under its own key; returns the number written
    pub async fn put_multi_day_to_cache(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        by_date: &ProgramsByDate,
    ) -> usize {
        let mut written = 0;
        for (label, programs) in by_date {
            let Ok(date) = parse_date(label) else {
                warn!("Skipping unparseable date '{}' from provider {}", label, self.id());
                continue;
            };
            self.put_to_cache(provider_channel_id, canonical_id, date, programs).await;
            written += 1;
        }
        written
    }
}
