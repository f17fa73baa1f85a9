//! Domain models shared by providers, repositories and services

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

pub mod export;

pub use export::*;

/// One configured upstream source. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique id, also the memoization key in the factory
    pub id: String,
    /// Registry type name; falls back to `id` when absent
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
    pub name: String,
    pub base_url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lower is tried first
    #[serde(default)]
    pub priority: i32,
    #[serde(
        default,
        with = "crate::config::duration_serde::option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
    /// Max concurrent in-flight fetches; 0 defers to `settings.rate_limit`
    #[serde(default)]
    pub rate_limit: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl ProviderConfig {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider_type: None,
            name: name.into(),
            base_url: base_url.into(),
            enabled: true,
            priority: 0,
            timeout: None,
            rate_limit: 0,
            max_retries: 0,
            settings: HashMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = Some(provider_type.into());
        self
    }

    pub fn type_name(&self) -> &str {
        self.provider_type.as_deref().unwrap_or(&self.id)
    }
}

/// Catalog entry published by a provider adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderChannel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ProviderChannel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }
}

/// Canonical channel, independent of any provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub channel_id: String,
    pub display_name: String,
    pub category: String,
    pub area: String,
    pub logo_url: Option<String>,
    /// Matched against free-text names in DIYP lookups
    pub regexp: Option<String>,
    pub timezone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    pub fn new(channel_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            channel_id: channel_id.into(),
            display_name: display_name.into(),
            category: String::new(),
            area: "CN".to_string(),
            logo_url: None,
            regexp: None,
            timezone: crate::config::DEFAULT_TIMEZONE.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The channel's zone, UTC when the stored name is unknown
    pub fn tz(&self) -> Tz {
        Tz::from_str(&self.timezone).unwrap_or(Tz::UTC)
    }
}

/// Persisted link from a provider channel to a canonical channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMapping {
    pub id: i64,
    pub canonical_id: String,
    pub provider_id: String,
    pub provider_channel_id: String,
    pub provider_channel_name: String,
    /// Additive heuristic score, not normalized; 0.8 is the acceptance line
    pub confidence: f64,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChannelMapping {
    pub fn new(
        canonical_id: impl Into<String>,
        provider_id: impl Into<String>,
        provider_channel: &ProviderChannel,
        confidence: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            canonical_id: canonical_id.into(),
            provider_id: provider_id.into(),
            provider_channel_id: provider_channel.id.clone(),
            provider_channel_name: provider_channel.name.clone(),
            confidence,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn info(&self) -> ChannelMappingInfo {
        ChannelMappingInfo {
            provider_channel_id: self.provider_channel_id.clone(),
            canonical_id: self.canonical_id.clone(),
            confidence: self.confidence,
            provider_id: self.provider_id.clone(),
        }
    }
}

/// Unit of work handed to fetch operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMappingInfo {
    pub provider_channel_id: String,
    pub canonical_id: String,
    pub confidence: f64,
    pub provider_id: String,
}

impl ChannelMappingInfo {
    pub fn new(
        provider_id: impl Into<String>,
        provider_channel_id: impl Into<String>,
        canonical_id: impl Into<String>,
    ) -> Self {
        Self {
            provider_channel_id: provider_channel_id.into(),
            canonical_id: canonical_id.into(),
            confidence: 1.0,
            provider_id: provider_id.into(),
        }
    }
}

/// One broadcast slot, stored in UTC with the provider's zone alongside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub id: i64,
    pub channel_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub category: String,
    pub provider_id: String,
    #[serde(default)]
    pub provider_program_id: String,
    pub original_timezone: String,
    pub created_at: DateTime<Utc>,
}

impl Program {
    /// Build from zone-local endpoints; the zone name is kept for rendering
    pub fn new(
        channel_id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            channel_id: channel_id.into(),
            title: title.into(),
            description: String::new(),
            start_time: start.with_timezone(&Utc),
            end_time: end.with_timezone(&Utc),
            category: String::new(),
            provider_id: provider_id.into(),
            provider_program_id: String::new(),
            original_timezone: start.timezone().name().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn original_tz(&self) -> Tz {
        Tz::from_str(&self.original_timezone).unwrap_or(Tz::UTC)
    }

    pub fn is_airing_at(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at < self.end_time
    }
}

/// Result of a provider health check. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider_id: String,
    pub healthy: bool,
    pub message: String,
    pub latency_ms: u64,
    pub checked_at: DateTime<Utc>,
}

impl ProviderHealth {
    pub fn healthy(provider_id: impl Into<String>, latency: Duration) -> Self {
        Self {
            provider_id: provider_id.into(),
            healthy: true,
            message: "OK".to_string(),
            latency_ms: latency.as_millis() as u64,
            checked_at: Utc::now(),
        }
    }

    pub fn unhealthy(
        provider_id: impl Into<String>,
        message: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            healthy: false,
            message: message.into(),
            latency_ms: latency.as_millis() as u64,
            checked_at: Utc::now(),
        }
    }
}
