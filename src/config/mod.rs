//! Service configuration
//!
//! Loaded from a TOML file (`config.toml` unless `CONFIG_FILE` or `--config`
//! says otherwise). Every section has defaults so a missing file is replaced
//! by a generated one on first start.

use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::models::{Channel, ProviderConfig};

pub mod defaults;
pub mod duration_serde;

pub use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Canonical channel catalog seeded into the channel repository at startup
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SeaORM connection URL, or `memory` for the in-process repositories
    #[serde(default = "default_database_url")]
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Connection URL for the redis backend, e.g. `redis://:secret@127.0.0.1:6379/0`
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Entry bound for the memory backend
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// TTL for rendered exports (XMLTV) and per-channel query results
    #[serde(default = "default_render_ttl", with = "duration_serde::duration")]
    pub render_ttl: Duration,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Zone used for cron evaluation and for "today"
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_initial_sync_cron")]
    pub initial_sync_cron: String,
    #[serde(default = "default_refresh_sync_cron")]
    pub refresh_sync_cron: String,
    #[serde(default = "default_cleanup_cron")]
    pub cleanup_cron: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_area")]
    pub area: String,
    pub logo_url: Option<String>,
    /// Pattern matched against free-text channel names (DIYP lookups)
    pub regexp: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl ChannelConfig {
    pub fn to_channel(&self) -> Channel {
        let mut channel = Channel::new(&self.channel_id, &self.display_name);
        channel.category = self.category.clone();
        channel.area = self.area.clone();
        channel.logo_url = self.logo_url.clone();
        channel.regexp = self.regexp.clone();
        channel.timezone = self.timezone.clone();
        channel
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_render_ttl() -> Duration {
    humantime::parse_duration(DEFAULT_RENDER_TTL).unwrap_or(Duration::from_secs(86_400))
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_initial_sync_cron() -> String {
    DEFAULT_INITIAL_SYNC_CRON.to_string()
}

fn default_refresh_sync_cron() -> String {
    DEFAULT_REFRESH_SYNC_CRON.to_string()
}

fn default_cleanup_cron() -> String {
    DEFAULT_CLEANUP_CRON.to_string()
}

fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_area() -> String {
    "CN".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            capacity: default_cache_capacity(),
            render_ttl: default_render_ttl(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: default_timezone(),
            initial_sync_cron: default_initial_sync_cron(),
            refresh_sync_cron: default_refresh_sync_cron(),
            cleanup_cron: default_cleanup_cron(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn tz(&self) -> Result<Tz, String> {
        Tz::from_str(&self.timezone)
            .map_err(|e| format!("invalid timezone '{}': {e}", self.timezone))
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.cache.capacity == 0 {
            return Err("cache.capacity must be greater than zero".to_string());
        }
        if self.cache.backend == CacheBackend::Redis
            && self.cache.redis_url.as_deref().is_none_or(|u| u.trim().is_empty())
        {
            return Err("cache.redis_url is required when cache.backend = \"redis\"".to_string());
        }
        if self.scheduler.retention_days < 1 {
            return Err("scheduler.retention_days must be at least 1".to_string());
        }
        self.scheduler.tz()?;
        for (field, expr) in [
            ("initial_sync_cron", &self.scheduler.initial_sync_cron),
            ("refresh_sync_cron", &self.scheduler.refresh_sync_cron),
            ("cleanup_cron", &self.scheduler.cleanup_cron),
        ] {
            crate::utils::cron_helper::validate_cron_expression(expr)
                .map_err(|e| format!("scheduler.{field}: {e}"))?;
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() || provider.name.trim().is_empty() {
                return Err("provider id and name must not be empty".to_string());
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(format!("duplicate provider id '{}'", provider.id));
            }
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.channel_id.as_str()) {
                return Err(format!("duplicate channel id '{}'", channel.channel_id));
            }
            if Tz::from_str(&channel.timezone).is_err() {
                return Err(format!(
                    "channel '{}' has invalid timezone '{}'",
                    channel.channel_id, channel.timezone
                ));
            }
        }
        Ok(())
    }

    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let config = if std::path::Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)
                .with_context(|| format!("reading {config_file}"))?;
            Self::from_toml(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };
        config.validate().map_err(|e| anyhow!("invalid configuration: {e}"))?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
