//! Shared fixtures for the integration suites: a scripted provider and an
//! in-memory service harness built around it.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use epg_sync::cache::{Cache, MemoryCache};
use epg_sync::config::{ChannelConfig, Config};
use epg_sync::errors::{ProviderError, ProviderResult};
use epg_sync::models::{Channel, ChannelMapping, Program, ProviderChannel, ProviderConfig};
use epg_sync::providers::batch::fetch_day_from_window;
use epg_sync::providers::{
    FetchMode, ProgramsByDate, Provider, ProviderBase, ProviderChain, ProviderRegistry,
};
use epg_sync::repositories::{
    ChannelMappingRepository, ChannelRepository, InMemoryChannelMappingRepository,
    InMemoryChannelRepository, InMemoryProgramRepository, ProgramRepository,
};
use epg_sync::services::{ChannelMappingService, EpgService, SyncRunner};
use epg_sync::utils::{date_range, format_date};

pub const TZ: Tz = chrono_tz::Asia::Shanghai;

/// Registry type name of [`ScriptedProvider`]
pub const SCRIPTED_TYPE: &str = "scripted";

pub fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

/// One-hour program starting at `hour` local time
pub fn program(
    channel_id: &str,
    title: &str,
    date: NaiveDate,
    hour: u32,
    provider_id: &str,
) -> Program {
    let start = TZ
        .from_local_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
        .unwrap();
    Program::new(channel_id, title, start, start + ChronoDuration::hours(1), provider_id)
}

/// What the fake upstream answers for one provider channel
#[derive(Debug, Clone)]
pub enum Script {
    /// Consecutive one-hour programs from 08:00 local
    Titles(Vec<&'static str>),
    Fail(&'static str),
}

pub struct ScriptedProvider {
    base: ProviderBase,
    mode: FetchMode,
    scripts: HashMap<String, Script>,
    catalog_only: bool,
    delay: Duration,
    single_calls: AtomicUsize,
    window_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(id: &str, priority: i32, channels: &[(&str, &str)]) -> Self {
        let config = ProviderConfig::new(id, id.to_uppercase(), "http://localhost")
            .with_priority(priority);
        Self::with_config(config, channels).unwrap()
    }

    pub fn with_config(config: ProviderConfig, channels: &[(&str, &str)]) -> ProviderResult<Self> {
        let catalog = channels
            .iter()
            .map(|(id, name)| ProviderChannel::new(*id, *name))
            .collect();
        Ok(Self {
            base: ProviderBase::new(config, catalog)?,
            mode: FetchMode::SingleDay,
            scripts: HashMap::new(),
            catalog_only: false,
            delay: Duration::ZERO,
            single_calls: AtomicUsize::new(0),
            window_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn multi_day(mut self) -> Self {
        self.mode = FetchMode::MultiDay;
        self
    }

    /// Claim any mapping whose channel is in the catalog, whichever provider it names
    pub fn catalog_only(mut self) -> Self {
        self.catalog_only = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script(mut self, provider_channel_id: &str, script: Script) -> Self {
        self.scripts.insert(provider_channel_id.to_string(), script);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Upstream requests of either kind
    pub fn calls(&self) -> usize {
        self.single_calls() + self.window_calls()
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn window_calls(&self) -> usize {
        self.window_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn upstream(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn listing(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        date: NaiveDate,
    ) -> ProviderResult<Vec<Program>> {
        match self.scripts.get(provider_channel_id) {
            Some(Script::Titles(titles)) => Ok(titles
                .iter()
                .enumerate()
                .map(|(i, title)| program(canonical_id, title, date, 8 + i as u32, self.id()))
                .collect()),
            Some(Script::Fail(message)) => Err(ProviderError::FetchFailed {
                provider_id: self.id().to_string(),
                message: message.to_string(),
            }),
            None => Err(ProviderError::UnsupportedChannel {
                provider_id: self.id().to_string(),
                provider_channel_id: provider_channel_id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    fn fetch_mode(&self) -> FetchMode {
        self.mode
    }

    fn supports_channel(&self, provider_id: &str, provider_channel_id: &str) -> bool {
        if self.catalog_only {
            return self.base.lists_channel(provider_channel_id);
        }
        self.base.supports_channel(provider_id, provider_channel_id)
    }

    async fn fetch_epg(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        date: NaiveDate,
    ) -> ProviderResult<Vec<Program>> {
        if self.mode == FetchMode::MultiDay {
            return fetch_day_from_window(self, provider_channel_id, canonical_id, date).await;
        }
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.upstream().await;
        self.listing(provider_channel_id, canonical_id, date)
    }

    async fn fetch_epg_multi_day(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ProviderResult<ProgramsByDate> {
        self.window_calls.fetch_add(1, Ordering::SeqCst);
        self.upstream().await;
        let mut by_date = ProgramsByDate::new();
        for date in date_range(start, end) {
            by_date.insert(
                format_date(date),
                self.listing(provider_channel_id, canonical_id, date)?,
            );
        }
        Ok(by_date)
    }
}

pub fn memory_cache() -> Arc<dyn Cache> {
    Arc::new(MemoryCache::new(1_000).unwrap())
}

pub fn chain_of(providers: &[Arc<ScriptedProvider>], cache: Arc<dyn Cache>) -> ProviderChain {
    let providers: Vec<Arc<dyn Provider>> = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn Provider>)
        .collect();
    ProviderChain::new(providers, cache)
}

/// Services over in-memory repositories and a scripted chain
pub struct Harness {
    pub cache: Arc<dyn Cache>,
    pub chain: Arc<ProviderChain>,
    pub channel_repo: Arc<dyn ChannelRepository>,
    pub program_repo: Arc<dyn ProgramRepository>,
    pub mapping_repo: Arc<dyn ChannelMappingRepository>,
    pub epg: Arc<EpgService>,
    pub mappings: Arc<ChannelMappingService>,
}

impl Harness {
    pub async fn new(providers: &[Arc<ScriptedProvider>], channels: &[(&str, &str)]) -> Self {
        let cache = memory_cache();
        let chain = Arc::new(chain_of(providers, Arc::clone(&cache)));
        let channel_repo: Arc<dyn ChannelRepository> = Arc::new(InMemoryChannelRepository::new());
        let program_repo: Arc<dyn ProgramRepository> = Arc::new(InMemoryProgramRepository::new());
        let mapping_repo: Arc<dyn ChannelMappingRepository> =
            Arc::new(InMemoryChannelMappingRepository::new());

        for (id, name) in channels {
            channel_repo.upsert(Channel::new(*id, *name)).await.unwrap();
        }

        let epg = Arc::new(EpgService::new(
            Arc::clone(&program_repo),
            Arc::clone(&channel_repo),
            Arc::clone(&mapping_repo),
            Arc::clone(&cache),
            Arc::clone(&chain),
            TZ,
            Duration::from_secs(3600),
        ));
        let mappings = Arc::new(ChannelMappingService::new(
            Arc::clone(&channel_repo),
            Arc::clone(&mapping_repo),
        ));

        Self {
            cache,
            chain,
            channel_repo,
            program_repo,
            mapping_repo,
            epg,
            mappings,
        }
    }

    /// Store a verified mapping without going through auto-mapping
    pub async fn map(&self, canonical_id: &str, provider_id: &str, provider_channel_id: &str) {
        let provider_channel = ProviderChannel::new(provider_channel_id, provider_channel_id);
        let mapping = ChannelMapping::new(canonical_id, provider_id, &provider_channel, 1.0);
        self.mapping_repo.create(mapping).await.unwrap();
    }

    pub fn runner(&self, retention_days: i64) -> SyncRunner {
        SyncRunner::new(Arc::clone(&self.epg), Arc::clone(&self.mappings), retention_days)
    }
}

/// Config for the in-memory backend with the scheduler switched off
pub fn memory_config(channels: &[(&str, &str)], providers: Vec<ProviderConfig>) -> Config {
    let mut config = Config::default();
    config.database.url = epg_sync::app::MEMORY_DATABASE_URL.to_string();
    config.scheduler.enabled = false;
    config.scheduler.timezone = TZ.name().to_string();
    config.providers = providers;
    config.channels = channels
        .iter()
        .map(|(id, name)| ChannelConfig {
            channel_id: id.to_string(),
            display_name: name.to_string(),
            category: String::new(),
            area: String::new(),
            logo_url: None,
            regexp: None,
            timezone: TZ.name().to_string(),
        })
        .collect();
    config
}

pub fn scripted_config(id: &str, priority: i32) -> ProviderConfig {
    ProviderConfig::new(id, id.to_uppercase(), "http://localhost")
        .with_priority(priority)
        .with_type(SCRIPTED_TYPE)
}

/// Registry whose `scripted` type serves every catalog channel with `titles`
pub fn scripted_registry(
    catalog: &'static [(&'static str, &'static str)],
    titles: Vec<&'static str>,
) -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    registry
        .register(SCRIPTED_TYPE, move |config| {
            let mut provider = ScriptedProvider::with_config(config, catalog)?;
            for (id, _) in catalog {
                provider = provider.script(id, Script::Titles(titles.clone()));
            }
            Ok(Arc::new(provider) as Arc<dyn Provider>)
        })
        .unwrap();
    registry
}
