//! Composition root
//!
//! Wires configuration into the registry, factory, chain, repositories and
//! services. Adapters are registered here explicitly rather than at load time.

use anyhow::{Result, anyhow};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{Cache, create_cache};
use crate::config::Config;
use crate::database::Database;
use crate::errors::AppResult;
use crate::providers::{ProviderChain, ProviderFactory, ProviderRegistry, adapters};
use crate::repositories::{
    ChannelMappingRepository, ChannelRepository, InMemoryChannelMappingRepository,
    InMemoryChannelRepository, InMemoryProgramRepository, ProgramRepository,
};
use crate::services::{
    ChannelMappingService, ChannelService, EpgService, SchedulerService, SyncRunner,
};
use crate::web::AppState;

/// `database.url` value selecting the in-process repositories
pub const MEMORY_DATABASE_URL: &str = "memory";

pub struct Application {
    pub config: Config,
    pub cache: Arc<dyn Cache>,
    pub chain: Arc<ProviderChain>,
    pub channel_repo: Arc<dyn ChannelRepository>,
    pub program_repo: Arc<dyn ProgramRepository>,
    pub mapping_repo: Arc<dyn ChannelMappingRepository>,
    pub epg_service: Arc<EpgService>,
    pub mapping_service: Arc<ChannelMappingService>,
    pub channel_service: Arc<ChannelService>,
    pub runner: SyncRunner,
    pub scheduler: Option<Arc<SchedulerService>>,
}

impl Application {
    /// Build with the built-in adapters registered
    pub async fn build(config: Config) -> Result<Self> {
        let registry = ProviderRegistry::new();
        adapters::register_builtin(&registry)?;
        Self::build_with_registry(config, registry).await
    }

    pub async fn build_with_registry(config: Config, registry: ProviderRegistry) -> Result<Self> {
        let timezone = config.scheduler.tz().map_err(|e| anyhow!(e))?;
        let cache = create_cache(&config.cache).await?;

        let (channel_repo, program_repo, mapping_repo) = Self::repositories(&config).await?;

        for channel in &config.channels {
            channel_repo.upsert(channel.to_channel()).await?;
        }
        info!("Seeded {} canonical channels", config.channels.len());

        debug!("Registered provider types: {:?}", registry.registered_types());
        let factory = ProviderFactory::new(Arc::new(registry));
        let chain = Arc::new(factory.create_chain(&config.providers, Arc::clone(&cache)));
        if chain.is_empty() {
            warn!("No enabled providers configured; syncs will find nothing");
        }
        info!("Provider chain ready with {} providers", chain.len());

        let epg_service = Arc::new(EpgService::new(
            Arc::clone(&program_repo),
            Arc::clone(&channel_repo),
            Arc::clone(&mapping_repo),
            Arc::clone(&cache),
            Arc::clone(&chain),
            timezone,
            config.cache.render_ttl,
        ));
        let mapping_service = Arc::new(ChannelMappingService::new(
            Arc::clone(&channel_repo),
            Arc::clone(&mapping_repo),
        ));

        let channel_service = Arc::new(ChannelService::new(
            Arc::clone(&channel_repo),
            Arc::clone(&mapping_repo),
        ));

        mapping_service.auto_map_chain(&chain).await;

        let runner = SyncRunner::new(
            Arc::clone(&epg_service),
            Arc::clone(&mapping_service),
            config.scheduler.retention_days,
        );
        let scheduler = config.scheduler.enabled.then(|| {
            Arc::new(SchedulerService::new(
                runner.clone(),
                config.scheduler.clone(),
                timezone,
            ))
        });

        Ok(Self {
            config,
            cache,
            chain,
            channel_repo,
            program_repo,
            mapping_repo,
            epg_service,
            mapping_service,
            channel_service,
            runner,
            scheduler,
        })
    }

    async fn repositories(
        config: &Config,
    ) -> Result<(
        Arc<dyn ChannelRepository>,
        Arc<dyn ProgramRepository>,
        Arc<dyn ChannelMappingRepository>,
    )> {
        if config.database.url == MEMORY_DATABASE_URL {
            info!("Using in-memory repositories");
            return Ok((
                Arc::new(InMemoryChannelRepository::new()),
                Arc::new(InMemoryProgramRepository::new()),
                Arc::new(InMemoryChannelMappingRepository::new()),
            ));
        }

        let database = Database::connect(&config.database).await?;
        Ok((
            Arc::new(database.channel_repository()),
            Arc::new(database.program_repository()),
            Arc::new(database.channel_mapping_repository()),
        ))
    }

    pub async fn start_scheduler(&self) -> AppResult<()> {
        match &self.scheduler {
            Some(scheduler) => scheduler.start().await,
            None => {
                info!("Scheduler disabled");
                Ok(())
            }
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            epg_service: Arc::clone(&self.epg_service),
            mapping_service: Arc::clone(&self.mapping_service),
            channel_service: Arc::clone(&self.channel_service),
            chain: Arc::clone(&self.chain),
            runner: self.runner.clone(),
            scheduler: self.scheduler.clone(),
        }
    }

    pub async fn shutdown(&self) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop().await;
        }
        if let Err(e) = self.cache.close().await {
            warn!("Failed to close cache: {}", e);
        }
    }
}
