//! Builds provider instances from configuration and assembles the chain

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{error, info};

use crate::cache::Cache;
use crate::errors::ProviderResult;
use crate::models::ProviderConfig;

use super::chain::ProviderChain;
use super::registry::ProviderRegistry;
use super::traits::Provider;

/// One instance per configured provider id, built lazily and reused
pub struct ProviderFactory {
    registry: Arc<ProviderRegistry>,
    instances: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderFactory {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            instances: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn create_provider(&self, config: &ProviderConfig) -> ProviderResult<Arc<dyn Provider>> {
        if let Some(existing) = self
            .instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&config.id)
        {
            return Ok(Arc::clone(existing));
        }

        let mut instances = self.instances.write().unwrap_or_else(|e| e.into_inner());
        // another caller may have built it between the two locks
        if let Some(existing) = instances.get(&config.id) {
            return Ok(Arc::clone(existing));
        }
        let provider = self.registry.create(config.clone())?;
        provider.validate()?;
        instances.insert(config.id.clone(), Arc::clone(&provider));
        Ok(provider)
    }

    /// Enabled providers in config order; failures are logged and skipped
    pub fn create_providers(&self, configs: &[ProviderConfig]) -> Vec<Arc<dyn Provider>> {
        configs
            .iter()
            .filter(|config| config.enabled)
            .filter_map(|config| match self.create_provider(config) {
                Ok(provider) => Some(provider),
                Err(e) => {
                    error!("Skipping provider '{}': {}", config.id, e);
                    None
                }
            })
            .collect()
    }

    pub fn create_chain(&self, configs: &[ProviderConfig], cache: Arc<dyn Cache>) -> ProviderChain {
        let providers = self.create_providers(configs);
        info!(
            "Built {} of {} configured providers",
            providers.len(),
            configs.len()
        );
        ProviderChain::new(providers, cache)
    }
}
