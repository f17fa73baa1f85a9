//! Priority-ordered provider chain
//!
//! The provider list is sorted once at construction (stable, so equal
//! priorities keep their input order) and is read-only afterwards; rebuild
//! the chain to change the order.

use chrono::NaiveDate;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::Cache;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::{ChannelMappingInfo, Program, ProviderHealth};
use crate::utils::format_date;

use super::traits::Provider;

pub struct ProviderChain {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderChain {
    /// Keep enabled providers, inject `cache` and sort ascending by priority
    pub fn new(providers: Vec<Arc<dyn Provider>>, cache: Arc<dyn Cache>) -> Self {
        let mut providers: Vec<Arc<dyn Provider>> =
            providers.into_iter().filter(|p| p.is_enabled()).collect();
        for provider in &providers {
            provider.set_cache(Arc::clone(&cache));
        }
        providers.sort_by_key(|p| p.priority());
        debug!(
            "Provider chain order: {:?}",
            providers.iter().map(|p| p.id()).collect::<Vec<_>>()
        );
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    pub fn get(&self, provider_id: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.id() == provider_id)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Single-channel fallback across the chain in priority order
    pub async fn fetch_epg(
        &self,
        info: &ChannelMappingInfo,
        date: NaiveDate,
    ) -> ProviderResult<Vec<Program>> {
        let mut last_error = None;

        for provider in &self.providers {
            if !provider.supports_channel(&info.provider_id, &info.provider_channel_id) {
                debug!(
                    "Provider {} does not support {}/{}",
                    provider.id(),
                    info.provider_id,
                    info.provider_channel_id
                );
                continue;
            }
            if let Err(e) = provider.validate() {
                warn!("Provider {} failed validation: {}", provider.id(), e);
                last_error = Some(e);
                continue;
            }

            match provider
                .fetch_epg(&info.provider_channel_id, &info.canonical_id, date)
                .await
            {
                Ok(programs) => {
                    debug!(
                        "Provider {} returned {} programs for {} on {}",
                        provider.id(),
                        programs.len(),
                        info.canonical_id,
                        date
                    );
                    return Ok(programs);
                }
                Err(e) => {
                    warn!(
                        "Provider {} failed for {} on {}, trying next: {}",
                        provider.id(),
                        info.canonical_id,
                        date,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(ProviderError::AllFailed {
                last: Box::new(last),
            }),
            None => Err(ProviderError::NotFound {
                provider_id: info.provider_id.clone(),
            }),
        }
    }

    /// Batch path: the first provider whose subset yields programs wins
    ///
    /// A batch that partly failed but still produced programs counts as a
    /// success; its error is logged. Callers that need every provider's
    /// contribution call this once per provider group. Mappings the named
    /// provider does not serve are dropped before dispatch; when none remain
    /// the call fails with `UnsupportedChannel`.
    pub async fn fetch_epg_parallel(
        &self,
        infos: &[ChannelMappingInfo],
        date: NaiveDate,
    ) -> ProviderResult<Vec<Program>> {
        if self.providers.is_empty() {
            return Err(ProviderError::NoEnabledProviders);
        }

        let mut supported = Vec::with_capacity(infos.len());
        let mut rejected = None;
        for info in infos {
            if self
                .get(&info.provider_id)
                .is_some_and(|p| p.supports_channel(&info.provider_id, &info.provider_channel_id))
            {
                supported.push(info.clone());
                continue;
            }
            let err = ProviderError::UnsupportedChannel {
                provider_id: info.provider_id.clone(),
                provider_channel_id: info.provider_channel_id.clone(),
            };
            warn!("Dropping mapping for {}: {}", info.canonical_id, err);
            rejected.get_or_insert(err);
        }
        if supported.is_empty() {
            if let Some(err) = rejected {
                return Err(err);
            }
        }

        for provider in &self.providers {
            let subset: Vec<ChannelMappingInfo> = supported
                .iter()
                .filter(|info| info.provider_id == provider.id())
                .cloned()
                .collect();
            if subset.is_empty() {
                continue;
            }

            let outcome = Arc::clone(provider).fetch_epg_batch(subset, date).await;
            match outcome.first_error {
                None => {
                    info!(
                        "Provider {} supplied {} programs for {}",
                        provider.id(),
                        outcome.programs.len(),
                        date
                    );
                    return Ok(outcome.programs);
                }
                Some(e) if !outcome.programs.is_empty() => {
                    warn!(
                        "Provider {} partially failed for {} ({} items), keeping {} programs: {}",
                        provider.id(),
                        date,
                        outcome.failed,
                        outcome.programs.len(),
                        e
                    );
                    return Ok(outcome.programs);
                }
                Some(e) => {
                    error!("Provider {} batch failed for {}: {}", provider.id(), date, e);
                }
            }
        }

        let channel_id = infos
            .first()
            .map(|info| info.canonical_id.clone())
            .unwrap_or_default();
        Err(ProviderError::EpgNotFound {
            channel_id,
            date: format_date(date),
        })
    }

    /// Probe every provider concurrently, in chain order
    pub async fn health_check_all(&self) -> Vec<ProviderHealth> {
        join_all(self.providers.iter().map(|p| p.health_check())).await
    }
}
