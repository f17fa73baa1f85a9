//! The provider contract implemented by every upstream adapter
//!
//! Adapters embed a [`ProviderBase`] and implement [`Provider::fetch_epg`];
//! everything else has a working default. Upstreams that return several days
//! per request report [`FetchMode::MultiDay`] and implement
//! [`Provider::fetch_epg_multi_day`], which the batch orchestrator then
//! prefers so one request fills the cache for the whole window.

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::Cache;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::{ChannelMappingInfo, Program, ProviderChannel, ProviderHealth};
use crate::utils::today_in;

use super::base::ProviderBase;
use super::batch::{self, BatchOutcome};

/// Programs keyed by the upstream's `YYYY-MM-DD` date label
pub type ProgramsByDate = BTreeMap<String, Vec<Program>>;

/// How the batch orchestrator should call a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// One request per channel and date
    SingleDay,
    /// One request returns a window of dates for a channel
    MultiDay,
}

#[async_trait]
pub trait Provider: Send + Sync + 'static {
    fn base(&self) -> &ProviderBase;

    fn id(&self) -> &str {
        self.base().id()
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn priority(&self) -> i32 {
        self.base().priority()
    }

    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    fn fetch_mode(&self) -> FetchMode {
        FetchMode::SingleDay
    }

    fn list_channels(&self) -> &[ProviderChannel] {
        self.base().channels()
    }

    fn supports_channel(&self, provider_id: &str, provider_channel_id: &str) -> bool {
        self.base().supports_channel(provider_id, provider_channel_id)
    }

    fn validate(&self) -> ProviderResult<()> {
        self.base().validate()
    }

    fn set_cache(&self, cache: Arc<dyn Cache>) {
        self.base().set_cache(cache)
    }

    /// Programs for one channel on one date, in the provider's local day
    async fn fetch_epg(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        date: NaiveDate,
    ) -> ProviderResult<Vec<Program>>;

    /// Programs for `start..=end`, only for [`FetchMode::MultiDay`] providers
    async fn fetch_epg_multi_day(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ProviderResult<ProgramsByDate> {
        let _ = (provider_channel_id, canonical_id, start, end);
        Err(ProviderError::Unsupported {
            provider_id: self.id().to_string(),
            capability: "multi-day fetch".to_string(),
        })
    }

    /// Many channels for one date through the shared worker pool
    fn fetch_epg_batch(
        self: Arc<Self>,
        infos: Vec<ChannelMappingInfo>,
        date: NaiveDate,
    ) -> BoxFuture<'static, BatchOutcome> {
        Box::pin(batch::fetch_batch(self, infos, date))
    }

    /// Probe today's listing of the first catalog channel
    async fn health_check(&self) -> ProviderHealth {
        let started = Instant::now();
        let Some(sample) = self.list_channels().first() else {
            return ProviderHealth::unhealthy(
                self.id(),
                "provider lists no channels",
                started.elapsed(),
            );
        };
        let today = today_in(self.base().timezone());
        match self.fetch_epg(&sample.id, &sample.id, today).await {
            Ok(_) => ProviderHealth::healthy(self.id(), started.elapsed()),
            Err(e) => ProviderHealth::unhealthy(self.id(), e.to_string(), started.elapsed()),
        }
    }
}
