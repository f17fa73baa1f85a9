//! Repository trait definitions
//!
//! The sync engine only ever talks to these traits; SQLite and in-memory
//! backends live behind them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::RepositoryResult;
use crate::models::{Channel, ChannelMapping, Program};
use crate::utils::TimeWindow;

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Insert a new channel; an existing `channel_id` is an error
    async fn create(&self, channel: Channel) -> RepositoryResult<Channel>;

    /// Insert, or update every field but the id when `channel_id` exists
    async fn upsert(&self, channel: Channel) -> RepositoryResult<Channel>;

    async fn get_by_channel_id(&self, channel_id: &str) -> RepositoryResult<Option<Channel>>;

    /// Active and inactive channels ordered by `channel_id`
    async fn list_all(&self) -> RepositoryResult<Vec<Channel>>;

    async fn count(&self) -> RepositoryResult<u64>;

    async fn delete(&self, channel_id: &str) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait ProgramRepository: Send + Sync {
    /// Bulk insert; ids are assigned by the store. Returns rows written.
    async fn create_batch(&self, programs: Vec<Program>) -> RepositoryResult<u64>;

    /// Whether `channel_id` has any program starting inside `window`
    async fn exists(&self, channel_id: &str, window: TimeWindow) -> RepositoryResult<bool>;

    /// Programs starting inside `window`, ordered by start time
    async fn list_by_channel_and_time_range(
        &self,
        channel_id: &str,
        window: TimeWindow,
    ) -> RepositoryResult<Vec<Program>>;

    async fn list_all_by_time_range(&self, window: TimeWindow) -> RepositoryResult<Vec<Program>>;

    /// The program airing on `channel_id` at `at`, if any
    async fn current_program(
        &self,
        channel_id: &str,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Program>>;

    /// Purge programs whose end time is before `cutoff`
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64>;

    /// Purge one provider's programs starting inside `window`
    async fn delete_by_date_and_provider(
        &self,
        window: TimeWindow,
        provider_id: &str,
    ) -> RepositoryResult<u64>;
}

#[async_trait]
pub trait ChannelMappingRepository: Send + Sync {
    /// Create, replacing any row for the same (provider_id, provider_channel_id)
    async fn create(&self, mapping: ChannelMapping) -> RepositoryResult<ChannelMapping>;

    async fn find_by_provider_channel(
        &self,
        provider_id: &str,
        provider_channel_id: &str,
    ) -> RepositoryResult<Option<ChannelMapping>>;

    async fn list_by_canonical_id(
        &self,
        canonical_id: &str,
    ) -> RepositoryResult<Vec<ChannelMapping>>;

    async fn list_by_provider(&self, provider_id: &str) -> RepositoryResult<Vec<ChannelMapping>>;

    async fn list_all(&self) -> RepositoryResult<Vec<ChannelMapping>>;
}
