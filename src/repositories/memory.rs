//! In-process repositories, used for `database.url = "memory"` and in tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::traits::{ChannelMappingRepository, ChannelRepository, ProgramRepository};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{Channel, ChannelMapping, Program};
use crate::utils::TimeWindow;

#[derive(Default)]
pub struct InMemoryChannelRepository {
    channels: RwLock<Vec<Channel>>,
    next_id: AtomicI64,
}

impl InMemoryChannelRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelRepository for InMemoryChannelRepository {
    async fn create(&self, mut channel: Channel) -> RepositoryResult<Channel> {
        let mut channels = self.channels.write().await;
        if channels.iter().any(|c| c.channel_id == channel.channel_id) {
            return Err(RepositoryError::InvalidValue {
                field: "channel_id".to_string(),
                message: format!("channel {} already exists", channel.channel_id),
            });
        }
        channel.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        channels.push(channel.clone());
        channels.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        Ok(channel)
    }

    async fn upsert(&self, mut channel: Channel) -> RepositoryResult<Channel> {
        let mut channels = self.channels.write().await;
        channel.updated_at = Utc::now();
        if let Some(existing) = channels.iter_mut().find(|c| c.channel_id == channel.channel_id) {
            channel.id = existing.id;
            channel.created_at = existing.created_at;
            *existing = channel.clone();
        } else {
            channel.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            channels.push(channel.clone());
            channels.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        }
        Ok(channel)
    }

    async fn get_by_channel_id(&self, channel_id: &str) -> RepositoryResult<Option<Channel>> {
        let channels = self.channels.read().await;
        Ok(channels.iter().find(|c| c.channel_id == channel_id).cloned())
    }

    async fn list_all(&self) -> RepositoryResult<Vec<Channel>> {
        Ok(self.channels.read().await.clone())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        Ok(self.channels.read().await.len() as u64)
    }

    async fn delete(&self, channel_id: &str) -> RepositoryResult<bool> {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|c| c.channel_id != channel_id);
        Ok(channels.len() != before)
    }
}

#[derive(Default)]
pub struct InMemoryProgramRepository {
    programs: RwLock<Vec<Program>>,
    next_id: AtomicI64,
}

impl InMemoryProgramRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.programs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn sorted_by_start(mut programs: Vec<Program>) -> Vec<Program> {
    programs.sort_by_key(|p| p.start_time);
    programs
}

#[async_trait]
impl ProgramRepository for InMemoryProgramRepository {
    async fn create_batch(&self, programs: Vec<Program>) -> RepositoryResult<u64> {
        let mut stored = self.programs.write().await;
        let written = programs.len() as u64;
        for mut program in programs {
            program.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            stored.push(program);
        }
        Ok(written)
    }

    async fn exists(&self, channel_id: &str, window: TimeWindow) -> RepositoryResult<bool> {
        let programs = self.programs.read().await;
        Ok(programs
            .iter()
            .any(|p| p.channel_id == channel_id && window.contains(p.start_time)))
    }

    async fn list_by_channel_and_time_range(
        &self,
        channel_id: &str,
        window: TimeWindow,
    ) -> RepositoryResult<Vec<Program>> {
        let programs = self.programs.read().await;
        Ok(sorted_by_start(
            programs
                .iter()
                .filter(|p| p.channel_id == channel_id && window.contains(p.start_time))
                .cloned()
                .collect(),
        ))
    }

    async fn list_all_by_time_range(&self, window: TimeWindow) -> RepositoryResult<Vec<Program>> {
        let programs = self.programs.read().await;
        Ok(sorted_by_start(
            programs
                .iter()
                .filter(|p| window.contains(p.start_time))
                .cloned()
                .collect(),
        ))
    }

    async fn current_program(
        &self,
        channel_id: &str,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Program>> {
        let programs = self.programs.read().await;
        Ok(programs
            .iter()
            .filter(|p| p.channel_id == channel_id && p.is_airing_at(at))
            .max_by_key(|p| p.start_time)
            .cloned())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64> {
        let mut programs = self.programs.write().await;
        let before = programs.len();
        programs.retain(|p| p.end_time >= cutoff);
        Ok((before - programs.len()) as u64)
    }

    async fn delete_by_date_and_provider(
        &self,
        window: TimeWindow,
        provider_id: &str,
    ) -> RepositoryResult<u64> {
        let mut programs = self.programs.write().await;
        let before = programs.len();
        programs.retain(|p| !(p.provider_id == provider_id && window.contains(p.start_time)));
        Ok((before - programs.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryChannelMappingRepository {
    mappings: RwLock<Vec<ChannelMapping>>,
    next_id: AtomicI64,
}

impl InMemoryChannelMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelMappingRepository for InMemoryChannelMappingRepository {
    async fn create(&self, mut mapping: ChannelMapping) -> RepositoryResult<ChannelMapping> {
        let mut mappings = self.mappings.write().await;
        mappings.retain(|m| {
            !(m.provider_id == mapping.provider_id
                && m.provider_channel_id == mapping.provider_channel_id)
        });
        mapping.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        mappings.push(mapping.clone());
        Ok(mapping)
    }

    async fn find_by_provider_channel(
        &self,
        provider_id: &str,
        provider_channel_id: &str,
    ) -> RepositoryResult<Option<ChannelMapping>> {
        let mappings = self.mappings.read().await;
        Ok(mappings
            .iter()
            .find(|m| m.provider_id == provider_id && m.provider_channel_id == provider_channel_id)
            .cloned())
    }

    async fn list_by_canonical_id(
        &self,
        canonical_id: &str,
    ) -> RepositoryResult<Vec<ChannelMapping>> {
        let mappings = self.mappings.read().await;
        Ok(mappings
            .iter()
            .filter(|m| m.canonical_id == canonical_id)
            .cloned()
            .collect())
    }

    async fn list_by_provider(&self, provider_id: &str) -> RepositoryResult<Vec<ChannelMapping>> {
        let mappings = self.mappings.read().await;
        Ok(mappings
            .iter()
            .filter(|m| m.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> RepositoryResult<Vec<ChannelMapping>> {
        Ok(self.mappings.read().await.clone())
    }
}
