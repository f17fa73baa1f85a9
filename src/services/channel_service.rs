//! Canonical channel catalog management
//!
//! Channels seeded from config can be edited at runtime; every write is
//! validated here so the auto-mapper and DIYP lookups only ever see usable
//! zones and patterns.

use chrono_tz::Tz;
use regex::Regex;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::{Channel, ChannelMapping};
use crate::repositories::{ChannelMappingRepository, ChannelRepository};

pub struct ChannelService {
    channel_repo: Arc<dyn ChannelRepository>,
    mapping_repo: Arc<dyn ChannelMappingRepository>,
}

impl ChannelService {
    pub fn new(
        channel_repo: Arc<dyn ChannelRepository>,
        mapping_repo: Arc<dyn ChannelMappingRepository>,
    ) -> Self {
        Self {
            channel_repo,
            mapping_repo,
        }
    }

    pub async fn list_channels(&self) -> AppResult<Vec<Channel>> {
        Ok(self.channel_repo.list_all().await?)
    }

    pub async fn get_channel(&self, channel_id: &str) -> AppResult<Channel> {
        self.channel_repo
            .get_by_channel_id(channel_id)
            .await?
            .ok_or_else(|| AppError::not_found("channel", channel_id))
    }

    pub async fn create_channel(&self, channel: Channel) -> AppResult<Channel> {
        validate_channel(&channel)?;
        self.ensure_absent(&channel.channel_id).await?;
        let created = self.channel_repo.create(channel).await?;
        info!("Created channel {}", created.channel_id);
        Ok(created)
    }

    /// All-or-nothing validation, then one insert per channel
    pub async fn batch_create_channels(&self, channels: Vec<Channel>) -> AppResult<Vec<Channel>> {
        if channels.is_empty() {
            return Err(AppError::validation("channels must not be empty"));
        }
        let mut seen = HashSet::new();
        for channel in &channels {
            validate_channel(channel)?;
            if !seen.insert(channel.channel_id.as_str()) {
                return Err(AppError::validation(format!(
                    "channel {} appears twice in the batch",
                    channel.channel_id
                )));
            }
            self.ensure_absent(&channel.channel_id).await?;
        }

        let mut created = Vec::with_capacity(channels.len());
        for channel in channels {
            created.push(self.channel_repo.create(channel).await?);
        }
        info!("Created {} channels", created.len());
        Ok(created)
    }

    /// Replace the editable fields of an existing channel
    pub async fn update_channel(
        &self,
        channel_id: &str,
        mut channel: Channel,
    ) -> AppResult<Channel> {
        let existing = self.get_channel(channel_id).await?;
        channel.id = existing.id;
        channel.channel_id = existing.channel_id;
        channel.created_at = existing.created_at;
        validate_channel(&channel)?;

        let updated = self.channel_repo.upsert(channel).await?;
        info!("Updated channel {}", updated.channel_id);
        Ok(updated)
    }

    pub async fn delete_channel(&self, channel_id: &str) -> AppResult<()> {
        if !self.channel_repo.delete(channel_id).await? {
            return Err(AppError::not_found("channel", channel_id));
        }
        info!("Deleted channel {}", channel_id);
        Ok(())
    }

    /// Provider mappings pointing at `channel_id`
    pub async fn channel_mappings(&self, channel_id: &str) -> AppResult<Vec<ChannelMapping>> {
        self.get_channel(channel_id).await?;
        Ok(self.mapping_repo.list_by_canonical_id(channel_id).await?)
    }

    async fn ensure_absent(&self, channel_id: &str) -> AppResult<()> {
        if self.channel_repo.get_by_channel_id(channel_id).await?.is_some() {
            return Err(AppError::validation(format!(
                "channel {channel_id} already exists"
            )));
        }
        Ok(())
    }
}

pub fn validate_channel(channel: &Channel) -> AppResult<()> {
    if channel.channel_id.trim().is_empty() {
        return Err(AppError::validation("channel_id must not be empty"));
    }
    if channel.display_name.trim().is_empty() {
        return Err(AppError::validation("display_name must not be empty"));
    }
    if Tz::from_str(&channel.timezone).is_err() {
        return Err(AppError::validation(format!(
            "unknown timezone '{}'",
            channel.timezone
        )));
    }
    if let Some(pattern) = channel.regexp.as_deref().filter(|p| !p.is_empty()) {
        Regex::new(pattern)
            .map_err(|e| AppError::validation(format!("invalid regexp '{pattern}': {e}")))?;
    }
    Ok(())
}
