//! Channel auto-mapping
//!
//! Binds provider-local channel ids to canonical channels with an additive
//! scoring heuristic. Scores are not normalized: several signals can fire
//! for the same pair, so a strong match lands well above 1.0.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::AppResult;
use crate::models::{Channel, ChannelMapping, ProviderChannel};
use crate::providers::ProviderChain;
use crate::repositories::{ChannelMappingRepository, ChannelRepository};

/// Acceptance line for new mappings and the skip line for existing ones
pub const CONFIDENCE_THRESHOLD: f64 = 0.8;

const EXACT_MATCH_SCORE: f64 = 1.0;
const SUBSTRING_SCORE: f64 = 0.7;
const ALIAS_SCORE: f64 = 0.9;
const CLEANED_CONTAINS_SCORE: f64 = 1.0;
const CLEANED_ID_SCORE: f64 = 0.8;

/// Tally of one auto-map run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutoMapReport {
    pub created: usize,
    pub skipped: usize,
    pub unmatched: usize,
}

impl AutoMapReport {
    fn absorb(&mut self, other: AutoMapReport) {
        self.created += other.created;
        self.skipped += other.skipped;
        self.unmatched += other.unmatched;
    }
}

pub struct ChannelMappingService {
    channel_repo: Arc<dyn ChannelRepository>,
    mapping_repo: Arc<dyn ChannelMappingRepository>,
}

impl ChannelMappingService {
    pub fn new(
        channel_repo: Arc<dyn ChannelRepository>,
        mapping_repo: Arc<dyn ChannelMappingRepository>,
    ) -> Self {
        Self {
            channel_repo,
            mapping_repo,
        }
    }

    /// Map one provider's catalog against every canonical channel
    pub async fn auto_map_channels(
        &self,
        provider_id: &str,
        provider_channels: &[ProviderChannel],
    ) -> AppResult<AutoMapReport> {
        let canonical = self.channel_repo.list_all().await?;
        let mut report = AutoMapReport::default();

        for provider_channel in provider_channels {
            let existing = self
                .mapping_repo
                .find_by_provider_channel(provider_id, &provider_channel.id)
                .await?;
            if existing.is_some_and(|m| m.confidence >= CONFIDENCE_THRESHOLD) {
                report.skipped += 1;
                continue;
            }

            match find_best_match(provider_channel, &canonical) {
                Some((channel, score)) if score >= CONFIDENCE_THRESHOLD => {
                    let mapping = ChannelMapping::new(
                        &channel.channel_id,
                        provider_id,
                        provider_channel,
                        score,
                    );
                    self.mapping_repo.create(mapping).await?;
                    debug!(
                        "Mapped {}/{} to {} (score {:.2})",
                        provider_id, provider_channel.id, channel.channel_id, score
                    );
                    report.created += 1;
                }
                best => {
                    info!(
                        "No suitable channel mapping found for {}/{} ({}), best score {:.2}",
                        provider_id,
                        provider_channel.id,
                        provider_channel.name,
                        best.map(|(_, score)| score).unwrap_or(0.0)
                    );
                    report.unmatched += 1;
                }
            }
        }

        Ok(report)
    }

    /// Auto-map every chain member's catalog; a failing provider is logged and skipped
    pub async fn auto_map_chain(&self, chain: &ProviderChain) -> AutoMapReport {
        let mut total = AutoMapReport::default();

        for provider in chain.providers() {
            let channels = provider.list_channels();
            match self.auto_map_channels(provider.id(), channels).await {
                Ok(report) => {
                    debug!(
                        "Auto mapped {} channels for {}: {:?}",
                        channels.len(),
                        provider.id(),
                        report
                    );
                    total.absorb(report);
                }
                Err(e) => warn!("Failed to auto map channels for {}: {}", provider.id(), e),
            }
        }

        info!(
            "Auto-mapping finished: {} created, {} already mapped, {} unmatched",
            total.created, total.skipped, total.unmatched
        );
        total
    }

    /// Mappings for one provider, or all of them
    pub async fn list_mappings(&self, provider_id: Option<&str>) -> AppResult<Vec<ChannelMapping>> {
        let mappings = match provider_id {
            Some(id) => self.mapping_repo.list_by_provider(id).await?,
            None => self.mapping_repo.list_all().await?,
        };
        Ok(mappings)
    }
}

/// Highest-scoring canonical channel; ties keep the earlier candidate
pub fn find_best_match<'a>(
    provider_channel: &ProviderChannel,
    candidates: &'a [Channel],
) -> Option<(&'a Channel, f64)> {
    let mut best: Option<(&Channel, f64)> = None;
    for candidate in candidates {
        let score = calculate_match_score(provider_channel, candidate);
        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((candidate, score));
        }
    }
    best
}

pub fn calculate_match_score(provider_channel: &ProviderChannel, channel: &Channel) -> f64 {
    let mut score = 0.0;
    let pc_name = provider_channel.name.to_lowercase();
    let canonical_id = channel.channel_id.to_lowercase();

    if provider_channel.id.eq_ignore_ascii_case(&channel.channel_id)
        || eq_ignore_case(&provider_channel.name, &channel.display_name)
    {
        score += EXACT_MATCH_SCORE;
    }

    if canonical_id.contains(&pc_name) || pc_name.contains(&canonical_id) {
        score += SUBSTRING_SCORE;
    }

    if provider_channel.aliases.iter().any(|alias| {
        eq_ignore_case(alias, &channel.channel_id) || eq_ignore_case(alias, &channel.display_name)
    }) {
        score += ALIAS_SCORE;
    }

    let clean_pc = clean_channel_name(&provider_channel.name);
    if clean_channel_name(&channel.display_name).contains(&clean_pc) {
        score += CLEANED_CONTAINS_SCORE;
    }
    if clean_pc == clean_channel_name(&channel.channel_id) {
        score += CLEANED_ID_SCORE;
    }

    score
}

/// Lower-case and drop spaces, hyphens and underscores
pub fn clean_channel_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .collect()
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
