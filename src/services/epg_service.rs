//! EPG sync, query and export
//!
//! Sync walks dates strictly in ascending order, one date at a time; only the
//! fetches inside a date run concurrently (in the provider batch orchestrator).
//! A failing date is recorded in the [`SyncReport`] and never stops the range.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::cache::{Cache, CacheExt};
use crate::errors::{AppError, AppResult, ProviderError};
use crate::models::{
    Channel, ChannelMappingInfo, DIYP_TIME_FORMAT, DiypChannelEpg, DiypProgram, Program,
    XMLTV_TIME_FORMAT, XmltvChannel, XmltvDocument, XmltvProgramme,
};
use crate::providers::{EPG_CACHE_TTL, ProviderChain};
use crate::repositories::{ChannelMappingRepository, ChannelRepository, ProgramRepository};
use crate::utils::{TimeWindow, date_range, format_date, parse_date, today_in};

const GENERATOR_NAME: &str = "epg-sync";

/// What happened to one date (and provider group, for batch sync)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DateSyncOutcome {
    /// Programs were already stored
    Skipped,
    Persisted { programs: u64 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateSync {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(flatten)]
    pub outcome: DateSyncOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub dates: Vec<DateSync>,
}

impl SyncReport {
    fn record(&mut self, date: NaiveDate, provider_id: Option<&str>, outcome: DateSyncOutcome) {
        self.dates.push(DateSync {
            date,
            provider_id: provider_id.map(str::to_string),
            outcome,
        });
    }

    pub fn merge(&mut self, other: SyncReport) {
        self.dates.extend(other.dates);
    }

    /// Total programs written across every date
    pub fn persisted_programs(&self) -> u64 {
        self.dates
            .iter()
            .map(|d| match d.outcome {
                DateSyncOutcome::Persisted { programs } => programs,
                _ => 0,
            })
            .sum()
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DateSyncOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DateSyncOutcome::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&DateSyncOutcome) -> bool) -> usize {
        self.dates.iter().filter(|d| predicate(&d.outcome)).count()
    }
}

pub struct EpgService {
    program_repo: Arc<dyn ProgramRepository>,
    channel_repo: Arc<dyn ChannelRepository>,
    mapping_repo: Arc<dyn ChannelMappingRepository>,
    cache: Arc<dyn Cache>,
    chain: Arc<ProviderChain>,
    timezone: Tz,
    render_ttl: Duration,
}

impl EpgService {
    pub fn new(
        program_repo: Arc<dyn ProgramRepository>,
        channel_repo: Arc<dyn ChannelRepository>,
        mapping_repo: Arc<dyn ChannelMappingRepository>,
        cache: Arc<dyn Cache>,
        chain: Arc<ProviderChain>,
        timezone: Tz,
        render_ttl: Duration,
    ) -> Self {
        Self {
            program_repo,
            channel_repo,
            mapping_repo,
            cache,
            chain,
            timezone,
            render_ttl,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn chain(&self) -> &Arc<ProviderChain> {
        &self.chain
    }

    /// Sync one canonical channel over an inclusive date range
    ///
    /// Dates that already hold programs are skipped. Every mapping of the
    /// channel goes into one chain call per date, so the chain's priority
    /// order decides which provider supplies the schedule.
    pub async fn sync_epg(
        &self,
        channel_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<SyncReport> {
        validate_range(start, end)?;
        info!("Syncing EPG for {} from {} to {}", channel_id, start, end);

        let mut infos: Option<Vec<ChannelMappingInfo>> = None;
        let mut report = SyncReport::default();

        for date in date_range(start, end) {
            self.invalidate_render_cache(date).await;
            let window = TimeWindow::for_day(date, self.timezone);

            match self.program_repo.exists(channel_id, window).await {
                Ok(true) => {
                    info!("EPG already exists for {} on {}, skipping", channel_id, date);
                    report.record(date, None, DateSyncOutcome::Skipped);
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to check EPG existence for {} on {}: {}", channel_id, date, e);
                    report.record(date, None, failed(e));
                    continue;
                }
            }

            if infos.is_none() {
                infos = Some(self.mapping_infos_for(channel_id).await?);
            }
            let Some(infos) = infos.as_deref() else {
                continue;
            };

            let outcome = self.fetch_and_persist(infos, date).await;
            if matches!(outcome, DateSyncOutcome::Persisted { .. }) {
                self.invalidate(vec![self.epg_cache_key(channel_id, date)]).await;
            }
            report.record(date, None, outcome);
        }

        info!(
            "Synced EPG for {}: {} programs, {} skipped, {} failed",
            channel_id,
            report.persisted_programs(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    /// Sync many mappings over an inclusive date range
    ///
    /// Infos are grouped by provider and each group is fetched with its own
    /// chain call, in chain priority order. With `force_update` the group's
    /// stored programs for the date are deleted first.
    pub async fn sync_epg_batch(
        &self,
        infos: &[ChannelMappingInfo],
        start: NaiveDate,
        end: NaiveDate,
        force_update: bool,
    ) -> AppResult<SyncReport> {
        let mut report = SyncReport::default();
        if infos.is_empty() {
            info!("No channel mappings provided, skipping EPG sync");
            return Ok(report);
        }
        validate_range(start, end)?;

        info!(
            "Syncing EPG batch: {} channels from {} to {} (force: {})",
            infos.len(),
            start,
            end,
            force_update
        );
        let groups = self.group_by_provider(infos);

        for date in date_range(start, end) {
            self.invalidate_render_cache(date).await;
            let window = TimeWindow::for_day(date, self.timezone);

            for (provider_id, group) in &groups {
                if force_update {
                    debug!("Force update: deleting EPG of {} for {}", provider_id, date);
                    if let Err(e) = self
                        .program_repo
                        .delete_by_date_and_provider(window, provider_id)
                        .await
                    {
                        warn!(
                            "Failed to delete existing EPG of {} for {} before update: {}",
                            provider_id, date, e
                        );
                    }
                }

                let mut pending = Vec::with_capacity(group.len());
                for info in group {
                    match self.program_repo.exists(&info.canonical_id, window).await {
                        Ok(false) => pending.push(info.clone()),
                        Ok(true) => debug!(
                            "EPG already exists for {} on {}, skipping",
                            info.canonical_id, date
                        ),
                        Err(e) => warn!(
                            "Failed to check EPG existence for {} on {}: {}",
                            info.canonical_id, date, e
                        ),
                    }
                }

                if pending.is_empty() {
                    info!("No channels of {} to sync for {}", provider_id, date);
                    report.record(date, Some(provider_id.as_str()), DateSyncOutcome::Skipped);
                    continue;
                }

                let outcome = self.fetch_and_persist(&pending, date).await;
                if matches!(outcome, DateSyncOutcome::Persisted { .. }) {
                    let keys = pending
                        .iter()
                        .map(|info| self.epg_cache_key(&info.canonical_id, date))
                        .collect();
                    self.invalidate(keys).await;
                }
                report.record(date, Some(provider_id.as_str()), outcome);
            }
        }

        info!(
            "Synced EPG batch of {} channels: {} programs, {} skipped, {} failed",
            infos.len(),
            report.persisted_programs(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    /// Delete programs that ended more than `retention_days` ago
    pub async fn cleanup_old_epg(&self, retention_days: i64) -> AppResult<u64> {
        if retention_days < 0 {
            return Err(AppError::validation("retention days must not be negative"));
        }
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        info!("Cleaning up EPG ended before {} ({} days kept)", cutoff, retention_days);

        let deleted = self.program_repo.delete_before(cutoff).await?;
        info!("Cleaned up {} old programs", deleted);
        Ok(deleted)
    }

    /// Stored schedule for one channel and day, read through the cache
    pub async fn get_epg(&self, channel_id: &str, date: NaiveDate) -> AppResult<Vec<Program>> {
        let key = self.epg_cache_key(channel_id, date);
        match self.cache.get_json::<Vec<Program>>(&key).await {
            Ok(programs) => {
                debug!("EPG cache hit for {}", key);
                return Ok(programs);
            }
            Err(e) if !e.is_miss() => warn!("EPG cache read failed for {}: {}", key, e),
            Err(_) => {}
        }

        let window = TimeWindow::for_day(date, self.timezone);
        let programs = self
            .program_repo
            .list_by_channel_and_time_range(channel_id, window)
            .await?;
        if programs.is_empty() {
            return Err(ProviderError::EpgNotFound {
                channel_id: channel_id.to_string(),
                date: format_date(date),
            }
            .into());
        }

        if let Err(e) = self.cache.set_json(&key, &programs, EPG_CACHE_TTL).await {
            warn!("Failed to cache EPG for {}: {}", key, e);
        }
        Ok(programs)
    }

    pub async fn get_epg_range(
        &self,
        channel_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Program>> {
        validate_range(start, end)?;
        let window = TimeWindow::for_days(start, end, self.timezone);
        Ok(self
            .program_repo
            .list_by_channel_and_time_range(channel_id, window)
            .await?)
    }

    pub async fn get_current_program(&self, channel_id: &str) -> AppResult<Program> {
        self.get_program_at(channel_id, Utc::now()).await
    }

    pub async fn get_program_at(&self, channel_id: &str, at: DateTime<Utc>) -> AppResult<Program> {
        self.program_repo
            .current_program(channel_id, at)
            .await?
            .ok_or_else(|| AppError::not_found("program", channel_id))
    }

    /// XMLTV document covering yesterday through tomorrow
    pub async fn generate_xmltv(&self) -> AppResult<XmltvDocument> {
        let today = today_in(self.timezone);
        let key = xmltv_cache_key(today);

        match self.cache.get_json::<XmltvDocument>(&key).await {
            Ok(document) => {
                info!(
                    "Returning cached XMLTV EPG: {} channels, {} programmes",
                    document.channels.len(),
                    document.programmes.len()
                );
                return Ok(document);
            }
            Err(e) if !e.is_miss() => warn!("XMLTV cache read failed: {}", e),
            Err(_) => {}
        }

        let first = today.checked_sub_days(Days::new(1)).unwrap_or(today);
        let last = today.checked_add_days(Days::new(1)).unwrap_or(today);
        let programs = self
            .program_repo
            .list_all_by_time_range(TimeWindow::for_days(first, last, self.timezone))
            .await?;
        let display_names: HashMap<String, String> = self
            .channel_repo
            .list_all()
            .await?
            .into_iter()
            .map(|c| (c.channel_id, c.display_name))
            .collect();

        let mut document = XmltvDocument {
            generator: GENERATOR_NAME.to_string(),
            ..Default::default()
        };
        for program in &programs {
            if !document.channels.iter().any(|c| c.id == program.channel_id) {
                let display = display_names
                    .get(&program.channel_id)
                    .cloned()
                    .unwrap_or_else(|| program.channel_id.clone());
                document.channels.push(XmltvChannel {
                    id: program.channel_id.clone(),
                    display_names: vec![program.channel_id.clone(), display],
                });
            }

            let tz = program.original_tz();
            document.programmes.push(XmltvProgramme {
                channel: program.channel_id.clone(),
                start: program
                    .start_time
                    .with_timezone(&tz)
                    .format(XMLTV_TIME_FORMAT)
                    .to_string(),
                stop: program
                    .end_time
                    .with_timezone(&tz)
                    .format(XMLTV_TIME_FORMAT)
                    .to_string(),
                title: program.title.clone(),
                desc: program.description.clone(),
            });
        }

        info!(
            "Generated XMLTV EPG: {} channels, {} programmes",
            document.channels.len(),
            document.programmes.len()
        );
        if let Err(e) = self.cache.set_json(&key, &document, self.render_ttl).await {
            warn!("Failed to cache XMLTV EPG: {}", e);
        }
        Ok(document)
    }

    pub async fn render_xmltv(&self) -> AppResult<String> {
        self.generate_xmltv()
            .await?
            .to_xml()
            .map_err(|e| AppError::internal(format!("failed to render XMLTV: {e}")))
    }

    /// DIYP day listing for a free-text channel name
    pub async fn generate_diyp(&self, channel_name: &str, date: &str) -> AppResult<DiypChannelEpg> {
        let channel_name = channel_name.trim();
        if channel_name.is_empty() {
            return Err(AppError::validation("channel name is required"));
        }
        let day = parse_date(date)
            .map_err(|e| AppError::validation(format!("invalid date '{date}': {e}")))?;

        let channels = self.channel_repo.list_all().await?;
        let channel = resolve_channel(&channels, channel_name)
            .ok_or_else(|| AppError::not_found("channel", channel_name))?;

        let programs = self
            .program_repo
            .list_by_channel_and_time_range(
                &channel.channel_id,
                TimeWindow::for_day(day, self.timezone),
            )
            .await?;

        let epg_data: Vec<DiypProgram> = programs
            .iter()
            .map(|p| {
                let tz = p.original_tz();
                DiypProgram {
                    start: p.start_time.with_timezone(&tz).format(DIYP_TIME_FORMAT).to_string(),
                    end: p.end_time.with_timezone(&tz).format(DIYP_TIME_FORMAT).to_string(),
                    title: p.title.clone(),
                    desc: p.description.clone(),
                }
            })
            .collect();

        debug!("Generated {} DIYP programs for {}", epg_data.len(), channel.channel_id);
        Ok(DiypChannelEpg {
            channel_name: channel.channel_id.clone(),
            date: format_date(day),
            epg_data,
        })
    }

    async fn mapping_infos_for(&self, channel_id: &str) -> AppResult<Vec<ChannelMappingInfo>> {
        let mappings = self.mapping_repo.list_by_canonical_id(channel_id).await?;
        debug!("Found {} mappings for {}", mappings.len(), channel_id);
        if mappings.is_empty() {
            warn!("No channel mapping found for {}", channel_id);
            return Err(AppError::not_found("channel mapping", channel_id));
        }
        Ok(mappings.iter().map(|m| m.info()).collect())
    }

    async fn fetch_and_persist(
        &self,
        infos: &[ChannelMappingInfo],
        date: NaiveDate,
    ) -> DateSyncOutcome {
        let programs = match self.chain.fetch_epg_parallel(infos, date).await {
            Ok(programs) => programs,
            Err(e) => {
                warn!("Failed to fetch EPG for {}: {}", date, e);
                return failed(e);
            }
        };
        if programs.is_empty() {
            warn!("No EPG data found for {}", date);
            return DateSyncOutcome::Failed {
                reason: "no programs returned".to_string(),
            };
        }

        let count = programs.len();
        match self.program_repo.create_batch(programs).await {
            Ok(written) => {
                info!("Saved {} programs for {} ({} channels)", written, date, infos.len());
                DateSyncOutcome::Persisted { programs: written }
            }
            Err(e) => {
                warn!("Failed to save {} programs for {}: {}", count, date, e);
                failed(e)
            }
        }
    }

    /// Provider groups in chain priority order, unknown providers last
    fn group_by_provider(
        &self,
        infos: &[ChannelMappingInfo],
    ) -> Vec<(String, Vec<ChannelMappingInfo>)> {
        let mut groups: Vec<(String, Vec<ChannelMappingInfo>)> = self
            .chain
            .providers()
            .iter()
            .map(|p| (p.id().to_string(), Vec::new()))
            .collect();

        for info in infos {
            match groups.iter_mut().find(|(id, _)| *id == info.provider_id) {
                Some((_, group)) => group.push(info.clone()),
                None => groups.push((info.provider_id.clone(), vec![info.clone()])),
            }
        }

        groups.retain(|(_, group)| !group.is_empty());
        groups
    }

    fn epg_cache_key(&self, channel_id: &str, date: NaiveDate) -> String {
        format!("epg:{}:{}_{}", channel_id, format_date(date), self.timezone.name())
    }

    async fn invalidate_render_cache(&self, date: NaiveDate) {
        self.invalidate(vec![xmltv_cache_key(date)]).await;
    }

    async fn invalidate(&self, keys: Vec<String>) {
        if let Err(e) = self.cache.delete(&keys).await {
            warn!("Failed to invalidate cache keys {:?}: {}", keys, e);
        }
    }
}

pub fn xmltv_cache_key(date: NaiveDate) -> String {
    format!("xmltv_epg:{}", format_date(date))
}

/// By regexp first, then by case-insensitive id or display name
fn resolve_channel<'a>(channels: &'a [Channel], name: &str) -> Option<&'a Channel> {
    channels
        .iter()
        .find(|c| {
            c.regexp
                .as_deref()
                .filter(|pattern| !pattern.is_empty())
                .and_then(|pattern| Regex::new(pattern).ok())
                .is_some_and(|re| re.is_match(name))
        })
        .or_else(|| {
            channels.iter().find(|c| {
                c.channel_id.eq_ignore_ascii_case(name)
                    || c.display_name.to_lowercase() == name.to_lowercase()
            })
        })
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if start > end {
        return Err(AppError::validation(format!(
            "start date {start} is after end date {end}"
        )));
    }
    Ok(())
}

fn failed(error: impl std::fmt::Display) -> DateSyncOutcome {
    DateSyncOutcome::Failed {
        reason: error.to_string(),
    }
}
