//! Concurrent batch fetch shared by all providers
//!
//! Cache hits are served straight away. The remaining (provider channel,
//! canonical channel) items go into a queue drained by at most `rate_limit`
//! workers. One failing item never cancels its siblings: the first error is
//! kept and returned next to whatever succeeded.

use chrono::{Duration, NaiveDate};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{ProviderError, ProviderResult};
use crate::models::{ChannelMappingInfo, Program};
use crate::utils::format_date;

use super::traits::{FetchMode, Provider};

/// Multi-day window around the requested date: six days back, one ahead
pub const WINDOW_DAYS_BEHIND: i64 = 6;
pub const WINDOW_DAYS_AHEAD: i64 = 1;

/// Aggregate of one batch call. `first_error` set means some items failed,
/// not that nothing succeeded.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub programs: Vec<Program>,
    pub first_error: Option<ProviderError>,
    pub cache_hits: usize,
    pub fetched: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.first_error.is_none()
    }
}

pub async fn fetch_batch<P>(
    provider: Arc<P>,
    infos: Vec<ChannelMappingInfo>,
    date: NaiveDate,
) -> BatchOutcome
where
    P: Provider + ?Sized,
{
    let mut outcome = BatchOutcome::default();
    let mut seen = HashSet::new();
    let mut pending = VecDeque::new();

    for info in infos {
        if !seen.insert((info.provider_channel_id.clone(), info.canonical_id.clone())) {
            debug!(
                "Skipping duplicate batch item {}/{} for {}",
                info.provider_channel_id,
                info.canonical_id,
                provider.id()
            );
            continue;
        }
        let cached = provider
            .base()
            .get_from_cache(&info.provider_channel_id, &info.canonical_id, date)
            .await;
        match cached {
            Some(programs) => {
                outcome.cache_hits += 1;
                outcome.programs.extend(programs);
            }
            None => pending.push_back(info),
        }
    }

    if pending.is_empty() {
        debug!(
            "Batch for {} on {} served entirely from cache ({} items)",
            provider.id(),
            date,
            outcome.cache_hits
        );
        return outcome;
    }

    let workers = provider.base().rate_limit().min(pending.len()).max(1);
    let mode = provider.fetch_mode();
    info!(
        "Fetching {} channels from {} for {} with {} workers ({:?}, {} cached)",
        pending.len(),
        provider.id(),
        date,
        workers,
        mode,
        outcome.cache_hits
    );

    let queue = Arc::new(Mutex::new(pending));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut pool = JoinSet::new();

    for _ in 0..workers {
        let provider = Arc::clone(&provider);
        let queue = Arc::clone(&queue);
        let tx = tx.clone();
        pool.spawn(async move {
            loop {
                let next = queue.lock().await.pop_front();
                let Some(info) = next else { break };
                let result = fetch_item(provider.as_ref(), mode, &info, date).await;
                if tx.send((info, result)).is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    while let Some((info, result)) = rx.recv().await {
        match result {
            Ok(programs) => {
                outcome.fetched += 1;
                outcome.programs.extend(programs);
            }
            Err(e) => {
                outcome.failed += 1;
                if outcome.first_error.is_none() {
                    error!(
                        "Fetch failed for {}/{} from {}: {}",
                        info.provider_channel_id,
                        info.canonical_id,
                        provider.id(),
                        e
                    );
                    outcome.first_error = Some(e);
                } else {
                    warn!(
                        "Additional fetch failure for {}/{} from {}: {}",
                        info.provider_channel_id,
                        info.canonical_id,
                        provider.id(),
                        e
                    );
                }
            }
        }
    }

    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            error!("Batch worker for {} aborted: {}", provider.id(), e);
        }
    }

    info!(
        "Batch for {} on {}: {} programs, {} fetched, {} cached, {} failed",
        provider.id(),
        date,
        outcome.programs.len(),
        outcome.fetched,
        outcome.cache_hits,
        outcome.failed
    );
    outcome
}

async fn fetch_item<P>(
    provider: &P,
    mode: FetchMode,
    info: &ChannelMappingInfo,
    date: NaiveDate,
) -> ProviderResult<Vec<Program>>
where
    P: Provider + ?Sized,
{
    match mode {
        FetchMode::SingleDay => {
            let programs = provider
                .fetch_epg(&info.provider_channel_id, &info.canonical_id, date)
                .await?;
            if !programs.is_empty() {
                provider
                    .base()
                    .put_to_cache(&info.provider_channel_id, &info.canonical_id, date, &programs)
                    .await;
            }
            Ok(programs)
        }
        FetchMode::MultiDay => {
            fetch_window(provider, &info.provider_channel_id, &info.canonical_id, date).await
        }
    }
}

/// One multi-day request around `date`; every returned date is cached and
/// `date`'s slice is returned
pub async fn fetch_window<P>(
    provider: &P,
    provider_channel_id: &str,
    canonical_id: &str,
    date: NaiveDate,
) -> ProviderResult<Vec<Program>>
where
    P: Provider + ?Sized,
{
    let start = date - Duration::days(WINDOW_DAYS_BEHIND);
    let end = date + Duration::days(WINDOW_DAYS_AHEAD);
    let mut by_date = provider
        .fetch_epg_multi_day(provider_channel_id, canonical_id, start, end)
        .await?;
    let cached = provider
        .base()
        .put_multi_day_to_cache(provider_channel_id, canonical_id, &by_date)
        .await;
    debug!(
        "Multi-day fetch {}/{} from {} cached {} dates",
        provider_channel_id,
        canonical_id,
        provider.id(),
        cached
    );
    Ok(by_date.remove(&format_date(date)).unwrap_or_default())
}

/// Single-date entry point for multi-day adapters: cache first, then the window
pub async fn fetch_day_from_window<P>(
    provider: &P,
    provider_channel_id: &str,
    canonical_id: &str,
    date: NaiveDate,
) -> ProviderResult<Vec<Program>>
where
    P: Provider + ?Sized,
{
    if let Some(programs) = provider
        .base()
        .get_from_cache(provider_channel_id, canonical_id, date)
        .await
    {
        return Ok(programs);
    }
    fetch_window(provider, provider_channel_id, canonical_id, date).await
}
