//! Cron-driven sync jobs
//!
//! The scheduler is a table of named jobs. Each entry owns its parsed
//! schedule, its handler and the tokio task that waits for the next fire
//! time. Re-adding a name replaces the entry; handler failures and panics are
//! logged and the job keeps its schedule.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::errors::{AppError, AppResult};
use crate::utils::cron_helper::{next_fire, parse_schedule};
use crate::utils::today_in;

use super::channel_mapping_service::ChannelMappingService;
use super::epg_service::{EpgService, SyncReport};

pub const JOB_SYNC_MIDNIGHT: &str = "sync_epg_midnight";
pub const JOB_SYNC_MORNING: &str = "sync_epg_morning";
pub const JOB_CLEANUP: &str = "cleanup_old_epg";

pub type JobHandler = Arc<dyn Fn() -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

/// The work behind the scheduled jobs, shared with the HTTP triggers
#[derive(Clone)]
pub struct SyncRunner {
    epg_service: Arc<EpgService>,
    mapping_service: Arc<ChannelMappingService>,
    retention_days: i64,
}

impl SyncRunner {
    pub fn new(
        epg_service: Arc<EpgService>,
        mapping_service: Arc<ChannelMappingService>,
        retention_days: i64,
    ) -> Self {
        Self {
            epg_service,
            mapping_service,
            retention_days,
        }
    }

    /// Sync today for every chain provider, one batch per provider
    pub async fn sync_all_epg(&self, force_update: bool) -> AppResult<SyncReport> {
        let today = today_in(self.epg_service.timezone());
        let sync_type = if force_update { "refresh" } else { "initial" };
        info!("Starting {} EPG sync for {}", sync_type, today);

        let mut report = SyncReport::default();
        for provider in self.epg_service.chain().providers() {
            let mappings = match self.mapping_service.list_mappings(Some(provider.id())).await {
                Ok(mappings) => mappings,
                Err(e) => {
                    error!("Failed to list channel mappings for {}: {}", provider.id(), e);
                    continue;
                }
            };
            if mappings.is_empty() {
                info!("No channel mappings for {}, skipping EPG sync", provider.id());
                continue;
            }

            let infos: Vec<_> = mappings.iter().map(|m| m.info()).collect();
            match self
                .epg_service
                .sync_epg_batch(&infos, today, today, force_update)
                .await
            {
                Ok(provider_report) => report.merge(provider_report),
                Err(e) => error!("Failed to sync EPG batch for {}: {}", provider.id(), e),
            }
        }

        info!(
            "Completed {} EPG sync: {} programs saved, {} failed groups",
            sync_type,
            report.persisted_programs(),
            report.failed()
        );
        Ok(report)
    }

    pub async fn cleanup_old_epg(&self) -> AppResult<u64> {
        self.epg_service.cleanup_old_epg(self.retention_days).await
    }
}

/// Listing entry for one scheduled job
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub name: String,
    pub spec: String,
    pub next_run: Option<DateTime<Utc>>,
}

struct JobEntry {
    spec: String,
    schedule: Schedule,
    handler: JobHandler,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct SchedulerService {
    runner: SyncRunner,
    config: SchedulerConfig,
    timezone: Tz,
    jobs: RwLock<HashMap<String, JobEntry>>,
    shutdown: CancellationToken,
}

impl SchedulerService {
    pub fn new(runner: SyncRunner, config: SchedulerConfig, timezone: Tz) -> Self {
        Self {
            runner,
            config,
            timezone,
            jobs: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register the built-in sync and cleanup jobs
    pub async fn start(&self) -> AppResult<()> {
        info!("Starting scheduler service ({})", self.timezone.name());

        let runner = self.runner.clone();
        self.add_job(
            JOB_SYNC_MIDNIGHT,
            &self.config.initial_sync_cron,
            sync_handler(runner, false),
        )
        .await?;

        let runner = self.runner.clone();
        self.add_job(
            JOB_SYNC_MORNING,
            &self.config.refresh_sync_cron,
            sync_handler(runner, true),
        )
        .await?;

        let runner = self.runner.clone();
        self.add_job(
            JOB_CLEANUP,
            &self.config.cleanup_cron,
            Arc::new(move || {
                let runner = runner.clone();
                async move {
                    let deleted = runner.cleanup_old_epg().await?;
                    info!("Scheduled cleanup removed {} programs", deleted);
                    Ok::<(), AppError>(())
                }
                .boxed()
            }),
        )
        .await?;

        debug!("Scheduler service started");
        Ok(())
    }

    /// Add or replace a named job
    pub async fn add_job(&self, name: &str, spec: &str, handler: JobHandler) -> AppResult<()> {
        let schedule = parse_schedule(spec).map_err(|e| {
            error!("Failed to add job {}: {}", name, e);
            AppError::validation(e)
        })?;

        let token = self.shutdown.child_token();
        let handle = tokio::spawn(run_job_loop(
            name.to_string(),
            schedule.clone(),
            self.timezone,
            Arc::clone(&handler),
            token.clone(),
        ));

        let entry = JobEntry {
            spec: spec.to_string(),
            schedule,
            handler,
            token,
            handle,
        };

        let mut jobs = self.jobs.write().await;
        if let Some(previous) = jobs.insert(name.to_string(), entry) {
            previous.token.cancel();
            previous.handle.abort();
            debug!("Replaced schedule of job {}", name);
        }
        info!("Added job {} ({})", name, spec);
        Ok(())
    }

    pub async fn remove_job(&self, name: &str) -> bool {
        let removed = self.jobs.write().await.remove(name);
        match removed {
            Some(entry) => {
                entry.token.cancel();
                entry.handle.abort();
                info!("Removed job {}", name);
                true
            }
            None => false,
        }
    }

    /// Jobs ordered by name, with their next fire time
    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        let jobs = self.jobs.read().await;
        let mut listed: Vec<JobInfo> = jobs
            .iter()
            .map(|(name, entry)| JobInfo {
                name: name.clone(),
                spec: entry.spec.clone(),
                next_run: next_fire(&entry.schedule, &self.timezone),
            })
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        listed
    }

    /// Run a job once in the background, outside its schedule
    pub async fn run_now(&self, name: &str) -> AppResult<JoinHandle<()>> {
        let handler = {
            let jobs = self.jobs.read().await;
            let entry = jobs
                .get(name)
                .ok_or_else(|| AppError::not_found("job", name))?;
            Arc::clone(&entry.handler)
        };

        info!("Triggered job {} manually", name);
        let name = name.to_string();
        Ok(tokio::spawn(async move {
            execute_job(&name, &handler).await;
        }))
    }

    /// Cancel every job loop and wait for them to exit
    pub async fn stop(&self) {
        info!("Stopping scheduler service");
        self.shutdown.cancel();

        let entries: Vec<(String, JobEntry)> = self.jobs.write().await.drain().collect();
        for (name, entry) in entries {
            if let Err(e) = entry.handle.await {
                if !e.is_cancelled() {
                    warn!("Job loop {} ended abnormally: {}", name, e);
                }
            }
        }
        info!("Scheduler service stopped");
    }
}

fn sync_handler(runner: SyncRunner, force_update: bool) -> JobHandler {
    Arc::new(move || {
        let runner = runner.clone();
        async move {
            runner.sync_all_epg(force_update).await?;
            Ok::<(), AppError>(())
        }
        .boxed()
    })
}

async fn run_job_loop(
    name: String,
    schedule: Schedule,
    timezone: Tz,
    handler: JobHandler,
    token: CancellationToken,
) {
    loop {
        let Some(next) = next_fire(&schedule, &timezone) else {
            warn!("Job {} has no upcoming fire time, stopping", name);
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        debug!("Job {} next runs at {} (in {:?})", name, next, wait);

        tokio::select! {
            _ = token.cancelled() => {
                debug!("Job {} cancelled", name);
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        execute_job(&name, &handler).await;
    }
}

/// Run one invocation; a panicking handler is logged like a failure so the
/// job loop keeps its schedule
async fn execute_job(name: &str, handler: &JobHandler) {
    let started = Instant::now();
    info!("Running job {}", name);
    match AssertUnwindSafe(async { handler().await }).catch_unwind().await {
        Ok(Ok(())) => info!("Job {} finished in {:?}", name, started.elapsed()),
        Ok(Err(e)) => error!("Job {} failed after {:?}: {}", name, started.elapsed(), e),
        Err(panic) => error!(
            "Job {} panicked after {:?}: {}",
            name,
            started.elapsed(),
            panic_message(panic.as_ref())
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
