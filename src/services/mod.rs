//! Service layer: sync orchestration, auto-mapping, channel catalog and
//! scheduling

pub mod channel_mapping_service;
pub mod channel_service;
pub mod epg_service;
pub mod scheduler_service;

pub use channel_mapping_service::{AutoMapReport, CONFIDENCE_THRESHOLD, ChannelMappingService};
pub use channel_service::ChannelService;
pub use epg_service::{DateSync, DateSyncOutcome, EpgService, SyncReport};
pub use scheduler_service::{
    JOB_CLEANUP, JOB_SYNC_MIDNIGHT, JOB_SYNC_MORNING, JobHandler, JobInfo, SchedulerService,
    SyncRunner,
};
