//! Configuration default values, kept in one place so the config structs
//! and the generated default file agree.

// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./epg-sync.db?mode=rwc";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

// Cache defaults
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_RENDER_TTL: &str = "24h";

// Scheduler defaults (6-field cron, seconds first)
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
pub const DEFAULT_INITIAL_SYNC_CRON: &str = "0 1 0 * * *";
pub const DEFAULT_REFRESH_SYNC_CRON: &str = "0 0 8 * * *";
pub const DEFAULT_CLEANUP_CRON: &str = "0 0 4 * * *";
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

// Provider defaults
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROVIDER_RATE_LIMIT: usize = 5;
pub const DEFAULT_PROVIDER_MAX_RETRIES: u32 = 3;

// Logging defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";
