//! Error type definitions for the EPG sync service
//!
//! Errors are layered: adapters raise [`ProviderError`] and [`NetworkError`],
//! storage raises [`CacheError`] and [`RepositoryError`], and everything
//! converges on [`AppError`] at the service boundary.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Provider layer errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Outbound HTTP errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised by providers, the registry and the chain
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not found: {provider_id}")]
    NotFound { provider_id: String },

    #[error("No enabled providers available")]
    NoEnabledProviders,

    #[error("Provider type not registered: {provider_type}")]
    TypeNotRegistered { provider_type: String },

    #[error("Provider type already registered: {provider_type}")]
    AlreadyRegistered { provider_type: String },

    #[error("Fetch failed: {provider_id} - {message}")]
    FetchFailed { provider_id: String, message: String },

    #[error("Parse failed: {provider_id} - {message}")]
    ParseFailed { provider_id: String, message: String },

    #[error("Provider timed out: {provider_id} after {timeout_secs}s")]
    Timeout { provider_id: String, timeout_secs: u64 },

    #[error("Invalid provider config: {provider_id} - {reason}")]
    InvalidConfig { provider_id: String, reason: String },

    #[error("Channel not supported: {provider_id} has no channel {provider_channel_id}")]
    UnsupportedChannel {
        provider_id: String,
        provider_channel_id: String,
    },

    #[error("Capability not supported: {provider_id} - {capability}")]
    Unsupported {
        provider_id: String,
        capability: String,
    },

    /// The upstream answered but reported an error of its own
    #[error("Upstream API error: {provider_id} - {status}: {message}")]
    Api {
        provider_id: String,
        status: String,
        message: String,
    },

    #[error("EPG data not found for {channel_id} on {date}")]
    EpgNotFound { channel_id: String, date: String },

    /// Every chain candidate was tried and the last one failed
    #[error("All providers failed: {last}")]
    AllFailed {
        #[source]
        last: Box<ProviderError>,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Cache specific errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache miss: {key}")]
    Miss { key: String },

    #[error("Cache write failed: {key} - {message}")]
    WriteFailed { key: String, message: String },

    #[error("Invalid cache payload: {key} - {message}")]
    InvalidPayload { key: String, message: String },

    #[error("Cache unavailable: {message}")]
    Unavailable { message: String },
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// SQL query execution failures
    #[error("Query failed: {query} - {message}")]
    QueryFailed { query: String, message: String },

    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Stored value could not be mapped back into a model
    #[error("Invalid stored value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Outbound HTTP failures
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("HTTP request failed: {url} - status {status}: {body}")]
    Http { url: String, status: u16, body: String },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Request failed: {url} - {message}")]
    Request { url: String, message: String },

    #[error("HTTP client build failed: {message}")]
    ClientBuild { message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for every not-found flavour, including provider and cache misses
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Provider(e) => e.is_not_found(),
            Self::Cache(CacheError::Miss { .. }) => true,
            _ => false,
        }
    }

    /// Whether a later scheduled pass could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::Network(e) => e.is_retryable(),
            Self::Repository(RepositoryError::Database(_)) => true,
            _ => false,
        }
    }
}

impl ProviderError {
    pub fn fetch_failed<P: Into<String>, M: Into<String>>(provider_id: P, message: M) -> Self {
        Self::FetchFailed {
            provider_id: provider_id.into(),
            message: message.into(),
        }
    }

    pub fn parse_failed<P: Into<String>, M: Into<String>>(provider_id: P, message: M) -> Self {
        Self::ParseFailed {
            provider_id: provider_id.into(),
            message: message.into(),
        }
    }

    pub fn invalid_config<P: Into<String>, R: Into<String>>(provider_id: P, reason: R) -> Self {
        Self::InvalidConfig {
            provider_id: provider_id.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::NoEnabledProviders
                | Self::TypeNotRegistered { .. }
                | Self::EpgNotFound { .. }
        )
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::FetchFailed { .. } | Self::Timeout { .. } | Self::Api { .. } => true,
            Self::Network(e) => e.is_retryable(),
            Self::AllFailed { last } => last.is_retryable(),
            _ => false,
        }
    }
}

impl CacheError {
    pub fn miss<S: Into<String>>(key: S) -> Self {
        Self::Miss { key: key.into() }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss { .. })
    }
}

impl NetworkError {
    /// Map a reqwest failure for `url`, keeping timeouts distinguishable
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout { .. } | Self::Request { .. } => true,
            Self::ClientBuild { .. } => false,
        }
    }
}
