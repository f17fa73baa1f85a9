//! Centralized error handling for the EPG sync service
//!
//! # Error Categories
//!
//! - **Provider Errors**: upstream fetch, parse and registry failures
//! - **Cache Errors**: misses (a distinct kind), write failures, bad payloads
//! - **Repository Errors**: persistence failures
//! - **Network Errors**: HTTP failures carrying URL, status and body
//! - **Validation / NotFound**: caller-facing conditions

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Provider Results
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Convenience type alias for Cache Results
pub type CacheResult<T> = Result<T, CacheError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for outbound HTTP Results
pub type NetworkResult<T> = Result<T, NetworkError>;
