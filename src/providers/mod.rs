//! Upstream EPG providers
//!
//! - [`traits`]: the provider contract and [`FetchMode`]
//! - [`base`]: config, catalog, cache slot and HTTP client every adapter embeds
//! - [`batch`]: the bounded worker pool behind batch fetches
//! - [`registry`] / [`factory`]: type name to constructor, config to instance
//! - [`chain`]: priority fallback and provider-partitioned batch fetches
//! - [`adapters`]: built-in upstreams

pub mod adapters;
pub mod base;
pub mod batch;
pub mod chain;
pub mod factory;
pub mod http_client;
pub mod registry;
pub mod time_range;
pub mod traits;

pub use base::{EPG_CACHE_TTL, ProviderBase};
pub use batch::BatchOutcome;
pub use chain::ProviderChain;
pub use factory::ProviderFactory;
pub use registry::ProviderRegistry;
pub use traits::{FetchMode, ProgramsByDate, Provider};
