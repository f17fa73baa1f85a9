//! HTTP handlers, grouped by resource

pub mod channels;
pub mod epg;
pub mod export;
pub mod health;
pub mod mappings;
pub mod providers;
pub mod scheduler;
