//! SeaORM entities for the SQLite store

pub mod prelude;

pub mod channel_mappings;
pub mod channels;
pub mod programs;
