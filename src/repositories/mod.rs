//! Repository layer: traits consumed by the services plus in-memory backends
//!
//! SQLite implementations live in [`crate::database`].

pub mod memory;
pub mod traits;

pub use memory::{
    InMemoryChannelMappingRepository, InMemoryChannelRepository, InMemoryProgramRepository,
};
pub use traits::{ChannelMappingRepository, ChannelRepository, ProgramRepository};
