pub use super::channel_mappings::Entity as ChannelMappings;
pub use super::channels::Entity as Channels;
pub use super::programs::Entity as Programs;
