//! SeaORM repository implementations of the traits in [`crate::repositories`]

pub mod channel;
pub mod channel_mapping;
pub mod program;

pub use channel::ChannelSeaOrmRepository;
pub use channel_mapping::ChannelMappingSeaOrmRepository;
pub use program::ProgramSeaOrmRepository;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::DatabaseConfig;
    use crate::database::Database;

    /// File-backed database in a scratch directory; keep the guard alive
    pub async fn create_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}/epg.db", dir.path().display()),
            max_connections: Some(2),
        };
        let database = Database::connect(&config).await.unwrap();
        (database, dir)
    }
}
