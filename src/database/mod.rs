//! SeaORM-based database implementation
//!
//! SQLite is the primary target; PostgreSQL URLs are accepted and share the
//! same entity definitions. The schema is created from the entities on
//! connect, so a fresh file needs no separate migration step.

use anyhow::{Context, Result};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaOrmDatabase, DatabaseBackend,
    DatabaseConnection, EntityName, EntityTrait, Schema,
};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::entities::{channel_mappings, channels, programs};

pub mod repositories;

pub use repositories::{
    ChannelMappingSeaOrmRepository, ChannelSeaOrmRepository, ProgramSeaOrmRepository,
};

/// Database connection manager
#[derive(Clone)]
pub struct Database {
    pub connection: Arc<DatabaseConnection>,
    pub backend: DatabaseBackend,
    pub database_type: DatabaseType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    SQLite,
    PostgreSQL,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::SQLite => "SQLite",
            DatabaseType::PostgreSQL => "PostgreSQL",
        }
    }
}

impl Database {
    /// Connect and make sure every table and index exists
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let database_type = Self::detect_database_type(&config.url)?;
        let backend = match database_type {
            DatabaseType::SQLite => DatabaseBackend::Sqlite,
            DatabaseType::PostgreSQL => DatabaseBackend::Postgres,
        };

        info!("Connecting to {} database", database_type.as_str());

        let connection_url = match database_type {
            DatabaseType::SQLite => Self::ensure_sqlite_auto_creation(&config.url)?,
            DatabaseType::PostgreSQL => config.url.clone(),
        };

        let mut connect_options = ConnectOptions::new(&connection_url);
        connect_options
            .min_connections(1)
            .connect_timeout(Duration::from_secs(5))
            .acquire_timeout(Duration::from_secs(3))
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        if connection_url.contains(":memory:") {
            // Each pooled connection would otherwise see its own empty database
            connect_options.max_connections(1);
        } else {
            connect_options
                .max_connections(config.max_connections.unwrap_or(10))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800));
        }

        let connection = match SeaOrmDatabase::connect(connect_options).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Database connection failed: {:?}", e);
                let mut source = e.source();
                let mut level = 0;
                while let Some(err) = source {
                    tracing::error!("  Level {}: {}", level, err);
                    source = err.source();
                    level += 1;
                }
                return Err(anyhow::anyhow!(
                    "Failed to connect to database at '{}': {}",
                    &config.url,
                    e
                ));
            }
        };

        let database = Self {
            connection: Arc::new(connection),
            backend,
            database_type,
        };
        database.ensure_schema().await?;

        debug!("Database connection established successfully");
        Ok(database)
    }

    /// Create missing tables and indexes from the entity definitions
    pub async fn ensure_schema(&self) -> Result<()> {
        self.create_table(channels::Entity).await?;
        self.create_table(channel_mappings::Entity).await?;
        self.create_table(programs::Entity).await?;
        Ok(())
    }

    async fn create_table<E>(&self, entity: E) -> Result<()>
    where
        E: EntityTrait,
    {
        let schema = Schema::new(self.backend);
        let table = entity.table_name().to_string();

        let mut create = schema.create_table_from_entity(entity);
        create.if_not_exists();
        self.connection
            .execute(self.backend.build(&create))
            .await
            .with_context(|| format!("Failed to create table {table}"))?;

        for mut index in schema.create_index_from_entity(entity) {
            index.if_not_exists();
            self.connection
                .execute(self.backend.build(&index))
                .await
                .with_context(|| format!("Failed to create index on {table}"))?;
        }

        debug!("Schema ready for table {}", table);
        Ok(())
    }

    pub fn channel_repository(&self) -> ChannelSeaOrmRepository {
        ChannelSeaOrmRepository::new(self.connection.clone())
    }

    pub fn program_repository(&self) -> ProgramSeaOrmRepository {
        ProgramSeaOrmRepository::new(self.connection.clone())
    }

    pub fn channel_mapping_repository(&self) -> ChannelMappingSeaOrmRepository {
        ChannelMappingSeaOrmRepository::new(self.connection.clone())
    }

    /// Detect the database type from the URL
    fn detect_database_type(url: &str) -> Result<DatabaseType> {
        if url.starts_with("sqlite:") {
            Ok(DatabaseType::SQLite)
        } else if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            Ok(DatabaseType::PostgreSQL)
        } else {
            anyhow::bail!("Unsupported database URL format: {}", url);
        }
    }

    /// Ensure SQLite URL includes auto-creation mode if needed
    fn ensure_sqlite_auto_creation(url: &str) -> Result<String> {
        if url.contains(":memory:") {
            return Ok(url.to_string());
        }

        let file_path = if let Some(path) = url.strip_prefix("sqlite://") {
            path
        } else if let Some(path) = url.strip_prefix("sqlite:") {
            path
        } else {
            anyhow::bail!("Invalid SQLite URL format: {}", url);
        };
        let file_path = file_path.split('?').next().unwrap_or(file_path);

        let path = std::path::Path::new(file_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create directory for SQLite database: {}",
                        parent.display()
                    )
                })?;
                info!("Created directory for SQLite database: {}", parent.display());
            }
        }

        if url.contains("mode=") || path.exists() {
            return Ok(url.to_string());
        }

        let auto_create_url = if url.contains('?') {
            format!("{}&mode=rwc", url)
        } else {
            format!("{}?mode=rwc", url)
        };
        debug!("Enabled SQLite auto-creation: {}", auto_create_url);
        Ok(auto_create_url)
    }
}
