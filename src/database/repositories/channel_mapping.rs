//! SeaORM-based channel mapping repository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;

use crate::entities::{channel_mappings, prelude::ChannelMappings};
use crate::errors::RepositoryResult;
use crate::models::ChannelMapping;
use crate::repositories::ChannelMappingRepository;

#[derive(Clone)]
pub struct ChannelMappingSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ChannelMappingSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    fn model_to_domain(model: channel_mappings::Model) -> ChannelMapping {
        ChannelMapping {
            id: model.id,
            canonical_id: model.canonical_id,
            provider_id: model.provider_id,
            provider_channel_id: model.provider_channel_id,
            provider_channel_name: model.provider_channel_name,
            confidence: model.confidence,
            is_verified: model.is_verified,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    fn models_to_domain(models: Vec<channel_mappings::Model>) -> Vec<ChannelMapping> {
        models.into_iter().map(Self::model_to_domain).collect()
    }
}

#[async_trait]
impl ChannelMappingRepository for ChannelMappingSeaOrmRepository {
    async fn create(&self, mapping: ChannelMapping) -> RepositoryResult<ChannelMapping> {
        let txn = self.connection.begin().await?;

        ChannelMappings::delete_many()
            .filter(channel_mappings::Column::ProviderId.eq(mapping.provider_id.as_str()))
            .filter(
                channel_mappings::Column::ProviderChannelId
                    .eq(mapping.provider_channel_id.as_str()),
            )
            .exec(&txn)
            .await?;

        let model = channel_mappings::ActiveModel {
            id: NotSet,
            canonical_id: Set(mapping.canonical_id),
            provider_id: Set(mapping.provider_id),
            provider_channel_id: Set(mapping.provider_channel_id),
            provider_channel_name: Set(mapping.provider_channel_name),
            confidence: Set(mapping.confidence),
            is_verified: Set(mapping.is_verified),
            created_at: Set(mapping.created_at),
            updated_at: Set(mapping.updated_at),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(Self::model_to_domain(model))
    }

    async fn find_by_provider_channel(
        &self,
        provider_id: &str,
        provider_channel_id: &str,
    ) -> RepositoryResult<Option<ChannelMapping>> {
        let model = ChannelMappings::find()
            .filter(channel_mappings::Column::ProviderId.eq(provider_id))
            .filter(channel_mappings::Column::ProviderChannelId.eq(provider_channel_id))
            .one(&*self.connection)
            .await?;
        Ok(model.map(Self::model_to_domain))
    }

    async fn list_by_canonical_id(
        &self,
        canonical_id: &str,
    ) -> RepositoryResult<Vec<ChannelMapping>> {
        let models = ChannelMappings::find()
            .filter(channel_mappings::Column::CanonicalId.eq(canonical_id))
            .order_by_asc(channel_mappings::Column::Id)
            .all(&*self.connection)
            .await?;
        Ok(Self::models_to_domain(models))
    }

    async fn list_by_provider(&self, provider_id: &str) -> RepositoryResult<Vec<ChannelMapping>> {
        let models = ChannelMappings::find()
            .filter(channel_mappings::Column::ProviderId.eq(provider_id))
            .order_by_asc(channel_mappings::Column::Id)
            .all(&*self.connection)
            .await?;
        Ok(Self::models_to_domain(models))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<ChannelMapping>> {
        let models = ChannelMappings::find()
            .order_by_asc(channel_mappings::Column::Id)
            .all(&*self.connection)
            .await?;
        Ok(Self::models_to_domain(models))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repositories::test_support::create_test_db;
    use crate::models::ProviderChannel;

    #[tokio::test]
    async fn create_replaces_the_same_provider_channel() {
        let (db, _dir) = create_test_db().await;
        let repo = db.channel_mapping_repository();
        let channel = ProviderChannel::new("cctv1", "CCTV-1 综合");

        repo.create(ChannelMapping::new("CCTV1", "cctv", &channel, 1.0))
            .await
            .unwrap();
        repo.create(ChannelMapping::new("CCTV1HD", "cctv", &channel, 0.9))
            .await
            .unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].canonical_id, "CCTV1HD");

        let found = repo
            .find_by_provider_channel("cctv", "cctv1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.confidence, 0.9);
    }

    #[tokio::test]
    async fn lists_by_canonical_and_provider() {
        let (db, _dir) = create_test_db().await;
        let repo = db.channel_mapping_repository();
        let cctv = ProviderChannel::new("cctv1", "CCTV-1");
        let backup = ProviderChannel::new("c1", "CCTV1");

        repo.create(ChannelMapping::new("CCTV1", "cctv", &cctv, 1.0))
            .await
            .unwrap();
        repo.create(ChannelMapping::new("CCTV1", "backup", &backup, 0.8))
            .await
            .unwrap();

        assert_eq!(repo.list_by_canonical_id("CCTV1").await.unwrap().len(), 2);
        let backup_only = repo.list_by_provider("backup").await.unwrap();
        assert_eq!(backup_only.len(), 1);
        assert_eq!(backup_only[0].provider_channel_id, "c1");
        assert!(repo
            .find_by_provider_channel("cctv", "missing")
            .await
            .unwrap()
            .is_none());
    }
}
