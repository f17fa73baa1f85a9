//! SeaORM-based channel repository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;

use crate::entities::{channels, prelude::Channels};
use crate::errors::RepositoryResult;
use crate::models::Channel;
use crate::repositories::ChannelRepository;

#[derive(Clone)]
pub struct ChannelSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ChannelSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    fn model_to_domain(model: channels::Model) -> Channel {
        Channel {
            id: model.id,
            channel_id: model.channel_id,
            display_name: model.display_name,
            category: model.category,
            area: model.area,
            logo_url: model.logo_url,
            regexp: model.regexp,
            timezone: model.timezone,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[async_trait]
impl ChannelRepository for ChannelSeaOrmRepository {
    async fn create(&self, channel: Channel) -> RepositoryResult<Channel> {
        let model = channels::ActiveModel {
            id: NotSet,
            channel_id: Set(channel.channel_id),
            display_name: Set(channel.display_name),
            category: Set(channel.category),
            area: Set(channel.area),
            logo_url: Set(channel.logo_url),
            regexp: Set(channel.regexp),
            timezone: Set(channel.timezone),
            is_active: Set(channel.is_active),
            created_at: Set(channel.created_at),
            updated_at: Set(channel.updated_at),
        }
        .insert(&*self.connection)
        .await?;
        Ok(Self::model_to_domain(model))
    }

    async fn upsert(&self, channel: Channel) -> RepositoryResult<Channel> {
        let existing = Channels::find()
            .filter(channels::Column::ChannelId.eq(channel.channel_id.as_str()))
            .one(&*self.connection)
            .await?;

        let now = Utc::now();
        let mut active_model = channels::ActiveModel {
            id: NotSet,
            channel_id: Set(channel.channel_id),
            display_name: Set(channel.display_name),
            category: Set(channel.category),
            area: Set(channel.area),
            logo_url: Set(channel.logo_url),
            regexp: Set(channel.regexp),
            timezone: Set(channel.timezone),
            is_active: Set(channel.is_active),
            created_at: Set(channel.created_at),
            updated_at: Set(now),
        };

        let model = match existing {
            Some(current) => {
                active_model.id = Set(current.id);
                active_model.created_at = Set(current.created_at);
                active_model.update(&*self.connection).await?
            }
            None => active_model.insert(&*self.connection).await?,
        };

        Ok(Self::model_to_domain(model))
    }

    async fn get_by_channel_id(&self, channel_id: &str) -> RepositoryResult<Option<Channel>> {
        let model = Channels::find()
            .filter(channels::Column::ChannelId.eq(channel_id))
            .one(&*self.connection)
            .await?;
        Ok(model.map(Self::model_to_domain))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<Channel>> {
        let models = Channels::find()
            .order_by_asc(channels::Column::ChannelId)
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        Ok(Channels::find().count(&*self.connection).await?)
    }

    async fn delete(&self, channel_id: &str) -> RepositoryResult<bool> {
        let result = Channels::delete_many()
            .filter(channels::Column::ChannelId.eq(channel_id))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
