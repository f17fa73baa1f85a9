//! SeaORM-based program repository
//!
//! Window filters match on `start_time` inside `[window.start, window.end)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;

use crate::entities::{prelude::Programs, programs};
use crate::errors::RepositoryResult;
use crate::models::Program;
use crate::repositories::ProgramRepository;
use crate::utils::TimeWindow;

/// Rows per INSERT; keeps bound parameters under SQLite's limit
const INSERT_CHUNK_SIZE: usize = 500;

#[derive(Clone)]
pub struct ProgramSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ProgramSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    fn model_to_domain(model: programs::Model) -> Program {
        Program {
            id: model.id,
            channel_id: model.channel_id,
            title: model.title,
            description: model.description,
            start_time: model.start_time,
            end_time: model.end_time,
            category: model.category,
            provider_id: model.provider_id,
            provider_program_id: model.provider_program_id,
            original_timezone: model.original_timezone,
            created_at: model.created_at,
        }
    }

    fn domain_to_active(program: Program) -> programs::ActiveModel {
        programs::ActiveModel {
            id: NotSet,
            channel_id: Set(program.channel_id),
            title: Set(program.title),
            description: Set(program.description),
            start_time: Set(program.start_time),
            end_time: Set(program.end_time),
            category: Set(program.category),
            provider_id: Set(program.provider_id),
            provider_program_id: Set(program.provider_program_id),
            original_timezone: Set(program.original_timezone),
            created_at: Set(program.created_at),
        }
    }

    fn in_window(window: &TimeWindow) -> Condition {
        Condition::all()
            .add(programs::Column::StartTime.gte(window.start))
            .add(programs::Column::StartTime.lt(window.end))
    }
}

#[async_trait]
impl ProgramRepository for ProgramSeaOrmRepository {
    async fn create_batch(&self, programs: Vec<Program>) -> RepositoryResult<u64> {
        let mut written = 0u64;
        let mut rows = programs.into_iter().map(Self::domain_to_active).peekable();

        while rows.peek().is_some() {
            let chunk: Vec<_> = rows.by_ref().take(INSERT_CHUNK_SIZE).collect();
            let len = chunk.len() as u64;
            Programs::insert_many(chunk).exec(&*self.connection).await?;
            written += len;
        }

        Ok(written)
    }

    async fn exists(&self, channel_id: &str, window: TimeWindow) -> RepositoryResult<bool> {
        let count = Programs::find()
            .filter(programs::Column::ChannelId.eq(channel_id))
            .filter(Self::in_window(&window))
            .count(&*self.connection)
            .await?;
        Ok(count > 0)
    }

    async fn list_by_channel_and_time_range(
        &self,
        channel_id: &str,
        window: TimeWindow,
    ) -> RepositoryResult<Vec<Program>> {
        let models = Programs::find()
            .filter(programs::Column::ChannelId.eq(channel_id))
            .filter(Self::in_window(&window))
            .order_by_asc(programs::Column::StartTime)
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    async fn list_all_by_time_range(&self, window: TimeWindow) -> RepositoryResult<Vec<Program>> {
        let models = Programs::find()
            .filter(Self::in_window(&window))
            .order_by_asc(programs::Column::ChannelId)
            .order_by_asc(programs::Column::StartTime)
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    async fn current_program(
        &self,
        channel_id: &str,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Program>> {
        let model = Programs::find()
            .filter(programs::Column::ChannelId.eq(channel_id))
            .filter(programs::Column::StartTime.lte(at))
            .filter(programs::Column::EndTime.gt(at))
            .order_by_desc(programs::Column::StartTime)
            .one(&*self.connection)
            .await?;
        Ok(model.map(Self::model_to_domain))
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64> {
        let result = Programs::delete_many()
            .filter(programs::Column::EndTime.lt(cutoff))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete_by_date_and_provider(
        &self,
        window: TimeWindow,
        provider_id: &str,
    ) -> RepositoryResult<u64> {
        let result = Programs::delete_many()
            .filter(programs::Column::ProviderId.eq(provider_id))
            .filter(Self::in_window(&window))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repositories::test_support::create_test_db;
    use crate::utils::parse_date;
    use chrono::TimeZone;
    use chrono_tz::Asia::Shanghai;

    fn program(channel: &str, provider: &str, day: u32, hour: u32) -> Program {
        let start = Shanghai.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap();
        Program::new(channel, "Show", start, start + chrono::Duration::hours(1), provider)
    }

    #[tokio::test]
    async fn empty_batch_writes_nothing() {
        let (db, _dir) = create_test_db().await;
        let repo = db.program_repository();

        assert_eq!(repo.create_batch(Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn day_window_uses_local_midnight() {
        let (db, _dir) = create_test_db().await;
        let repo = db.program_repository();
        repo.create_batch(vec![
            program("CCTV1", "cctv", 1, 0),
            program("CCTV1", "cctv", 1, 23),
            program("CCTV1", "cctv", 2, 0),
        ])
        .await
        .unwrap();

        let day = TimeWindow::for_day(parse_date("2024-05-01").unwrap(), Shanghai);
        let listed = repo.list_by_channel_and_time_range("CCTV1", day).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].original_timezone, "Asia/Shanghai");
        assert!(listed[0].start_time < listed[1].start_time);
        assert!(repo.exists("CCTV1", day).await.unwrap());
        assert!(!repo.exists("CCTV2", day).await.unwrap());
    }

    #[tokio::test]
    async fn current_program_and_cleanup() {
        let (db, _dir) = create_test_db().await;
        let repo = db.program_repository();
        repo.create_batch(vec![
            program("CCTV1", "cctv", 1, 8),
            program("CCTV1", "cctv", 1, 9),
            program("CCTV1", "backup", 2, 9),
        ])
        .await
        .unwrap();

        let at = Shanghai.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let airing = repo
            .current_program("CCTV1", at.with_timezone(&Utc))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(airing.start_time, Shanghai.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());

        let day_two = TimeWindow::for_day(parse_date("2024-05-02").unwrap(), Shanghai);
        assert_eq!(repo.delete_by_date_and_provider(day_two, "cctv").await.unwrap(), 0);
        assert_eq!(repo.delete_by_date_and_provider(day_two, "backup").await.unwrap(), 1);

        let cutoff = Shanghai.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(repo.delete_before(cutoff.with_timezone(&Utc)).await.unwrap(), 1);
        let everything = TimeWindow::for_days(
            parse_date("2024-04-30").unwrap(),
            parse_date("2024-05-03").unwrap(),
            Shanghai,
        );
        assert_eq!(repo.list_all_by_time_range(everything).await.unwrap().len(), 1);
    }
}
