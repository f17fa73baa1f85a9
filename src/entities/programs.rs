use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "programs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(indexed)]
    pub channel_id: String,
    pub title: String,
    pub description: String,
    #[sea_orm(indexed)]
    pub start_time: ChronoDateTimeUtc,
    #[sea_orm(indexed)]
    pub end_time: ChronoDateTimeUtc,
    pub category: String,
    #[sea_orm(indexed)]
    pub provider_id: String,
    pub provider_program_id: String,
    pub original_timezone: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
