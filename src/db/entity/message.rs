use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// A conversation message observed or sent by the engine. The dedup
/// key is unique, so re-syncing the same inbox window is idempotent.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub thread_id: String,
    pub direction: String, // see enums::MessageDirection
    pub body: String,
    pub sent_at: DateTimeUtc,
    #[sea_orm(unique)]
    pub dedup_key: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
