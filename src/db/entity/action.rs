use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// A single unit of browser work, materialized by the scheduler and
/// claimed by exactly one executor via the pending -> in_progress
/// conditional update.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub kind: String, // see enums::ActionKind
    pub target_url: Option<String>,
    pub payload: Option<String>,
    pub status: String, // see enums::ActionStatus
    pub priority: i32,
    pub scheduled_at: DateTimeUtc,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub started_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    pub result: Option<String>, // JSON outcome of the last successful run
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
