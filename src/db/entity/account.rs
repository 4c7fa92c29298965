use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// A platform account the engine drives. Session and credential blobs
/// are AES-GCM encrypted before they land in these columns.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: String,
    pub display_name: String,
    pub profile_url: Option<String>,
    pub status: String, // see enums::AccountStatus
    pub encrypted_session: Option<String>,
    pub encrypted_credentials: Option<String>,
    pub connections_today: i32,
    pub messages_today: i32,
    pub views_today: i32,
    pub daily_connection_limit: i32,
    pub daily_message_limit: i32,
    pub daily_view_limit: i32,
    pub counters_reset_on: Date,
    pub warming_up: bool,
    pub warmup_day: i32,
    pub last_verified_at: Option<DateTimeUtc>,
    pub last_synced_at: Option<DateTimeUtc>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub locked_at: Option<DateTimeUtc>,
    pub locked_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
