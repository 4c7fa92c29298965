use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaign_leads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub campaign_id: Uuid,
    /// Link back to the contact record the lead was imported from.
    pub contact_id: Option<Uuid>,
    pub profile_url: String,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub status: String, // see enums::LeadStatus
    /// Index into the campaign's step sequence; counts steps already
    /// materialized for this lead.
    pub current_step: i32,
    pub acceptance_checks: i32,
    pub error_count: i32,
    pub error_message: Option<String>,
    pub last_action_at: Option<DateTimeUtc>,
    /// When the lead becomes eligible for its next step. Null while an
    /// action is in flight or the lead is waiting on the other side.
    pub next_action_at: Option<DateTimeUtc>,
    pub replied_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
