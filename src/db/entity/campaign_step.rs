use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// One position in a campaign's ordered sequence. The delay is how
/// long to wait after the previous step completed for a lead.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaign_steps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub step_order: i32,
    pub kind: String, // see enums::ActionKind, step kinds only
    pub delay_days: i32,
    pub delay_hours: i32,
    pub template: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
