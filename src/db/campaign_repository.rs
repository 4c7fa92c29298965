use sea_orm::{
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    QueryFilter,
    QueryOrder,
    QuerySelect,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::db::entity::{ campaign, campaign_lead, campaign_step, Campaign, CampaignLead, CampaignStep };
use crate::enums::{ CampaignStatus, LeadStatus };
use crate::error::Result;

#[derive(Clone)]
pub struct CampaignRepository {
    db: DatabaseConnection,
}

impl CampaignRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<campaign::Model>> {
        let campaign = Campaign::find_by_id(id).one(&self.db).await?;
        Ok(campaign)
    }

    pub async fn find_by_status(
        &self,
        status: CampaignStatus
    ) -> Result<Vec<campaign::Model>> {
        let campaigns = Campaign::find()
            .filter(campaign::Column::Status.eq(status.as_str()))
            .all(&self.db).await?;

        Ok(campaigns)
    }

    /// Sequence steps in execution order.
    pub async fn steps_for(&self, campaign_id: Uuid) -> Result<Vec<campaign_step::Model>> {
        let steps = CampaignStep::find()
            .filter(campaign_step::Column::CampaignId.eq(campaign_id))
            .order_by_asc(campaign_step::Column::StepOrder)
            .all(&self.db).await?;

        Ok(steps)
    }

    /// Leads of this campaign whose next step is due. Oldest due
    /// first, so a starved campaign drains in arrival order.
    pub async fn due_leads(
        &self,
        campaign_id: Uuid,
        now: chrono::DateTime<chrono::Utc>,
        limit: u64
    ) -> Result<Vec<campaign_lead::Model>> {
        let terminal: Vec<&str> = [
            LeadStatus::Replied,
            LeadStatus::Completed,
            LeadStatus::Failed,
            LeadStatus::Skipped,
        ]
            .iter()
            .map(|s| s.as_str())
            .collect();

        let leads = CampaignLead::find()
            .filter(campaign_lead::Column::CampaignId.eq(campaign_id))
            .filter(campaign_lead::Column::Status.is_not_in(terminal))
            .filter(campaign_lead::Column::NextActionAt.lte(now))
            .order_by_asc(campaign_lead::Column::NextActionAt)
            .limit(limit)
            .all(&self.db).await?;

        Ok(leads)
    }

    pub async fn bump_sent(&self, id: Uuid) -> Result<()> {
        self.bump(id, campaign::Column::SentCount).await
    }

    pub async fn bump_accepted(&self, id: Uuid) -> Result<()> {
        self.bump(id, campaign::Column::AcceptedCount).await
    }

    pub async fn bump_replied(&self, id: Uuid) -> Result<()> {
        self.bump(id, campaign::Column::RepliedCount).await
    }

    // Increment done in SQL so concurrent workers never lose a count.
    async fn bump(&self, id: Uuid, column: campaign::Column) -> Result<()> {
        campaign::Entity
            ::update_many()
            .col_expr(column, Expr::col(column).add(1))
            .col_expr(campaign::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(campaign::Column::Id.eq(id))
            .exec(&self.db).await?;

        Ok(())
    }
}
