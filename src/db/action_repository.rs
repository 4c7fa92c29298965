use sea_orm::{
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    PaginatorTrait,
    QueryFilter,
    QueryOrder,
    QuerySelect,
    Set,
};
use sea_orm::ActiveModelTrait;
use sea_orm::sea_query::{ Expr, Query };
use uuid::Uuid;

use crate::db::entity::{ action, campaign_lead, Action };
use crate::enums::{ ActionKind, ActionStatus };
use crate::error::{ ErrorCode, Result };

pub struct NewAction {
    pub account_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub kind: ActionKind,
    pub target_url: Option<String>,
    pub payload: Option<String>,
    pub priority: i32,
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
    pub max_attempts: i32,
}

#[derive(Clone)]
pub struct ActionRepository {
    db: DatabaseConnection,
}

impl ActionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, new: NewAction) -> Result<action::Model> {
        let now = chrono::Utc::now();

        let model = action::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(new.account_id),
            lead_id: Set(new.lead_id),
            kind: Set(new.kind.as_str().to_string()),
            target_url: Set(new.target_url),
            payload: Set(new.payload),
            status: Set(ActionStatus::Pending.as_str().to_string()),
            priority: Set(new.priority),
            scheduled_at: Set(new.scheduled_at),
            attempt_count: Set(0),
            max_attempts: Set(new.max_attempts),
            started_at: Set(None),
            completed_at: Set(None),
            result: Set(None),
            error_code: Set(None),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let action = model.insert(&self.db).await?;
        Ok(action)
    }

    /// Accounts that currently have runnable work, used to fan the
    /// executor cycle out per account.
    pub async fn account_ids_with_due(
        &self,
        now: chrono::DateTime<chrono::Utc>
    ) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = Action::find()
            .select_only()
            .column(action::Column::AccountId)
            .distinct()
            .filter(action::Column::Status.eq(ActionStatus::Pending.as_str()))
            .filter(action::Column::ScheduledAt.lte(now))
            .into_tuple()
            .all(&self.db).await?;

        Ok(ids)
    }

    /// Due work for one account, highest priority first, oldest
    /// schedule first within a priority.
    pub async fn due_for_account(
        &self,
        account_id: Uuid,
        now: chrono::DateTime<chrono::Utc>,
        limit: u64
    ) -> Result<Vec<action::Model>> {
        let actions = Action::find()
            .filter(action::Column::AccountId.eq(account_id))
            .filter(action::Column::Status.eq(ActionStatus::Pending.as_str()))
            .filter(action::Column::ScheduledAt.lte(now))
            .order_by_desc(action::Column::Priority)
            .order_by_asc(action::Column::ScheduledAt)
            .limit(limit)
            .all(&self.db).await?;

        Ok(actions)
    }

    /// Conditional pending -> in_progress transition. Exactly one
    /// caller can win; everyone else sees false and moves on. The
    /// attempt counter rides along so a crash after the claim still
    /// counts as a consumed attempt.
    pub async fn claim(&self, id: Uuid, now: chrono::DateTime<chrono::Utc>) -> Result<bool> {
        let result = action::Entity
            ::update_many()
            .col_expr(
                action::Column::Status,
                Expr::value(ActionStatus::InProgress.as_str())
            )
            .col_expr(action::Column::StartedAt, Expr::value(now))
            .col_expr(
                action::Column::AttemptCount,
                Expr::col(action::Column::AttemptCount).add(1)
            )
            .col_expr(action::Column::UpdatedAt, Expr::value(now))
            .filter(action::Column::Id.eq(id))
            .filter(action::Column::Status.eq(ActionStatus::Pending.as_str()))
            .exec(&self.db).await?;

        Ok(result.rows_affected == 1)
    }

    pub async fn complete(
        &self,
        id: Uuid,
        result_json: Option<String>,
        now: chrono::DateTime<chrono::Utc>
    ) -> Result<()> {
        action::Entity
            ::update_many()
            .col_expr(
                action::Column::Status,
                Expr::value(ActionStatus::Completed.as_str())
            )
            .col_expr(action::Column::CompletedAt, Expr::value(now))
            .col_expr(action::Column::Result, Expr::value(result_json))
            .col_expr(action::Column::ErrorCode, Expr::value(None::<String>))
            .col_expr(action::Column::ErrorMessage, Expr::value(None::<String>))
            .col_expr(action::Column::UpdatedAt, Expr::value(now))
            .filter(action::Column::Id.eq(id))
            .exec(&self.db).await?;

        Ok(())
    }

    pub async fn fail(
        &self,
        id: Uuid,
        code: ErrorCode,
        message: &str,
        now: chrono::DateTime<chrono::Utc>
    ) -> Result<()> {
        action::Entity
            ::update_many()
            .col_expr(action::Column::Status, Expr::value(ActionStatus::Failed.as_str()))
            .col_expr(action::Column::CompletedAt, Expr::value(now))
            .col_expr(action::Column::ErrorCode, Expr::value(code.as_str()))
            .col_expr(action::Column::ErrorMessage, Expr::value(message))
            .col_expr(action::Column::UpdatedAt, Expr::value(now))
            .filter(action::Column::Id.eq(id))
            .exec(&self.db).await?;

        Ok(())
    }

    /// A claimed action whose lead left the sequence in the meantime.
    /// Nothing ran against the page, so there is no result to record.
    pub async fn skip(&self, id: Uuid, now: chrono::DateTime<chrono::Utc>) -> Result<()> {
        action::Entity
            ::update_many()
            .col_expr(action::Column::Status, Expr::value(ActionStatus::Skipped.as_str()))
            .col_expr(action::Column::CompletedAt, Expr::value(now))
            .col_expr(action::Column::UpdatedAt, Expr::value(now))
            .filter(action::Column::Id.eq(id))
            .exec(&self.db).await?;

        Ok(())
    }

    /// Put a failed attempt back in the queue for a later retry. The
    /// attempt count stays as consumed; only the schedule moves.
    pub async fn reschedule(
        &self,
        id: Uuid,
        next_at: chrono::DateTime<chrono::Utc>,
        code: ErrorCode,
        message: &str,
        now: chrono::DateTime<chrono::Utc>
    ) -> Result<()> {
        action::Entity
            ::update_many()
            .col_expr(action::Column::Status, Expr::value(ActionStatus::Pending.as_str()))
            .col_expr(action::Column::ScheduledAt, Expr::value(next_at))
            .col_expr(action::Column::ErrorCode, Expr::value(code.as_str()))
            .col_expr(action::Column::ErrorMessage, Expr::value(message))
            .col_expr(action::Column::UpdatedAt, Expr::value(now))
            .filter(action::Column::Id.eq(id))
            .exec(&self.db).await?;

        Ok(())
    }

    /// Push a claimed action back untouched. Used when the account ran
    /// out of quota or the platform throttled us: the attempt is also
    /// returned, because nothing was actually tried against the page.
    pub async fn defer(
        &self,
        id: Uuid,
        next_at: chrono::DateTime<chrono::Utc>,
        now: chrono::DateTime<chrono::Utc>
    ) -> Result<()> {
        action::Entity
            ::update_many()
            .col_expr(action::Column::Status, Expr::value(ActionStatus::Pending.as_str()))
            .col_expr(action::Column::ScheduledAt, Expr::value(next_at))
            .col_expr(
                action::Column::AttemptCount,
                Expr::col(action::Column::AttemptCount).sub(1)
            )
            .col_expr(action::Column::UpdatedAt, Expr::value(now))
            .filter(action::Column::Id.eq(id))
            .exec(&self.db).await?;

        Ok(())
    }

    /// Cancel still-pending work for a lead. With `kinds` set, only
    /// those kinds are touched (e.g. dropping queued follow-up
    /// messages once the lead replied).
    pub async fn cancel_pending_for_lead(
        &self,
        lead_id: Uuid,
        kinds: Option<&[ActionKind]>,
        now: chrono::DateTime<chrono::Utc>
    ) -> Result<u64> {
        let mut query = action::Entity
            ::update_many()
            .col_expr(
                action::Column::Status,
                Expr::value(ActionStatus::Cancelled.as_str())
            )
            .col_expr(action::Column::UpdatedAt, Expr::value(now))
            .filter(action::Column::LeadId.eq(lead_id))
            .filter(action::Column::Status.eq(ActionStatus::Pending.as_str()));

        if let Some(kinds) = kinds {
            let kind_strs: Vec<&str> = kinds
                .iter()
                .map(|k| k.as_str())
                .collect();
            query = query.filter(action::Column::Kind.is_in(kind_strs));
        }

        let result = query.exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    /// Cancel pending work for every lead of a campaign in one
    /// statement, used when a campaign is paused or archived.
    pub async fn cancel_pending_for_campaign(
        &self,
        campaign_id: Uuid,
        now: chrono::DateTime<chrono::Utc>
    ) -> Result<u64> {
        let leads_of_campaign = Query::select()
            .column(campaign_lead::Column::Id)
            .from(campaign_lead::Entity)
            .and_where(campaign_lead::Column::CampaignId.eq(campaign_id))
            .to_owned();

        let result = action::Entity
            ::update_many()
            .col_expr(
                action::Column::Status,
                Expr::value(ActionStatus::Cancelled.as_str())
            )
            .col_expr(action::Column::UpdatedAt, Expr::value(now))
            .filter(action::Column::LeadId.in_subquery(leads_of_campaign))
            .filter(action::Column::Status.eq(ActionStatus::Pending.as_str()))
            .exec(&self.db).await?;

        Ok(result.rows_affected)
    }

    /// Whether the lead already has queued or running work. The
    /// scheduler uses this to avoid materializing a step twice.
    pub async fn has_open_for_lead(&self, lead_id: Uuid) -> Result<bool> {
        let count = Action::find()
            .filter(action::Column::LeadId.eq(lead_id))
            .filter(
                action::Column::Status.is_in([
                    ActionStatus::Pending.as_str(),
                    ActionStatus::InProgress.as_str(),
                ])
            )
            .count(&self.db).await?;

        Ok(count > 0)
    }

    pub async fn has_open_sync(&self, account_id: Uuid) -> Result<bool> {
        let count = Action::find()
            .filter(action::Column::AccountId.eq(account_id))
            .filter(action::Column::Kind.eq(ActionKind::SyncMessages.as_str()))
            .filter(
                action::Column::Status.is_in([
                    ActionStatus::Pending.as_str(),
                    ActionStatus::InProgress.as_str(),
                ])
            )
            .count(&self.db).await?;

        Ok(count > 0)
    }

    /// How many sequence-step actions a campaign has had materialized
    /// since `since`. Engine bookkeeping (acceptance checks, inbox
    /// syncs) does not count against the campaign's daily cap.
    pub async fn count_steps_for_campaign_since(
        &self,
        campaign_id: Uuid,
        since: chrono::DateTime<chrono::Utc>
    ) -> Result<u64> {
        let leads_of_campaign = Query::select()
            .column(campaign_lead::Column::Id)
            .from(campaign_lead::Entity)
            .and_where(campaign_lead::Column::CampaignId.eq(campaign_id))
            .to_owned();

        let count = Action::find()
            .filter(action::Column::LeadId.in_subquery(leads_of_campaign))
            .filter(
                action::Column::Kind.is_in([
                    ActionKind::ProfileView.as_str(),
                    ActionKind::ConnectionRequest.as_str(),
                    ActionKind::Message.as_str(),
                ])
            )
            .filter(action::Column::CreatedAt.gte(since))
            .count(&self.db).await?;

        Ok(count)
    }
}
