use chrono::{ Duration, Utc };
use sea_orm::{
    ActiveModelTrait,
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    QueryFilter,
    Set,
    TransactionTrait,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::automation::{ AcceptanceOutcome, ConnectionOutcome, ProfileData };
use crate::db::entity::{ action, campaign_lead };
use crate::db::{ ActionRepository, CampaignRepository, NewAction };
use crate::enums::{ ActionKind, ActionStatus, LeadStatus };
use crate::error::Result;

/// An invitation is abandoned once this many acceptance checks came
/// back empty (roughly two weeks on the backoff ladder).
pub const MAX_ACCEPTANCE_CHECKS: i32 = 21;

const ACTION_MAX_ATTEMPTS: i32 = 3;

/// How long to wait before looking at an unanswered invitation again.
/// Early checks are frequent; stale invitations get checked daily.
pub fn acceptance_backoff(checks_done: i32) -> Duration {
    match checks_done {
        i32::MIN..=2 => Duration::hours(4),
        3..=5 => Duration::hours(12),
        _ => Duration::hours(24),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckVerdict {
    RetryIn(Duration),
    GiveUp,
}

/// Decide what to do after an acceptance check found the invitation
/// still unanswered. `checks_done` includes the check that just ran.
pub(crate) fn next_check_verdict(checks_done: i32) -> CheckVerdict {
    if checks_done >= MAX_ACCEPTANCE_CHECKS {
        CheckVerdict::GiveUp
    } else {
        CheckVerdict::RetryIn(acceptance_backoff(checks_done))
    }
}

/// Where a lead lands when its sequence runs out of steps.
pub(crate) fn sequence_end_status(current: LeadStatus) -> LeadStatus {
    if current == LeadStatus::Messaged {
        LeadStatus::AwaitingReply
    } else {
        LeadStatus::Completed
    }
}

/// Advances each lead through the outreach sequence as action results
/// come back from the browser.
///
/// A lead with `next_action_at` set is due for the scheduler to
/// materialize its next step; a lead without one is either waiting on
/// an engine-owned follow-up (acceptance checks) or resting in a
/// terminal-ish state.
#[derive(Clone)]
pub struct LeadService {
    db: DatabaseConnection,
    actions: ActionRepository,
    campaigns: CampaignRepository,
}

impl LeadService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            actions: ActionRepository::new(db.clone()),
            campaigns: CampaignRepository::new(db.clone()),
            db,
        }
    }

    /// Profile view succeeded: refresh the stored snapshot. An already
    /// connected profile short-circuits the invitation steps entirely.
    pub async fn record_profile_viewed(
        &self,
        lead: campaign_lead::Model,
        profile: &ProfileData
    ) -> Result<campaign_lead::Model> {
        let now = Utc::now();
        let status = if profile.is_connected {
            LeadStatus::Connected
        } else {
            LeadStatus::CheckingProfile
        };

        let mut model: campaign_lead::ActiveModel = lead.into();
        if profile.full_name.is_some() {
            model.full_name = Set(profile.full_name.clone());
        }
        if profile.headline.is_some() {
            model.headline = Set(profile.headline.clone());
        }
        model.status = Set(status.to_string());
        model.last_action_at = Set(Some(now));
        model.next_action_at = Set(Some(now));
        model.updated_at = Set(now);

        Ok(model.update(&self.db).await?)
    }

    /// Connection request finished. A fresh invitation puts the lead
    /// into the acceptance-polling loop; an existing connection skips
    /// straight ahead.
    pub async fn record_connection_requested(
        &self,
        lead: campaign_lead::Model,
        account_id: Uuid,
        outcome: &ConnectionOutcome
    ) -> Result<campaign_lead::Model> {
        let now = Utc::now();

        if !outcome.already_connected {
            self.campaigns.bump_sent(lead.campaign_id).await?;
        }

        if outcome.already_connected {
            let mut model: campaign_lead::ActiveModel = lead.into();
            model.status = Set(LeadStatus::Connected.to_string());
            model.last_action_at = Set(Some(now));
            model.next_action_at = Set(Some(now));
            model.updated_at = Set(now);
            return Ok(model.update(&self.db).await?);
        }

        let check = NewAction {
            account_id,
            lead_id: Some(lead.id),
            kind: ActionKind::CheckAcceptance,
            target_url: Some(lead.profile_url.clone()),
            payload: None,
            priority: 0,
            scheduled_at: now + acceptance_backoff(0),
            max_attempts: ACTION_MAX_ATTEMPTS,
        };

        let mut model: campaign_lead::ActiveModel = lead.into();
        model.status = Set(LeadStatus::ConnectionSent.to_string());
        model.last_action_at = Set(Some(now));
        model.next_action_at = Set(None);
        model.updated_at = Set(now);
        let lead = model.update(&self.db).await?;

        self.actions.create(check).await?;
        Ok(lead)
    }

    /// Acceptance check came back. Connected leads move on to the next
    /// step; unanswered invitations climb the backoff ladder until the
    /// give-up threshold.
    pub async fn record_acceptance_check(
        &self,
        lead: campaign_lead::Model,
        account_id: Uuid,
        outcome: &AcceptanceOutcome
    ) -> Result<campaign_lead::Model> {
        let now = Utc::now();

        if outcome.is_connected {
            self.campaigns.bump_accepted(lead.campaign_id).await?;

            let mut model: campaign_lead::ActiveModel = lead.into();
            model.status = Set(LeadStatus::Connected.to_string());
            model.last_action_at = Set(Some(now));
            model.next_action_at = Set(Some(now));
            model.updated_at = Set(now);
            return Ok(model.update(&self.db).await?);
        }

        let checks_done = lead.acceptance_checks + 1;
        match next_check_verdict(checks_done) {
            CheckVerdict::GiveUp => {
                let mut model: campaign_lead::ActiveModel = lead.into();
                model.status = Set(LeadStatus::Failed.to_string());
                model.acceptance_checks = Set(checks_done);
                model.error_message = Set(
                    Some(format!("invitation unanswered after {} checks", checks_done))
                );
                model.last_action_at = Set(Some(now));
                model.next_action_at = Set(None);
                model.updated_at = Set(now);
                Ok(model.update(&self.db).await?)
            }
            CheckVerdict::RetryIn(delay) => {
                let check = NewAction {
                    account_id,
                    lead_id: Some(lead.id),
                    kind: ActionKind::CheckAcceptance,
                    target_url: Some(lead.profile_url.clone()),
                    payload: None,
                    priority: 0,
                    scheduled_at: now + delay,
                    max_attempts: ACTION_MAX_ATTEMPTS,
                };

                let mut model: campaign_lead::ActiveModel = lead.into();
                model.status = Set(LeadStatus::AwaitingAccept.to_string());
                model.acceptance_checks = Set(checks_done);
                model.last_action_at = Set(Some(now));
                model.next_action_at = Set(None);
                model.updated_at = Set(now);
                let lead = model.update(&self.db).await?;

                self.actions.create(check).await?;
                Ok(lead)
            }
        }
    }

    /// Message delivered. The scheduler decides on the next due pass
    /// whether a follow-up step exists or the lead settles into
    /// waiting for a reply.
    pub async fn record_message_sent(
        &self,
        lead: campaign_lead::Model
    ) -> Result<campaign_lead::Model> {
        let now = Utc::now();

        let mut model: campaign_lead::ActiveModel = lead.into();
        model.status = Set(LeadStatus::Messaged.to_string());
        model.last_action_at = Set(Some(now));
        model.next_action_at = Set(Some(now));
        model.updated_at = Set(now);

        Ok(model.update(&self.db).await?)
    }

    /// A real reply trumps the scripted sequence: queued follow-up
    /// messages are dropped and the lead leaves the pipeline.
    pub async fn mark_replied(&self, lead: campaign_lead::Model) -> Result<campaign_lead::Model> {
        let status = lead.status.parse::<LeadStatus>().unwrap_or(LeadStatus::Pending);
        if !matches!(status, LeadStatus::Messaged | LeadStatus::AwaitingReply) {
            return Ok(lead);
        }

        let now = Utc::now();
        let lead_id = lead.id;
        let campaign_id = lead.campaign_id;

        let mut model: campaign_lead::ActiveModel = lead.into();
        model.status = Set(LeadStatus::Replied.to_string());
        model.replied_at = Set(Some(now));
        model.next_action_at = Set(None);
        model.updated_at = Set(now);
        let lead = model.update(&self.db).await?;

        self.actions.cancel_pending_for_lead(lead_id, Some(&[ActionKind::Message]), now).await?;
        self.campaigns.bump_replied(campaign_id).await?;

        Ok(lead)
    }

    /// Pull a lead out of the sequence by hand. Its queued work is
    /// cancelled in the same transaction, so a skipped lead never
    /// leaves claimable rows behind.
    pub async fn skip(&self, lead: campaign_lead::Model) -> Result<campaign_lead::Model> {
        let now = Utc::now();
        let lead_id = lead.id;

        let txn = self.db.begin().await?;

        let mut model: campaign_lead::ActiveModel = lead.into();
        model.status = Set(LeadStatus::Skipped.to_string());
        model.next_action_at = Set(None);
        model.updated_at = Set(now);
        let lead = model.update(&txn).await?;

        action::Entity
            ::update_many()
            .col_expr(action::Column::Status, Expr::value(ActionStatus::Cancelled.as_str()))
            .col_expr(action::Column::UpdatedAt, Expr::value(now))
            .filter(action::Column::LeadId.eq(lead_id))
            .filter(action::Column::Status.eq(ActionStatus::Pending.as_str()))
            .exec(&txn).await?;

        txn.commit().await?;
        Ok(lead)
    }

    /// One step was just materialized for this lead: point it at the
    /// following step and stop counting it as due until the executor
    /// reports back.
    pub async fn advance_step(&self, lead: campaign_lead::Model) -> Result<campaign_lead::Model> {
        let current_step = lead.current_step + 1;

        let mut model: campaign_lead::ActiveModel = lead.into();
        model.current_step = Set(current_step);
        model.next_action_at = Set(None);
        model.updated_at = Set(Utc::now());

        Ok(model.update(&self.db).await?)
    }

    /// A due lead with no step left. A sequence that ended on a
    /// message keeps listening for replies; anything else is done.
    pub async fn settle_sequence_end(
        &self,
        lead: campaign_lead::Model
    ) -> Result<campaign_lead::Model> {
        let status = lead.status.parse::<LeadStatus>().unwrap_or(LeadStatus::Pending);
        let settled = sequence_end_status(status);

        let mut model: campaign_lead::ActiveModel = lead.into();
        model.status = Set(settled.to_string());
        model.next_action_at = Set(None);
        model.updated_at = Set(Utc::now());

        Ok(model.update(&self.db).await?)
    }

    /// Hard failure: the lead leaves the pipeline with the reason
    /// attached.
    pub async fn fail(
        &self,
        lead: campaign_lead::Model,
        message: &str
    ) -> Result<campaign_lead::Model> {
        let now = Utc::now();
        let error_count = lead.error_count + 1;

        let mut model: campaign_lead::ActiveModel = lead.into();
        model.status = Set(LeadStatus::Failed.to_string());
        model.error_count = Set(error_count);
        model.error_message = Set(Some(message.to_string()));
        model.next_action_at = Set(None);
        model.updated_at = Set(now);

        Ok(model.update(&self.db).await?)
    }

    /// Action-level failure: note it on the lead and leave the status
    /// alone so the sequence can resume after manual review or retry.
    pub async fn record_failure(
        &self,
        lead: campaign_lead::Model,
        message: &str
    ) -> Result<campaign_lead::Model> {
        let now = Utc::now();
        let error_count = lead.error_count + 1;

        let mut model: campaign_lead::ActiveModel = lead.into();
        model.error_count = Set(error_count);
        model.error_message = Set(Some(message.to_string()));
        model.updated_at = Set(now);

        Ok(model.update(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptance_backoff_ladder() {
        assert_eq!(acceptance_backoff(0), Duration::hours(4));
        assert_eq!(acceptance_backoff(2), Duration::hours(4));
        assert_eq!(acceptance_backoff(3), Duration::hours(12));
        assert_eq!(acceptance_backoff(5), Duration::hours(12));
        assert_eq!(acceptance_backoff(6), Duration::hours(24));
        assert_eq!(acceptance_backoff(20), Duration::hours(24));
    }

    #[test]
    fn test_check_verdict_gives_up_at_threshold() {
        assert_eq!(next_check_verdict(20), CheckVerdict::RetryIn(Duration::hours(24)));
        assert_eq!(next_check_verdict(21), CheckVerdict::GiveUp);
        assert_eq!(next_check_verdict(25), CheckVerdict::GiveUp);
    }

    #[test]
    fn test_check_verdict_early_checks_are_frequent() {
        assert_eq!(next_check_verdict(1), CheckVerdict::RetryIn(Duration::hours(4)));
        assert_eq!(next_check_verdict(4), CheckVerdict::RetryIn(Duration::hours(12)));
        assert_eq!(next_check_verdict(7), CheckVerdict::RetryIn(Duration::hours(24)));
    }

    #[test]
    fn test_sequence_end_keeps_messaged_leads_listening() {
        assert_eq!(sequence_end_status(LeadStatus::Messaged), LeadStatus::AwaitingReply);
        assert_eq!(sequence_end_status(LeadStatus::Connected), LeadStatus::Completed);
        assert_eq!(sequence_end_status(LeadStatus::CheckingProfile), LeadStatus::Completed);
    }
}
