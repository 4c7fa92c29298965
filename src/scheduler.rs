use chrono::{ DateTime, Duration as Delay, NaiveTime, Utc };
use sea_orm::DatabaseConnection;
use tokio::sync::watch;
use tokio::time::{ interval, Duration, MissedTickBehavior };

use crate::config::Config;
use crate::db::entity::{ account, campaign, campaign_lead, campaign_step };
use crate::db::{ AccountRepository, ActionRepository, CampaignRepository, NewAction };
use crate::enums::{ AccountStatus, ActionKind, CampaignStatus };
use crate::error::{ AppError, Result };
use crate::services::LeadService;

/// Inbox syncs yield to campaign steps inside an account batch.
pub(crate) const SYNC_PRIORITY: i32 = -10;

const ACTION_MAX_ATTEMPTS: i32 = 3;

/// Upper bound on step materializations per campaign per cycle, so one
/// huge lead import cannot monopolize a scheduling pass.
const CYCLE_PAGE: u64 = 100;

/// Substitute lead fields into a step template. An unnamed lead gets a
/// neutral salutation instead of a visible placeholder.
pub(crate) fn render_template(template: &str, full_name: Option<&str>) -> String {
    let full = full_name.unwrap_or("").trim();
    let full = if full.is_empty() { "there" } else { full };
    let first = full.split_whitespace().next().unwrap_or(full);

    template.replace("{first_name}", first).replace("{full_name}", full)
}

pub(crate) fn step_delay(step: &campaign_step::Model) -> Delay {
    Delay::days(step.delay_days.max(0) as i64) + Delay::hours(step.delay_hours.max(0) as i64)
}

fn midnight_utc(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Turns due leads into concrete browser work on a fixed cadence.
///
/// Each cycle: drop queued work for campaigns that left the ACTIVE
/// state, materialize the next step for every due lead within each
/// campaign's daily cap, and keep one inbox-sync action queued per
/// connected account.
pub struct CampaignScheduler {
    accounts: AccountRepository,
    campaigns: CampaignRepository,
    actions: ActionRepository,
    leads: LeadService,
    interval_secs: u64,
    sync_cadence: Delay,
}

impl CampaignScheduler {
    pub fn new(db: DatabaseConnection, config: &Config) -> Self {
        Self {
            accounts: AccountRepository::new(db.clone()),
            campaigns: CampaignRepository::new(db.clone()),
            actions: ActionRepository::new(db.clone()),
            leads: LeadService::new(db),
            interval_secs: config.scheduler_interval_secs,
            sync_cadence: Delay::minutes(config.sync_interval_mins),
        }
    }

    pub async fn start(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!(error = %e, "scheduler cycle failed");
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("scheduler stopping");
                    break;
                }
            }
        }
    }

    async fn run_cycle(&self) -> Result<()> {
        let now = Utc::now();

        self.cancel_inactive_campaign_work(now).await?;

        for campaign in self.campaigns.find_by_status(CampaignStatus::Active).await? {
            if let Err(e) = self.advance_campaign(&campaign, now).await {
                tracing::error!(campaign = %campaign.id, error = %e, "campaign pass failed");
            }
        }

        self.schedule_inbox_syncs(now).await?;
        Ok(())
    }

    /// Campaigns paused or archived since the last pass may still have
    /// queued actions; drop them. In-flight actions are left alone.
    async fn cancel_inactive_campaign_work(&self, now: DateTime<Utc>) -> Result<()> {
        for status in [CampaignStatus::Paused, CampaignStatus::Archived] {
            for campaign in self.campaigns.find_by_status(status).await? {
                let cancelled = self.actions.cancel_pending_for_campaign(campaign.id, now).await?;
                if cancelled > 0 {
                    tracing::info!(
                        campaign = %campaign.id,
                        cancelled,
                        status = %status,
                        "dropped queued work for inactive campaign"
                    );
                }
            }
        }
        Ok(())
    }

    async fn advance_campaign(
        &self,
        campaign: &campaign::Model,
        now: DateTime<Utc>
    ) -> Result<()> {
        let account = match self.accounts.find_by_id(campaign.account_id).await {
            Ok(account) => account,
            Err(AppError::AccountNotFound) => {
                tracing::warn!(campaign = %campaign.id, "campaign points at a missing account");
                return Ok(());
            }
            Err(e) => {
                return Err(e);
            }
        };
        if account.status != AccountStatus::Connected.as_str() {
            return Ok(());
        }

        let steps = self.campaigns.steps_for(campaign.id).await?;
        let mut budget = self.step_budget(campaign, now).await?;
        if budget == 0 {
            tracing::debug!(campaign = %campaign.id, "daily action cap reached");
            return Ok(());
        }

        let due = self.campaigns.due_leads(campaign.id, now, CYCLE_PAGE).await?;
        for lead in due {
            if budget == 0 {
                break;
            }
            // A queued or running action already owns this lead's next move
            if self.actions.has_open_for_lead(lead.id).await? {
                continue;
            }

            let step_index = lead.current_step.max(0) as usize;
            match steps.get(step_index) {
                None => {
                    self.leads.settle_sequence_end(lead).await?;
                }
                Some(step) => {
                    self.materialize_step(&account, lead, step, now).await?;
                    budget -= 1;
                }
            }
        }

        Ok(())
    }

    /// How many more step actions this campaign may materialize today.
    async fn step_budget(&self, campaign: &campaign::Model, now: DateTime<Utc>) -> Result<u64> {
        if campaign.daily_action_cap <= 0 {
            return Ok(CYCLE_PAGE);
        }

        let used = self.actions.count_steps_for_campaign_since(
            campaign.id,
            midnight_utc(now)
        ).await?;
        let cap = campaign.daily_action_cap as u64;

        Ok(cap.saturating_sub(used).min(CYCLE_PAGE))
    }

    async fn materialize_step(
        &self,
        account: &account::Model,
        lead: campaign_lead::Model,
        step: &campaign_step::Model,
        now: DateTime<Utc>
    ) -> Result<()> {
        let kind = match step.kind.parse::<ActionKind>() {
            Ok(kind) if kind.is_step_kind() => kind,
            _ => {
                tracing::warn!(
                    step = %step.id,
                    kind = %step.kind,
                    "step kind is not runnable, failing its lead"
                );
                self.leads.fail(lead, &format!("unusable step kind: {}", step.kind)).await?;
                return Ok(());
            }
        };

        let payload = step.template
            .as_deref()
            .map(|template| render_template(template, lead.full_name.as_deref()));
        let lead_id = lead.id;
        let profile_url = lead.profile_url.clone();

        // Advance before enqueueing: a crash between the two writes
        // leaves the lead parked rather than the same step queued twice.
        self.leads.advance_step(lead).await?;
        self.actions.create(NewAction {
            account_id: account.id,
            lead_id: Some(lead_id),
            kind,
            target_url: Some(profile_url),
            payload,
            priority: 0,
            scheduled_at: now + step_delay(step),
            max_attempts: ACTION_MAX_ATTEMPTS,
        }).await?;

        tracing::info!(
            lead = %lead_id,
            kind = %kind,
            delay_days = step.delay_days,
            "step action queued"
        );
        Ok(())
    }

    /// Keep one inbox-sync action queued per connected account whose
    /// last sync is older than the cadence.
    async fn schedule_inbox_syncs(&self, now: DateTime<Utc>) -> Result<()> {
        let stale_before = now - self.sync_cadence;

        for account in self.accounts.find_by_status(AccountStatus::Connected).await? {
            let due = account.last_synced_at.map(|at| at < stale_before).unwrap_or(true);
            if !due || self.actions.has_open_sync(account.id).await? {
                continue;
            }

            self.actions.create(NewAction {
                account_id: account.id,
                lead_id: None,
                kind: ActionKind::SyncMessages,
                target_url: None,
                payload: None,
                priority: SYNC_PRIORITY,
                scheduled_at: now,
                max_attempts: ACTION_MAX_ATTEMPTS,
            }).await?;

            tracing::debug!(account = %account.id, "inbox sync queued");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_render_template_substitutes_names() {
        let rendered = render_template(
            "Hi {first_name}, great meeting you. Best, Sam ({full_name} fan)",
            Some("Jane Doe")
        );
        assert_eq!(rendered, "Hi Jane, great meeting you. Best, Sam (Jane Doe fan)");
    }

    #[test]
    fn test_render_template_without_name_stays_neutral() {
        assert_eq!(render_template("Hi {first_name}!", None), "Hi there!");
        assert_eq!(render_template("Hi {first_name}!", Some("   ")), "Hi there!");
        assert_eq!(render_template("No placeholders here", None), "No placeholders here");
    }

    #[test]
    fn test_step_delay_combines_days_and_hours() {
        let step = campaign_step::Model {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            step_order: 1,
            kind: "message".to_string(),
            delay_days: 2,
            delay_hours: 6,
            template: None,
            created_at: Utc::now(),
        };
        assert_eq!(step_delay(&step), Delay::hours(54));

        let negative = campaign_step::Model { delay_days: -1, delay_hours: -5, ..step };
        assert_eq!(step_delay(&negative), Delay::zero());
    }

    #[test]
    fn test_midnight_utc_floors_to_day_start() {
        let now = "2025-11-04T17:23:45Z".parse::<DateTime<Utc>>().unwrap();
        let midnight = midnight_utc(now);
        assert_eq!(midnight.to_rfc3339(), "2025-11-04T00:00:00+00:00");
    }
}
