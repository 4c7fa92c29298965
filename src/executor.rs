use std::sync::Arc;

use chrono::{ DateTime, Duration as Delay, NaiveTime, Utc };
use rand::Rng;
use sea_orm::{ DatabaseConnection, EntityTrait };
use tokio::sync::{ watch, Semaphore };
use tokio::task::JoinSet;
use tokio::time::{ interval, Duration, MissedTickBehavior };
use uuid::Uuid;

use crate::automation::{
    AcceptanceOutcome,
    AutomationFactory,
    ConnectionOutcome,
    LoginMode,
    PlatformAutomation,
    ProfileData,
    SyncedMessage,
};
use crate::config::Config;
use crate::db::entity::{ account, action, campaign_lead };
use crate::db::{ AccountRepository, ActionRepository };
use crate::enums::{ AccountStatus, ActionKind, LeadStatus };
use crate::error::{ AppError, AutomationError, AutomationResult, ErrorCode, Result };
use crate::services::limit_service::DailyDefaults;
use crate::services::{ LeadService, LimitService, MessageService, SessionService };
use crate::worker::WorkerId;

/// What to do with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryDecision {
    Retry(Delay),
    Abandon,
}

/// Exponential ladder for transient failures: 5, 15, 45 minutes and
/// so on, until the action has burned through its attempts.
pub(crate) fn retry_decision(
    code: ErrorCode,
    attempts_done: i32,
    max_attempts: i32
) -> RetryDecision {
    if !code.is_retryable() || attempts_done > max_attempts {
        return RetryDecision::Abandon;
    }

    let exponent = (attempts_done - 1).max(0) as u32;
    RetryDecision::Retry(Delay::minutes(5 * (3i64).pow(exponent)))
}

/// Platform throttling parks work until the next UTC day, the same
/// boundary the daily counters reset on.
pub(crate) fn next_quota_window(now: DateTime<Utc>) -> DateTime<Utc> {
    (now + Delay::days(1)).date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Whether the rest of an account's batch should still run after the
/// current action settled.
enum BatchSignal {
    Continue,
    Stop,
}

/// What a failed session-validity probe means for the account. A
/// platform wall (challenge, suspension, dead credentials) parks the
/// account for a human; anything else is a transient probe problem
/// that aborts this cycle without touching account health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProbeFailure {
    MarkAccount(AccountStatus),
    Abort,
}

pub(crate) fn classify_probe_failure(code: ErrorCode) -> ProbeFailure {
    match code.account_status_on_failure() {
        Some(status) => ProbeFailure::MarkAccount(status),
        None => ProbeFailure::Abort,
    }
}

/// A due action row decoded into exactly the fields its kind needs.
/// A row that cannot be decoded never reaches the browser; it fails
/// as missing data before an attempt is spent on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ActionInput {
    ProfileView {
        url: String,
    },
    ConnectionRequest {
        url: String,
        note: Option<String>,
    },
    Message {
        url: String,
        text: String,
    },
    CheckAcceptance {
        url: String,
    },
    SyncMessages {
        since: Option<DateTime<Utc>>,
    },
}

fn decode_input(
    kind: ActionKind,
    target: Option<&str>,
    payload: Option<&str>,
    last_synced_at: Option<DateTime<Utc>>
) -> AutomationResult<ActionInput> {
    let url = |what: &str| {
        target.map(str::to_string).ok_or_else(|| missing(what))
    };

    match kind {
        ActionKind::ProfileView =>
            Ok(ActionInput::ProfileView {
                url: url("profile view without a target url")?,
            }),
        ActionKind::ConnectionRequest =>
            Ok(ActionInput::ConnectionRequest {
                url: url("connection request without a target url")?,
                note: payload.map(str::to_string),
            }),
        ActionKind::Message =>
            Ok(ActionInput::Message {
                url: url("message without a target url")?,
                text: payload
                    .map(str::to_string)
                    .ok_or_else(|| missing("message without rendered text"))?,
            }),
        ActionKind::CheckAcceptance =>
            Ok(ActionInput::CheckAcceptance {
                url: url("acceptance check without a target url")?,
            }),
        ActionKind::SyncMessages => Ok(ActionInput::SyncMessages { since: last_synced_at }),
    }
}

/// The result payload of a successful adapter call, before it is
/// written back to the action row and folded into the lead.
enum ActionOutcome {
    Profile(ProfileData),
    Invited(ConnectionOutcome),
    Messaged {
        thread_id: String,
        text: String,
    },
    Checked(AcceptanceOutcome),
    Synced(Vec<SyncedMessage>),
}

async fn dispatch(
    session: &mut dyn PlatformAutomation,
    input: ActionInput
) -> AutomationResult<ActionOutcome> {
    match input {
        ActionInput::ProfileView { url } => {
            Ok(ActionOutcome::Profile(session.view_profile(&url).await?))
        }
        ActionInput::ConnectionRequest { url, note } => {
            let outcome = session.send_connection_request(&url, note.as_deref()).await?;
            Ok(ActionOutcome::Invited(outcome))
        }
        ActionInput::Message { url, text } => {
            let thread_id = session.send_message(&url, &text).await?;
            Ok(ActionOutcome::Messaged { thread_id, text })
        }
        ActionInput::CheckAcceptance { url } => {
            Ok(ActionOutcome::Checked(session.check_connection_accepted(&url).await?))
        }
        ActionInput::SyncMessages { since } => {
            Ok(ActionOutcome::Synced(session.sync_messages(since).await?))
        }
    }
}

/// Drains due actions account by account. Each cycle fans out one
/// task per account with runnable work, bounded by a semaphore; a
/// task takes the account lease, restores or re-establishes the
/// browser session, then walks the due batch in priority order with
/// human-looking pauses between actions.
pub struct ActionExecutor {
    db: DatabaseConnection,
    accounts: AccountRepository,
    actions: ActionRepository,
    leads: LeadService,
    limits: LimitService,
    messages: MessageService,
    sessions: SessionService,
    factory: Arc<dyn AutomationFactory>,
    worker_id: WorkerId,
    poll_interval_secs: u64,
    concurrency: usize,
    batch_size: u64,
    lease: Delay,
    delay_ms: (u64, u64),
}

impl ActionExecutor {
    pub fn new(
        db: DatabaseConnection,
        config: &Config,
        factory: Arc<dyn AutomationFactory>,
        sessions: SessionService,
        worker_id: WorkerId
    ) -> Self {
        Self {
            accounts: AccountRepository::new(db.clone()),
            actions: ActionRepository::new(db.clone()),
            leads: LeadService::new(db.clone()),
            limits: LimitService::new(db.clone(), DailyDefaults::from_config(config)),
            messages: MessageService::new(db.clone()),
            sessions,
            factory,
            worker_id,
            poll_interval_secs: config.poll_interval_secs,
            concurrency: config.executor_concurrency.max(1),
            batch_size: config.action_batch_size,
            lease: Delay::seconds(config.lock_timeout_secs),
            delay_ms: (config.action_delay_ms_min, config.action_delay_ms_max),
            db,
        }
    }

    pub async fn start(self, mut shutdown: watch::Receiver<bool>) {
        let executor = Arc::new(self);
        let mut ticker = interval(Duration::from_secs(executor.poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = Arc::clone(&executor).run_cycle().await {
                        tracing::error!(error = %e, "executor cycle failed");
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("executor stopping");
                    break;
                }
            }
        }
    }

    async fn run_cycle(self: Arc<Self>) -> Result<()> {
        let due_accounts = self.actions.account_ids_with_due(Utc::now()).await?;
        if due_accounts.is_empty() {
            return Ok(());
        }

        let gate = Arc::new(Semaphore::new(self.concurrency));
        let mut workers = JoinSet::new();

        for account_id in due_accounts {
            let Ok(permit) = Arc::clone(&gate).acquire_owned().await else {
                break;
            };
            let executor = Arc::clone(&self);

            workers.spawn(async move {
                let _permit = permit;
                if let Err(e) = executor.process_account(account_id).await {
                    tracing::error!(account = %account_id, error = %e, "account batch failed");
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "executor worker panicked");
            }
        }

        Ok(())
    }

    /// One account's turn: roll the daily window if needed, take the
    /// lease, run the batch, release the lease no matter what.
    async fn process_account(&self, account_id: Uuid) -> Result<()> {
        let now = Utc::now();
        let account = self.accounts.find_by_id(account_id).await?;
        let account = self.limits.ensure_current(account).await?;

        if account.status != AccountStatus::Connected.as_str() {
            tracing::debug!(
                account = %account.id,
                status = %account.status,
                "account not runnable, its work stays queued"
            );
            return Ok(());
        }

        if !self.accounts.try_lock(account.id, self.worker_id.as_str(), self.lease, now).await? {
            tracing::debug!(account = %account.id, "lease held elsewhere, skipping");
            return Ok(());
        }

        let result = self.run_locked(account).await;

        if let Err(e) = self.accounts.unlock(account_id, self.worker_id.as_str(), Utc::now()).await {
            tracing::warn!(account = %account_id, error = %e, "lease release failed");
        }

        result
    }

    async fn run_locked(&self, mut account: account::Model) -> Result<()> {
        let mut session = match self.open_session(&account).await? {
            Some(session) => session,
            None => {
                return Ok(());
            }
        };

        let batch = self.drain_batch(session.as_mut(), &mut account).await;

        self.persist_session(session.as_mut(), account.id).await;
        if let Err(e) = session.close().await {
            tracing::debug!(account = %account.id, error = %e, "browser close failed");
        }

        batch
    }

    /// Restore the stored session, falling back to a headless
    /// credential login when the cookies no longer hold. `None` means
    /// the account was marked unhealthy and this batch is over.
    async fn open_session(
        &self,
        account: &account::Model
    ) -> Result<Option<Box<dyn PlatformAutomation>>> {
        let artifact = match self.sessions.load_session(account) {
            Ok(artifact) => artifact,
            Err(AppError::Encryption(message)) => {
                self.accounts.set_status(
                    account.id,
                    AccountStatus::Disconnected,
                    Some(ErrorCode::DecryptFailed),
                    Some(message)
                ).await?;
                return Ok(None);
            }
            Err(e) => {
                return Err(e);
            }
        };

        let mut session = self.factory.open(artifact.as_ref(), false).await?;

        match session.is_session_valid().await {
            Ok(true) => {
                return Ok(Some(session));
            }
            Ok(false) => {}
            Err(e) => {
                let _ = session.close().await;
                return match classify_probe_failure(e.code) {
                    ProbeFailure::MarkAccount(status) => {
                        tracing::warn!(
                            account = %account.id,
                            code = ?e.code,
                            "session probe hit a platform wall"
                        );
                        self.accounts.set_status(
                            account.id,
                            status,
                            Some(e.code),
                            Some(e.message)
                        ).await?;
                        Ok(None)
                    }
                    ProbeFailure::Abort => Err(e.into()),
                };
            }
        }

        tracing::info!(account = %account.id, "stored session rejected, retrying with credentials");
        self.relogin(session, account).await
    }

    async fn relogin(
        &self,
        mut session: Box<dyn PlatformAutomation>,
        account: &account::Model
    ) -> Result<Option<Box<dyn PlatformAutomation>>> {
        let credentials = match self.sessions.load_credentials(account) {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                let _ = session.close().await;
                self.accounts.set_status(
                    account.id,
                    AccountStatus::Disconnected,
                    Some(ErrorCode::SessionExpired),
                    Some("session expired and no credentials on file".to_string())
                ).await?;
                return Ok(None);
            }
            Err(AppError::Encryption(message)) => {
                let _ = session.close().await;
                self.accounts.set_status(
                    account.id,
                    AccountStatus::Disconnected,
                    Some(ErrorCode::DecryptFailed),
                    Some(message)
                ).await?;
                return Ok(None);
            }
            Err(e) => {
                let _ = session.close().await;
                return Err(e);
            }
        };

        self.accounts.set_status(account.id, AccountStatus::Reconnecting, None, None).await?;

        match session.login(&credentials, LoginMode::Headless).await {
            Ok(()) => {
                self.persist_session(session.as_mut(), account.id).await;
                self.accounts.set_status(account.id, AccountStatus::Connected, None, None).await?;
                tracing::info!(account = %account.id, "headless re-login succeeded");
                Ok(Some(session))
            }
            Err(e) => {
                let _ = session.close().await;
                let status = e.code
                    .account_status_on_failure()
                    .unwrap_or(AccountStatus::NeedsAttention);
                tracing::warn!(
                    account = %account.id,
                    code = ?e.code,
                    "headless re-login failed"
                );
                self.accounts.set_status(account.id, status, Some(e.code), Some(e.message)).await?;
                Ok(None)
            }
        }
    }

    /// Best effort: a batch that ran to completion should not be
    /// reported as failed because the final cookie export broke.
    async fn persist_session(&self, session: &mut dyn PlatformAutomation, account_id: Uuid) {
        let artifact = match session.export_session().await {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!(account = %account_id, error = %e, "session export failed");
                return;
            }
        };

        let blob = match self.sessions.seal_session(&artifact) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(account = %account_id, error = %e, "session seal failed");
                return;
            }
        };

        if let Err(e) = self.accounts.save_session(account_id, blob, Utc::now()).await {
            tracing::warn!(account = %account_id, error = %e, "session save failed");
        }
    }

    async fn drain_batch(
        &self,
        session: &mut dyn PlatformAutomation,
        account: &mut account::Model
    ) -> Result<()> {
        let due = self.actions.due_for_account(account.id, Utc::now(), self.batch_size).await?;
        if due.is_empty() {
            return Ok(());
        }

        tracing::info!(account = %account.id, actions = due.len(), "running batch");

        for act in due {
            let now = Utc::now();

            if !self.accounts.renew_lock(account.id, self.worker_id.as_str(), now).await? {
                tracing::warn!(account = %account.id, "lease lost mid-batch, stopping");
                break;
            }

            let kind = match act.kind.parse::<ActionKind>() {
                Ok(kind) => kind,
                Err(_) => {
                    self.actions.fail(
                        act.id,
                        ErrorCode::MissingData,
                        "unrecognized action kind",
                        now
                    ).await?;
                    continue;
                }
            };

            if !self.limits.allow(account, kind) {
                tracing::info!(
                    account = %account.id,
                    kind = %kind,
                    "daily quota exhausted, rest of the batch waits for the next window"
                );
                break;
            }

            if !self.actions.claim(act.id, now).await? {
                continue;
            }

            let lead = match act.lead_id {
                Some(lead_id) => campaign_lead::Entity::find_by_id(lead_id).one(&self.db).await?,
                None => None,
            };

            if let Some(lead) = &lead {
                let status = lead.status.parse::<LeadStatus>().unwrap_or(LeadStatus::Pending);
                if status.is_terminal() {
                    self.actions.skip(act.id, now).await?;
                    tracing::debug!(
                        action = %act.id,
                        lead = %lead.id,
                        "lead left the sequence, action skipped"
                    );
                    continue;
                }
            }

            tokio::time::sleep(Duration::from_millis(self.pause_ms())).await;

            match self.run_action(session, account, &act, lead, kind).await? {
                BatchSignal::Continue => {}
                BatchSignal::Stop => {
                    break;
                }
            }
        }

        Ok(())
    }

    fn pause_ms(&self) -> u64 {
        let (lo, hi) = self.delay_ms;
        rand::rng().random_range(lo..=hi.max(lo))
    }

    async fn run_action(
        &self,
        session: &mut dyn PlatformAutomation,
        account: &mut account::Model,
        act: &action::Model,
        lead: Option<campaign_lead::Model>,
        kind: ActionKind
    ) -> Result<BatchSignal> {
        let target = act.target_url
            .clone()
            .or_else(|| lead.as_ref().map(|l| l.profile_url.clone()));

        let attempt = match
            decode_input(kind, target.as_deref(), act.payload.as_deref(), account.last_synced_at)
        {
            Ok(input) => dispatch(session, input).await,
            Err(e) => Err(e),
        };

        match attempt {
            Ok(outcome) => {
                self.settle_success(account, act, lead, kind, outcome).await?;
                Ok(BatchSignal::Continue)
            }
            Err(e) => self.settle_failure(account, act, lead, e).await,
        }
    }

    /// Write the result onto the action row, fold it into the lead's
    /// state, and count it against today's quota.
    async fn settle_success(
        &self,
        account: &mut account::Model,
        act: &action::Model,
        lead: Option<campaign_lead::Model>,
        kind: ActionKind,
        outcome: ActionOutcome
    ) -> Result<()> {
        let now = Utc::now();

        match outcome {
            ActionOutcome::Profile(profile) => {
                self.actions.complete(act.id, serde_json::to_string(&profile).ok(), now).await?;
                if let Some(lead) = lead {
                    self.leads.record_profile_viewed(lead, &profile).await?;
                }
            }
            ActionOutcome::Invited(invite) => {
                self.actions.complete(act.id, serde_json::to_string(&invite).ok(), now).await?;
                if let Some(lead) = lead {
                    self.leads.record_connection_requested(lead, account.id, &invite).await?;
                }
            }
            ActionOutcome::Messaged { thread_id, text } => {
                let result = serde_json::json!({ "thread_id": thread_id });
                self.actions.complete(act.id, Some(result.to_string()), now).await?;
                self.messages.record_outbound(account.id, act.lead_id, &thread_id, &text).await?;
                if let Some(lead) = lead {
                    self.leads.record_message_sent(lead).await?;
                }
            }
            ActionOutcome::Checked(check) => {
                self.actions.complete(act.id, serde_json::to_string(&check).ok(), now).await?;
                if let Some(lead) = lead {
                    self.leads.record_acceptance_check(lead, account.id, &check).await?;
                }
            }
            ActionOutcome::Synced(batch) => {
                let summary = self.messages.ingest(account.id, &batch).await?;
                let result = serde_json::json!({
                    "fetched": batch.len(),
                    "inserted": summary.inserted,
                    "duplicates": summary.duplicates,
                });
                self.actions.complete(act.id, Some(result.to_string()), now).await?;

                for lead in summary.replied_leads {
                    let lead = self.leads.mark_replied(lead).await?;
                    tracing::info!(lead = %lead.id, "reply detected, sequence stopped");
                }

                self.accounts.mark_synced(account.id, now).await?;
            }
        }

        *account = self.limits.increment(account.clone(), kind).await?;
        Ok(())
    }

    /// Sort a failed attempt into its bucket: platform throttle,
    /// dead session, account-level trouble, transient retry, or a
    /// permanent failure recorded against the lead.
    async fn settle_failure(
        &self,
        account: &account::Model,
        act: &action::Model,
        lead: Option<campaign_lead::Model>,
        e: AutomationError
    ) -> Result<BatchSignal> {
        let now = Utc::now();
        // The claim bumped the row's counter after this model was read.
        let attempts_done = act.attempt_count + 1;

        if e.code == ErrorCode::RateLimited {
            self.actions.defer(act.id, next_quota_window(now), now).await?;
            self.accounts.set_status(
                account.id,
                AccountStatus::RateLimited,
                Some(e.code),
                Some(e.message.clone())
            ).await?;
            tracing::warn!(account = %account.id, "platform throttled the account, batch stops");
            return Ok(BatchSignal::Stop);
        }

        if e.code.needs_relogin() {
            // Put the action back for the next cycle, which starts
            // with a fresh login before touching the queue again.
            self.actions.reschedule(act.id, now, e.code, &e.message, now).await?;
            tracing::info!(account = %account.id, "session expired mid-batch");
            return Ok(BatchSignal::Stop);
        }

        if let Some(status) = e.code.account_status_on_failure() {
            self.actions.fail(act.id, e.code, &e.message, now).await?;
            if let Some(lead) = lead {
                self.leads.record_failure(lead, &e.message).await?;
            }
            self.accounts.set_status(
                account.id,
                status,
                Some(e.code),
                Some(e.message.clone())
            ).await?;
            tracing::warn!(
                account = %account.id,
                code = ?e.code,
                "account unhealthy, batch stops"
            );
            return Ok(BatchSignal::Stop);
        }

        match retry_decision(e.code, attempts_done, act.max_attempts) {
            RetryDecision::Retry(delay) => {
                self.actions.reschedule(act.id, now + delay, e.code, &e.message, now).await?;
                tracing::debug!(
                    action = %act.id,
                    attempt = attempts_done,
                    retry_in_mins = delay.num_minutes(),
                    "transient failure, retry scheduled"
                );
            }
            RetryDecision::Abandon => {
                self.actions.fail(act.id, e.code, &e.message, now).await?;
                if let Some(lead) = lead {
                    self.leads.record_failure(lead, &e.message).await?;
                }
                tracing::warn!(
                    action = %act.id,
                    code = ?e.code,
                    attempts = attempts_done,
                    "action failed for good"
                );
            }
        }

        Ok(BatchSignal::Continue)
    }
}

fn missing(what: &str) -> AutomationError {
    AutomationError::new(ErrorCode::MissingData, what)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_ladder_triples() {
        assert_eq!(
            retry_decision(ErrorCode::Timeout, 1, 3),
            RetryDecision::Retry(Delay::minutes(5))
        );
        assert_eq!(
            retry_decision(ErrorCode::Timeout, 2, 3),
            RetryDecision::Retry(Delay::minutes(15))
        );
        assert_eq!(
            retry_decision(ErrorCode::Timeout, 3, 3),
            RetryDecision::Retry(Delay::minutes(45))
        );
    }

    #[test]
    fn test_retry_stops_past_max_attempts() {
        assert_eq!(retry_decision(ErrorCode::Timeout, 4, 3), RetryDecision::Abandon);
        assert_eq!(retry_decision(ErrorCode::Timeout, 7, 3), RetryDecision::Abandon);
    }

    #[test]
    fn test_probe_walls_park_the_account() {
        assert_eq!(
            classify_probe_failure(ErrorCode::Checkpoint),
            ProbeFailure::MarkAccount(AccountStatus::NeedsAttention)
        );
        assert_eq!(
            classify_probe_failure(ErrorCode::Suspended),
            ProbeFailure::MarkAccount(AccountStatus::Suspended)
        );
        assert_eq!(
            classify_probe_failure(ErrorCode::InvalidCredentials),
            ProbeFailure::MarkAccount(AccountStatus::Disconnected)
        );
    }

    #[test]
    fn test_probe_transients_abort_without_marking() {
        assert_eq!(classify_probe_failure(ErrorCode::Timeout), ProbeFailure::Abort);
        assert_eq!(classify_probe_failure(ErrorCode::Driver), ProbeFailure::Abort);
        assert_eq!(classify_probe_failure(ErrorCode::Navigation), ProbeFailure::Abort);
    }

    #[test]
    fn test_permanent_codes_never_retry() {
        assert_eq!(retry_decision(ErrorCode::Checkpoint, 1, 3), RetryDecision::Abandon);
        assert_eq!(retry_decision(ErrorCode::InvalidCredentials, 1, 3), RetryDecision::Abandon);
        assert_eq!(retry_decision(ErrorCode::MissingData, 1, 3), RetryDecision::Abandon);
        assert_eq!(retry_decision(ErrorCode::Suspended, 1, 3), RetryDecision::Abandon);
    }

    #[test]
    fn test_navigation_retries_within_budget() {
        assert_eq!(
            retry_decision(ErrorCode::Navigation, 1, 3),
            RetryDecision::Retry(Delay::minutes(5))
        );
        assert_eq!(
            retry_decision(ErrorCode::ElementNotFound, 2, 3),
            RetryDecision::Retry(Delay::minutes(15))
        );
    }

    #[test]
    fn test_quota_window_is_next_utc_midnight() {
        let late = "2025-11-04T23:50:00Z".parse::<DateTime<Utc>>().unwrap();
        let resumed = next_quota_window(late);
        assert_eq!(resumed.to_rfc3339(), "2025-11-05T00:00:00+00:00");

        let early = "2025-11-04T00:05:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(next_quota_window(early).to_rfc3339(), "2025-11-05T00:00:00+00:00");
    }

    #[test]
    fn test_decode_carries_per_kind_payloads() {
        let url = "https://www.linkedin.com/in/jane";

        assert_eq!(
            decode_input(ActionKind::ProfileView, Some(url), None, None).unwrap(),
            ActionInput::ProfileView { url: url.to_string() }
        );
        assert_eq!(
            decode_input(ActionKind::ConnectionRequest, Some(url), Some("hi Jane"), None).unwrap(),
            ActionInput::ConnectionRequest {
                url: url.to_string(),
                note: Some("hi Jane".to_string()),
            }
        );
        assert_eq!(
            decode_input(ActionKind::Message, Some(url), Some("following up"), None).unwrap(),
            ActionInput::Message {
                url: url.to_string(),
                text: "following up".to_string(),
            }
        );

        let since = "2025-11-04T08:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(
            decode_input(ActionKind::SyncMessages, None, None, Some(since)).unwrap(),
            ActionInput::SyncMessages { since: Some(since) }
        );
    }

    #[test]
    fn test_decode_rejects_message_without_text() {
        let err = decode_input(
            ActionKind::Message,
            Some("https://www.linkedin.com/in/jane"),
            None,
            None
        ).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingData);
    }

    #[test]
    fn test_decode_rejects_missing_target() {
        let needs_target = [
            ActionKind::ProfileView,
            ActionKind::ConnectionRequest,
            ActionKind::Message,
            ActionKind::CheckAcceptance,
        ];
        for kind in needs_target {
            let err = decode_input(kind, None, Some("text"), None).unwrap_err();
            assert_eq!(err.code, ErrorCode::MissingData, "{kind} should need a target");
        }
    }
}
