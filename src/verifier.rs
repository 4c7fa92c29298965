use std::sync::Arc;

use chrono::{ Duration as Delay, Utc };
use sea_orm::DatabaseConnection;
use tokio::sync::watch;
use tokio::time::{ interval, Duration, MissedTickBehavior };

use crate::automation::{ AutomationFactory, LoginMode, PlatformAutomation, StatusFn };
use crate::config::Config;
use crate::db::entity::account;
use crate::db::AccountRepository;
use crate::enums::AccountStatus;
use crate::error::{ AppError, ErrorCode, Result };
use crate::services::limit_service::DailyDefaults;
use crate::services::{ LimitService, SessionService };
use crate::worker::WorkerId;

/// Walks accounts parked in VERIFYING and gives each an interactive
/// login pass in a visible browser, where a human can clear whatever
/// challenge the platform raised. One account at a time; there is
/// only one pair of operator eyes.
pub struct AccountVerifier {
    accounts: AccountRepository,
    limits: LimitService,
    sessions: SessionService,
    factory: Arc<dyn AutomationFactory>,
    worker_id: WorkerId,
    interval_secs: u64,
    login_timeout: Duration,
    lease: Delay,
}

impl AccountVerifier {
    pub fn new(
        db: DatabaseConnection,
        config: &Config,
        factory: Arc<dyn AutomationFactory>,
        sessions: SessionService,
        worker_id: WorkerId
    ) -> Self {
        Self {
            accounts: AccountRepository::new(db.clone()),
            limits: LimitService::new(db, DailyDefaults::from_config(config)),
            sessions,
            factory,
            worker_id,
            interval_secs: config.verifier_interval_secs,
            login_timeout: config.interactive_login_timeout(),
            lease: Delay::seconds(config.lock_timeout_secs),
        }
    }

    pub async fn start(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!(error = %e, "verifier cycle failed");
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("verifier stopping");
                    break;
                }
            }
        }
    }

    async fn run_cycle(&self) -> Result<()> {
        for account in self.accounts.find_verifiable().await? {
            let account_id = account.id;
            if let Err(e) = self.verify(account).await {
                tracing::error!(account = %account_id, error = %e, "verification pass failed");
            }
        }

        Ok(())
    }

    async fn verify(&self, account: account::Model) -> Result<()> {
        let now = Utc::now();

        if !self.accounts.try_lock(account.id, self.worker_id.as_str(), self.lease, now).await? {
            tracing::debug!(account = %account.id, "lease held elsewhere, skipping");
            return Ok(());
        }

        let result = self.run_verification(&account).await;

        if let Err(e) = self.accounts.unlock(account.id, self.worker_id.as_str(), Utc::now()).await {
            tracing::warn!(account = %account.id, error = %e, "lease release failed");
        }

        result
    }

    async fn run_verification(&self, account: &account::Model) -> Result<()> {
        let credentials = match self.sessions.load_credentials(account) {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                // find_verifiable filters these out, but a concurrent
                // edit can still empty the bundle under us.
                self.accounts.set_status(
                    account.id,
                    AccountStatus::NeedsAttention,
                    Some(ErrorCode::MissingData),
                    Some("no credentials on file".to_string())
                ).await?;
                return Ok(());
            }
            Err(AppError::Encryption(message)) => {
                self.accounts.set_status(
                    account.id,
                    AccountStatus::Disconnected,
                    Some(ErrorCode::DecryptFailed),
                    Some(message)
                ).await?;
                return Ok(());
            }
            Err(e) => {
                return Err(e);
            }
        };

        // An unreadable session blob does not block this pass; the
        // login about to happen replaces it anyway.
        let artifact = self.sessions.load_session(account).unwrap_or_else(|e| {
            tracing::debug!(account = %account.id, error = %e, "stored session unreadable, starting clean");
            None
        });

        let mut session = self.factory.open(artifact.as_ref(), true).await?;

        let status_log: StatusFn = {
            let account_id = account.id;
            Arc::new(move |stage: &str| {
                tracing::info!(account = %account_id, stage, "interactive login");
            })
        };

        tracing::info!(account = %account.id, "interactive verification started");

        match
            session.login(&credentials, LoginMode::Interactive {
                timeout: self.login_timeout,
                on_status: Some(status_log),
            }).await
        {
            Ok(()) => {
                let stored = self.store_session(session.as_mut(), account).await;
                let _ = session.close().await;
                stored?;

                self.accounts.set_status(account.id, AccountStatus::Connected, None, None).await?;
                let fresh = self.accounts.find_by_id(account.id).await?;
                self.limits.restart_warmup(fresh).await?;
                tracing::info!(account = %account.id, "account verified, warmup restarted");
            }
            Err(e) => {
                let _ = session.close().await;
                let status = e.code
                    .account_status_on_failure()
                    .unwrap_or(AccountStatus::NeedsAttention);
                tracing::warn!(account = %account.id, code = ?e.code, "verification failed");
                self.accounts.set_status(account.id, status, Some(e.code), Some(e.message)).await?;
            }
        }

        Ok(())
    }

    async fn store_session(
        &self,
        session: &mut dyn PlatformAutomation,
        account: &account::Model
    ) -> Result<()> {
        let artifact = session.export_session().await?;
        let blob = self.sessions.seal_session(&artifact)?;
        self.accounts.save_session(account.id, blob, Utc::now()).await?;
        Ok(())
    }
}
