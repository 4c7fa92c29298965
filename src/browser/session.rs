use std::time::{ Duration, Instant };

use async_trait::async_trait;
use chrono::{ DateTime, Utc };

use crate::automation::{
    AcceptanceOutcome,
    ConnectionOutcome,
    Credentials,
    LoginMode,
    PlatformAutomation,
    ProfileData,
    SessionArtifact,
    StatusFn,
    SyncedMessage,
};
use crate::browser::driver::BrowserDriver;
use crate::browser::selectors::*;
use crate::crypto::totp;
use crate::error::{ AutomationError, AutomationResult, ErrorCode };

const LOGIN_POLL: Duration = Duration::from_secs(2);
const TOTP_MAX_ATTEMPTS: u32 = 2;

/// A logged-in (or about to be logged-in) browser session against the
/// platform. Generic over the driver so flows can be exercised with a
/// scripted browser in tests.
pub struct PlatformSession<D: BrowserDriver> {
    pub(crate) driver: D,
    pub(crate) nav_timeout: Duration,
}

/// Where a URL landed us, as far as session health is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageKind {
    Feed,
    Login,
    Checkpoint,
    Other,
}

pub(crate) fn classify_url(url: &str) -> PageKind {
    if url.contains(CHECKPOINT_PATH) {
        PageKind::Checkpoint
    } else if url.contains(LOGIN_PATH) || url.contains(UAS_LOGIN_PATH) {
        PageKind::Login
    } else if url.contains(FEED_PATH) {
        PageKind::Feed
    } else {
        PageKind::Other
    }
}

fn notify(on_status: &Option<StatusFn>, status: &str) {
    if let Some(callback) = on_status {
        callback(status);
    }
}

impl<D: BrowserDriver> PlatformSession<D> {
    pub fn new(driver: D, nav_timeout: Duration) -> Self {
        Self { driver, nav_timeout }
    }

    /// Load a previously exported session into the browser. Must run
    /// before the first navigation so the cookies ride along.
    pub async fn import(&mut self, artifact: &SessionArtifact) -> AutomationResult<()> {
        self.driver.set_cookies(&artifact.cookies).await
    }

    /// Navigate with a session guard: being bounced to the login page
    /// or a challenge wall aborts the flow with the matching code.
    pub(crate) async fn guarded_navigate(&mut self, url: &str) -> AutomationResult<()> {
        self.driver.navigate(url).await?;
        let current = self.driver.current_url().await?;

        match classify_url(&current) {
            PageKind::Login =>
                Err(
                    AutomationError::new(
                        ErrorCode::SessionExpired,
                        format!("redirected to login while opening {}", url)
                    )
                ),
            PageKind::Checkpoint =>
                Err(
                    AutomationError::new(
                        ErrorCode::Checkpoint,
                        format!("security challenge at {}", current)
                    )
                ),
            _ => Ok(()),
        }
    }

    async fn login_flow(
        &mut self,
        credentials: &Credentials,
        mode: LoginMode
    ) -> AutomationResult<()> {
        let (deadline, interactive, on_status) = match mode {
            LoginMode::Headless => (Instant::now() + self.nav_timeout * 2, false, None),
            LoginMode::Interactive { timeout, on_status } => {
                (Instant::now() + timeout, true, on_status)
            }
        };

        self.driver.navigate(LOGIN_URL).await?;

        match classify_url(&self.driver.current_url().await?) {
            PageKind::Feed => {
                // Cookie jar was still good
                notify(&on_status, "logged_in");
                return Ok(());
            }
            PageKind::Login => {
                notify(&on_status, "submitting_credentials");
                self.driver.fill(USERNAME_INPUT, &credentials.username).await?;
                self.driver.fill(PASSWORD_INPUT, &credentials.password).await?;
                self.driver.click(LOGIN_SUBMIT).await?;
            }
            // Checkpoint straight away, or an interstitial; the poll
            // loop below deals with it.
            _ => {}
        }

        let mut totp_attempts = 0u32;
        loop {
            tokio::time::sleep(LOGIN_POLL).await;

            let url = self.driver.current_url().await?;
            match classify_url(&url) {
                PageKind::Feed => {
                    notify(&on_status, "logged_in");
                    return Ok(());
                }
                PageKind::Login => {
                    if self.driver.exists(LOGIN_ERROR).await? {
                        return Err(
                            AutomationError::new(
                                ErrorCode::InvalidCredentials,
                                "login form rejected the credentials"
                            )
                        );
                    }
                }
                PageKind::Checkpoint => {
                    if self.driver.exists(RESTRICTION_BANNER).await? {
                        return Err(
                            AutomationError::new(ErrorCode::Suspended, "account is restricted")
                        );
                    }

                    let has_totp_prompt = self.driver.exists(TOTP_INPUT).await?;
                    if has_totp_prompt && totp_attempts < TOTP_MAX_ATTEMPTS {
                        if let Some(secret) = &credentials.totp_secret {
                            totp_attempts += 1;
                            notify(&on_status, "answering_totp_prompt");
                            // Second try assumes our clock ran a step
                            // ahead of the platform's.
                            let guess = if totp_attempts == 1 {
                                totp::totp_now(secret)
                            } else {
                                totp::totp_previous(secret)
                            };
                            let code = guess.map_err(|e|
                                AutomationError::new(
                                    ErrorCode::Checkpoint,
                                    format!("TOTP secret unusable: {}", e)
                                )
                            )?;
                            self.driver.fill(TOTP_INPUT, &code).await?;
                            self.driver.click(TOTP_SUBMIT).await?;
                            continue;
                        }
                    }

                    notify(&on_status, "challenge_presented");
                    if !interactive {
                        return Err(
                            AutomationError::new(
                                ErrorCode::Checkpoint,
                                format!("security challenge at {}", url)
                            )
                        );
                    }
                    // A human is watching; leave the page alone.
                }
                PageKind::Other => {}
            }

            if Instant::now() >= deadline {
                notify(&on_status, "login_timed_out");
                return Err(AutomationError::timeout("login did not complete before the deadline"));
            }
        }
    }

    async fn check_session(&mut self) -> AutomationResult<bool> {
        self.driver.navigate(FEED_URL).await?;
        let url = self.driver.current_url().await?;

        match classify_url(&url) {
            PageKind::Feed => Ok(true),
            PageKind::Login => Ok(false),
            PageKind::Checkpoint =>
                Err(
                    AutomationError::new(
                        ErrorCode::Checkpoint,
                        format!("security challenge at {}", url)
                    )
                ),
            PageKind::Other => Ok(false),
        }
    }

    async fn export_flow(&mut self) -> AutomationResult<SessionArtifact> {
        let cookies = self.driver
            .cookies().await?
            .into_iter()
            .filter(|c| c.domain.contains(COOKIE_DOMAIN))
            .collect();
        let user_agent = self.driver.user_agent().await?;

        Ok(SessionArtifact {
            cookies,
            user_agent: Some(user_agent),
            exported_at: Some(Utc::now()),
        })
    }
}

#[async_trait]
impl<D: BrowserDriver> PlatformAutomation for PlatformSession<D> {
    async fn login(&mut self, credentials: &Credentials, mode: LoginMode) -> AutomationResult<()> {
        self.login_flow(credentials, mode).await
    }

    async fn is_session_valid(&mut self) -> AutomationResult<bool> {
        self.check_session().await
    }

    async fn view_profile(&mut self, profile_url: &str) -> AutomationResult<ProfileData> {
        self.profile_flow(profile_url).await
    }

    async fn send_connection_request(
        &mut self,
        profile_url: &str,
        note: Option<&str>
    ) -> AutomationResult<ConnectionOutcome> {
        self.connect_flow(profile_url, note).await
    }

    async fn send_message(&mut self, profile_url: &str, text: &str) -> AutomationResult<String> {
        self.message_flow(profile_url, text).await
    }

    async fn check_connection_accepted(
        &mut self,
        profile_url: &str
    ) -> AutomationResult<AcceptanceOutcome> {
        let profile = self.profile_flow(profile_url).await?;
        Ok(AcceptanceOutcome { is_connected: profile.is_connected })
    }

    async fn sync_messages(
        &mut self,
        since: Option<DateTime<Utc>>
    ) -> AutomationResult<Vec<SyncedMessage>> {
        self.sync_flow(since).await
    }

    async fn export_session(&mut self) -> AutomationResult<SessionArtifact> {
        self.export_flow().await
    }

    async fn close(&mut self) -> AutomationResult<()> {
        self.driver.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_url() {
        assert_eq!(classify_url("https://www.linkedin.com/feed/"), PageKind::Feed);
        assert_eq!(classify_url("https://www.linkedin.com/login"), PageKind::Login);
        assert_eq!(
            classify_url("https://www.linkedin.com/uas/login-submit"),
            PageKind::Login
        );
        assert_eq!(
            classify_url("https://www.linkedin.com/checkpoint/challenge/abc"),
            PageKind::Checkpoint
        );
        assert_eq!(classify_url("https://www.linkedin.com/in/someone/"), PageKind::Other);
    }

    #[test]
    fn test_checkpoint_wins_over_feed_fragment() {
        // A challenge URL that mentions the feed as its redirect target
        // is still a challenge.
        assert_eq!(
            classify_url("https://www.linkedin.com/checkpoint/challenge?redirect=/feed/"),
            PageKind::Checkpoint
        );
    }
}
