use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };

use crate::error::AutomationResult;

/// Login credentials for a platform account, stored encrypted and
/// decrypted just before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Base32 authenticator secret for accounts with app-based
    /// two-factor enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totp_secret: Option<String>,
}

/// One browser cookie as exported from the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Unix expiry in seconds; None for session cookies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

/// Everything needed to resume a logged-in session in a fresh browser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionArtifact {
    pub cookies: Vec<SessionCookie>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

/// Snapshot of a profile page plus the relationship it shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileData {
    pub profile_url: String,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub is_connected: bool,
    pub invite_pending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOutcome {
    /// The profile was already a connection; nothing was sent.
    pub already_connected: bool,
    /// An invite was already pending, or was just sent.
    pub invite_pending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceOutcome {
    pub is_connected: bool,
}

/// A message pulled out of a conversation thread during an inbox sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncedMessage {
    pub thread_id: String,
    /// Profile URL of the other participant, when the thread exposes it.
    pub participant_url: Option<String>,
    /// Platform-side message identifier when the markup carries one.
    /// Preferred input for the dedup key because it never changes
    /// between syncs.
    pub platform_msg_id: Option<String>,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    /// True when the account itself wrote the message.
    pub outbound: bool,
}

pub type StatusFn = Arc<dyn Fn(&str) + Send + Sync>;

/// How a login attempt is allowed to proceed.
#[derive(Clone)]
pub enum LoginMode {
    /// Fully automated. Any challenge the flow cannot answer itself
    /// (beyond a TOTP prompt) fails the login.
    Headless,
    /// A human is watching a visible browser. Challenges are left on
    /// screen until resolved or the deadline passes; `on_status`
    /// receives coarse progress updates for the operator.
    Interactive {
        timeout: Duration,
        on_status: Option<StatusFn>,
    },
}

impl std::fmt::Debug for LoginMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginMode::Headless => write!(f, "Headless"),
            LoginMode::Interactive { timeout, .. } => {
                write!(f, "Interactive {{ timeout: {:?} }}", timeout)
            }
        }
    }
}

/// Capability surface the engine drives. One instance wraps one live
/// browser session; callers own the session for the duration of an
/// account batch and must `close` it when done.
#[async_trait]
pub trait PlatformAutomation: Send {
    /// Authenticate from credentials, answering the TOTP prompt when a
    /// secret is on file.
    async fn login(&mut self, credentials: &Credentials, mode: LoginMode) -> AutomationResult<()>;

    /// Cheap probe: does the imported session still hold?
    async fn is_session_valid(&mut self) -> AutomationResult<bool>;

    /// Open a profile and extract its public snapshot.
    async fn view_profile(&mut self, profile_url: &str) -> AutomationResult<ProfileData>;

    /// Send a connection request, optionally with a note. Reports
    /// instead of erroring when the relationship already exists.
    async fn send_connection_request(
        &mut self,
        profile_url: &str,
        note: Option<&str>
    ) -> AutomationResult<ConnectionOutcome>;

    /// Message a first-degree connection. Returns the thread id.
    async fn send_message(&mut self, profile_url: &str, text: &str) -> AutomationResult<String>;

    /// Re-visit a profile to see whether an earlier invite was accepted.
    async fn check_connection_accepted(
        &mut self,
        profile_url: &str
    ) -> AutomationResult<AcceptanceOutcome>;

    /// Pull recent conversations from the inbox. `since` trims
    /// messages older than the last sync.
    async fn sync_messages(
        &mut self,
        since: Option<DateTime<Utc>>
    ) -> AutomationResult<Vec<SyncedMessage>>;

    /// Export cookies and fingerprint so the session can be resumed
    /// later without a fresh login.
    async fn export_session(&mut self) -> AutomationResult<SessionArtifact>;

    async fn close(&mut self) -> AutomationResult<()>;
}

/// Opens fresh automation sessions. The executor asks for headless
/// sessions; the verifier asks for visible ones a human can watch.
#[async_trait]
pub trait AutomationFactory: Send + Sync {
    async fn open(
        &self,
        artifact: Option<&SessionArtifact>,
        visible: bool
    ) -> AutomationResult<Box<dyn PlatformAutomation>>;
}
