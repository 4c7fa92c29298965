use std::time::Duration;

use chrono::{ DateTime, Utc };

use crate::automation::{ ConnectionOutcome, ProfileData, SyncedMessage };
use crate::browser::driver::BrowserDriver;
use crate::browser::selectors::*;
use crate::browser::session::PlatformSession;
use crate::error::{ AutomationError, AutomationResult, ErrorCode };

/// Inbox syncs walk at most this many conversations per pass.
const MAX_SYNC_THREADS: usize = 20;

const DIALOG_WAIT: Duration = Duration::from_secs(5);
const COMPOSER_WAIT: Duration = Duration::from_secs(10);
const UI_SETTLE: Duration = Duration::from_millis(500);

/// Scrape the profile header: name, headline, and what the action
/// buttons say about the relationship.
const READ_PROFILE_JS: &str =
    r#"(() => {
  const name = document.querySelector('main h1');
  const headline = document.querySelector('main div.text-body-medium');
  const badge = document.querySelector('span.dist-value');
  const labels = Array.from(document.querySelectorAll('main button, main a.artdeco-button'))
    .map((el) => (el.innerText || '').trim().toLowerCase())
    .filter(Boolean);
  return {
    name: name ? name.innerText.trim() : null,
    headline: headline ? headline.innerText.trim() : null,
    connected: (badge ? badge.innerText.trim() === '1st' : false) ||
      labels.some((t) => t === 'message' || t.startsWith('message ')),
    pending: labels.some((t) => t === 'pending' || t.startsWith('pending ')),
    canConnect: labels.some((t) => t === 'connect' || t.startsWith('connect ')),
    hasActions: labels.length > 0,
  };
})()"#;

const CLICK_CONNECT_JS: &str =
    r#"(() => {
  const openConnect = Array.from(
    document.querySelectorAll("main button, main div[role='button'], div.artdeco-dropdown__content li")
  ).find((el) => (el.innerText || '').trim().toLowerCase() === 'connect');
  if (!openConnect) return false;
  openConnect.click();
  return true;
})()"#;

/// The connect action hides under the overflow menu on some layouts.
const CLICK_MORE_JS: &str =
    r#"(() => {
  const openMore = Array.from(document.querySelectorAll('main button'))
    .find((el) => (el.innerText || '').trim().toLowerCase() === 'more');
  if (!openMore) return false;
  openMore.click();
  return true;
})()"#;

const CLICK_ADD_NOTE_JS: &str =
    r#"(() => {
  const addNote = Array.from(document.querySelectorAll("div[role='dialog'] button"))
    .find((el) => (el.innerText || '').trim().toLowerCase().startsWith('add a note'));
  if (!addNote) return false;
  addNote.click();
  return true;
})()"#;

const CLICK_SEND_INVITE_JS: &str =
    r#"(() => {
  const sendInvite = Array.from(document.querySelectorAll("div[role='dialog'] button"))
    .find((el) => {
      const t = (el.innerText || '').trim().toLowerCase();
      return t === 'send' || t.startsWith('send ');
    });
  if (!sendInvite) return false;
  sendInvite.click();
  return true;
})()"#;

const CLICK_MESSAGE_JS: &str =
    r#"(() => {
  const openMessage = Array.from(document.querySelectorAll('main button, main a.artdeco-button'))
    .find((el) => (el.innerText || '').trim().toLowerCase().startsWith('message'));
  if (!openMessage) return false;
  openMessage.click();
  return true;
})()"#;

const LIST_THREADS_JS: &str =
    r#"(() => {
  return Array.from(document.querySelectorAll('li.msg-conversation-listitem'))
    .slice(0, 20)
    .map((li) => {
      const link = li.querySelector('a.msg-conversation-listitem__link');
      const href = link ? link.getAttribute('href') || '' : '';
      const match = href.match(/thread\/([^/]+)/);
      return match ? match[1] : null;
    })
    .filter(Boolean);
})()"#;

const READ_THREAD_JS: &str =
    r#"(() => {
  const link = document.querySelector('a.msg-thread__link-to-profile');
  const events = Array.from(document.querySelectorAll('li.msg-s-message-list__event')).slice(-25);
  const messages = events
    .map((li) => {
      const body = li.querySelector('p.msg-s-event-listitem__body');
      return {
        id: li.getAttribute('data-event-urn'),
        body: body ? body.innerText.trim() : '',
        outbound: !li.querySelector('.msg-s-event-listitem--other'),
      };
    })
    .filter((m) => m.body);
  return { participantUrl: link ? link.href : null, messages };
})()"#;

impl<D: BrowserDriver> PlatformSession<D> {
    pub(crate) async fn profile_flow(&mut self, profile_url: &str) -> AutomationResult<ProfileData> {
        self.guarded_navigate(profile_url).await?;

        if self.driver.exists(PROFILE_UNAVAILABLE).await? {
            return Err(
                AutomationError::new(
                    ErrorCode::MissingData,
                    format!("profile unavailable: {}", profile_url)
                )
            );
        }

        let snapshot = self.driver.eval(READ_PROFILE_JS).await?;

        let full_name = snapshot["name"].as_str().map(str::to_string);
        let has_actions = snapshot["hasActions"].as_bool().unwrap_or(false);
        if full_name.is_none() && !has_actions {
            // Nothing rendered; likely a slow load rather than a dead page
            return Err(AutomationError::element_not_found(PROFILE_NAME));
        }

        Ok(ProfileData {
            profile_url: profile_url.to_string(),
            full_name,
            headline: snapshot["headline"].as_str().map(str::to_string),
            is_connected: snapshot["connected"].as_bool().unwrap_or(false),
            invite_pending: snapshot["pending"].as_bool().unwrap_or(false),
        })
    }

    pub(crate) async fn connect_flow(
        &mut self,
        profile_url: &str,
        note: Option<&str>
    ) -> AutomationResult<ConnectionOutcome> {
        let profile = self.profile_flow(profile_url).await?;

        if profile.is_connected {
            return Ok(ConnectionOutcome { already_connected: true, invite_pending: false });
        }
        if profile.invite_pending {
            return Ok(ConnectionOutcome { already_connected: false, invite_pending: true });
        }

        let mut clicked = self.driver.eval(CLICK_CONNECT_JS).await?.as_bool().unwrap_or(false);
        if !clicked {
            let opened_menu = self.driver.eval(CLICK_MORE_JS).await?.as_bool().unwrap_or(false);
            if opened_menu {
                tokio::time::sleep(UI_SETTLE).await;
                clicked = self.driver.eval(CLICK_CONNECT_JS).await?.as_bool().unwrap_or(false);
            }
        }
        if !clicked {
            return Err(AutomationError::element_not_found("connect action"));
        }

        // Some layouts send instantly, most open a confirmation dialog
        if self.driver.wait_for(INVITE_DIALOG, DIALOG_WAIT).await? {
            let dialog_text = self.driver
                .text(INVITE_DIALOG).await?
                .unwrap_or_default()
                .to_lowercase();
            if dialog_text.contains("limit") {
                return Err(
                    AutomationError::new(
                        ErrorCode::RateLimited,
                        "platform reports the invitation limit was reached"
                    )
                );
            }

            if let Some(note) = note {
                let note_open = self.driver
                    .eval(CLICK_ADD_NOTE_JS).await?
                    .as_bool()
                    .unwrap_or(false);
                if note_open {
                    tokio::time::sleep(UI_SETTLE).await;
                    self.driver.fill(INVITE_NOTE_TEXTAREA, note).await?;
                }
            }

            let sent = self.driver.eval(CLICK_SEND_INVITE_JS).await?.as_bool().unwrap_or(false);
            if !sent {
                return Err(AutomationError::element_not_found("send invitation button"));
            }
        }

        Ok(ConnectionOutcome { already_connected: false, invite_pending: true })
    }

    pub(crate) async fn message_flow(
        &mut self,
        profile_url: &str,
        text: &str
    ) -> AutomationResult<String> {
        self.guarded_navigate(profile_url).await?;

        let opened = self.driver.eval(CLICK_MESSAGE_JS).await?.as_bool().unwrap_or(false);
        if !opened {
            return Err(AutomationError::element_not_found("message button"));
        }

        if !self.driver.wait_for(MESSAGE_COMPOSER, COMPOSER_WAIT).await? {
            return Err(AutomationError::element_not_found(MESSAGE_COMPOSER));
        }

        self.driver.fill(MESSAGE_COMPOSER, text).await?;
        // The send button enables once the composer has content
        tokio::time::sleep(UI_SETTLE).await;
        self.driver.click(MESSAGE_SEND).await?;
        tokio::time::sleep(UI_SETTLE).await;

        let url = self.driver.current_url().await?;
        Ok(thread_id_from_url(&url).unwrap_or_else(|| synthetic_thread_id(profile_url)))
    }

    pub(crate) async fn sync_flow(
        &mut self,
        _since: Option<DateTime<Utc>>
    ) -> AutomationResult<Vec<SyncedMessage>> {
        self.guarded_navigate(MESSAGING_URL).await?;
        let _ = self.driver.wait_for(CONVERSATION_LIST, COMPOSER_WAIT).await?;

        let listing = self.driver.eval(LIST_THREADS_JS).await?;
        let thread_ids: Vec<String> = listing
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .take(MAX_SYNC_THREADS)
                    .collect()
            })
            .unwrap_or_default();

        let mut synced = Vec::new();
        for thread_id in thread_ids {
            let thread_url = format!("{}thread/{}/", MESSAGING_URL, thread_id);
            self.guarded_navigate(&thread_url).await?;

            // One unreadable thread should not sink the whole sync
            let thread = match self.driver.eval(READ_THREAD_JS).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(thread = %thread_id, error = %e, "skipping unreadable thread");
                    continue;
                }
            };

            let participant_url = thread["participantUrl"].as_str().map(str::to_string);

            let empty = Vec::new();
            let items = thread["messages"].as_array().unwrap_or(&empty);
            for item in items {
                let body = item["body"].as_str().unwrap_or_default();
                if body.is_empty() {
                    continue;
                }
                synced.push(SyncedMessage {
                    thread_id: thread_id.clone(),
                    participant_url: participant_url.clone(),
                    platform_msg_id: item["id"].as_str().map(str::to_string),
                    body: body.to_string(),
                    // The markup does not expose reliable timestamps;
                    // dedup keys keep re-ingestion idempotent anyway.
                    sent_at: Utc::now(),
                    outbound: item["outbound"].as_bool().unwrap_or(false),
                });
            }
        }

        Ok(synced)
    }
}

/// Pull the thread id out of a conversation URL.
pub(crate) fn thread_id_from_url(url: &str) -> Option<String> {
    let marker = "/messaging/thread/";
    let start = url.find(marker)? + marker.len();
    let rest = &url[start..];
    let end = rest.find('/').unwrap_or(rest.len());
    let id = &rest[..end];
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Stable fallback thread handle when a send does not land on a
/// thread URL.
pub(crate) fn synthetic_thread_id(profile_url: &str) -> String {
    let slug = profile_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(profile_url);
    format!("profile:{}", slug)
}

#[cfg(test)]
mod tests {
    use std::collections::{ HashMap, HashSet, VecDeque };
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{ json, Value };

    use super::*;
    use crate::automation::{ Credentials, LoginMode, PlatformAutomation, SessionCookie };
    use crate::browser::selectors::*;
    use crate::browser::session::PlatformSession;

    const PROFILE_URL: &str = "https://www.linkedin.com/in/jane-doe/";

    /// Scripted browser: answers from canned tables and logs what the
    /// flows did to it.
    #[derive(Default)]
    struct ScriptedDriver {
        /// Values returned by successive current_url calls; the last
        /// entry sticks.
        urls: VecDeque<String>,
        /// Selectors exists() answers true for.
        present: HashSet<String>,
        /// Element texts by selector.
        texts: HashMap<String, String>,
        /// Eval results keyed by a distinctive substring of the script.
        scripts: Vec<(&'static str, Value)>,
        navigated: Vec<String>,
        filled: Vec<(String, String)>,
        clicked: Vec<String>,
    }

    impl ScriptedDriver {
        fn with_urls(urls: &[&str]) -> Self {
            Self {
                urls: urls.iter().map(|u| u.to_string()).collect(),
                ..Default::default()
            }
        }

        fn script(mut self, marker: &'static str, value: Value) -> Self {
            self.scripts.push((marker, value));
            self
        }

        fn present(mut self, selector: &str) -> Self {
            self.present.insert(selector.to_string());
            self
        }

        fn text(mut self, selector: &str, text: &str) -> Self {
            self.texts.insert(selector.to_string(), text.to_string());
            self
        }
    }

    #[async_trait]
    impl BrowserDriver for ScriptedDriver {
        async fn navigate(&mut self, url: &str) -> AutomationResult<()> {
            self.navigated.push(url.to_string());
            Ok(())
        }

        async fn current_url(&mut self) -> AutomationResult<String> {
            if self.urls.len() > 1 {
                Ok(self.urls.pop_front().unwrap_or_default())
            } else {
                Ok(self.urls.front().cloned().unwrap_or_default())
            }
        }

        async fn eval(&mut self, script: &str) -> AutomationResult<Value> {
            for (marker, value) in &self.scripts {
                if script.contains(marker) {
                    return Ok(value.clone());
                }
            }
            Ok(Value::Null)
        }

        async fn exists(&mut self, selector: &str) -> AutomationResult<bool> {
            Ok(self.present.contains(selector))
        }

        async fn wait_for(&mut self, selector: &str, _timeout: Duration) -> AutomationResult<bool> {
            Ok(self.present.contains(selector))
        }

        async fn click(&mut self, selector: &str) -> AutomationResult<()> {
            self.clicked.push(selector.to_string());
            Ok(())
        }

        async fn fill(&mut self, selector: &str, value: &str) -> AutomationResult<()> {
            self.filled.push((selector.to_string(), value.to_string()));
            Ok(())
        }

        async fn text(&mut self, selector: &str) -> AutomationResult<Option<String>> {
            Ok(self.texts.get(selector).cloned())
        }

        async fn cookies(&mut self) -> AutomationResult<Vec<SessionCookie>> {
            Ok(
                vec![
                    SessionCookie {
                        name: "li_at".to_string(),
                        value: "tok".to_string(),
                        domain: ".linkedin.com".to_string(),
                        path: "/".to_string(),
                        expires: None,
                        http_only: true,
                        secure: true,
                    },
                    SessionCookie {
                        name: "_ga".to_string(),
                        value: "tracker".to_string(),
                        domain: ".google.com".to_string(),
                        path: "/".to_string(),
                        expires: None,
                        http_only: false,
                        secure: false,
                    }
                ]
            )
        }

        async fn set_cookies(&mut self, _cookies: &[SessionCookie]) -> AutomationResult<()> {
            Ok(())
        }

        async fn user_agent(&mut self) -> AutomationResult<String> {
            Ok("Mozilla/5.0 test".to_string())
        }

        async fn close(&mut self) -> AutomationResult<()> {
            Ok(())
        }
    }

    fn session(driver: ScriptedDriver) -> PlatformSession<ScriptedDriver> {
        PlatformSession::new(driver, Duration::from_secs(30))
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "jane@example.com".to_string(),
            password: "hunter2".to_string(),
            totp_secret: None,
        }
    }

    #[tokio::test]
    async fn test_login_success() {
        let driver = ScriptedDriver::with_urls(
            &["https://www.linkedin.com/login", "https://www.linkedin.com/feed/"]
        );
        let mut session = session(driver);

        session.login(&credentials(), LoginMode::Headless).await.unwrap();

        let filled = &session.driver.filled;
        assert!(filled.iter().any(|(sel, val)| sel == USERNAME_INPUT && val == "jane@example.com"));
        assert!(filled.iter().any(|(sel, val)| sel == PASSWORD_INPUT && val == "hunter2"));
        assert!(session.driver.clicked.iter().any(|sel| sel == LOGIN_SUBMIT));
    }

    #[tokio::test]
    async fn test_login_rejected_credentials() {
        let driver = ScriptedDriver::with_urls(
            &["https://www.linkedin.com/login", "https://www.linkedin.com/login"]
        ).present(LOGIN_ERROR);
        let mut session = session(driver);

        let err = session.login(&credentials(), LoginMode::Headless).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_login_checkpoint_fails_headless() {
        let driver = ScriptedDriver::with_urls(
            &[
                "https://www.linkedin.com/login",
                "https://www.linkedin.com/checkpoint/challenge/abc",
            ]
        );
        let mut session = session(driver);

        let err = session.login(&credentials(), LoginMode::Headless).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Checkpoint);
    }

    #[tokio::test]
    async fn test_login_answers_totp_prompt() {
        let driver = ScriptedDriver::with_urls(
            &[
                "https://www.linkedin.com/login",
                "https://www.linkedin.com/checkpoint/challenge/abc",
                "https://www.linkedin.com/feed/",
            ]
        ).present(TOTP_INPUT);
        let mut session = session(driver);

        let mut creds = credentials();
        creds.totp_secret = Some("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ".to_string());

        session.login(&creds, LoginMode::Headless).await.unwrap();

        let code_entry = session.driver.filled
            .iter()
            .find(|(sel, _)| sel == TOTP_INPUT)
            .cloned();
        let (_, code) = code_entry.expect("a TOTP code should have been typed");
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_login_restriction_banner_means_suspended() {
        let driver = ScriptedDriver::with_urls(
            &[
                "https://www.linkedin.com/login",
                "https://www.linkedin.com/checkpoint/challenge/abc",
            ]
        ).present(RESTRICTION_BANNER);
        let mut session = session(driver);

        let err = session.login(&credentials(), LoginMode::Headless).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Suspended);
    }

    #[tokio::test]
    async fn test_session_validity_probe() {
        let driver = ScriptedDriver::with_urls(&["https://www.linkedin.com/feed/"]);
        let mut valid_session = session(driver);
        assert!(valid_session.is_session_valid().await.unwrap());

        let driver = ScriptedDriver::with_urls(
            &["https://www.linkedin.com/login?session_redirect=%2Ffeed%2F"]
        );
        let mut stale_session = session(driver);
        assert!(!stale_session.is_session_valid().await.unwrap());
    }

    #[tokio::test]
    async fn test_session_probe_checkpoint_is_an_error_not_invalid() {
        let driver = ScriptedDriver::with_urls(
            &["https://www.linkedin.com/checkpoint/challenge/abc"]
        );
        let mut walled_session = session(driver);

        // A challenge wall is not "stale, log in again"; the caller
        // must surface it so the account gets parked for a human.
        let err = walled_session.is_session_valid().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Checkpoint);
    }

    #[tokio::test]
    async fn test_login_retries_totp_with_previous_window() {
        use std::time::{ SystemTime, UNIX_EPOCH };

        use crate::crypto::totp;

        let driver = ScriptedDriver::with_urls(
            &[
                "https://www.linkedin.com/login",
                "https://www.linkedin.com/checkpoint/challenge/abc",
                "https://www.linkedin.com/checkpoint/challenge/abc",
                "https://www.linkedin.com/checkpoint/challenge/abc",
            ]
        ).present(TOTP_INPUT);
        let mut session = session(driver);

        let secret = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
        let mut creds = credentials();
        creds.totp_secret = Some(secret.to_string());

        let before = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let err = session.login(&creds, LoginMode::Headless).await.unwrap_err();
        let after = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        assert_eq!(err.code, ErrorCode::Checkpoint);

        let codes: Vec<&String> = session.driver.filled
            .iter()
            .filter(|(sel, _)| sel == TOTP_INPUT)
            .map(|(_, code)| code)
            .collect();
        assert_eq!(codes.len(), 2, "one retry, then give the challenge up");
        assert!(codes.iter().all(|c| c.len() == 6 && c.chars().all(|d| d.is_ascii_digit())));

        // The retry must come from the window before the wall clock's.
        // Bracket the clock so a step boundary mid-login cannot flake
        // the assertion.
        let low = totp::totp_at(secret, before - 30).unwrap();
        let high = totp::totp_at(secret, after - 30).unwrap();
        assert!(*codes[1] == low || *codes[1] == high);
    }

    #[tokio::test]
    async fn test_profile_flow_reads_snapshot() {
        let driver = ScriptedDriver::with_urls(&[PROFILE_URL]).script(
            "canConnect",
            json!({
                "name": "Jane Doe",
                "headline": "VP Engineering",
                "connected": false,
                "pending": false,
                "canConnect": true,
                "hasActions": true,
            })
        );
        let mut session = session(driver);

        let profile = session.view_profile(PROFILE_URL).await.unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(profile.headline.as_deref(), Some("VP Engineering"));
        assert!(!profile.is_connected);
        assert!(!profile.invite_pending);
    }

    #[tokio::test]
    async fn test_profile_flow_session_expiry() {
        let driver = ScriptedDriver::with_urls(&["https://www.linkedin.com/login"]);
        let mut session = session(driver);

        let err = session.view_profile(PROFILE_URL).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionExpired);
    }

    #[tokio::test]
    async fn test_connect_flow_short_circuits_when_connected() {
        let driver = ScriptedDriver::with_urls(&[PROFILE_URL]).script(
            "canConnect",
            json!({
                "name": "Jane Doe",
                "headline": null,
                "connected": true,
                "pending": false,
                "canConnect": false,
                "hasActions": true,
            })
        );
        let mut session = session(driver);

        let outcome = session.send_connection_request(PROFILE_URL, None).await.unwrap();
        assert!(outcome.already_connected);
        assert!(!outcome.invite_pending);
    }

    #[tokio::test]
    async fn test_connect_flow_sends_invite_with_note() {
        let driver = ScriptedDriver::with_urls(&[PROFILE_URL])
            .script(
                "canConnect",
                json!({
                    "name": "Jane Doe",
                    "headline": null,
                    "connected": false,
                    "pending": false,
                    "canConnect": true,
                    "hasActions": true,
                })
            )
            .script("openConnect", json!(true))
            .script("addNote", json!(true))
            .script("sendInvite", json!(true))
            .present(INVITE_DIALOG);
        let mut session = session(driver);

        let outcome = session
            .send_connection_request(PROFILE_URL, Some("Hi Jane, great talk last week"))
            .await
            .unwrap();

        assert!(!outcome.already_connected);
        assert!(outcome.invite_pending);
        assert!(
            session.driver.filled
                .iter()
                .any(|(sel, val)| sel == INVITE_NOTE_TEXTAREA && val.starts_with("Hi Jane"))
        );
    }

    #[tokio::test]
    async fn test_connect_flow_detects_invite_limit() {
        let driver = ScriptedDriver::with_urls(&[PROFILE_URL])
            .script(
                "canConnect",
                json!({
                    "name": "Jane Doe",
                    "headline": null,
                    "connected": false,
                    "pending": false,
                    "canConnect": true,
                    "hasActions": true,
                })
            )
            .script("openConnect", json!(true))
            .present(INVITE_DIALOG)
            .text(INVITE_DIALOG, "You've reached the weekly invitation limit");
        let mut session = session(driver);

        let err = session.send_connection_request(PROFILE_URL, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimited);
    }

    #[tokio::test]
    async fn test_message_flow_returns_thread_id() {
        let driver = ScriptedDriver::with_urls(
            &[PROFILE_URL, "https://www.linkedin.com/messaging/thread/2-abc123==/"]
        )
            .script("openMessage", json!(true))
            .present(MESSAGE_COMPOSER);
        let mut session = session(driver);

        let thread_id = session.send_message(PROFILE_URL, "Thanks for connecting!").await.unwrap();

        assert_eq!(thread_id, "2-abc123==");
        assert!(
            session.driver.filled
                .iter()
                .any(|(sel, val)| sel == MESSAGE_COMPOSER && val == "Thanks for connecting!")
        );
        assert!(session.driver.clicked.iter().any(|sel| sel == MESSAGE_SEND));
    }

    #[tokio::test]
    async fn test_sync_flow_collects_thread_messages() {
        let driver = ScriptedDriver::with_urls(&["https://www.linkedin.com/messaging/"])
            .script("msg-conversation-listitem", json!(["2-aaa", "2-bbb"]))
            .script(
                "participantUrl",
                json!({
                    "participantUrl": "https://www.linkedin.com/in/jane-doe/",
                    "messages": [
                        { "id": "urn:li:msg:1", "body": "Thanks for reaching out", "outbound": false },
                        { "id": "urn:li:msg:2", "body": "My pleasure!", "outbound": true },
                    ],
                })
            );
        let mut session = session(driver);

        let synced = session.sync_messages(None).await.unwrap();

        // Two threads, two messages each
        assert_eq!(synced.len(), 4);
        assert!(synced.iter().all(|m| m.participant_url.is_some()));
        assert_eq!(synced.iter().filter(|m| m.outbound).count(), 2);
        assert_eq!(synced[0].thread_id, "2-aaa");
        assert_eq!(synced[0].platform_msg_id.as_deref(), Some("urn:li:msg:1"));
    }

    #[tokio::test]
    async fn test_export_session_filters_foreign_cookies() {
        let driver = ScriptedDriver::with_urls(&["https://www.linkedin.com/feed/"]);
        let mut session = session(driver);

        let artifact = session.export_session().await.unwrap();
        assert_eq!(artifact.cookies.len(), 1);
        assert_eq!(artifact.cookies[0].name, "li_at");
        assert!(artifact.user_agent.is_some());
        assert!(artifact.exported_at.is_some());
    }

    #[tokio::test]
    async fn test_interactive_login_reports_status() {
        let driver = ScriptedDriver::with_urls(
            &["https://www.linkedin.com/login", "https://www.linkedin.com/feed/"]
        );
        let mut session = session(driver);

        let seen: Arc<std::sync::Mutex<Vec<String>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mode = LoginMode::Interactive {
            timeout: Duration::from_secs(30),
            on_status: Some(
                Arc::new(move |status: &str| {
                    if let Ok(mut log) = sink.lock() {
                        log.push(status.to_string());
                    }
                })
            ),
        };

        session.login(&credentials(), mode).await.unwrap();

        let log = seen.lock().unwrap();
        assert!(log.contains(&"submitting_credentials".to_string()));
        assert!(log.contains(&"logged_in".to_string()));
    }

    #[test]
    fn test_thread_id_from_url() {
        assert_eq!(
            thread_id_from_url("https://www.linkedin.com/messaging/thread/2-abc==/"),
            Some("2-abc==".to_string())
        );
        assert_eq!(
            thread_id_from_url("https://www.linkedin.com/messaging/thread/2-abc=="),
            Some("2-abc==".to_string())
        );
        assert_eq!(thread_id_from_url("https://www.linkedin.com/feed/"), None);
    }

    #[test]
    fn test_synthetic_thread_id() {
        assert_eq!(
            synthetic_thread_id("https://www.linkedin.com/in/jane-doe/"),
            "profile:jane-doe"
        );
        assert_eq!(synthetic_thread_id("https://www.linkedin.com/in/jdoe"), "profile:jdoe");
    }
}
