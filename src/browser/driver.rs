use std::time::Duration;

use async_trait::async_trait;

use crate::automation::SessionCookie;
use crate::error::AutomationResult;

/// Minimal browser surface the session flows are written against.
/// Production uses the DevTools implementation; tests script one.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigate and wait for the document to finish loading.
    async fn navigate(&mut self, url: &str) -> AutomationResult<()>;

    async fn current_url(&mut self) -> AutomationResult<String>;

    /// Evaluate a script in the page and return its JSON value.
    async fn eval(&mut self, script: &str) -> AutomationResult<serde_json::Value>;

    async fn exists(&mut self, selector: &str) -> AutomationResult<bool>;

    /// Poll for a selector. Returns false on deadline, it is not an
    /// error for an element to never appear.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> AutomationResult<bool>;

    async fn click(&mut self, selector: &str) -> AutomationResult<()>;

    /// Set an input's value the way a user would, events included.
    async fn fill(&mut self, selector: &str, value: &str) -> AutomationResult<()>;

    async fn text(&mut self, selector: &str) -> AutomationResult<Option<String>>;

    async fn cookies(&mut self) -> AutomationResult<Vec<SessionCookie>>;

    async fn set_cookies(&mut self, cookies: &[SessionCookie]) -> AutomationResult<()>;

    async fn user_agent(&mut self) -> AutomationResult<String>;

    async fn close(&mut self) -> AutomationResult<()>;
}
