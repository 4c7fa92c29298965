use std::time::{ Duration, Instant };

use async_trait::async_trait;
use futures::{ SinkExt, StreamExt };
use serde_json::{ json, Value };
use tokio::net::TcpStream;
use tokio_tungstenite::{ connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream };

use crate::automation::SessionCookie;
use crate::browser::driver::BrowserDriver;
use crate::error::{ AutomationError, AutomationResult };

const COMMAND_TIMEOUT: Duration = Duration::from_secs(20);
const LOAD_POLL: Duration = Duration::from_millis(250);

/// Chrome DevTools Protocol driver speaking to an already-running
/// browser over its websocket endpoint. Each driver owns one fresh
/// tab, attached with a flattened session so tab commands and browser
/// commands share the connection.
pub struct CdpDriver {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
    session_id: Option<String>,
    target_id: Option<String>,
    nav_timeout: Duration,
}

impl CdpDriver {
    pub async fn connect(ws_url: &str, nav_timeout: Duration) -> AutomationResult<Self> {
        let (ws, _) = connect_async(ws_url).await.map_err(|e|
            AutomationError::driver(format!("websocket connect to {} failed: {}", ws_url, e))
        )?;

        let mut driver = Self {
            ws,
            next_id: 1,
            session_id: None,
            target_id: None,
            nav_timeout,
        };

        let created = driver.command(
            "Target.createTarget",
            json!({ "url": "about:blank" }),
            false
        ).await?;
        let target_id = created["targetId"]
            .as_str()
            .ok_or_else(|| AutomationError::driver("Target.createTarget returned no targetId"))?
            .to_string();

        let attached = driver.command(
            "Target.attachToTarget",
            json!({ "targetId": target_id, "flatten": true }),
            false
        ).await?;
        let session_id = attached["sessionId"]
            .as_str()
            .ok_or_else(|| AutomationError::driver("Target.attachToTarget returned no sessionId"))?
            .to_string();

        driver.target_id = Some(target_id);
        driver.session_id = Some(session_id);

        driver.command("Page.enable", json!({}), true).await?;
        driver.command("Runtime.enable", json!({}), true).await?;

        Ok(driver)
    }

    /// Send one protocol command and wait for its response, skipping
    /// any events that arrive in between.
    async fn command(
        &mut self,
        method: &str,
        params: Value,
        with_session: bool
    ) -> AutomationResult<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let mut envelope = json!({ "id": id, "method": method, "params": params });
        if with_session {
            if let Some(session_id) = &self.session_id {
                envelope["sessionId"] = Value::String(session_id.clone());
            }
        }

        self.ws
            .send(Message::Text(envelope.to_string())).await
            .map_err(|e| AutomationError::driver(format!("send {} failed: {}", method, e)))?;

        let deadline = Instant::now() + COMMAND_TIMEOUT;
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or_else(|| AutomationError::timeout(format!("{} got no response", method)))?;

            let frame = tokio::time
                ::timeout(remaining, self.ws.next()).await
                .map_err(|_| AutomationError::timeout(format!("{} got no response", method)))?
                .ok_or_else(|| AutomationError::driver("browser closed the connection"))?
                .map_err(|e| AutomationError::driver(e.to_string()))?;

            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => {
                    return Err(AutomationError::driver("browser closed the connection"));
                }
                _ => {
                    continue;
                }
            };

            let reply: Value = match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(_) => {
                    continue;
                }
            };

            if reply["id"].as_u64() != Some(id) {
                // Unsolicited event
                continue;
            }

            if let Some(error) = reply.get("error") {
                let message = error["message"].as_str().unwrap_or("protocol error");
                return Err(AutomationError::driver(format!("{}: {}", method, message)));
            }

            let mut reply = reply;
            return Ok(reply["result"].take());
        }
    }

    async fn wait_for_load(&mut self) -> AutomationResult<()> {
        let deadline = Instant::now() + self.nav_timeout;
        loop {
            let state = self.eval("document.readyState").await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AutomationError::timeout("page did not finish loading"));
            }
            tokio::time::sleep(LOAD_POLL).await;
        }
    }
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    async fn navigate(&mut self, url: &str) -> AutomationResult<()> {
        let result = self.command("Page.navigate", json!({ "url": url }), true).await?;

        if let Some(error_text) = result["errorText"].as_str() {
            if !error_text.is_empty() {
                return Err(AutomationError::navigation(format!("{}: {}", url, error_text)));
            }
        }

        self.wait_for_load().await
    }

    async fn current_url(&mut self) -> AutomationResult<String> {
        let value = self.eval("window.location.href").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AutomationError::driver("location.href was not a string"))
    }

    async fn eval(&mut self, script: &str) -> AutomationResult<Value> {
        let result = self.command(
            "Runtime.evaluate",
            json!({
                "expression": script,
                "returnByValue": true,
                "awaitPromise": true,
            }),
            true
        ).await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let description = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("script threw");
            return Err(AutomationError::driver(description.to_string()));
        }

        let mut result = result;
        Ok(result["result"]["value"].take())
    }

    async fn exists(&mut self, selector: &str) -> AutomationResult<bool> {
        let script = format!("!!document.querySelector({})", js_string(selector));
        Ok(self.eval(&script).await?.as_bool().unwrap_or(false))
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> AutomationResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.exists(selector).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(LOAD_POLL).await;
        }
    }

    async fn click(&mut self, selector: &str) -> AutomationResult<()> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             el.scrollIntoView({{ block: 'center' }}); el.click(); return true; }})()",
            js_string(selector)
        );
        let clicked = self.eval(&script).await?.as_bool().unwrap_or(false);
        if clicked {
            Ok(())
        } else {
            Err(AutomationError::element_not_found(selector))
        }
    }

    async fn fill(&mut self, selector: &str, value: &str) -> AutomationResult<()> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             el.focus(); \
             if (el.isContentEditable) {{ el.textContent = {val}; }} else {{ el.value = {val}; }} \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            sel = js_string(selector),
            val = js_string(value)
        );
        let filled = self.eval(&script).await?.as_bool().unwrap_or(false);
        if filled {
            Ok(())
        } else {
            Err(AutomationError::element_not_found(selector))
        }
    }

    async fn text(&mut self, selector: &str) -> AutomationResult<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             return el ? el.innerText.trim() : null; }})()",
            js_string(selector)
        );
        Ok(
            self
                .eval(&script).await?
                .as_str()
                .map(str::to_string)
                .filter(|t| !t.is_empty())
        )
    }

    async fn cookies(&mut self) -> AutomationResult<Vec<SessionCookie>> {
        let result = self.command("Storage.getCookies", json!({}), false).await?;

        let mut cookies = Vec::new();
        if let Some(items) = result["cookies"].as_array() {
            for item in items {
                cookies.push(cookie_from_json(item));
            }
        }
        Ok(cookies)
    }

    async fn set_cookies(&mut self, cookies: &[SessionCookie]) -> AutomationResult<()> {
        if cookies.is_empty() {
            return Ok(());
        }

        let payload: Vec<Value> = cookies.iter().map(cookie_to_json).collect();
        self.command("Storage.setCookies", json!({ "cookies": payload }), false).await?;
        Ok(())
    }

    async fn user_agent(&mut self) -> AutomationResult<String> {
        let value = self.eval("navigator.userAgent").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AutomationError::driver("navigator.userAgent was not a string"))
    }

    async fn close(&mut self) -> AutomationResult<()> {
        if let Some(target_id) = self.target_id.take() {
            let _ = self.command(
                "Target.closeTarget",
                json!({ "targetId": target_id }),
                false
            ).await;
        }
        let _ = self.ws.close(None).await;
        Ok(())
    }
}

/// Escape a Rust string into a JS string literal.
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn cookie_from_json(item: &Value) -> SessionCookie {
    SessionCookie {
        name: item["name"].as_str().unwrap_or_default().to_string(),
        value: item["value"].as_str().unwrap_or_default().to_string(),
        domain: item["domain"].as_str().unwrap_or_default().to_string(),
        path: item["path"].as_str().unwrap_or("/").to_string(),
        expires: item["expires"].as_f64().filter(|e| *e > 0.0),
        http_only: item["httpOnly"].as_bool().unwrap_or(false),
        secure: item["secure"].as_bool().unwrap_or(false),
    }
}

fn cookie_to_json(cookie: &SessionCookie) -> Value {
    let mut value = json!({
        "name": cookie.name,
        "value": cookie.value,
        "domain": cookie.domain,
        "path": cookie.path,
        "httpOnly": cookie.http_only,
        "secure": cookie.secure,
    });
    if let Some(expires) = cookie.expires {
        value["expires"] = json!(expires);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string("plain"), r#""plain""#);
        assert_eq!(js_string(r#"a "quoted" bit"#), r#""a \"quoted\" bit""#);
        assert_eq!(js_string("line\nbreak"), r#""line\nbreak""#);
    }

    #[test]
    fn test_cookie_round_trip() {
        let cookie = SessionCookie {
            name: "li_at".to_string(),
            value: "tok".to_string(),
            domain: ".linkedin.com".to_string(),
            path: "/".to_string(),
            expires: Some(1_900_000_000.0),
            http_only: true,
            secure: true,
        };

        let json = cookie_to_json(&cookie);
        let parsed = cookie_from_json(&json);

        assert_eq!(parsed.name, cookie.name);
        assert_eq!(parsed.value, cookie.value);
        assert_eq!(parsed.domain, cookie.domain);
        assert_eq!(parsed.expires, cookie.expires);
        assert!(parsed.http_only);
        assert!(parsed.secure);
    }

    #[test]
    fn test_session_cookies_have_no_expiry() {
        let json = json!({
            "name": "bcookie",
            "value": "v",
            "domain": ".linkedin.com",
            "path": "/",
            "expires": -1,
            "httpOnly": false,
            "secure": true,
        });

        let parsed = cookie_from_json(&json);
        assert_eq!(parsed.expires, None);
    }
}
