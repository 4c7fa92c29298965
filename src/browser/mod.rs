pub mod cdp;
pub mod driver;
pub mod flows;
pub mod selectors;
pub mod session;

use std::time::Duration;

use async_trait::async_trait;

use crate::automation::{ AutomationFactory, PlatformAutomation, SessionArtifact };
use crate::error::{ AutomationError, AutomationResult, ErrorCode };

pub use cdp::CdpDriver;
pub use driver::BrowserDriver;
pub use session::PlatformSession;

/// Opens platform sessions on real Chromium instances over CDP.
///
/// Routine work runs against the headless endpoint; recovery work
/// that needs a human goes to the interactive endpoint when one is
/// configured.
pub struct CdpAutomationFactory {
    headless_ws_url: String,
    interactive_ws_url: Option<String>,
    nav_timeout: Duration,
}

impl CdpAutomationFactory {
    pub fn new(
        headless_ws_url: String,
        interactive_ws_url: Option<String>,
        nav_timeout: Duration
    ) -> Self {
        Self { headless_ws_url, interactive_ws_url, nav_timeout }
    }
}

#[async_trait]
impl AutomationFactory for CdpAutomationFactory {
    async fn open(
        &self,
        artifact: Option<&SessionArtifact>,
        visible: bool
    ) -> AutomationResult<Box<dyn PlatformAutomation>> {
        let ws_url = if visible {
            self.interactive_ws_url
                .as_deref()
                .ok_or_else(||
                    AutomationError::new(
                        ErrorCode::Driver,
                        "no interactive browser endpoint configured"
                    )
                )?
        } else {
            self.headless_ws_url.as_str()
        };

        let driver = CdpDriver::connect(ws_url, self.nav_timeout).await?;
        let mut session = PlatformSession::new(driver, self.nav_timeout);
        if let Some(artifact) = artifact {
            session.import(artifact).await?;
        }
        Ok(Box::new(session))
    }
}
