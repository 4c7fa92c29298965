use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ─── AccountStatus ───────────────────────────────────────────────────

/// Lifecycle of a platform account managed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Waiting for an interactive login pass.
    Verifying,
    /// Healthy session on file; eligible for action execution.
    Connected,
    /// No usable session and no way to rebuild one automatically.
    Disconnected,
    /// Session expired; a headless re-login is in flight.
    Reconnecting,
    /// A human has to resolve a challenge before automation can resume.
    NeedsAttention,
    Suspended,
    /// Platform throttled the account; cleared at the next daily rollover.
    RateLimited,
}

impl AccountStatus {
    /// Canonical string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Verifying => "verifying",
            AccountStatus::Connected => "connected",
            AccountStatus::Disconnected => "disconnected",
            AccountStatus::Reconnecting => "reconnecting",
            AccountStatus::NeedsAttention => "needs_attention",
            AccountStatus::Suspended => "suspended",
            AccountStatus::RateLimited => "rate_limited",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "verifying" => Ok(AccountStatus::Verifying),
            "connected" => Ok(AccountStatus::Connected),
            "disconnected" => Ok(AccountStatus::Disconnected),
            "reconnecting" => Ok(AccountStatus::Reconnecting),
            "needs_attention" => Ok(AccountStatus::NeedsAttention),
            "suspended" => Ok(AccountStatus::Suspended),
            "rate_limited" => Ok(AccountStatus::RateLimited),
            _ => Err(AppError::InvalidInput(format!("Invalid account status: {}", s))),
        }
    }
}

// ─── CampaignStatus ──────────────────────────────────────────────────

/// Campaign lifecycle. Only active campaigns are materialized by the
/// scheduler; pausing cancels whatever is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Archived,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(CampaignStatus::Draft),
            "active" => Ok(CampaignStatus::Active),
            "paused" => Ok(CampaignStatus::Paused),
            "completed" => Ok(CampaignStatus::Completed),
            "archived" => Ok(CampaignStatus::Archived),
            _ => Err(AppError::InvalidInput(format!("Invalid campaign status: {}", s))),
        }
    }
}

// ─── LeadStatus ──────────────────────────────────────────────────────

/// Per-lead progress through a campaign sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadStatus {
    Pending,
    CheckingProfile,
    ConnectionSent,
    AwaitingAccept,
    Connected,
    Messaged,
    AwaitingReply,
    Replied,
    Completed,
    Failed,
    Skipped,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::CheckingProfile => "checking_profile",
            LeadStatus::ConnectionSent => "connection_sent",
            LeadStatus::AwaitingAccept => "awaiting_accept",
            LeadStatus::Connected => "connected",
            LeadStatus::Messaged => "messaged",
            LeadStatus::AwaitingReply => "awaiting_reply",
            LeadStatus::Replied => "replied",
            LeadStatus::Completed => "completed",
            LeadStatus::Failed => "failed",
            LeadStatus::Skipped => "skipped",
        }
    }

    /// Terminal leads never receive further actions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LeadStatus::Replied | LeadStatus::Completed | LeadStatus::Failed | LeadStatus::Skipped
        )
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(LeadStatus::Pending),
            "checking_profile" => Ok(LeadStatus::CheckingProfile),
            "connection_sent" => Ok(LeadStatus::ConnectionSent),
            "awaiting_accept" => Ok(LeadStatus::AwaitingAccept),
            "connected" => Ok(LeadStatus::Connected),
            "messaged" => Ok(LeadStatus::Messaged),
            "awaiting_reply" => Ok(LeadStatus::AwaitingReply),
            "replied" => Ok(LeadStatus::Replied),
            "completed" => Ok(LeadStatus::Completed),
            "failed" => Ok(LeadStatus::Failed),
            "skipped" => Ok(LeadStatus::Skipped),
            _ => Err(AppError::InvalidInput(format!("Invalid lead status: {}", s))),
        }
    }
}

// ─── ActionStatus ────────────────────────────────────────────────────

/// Status of a materialized unit of browser work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    /// Claimed but not executed: the owning lead left the sequence
    /// between scheduling and dispatch.
    Skipped,
    Cancelled,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::InProgress => "in_progress",
            ActionStatus::Completed => "completed",
            ActionStatus::Failed => "failed",
            ActionStatus::Skipped => "skipped",
            ActionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ActionStatus::Pending),
            "in_progress" => Ok(ActionStatus::InProgress),
            "completed" => Ok(ActionStatus::Completed),
            "failed" => Ok(ActionStatus::Failed),
            "skipped" => Ok(ActionStatus::Skipped),
            "cancelled" => Ok(ActionStatus::Cancelled),
            _ => Err(AppError::InvalidInput(format!("Invalid action status: {}", s))),
        }
    }
}

// ─── ActionKind ──────────────────────────────────────────────────────

/// What a single action does inside the browser. Campaign steps may
/// only use the first three; acceptance checks and inbox syncs are
/// created by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    ProfileView,
    ConnectionRequest,
    Message,
    CheckAcceptance,
    SyncMessages,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ProfileView => "profile_view",
            ActionKind::ConnectionRequest => "connection_request",
            ActionKind::Message => "message",
            ActionKind::CheckAcceptance => "check_acceptance",
            ActionKind::SyncMessages => "sync_messages",
        }
    }

    /// Whether campaign authors can use this kind as a sequence step.
    pub fn is_step_kind(&self) -> bool {
        matches!(
            self,
            ActionKind::ProfileView | ActionKind::ConnectionRequest | ActionKind::Message
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "profile_view" => Ok(ActionKind::ProfileView),
            "connection_request" => Ok(ActionKind::ConnectionRequest),
            "message" => Ok(ActionKind::Message),
            "check_acceptance" => Ok(ActionKind::CheckAcceptance),
            "sync_messages" => Ok(ActionKind::SyncMessages),
            _ => Err(AppError::InvalidInput(format!(
                "Invalid action kind: {}. Supported: profile_view, connection_request, message, check_acceptance, sync_messages",
                s
            ))),
        }
    }
}

// ─── MessageDirection ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::Inbound => "inbound",
            MessageDirection::Outbound => "outbound",
        }
    }
}

impl fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inbound" => Ok(MessageDirection::Inbound),
            "outbound" => Ok(MessageDirection::Outbound),
            _ => Err(AppError::InvalidInput(format!("Invalid message direction: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips() {
        assert_eq!("connected".parse::<AccountStatus>().unwrap(), AccountStatus::Connected);
        assert_eq!(
            "needs_attention".parse::<AccountStatus>().unwrap(),
            AccountStatus::NeedsAttention
        );
        assert_eq!("paused".parse::<CampaignStatus>().unwrap(), CampaignStatus::Paused);
        assert_eq!("awaiting_accept".parse::<LeadStatus>().unwrap(), LeadStatus::AwaitingAccept);
        assert_eq!("in_progress".parse::<ActionStatus>().unwrap(), ActionStatus::InProgress);
        assert_eq!("check_acceptance".parse::<ActionKind>().unwrap(), ActionKind::CheckAcceptance);
        assert!("bogus".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn test_terminal_leads() {
        for status in [
            LeadStatus::Replied,
            LeadStatus::Completed,
            LeadStatus::Failed,
            LeadStatus::Skipped,
        ] {
            assert!(status.is_terminal());
        }
        for status in [
            LeadStatus::Pending,
            LeadStatus::ConnectionSent,
            LeadStatus::AwaitingAccept,
            LeadStatus::Connected,
            LeadStatus::AwaitingReply,
        ] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn test_step_kinds() {
        assert!(ActionKind::ProfileView.is_step_kind());
        assert!(ActionKind::ConnectionRequest.is_step_kind());
        assert!(ActionKind::Message.is_step_kind());
        assert!(!ActionKind::CheckAcceptance.is_step_kind());
        assert!(!ActionKind::SyncMessages.is_step_kind());
    }
}
