use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")] Database(#[from] sea_orm::DbErr),

    #[error("Encryption error: {0}")] Encryption(String),

    #[error("Invalid input: {0}")] InvalidInput(String),

    #[error("Account not found")]
    AccountNotFound,

    #[error("Automation error: {0}")] Automation(#[from] AutomationError),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Internal error: {0}")] Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure taxonomy for everything that happens inside a browser session.
/// The code is persisted on actions and accounts, so executor and verifier
/// decisions survive process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCode {
    /// Platform redirected to the login page mid-session.
    SessionExpired,
    /// Security challenge or verification wall that needs a human.
    Checkpoint,
    InvalidCredentials,
    /// Platform suspended or restricted the account.
    Suspended,
    /// Platform-side throttling response.
    RateLimited,
    Navigation,
    ElementNotFound,
    Timeout,
    /// Action row is missing data required to execute it.
    MissingData,
    /// Stored session or credential blob could not be decrypted.
    DecryptFailed,
    /// Browser endpoint or protocol failure.
    Driver,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SessionExpired => "session_expired",
            ErrorCode::Checkpoint => "checkpoint",
            ErrorCode::InvalidCredentials => "invalid_credentials",
            ErrorCode::Suspended => "suspended",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::Navigation => "navigation",
            ErrorCode::ElementNotFound => "element_not_found",
            ErrorCode::Timeout => "timeout",
            ErrorCode::MissingData => "missing_data",
            ErrorCode::DecryptFailed => "decrypt_failed",
            ErrorCode::Driver => "driver",
            ErrorCode::Unknown => "unknown",
        }
    }

    /// Whether a failed action with this code may be rescheduled for
    /// another attempt. Codes that imply the same failure would repeat
    /// (or that the account itself is unusable) are not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            | ErrorCode::SessionExpired
            | ErrorCode::RateLimited
            | ErrorCode::Navigation
            | ErrorCode::ElementNotFound
            | ErrorCode::Timeout
            | ErrorCode::Driver
            | ErrorCode::Unknown => true,
            | ErrorCode::Checkpoint
            | ErrorCode::InvalidCredentials
            | ErrorCode::Suspended
            | ErrorCode::MissingData
            | ErrorCode::DecryptFailed => false,
        }
    }

    /// Whether the session should be rebuilt from stored credentials
    /// before any further action on the account.
    pub fn needs_relogin(&self) -> bool {
        matches!(self, ErrorCode::SessionExpired)
    }

    /// Account status to record when this failure ends a batch.
    /// None means the account itself is still healthy.
    pub fn account_status_on_failure(&self) -> Option<crate::enums::AccountStatus> {
        use crate::enums::AccountStatus;

        match self {
            ErrorCode::Checkpoint => Some(AccountStatus::NeedsAttention),
            ErrorCode::InvalidCredentials => Some(AccountStatus::Disconnected),
            ErrorCode::Suspended => Some(AccountStatus::Suspended),
            ErrorCode::DecryptFailed => Some(AccountStatus::Disconnected),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "session_expired" => Ok(ErrorCode::SessionExpired),
            "checkpoint" => Ok(ErrorCode::Checkpoint),
            "invalid_credentials" => Ok(ErrorCode::InvalidCredentials),
            "suspended" => Ok(ErrorCode::Suspended),
            "rate_limited" => Ok(ErrorCode::RateLimited),
            "navigation" => Ok(ErrorCode::Navigation),
            "element_not_found" => Ok(ErrorCode::ElementNotFound),
            "timeout" => Ok(ErrorCode::Timeout),
            "missing_data" => Ok(ErrorCode::MissingData),
            "decrypt_failed" => Ok(ErrorCode::DecryptFailed),
            "driver" => Ok(ErrorCode::Driver),
            "unknown" => Ok(ErrorCode::Unknown),
            _ => Err(AppError::InvalidInput(format!("Invalid error code: {}", s))),
        }
    }
}

/// Error raised by the automation adapter and browser layer.
#[derive(Error, Debug, Clone)]
#[error("{code}: {message}")]
pub struct AutomationError {
    pub code: ErrorCode,
    pub message: String,
}

impl AutomationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn driver(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Driver, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    pub fn navigation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Navigation, message)
    }

    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::new(ErrorCode::ElementNotFound, selector)
    }
}

pub type AutomationResult<T> = std::result::Result<T, AutomationError>;
