pub mod config;
pub mod enums;
pub mod error;
pub mod crypto;
pub mod db;
pub mod automation;
pub mod browser;
pub mod services;
pub mod scheduler;
pub mod executor;
pub mod verifier;
pub mod worker;

pub use config::Config;
pub use enums::{
    AccountStatus,
    ActionKind,
    ActionStatus,
    CampaignStatus,
    LeadStatus,
    MessageDirection,
};
pub use error::{ AppError, ErrorCode, Result };
