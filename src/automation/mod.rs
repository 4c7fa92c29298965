pub mod adapter;

pub use adapter::{
    AcceptanceOutcome,
    AutomationFactory,
    ConnectionOutcome,
    Credentials,
    LoginMode,
    PlatformAutomation,
    ProfileData,
    SessionArtifact,
    SessionCookie,
    StatusFn,
    SyncedMessage,
};
