pub mod lead_service;
pub mod limit_service;
pub mod message_service;
pub mod session_service;

pub use lead_service::LeadService;
pub use limit_service::LimitService;
pub use message_service::MessageService;
pub use session_service::SessionService;
