pub mod account;
pub mod campaign;
pub mod campaign_step;
pub mod campaign_lead;
pub mod action;
pub mod message;

pub use account::Entity as Account;
pub use campaign::Entity as Campaign;
pub use campaign_step::Entity as CampaignStep;
pub use campaign_lead::Entity as CampaignLead;
pub use action::Entity as Action;
pub use message::Entity as Message;
