pub mod encryption;
pub mod totp;

pub use encryption::Encryptor;
pub use totp::{ totp_at, totp_now, totp_previous };
