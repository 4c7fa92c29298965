//! Page map for the target platform. Everything that couples the
//! flows to current markup lives here, so selector churn stays a
//! one-file fix.

pub const LOGIN_URL: &str = "https://www.linkedin.com/login";
pub const FEED_URL: &str = "https://www.linkedin.com/feed/";
pub const MESSAGING_URL: &str = "https://www.linkedin.com/messaging/";

/// URL fragments that identify where a redirect landed us.
pub const LOGIN_PATH: &str = "/login";
pub const UAS_LOGIN_PATH: &str = "/uas/";
pub const CHECKPOINT_PATH: &str = "/checkpoint";
pub const FEED_PATH: &str = "/feed";

pub const COOKIE_DOMAIN: &str = "linkedin.com";

// Login form
pub const USERNAME_INPUT: &str = "input#username";
pub const PASSWORD_INPUT: &str = "input#password";
pub const LOGIN_SUBMIT: &str = "form.login__form button[type='submit'], button[type='submit']";
pub const LOGIN_ERROR: &str = "#error-for-password, #error-for-username";

// Two-factor prompt inside the checkpoint flow
pub const TOTP_INPUT: &str = "input#input__phone_verification_pin, input[name='pin']";
pub const TOTP_SUBMIT: &str = "#two-step-submit-button, button[type='submit']";

/// Banner shown when the account has been restricted outright.
pub const RESTRICTION_BANNER: &str = ".account-restricted, [data-test-restricted-banner]";

// Profile page
pub const PROFILE_NAME: &str = "main h1";
pub const PROFILE_HEADLINE: &str = "main div.text-body-medium";
pub const PROFILE_UNAVAILABLE: &str = "section.profile-unavailable, .not-found-404";

// Messaging
pub const CONVERSATION_LIST: &str = "ul.msg-conversations-container__conversations-list";
pub const MESSAGE_COMPOSER: &str = "div.msg-form__contenteditable[role='textbox']";
pub const MESSAGE_SEND: &str = "button.msg-form__send-button";

// Invite dialog
pub const INVITE_DIALOG: &str = "div[role='dialog']";
pub const INVITE_NOTE_TEXTAREA: &str = "div[role='dialog'] textarea#custom-message";
