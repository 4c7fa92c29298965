use crate::automation::{ Credentials, SessionArtifact };
use crate::crypto::Encryptor;
use crate::db::entity::account;
use crate::error::Result;

/// Moves session artifacts and credential bundles between account
/// rows and their usable forms. Everything at rest is ciphertext; a
/// blob that no longer decrypts is a fatal account condition handled
/// by the caller, never retried.
#[derive(Clone)]
pub struct SessionService {
    encryptor: Encryptor,
}

impl SessionService {
    pub fn new(encryptor: Encryptor) -> Self {
        Self { encryptor }
    }

    pub fn load_session(&self, account: &account::Model) -> Result<Option<SessionArtifact>> {
        match account.encrypted_session.as_deref() {
            Some(blob) => Ok(Some(self.encryptor.decrypt_json(blob)?)),
            None => Ok(None),
        }
    }

    pub fn load_credentials(&self, account: &account::Model) -> Result<Option<Credentials>> {
        match account.encrypted_credentials.as_deref() {
            Some(blob) => Ok(Some(self.encryptor.decrypt_json(blob)?)),
            None => Ok(None),
        }
    }

    pub fn seal_session(&self, artifact: &SessionArtifact) -> Result<String> {
        self.encryptor.encrypt_json(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::SessionCookie;
    use chrono::Utc;
    use uuid::Uuid;

    fn service() -> SessionService {
        SessionService::new(Encryptor::new(&[7u8; 32]).unwrap())
    }

    fn account_with(session: Option<String>, credentials: Option<String>) -> account::Model {
        let now = Utc::now();
        account::Model {
            id: Uuid::new_v4(),
            tenant_id: "t1".to_string(),
            display_name: "Test".to_string(),
            profile_url: None,
            status: "connected".to_string(),
            encrypted_session: session,
            encrypted_credentials: credentials,
            connections_today: 0,
            messages_today: 0,
            views_today: 0,
            daily_connection_limit: 20,
            daily_message_limit: 40,
            daily_view_limit: 50,
            counters_reset_on: now.date_naive(),
            warming_up: false,
            warmup_day: 0,
            last_verified_at: None,
            last_synced_at: None,
            error_code: None,
            error_message: None,
            locked_at: None,
            locked_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_session_round_trip() {
        let service = service();
        let artifact = SessionArtifact {
            cookies: vec![SessionCookie {
                name: "li_at".to_string(),
                value: "secret-token".to_string(),
                domain: ".linkedin.com".to_string(),
                path: "/".to_string(),
                expires: Some(1_900_000_000.0),
                http_only: true,
                secure: true,
            }],
            user_agent: Some("Mozilla/5.0".to_string()),
            exported_at: Some(Utc::now()),
        };

        let blob = service.seal_session(&artifact).unwrap();
        assert!(!blob.contains("secret-token"));

        let account = account_with(Some(blob), None);
        let loaded = service.load_session(&account).unwrap().unwrap();
        assert_eq!(loaded.cookies.len(), 1);
        assert_eq!(loaded.cookies[0].value, "secret-token");
    }

    #[test]
    fn test_missing_blobs_load_as_none() {
        let service = service();
        let account = account_with(None, None);
        assert!(service.load_session(&account).unwrap().is_none());
        assert!(service.load_credentials(&account).unwrap().is_none());
    }

    #[test]
    fn test_wrong_key_fails_to_load() {
        let sealing = service();
        let artifact = SessionArtifact::default();
        let blob = sealing.seal_session(&artifact).unwrap();

        let other = SessionService::new(Encryptor::new(&[9u8; 32]).unwrap());
        let account = account_with(Some(blob), None);
        assert!(other.load_session(&account).is_err());
    }
}
