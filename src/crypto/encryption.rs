use aes_gcm::{ aead::{ Aead, AeadCore, KeyInit, OsRng }, Aes256Gcm, Nonce };
use serde::{ de::DeserializeOwned, Serialize };

use crate::error::{ AppError, Result };

/// AES-256-GCM wrapper for credential and session blobs at rest.
/// Output format is hex(nonce || ciphertext) with a fresh 12-byte
/// nonce per call.
#[derive(Clone)]
pub struct Encryptor {
    cipher: Aes256Gcm,
}

impl Encryptor {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != 32 {
            return Err(AppError::Encryption("Encryption key must be 32 bytes".to_string()));
        }

        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e|
            AppError::Encryption(e.to_string())
        )?;

        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self.cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Encryption(e.to_string()))?;

        // Combine nonce + ciphertext and encode as hex
        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(hex::encode(combined))
    }

    pub fn decrypt(&self, encrypted_hex: &str) -> Result<String> {
        let combined = hex
            ::decode(encrypted_hex)
            .map_err(|e| AppError::Encryption(format!("Invalid hex: {}", e)))?;

        if combined.len() < 12 {
            return Err(AppError::Encryption("Encrypted data too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| AppError::Encryption(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e|
            AppError::Encryption(format!("Invalid UTF-8: {}", e))
        )
    }

    /// Serialize a value to JSON and encrypt it.
    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = serde_json
            ::to_string(value)
            .map_err(|e| AppError::Encryption(format!("Serialization failed: {}", e)))?;
        self.encrypt(&json)
    }

    /// Decrypt and deserialize a JSON value.
    pub fn decrypt_json<T: DeserializeOwned>(&self, encrypted_hex: &str) -> Result<T> {
        let json = self.decrypt(encrypted_hex)?;
        serde_json
            ::from_str(&json)
            .map_err(|e| AppError::Encryption(format!("Deserialization failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = [0u8; 32];
        let encryptor = Encryptor::new(&key).unwrap();

        let plaintext = r#"{"username":"jane@example.com","password":"hunter2"}"#;
        let encrypted = encryptor.encrypt(plaintext).unwrap();
        let decrypted = encryptor.decrypt(&encrypted).unwrap();

        assert_eq!(plaintext, decrypted);
    }

    #[test]
    fn test_different_nonces() {
        let key = [0u8; 32];
        let encryptor = Encryptor::new(&key).unwrap();

        let plaintext = "same plaintext";
        let encrypted1 = encryptor.encrypt(plaintext).unwrap();
        let encrypted2 = encryptor.encrypt(plaintext).unwrap();

        // Different nonces should produce different ciphertexts
        assert_ne!(encrypted1, encrypted2);

        // But both should decrypt to the same plaintext
        assert_eq!(encryptor.decrypt(&encrypted1).unwrap(), plaintext);
        assert_eq!(encryptor.decrypt(&encrypted2).unwrap(), plaintext);
    }

    #[test]
    fn test_decrypt_rejects_tampered_data() {
        let key = [0u8; 32];
        let encryptor = Encryptor::new(&key).unwrap();

        let mut encrypted = encryptor.encrypt("session cookies").unwrap();
        // Flip a ciphertext nibble
        let last = encrypted.pop().unwrap();
        encrypted.push(if last == '0' { '1' } else { '0' });

        assert!(encryptor.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let encryptor_a = Encryptor::new(&[1u8; 32]).unwrap();
        let encryptor_b = Encryptor::new(&[2u8; 32]).unwrap();

        let encrypted = encryptor_a.encrypt("secret").unwrap();
        assert!(encryptor_b.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Blob {
            user: String,
            pins: Vec<u32>,
        }

        let key = [7u8; 32];
        let encryptor = Encryptor::new(&key).unwrap();

        let blob = Blob { user: "jane".to_string(), pins: vec![1, 2, 3] };
        let encrypted = encryptor.encrypt_json(&blob).unwrap();
        let decrypted: Blob = encryptor.decrypt_json(&encrypted).unwrap();

        assert_eq!(blob, decrypted);
    }
}
