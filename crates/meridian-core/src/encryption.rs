//! Sealing of integration credentials before they reach the database.
//!
//! A sealed value is `base64(nonce || ciphertext || tag)` under AES-256-GCM.
//! Every call draws a fresh nonce, so sealing the same token twice gives two
//! different strings.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::AppError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

fn sealing_error(what: &str, detail: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("{}: {}", what, detail))
}

#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    pub fn from_key_bytes(key: &[u8]) -> Result<Self, AppError> {
        if key.len() != KEY_LEN {
            return Err(AppError::Internal(format!(
                "encryption key has {} bytes, expected {}",
                key.len(),
                KEY_LEN
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| sealing_error("invalid encryption key", e))?;
        Ok(Self { cipher })
    }

    /// Accepts the `ENCRYPTION_KEY` setting: 32 bytes, base64-encoded.
    pub fn from_base64_key(encoded: &str) -> Result<Self, AppError> {
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|e| sealing_error("ENCRYPTION_KEY is not valid base64", e))?;
        Self::from_key_bytes(&key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| sealing_error("sealing failed", e))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    /// Fails on anything not produced by `encrypt` under the same key.
    pub fn decrypt(&self, sealed: &str) -> Result<String, AppError> {
        let raw = STANDARD
            .decode(sealed)
            .map_err(|e| sealing_error("sealed value is not valid base64", e))?;
        if raw.len() <= NONCE_LEN {
            return Err(AppError::Internal("sealed value is truncated".to_string()));
        }

        let (nonce, body) = raw.split_at(NONCE_LEN);
        let opened = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|e| sealing_error("unsealing failed", e))?;
        String::from_utf8(opened).map_err(|e| sealing_error("unsealed value is not UTF-8", e))
    }

    pub fn encrypt_optional(&self, plaintext: Option<&str>) -> Result<Option<String>, AppError> {
        plaintext.map(|p| self.encrypt(p)).transpose()
    }

    /// Empty and missing values both read as `None`.
    pub fn decrypt_optional(&self, sealed: Option<&str>) -> Result<Option<String>, AppError> {
        sealed
            .filter(|s| !s.is_empty())
            .map(|s| self.decrypt(s))
            .transpose()
    }
}
