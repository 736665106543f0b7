//! Signed tokens for viewing stored files without a session.
//!
//! Payload: expiry_ts (u64 BE) || storage key bytes.
//! Token = base64url(payload || HMAC-SHA256(secret, payload)).

use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::traits::{StorageError, StorageResult};

const EXPIRY_LEN: usize = 8;
const MAC_LEN: usize = 32; // SHA256

#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self) -> StorageResult<Hmac<Sha256>> {
        Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| StorageError::ConfigError(format!("Invalid signing key: {}", e)))
    }

    /// Build a token granting access to `storage_key` until `expires_at`.
    pub fn sign(&self, storage_key: &str, expires_at: DateTime<Utc>) -> StorageResult<String> {
        let expiry_ts = expires_at.timestamp().max(0) as u64;
        let mut payload = Vec::with_capacity(EXPIRY_LEN + storage_key.len());
        payload.extend_from_slice(&expiry_ts.to_be_bytes());
        payload.extend_from_slice(storage_key.as_bytes());

        let mut mac = self.mac()?;
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();

        payload.extend_from_slice(&tag);
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload))
    }

    /// Verify a token and return the storage key it grants access to.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> StorageResult<String> {
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| StorageError::InvalidSignature)?;
        if decoded.len() <= EXPIRY_LEN + MAC_LEN {
            return Err(StorageError::InvalidSignature);
        }

        let (payload, tag) = decoded.split_at(decoded.len() - MAC_LEN);
        let mut mac = self.mac()?;
        mac.update(payload);
        mac.verify_slice(tag)
            .map_err(|_| StorageError::InvalidSignature)?;

        let (expiry, key) = payload.split_at(EXPIRY_LEN);
        let mut expiry_bytes = [0u8; EXPIRY_LEN];
        expiry_bytes.copy_from_slice(expiry);
        let expiry_ts = u64::from_be_bytes(expiry_bytes);
        if (now.timestamp().max(0) as u64) > expiry_ts {
            return Err(StorageError::InvalidSignature);
        }

        String::from_utf8(key.to_vec()).map_err(|_| StorageError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const KEY: &str = "orgs/0b7c/meetings/1f2e/abc-agenda.pdf";

    #[test]
    fn test_sign_and_verify() {
        let signer = UrlSigner::new(b"signing-secret".to_vec());
        let now = Utc::now();
        let token = signer.sign(KEY, now + Duration::minutes(15)).unwrap();
        assert_eq!(signer.verify(&token, now).unwrap(), KEY);
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = UrlSigner::new(b"signing-secret".to_vec());
        let now = Utc::now();
        let token = signer.sign(KEY, now - Duration::seconds(1)).unwrap();
        assert!(matches!(
            signer.verify(&token, now),
            Err(StorageError::InvalidSignature)
        ));
    }

    #[test]
    fn test_other_secret_rejected() {
        let now = Utc::now();
        let token = UrlSigner::new(b"one".to_vec())
            .sign(KEY, now + Duration::minutes(5))
            .unwrap();
        assert!(UrlSigner::new(b"two".to_vec()).verify(&token, now).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let signer = UrlSigner::new(b"signing-secret".to_vec());
        assert!(signer.verify("not-a-token", Utc::now()).is_err());
        assert!(signer.verify("", Utc::now()).is_err());
    }
}
