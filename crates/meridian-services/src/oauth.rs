//! OAuth tokens for third-party integrations, encrypted at rest.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use meridian_core::models::DecryptedOAuthToken;
use meridian_core::{ActorContext, AppError, EncryptionService, Operation, Resource};
use meridian_db::OAuthTokenStore;

use crate::permit;

#[derive(Clone)]
pub struct OAuthTokenService {
    tokens: Arc<dyn OAuthTokenStore>,
    encryption: Arc<EncryptionService>,
}

impl OAuthTokenService {
    pub fn new(tokens: Arc<dyn OAuthTokenStore>, encryption: Arc<EncryptionService>) -> Self {
        Self { tokens, encryption }
    }

    /// Store or replace the actor's own token pair for `provider`.
    #[tracing::instrument(skip(self, actor, access_token, refresh_token), fields(org_id = %actor.org_id, user_id = %actor.user_id))]
    pub async fn store(
        &self,
        actor: &ActorContext,
        provider: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        permit(actor, Resource::OAuthToken, Operation::Update)?;
        let provider = normalize_provider(actor, provider)?;
        if access_token.is_empty() {
            return Err(AppError::InvalidInput("access_token is required".to_string()));
        }

        let access_encrypted = self.encryption.encrypt(access_token)?;
        let refresh_encrypted = self.encryption.encrypt_optional(refresh_token)?;

        self.tokens
            .upsert(
                actor.org_id,
                actor.user_id,
                &provider,
                &access_encrypted,
                refresh_encrypted.as_deref(),
                expires_at,
            )
            .await?;

        tracing::info!(provider = %provider, "OAuth token stored");
        Ok(())
    }

    /// The actor's own token for `provider`, decrypted.
    pub async fn load(
        &self,
        actor: &ActorContext,
        provider: &str,
    ) -> Result<Option<DecryptedOAuthToken>, AppError> {
        permit(actor, Resource::OAuthToken, Operation::Read)?;
        let provider = normalize_provider(actor, provider)?;

        let Some(row) = self.tokens.get(actor.org_id, actor.user_id, &provider).await? else {
            return Ok(None);
        };

        Ok(Some(DecryptedOAuthToken {
            access_token: self.encryption.decrypt(&row.access_token_encrypted)?,
            refresh_token: self
                .encryption
                .decrypt_optional(row.refresh_token_encrypted.as_deref())?,
            provider: row.provider,
            expires_at: row.expires_at,
        }))
    }
}

fn normalize_provider(actor: &ActorContext, provider: &str) -> Result<String, AppError> {
    if actor.is_system() {
        return Err(AppError::Forbidden(
            "The system actor has no OAuth tokens".to_string(),
        ));
    }
    let provider = provider.trim().to_lowercase();
    if provider.is_empty() {
        return Err(AppError::InvalidInput("provider is required".to_string()));
    }
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{actor, TestServices};
    use meridian_core::Role;

    #[tokio::test]
    async fn test_tokens_are_encrypted_at_rest() {
        let t = TestServices::new();
        let viewer = actor(Role::AssociateViewer, t.org_id());

        t.oauth
            .store(&viewer, "Google", "ya29.access", Some("1//refresh"), None)
            .await
            .unwrap();

        let rows = t.store.oauth_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].provider, "google");
        assert_ne!(rows[0].access_token_encrypted, "ya29.access");
        assert!(!rows[0].access_token_encrypted.contains("ya29"));

        let loaded = t.oauth.load(&viewer, "google").await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "ya29.access");
        assert_eq!(loaded.refresh_token.as_deref(), Some("1//refresh"));
    }

    #[tokio::test]
    async fn test_tokens_are_private_to_their_owner() {
        let t = TestServices::new();
        let owner = actor(Role::Manager, t.org_id());
        let colleague = actor(Role::Manager, t.org_id());

        t.oauth
            .store(&owner, "google", "secret", None, None)
            .await
            .unwrap();

        assert!(t.oauth.load(&colleague, "google").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_replaces_existing_pair() {
        let t = TestServices::new();
        let owner = actor(Role::AssociateEditor, t.org_id());

        t.oauth.store(&owner, "google", "first", Some("r1"), None).await.unwrap();
        t.oauth.store(&owner, "google", "second", None, None).await.unwrap();

        assert_eq!(t.store.oauth_rows().len(), 1);
        let loaded = t.oauth.load(&owner, "google").await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "second");
        assert_eq!(loaded.refresh_token, None);
    }
}
