use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meridian_core::models::OAuthToken;
use meridian_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::store_traits::OAuthTokenStore;

const TOKEN_COLUMNS: &str = "id, org_id, user_id, provider, access_token_encrypted, \
     refresh_token_encrypted, expires_at, updated_at";

/// Repository for encrypted provider tokens
#[derive(Clone)]
pub struct OAuthTokenRepository {
    pool: PgPool,
}

impl OAuthTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OAuthTokenStore for OAuthTokenRepository {
    #[tracing::instrument(
        skip(self, access_token_encrypted, refresh_token_encrypted),
        fields(db.table = "oauth_tokens", db.operation = "upsert")
    )]
    async fn upsert(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        provider: &str,
        access_token_encrypted: &str,
        refresh_token_encrypted: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<OAuthToken, AppError> {
        let query = format!(
            r#"
            INSERT INTO oauth_tokens (org_id, user_id, provider, access_token_encrypted,
                                      refresh_token_encrypted, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, provider) DO UPDATE
            SET access_token_encrypted = EXCLUDED.access_token_encrypted,
                refresh_token_encrypted = EXCLUDED.refresh_token_encrypted,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            RETURNING {}
            "#,
            TOKEN_COLUMNS
        );
        let token = sqlx::query_as::<Postgres, OAuthToken>(&query)
            .bind(org_id)
            .bind(user_id)
            .bind(provider)
            .bind(access_token_encrypted)
            .bind(refresh_token_encrypted)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(token)
    }

    #[tracing::instrument(skip(self), fields(db.table = "oauth_tokens", db.operation = "select"))]
    async fn get(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<OAuthToken>, AppError> {
        let query = format!(
            "SELECT {} FROM oauth_tokens WHERE org_id = $1 AND user_id = $2 AND provider = $3",
            TOKEN_COLUMNS
        );
        let token = sqlx::query_as::<Postgres, OAuthToken>(&query)
            .bind(org_id)
            .bind(user_id)
            .bind(provider)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }
}
