//! HS256 session token verification.
//!
//! Tokens are issued by the identity provider with the shared `JWT_SECRET`;
//! this service only verifies them.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use meridian_core::{AppError, SessionClaims};

#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Token has expired".to_string())
                }
                ErrorKind::InvalidAlgorithm => {
                    AppError::Unauthorized("Unsupported token algorithm".to_string())
                }
                _ => AppError::Unauthorized("Invalid session token".to_string()),
            }
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use meridian_core::Role;
    use uuid::Uuid;

    const SECRET: &str = "a-secret-that-is-at-least-32-characters";

    fn token(secret: &str, exp_offset: Duration) -> String {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            role: Role::AssociateEditor,
            exp: (now + exp_offset).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let claims = JwtVerifier::new(SECRET)
            .verify(&token(SECRET, Duration::hours(1)))
            .unwrap();
        assert_eq!(claims.role, Role::AssociateEditor);
    }

    #[test]
    fn test_expired_token_rejected() {
        let err = JwtVerifier::new(SECRET)
            .verify(&token(SECRET, Duration::minutes(-5)))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg.contains("expired")));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = "another-secret-that-is-32-characters-long";
        let err = JwtVerifier::new(SECRET)
            .verify(&token(other, Duration::hours(1)))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(JwtVerifier::new(SECRET).verify("not-a-jwt").is_err());
    }
}
