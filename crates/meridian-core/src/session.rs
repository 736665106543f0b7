//! Session claims and the authenticated actor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::SYSTEM_ACTOR_NAME;
use crate::policy::{is_allowed, Operation, Resource, Role};
use crate::AppError;

/// Claims carried by an HS256 session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid, // user_id
    pub org_id: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// The authenticated user performing an operation.
///
/// Every service method takes one of these. Role checks go through
/// [`ActorContext::authorize`], tenant scoping through `org_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub role: Role,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
}

impl ActorContext {
    /// Actor used by scheduled jobs. It can archive but holds no other rights
    /// beyond reading.
    pub fn system(org_id: Uuid) -> Self {
        Self {
            user_id: Uuid::nil(),
            org_id,
            role: Role::AssociateViewer,
            display_name: SYSTEM_ACTOR_NAME.to_string(),
            expires_at: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn is_system(&self) -> bool {
        self.user_id.is_nil()
    }

    /// `None` for the system actor.
    pub fn actor_id(&self) -> Option<Uuid> {
        (!self.is_system()).then_some(self.user_id)
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn ensure_active(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if now >= self.expires_at {
            return Err(AppError::Unauthorized("Session expired".to_string()));
        }
        Ok(())
    }

    pub fn authorize(&self, resource: Resource, operation: Operation) -> Result<(), AppError> {
        if is_allowed(self.role, resource, operation) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role '{}' cannot {} {}",
                self.role, operation, resource
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn actor(role: Role) -> ActorContext {
        ActorContext {
            user_id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            role,
            display_name: "Asha".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn test_session_expiry() {
        let a = actor(Role::Manager);
        assert!(a.ensure_active(Utc::now()).is_ok());
        let err = a
            .ensure_active(a.expires_at + Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(a.ensure_active(a.expires_at).is_err());
    }

    #[test]
    fn test_authorize_maps_denial_to_forbidden() {
        let viewer = actor(Role::AssociateViewer);
        assert!(viewer.authorize(Resource::Meeting, Operation::Read).is_ok());
        let err = viewer
            .authorize(Resource::Meeting, Operation::Create)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(err.to_string().contains("associate_viewer"));
    }

    #[test]
    fn test_system_actor() {
        let org = Uuid::new_v4();
        let system = ActorContext::system(org);
        assert!(system.is_system());
        assert_eq!(system.actor_id(), None);
        assert!(system.ensure_active(Utc::now()).is_ok());
        assert!(system.authorize(Resource::Meeting, Operation::Archive).is_ok());
        assert!(system.authorize(Resource::Meeting, Operation::Delete).is_err());
        assert!(actor(Role::Manager).actor_id().is_some());
    }

    #[test]
    fn test_claims_expiry() {
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            role: Role::Manager,
            exp: 1_700_000_000,
            iat: 1_699_990_000,
        };
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_700_000_000);
    }
}
