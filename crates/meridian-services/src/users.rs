use std::sync::Arc;

use chrono::{DateTime, Utc};
use meridian_core::constants::collections;
use meridian_core::models::{ActivityAction, CreateUserRequest, User};
use meridian_core::{ActorContext, AppError, Operation, Resource, Role, SessionClaims};
use meridian_db::UserStore;
use uuid::Uuid;
use validator::Validate;

use crate::audit::AuditTrail;
use crate::permit;

/// User administration and session resolution
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    audit: AuditTrail,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, audit: AuditTrail) -> Self {
        Self { users, audit }
    }

    /// Turn verified session claims into an actor.
    ///
    /// The stored user is authoritative: a deactivated account is refused and
    /// the role comes from the database, not from the token.
    pub async fn resolve_actor(
        &self,
        claims: &SessionClaims,
        now: DateTime<Utc>,
    ) -> Result<ActorContext, AppError> {
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| AppError::Unauthorized("Invalid session expiry".to_string()))?;
        if now >= expires_at {
            return Err(AppError::Unauthorized("Session expired".to_string()));
        }

        let user = self
            .users
            .get(claims.org_id, claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;
        if !user.is_active {
            return Err(AppError::Unauthorized("Account is deactivated".to_string()));
        }

        if user.role != claims.role {
            tracing::debug!(
                user_id = %user.id,
                token_role = %claims.role,
                stored_role = %user.role,
                "Session role is stale, using stored role"
            );
        }

        Ok(ActorContext {
            user_id: user.id,
            org_id: user.org_id,
            role: user.role,
            display_name: user.display_name,
            expires_at,
        })
    }

    pub async fn list_users(&self, actor: &ActorContext) -> Result<Vec<User>, AppError> {
        permit(actor, Resource::User, Operation::Read)?;
        self.users.list(actor.org_id).await
    }

    #[tracing::instrument(skip(self, actor, request), fields(org_id = %actor.org_id))]
    pub async fn create_user(
        &self,
        actor: &ActorContext,
        mut request: CreateUserRequest,
    ) -> Result<User, AppError> {
        permit(actor, Resource::User, Operation::Create)?;
        request.email = request.email.trim().to_lowercase();
        request.display_name = request.display_name.trim().to_string();
        request.validate()?;

        let user = self.users.insert(actor.org_id, &request).await?;

        self.audit
            .record(
                actor,
                ActivityAction::Create,
                collections::USERS,
                user.id,
                serde_json::json!({ "email": user.email, "role": user.role }),
            )
            .await;

        Ok(user)
    }

    pub async fn set_role(
        &self,
        actor: &ActorContext,
        id: Uuid,
        role: Role,
    ) -> Result<User, AppError> {
        permit(actor, Resource::User, Operation::Update)?;
        if id == actor.user_id && role != Role::Manager {
            return Err(AppError::Forbidden(
                "Managers cannot demote themselves".to_string(),
            ));
        }

        let user = self
            .users
            .set_role(actor.org_id, id, role)
            .await?
            .ok_or_else(|| not_found(id))?;

        self.audit
            .record(
                actor,
                ActivityAction::Update,
                collections::USERS,
                id,
                serde_json::json!({ "role": role }),
            )
            .await;

        Ok(user)
    }

    pub async fn deactivate(&self, actor: &ActorContext, id: Uuid) -> Result<User, AppError> {
        permit(actor, Resource::User, Operation::Update)?;
        if id == actor.user_id {
            return Err(AppError::Forbidden(
                "Managers cannot deactivate themselves".to_string(),
            ));
        }

        let user = self
            .users
            .set_active(actor.org_id, id, false)
            .await?
            .ok_or_else(|| not_found(id))?;

        self.audit
            .record(
                actor,
                ActivityAction::Update,
                collections::USERS,
                id,
                serde_json::json!({ "is_active": false }),
            )
            .await;

        Ok(user)
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{actor, TestServices};
    use chrono::Duration;

    fn claims_for(user: &User, role: Role, exp: DateTime<Utc>) -> SessionClaims {
        SessionClaims {
            sub: user.id,
            org_id: user.org_id,
            role,
            exp: exp.timestamp(),
            iat: (exp - Duration::hours(1)).timestamp(),
        }
    }

    #[tokio::test]
    async fn test_resolve_actor_uses_stored_role() {
        let t = TestServices::new();
        let user = t.store.seed_user(t.org_id(), "Asha", Role::AssociateViewer);
        let now = Utc::now();

        let resolved = t
            .users
            .resolve_actor(&claims_for(&user, Role::Manager, now + Duration::hours(1)), now)
            .await
            .unwrap();
        assert_eq!(resolved.role, Role::AssociateViewer);
        assert_eq!(resolved.display_name, "Asha");
    }

    #[tokio::test]
    async fn test_resolve_actor_rejects_expired_and_inactive() {
        let t = TestServices::new();
        let manager_user = t.store.seed_user(t.org_id(), "Maya", Role::Manager);
        let user = t.store.seed_user(t.org_id(), "Asha", Role::AssociateEditor);
        let now = Utc::now();

        let expired = claims_for(&user, user.role, now - Duration::seconds(1));
        assert!(matches!(
            t.users.resolve_actor(&expired, now).await,
            Err(AppError::Unauthorized(_))
        ));

        let manager = t
            .users
            .resolve_actor(&claims_for(&manager_user, Role::Manager, now + Duration::hours(1)), now)
            .await
            .unwrap();
        t.users.deactivate(&manager, user.id).await.unwrap();

        let live = claims_for(&user, user.role, now + Duration::hours(1));
        assert!(matches!(
            t.users.resolve_actor(&live, now).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_managers_cannot_lock_themselves_out() {
        let t = TestServices::new();
        let manager = actor(Role::Manager, t.org_id());

        assert!(matches!(
            t.users.set_role(&manager, manager.user_id, Role::AssociateEditor).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            t.users.deactivate(&manager, manager.user_id).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_user_administration_is_manager_only() {
        let t = TestServices::new();
        let editor = actor(Role::AssociateEditor, t.org_id());
        let manager = actor(Role::Manager, t.org_id());
        let request = CreateUserRequest {
            email: " New.Person@Example.TEST ".to_string(),
            display_name: "New Person".to_string(),
            role: Role::AssociateViewer,
        };

        assert!(matches!(
            t.users.create_user(&editor, request.clone()).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            t.users.list_users(&editor).await,
            Err(AppError::Forbidden(_))
        ));

        let user = t.users.create_user(&manager, request.clone()).await.unwrap();
        assert_eq!(user.email, "new.person@example.test");
        assert!(matches!(
            t.users.create_user(&manager, request).await,
            Err(AppError::Conflict(_))
        ));

        let promoted = t
            .users
            .set_role(&manager, user.id, Role::AssociateEditor)
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::AssociateEditor);
    }
}
