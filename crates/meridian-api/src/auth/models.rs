use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use meridian_core::{ActorContext, AppError};

use crate::error::HttpAppError;

/// The signed-in user, placed in request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct Actor(pub ActorContext);

impl Deref for Actor {
    type Target = ActorContext;

    fn deref(&self) -> &ActorContext {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActorContext>()
            .cloned()
            .map(Actor)
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized(
                    "Missing session context".to_string(),
                ))
            })
    }
}
