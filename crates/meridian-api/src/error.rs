//! Rendering of failures as HTTP responses.
//!
//! Handlers return `Result<_, HttpAppError>`; anything that converts into
//! `AppError` converts into `HttpAppError` with `?`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use meridian_core::{AppError, ErrorMetadata, LogLevel};
use meridian_storage::StorageError;
use serde::de::DeserializeOwned;

pub use meridian_infra::ErrorResponse;

#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(err.into())
    }
}

fn rejected_body(rejection: &JsonRejection) -> AppError {
    let text = rejection.body_text();
    if text.contains("expected a formatted UUID") {
        AppError::InvalidInput("ids in the request body must be UUID strings".to_string())
    } else {
        AppError::InvalidInput(format!("unreadable request body: {}", text))
    }
}

fn rejected_query(rejection: &QueryRejection) -> AppError {
    AppError::InvalidInput(format!("unreadable query string: {}", rejection.body_text()))
}

/// JSON body extractor that answers with ErrorResponse (400) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(|r| HttpAppError(rejected_body(&r)))?;
        Ok(ValidatedJson(inner))
    }
}

/// Query string extractor with the same error shape as [`ValidatedJson`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(inner) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|r| HttpAppError(rejected_query(&r)))?;
        Ok(ValidatedQuery(inner))
    }
}

fn log_error(error: &AppError) {
    let kind = error.error_type();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, kind, "Request failed"),
        LogLevel::Warn => tracing::warn!(error = %error, kind, "Request refused"),
        LogLevel::Error => tracing::error!(error = %error, kind, "Request errored"),
    }
}

/// Error details are withheld when `ENVIRONMENT` (or `APP_ENV`) says production.
fn details_allowed() -> bool {
    let env = std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_default()
        .to_ascii_lowercase();
    !matches!(env.as_str(), "production" | "prod")
}

pub fn error_body(error: &AppError) -> ErrorResponse {
    let mut body = ErrorResponse::new(error.client_message(), error.error_code());
    body.recoverable = error.is_recoverable();
    body.suggested_action = error.suggested_action().map(str::to_string);

    if !error.is_sensitive() && details_allowed() {
        body.error_type = Some(error.error_type().to_string());
        body.details = Some(error.detailed_message());
    }
    body
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        log_error(&self.0);
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(error_body(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_error_metadata() {
        let cases = [
            (AppError::NotFound("meeting".into()), StatusCode::NOT_FOUND),
            (AppError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (AppError::Unauthorized("expired".into()), StatusCode::UNAUTHORIZED),
            (AppError::Conflict("in use".into()), StatusCode::CONFLICT),
            (AppError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(HttpAppError(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_sensitive_errors_hide_details() {
        let body = error_body(&AppError::Internal("connection string leaked".into()));
        assert!(body.details.is_none());
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(body.recoverable);
    }

    #[test]
    fn test_caller_errors_show_details() {
        let body = error_body(&AppError::InvalidInput("month must be 1-12".into()));
        assert_eq!(body.error, "month must be 1-12");
        assert_eq!(body.code, "INVALID_INPUT");
        assert!(!body.recoverable);
    }

    #[test]
    fn test_invalid_signature_maps_to_unauthorized() {
        let err = HttpAppError::from(StorageError::InvalidSignature);
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
