//! Error types module
//!
//! All fallible operations in the library crates return `AppError`. Each variant
//! describes itself through `ErrorMetadata` so the HTTP layer can render it
//! without knowing where it came from.

use std::io;

use sqlx::Error as SqlxError;

/// Severity an error is logged at when it reaches the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes: bad input, unknown ids, expired sessions
    Debug,
    /// Policy denials worth noticing
    Warn,
    /// Infrastructure failures
    Error,
}

/// How an error presents itself to API clients and to the log.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable machine-readable code, e.g. `NOT_FOUND`
    fn error_code(&self) -> &'static str;

    /// Whether the same request may succeed if retried
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show to the caller
    fn client_message(&self) -> String;

    /// Sensitive errors never expose their details or source chain
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Bad request: {0}")]
    InvalidInput(String),

    #[error("No such record: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{message}")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        AppError::InternalWithSource {
            message,
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("I/O failure: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("malformed JSON: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Presentation of one variant.
struct Presentation {
    status: u16,
    code: &'static str,
    retry: bool,
    hint: Option<&'static str>,
    sensitive: bool,
    level: LogLevel,
}

const fn caller_error(status: u16, code: &'static str, hint: &'static str) -> Presentation {
    Presentation {
        status,
        code,
        retry: false,
        hint: Some(hint),
        sensitive: false,
        level: LogLevel::Debug,
    }
}

const fn server_error(code: &'static str) -> Presentation {
    Presentation {
        status: 500,
        code,
        retry: true,
        hint: Some("Retry after a short delay"),
        sensitive: true,
        level: LogLevel::Error,
    }
}

impl AppError {
    fn presentation(&self) -> Presentation {
        match self {
            AppError::Database(_) => server_error("DATABASE_ERROR"),
            AppError::Storage(_) => server_error("STORAGE_ERROR"),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                server_error("INTERNAL_ERROR")
            }
            AppError::InvalidInput(_) => {
                caller_error(400, "INVALID_INPUT", "Correct the highlighted fields and resend")
            }
            AppError::NotFound(_) => caller_error(
                404,
                "NOT_FOUND",
                "The record may have been archived or deleted; refresh and retry",
            ),
            AppError::Conflict(_) => caller_error(
                409,
                "CONFLICT",
                "Remove the meetings or payments that reference this record first",
            ),
            AppError::PayloadTooLarge(_) => {
                caller_error(413, "PAYLOAD_TOO_LARGE", "Upload a smaller file")
            }
            AppError::Unauthorized(_) => caller_error(401, "UNAUTHORIZED", "Sign in again"),
            AppError::Forbidden(_) => Presentation {
                level: LogLevel::Warn,
                ..caller_error(403, "FORBIDDEN", "Ask a manager to perform this action")
            },
        }
    }

    /// True when the error is a unique-constraint violation reported by Postgres.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(SqlxError::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }

    /// Variant name, shown alongside details outside production.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// The error followed by up to five causes, one per line.
    pub fn detailed_message(&self) -> String {
        const MAX_CAUSES: usize = 5;

        let causes: Vec<String> =
            std::iter::successors(std::error::Error::source(self), |e| e.source())
                .map(|e| e.to_string())
                .collect();

        let mut details = self.to_string();
        for cause in causes.iter().take(MAX_CAUSES) {
            details.push_str("\n  caused by: ");
            details.push_str(cause);
        }
        if causes.len() > MAX_CAUSES {
            details.push_str("\n  ...");
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.presentation().status
    }

    fn error_code(&self) -> &'static str {
        self.presentation().code
    }

    fn is_recoverable(&self) -> bool {
        self.presentation().retry
    }

    fn suggested_action(&self) -> Option<&'static str> {
        self.presentation().hint
    }

    fn is_sensitive(&self) -> bool {
        self.presentation().sensitive
    }

    fn log_level(&self) -> LogLevel {
        self.presentation().level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "The database is unavailable".to_string(),
            AppError::Storage(_) => "File storage is unavailable".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Something went wrong on our side".to_string()
            }
            AppError::InvalidInput(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_errors_are_hidden_and_retryable() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "The database is unavailable");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_policy_denial_shows_its_reason() {
        let err = AppError::Forbidden("Only managers can delete meetings".to_string());
        assert_eq!(err.http_status_code(), 403);
        assert_eq!(err.error_code(), "FORBIDDEN");
        assert!(!err.is_recoverable());
        assert!(!err.is_sensitive());
        assert_eq!(err.client_message(), "Only managers can delete meetings");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_caller_errors_log_at_debug() {
        for err in [
            AppError::NotFound("meeting".into()),
            AppError::InvalidInput("month".into()),
            AppError::Unauthorized("expired".into()),
        ] {
            assert_eq!(err.log_level(), LogLevel::Debug);
            assert!(err.http_status_code() < 500);
        }
    }

    #[test]
    fn test_unique_violation_detection() {
        assert!(!AppError::from(sqlx::Error::PoolClosed).is_unique_violation());
        assert!(!AppError::Conflict("x".into()).is_unique_violation());
    }

    #[test]
    fn test_detailed_message_walks_the_source_chain() {
        let io = io::Error::new(io::ErrorKind::NotFound, "no such blob");
        let err = AppError::from(anyhow::Error::new(io).context("reading attachment"));
        let details = err.detailed_message();
        assert!(details.starts_with("reading attachment"));
        assert!(details.contains("caused by: no such blob"));
    }
}
