//! Meridian Infrastructure Library
//!
//! Shared plumbing for the Meridian binaries: HTTP middleware, tracing
//! initialisation, shutdown signalling and the JSON error body.

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;
pub mod shutdown;

#[cfg(feature = "middleware")]
pub use middleware::{
    request_id_middleware, security_headers_middleware, RequestId, SecurityHeaders,
};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, LogFormat};

pub use error::ErrorResponse;
pub use shutdown::{shutdown_signal, ShutdownListener};
