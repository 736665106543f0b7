//! Meridian API Library
//!
//! HTTP handlers, session authentication and application setup.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;

pub use error::ErrorResponse;
pub use state::AppState;
