//! Test helpers for Meridian services
//!
//! In-memory stores and storage so services (and the HTTP layer above them)
//! can be tested without Postgres or a filesystem.

mod fixtures;
mod mock_storage;
mod mock_store;

pub use fixtures::{actor, TestServices};
pub use mock_storage::MockStorage;
pub use mock_store::{Failures, MockStore};
