//! Data models for the application
//!
//! Each sub-module holds one collection's records and request DTOs.

mod activity;
mod client;
mod history;
mod meeting;
mod oauth;
mod organization;
mod payment;
mod user;

pub use activity::*;
pub use client::*;
pub use history::*;
pub use meeting::*;
pub use oauth::*;
pub use organization::*;
pub use payment::*;
pub use user::*;
