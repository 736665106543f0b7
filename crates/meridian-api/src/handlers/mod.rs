pub mod activity;
pub mod archive;
pub mod clients;
pub mod files;
pub mod health;
pub mod history;
pub mod integrations;
pub mod meetings;
pub mod payments;
pub mod session;
pub mod uploads;
pub mod users;
