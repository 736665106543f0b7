use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Audited action (matches database enum `activity_action`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "activity_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Archive,
}

impl Display for ActivityAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ActivityAction::Create => write!(f, "create"),
            ActivityAction::Update => write!(f, "update"),
            ActivityAction::Delete => write!(f, "delete"),
            ActivityAction::Archive => write!(f, "archive"),
        }
    }
}

/// Append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub org_id: Uuid,
    /// Absent for entries written by scheduled jobs
    pub actor_id: Option<Uuid>,
    pub actor_name: String,
    pub action: ActivityAction,
    pub collection: String,
    pub record_id: Uuid,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Entry to append; ids and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivityEntry {
    pub org_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_name: String,
    pub action: ActivityAction,
    pub collection: String,
    pub record_id: Uuid,
    pub payload: serde_json::Value,
}
