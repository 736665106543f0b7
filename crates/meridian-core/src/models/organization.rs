use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Organisation (tenant)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// IANA timezone name used to interpret meeting wall-clock times
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Parsed timezone, or `fallback` when the stored name is not a known zone.
    pub fn tz_or(&self, fallback: Tz) -> Tz {
        parse_timezone(&self.timezone).unwrap_or(fallback)
    }
}

pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}
