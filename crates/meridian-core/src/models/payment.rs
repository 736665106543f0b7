use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::AppError;

/// Recurrence cadence (matches database enum `payment_frequency`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_frequency", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    OneTime,
    Quarterly,
    HalfYearly,
    Annual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }
}

/// Status per stored due date. Dates with no entry read as unpaid.
pub type PaymentStatusMap = BTreeMap<NaiveDate, PaymentStatus>;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PaymentSchedule {
    pub id: Uuid,
    pub org_id: Uuid,
    pub client_id: Uuid,
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    /// One amount per due date, positionally
    #[schema(value_type = Option<Vec<f64>>)]
    pub amounts: Option<Vec<Decimal>>,
    pub due_dates: Vec<NaiveDate>,
    pub frequency: Frequency,
    #[schema(value_type = Object)]
    pub payment_status: Json<PaymentStatusMap>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentSchedule {
    pub fn status_of(&self, due_date: NaiveDate) -> PaymentStatus {
        self.payment_status
            .get(&due_date)
            .copied()
            .unwrap_or_default()
    }

    /// Amount owed for the `index`-th stored due date.
    pub fn amount_for(&self, index: usize) -> Option<Decimal> {
        self.amounts
            .as_ref()
            .and_then(|amounts| amounts.get(index).copied())
            .or(self.amount)
    }

    pub fn has_due_date(&self, due_date: NaiveDate) -> bool {
        self.due_dates.contains(&due_date)
    }
}

/// Request DTO for creating a payment schedule
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreatePaymentScheduleRequest {
    pub client_id: Uuid,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<f64>>)]
    pub amounts: Option<Vec<Decimal>>,
    #[validate(length(min = 1, message = "at least one due date is required"))]
    pub due_dates: Vec<NaiveDate>,
    pub frequency: Frequency,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl CreatePaymentScheduleRequest {
    /// Field validation plus the schedule invariants.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;

        let mut seen = HashSet::with_capacity(self.due_dates.len());
        if !self.due_dates.iter().all(|d| seen.insert(*d)) {
            return Err(AppError::InvalidInput(
                "due_dates must not contain duplicates".to_string(),
            ));
        }

        if self.amount.is_none() && self.amounts.is_none() {
            return Err(AppError::InvalidInput(
                "either amount or amounts is required".to_string(),
            ));
        }

        if let Some(amounts) = &self.amounts {
            if amounts.len() != self.due_dates.len() {
                return Err(AppError::InvalidInput(format!(
                    "amounts has {} entries but there are {} due dates",
                    amounts.len(),
                    self.due_dates.len()
                )));
            }
        }

        let negative = self
            .amount
            .iter()
            .chain(self.amounts.iter().flatten())
            .any(|a| a.is_sign_negative());
        if negative {
            return Err(AppError::InvalidInput(
                "amounts must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetPaymentStatusRequest {
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
}

/// One payment falling due inside a calendar month
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DueOccurrence {
    pub schedule_id: Uuid,
    pub client_id: Uuid,
    pub due_date: NaiveDate,
    /// The stored due date this occurrence was projected from
    pub source_due_date: NaiveDate,
    pub frequency: Frequency,
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    pub status: PaymentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn request() -> CreatePaymentScheduleRequest {
        CreatePaymentScheduleRequest {
            client_id: Uuid::new_v4(),
            amount: Some(Decimal::new(25000, 2)),
            amounts: None,
            due_dates: vec![d("2024-01-15")],
            frequency: Frequency::Quarterly,
            notes: None,
        }
    }

    #[test]
    fn test_valid_schedule() {
        assert!(request().check().is_ok());
    }

    #[test]
    fn test_requires_due_dates() {
        let mut r = request();
        r.due_dates.clear();
        assert!(r.check().is_err());
    }

    #[test]
    fn test_requires_some_amount() {
        let mut r = request();
        r.amount = None;
        assert!(r.check().is_err());
        r.amounts = Some(vec![Decimal::new(10, 0)]);
        assert!(r.check().is_ok());
    }

    #[test]
    fn test_amounts_must_match_due_dates() {
        let mut r = request();
        r.amounts = Some(vec![Decimal::new(10, 0), Decimal::new(20, 0)]);
        assert!(r.check().is_err());
    }

    #[test]
    fn test_duplicate_due_dates_rejected() {
        let mut r = request();
        r.due_dates = vec![d("2024-01-15"), d("2024-01-15")];
        assert!(r.check().is_err());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut r = request();
        r.amount = Some(Decimal::new(-1, 0));
        assert!(r.check().is_err());
    }

    #[test]
    fn test_frequency_wire_names() {
        assert_eq!(
            serde_json::to_string(&Frequency::HalfYearly).unwrap(),
            "\"half-yearly\""
        );
        let f: Frequency = serde_json::from_str("\"one-time\"").unwrap();
        assert_eq!(f, Frequency::OneTime);
    }

    #[test]
    fn test_status_map_keys_are_iso_dates() {
        let mut map = PaymentStatusMap::new();
        map.insert(d("2024-04-15"), PaymentStatus::Paid);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"2024-04-15":"paid"}"#);
    }
}
