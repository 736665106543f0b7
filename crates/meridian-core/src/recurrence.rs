//! Payment recurrence projector
//!
//! Projects the stored due dates of a [`PaymentSchedule`] into a single
//! calendar month. Month arithmetic preserves the day-of-month and normalises
//! overflow forward into the following month (31 Jan + 3 months is 1 May, and
//! later steps continue from 1 May).

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::constants::RECURRENCE_HORIZON_YEARS;
use crate::models::{Frequency, PaymentSchedule};
use crate::AppError;

/// A calendar month used as a projection window. `month` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
}

impl MonthWindow {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        if !(1..=12).contains(&month) {
            return Err(AppError::InvalidInput(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(AppError::InvalidInput(format!(
                "year {} is outside the supported calendar range",
                year
            )));
        }
        Ok(Self { year, month })
    }

    /// Build a window from a zero-based month (0 = January).
    pub fn from_zero_based(month0: u32, year: i32) -> Result<Self, AppError> {
        if month0 > 11 {
            return Err(AppError::InvalidInput(format!(
                "zero-based month must be between 0 and 11, got {}",
                month0
            )));
        }
        Self::new(year, month0 + 1)
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// True when `date` falls in a later month than this window.
    fn is_before(&self, date: NaiveDate) -> bool {
        (date.year(), date.month()) > (self.year, self.month)
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        let first = self.first_day()?;
        add_months(first, 1).and_then(|d| d.pred_opt())
    }
}

/// Lazy iterator over the dates a schedule falls due within one window.
///
/// Each stored due date contributes at most one projected date. The iterator is
/// finite and `Clone`, so a caller can restart it without re-borrowing.
#[derive(Debug, Clone)]
pub struct ProjectedDueDates<'a> {
    due_dates: std::slice::Iter<'a, NaiveDate>,
    frequency: Frequency,
    window: MonthWindow,
}

impl Iterator for ProjectedDueDates<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        for due in self.due_dates.by_ref() {
            if let Some(date) = project_one(*due, self.frequency, self.window) {
                return Some(date);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.due_dates.len()))
    }
}

/// Project every stored due date of `schedule` into `window`.
pub fn project_due_dates(schedule: &PaymentSchedule, window: MonthWindow) -> ProjectedDueDates<'_> {
    project_dates(&schedule.due_dates, schedule.frequency, window)
}

pub fn project_dates(
    due_dates: &[NaiveDate],
    frequency: Frequency,
    window: MonthWindow,
) -> ProjectedDueDates<'_> {
    ProjectedDueDates {
        due_dates: due_dates.iter(),
        frequency,
        window,
    }
}

/// Project a single stored due date into `window`.
pub fn project_one(due: NaiveDate, frequency: Frequency, window: MonthWindow) -> Option<NaiveDate> {
    match frequency {
        Frequency::OneTime => window.contains(due).then_some(due),
        Frequency::Annual => {
            if due.month() != window.month || window.year < due.year() {
                return None;
            }
            normalized_date(window.year, window.month, due.day())
        }
        Frequency::Quarterly => step_into_window(due, 3, window),
        Frequency::HalfYearly => step_into_window(due, 6, window),
    }
}

fn step_into_window(start: NaiveDate, step_months: u32, window: MonthWindow) -> Option<NaiveDate> {
    // A window no calendar date can fall in has nothing to yield.
    window.first_day()?;
    let horizon = window.year.saturating_add(RECURRENCE_HORIZON_YEARS);
    let mut current = start;
    loop {
        if window.contains(current) {
            return Some(current);
        }
        // Steps only move forward, so once past the window nothing later can land in it.
        if window.is_before(current) || current.year() > horizon {
            return None;
        }
        current = add_months(current, step_months)?;
    }
}

/// Add `months` to `date`, keeping the day-of-month and rolling any overflow
/// into the following month.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let zero_based = date.month0() as i64 + months as i64;
    let year = date.year() as i64 + zero_based.div_euclid(12);
    let month = zero_based.rem_euclid(12) as u32 + 1;
    normalized_date(i32::try_from(year).ok()?, month, date.day())
}

/// Build `year-month-day`, rolling a day past the end of the month forward.
fn normalized_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    first.checked_add_signed(Duration::days(day as i64 - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn w(year: i32, month: u32) -> MonthWindow {
        MonthWindow::new(year, month).unwrap()
    }

    fn schedule(frequency: Frequency, due_dates: &[&str]) -> PaymentSchedule {
        let now = chrono::Utc::now();
        PaymentSchedule {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            amount: Some(Decimal::new(100, 0)),
            amounts: None,
            due_dates: due_dates.iter().map(|s| d(s)).collect(),
            frequency,
            payment_status: sqlx::types::Json(BTreeMap::new()),
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn project(s: &PaymentSchedule, window: MonthWindow) -> Vec<NaiveDate> {
        project_due_dates(s, window).collect()
    }

    #[test]
    fn test_quarterly_scenario() {
        let s = schedule(Frequency::Quarterly, &["2024-01-15"]);
        assert_eq!(project(&s, w(2024, 4)), vec![d("2024-04-15")]);
        assert_eq!(project(&s, w(2024, 2)), Vec::<NaiveDate>::new());
        assert_eq!(project(&s, w(2024, 1)), vec![d("2024-01-15")]);
        assert_eq!(project(&s, w(2026, 10)), vec![d("2026-10-15")]);
    }

    #[test]
    fn test_quarterly_never_before_first_due_date() {
        let s = schedule(Frequency::Quarterly, &["2024-01-15"]);
        assert!(project(&s, w(2023, 10)).is_empty());
    }

    #[test]
    fn test_one_time_only_in_exact_month() {
        let s = schedule(Frequency::OneTime, &["2024-03-10"]);
        assert_eq!(project(&s, w(2024, 3)), vec![d("2024-03-10")]);
        assert!(project(&s, w(2025, 3)).is_empty());
        assert!(project(&s, w(2024, 4)).is_empty());
    }

    #[test]
    fn test_annual_same_month_later_years() {
        let s = schedule(Frequency::Annual, &["2022-07-04"]);
        assert_eq!(project(&s, w(2022, 7)), vec![d("2022-07-04")]);
        assert_eq!(project(&s, w(2030, 7)), vec![d("2030-07-04")]);
        assert!(project(&s, w(2021, 7)).is_empty());
        assert!(project(&s, w(2030, 8)).is_empty());
    }

    #[test]
    fn test_annual_leap_day_rolls_forward() {
        let s = schedule(Frequency::Annual, &["2024-02-29"]);
        assert_eq!(project(&s, w(2025, 2)), vec![d("2025-03-01")]);
        assert_eq!(project(&s, w(2028, 2)), vec![d("2028-02-29")]);
    }

    #[test]
    fn test_half_yearly_cadence() {
        let s = schedule(Frequency::HalfYearly, &["2024-03-20"]);
        assert_eq!(project(&s, w(2024, 9)), vec![d("2024-09-20")]);
        assert_eq!(project(&s, w(2025, 3)), vec![d("2025-03-20")]);
        assert!(project(&s, w(2024, 6)).is_empty());
    }

    #[test]
    fn test_month_end_overflow_is_cumulative() {
        let s = schedule(Frequency::Quarterly, &["2023-01-31"]);
        assert_eq!(project(&s, w(2023, 5)), vec![d("2023-05-01")]);
        assert!(project(&s, w(2023, 4)).is_empty());
        // continues from 1 May, not from the 31st
        assert_eq!(project(&s, w(2023, 8)), vec![d("2023-08-01")]);
    }

    #[test]
    fn test_horizon_cutoff() {
        let s = schedule(Frequency::Quarterly, &["2024-01-15"]);
        // Far future windows still project when aligned.
        assert_eq!(project(&s, w(2050, 1)), vec![d("2050-01-15")]);
        // Misaligned windows terminate with nothing.
        assert!(project(&s, w(2050, 2)).is_empty());
    }

    #[test]
    fn test_multiple_due_dates_are_independent() {
        let s = schedule(Frequency::Quarterly, &["2024-01-05", "2024-04-25", "2024-02-01"]);
        assert_eq!(
            project(&s, w(2024, 7)),
            vec![d("2024-07-05"), d("2024-07-25")]
        );
    }

    #[test]
    fn test_iterator_is_restartable() {
        let s = schedule(Frequency::Annual, &["2020-05-01", "2021-05-09"]);
        let iter = project_due_dates(&s, w(2024, 5));
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    fn sweep(s: &PaymentSchedule, year: i32) -> Vec<NaiveDate> {
        (1..=12).flat_map(|month| project(s, w(year, month))).collect()
    }

    #[test]
    fn test_one_time_hits_a_single_month() {
        let s = schedule(Frequency::OneTime, &["2024-03-10"]);
        for month in 1..=12 {
            let hits = project(&s, w(2024, month));
            if month == 3 {
                assert_eq!(hits, vec![d("2024-03-10")]);
            } else {
                assert!(hits.is_empty(), "month {}", month);
            }
        }
        assert!(sweep(&s, 2023).is_empty());
        assert!(sweep(&s, 2025).is_empty());
    }

    #[test]
    fn test_annual_is_empty_outside_its_month() {
        let s = schedule(Frequency::Annual, &["2022-07-04"]);
        for year in 2022..=2027 {
            assert_eq!(sweep(&s, year), vec![NaiveDate::from_ymd_opt(year, 7, 4).unwrap()]);
        }
        assert!(sweep(&s, 2021).is_empty());
    }

    #[test]
    fn test_quarterly_year_has_four_distinct_hits() {
        // Starts on a month end; every step of the first year keeps the 29th.
        let s = schedule(Frequency::Quarterly, &["2024-02-29"]);
        let hits = sweep(&s, 2024);
        assert_eq!(
            hits,
            vec![d("2024-02-29"), d("2024-05-29"), d("2024-08-29"), d("2024-11-29")]
        );
        assert!(hits.iter().all(|h| h.month() % 3 == 2));

        for year in 2025..=2030 {
            let hits = sweep(&s, year);
            assert_eq!(hits.len(), 4, "year {}", year);
            let mut months: Vec<u32> = hits.iter().map(|h| h.month()).collect();
            months.dedup();
            assert_eq!(months.len(), 4, "year {}", year);
            let residue = months[0] % 3;
            assert!(months.iter().all(|m| m % 3 == residue), "year {}", year);
        }
        // 29 Feb 2025 rolls to 1 Mar and later steps keep the 1st.
        assert_eq!(sweep(&s, 2025)[0], d("2025-03-01"));
    }

    #[test]
    fn test_half_yearly_year_has_two_hits() {
        let s = schedule(Frequency::HalfYearly, &["2023-08-31"]);
        assert_eq!(sweep(&s, 2023), vec![d("2023-08-31")]);
        // 31 Aug + 6 months overflows February into early March.
        assert_eq!(sweep(&s, 2024), vec![d("2024-03-02"), d("2024-09-02")]);
        for year in 2025..=2030 {
            let months: Vec<u32> = sweep(&s, year).iter().map(|h| h.month()).collect();
            assert_eq!(months, vec![3, 9], "year {}", year);
        }
    }

    #[test]
    fn test_extreme_years_terminate_without_panicking() {
        let far = MonthWindow { year: i32::MAX, month: 2 };
        for frequency in [
            Frequency::OneTime,
            Frequency::Annual,
            Frequency::Quarterly,
            Frequency::HalfYearly,
        ] {
            assert_eq!(project_one(d("2024-01-15"), frequency, far), None);
            assert_eq!(
                project_one(d("2024-01-15"), frequency, MonthWindow { year: i32::MIN, month: 2 }),
                None
            );
        }
        assert!(MonthWindow::new(i32::MAX, 2).is_err());
        assert!(MonthWindow::new(-300_000, 2).is_err());
        assert!(MonthWindow::new(262_000, 2).is_ok());
    }

    #[test]
    fn test_window_constructors() {
        assert_eq!(MonthWindow::from_zero_based(0, 2024).unwrap(), w(2024, 1));
        assert_eq!(MonthWindow::from_zero_based(11, 2024).unwrap(), w(2024, 12));
        assert!(MonthWindow::from_zero_based(12, 2024).is_err());
        assert!(MonthWindow::new(2024, 0).is_err());
        assert_eq!(w(2024, 2).last_day(), Some(d("2024-02-29")));
        assert_eq!(w(2023, 12).last_day(), Some(d("2023-12-31")));
    }

    #[test]
    fn test_add_months() {
        assert_eq!(add_months(d("2024-11-30"), 3), Some(d("2025-03-02")));
        assert_eq!(add_months(d("2024-12-15"), 1), Some(d("2025-01-15")));
        assert_eq!(add_months(d("2024-01-31"), 1), Some(d("2024-03-02")));
    }
}
