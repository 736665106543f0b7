//! Wall-clock helpers for meetings
//!
//! Meetings are stored as a local date and time of day. They are interpreted in
//! the organisation's timezone to get the instant used for archival and reminders.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// The instant a meeting starts.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant. Local
/// times skipped by a DST jump resolve to the same wall-clock reading one hour
/// later.
pub fn meeting_start(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let local = NaiveDateTime::new(date, time);
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

/// A meeting is past once its start instant is strictly before `now`.
pub fn is_past(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start < now
}

pub fn reminder_instant(start: DateTime<Utc>, minutes_before: i32) -> DateTime<Utc> {
    start - Duration::minutes(minutes_before as i64)
}

/// Calendar date of `now` in `tz`.
pub fn today_in(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}
