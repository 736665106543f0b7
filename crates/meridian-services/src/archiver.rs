//! Past-event archiver
//!
//! Moves meetings whose start instant has passed from the active schedule into
//! history. The history row is always written before the active row is
//! removed, so a failure part-way leaves the meeting active and the next run
//! picks it up again. Concurrent archivers are reconciled by the unique index
//! on `original_meeting_id`, and the active row is only removed while it still
//! matches the snapshot that was copied into history.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use meridian_core::constants::collections;
use meridian_core::models::{
    parse_timezone, ActivityAction, ArchiveCandidate, InsertOutcome, NewHistoryRecord,
};
use meridian_core::schedule_time::is_past;
use meridian_core::{ActorContext, AppError, Operation, Resource};
use meridian_db::{HistoryStore, MeetingStore};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::interval;
use utoipa::ToSchema;

use crate::audit::AuditTrail;
use crate::permit;

/// The furthest any IANA zone runs ahead of UTC, rounded up.
const MAX_UTC_OFFSET_HOURS: i64 = 14;

/// Counts from one archiver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ArchiveReport {
    /// Active meetings looked at
    pub examined: usize,
    /// Meetings moved into history by this run
    pub archived: usize,
    /// Leftover active rows removed because history already held them
    pub reconciled: usize,
    pub failed: usize,
}

impl ArchiveReport {
    fn merge(&mut self, outcome: Outcome) {
        self.examined += 1;
        match outcome {
            Outcome::NotDue => {}
            Outcome::Archived => self.archived += 1,
            Outcome::Reconciled => self.reconciled += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    fn is_idle(&self) -> bool {
        self.archived == 0 && self.reconciled == 0 && self.failed == 0
    }

    /// Info when the run changed or failed anything, debug otherwise.
    fn log(&self, message: &str) {
        if self.is_idle() {
            tracing::debug!(examined = self.examined, "{}", message);
        } else {
            tracing::info!(
                examined = self.examined,
                archived = self.archived,
                reconciled = self.reconciled,
                failed = self.failed,
                "{}",
                message
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    NotDue,
    Archived,
    Reconciled,
    Failed,
}

pub struct ArchiverService {
    meetings: Arc<dyn MeetingStore>,
    history: Arc<dyn HistoryStore>,
    audit: AuditTrail,
    default_timezone: Tz,
}

impl ArchiverService {
    pub fn new(
        meetings: Arc<dyn MeetingStore>,
        history: Arc<dyn HistoryStore>,
        audit: AuditTrail,
        default_timezone: Tz,
    ) -> Self {
        Self {
            meetings,
            history,
            audit,
            default_timezone,
        }
    }

    /// Archive every past meeting of the actor's organisation.
    pub async fn archive_past_events(&self, actor: &ActorContext) -> Result<ArchiveReport, AppError> {
        self.archive_past_events_at(actor, Utc::now()).await
    }

    /// As [`archive_past_events`](Self::archive_past_events) against a given clock.
    #[tracing::instrument(skip(self, actor), fields(org_id = %actor.org_id, archive.scope = "org"))]
    pub async fn archive_past_events_at(
        &self,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<ArchiveReport, AppError> {
        permit(actor, Resource::Meeting, Operation::Archive)?;

        let candidates = self.meetings.archive_candidates(actor.org_id).await?;
        let mut report = ArchiveReport::default();
        for candidate in &candidates {
            report.merge(self.archive_one(actor, candidate, now).await);
        }

        report.log("Archive run finished");
        Ok(report)
    }

    /// Archive past meetings across every organisation. Used by scheduled jobs.
    #[tracing::instrument(skip(self), fields(archive.scope = "all"))]
    pub async fn archive_all_due(&self, now: DateTime<Utc>) -> Result<ArchiveReport, AppError> {
        // Meetings dated up to "today" in the zone furthest ahead of UTC may
        // already have started; the exact check happens per meeting.
        let bound = (now + chrono::Duration::hours(MAX_UTC_OFFSET_HOURS)).date_naive();
        let candidates = self.meetings.due_archive_candidates(bound).await?;

        let mut report = ArchiveReport::default();
        for candidate in &candidates {
            let system = ActorContext::system(candidate.meeting.org_id);
            report.merge(self.archive_one(&system, candidate, now).await);
        }

        report.log("Scheduled archive run finished");
        Ok(report)
    }

    /// Run [`archive_all_due`](Self::archive_all_due) every `period` until
    /// `shutdown` flips to true.
    pub fn start(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            tracing::info!(interval_secs = period.as_secs(), "Archiver loop started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.archive_all_due(Utc::now()).await {
                            tracing::error!(error = %e, "Scheduled archive run failed");
                        }
                    }
                    _ = async { shutdown.wait_for(|stopping| *stopping).await.map(|_| ()) } => break,
                }
            }

            tracing::info!("Archiver loop stopped");
        })
    }

    fn timezone_of(&self, candidate: &ArchiveCandidate) -> Tz {
        parse_timezone(&candidate.org_timezone).unwrap_or(self.default_timezone)
    }

    async fn archive_one(
        &self,
        actor: &ActorContext,
        candidate: &ArchiveCandidate,
        now: DateTime<Utc>,
    ) -> Outcome {
        let meeting = &candidate.meeting;
        if !is_past(meeting.starts_at(self.timezone_of(candidate)), now) {
            return Outcome::NotDue;
        }

        match self.migrate(actor, candidate).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    meeting_id = %meeting.id,
                    org_id = %meeting.org_id,
                    "Failed to archive meeting"
                );
                Outcome::Failed
            }
        }
    }

    async fn migrate(
        &self,
        actor: &ActorContext,
        candidate: &ArchiveCandidate,
    ) -> Result<Outcome, AppError> {
        let meeting = &candidate.meeting;

        let existing = self
            .history
            .find_by_original(meeting.org_id, meeting.id)
            .await?;
        let inserted = match existing {
            Some(_) => false,
            None => {
                let record = NewHistoryRecord::from(candidate);
                self.history.insert_if_absent(&record).await? == InsertOutcome::Inserted
            }
        };

        // Only reached once history holds the meeting. The delete is pinned to
        // the snapshot the history row was built from.
        let removed = self
            .meetings
            .delete_unchanged(meeting.org_id, meeting.id, meeting.updated_at)
            .await?;

        if !inserted {
            if !removed {
                return Ok(Outcome::NotDue);
            }
            tracing::debug!(meeting_id = %meeting.id, "Removed already archived meeting");
            return Ok(Outcome::Reconciled);
        }

        if !removed {
            let still_active = self.meetings.get(meeting.org_id, meeting.id).await?;
            if still_active.is_some() {
                // Edited since the candidate read; the active row wins.
                self.history
                    .remove_by_original(meeting.org_id, meeting.id)
                    .await?;
                tracing::debug!(meeting_id = %meeting.id, "Meeting changed during archiving, left active");
                return Ok(Outcome::NotDue);
            }
            // Already gone, e.g. a racing archiver reconciled it; history keeps our row.
        }

        self.audit
            .record(
                actor,
                ActivityAction::Archive,
                collections::MEETINGS,
                meeting.id,
                serde_json::json!({
                    "client_name": candidate.client_name,
                    "meeting_date": meeting.meeting_date,
                    "meeting_time": meeting.meeting_time,
                }),
            )
            .await;

        tracing::info!(meeting_id = %meeting.id, org_id = %meeting.org_id, "Meeting archived");
        Ok(Outcome::Archived)
    }
}
