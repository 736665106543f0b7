//! In-memory implementation of every store trait.
//!
//! One shared state backs all traits so joins (archive candidates need client
//! names and organisation timezones) and referential checks behave like the
//! Postgres schema.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use meridian_core::models::{
    ActivityLogEntry, AlertType, ArchiveCandidate, Client, ClientNote, ClientType,
    CreateClientRequest, CreateMeetingRequest, CreatePaymentScheduleRequest, CreateUserRequest,
    FileAttachment, HistoryRecord, InsertOutcome, MeetingType, NewActivityEntry,
    NewHistoryRecord, OAuthToken, Organization, PaymentSchedule, PaymentStatus,
    PaymentStatusMap, ScheduledMeeting, User,
};
use meridian_core::{AppError, Role};
use meridian_db::{
    ActivityLogStore, ClientStore, HistoryStore, MeetingStore, OAuthTokenStore,
    OrganizationStore, PaymentStore, UserStore,
};
use sqlx::types::Json;
use uuid::Uuid;

/// Switches that make individual store calls fail.
#[derive(Default)]
pub struct Failures {
    history_insert: AtomicBool,
    history_lookup_miss: AtomicBool,
    edit_before_archive_delete: AtomicBool,
    remove_before_archive_delete: AtomicBool,
    meeting_delete: AtomicBool,
    attachment_append: AtomicBool,
    activity_append: AtomicBool,
}

impl Failures {
    pub fn fail_history_insert(&self, on: bool) {
        self.history_insert.store(on, Ordering::SeqCst);
    }

    /// `find_by_original` reports nothing, as if another archiver's insert
    /// landed after the lookup.
    pub fn miss_history_lookups(&self, on: bool) {
        self.history_lookup_miss.store(on, Ordering::SeqCst);
    }

    /// A user edit to the meeting commits just before `delete_unchanged` runs,
    /// moving it a week later.
    pub fn edit_before_archive_delete(&self, on: bool) {
        self.edit_before_archive_delete.store(on, Ordering::SeqCst);
    }

    /// Another archiver removes the meeting just before `delete_unchanged` runs.
    pub fn remove_before_archive_delete(&self, on: bool) {
        self.remove_before_archive_delete.store(on, Ordering::SeqCst);
    }

    pub fn fail_meeting_delete(&self, on: bool) {
        self.meeting_delete.store(on, Ordering::SeqCst);
    }

    /// Applies to meeting attachments and history MOM files.
    pub fn fail_attachment_append(&self, on: bool) {
        self.attachment_append.store(on, Ordering::SeqCst);
    }

    pub fn fail_activity_append(&self, on: bool) {
        self.activity_append.store(on, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), AppError> {
        if flag.load(Ordering::SeqCst) {
            return Err(AppError::Internal(format!("injected {} failure", what)));
        }
        Ok(())
    }
}

#[derive(Default)]
struct MockState {
    organizations: HashMap<Uuid, Organization>,
    users: HashMap<(Uuid, Uuid), User>,
    clients: HashMap<(Uuid, Uuid), Client>,
    notes: Vec<ClientNote>,
    meetings: HashMap<(Uuid, Uuid), ScheduledMeeting>,
    history: HashMap<(Uuid, Uuid), HistoryRecord>,
    payments: HashMap<(Uuid, Uuid), PaymentSchedule>,
    activity: Vec<ActivityLogEntry>,
    oauth_tokens: HashMap<(Uuid, String), OAuthToken>,
}

/// Mock backing store for testing without a database
#[derive(Clone)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
    failures: Arc<Failures>,
    org_id: Uuid,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// A store holding one organisation on UTC.
    pub fn new() -> Self {
        let store = Self {
            state: Arc::new(Mutex::new(MockState::default())),
            failures: Arc::new(Failures::default()),
            org_id: Uuid::nil(),
        };
        let org_id = store.add_org("Test Advisory", "UTC");
        Self { org_id, ..store }
    }

    /// The organisation created by [`MockStore::new`].
    pub fn org_id(&self) -> Uuid {
        self.org_id
    }

    pub fn failures(&self) -> &Failures {
        &self.failures
    }

    pub fn add_org(&self, name: &str, timezone: &str) -> Uuid {
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            timezone: timezone.to_string(),
            created_at: Utc::now(),
        };
        let id = org.id;
        self.state.lock().unwrap().organizations.insert(id, org);
        id
    }

    pub fn seed_user(&self, org_id: Uuid, display_name: &str, role: Role) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            org_id,
            email: format!("{}@example.test", display_name.to_lowercase()),
            display_name: display_name.to_string(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .users
            .insert((org_id, user.id), user.clone());
        user
    }

    pub fn seed_client(&self, org_id: Uuid, name: &str) -> Client {
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            org_id,
            name: name.to_string(),
            client_type: ClientType::Holistic,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .clients
            .insert((org_id, client.id), client.clone());
        client
    }

    pub fn seed_meeting(
        &self,
        org_id: Uuid,
        client_id: Uuid,
        meeting_date: NaiveDate,
        meeting_time: NaiveTime,
    ) -> ScheduledMeeting {
        let now = Utc::now();
        let meeting = ScheduledMeeting {
            id: Uuid::new_v4(),
            org_id,
            client_id,
            meeting_date,
            meeting_time,
            meeting_type: MeetingType::Online,
            location: "Video call".to_string(),
            agenda: None,
            meeting_link: None,
            alert_type: AlertType::None,
            remind_minutes_before: None,
            attachments: Json(Vec::new()),
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .meetings
            .insert((org_id, meeting.id), meeting.clone());
        meeting
    }

    /// Put a history row for `meeting` in place without touching the active row.
    pub fn seed_history_for(&self, meeting: &ScheduledMeeting) -> HistoryRecord {
        let candidate = ArchiveCandidate {
            meeting: meeting.clone(),
            client_name: "Seeded".to_string(),
            org_timezone: "UTC".to_string(),
        };
        let record = history_row(&NewHistoryRecord::from(&candidate));
        self.state
            .lock()
            .unwrap()
            .history
            .insert((record.org_id, record.id), record.clone());
        record
    }

    pub fn meetings(&self) -> Vec<ScheduledMeeting> {
        let mut meetings: Vec<_> = self.state.lock().unwrap().meetings.values().cloned().collect();
        meetings.sort_by_key(|m| (m.meeting_date, m.meeting_time));
        meetings
    }

    pub fn history_records(&self) -> Vec<HistoryRecord> {
        let mut records: Vec<_> = self.state.lock().unwrap().history.values().cloned().collect();
        records.sort_by_key(|r| (r.meeting_date, r.meeting_time));
        records
    }

    /// Oldest first.
    pub fn activity_entries(&self) -> Vec<ActivityLogEntry> {
        self.state.lock().unwrap().activity.clone()
    }

    pub fn oauth_rows(&self) -> Vec<OAuthToken> {
        self.state.lock().unwrap().oauth_tokens.values().cloned().collect()
    }
}

fn history_row(record: &NewHistoryRecord) -> HistoryRecord {
    HistoryRecord {
        id: Uuid::new_v4(),
        org_id: record.org_id,
        original_meeting_id: record.original_meeting_id,
        client_id: Some(record.client_id),
        client_name: record.client_name.clone(),
        meeting_date: record.meeting_date,
        meeting_time: record.meeting_time,
        meeting_type: record.meeting_type,
        location: record.location.clone(),
        agenda: record.agenda.clone(),
        meeting_link: record.meeting_link.clone(),
        attachments: Json(record.attachments.clone()),
        mom_files: Json(Vec::new()),
        created_by: record.created_by,
        archived_at: Utc::now(),
    }
}

fn candidate(state: &MockState, meeting: &ScheduledMeeting) -> Option<ArchiveCandidate> {
    let client = state.clients.get(&(meeting.org_id, meeting.client_id))?;
    let org = state.organizations.get(&meeting.org_id)?;
    Some(ArchiveCandidate {
        meeting: meeting.clone(),
        client_name: client.name.clone(),
        org_timezone: org.timezone.clone(),
    })
}

fn sorted_candidates(mut candidates: Vec<ArchiveCandidate>) -> Vec<ArchiveCandidate> {
    candidates.sort_by_key(|c| (c.meeting.meeting_date, c.meeting.meeting_time));
    candidates
}

#[async_trait]
impl MeetingStore for MockStore {
    async fn insert(
        &self,
        org_id: Uuid,
        created_by: Uuid,
        request: &CreateMeetingRequest,
    ) -> Result<ScheduledMeeting, AppError> {
        let mut state = self.state.lock().unwrap();
        if !state.clients.contains_key(&(org_id, request.client_id)) {
            return Err(AppError::Conflict("client does not exist".to_string()));
        }
        let now = Utc::now();
        let meeting = ScheduledMeeting {
            id: Uuid::new_v4(),
            org_id,
            client_id: request.client_id,
            meeting_date: request.meeting_date,
            meeting_time: request.meeting_time,
            meeting_type: request.meeting_type,
            location: request.location.trim().to_string(),
            agenda: request.agenda.clone(),
            meeting_link: request.meeting_link.clone(),
            alert_type: request.alert_type,
            remind_minutes_before: request.remind_minutes_before,
            attachments: Json(Vec::new()),
            created_by,
            created_at: now,
            updated_at: now,
        };
        state.meetings.insert((org_id, meeting.id), meeting.clone());
        Ok(meeting)
    }

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<ScheduledMeeting>, AppError> {
        Ok(self.state.lock().unwrap().meetings.get(&(org_id, id)).cloned())
    }

    async fn list_upcoming(&self, org_id: Uuid) -> Result<Vec<ScheduledMeeting>, AppError> {
        Ok(self
            .meetings()
            .into_iter()
            .filter(|m| m.org_id == org_id)
            .collect())
    }

    async fn list_with_reminders(&self, org_id: Uuid) -> Result<Vec<ScheduledMeeting>, AppError> {
        Ok(self
            .meetings()
            .into_iter()
            .filter(|m| m.org_id == org_id && m.alert_type == AlertType::Remind)
            .collect())
    }

    async fn reschedule(
        &self,
        org_id: Uuid,
        id: Uuid,
        meeting_date: NaiveDate,
        meeting_time: NaiveTime,
    ) -> Result<Option<ScheduledMeeting>, AppError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.meetings.get_mut(&(org_id, id)).map(|m| {
            m.meeting_date = meeting_date;
            m.meeting_time = meeting_time;
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn append_attachment(
        &self,
        org_id: Uuid,
        id: Uuid,
        attachment: &FileAttachment,
    ) -> Result<Option<ScheduledMeeting>, AppError> {
        Failures::check(&self.failures.attachment_append, "attachment append")?;
        let mut state = self.state.lock().unwrap();
        Ok(state.meetings.get_mut(&(org_id, id)).map(|m| {
            m.attachments.0.push(attachment.clone());
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        Failures::check(&self.failures.meeting_delete, "meeting delete")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .meetings
            .remove(&(org_id, id))
            .is_some())
    }

    async fn delete_unchanged(
        &self,
        org_id: Uuid,
        id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        Failures::check(&self.failures.meeting_delete, "meeting delete")?;
        let mut state = self.state.lock().unwrap();
        if self.failures.edit_before_archive_delete.load(Ordering::SeqCst) {
            if let Some(m) = state.meetings.get_mut(&(org_id, id)) {
                m.meeting_date += chrono::Duration::days(7);
                m.updated_at = updated_at + chrono::Duration::milliseconds(1);
            }
        }
        if self.failures.remove_before_archive_delete.load(Ordering::SeqCst) {
            state.meetings.remove(&(org_id, id));
        }
        let unchanged = state
            .meetings
            .get(&(org_id, id))
            .is_some_and(|m| m.updated_at == updated_at);
        if unchanged {
            state.meetings.remove(&(org_id, id));
        }
        Ok(unchanged)
    }

    async fn count_for_client(&self, org_id: Uuid, client_id: Uuid) -> Result<i64, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .meetings
            .values()
            .filter(|m| m.org_id == org_id && m.client_id == client_id)
            .count() as i64)
    }

    async fn archive_candidates(&self, org_id: Uuid) -> Result<Vec<ArchiveCandidate>, AppError> {
        let state = self.state.lock().unwrap();
        let candidates = state
            .meetings
            .values()
            .filter(|m| m.org_id == org_id)
            .filter_map(|m| candidate(&state, m))
            .collect();
        Ok(sorted_candidates(candidates))
    }

    async fn due_archive_candidates(
        &self,
        on_or_before: NaiveDate,
    ) -> Result<Vec<ArchiveCandidate>, AppError> {
        let state = self.state.lock().unwrap();
        let candidates = state
            .meetings
            .values()
            .filter(|m| m.meeting_date <= on_or_before)
            .filter_map(|m| candidate(&state, m))
            .collect();
        Ok(sorted_candidates(candidates))
    }
}

#[async_trait]
impl HistoryStore for MockStore {
    async fn find_by_original(
        &self,
        org_id: Uuid,
        original_meeting_id: Uuid,
    ) -> Result<Option<HistoryRecord>, AppError> {
        if self.failures.history_lookup_miss.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .history
            .values()
            .find(|r| r.org_id == org_id && r.original_meeting_id == original_meeting_id)
            .cloned())
    }

    async fn insert_if_absent(&self, record: &NewHistoryRecord) -> Result<InsertOutcome, AppError> {
        Failures::check(&self.failures.history_insert, "history insert")?;
        let mut state = self.state.lock().unwrap();
        let exists = state
            .history
            .values()
            .any(|r| r.original_meeting_id == record.original_meeting_id);
        if exists {
            return Ok(InsertOutcome::AlreadyArchived);
        }
        let row = history_row(record);
        state.history.insert((row.org_id, row.id), row);
        Ok(InsertOutcome::Inserted)
    }

    async fn remove_by_original(
        &self,
        org_id: Uuid,
        original_meeting_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let before = state.history.len();
        state
            .history
            .retain(|_, r| !(r.org_id == org_id && r.original_meeting_id == original_meeting_id));
        Ok(state.history.len() < before)
    }

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<HistoryRecord>, AppError> {
        Ok(self.state.lock().unwrap().history.get(&(org_id, id)).cloned())
    }

    async fn list(&self, org_id: Uuid) -> Result<Vec<HistoryRecord>, AppError> {
        let mut records: Vec<_> = self
            .history_records()
            .into_iter()
            .filter(|r| r.org_id == org_id)
            .collect();
        records.reverse();
        Ok(records)
    }

    async fn append_mom_file(
        &self,
        org_id: Uuid,
        id: Uuid,
        file: &FileAttachment,
    ) -> Result<Option<HistoryRecord>, AppError> {
        Failures::check(&self.failures.attachment_append, "MOM file append")?;
        let mut state = self.state.lock().unwrap();
        Ok(state.history.get_mut(&(org_id, id)).map(|r| {
            r.mom_files.0.push(file.clone());
            r.clone()
        }))
    }
}

#[async_trait]
impl PaymentStore for MockStore {
    async fn insert(
        &self,
        org_id: Uuid,
        created_by: Uuid,
        request: &CreatePaymentScheduleRequest,
    ) -> Result<PaymentSchedule, AppError> {
        let mut state = self.state.lock().unwrap();
        if !state.clients.contains_key(&(org_id, request.client_id)) {
            return Err(AppError::Conflict("client does not exist".to_string()));
        }
        let now = Utc::now();
        let schedule = PaymentSchedule {
            id: Uuid::new_v4(),
            org_id,
            client_id: request.client_id,
            amount: request.amount,
            amounts: request.amounts.clone(),
            due_dates: request.due_dates.clone(),
            frequency: request.frequency,
            payment_status: Json(PaymentStatusMap::new()),
            notes: request.notes.clone(),
            created_by,
            created_at: now,
            updated_at: now,
        };
        state.payments.insert((org_id, schedule.id), schedule.clone());
        Ok(schedule)
    }

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<PaymentSchedule>, AppError> {
        Ok(self.state.lock().unwrap().payments.get(&(org_id, id)).cloned())
    }

    async fn list(
        &self,
        org_id: Uuid,
        client_id: Option<Uuid>,
    ) -> Result<Vec<PaymentSchedule>, AppError> {
        let state = self.state.lock().unwrap();
        let mut schedules: Vec<_> = state
            .payments
            .values()
            .filter(|p| p.org_id == org_id && client_id.map_or(true, |c| p.client_id == c))
            .cloned()
            .collect();
        schedules.sort_by_key(|p| p.created_at);
        Ok(schedules)
    }

    async fn set_status(
        &self,
        org_id: Uuid,
        id: Uuid,
        due_date: NaiveDate,
        status: PaymentStatus,
    ) -> Result<Option<PaymentSchedule>, AppError> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .payments
            .get_mut(&(org_id, id))
            .filter(|p| p.has_due_date(due_date))
            .map(|p| {
                p.payment_status.0.insert(due_date, status);
                p.updated_at = Utc::now();
                p.clone()
            }))
    }

    async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .payments
            .remove(&(org_id, id))
            .is_some())
    }

    async fn count_for_client(&self, org_id: Uuid, client_id: Uuid) -> Result<i64, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .payments
            .values()
            .filter(|p| p.org_id == org_id && p.client_id == client_id)
            .count() as i64)
    }
}

#[async_trait]
impl ClientStore for MockStore {
    async fn insert(&self, org_id: Uuid, request: &CreateClientRequest) -> Result<Client, AppError> {
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            org_id,
            name: request.name.clone(),
            client_type: request.client_type,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .clients
            .insert((org_id, client.id), client.clone());
        Ok(client)
    }

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.state.lock().unwrap().clients.get(&(org_id, id)).cloned())
    }

    async fn list(&self, org_id: Uuid) -> Result<Vec<Client>, AppError> {
        let state = self.state.lock().unwrap();
        let mut clients: Vec<_> = state
            .clients
            .values()
            .filter(|c| c.org_id == org_id)
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn rename(&self, org_id: Uuid, id: Uuid, name: &str) -> Result<Option<Client>, AppError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.clients.get_mut(&(org_id, id)).map(|c| {
            c.name = name.to_string();
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let referenced = state.meetings.values().any(|m| m.client_id == id)
            || state.payments.values().any(|p| p.client_id == id);
        if referenced {
            return Err(AppError::Conflict(
                "client is still referenced by meetings or payment schedules".to_string(),
            ));
        }
        for record in state.history.values_mut() {
            if record.client_id == Some(id) {
                record.client_id = None;
            }
        }
        state.notes.retain(|n| n.client_id != id);
        Ok(state.clients.remove(&(org_id, id)).is_some())
    }

    async fn insert_note(
        &self,
        org_id: Uuid,
        client_id: Uuid,
        created_by: Uuid,
        created_by_name: &str,
        body: &str,
    ) -> Result<ClientNote, AppError> {
        let note = ClientNote {
            id: Uuid::new_v4(),
            org_id,
            client_id,
            body: body.to_string(),
            created_by,
            created_by_name: created_by_name.to_string(),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().notes.push(note.clone());
        Ok(note)
    }

    async fn list_notes(&self, org_id: Uuid, client_id: Uuid) -> Result<Vec<ClientNote>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .notes
            .iter()
            .rev()
            .filter(|n| n.org_id == org_id && n.client_id == client_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MockStore {
    async fn insert(&self, org_id: Uuid, request: &CreateUserRequest) -> Result<User, AppError> {
        let mut state = self.state.lock().unwrap();
        let taken = state
            .users
            .values()
            .any(|u| u.org_id == org_id && u.email.eq_ignore_ascii_case(&request.email));
        if taken {
            return Err(AppError::Conflict(format!(
                "A user with email '{}' already exists",
                request.email
            )));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            org_id,
            email: request.email.clone(),
            display_name: request.display_name.clone(),
            role: request.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.users.insert((org_id, user.id), user.clone());
        Ok(user)
    }

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state.lock().unwrap().users.get(&(org_id, id)).cloned())
    }

    async fn list(&self, org_id: Uuid) -> Result<Vec<User>, AppError> {
        let state = self.state.lock().unwrap();
        let mut users: Vec<_> = state
            .users
            .values()
            .filter(|u| u.org_id == org_id)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(users)
    }

    async fn set_role(&self, org_id: Uuid, id: Uuid, role: Role) -> Result<Option<User>, AppError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.users.get_mut(&(org_id, id)).map(|u| {
            u.role = role;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn set_active(
        &self,
        org_id: Uuid,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<User>, AppError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.users.get_mut(&(org_id, id)).map(|u| {
            u.is_active = is_active;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }
}

#[async_trait]
impl OrganizationStore for MockStore {
    async fn get(&self, id: Uuid) -> Result<Option<Organization>, AppError> {
        Ok(self.state.lock().unwrap().organizations.get(&id).cloned())
    }
}

#[async_trait]
impl ActivityLogStore for MockStore {
    async fn append(&self, entry: &NewActivityEntry) -> Result<ActivityLogEntry, AppError> {
        Failures::check(&self.failures.activity_append, "activity append")?;
        let row = ActivityLogEntry {
            id: Uuid::new_v4(),
            org_id: entry.org_id,
            actor_id: entry.actor_id,
            actor_name: entry.actor_name.clone(),
            action: entry.action,
            collection: entry.collection.clone(),
            record_id: entry.record_id,
            payload: entry.payload.clone(),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().activity.push(row.clone());
        Ok(row)
    }

    async fn list(
        &self,
        org_id: Uuid,
        collection: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ActivityLogEntry>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .activity
            .iter()
            .rev()
            .filter(|e| e.org_id == org_id)
            .filter(|e| collection.map_or(true, |c| e.collection == c))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OAuthTokenStore for MockStore {
    async fn upsert(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        provider: &str,
        access_token_encrypted: &str,
        refresh_token_encrypted: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<OAuthToken, AppError> {
        let mut state = self.state.lock().unwrap();
        let key = (user_id, provider.to_string());
        let id = state.oauth_tokens.get(&key).map_or_else(Uuid::new_v4, |t| t.id);
        let token = OAuthToken {
            id,
            org_id,
            user_id,
            provider: provider.to_string(),
            access_token_encrypted: access_token_encrypted.to_string(),
            refresh_token_encrypted: refresh_token_encrypted.map(str::to_string),
            expires_at,
            updated_at: Utc::now(),
        };
        state.oauth_tokens.insert(key, token.clone());
        Ok(token)
    }

    async fn get(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<OAuthToken>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .oauth_tokens
            .get(&(user_id, provider.to_string()))
            .filter(|t| t.org_id == org_id)
            .cloned())
    }
}
