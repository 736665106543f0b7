use std::sync::Arc;

use meridian_core::constants::collections;
use meridian_core::models::{
    ActivityAction, Client, ClientNote, CreateClientNoteRequest, CreateClientRequest,
    RenameClientRequest,
};
use meridian_core::{ActorContext, AppError, Operation, Resource};
use meridian_db::{ClientStore, MeetingStore, PaymentStore};
use uuid::Uuid;
use validator::Validate;

use crate::audit::AuditTrail;
use crate::permit;

/// Client records and their notes
#[derive(Clone)]
pub struct ClientService {
    clients: Arc<dyn ClientStore>,
    meetings: Arc<dyn MeetingStore>,
    payments: Arc<dyn PaymentStore>,
    audit: AuditTrail,
}

impl ClientService {
    pub fn new(
        clients: Arc<dyn ClientStore>,
        meetings: Arc<dyn MeetingStore>,
        payments: Arc<dyn PaymentStore>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            clients,
            meetings,
            payments,
            audit,
        }
    }

    pub async fn create(
        &self,
        actor: &ActorContext,
        mut request: CreateClientRequest,
    ) -> Result<Client, AppError> {
        permit(actor, Resource::Client, Operation::Create)?;
        request.name = request.name.trim().to_string();
        request.validate()?;

        let client = self.clients.insert(actor.org_id, &request).await?;

        self.audit
            .record(
                actor,
                ActivityAction::Create,
                collections::CLIENTS,
                client.id,
                serde_json::json!({ "name": client.name, "client_type": client.client_type }),
            )
            .await;

        Ok(client)
    }

    pub async fn get(&self, actor: &ActorContext, id: Uuid) -> Result<Client, AppError> {
        permit(actor, Resource::Client, Operation::Read)?;
        self.find(actor.org_id, id).await
    }

    pub async fn list(&self, actor: &ActorContext) -> Result<Vec<Client>, AppError> {
        permit(actor, Resource::Client, Operation::Read)?;
        self.clients.list(actor.org_id).await
    }

    /// Meetings and payments reference clients by id, so nothing else changes.
    pub async fn rename(
        &self,
        actor: &ActorContext,
        id: Uuid,
        mut request: RenameClientRequest,
    ) -> Result<Client, AppError> {
        permit(actor, Resource::Client, Operation::Update)?;
        request.name = request.name.trim().to_string();
        request.validate()?;

        let client = self
            .clients
            .rename(actor.org_id, id, &request.name)
            .await?
            .ok_or_else(|| not_found(id))?;

        self.audit
            .record(
                actor,
                ActivityAction::Update,
                collections::CLIENTS,
                id,
                serde_json::json!({ "name": client.name }),
            )
            .await;

        Ok(client)
    }

    /// Refused with Conflict while any meeting or payment schedule points at
    /// the client.
    #[tracing::instrument(skip(self, actor), fields(org_id = %actor.org_id, client_id = %id))]
    pub async fn delete(&self, actor: &ActorContext, id: Uuid) -> Result<(), AppError> {
        permit(actor, Resource::Client, Operation::Delete)?;
        self.find(actor.org_id, id).await?;

        let meetings = self.meetings.count_for_client(actor.org_id, id).await?;
        let schedules = self.payments.count_for_client(actor.org_id, id).await?;
        if meetings > 0 || schedules > 0 {
            return Err(AppError::Conflict(format!(
                "Client {} still has {} meeting(s) and {} payment schedule(s)",
                id, meetings, schedules
            )));
        }

        if !self.clients.delete(actor.org_id, id).await? {
            return Err(not_found(id));
        }

        self.audit
            .record(
                actor,
                ActivityAction::Delete,
                collections::CLIENTS,
                id,
                serde_json::Value::Null,
            )
            .await;

        Ok(())
    }

    pub async fn add_note(
        &self,
        actor: &ActorContext,
        client_id: Uuid,
        request: CreateClientNoteRequest,
    ) -> Result<ClientNote, AppError> {
        permit(actor, Resource::ClientNote, Operation::Create)?;
        request.validate()?;
        if request.body.trim().is_empty() {
            return Err(AppError::InvalidInput("Note must not be blank".to_string()));
        }
        self.find(actor.org_id, client_id).await?;

        let note = self
            .clients
            .insert_note(
                actor.org_id,
                client_id,
                actor.user_id,
                &actor.display_name,
                &request.body,
            )
            .await?;

        self.audit
            .record(
                actor,
                ActivityAction::Create,
                collections::CLIENT_NOTES,
                note.id,
                serde_json::json!({ "client_id": client_id }),
            )
            .await;

        Ok(note)
    }

    /// Newest first.
    pub async fn list_notes(
        &self,
        actor: &ActorContext,
        client_id: Uuid,
    ) -> Result<Vec<ClientNote>, AppError> {
        permit(actor, Resource::ClientNote, Operation::Read)?;
        self.find(actor.org_id, client_id).await?;
        self.clients.list_notes(actor.org_id, client_id).await
    }

    async fn find(&self, org_id: Uuid, id: Uuid) -> Result<Client, AppError> {
        self.clients
            .get(org_id, id)
            .await?
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Client {} not found", id))
}
