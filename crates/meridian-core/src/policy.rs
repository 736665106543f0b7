//! Role-gated mutation policy
//!
//! Services call [`crate::ActorContext::authorize`] before touching a store;
//! this module holds the role matrix it consults.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User role (matches database enum `user_role`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    AssociateEditor,
    AssociateViewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::AssociateEditor => "associate_editor",
            Role::AssociateViewer => "associate_viewer",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manager" => Ok(Role::Manager),
            "associate_editor" | "associate-editor" => Ok(Role::AssociateEditor),
            "associate_viewer" | "associate-viewer" => Ok(Role::AssociateViewer),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Meeting,
    History,
    Payment,
    Client,
    ClientNote,
    User,
    ActivityLog,
    OAuthToken,
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Resource::Meeting => "meetings",
            Resource::History => "meeting history",
            Resource::Payment => "payment schedules",
            Resource::Client => "clients",
            Resource::ClientNote => "client notes",
            Resource::User => "users",
            Resource::ActivityLog => "the activity log",
            Resource::OAuthToken => "oauth tokens",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    /// Move past meetings into history.
    Archive,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// Whether `role` may perform `operation` on `resource`.
pub fn is_allowed(role: Role, resource: Resource, operation: Operation) -> bool {
    use Operation::*;
    use Resource::*;

    match (resource, operation) {
        // Archival keeps the active schedule clean; every signed-in role may trigger it.
        (Meeting, Archive) => true,
        (_, Archive) => false,

        (User, _) | (ActivityLog, _) => role == Role::Manager,

        // Ownership is enforced by scoping queries to the actor's own user id.
        (OAuthToken, _) => true,

        (_, Read) => true,
        (_, Create) | (_, Update) => matches!(role, Role::Manager | Role::AssociateEditor),
        (_, Delete) => role == Role::Manager,
    }
}
