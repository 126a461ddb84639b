//! Projects and project membership.
//!
//! # Invariants
//! - `shortname` is unique, at most 20 chars and matches `[A-Za-z0-9_]+`.
//! - A project owner always holds an `Owner` subscription.
//! - At most one pending invite exists per (user, project).

use super::account::UserId;
use super::{check_identifier, check_text, now_epoch_ms, EntityValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProjectId = Uuid;

pub const SHORTNAME_MAX_LEN: usize = 20;
pub const PROJECT_NAME_MAX_LEN: usize = 200;

/// Project workspace owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub uuid: ProjectId,
    /// URL-safe unique identifier.
    pub shortname: String,
    pub name: String,
    pub owner_uuid: UserId,
    pub is_active: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: i64,
}

impl Project {
    pub fn new(
        shortname: impl Into<String>,
        name: impl Into<String>,
        owner_uuid: UserId,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            shortname: shortname.into(),
            name: name.into(),
            owner_uuid,
            is_active: true,
            start_date,
            end_date: None,
            created_at: now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        check_identifier("shortname", &self.shortname, SHORTNAME_MAX_LEN)?;
        check_text("name", &self.name, PROJECT_NAME_MAX_LEN)?;
        if matches!(self.end_date, Some(end) if end < self.start_date) {
            return Err(EntityValidationError::EndBeforeStart {
                start_field: "start_date",
                end_field: "end_date",
            });
        }
        Ok(())
    }

    /// Root URL of the project pages.
    pub fn absolute_url(&self) -> String {
        format!("/{}/", self.shortname)
    }
}

/// Access level of a project member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// Full rights over the project.
    Owner,
    /// May create and edit project content.
    Participant,
    /// Read-only access.
    Viewer,
}

impl Group {
    pub const ALL: [Group; 3] = [Group::Owner, Group::Participant, Group::Viewer];

    /// Label used as submitted choice value and for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Owner => "Owner",
            Self::Participant => "Participant",
            Self::Viewer => "Viewer",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|group| group.label() == value)
    }

    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Participant => "participant",
            Self::Viewer => "viewer",
        }
    }

    pub(crate) fn from_db(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(Self::Owner),
            "participant" => Some(Self::Participant),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

/// Active membership of a user in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribedUser {
    pub uuid: Uuid,
    pub user_uuid: UserId,
    pub project_uuid: ProjectId,
    pub group: Group,
}

impl SubscribedUser {
    pub fn new(user_uuid: UserId, project_uuid: ProjectId, group: Group) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            user_uuid,
            project_uuid,
            group,
        }
    }
}

/// Membership offer waiting for the invited user's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitedUser {
    pub uuid: Uuid,
    pub user_uuid: UserId,
    pub project_uuid: ProjectId,
    pub group: Group,
    /// The invited user declined.
    pub rejected: bool,
    /// The invited user accepted and now holds a subscription.
    pub accepted: bool,
    pub created_at: i64,
}

impl InvitedUser {
    pub fn new(user_uuid: UserId, project_uuid: ProjectId, group: Group) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            user_uuid,
            project_uuid,
            group,
            rejected: false,
            accepted: false,
            created_at: now_epoch_ms(),
        }
    }

    /// An invite is pending until it is either accepted or rejected.
    pub fn is_pending(&self) -> bool {
        !self.rejected && !self.accepted
    }
}
