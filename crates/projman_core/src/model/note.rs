//! Notes attached to tasks and task items.
//!
//! Notes reference their target by logical number instead of row id, so a
//! note stays attached when the task or item gains a new version.

use super::account::UserId;
use super::project::ProjectId;
use super::{now_epoch_ms, EntityValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNote {
    pub uuid: Uuid,
    pub project_uuid: ProjectId,
    pub task_num: i64,
    pub user_uuid: UserId,
    pub text: String,
    pub created_at: i64,
}

impl TaskNote {
    pub fn new(
        project_uuid: ProjectId,
        task_num: i64,
        user_uuid: UserId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            project_uuid,
            task_num,
            user_uuid,
            text: text.into(),
            created_at: now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        validate_note_text(&self.text)
    }
}

/// Note on a task item ("todo").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoNote {
    pub uuid: Uuid,
    pub project_uuid: ProjectId,
    pub todo_num: i64,
    pub user_uuid: UserId,
    pub text: String,
    pub created_at: i64,
}

impl TodoNote {
    pub fn new(
        project_uuid: ProjectId,
        todo_num: i64,
        user_uuid: UserId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            project_uuid,
            todo_num,
            user_uuid,
            text: text.into(),
            created_at: now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        validate_note_text(&self.text)
    }
}

fn validate_note_text(text: &str) -> Result<(), EntityValidationError> {
    if text.trim().is_empty() {
        return Err(EntityValidationError::EmptyField("text"));
    }
    Ok(())
}
