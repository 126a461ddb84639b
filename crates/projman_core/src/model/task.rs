//! Tasks, subtasks and task items with append-only version history.
//!
//! # Responsibility
//! - Define task/task item records and their validation rules.
//! - Build notes attached to a task or item by logical number.
//!
//! # Invariants
//! - `(project_uuid, number)` identifies a logical task across versions.
//! - Exactly one version of a logical task/item has `is_current = true`.
//! - `expected_end_date >= expected_start_date` when set.
//! - Task item `expected_time > 0`.

use super::account::UserId;
use super::note::{TaskNote, TodoNote};
use super::project::{Project, ProjectId};
use super::time_amount::{TimeAmount, TimeUnit};
use super::{check_text, now_epoch_ms, EntityValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TASK_NAME_MAX_LEN: usize = 200;

/// Version metadata shared by tasks and task items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Starts at 1 and grows by one per edit.
    pub version_number: i64,
    pub is_current: bool,
    /// When this version became current.
    pub effective_start_at: i64,
    /// When this version was superseded. `None` while current.
    pub effective_end_at: Option<i64>,
}

impl VersionInfo {
    pub fn initial(at: i64) -> Self {
        Self {
            version_number: 1,
            is_current: true,
            effective_start_at: at,
            effective_end_at: None,
        }
    }

    /// Metadata of the version that supersedes `self` at `at`.
    pub fn next(&self, at: i64) -> Self {
        Self {
            version_number: self.version_number + 1,
            is_current: true,
            effective_start_at: at,
            effective_end_at: None,
        }
    }
}

/// Unit of planned work inside a project, optionally nested under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Row id of this version.
    pub uuid: Uuid,
    pub project_uuid: ProjectId,
    /// Per-project logical number, assigned on first insert. `0` until stored.
    pub number: i64,
    pub name: String,
    /// Logical number of the parent task for subtasks.
    pub parent_task_num: Option<i64>,
    pub user_responsible: Option<UserId>,
    pub expected_start_date: NaiveDate,
    pub expected_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub is_complete: bool,
    pub created_by: UserId,
    pub updated_by: UserId,
    /// Creation time of the logical task; kept across versions.
    pub created_at: i64,
    #[serde(flatten)]
    pub version: VersionInfo,
}

impl Task {
    pub fn new(
        project_uuid: ProjectId,
        name: impl Into<String>,
        expected_start_date: NaiveDate,
        created_by: UserId,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            uuid: Uuid::new_v4(),
            project_uuid,
            number: 0,
            name: name.into(),
            parent_task_num: None,
            user_responsible: None,
            expected_start_date,
            expected_end_date: None,
            actual_start_date: None,
            actual_end_date: None,
            is_complete: false,
            created_by,
            updated_by: created_by,
            created_at: now,
            version: VersionInfo::initial(now),
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        check_text("name", &self.name, TASK_NAME_MAX_LEN)?;
        if matches!(self.expected_end_date, Some(end) if end < self.expected_start_date) {
            return Err(EntityValidationError::EndBeforeStart {
                start_field: "expected_start_date",
                end_field: "expected_end_date",
            });
        }
        if let (Some(start), Some(end)) = (self.actual_start_date, self.actual_end_date) {
            if end < start {
                return Err(EntityValidationError::EndBeforeStart {
                    start_field: "actual_start_date",
                    end_field: "actual_end_date",
                });
            }
        }
        Ok(())
    }

    pub fn is_subtask(&self) -> bool {
        self.parent_task_num.is_some()
    }

    /// Builds a note bound to this task's logical number.
    pub fn add_note(&self, user_uuid: UserId, text: impl Into<String>) -> TaskNote {
        TaskNote::new(self.project_uuid, self.number, user_uuid, text)
    }

    pub fn absolute_url(&self, project: &Project) -> String {
        format!("{}tasks/{}/", project.absolute_url(), self.number)
    }
}

/// Todo-style work unit belonging to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub uuid: Uuid,
    pub project_uuid: ProjectId,
    /// Logical number of the owning task.
    pub task_num: i64,
    /// Per-project logical number of the item. `0` until stored.
    pub number: i64,
    pub name: String,
    pub user: Option<UserId>,
    pub expected_time: TimeAmount,
    pub actual_time: Option<TimeAmount>,
    pub unit: TimeUnit,
    pub is_complete: bool,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: i64,
    #[serde(flatten)]
    pub version: VersionInfo,
}

impl TaskItem {
    pub fn new(
        task: &Task,
        name: impl Into<String>,
        expected_time: TimeAmount,
        unit: TimeUnit,
        created_by: UserId,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            uuid: Uuid::new_v4(),
            project_uuid: task.project_uuid,
            task_num: task.number,
            number: 0,
            name: name.into(),
            user: None,
            expected_time,
            actual_time: None,
            unit,
            is_complete: false,
            created_by,
            updated_by: created_by,
            created_at: now,
            version: VersionInfo::initial(now),
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        check_text("name", &self.name, TASK_NAME_MAX_LEN)?;
        if !self.expected_time.is_positive() {
            return Err(EntityValidationError::NonPositiveTime);
        }
        if matches!(self.actual_time, Some(time) if time.is_negative()) {
            return Err(EntityValidationError::NegativeTime);
        }
        Ok(())
    }

    /// Builds a note bound to this item's logical number.
    pub fn add_note(&self, user_uuid: UserId, text: impl Into<String>) -> TodoNote {
        TodoNote::new(self.project_uuid, self.number, user_uuid, text)
    }
}
