//! Project-scoped content: notices, todo lists, activity logs and files.

use super::account::UserId;
use super::project::ProjectId;
use super::{check_text, now_epoch_ms, EntityValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TODO_LIST_NAME_MAX_LEN: usize = 100;
pub const LOG_TEXT_MAX_LEN: usize = 200;
/// Directory prefix recorded for uploaded project files.
pub const FILE_UPLOAD_DIR: &str = "/files/";

/// Announcement posted on a project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub uuid: Uuid,
    pub project_uuid: ProjectId,
    /// Per-project sequence, assigned on insert. `0` until stored.
    pub number: i64,
    pub user_uuid: UserId,
    pub text: String,
    pub created_at: i64,
}

impl Notice {
    pub fn new(project_uuid: ProjectId, user_uuid: UserId, text: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            project_uuid,
            number: 0,
            user_uuid,
            text: text.into(),
            created_at: now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        if self.text.trim().is_empty() {
            return Err(EntityValidationError::EmptyField("text"));
        }
        Ok(())
    }
}

/// Personal todo list of a project member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    pub uuid: Uuid,
    pub project_uuid: ProjectId,
    pub user_uuid: UserId,
    pub name: String,
    pub is_complete: bool,
    pub created_at: i64,
}

impl TodoList {
    pub fn new(project_uuid: ProjectId, user_uuid: UserId, name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            project_uuid,
            user_uuid,
            name: name.into(),
            is_complete: false,
            created_at: now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        check_text("name", &self.name, TODO_LIST_NAME_MAX_LEN)
    }
}

/// One line of the project activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLog {
    pub uuid: Uuid,
    pub project_uuid: ProjectId,
    pub text: String,
    pub is_complete: bool,
    pub created_at: i64,
}

impl ProjectLog {
    /// Builds a log line, truncating `text` to the column limit.
    pub fn new(project_uuid: ProjectId, text: impl AsRef<str>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            project_uuid,
            text: text.as_ref().chars().take(LOG_TEXT_MAX_LEN).collect(),
            is_complete: false,
            created_at: now_epoch_ms(),
        }
    }
}

/// Metadata of a file attached to a project. Bytes live in external storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub uuid: Uuid,
    pub project_uuid: ProjectId,
    /// Stored path, always under [`FILE_UPLOAD_DIR`].
    pub file: String,
    pub created_at: i64,
}

impl ProjectFile {
    /// Records an upload named `filename`; directory components are dropped.
    pub fn new(project_uuid: ProjectId, filename: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            project_uuid,
            file: format!("{FILE_UPLOAD_DIR}{}", upload_basename(filename)),
            created_at: now_epoch_ms(),
        }
    }

    /// File name without the upload directory.
    pub fn file_name(&self) -> &str {
        self.file
            .strip_prefix(FILE_UPLOAD_DIR)
            .unwrap_or(self.file.as_str())
    }
}

/// Returns the last path component of a client-supplied file name.
pub fn upload_basename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .find(|part| !part.trim().is_empty())
        .unwrap_or("")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::{upload_basename, ProjectFile, ProjectLog, LOG_TEXT_MAX_LEN};
    use uuid::Uuid;

    #[test]
    fn upload_basename_strips_client_directories() {
        assert_eq!(upload_basename("C:\\docs\\plan.pdf"), "plan.pdf");
        assert_eq!(upload_basename("../../etc/passwd"), "passwd");
        assert_eq!(upload_basename("report.txt"), "report.txt");
        assert_eq!(upload_basename("dir/"), "dir");
    }

    #[test]
    fn project_file_path_is_under_upload_dir() {
        let file = ProjectFile::new(Uuid::new_v4(), "nested/notes.md");
        assert_eq!(file.file, "/files/notes.md");
        assert_eq!(file.file_name(), "notes.md");
    }

    #[test]
    fn log_text_is_capped() {
        let log = ProjectLog::new(Uuid::new_v4(), "x".repeat(500));
        assert_eq!(log.text.chars().count(), LOG_TEXT_MAX_LEN);
    }
}
