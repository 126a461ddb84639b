//! Task, task item and note persistence with append-only versions.
//!
//! # Responsibility
//! - Assign per-project logical numbers on first insert.
//! - Append a new version row on every edit and retire the previous one.
//! - Store notes keyed by logical number.
//!
//! # Invariants
//! - Reads by number only ever see the current version.
//! - Saving a version other than the current one fails with `StaleVersion`.
//! - Retiring the old row and inserting the new one happen in one transaction.

use super::{
    bool_to_int, get_bool, get_optional_uuid, get_uuid, query_all, query_one, RepoError,
    RepoResult, SqliteRepository,
};
use crate::model::note::{TaskNote, TodoNote};
use crate::model::now_epoch_ms;
use crate::model::project::ProjectId;
use crate::model::task::{Task, TaskItem, VersionInfo};
use crate::model::time_amount::{TimeAmount, TimeUnit};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    number,
    name,
    parent_task_num,
    user_responsible_uuid,
    expected_start_date,
    expected_end_date,
    actual_start_date,
    actual_end_date,
    is_complete,
    created_by_uuid,
    updated_by_uuid,
    created_at,
    effective_start_at,
    effective_end_at,
    version_number,
    is_current
FROM tasks";

const TASK_ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    task_num,
    number,
    name,
    user_uuid,
    expected_time,
    actual_time,
    unit,
    is_complete,
    created_by_uuid,
    updated_by_uuid,
    created_at,
    effective_start_at,
    effective_end_at,
    version_number,
    is_current
FROM task_items";

/// Which current tasks of a project to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskScope {
    /// Every current task, subtasks included.
    #[default]
    All,
    /// Tasks without a parent.
    TopLevel,
    /// Direct subtasks of the given logical task number.
    SubtasksOf(i64),
}

/// Repository interface for tasks, task items and their notes.
pub trait TaskRepository {
    /// Inserts version 1 of a new task and returns its assigned number.
    fn create_task(&self, task: &Task) -> RepoResult<i64>;
    /// Current version of a logical task.
    fn get_task(&self, project_uuid: ProjectId, number: i64) -> RepoResult<Option<Task>>;
    /// Current tasks ordered by number.
    fn list_tasks(&self, project_uuid: ProjectId, scope: TaskScope) -> RepoResult<Vec<Task>>;
    /// Appends an edited copy of the current version and returns the new version.
    fn save_task_version(&self, task: &Task) -> RepoResult<Task>;
    /// Every version of a logical task, oldest first.
    fn task_history(&self, project_uuid: ProjectId, number: i64) -> RepoResult<Vec<Task>>;

    /// Inserts version 1 of a new item and returns its assigned number.
    fn create_task_item(&self, item: &TaskItem) -> RepoResult<i64>;
    fn get_task_item(&self, project_uuid: ProjectId, number: i64)
        -> RepoResult<Option<TaskItem>>;
    /// Current items of a logical task ordered by number.
    fn list_task_items(&self, project_uuid: ProjectId, task_num: i64)
        -> RepoResult<Vec<TaskItem>>;
    fn save_task_item_version(&self, item: &TaskItem) -> RepoResult<TaskItem>;
    fn task_item_history(&self, project_uuid: ProjectId, number: i64)
        -> RepoResult<Vec<TaskItem>>;

    fn create_task_note(&self, note: &TaskNote) -> RepoResult<()>;
    fn list_task_notes(&self, project_uuid: ProjectId, task_num: i64)
        -> RepoResult<Vec<TaskNote>>;
    fn create_todo_note(&self, note: &TodoNote) -> RepoResult<()>;
    fn list_todo_notes(&self, project_uuid: ProjectId, todo_num: i64)
        -> RepoResult<Vec<TodoNote>>;
}

impl TaskRepository for SqliteRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<i64> {
        task.validate()?;
        if let Some(parent_num) = task.parent_task_num {
            if self.get_task(task.project_uuid, parent_num)?.is_none() {
                return Err(RepoError::not_found("parent task", parent_num));
            }
        }
        insert_task_row(self.conn, task, None, &VersionInfo::initial(task.created_at))
    }

    fn get_task(&self, project_uuid: ProjectId, number: i64) -> RepoResult<Option<Task>> {
        query_one(
            self.conn,
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE project_uuid = ?1 AND number = ?2 AND is_current = 1;"
            ),
            params![project_uuid.to_string(), number],
            parse_task_row,
        )
    }

    fn list_tasks(&self, project_uuid: ProjectId, scope: TaskScope) -> RepoResult<Vec<Task>> {
        let project = project_uuid.to_string();
        match scope {
            TaskScope::All => query_all(
                self.conn,
                &format!(
                    "{TASK_SELECT_SQL}
                     WHERE project_uuid = ?1 AND is_current = 1
                     ORDER BY number ASC;"
                ),
                [project],
                parse_task_row,
            ),
            TaskScope::TopLevel => query_all(
                self.conn,
                &format!(
                    "{TASK_SELECT_SQL}
                     WHERE project_uuid = ?1 AND is_current = 1 AND parent_task_num IS NULL
                     ORDER BY number ASC;"
                ),
                [project],
                parse_task_row,
            ),
            TaskScope::SubtasksOf(parent_num) => query_all(
                self.conn,
                &format!(
                    "{TASK_SELECT_SQL}
                     WHERE project_uuid = ?1 AND is_current = 1 AND parent_task_num = ?2
                     ORDER BY number ASC;"
                ),
                params![project, parent_num],
                parse_task_row,
            ),
        }
    }

    fn save_task_version(&self, task: &Task) -> RepoResult<Task> {
        task.validate()?;
        let now = now_epoch_ms();

        let tx = self.conn.unchecked_transaction()?;
        let retired = tx.execute(
            "UPDATE tasks
             SET is_current = 0, effective_end_at = ?4
             WHERE project_uuid = ?1
               AND number = ?2
               AND version_number = ?3
               AND is_current = 1;",
            params![
                task.project_uuid.to_string(),
                task.number,
                task.version.version_number,
                now,
            ],
        )?;
        if retired == 0 {
            return Err(missing_or_stale(
                &tx,
                "tasks",
                "task",
                task.project_uuid,
                task.number,
                task.version.version_number,
            )?);
        }

        let mut next = task.clone();
        next.uuid = Uuid::new_v4();
        next.version = task.version.next(now);
        insert_task_row(&tx, &next, Some(next.number), &next.version)?;
        tx.commit()?;
        Ok(next)
    }

    fn task_history(&self, project_uuid: ProjectId, number: i64) -> RepoResult<Vec<Task>> {
        query_all(
            self.conn,
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE project_uuid = ?1 AND number = ?2
                 ORDER BY version_number ASC;"
            ),
            params![project_uuid.to_string(), number],
            parse_task_row,
        )
    }

    fn create_task_item(&self, item: &TaskItem) -> RepoResult<i64> {
        item.validate()?;
        if self.get_task(item.project_uuid, item.task_num)?.is_none() {
            return Err(RepoError::not_found("task", item.task_num));
        }
        insert_task_item_row(self.conn, item, None, &VersionInfo::initial(item.created_at))
    }

    fn get_task_item(
        &self,
        project_uuid: ProjectId,
        number: i64,
    ) -> RepoResult<Option<TaskItem>> {
        query_one(
            self.conn,
            &format!(
                "{TASK_ITEM_SELECT_SQL}
                 WHERE project_uuid = ?1 AND number = ?2 AND is_current = 1;"
            ),
            params![project_uuid.to_string(), number],
            parse_task_item_row,
        )
    }

    fn list_task_items(
        &self,
        project_uuid: ProjectId,
        task_num: i64,
    ) -> RepoResult<Vec<TaskItem>> {
        query_all(
            self.conn,
            &format!(
                "{TASK_ITEM_SELECT_SQL}
                 WHERE project_uuid = ?1 AND task_num = ?2 AND is_current = 1
                 ORDER BY number ASC;"
            ),
            params![project_uuid.to_string(), task_num],
            parse_task_item_row,
        )
    }

    fn save_task_item_version(&self, item: &TaskItem) -> RepoResult<TaskItem> {
        item.validate()?;
        let now = now_epoch_ms();

        let tx = self.conn.unchecked_transaction()?;
        let retired = tx.execute(
            "UPDATE task_items
             SET is_current = 0, effective_end_at = ?4
             WHERE project_uuid = ?1
               AND number = ?2
               AND version_number = ?3
               AND is_current = 1;",
            params![
                item.project_uuid.to_string(),
                item.number,
                item.version.version_number,
                now,
            ],
        )?;
        if retired == 0 {
            return Err(missing_or_stale(
                &tx,
                "task_items",
                "task item",
                item.project_uuid,
                item.number,
                item.version.version_number,
            )?);
        }

        let mut next = item.clone();
        next.uuid = Uuid::new_v4();
        next.version = item.version.next(now);
        insert_task_item_row(&tx, &next, Some(next.number), &next.version)?;
        tx.commit()?;
        Ok(next)
    }

    fn task_item_history(
        &self,
        project_uuid: ProjectId,
        number: i64,
    ) -> RepoResult<Vec<TaskItem>> {
        query_all(
            self.conn,
            &format!(
                "{TASK_ITEM_SELECT_SQL}
                 WHERE project_uuid = ?1 AND number = ?2
                 ORDER BY version_number ASC;"
            ),
            params![project_uuid.to_string(), number],
            parse_task_item_row,
        )
    }

    fn create_task_note(&self, note: &TaskNote) -> RepoResult<()> {
        note.validate()?;
        self.conn.execute(
            "INSERT INTO task_notes (uuid, project_uuid, task_num, user_uuid, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                note.uuid.to_string(),
                note.project_uuid.to_string(),
                note.task_num,
                note.user_uuid.to_string(),
                note.text.as_str(),
                note.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_task_notes(
        &self,
        project_uuid: ProjectId,
        task_num: i64,
    ) -> RepoResult<Vec<TaskNote>> {
        query_all(
            self.conn,
            "SELECT uuid, project_uuid, task_num, user_uuid, text, created_at
             FROM task_notes
             WHERE project_uuid = ?1 AND task_num = ?2
             ORDER BY created_at ASC, rowid ASC;",
            params![project_uuid.to_string(), task_num],
            |row| {
                Ok(TaskNote {
                    uuid: get_uuid(row, "uuid")?,
                    project_uuid: get_uuid(row, "project_uuid")?,
                    task_num: row.get("task_num")?,
                    user_uuid: get_uuid(row, "user_uuid")?,
                    text: row.get("text")?,
                    created_at: row.get("created_at")?,
                })
            },
        )
    }

    fn create_todo_note(&self, note: &TodoNote) -> RepoResult<()> {
        note.validate()?;
        self.conn.execute(
            "INSERT INTO todo_notes (uuid, project_uuid, todo_num, user_uuid, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                note.uuid.to_string(),
                note.project_uuid.to_string(),
                note.todo_num,
                note.user_uuid.to_string(),
                note.text.as_str(),
                note.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_todo_notes(
        &self,
        project_uuid: ProjectId,
        todo_num: i64,
    ) -> RepoResult<Vec<TodoNote>> {
        query_all(
            self.conn,
            "SELECT uuid, project_uuid, todo_num, user_uuid, text, created_at
             FROM todo_notes
             WHERE project_uuid = ?1 AND todo_num = ?2
             ORDER BY created_at ASC, rowid ASC;",
            params![project_uuid.to_string(), todo_num],
            |row| {
                Ok(TodoNote {
                    uuid: get_uuid(row, "uuid")?,
                    project_uuid: get_uuid(row, "project_uuid")?,
                    todo_num: row.get("todo_num")?,
                    user_uuid: get_uuid(row, "user_uuid")?,
                    text: row.get("text")?,
                    created_at: row.get("created_at")?,
                })
            },
        )
    }
}

/// Inserts one task row. `number = None` allocates the next project number.
fn insert_task_row(
    conn: &Connection,
    task: &Task,
    number: Option<i64>,
    version: &VersionInfo,
) -> RepoResult<i64> {
    let number = conn.query_row(
        "INSERT INTO tasks (
            uuid,
            project_uuid,
            number,
            name,
            parent_task_num,
            user_responsible_uuid,
            expected_start_date,
            expected_end_date,
            actual_start_date,
            actual_end_date,
            is_complete,
            created_by_uuid,
            updated_by_uuid,
            created_at,
            effective_start_at,
            effective_end_at,
            version_number,
            is_current
        ) VALUES (
            ?1,
            ?2,
            COALESCE(?3, (SELECT COALESCE(MAX(number), 0) + 1 FROM tasks WHERE project_uuid = ?2)),
            ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
        )
        RETURNING number;",
        params![
            task.uuid.to_string(),
            task.project_uuid.to_string(),
            number,
            task.name.as_str(),
            task.parent_task_num,
            task.user_responsible.map(|id| id.to_string()),
            task.expected_start_date,
            task.expected_end_date,
            task.actual_start_date,
            task.actual_end_date,
            bool_to_int(task.is_complete),
            task.created_by.to_string(),
            task.updated_by.to_string(),
            task.created_at,
            version.effective_start_at,
            version.effective_end_at,
            version.version_number,
            bool_to_int(version.is_current),
        ],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(number)
}

/// Inserts one task item row. `number = None` allocates the next project number.
fn insert_task_item_row(
    conn: &Connection,
    item: &TaskItem,
    number: Option<i64>,
    version: &VersionInfo,
) -> RepoResult<i64> {
    let number = conn.query_row(
        "INSERT INTO task_items (
            uuid,
            project_uuid,
            task_num,
            number,
            name,
            user_uuid,
            expected_time,
            actual_time,
            unit,
            is_complete,
            created_by_uuid,
            updated_by_uuid,
            created_at,
            effective_start_at,
            effective_end_at,
            version_number,
            is_current
        ) VALUES (
            ?1,
            ?2,
            ?3,
            COALESCE(?4, (SELECT COALESCE(MAX(number), 0) + 1 FROM task_items WHERE project_uuid = ?2)),
            ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17
        )
        RETURNING number;",
        params![
            item.uuid.to_string(),
            item.project_uuid.to_string(),
            item.task_num,
            number,
            item.name.as_str(),
            item.user.map(|id| id.to_string()),
            item.expected_time.hundredths(),
            item.actual_time.map(TimeAmount::hundredths),
            item.unit.as_str(),
            bool_to_int(item.is_complete),
            item.created_by.to_string(),
            item.updated_by.to_string(),
            item.created_at,
            version.effective_start_at,
            version.effective_end_at,
            version.version_number,
            bool_to_int(version.is_current),
        ],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(number)
}

/// Distinguishes a missing logical row from an edit based on an old version.
fn missing_or_stale(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    project_uuid: ProjectId,
    number: i64,
    version_number: i64,
) -> RepoResult<RepoError> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1 FROM {table}
                WHERE project_uuid = ?1 AND number = ?2 AND is_current = 1
            );"
        ),
        params![project_uuid.to_string(), number],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(RepoError::StaleVersion {
            entity,
            number,
            version_number,
        })
    } else {
        Ok(RepoError::not_found(entity, number))
    }
}

fn parse_version(row: &Row<'_>) -> RepoResult<VersionInfo> {
    Ok(VersionInfo {
        version_number: row.get("version_number")?,
        is_current: get_bool(row, "is_current")?,
        effective_start_at: row.get("effective_start_at")?,
        effective_end_at: row.get("effective_end_at")?,
    })
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let task = Task {
        uuid: get_uuid(row, "uuid")?,
        project_uuid: get_uuid(row, "project_uuid")?,
        number: row.get("number")?,
        name: row.get("name")?,
        parent_task_num: row.get("parent_task_num")?,
        user_responsible: get_optional_uuid(row, "user_responsible_uuid")?,
        expected_start_date: row.get("expected_start_date")?,
        expected_end_date: row.get("expected_end_date")?,
        actual_start_date: row.get("actual_start_date")?,
        actual_end_date: row.get("actual_end_date")?,
        is_complete: get_bool(row, "is_complete")?,
        created_by: get_uuid(row, "created_by_uuid")?,
        updated_by: get_uuid(row, "updated_by_uuid")?,
        created_at: row.get("created_at")?,
        version: parse_version(row)?,
    };
    task.validate()?;
    Ok(task)
}

fn parse_task_item_row(row: &Row<'_>) -> RepoResult<TaskItem> {
    let unit_text: String = row.get("unit")?;
    let unit = TimeUnit::parse(&unit_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid unit `{unit_text}` in task_items.unit"))
    })?;

    let item = TaskItem {
        uuid: get_uuid(row, "uuid")?,
        project_uuid: get_uuid(row, "project_uuid")?,
        task_num: row.get("task_num")?,
        number: row.get("number")?,
        name: row.get("name")?,
        user: get_optional_uuid(row, "user_uuid")?,
        expected_time: TimeAmount::from_hundredths(row.get("expected_time")?),
        actual_time: row
            .get::<_, Option<i64>>("actual_time")?
            .map(TimeAmount::from_hundredths),
        unit,
        is_complete: get_bool(row, "is_complete")?,
        created_by: get_uuid(row, "created_by_uuid")?,
        updated_by: get_uuid(row, "updated_by_uuid")?,
        created_at: row.get("created_at")?,
        version: parse_version(row)?,
    };
    item.validate()?;
    Ok(item)
}
