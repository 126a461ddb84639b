//! Project, membership and project content persistence.
//!
//! # Invariants
//! - `create_project` writes the project and its owner subscription atomically.
//! - `accept_invite` consumes the invite, creates the subscription and logs it atomically.
//! - Notice numbers are assigned by the insert statement itself.

use super::account_repo::parse_user_row;
use super::{
    bool_to_int, get_bool, get_uuid, query_all, query_one, RepoError,
    RepoResult, SqliteRepository,
};
use crate::model::account::{User, UserId};
use crate::model::project::{Group, InvitedUser, Project, ProjectId, SubscribedUser};
use crate::model::project_content::{Notice, ProjectFile, ProjectLog, TodoList};
use rusqlite::{params, Row};
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    p.uuid AS uuid,
    p.shortname AS shortname,
    p.name AS name,
    p.owner_uuid AS owner_uuid,
    p.is_active AS is_active,
    p.start_date AS start_date,
    p.end_date AS end_date,
    p.created_at AS created_at
FROM projects p";

const INVITE_SELECT_SQL: &str = "SELECT
    uuid,
    user_uuid,
    project_uuid,
    member_group,
    rejected,
    accepted,
    created_at
FROM invited_users";

/// Repository interface for projects and everything hanging off them.
pub trait ProjectRepository {
    /// Inserts the project and the owner's subscription in one transaction.
    fn create_project(&self, project: &Project, owner: &SubscribedUser) -> RepoResult<()>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn find_project_by_shortname(&self, shortname: &str) -> RepoResult<Option<Project>>;
    /// Projects the user is subscribed to, by shortname.
    fn list_projects_for_user(&self, user_uuid: UserId) -> RepoResult<Vec<Project>>;

    fn list_subscriptions(&self, project_uuid: ProjectId) -> RepoResult<Vec<SubscribedUser>>;
    /// Subscribed users of a project, by username.
    fn list_subscribers(&self, project_uuid: ProjectId) -> RepoResult<Vec<User>>;
    fn find_subscription(
        &self,
        project_uuid: ProjectId,
        user_uuid: UserId,
    ) -> RepoResult<Option<SubscribedUser>>;

    fn create_invite(&self, invite: &InvitedUser) -> RepoResult<()>;
    fn get_invite(&self, id: Uuid) -> RepoResult<Option<InvitedUser>>;
    fn find_pending_invite(
        &self,
        project_uuid: ProjectId,
        user_uuid: UserId,
    ) -> RepoResult<Option<InvitedUser>>;
    fn list_pending_invites_for_user(&self, user_uuid: UserId) -> RepoResult<Vec<InvitedUser>>;
    /// Marks a pending invite accepted and subscribes the user.
    fn accept_invite(&self, id: Uuid, log: &ProjectLog) -> RepoResult<SubscribedUser>;
    /// Marks a pending invite rejected.
    fn reject_invite(&self, id: Uuid) -> RepoResult<()>;

    /// Inserts a notice and returns its assigned per-project number.
    fn create_notice(&self, notice: &Notice) -> RepoResult<i64>;
    fn list_notices(&self, project_uuid: ProjectId) -> RepoResult<Vec<Notice>>;
    fn create_todo_list(&self, list: &TodoList) -> RepoResult<()>;
    fn list_todo_lists(
        &self,
        project_uuid: ProjectId,
        user_uuid: UserId,
    ) -> RepoResult<Vec<TodoList>>;
    fn append_log(&self, log: &ProjectLog) -> RepoResult<()>;
    fn list_logs(&self, project_uuid: ProjectId) -> RepoResult<Vec<ProjectLog>>;
    fn create_file(&self, file: &ProjectFile) -> RepoResult<()>;
    fn list_files(&self, project_uuid: ProjectId) -> RepoResult<Vec<ProjectFile>>;
}

impl ProjectRepository for SqliteRepository<'_> {
    fn create_project(&self, project: &Project, owner: &SubscribedUser) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        insert_project(&tx, project, owner)?;
        tx.commit()?;
        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        query_one(
            self.conn,
            &format!("{PROJECT_SELECT_SQL} WHERE p.uuid = ?1;"),
            [id.to_string()],
            parse_project_row,
        )
    }

    fn find_project_by_shortname(&self, shortname: &str) -> RepoResult<Option<Project>> {
        query_one(
            self.conn,
            &format!("{PROJECT_SELECT_SQL} WHERE p.shortname = ?1;"),
            [shortname],
            parse_project_row,
        )
    }

    fn list_projects_for_user(&self, user_uuid: UserId) -> RepoResult<Vec<Project>> {
        query_all(
            self.conn,
            &format!(
                "{PROJECT_SELECT_SQL}
                 INNER JOIN subscribed_users s ON s.project_uuid = p.uuid
                 WHERE s.user_uuid = ?1
                 ORDER BY p.shortname ASC;"
            ),
            [user_uuid.to_string()],
            parse_project_row,
        )
    }

    fn list_subscriptions(&self, project_uuid: ProjectId) -> RepoResult<Vec<SubscribedUser>> {
        query_all(
            self.conn,
            "SELECT uuid, user_uuid, project_uuid, member_group
             FROM subscribed_users
             WHERE project_uuid = ?1
             ORDER BY rowid ASC;",
            [project_uuid.to_string()],
            parse_subscription_row,
        )
    }

    fn list_subscribers(&self, project_uuid: ProjectId) -> RepoResult<Vec<User>> {
        query_all(
            self.conn,
            "SELECT
                u.uuid AS uuid,
                u.username AS username,
                u.password_hash AS password_hash,
                u.created_at AS created_at
             FROM users u
             INNER JOIN subscribed_users s ON s.user_uuid = u.uuid
             WHERE s.project_uuid = ?1
             ORDER BY u.username ASC;",
            [project_uuid.to_string()],
            parse_user_row,
        )
    }

    fn find_subscription(
        &self,
        project_uuid: ProjectId,
        user_uuid: UserId,
    ) -> RepoResult<Option<SubscribedUser>> {
        query_one(
            self.conn,
            "SELECT uuid, user_uuid, project_uuid, member_group
             FROM subscribed_users
             WHERE project_uuid = ?1 AND user_uuid = ?2;",
            [project_uuid.to_string(), user_uuid.to_string()],
            parse_subscription_row,
        )
    }

    fn create_invite(&self, invite: &InvitedUser) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO invited_users (
                uuid,
                user_uuid,
                project_uuid,
                member_group,
                rejected,
                accepted,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                invite.uuid.to_string(),
                invite.user_uuid.to_string(),
                invite.project_uuid.to_string(),
                invite.group.as_db(),
                bool_to_int(invite.rejected),
                bool_to_int(invite.accepted),
                invite.created_at,
            ],
        )?;
        Ok(())
    }

    fn get_invite(&self, id: Uuid) -> RepoResult<Option<InvitedUser>> {
        query_one(
            self.conn,
            &format!("{INVITE_SELECT_SQL} WHERE uuid = ?1;"),
            [id.to_string()],
            parse_invite_row,
        )
    }

    fn find_pending_invite(
        &self,
        project_uuid: ProjectId,
        user_uuid: UserId,
    ) -> RepoResult<Option<InvitedUser>> {
        query_one(
            self.conn,
            &format!(
                "{INVITE_SELECT_SQL}
                 WHERE project_uuid = ?1
                   AND user_uuid = ?2
                   AND rejected = 0
                   AND accepted = 0;"
            ),
            [project_uuid.to_string(), user_uuid.to_string()],
            parse_invite_row,
        )
    }

    fn list_pending_invites_for_user(&self, user_uuid: UserId) -> RepoResult<Vec<InvitedUser>> {
        query_all(
            self.conn,
            &format!(
                "{INVITE_SELECT_SQL}
                 WHERE user_uuid = ?1
                   AND rejected = 0
                   AND accepted = 0
                 ORDER BY created_at ASC, rowid ASC;"
            ),
            [user_uuid.to_string()],
            parse_invite_row,
        )
    }

    fn accept_invite(&self, id: Uuid, log: &ProjectLog) -> RepoResult<SubscribedUser> {
        let tx = self.conn.unchecked_transaction()?;
        let invite = query_one(
            &tx,
            &format!("{INVITE_SELECT_SQL} WHERE uuid = ?1 AND rejected = 0 AND accepted = 0;"),
            [id.to_string()],
            parse_invite_row,
        )?
        .ok_or_else(|| RepoError::not_found("pending invite", id))?;

        tx.execute(
            "UPDATE invited_users SET accepted = 1 WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        let subscription = SubscribedUser::new(invite.user_uuid, invite.project_uuid, invite.group);
        insert_subscription(&tx, &subscription)?;
        insert_log(&tx, log)?;
        tx.commit()?;
        Ok(subscription)
    }

    fn reject_invite(&self, id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE invited_users
             SET rejected = 1
             WHERE uuid = ?1 AND rejected = 0 AND accepted = 0;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("pending invite", id));
        }
        Ok(())
    }

    fn create_notice(&self, notice: &Notice) -> RepoResult<i64> {
        notice.validate()?;
        let number = self.conn.query_row(
            "INSERT INTO notices (uuid, project_uuid, number, user_uuid, text, created_at)
             VALUES (
                ?1,
                ?2,
                (SELECT COALESCE(MAX(number), 0) + 1 FROM notices WHERE project_uuid = ?2),
                ?3,
                ?4,
                ?5
             )
             RETURNING number;",
            params![
                notice.uuid.to_string(),
                notice.project_uuid.to_string(),
                notice.user_uuid.to_string(),
                notice.text.as_str(),
                notice.created_at,
            ],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(number)
    }

    fn list_notices(&self, project_uuid: ProjectId) -> RepoResult<Vec<Notice>> {
        query_all(
            self.conn,
            "SELECT uuid, project_uuid, number, user_uuid, text, created_at
             FROM notices
             WHERE project_uuid = ?1
             ORDER BY number DESC;",
            [project_uuid.to_string()],
            |row| {
                Ok(Notice {
                    uuid: get_uuid(row, "uuid")?,
                    project_uuid: get_uuid(row, "project_uuid")?,
                    number: row.get("number")?,
                    user_uuid: get_uuid(row, "user_uuid")?,
                    text: row.get("text")?,
                    created_at: row.get("created_at")?,
                })
            },
        )
    }

    fn create_todo_list(&self, list: &TodoList) -> RepoResult<()> {
        list.validate()?;
        self.conn.execute(
            "INSERT INTO todo_lists (uuid, project_uuid, user_uuid, name, is_complete, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                list.uuid.to_string(),
                list.project_uuid.to_string(),
                list.user_uuid.to_string(),
                list.name.as_str(),
                bool_to_int(list.is_complete),
                list.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_todo_lists(
        &self,
        project_uuid: ProjectId,
        user_uuid: UserId,
    ) -> RepoResult<Vec<TodoList>> {
        query_all(
            self.conn,
            "SELECT uuid, project_uuid, user_uuid, name, is_complete, created_at
             FROM todo_lists
             WHERE project_uuid = ?1 AND user_uuid = ?2
             ORDER BY created_at ASC, rowid ASC;",
            [project_uuid.to_string(), user_uuid.to_string()],
            |row| {
                Ok(TodoList {
                    uuid: get_uuid(row, "uuid")?,
                    project_uuid: get_uuid(row, "project_uuid")?,
                    user_uuid: get_uuid(row, "user_uuid")?,
                    name: row.get("name")?,
                    is_complete: get_bool(row, "is_complete")?,
                    created_at: row.get("created_at")?,
                })
            },
        )
    }

    fn append_log(&self, log: &ProjectLog) -> RepoResult<()> {
        insert_log(self.conn, log)
    }

    fn list_logs(&self, project_uuid: ProjectId) -> RepoResult<Vec<ProjectLog>> {
        query_all(
            self.conn,
            "SELECT uuid, project_uuid, text, is_complete, created_at
             FROM project_logs
             WHERE project_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;",
            [project_uuid.to_string()],
            |row| {
                Ok(ProjectLog {
                    uuid: get_uuid(row, "uuid")?,
                    project_uuid: get_uuid(row, "project_uuid")?,
                    text: row.get("text")?,
                    is_complete: get_bool(row, "is_complete")?,
                    created_at: row.get("created_at")?,
                })
            },
        )
    }

    fn create_file(&self, file: &ProjectFile) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO project_files (uuid, project_uuid, file, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                file.uuid.to_string(),
                file.project_uuid.to_string(),
                file.file.as_str(),
                file.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_files(&self, project_uuid: ProjectId) -> RepoResult<Vec<ProjectFile>> {
        query_all(
            self.conn,
            "SELECT uuid, project_uuid, file, created_at
             FROM project_files
             WHERE project_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;",
            [project_uuid.to_string()],
            |row| {
                Ok(ProjectFile {
                    uuid: get_uuid(row, "uuid")?,
                    project_uuid: get_uuid(row, "project_uuid")?,
                    file: row.get("file")?,
                    created_at: row.get("created_at")?,
                })
            },
        )
    }
}

/// Writes a project and its owner subscription on `conn`.
///
/// Callers own the transaction.
pub(crate) fn insert_project(
    conn: &rusqlite::Connection,
    project: &Project,
    owner: &SubscribedUser,
) -> RepoResult<()> {
    project.validate()?;
    if owner.project_uuid != project.uuid || owner.user_uuid != project.owner_uuid {
        return Err(RepoError::InvalidData(
            "owner subscription must reference the new project and its owner".to_string(),
        ));
    }
    conn.execute(
        "INSERT INTO projects (
            uuid,
            shortname,
            name,
            owner_uuid,
            is_active,
            start_date,
            end_date,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            project.uuid.to_string(),
            project.shortname.as_str(),
            project.name.as_str(),
            project.owner_uuid.to_string(),
            bool_to_int(project.is_active),
            project.start_date,
            project.end_date,
            project.created_at,
        ],
    )?;
    insert_subscription(conn, owner)
}

fn insert_subscription(
    conn: &rusqlite::Connection,
    subscription: &SubscribedUser,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO subscribed_users (uuid, user_uuid, project_uuid, member_group)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            subscription.uuid.to_string(),
            subscription.user_uuid.to_string(),
            subscription.project_uuid.to_string(),
            subscription.group.as_db(),
        ],
    )?;
    Ok(())
}

fn insert_log(conn: &rusqlite::Connection, log: &ProjectLog) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO project_logs (uuid, project_uuid, text, is_complete, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            log.uuid.to_string(),
            log.project_uuid.to_string(),
            log.text.as_str(),
            bool_to_int(log.is_complete),
            log.created_at,
        ],
    )?;
    Ok(())
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let project = Project {
        uuid: get_uuid(row, "uuid")?,
        shortname: row.get("shortname")?,
        name: row.get("name")?,
        owner_uuid: get_uuid(row, "owner_uuid")?,
        is_active: get_bool(row, "is_active")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        created_at: row.get("created_at")?,
    };
    project.validate()?;
    Ok(project)
}

fn parse_group(row: &Row<'_>) -> RepoResult<Group> {
    let value: String = row.get("member_group")?;
    Group::from_db(&value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid group `{value}` in column `member_group`"))
    })
}

fn parse_subscription_row(row: &Row<'_>) -> RepoResult<SubscribedUser> {
    Ok(SubscribedUser {
        uuid: get_uuid(row, "uuid")?,
        user_uuid: get_uuid(row, "user_uuid")?,
        project_uuid: get_uuid(row, "project_uuid")?,
        group: parse_group(row)?,
    })
}

fn parse_invite_row(row: &Row<'_>) -> RepoResult<InvitedUser> {
    Ok(InvitedUser {
        uuid: get_uuid(row, "uuid")?,
        user_uuid: get_uuid(row, "user_uuid")?,
        project_uuid: get_uuid(row, "project_uuid")?,
        group: parse_group(row)?,
        rejected: get_bool(row, "rejected")?,
        accepted: get_bool(row, "accepted")?,
        created_at: row.get("created_at")?,
    })
}
