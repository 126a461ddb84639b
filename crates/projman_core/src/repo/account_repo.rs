//! User account persistence.

use super::project_repo::insert_project;
use super::{get_uuid, query_one, RepoResult, SqliteRepository};
use crate::model::account::{User, UserId, UserProfile};
use crate::model::project::{Project, SubscribedUser};
use rusqlite::{params, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT uuid, username, password_hash, created_at FROM users";

/// Repository interface for accounts.
pub trait AccountRepository {
    /// Inserts a user and its profile in one transaction.
    fn create_account(&self, user: &User, profile: &UserProfile) -> RepoResult<()>;
    /// Like `create_account`, plus an optional first project and its owner
    /// subscription. Nothing is written unless every row is.
    fn create_account_with_project(
        &self,
        user: &User,
        profile: &UserProfile,
        project: Option<(&Project, &SubscribedUser)>,
    ) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Exact, case-sensitive username lookup.
    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn get_profile(&self, user_uuid: UserId) -> RepoResult<Option<UserProfile>>;
}

impl AccountRepository for SqliteRepository<'_> {
    fn create_account(&self, user: &User, profile: &UserProfile) -> RepoResult<()> {
        self.create_account_with_project(user, profile, None)
    }

    fn create_account_with_project(
        &self,
        user: &User,
        profile: &UserProfile,
        project: Option<(&Project, &SubscribedUser)>,
    ) -> RepoResult<()> {
        user.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        insert_account(&tx, user, profile)?;
        if let Some((project, owner)) = project {
            insert_project(&tx, project, owner)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        query_one(
            self.conn,
            &format!("{USER_SELECT_SQL} WHERE uuid = ?1;"),
            [id.to_string()],
            parse_user_row,
        )
    }

    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        query_one(
            self.conn,
            &format!("{USER_SELECT_SQL} WHERE username = ?1;"),
            [username],
            parse_user_row,
        )
    }

    fn get_profile(&self, user_uuid: UserId) -> RepoResult<Option<UserProfile>> {
        query_one(
            self.conn,
            "SELECT user_uuid, created_at FROM user_profiles WHERE user_uuid = ?1;",
            [user_uuid.to_string()],
            |row| {
                Ok(UserProfile {
                    user_uuid: get_uuid(row, "user_uuid")?,
                    created_at: row.get("created_at")?,
                })
            },
        )
    }
}

fn insert_account(conn: &Connection, user: &User, profile: &UserProfile) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO users (uuid, username, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            user.uuid.to_string(),
            user.username.as_str(),
            user.password_hash.as_str(),
            user.created_at,
        ],
    )?;
    conn.execute(
        "INSERT INTO user_profiles (user_uuid, created_at) VALUES (?1, ?2);",
        params![profile.user_uuid.to_string(), profile.created_at],
    )?;
    Ok(())
}

pub(crate) fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let user = User {
        uuid: get_uuid(row, "uuid")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        created_at: row.get("created_at")?,
    };
    user.validate()?;
    Ok(user)
}
