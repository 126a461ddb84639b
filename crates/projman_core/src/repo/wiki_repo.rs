//! Wiki page and revision persistence.
//!
//! # Invariants
//! - A page is never visible without its first revision.
//! - `current_revision` is repointed in the same transaction that inserts
//!   the revision.

use super::{get_optional_uuid, get_uuid, query_all, query_one, RepoError, RepoResult, SqliteRepository};
use crate::model::project::ProjectId;
use crate::model::wiki::{WikiPage, WikiPageId, WikiPageRevision, WikiRevisionId};
use rusqlite::{params, Connection, Row};

const PAGE_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    name,
    title,
    current_revision_uuid,
    created_at
FROM wiki_pages";

const REVISION_SELECT_SQL: &str = "SELECT
    uuid,
    page_uuid,
    user_uuid,
    wiki_text,
    html_text,
    created_at
FROM wiki_page_revisions";

/// Repository interface for wiki pages.
pub trait WikiRepository {
    /// Inserts a page with its first revision and returns the stored page.
    fn create_page(&self, page: &WikiPage, first: &WikiPageRevision) -> RepoResult<WikiPage>;
    /// Appends a revision to an existing page and makes it current.
    fn append_revision(&self, revision: &WikiPageRevision) -> RepoResult<WikiPage>;
    fn get_page(&self, id: WikiPageId) -> RepoResult<Option<WikiPage>>;
    fn find_page_by_name(&self, project_uuid: ProjectId, name: &str)
        -> RepoResult<Option<WikiPage>>;
    /// Pages of a project ordered by title.
    fn list_pages(&self, project_uuid: ProjectId) -> RepoResult<Vec<WikiPage>>;
    fn get_revision(&self, id: WikiRevisionId) -> RepoResult<Option<WikiPageRevision>>;
    /// Revision the page currently points at.
    fn current_revision(&self, page_uuid: WikiPageId) -> RepoResult<Option<WikiPageRevision>>;
    /// Every revision of a page, oldest first.
    fn list_revisions(&self, page_uuid: WikiPageId) -> RepoResult<Vec<WikiPageRevision>>;
}

impl WikiRepository for SqliteRepository<'_> {
    fn create_page(&self, page: &WikiPage, first: &WikiPageRevision) -> RepoResult<WikiPage> {
        page.validate()?;
        if first.page_uuid != page.uuid {
            return Err(RepoError::InvalidData(format!(
                "revision {} does not belong to page {}",
                first.uuid, page.uuid
            )));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO wiki_pages (
                uuid,
                project_uuid,
                name,
                title,
                current_revision_uuid,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, NULL, ?5);",
            params![
                page.uuid.to_string(),
                page.project_uuid.to_string(),
                page.name.as_str(),
                page.title.as_str(),
                page.created_at,
            ],
        )?;
        insert_revision_and_repoint(&tx, first)?;
        tx.commit()?;

        let mut stored = page.clone();
        stored.current_revision = Some(first.uuid);
        Ok(stored)
    }

    fn append_revision(&self, revision: &WikiPageRevision) -> RepoResult<WikiPage> {
        let tx = self.conn.unchecked_transaction()?;
        insert_revision_and_repoint(&tx, revision)?;
        tx.commit()?;

        self.get_page(revision.page_uuid)?
            .ok_or_else(|| RepoError::not_found("wiki page", revision.page_uuid))
    }

    fn get_page(&self, id: WikiPageId) -> RepoResult<Option<WikiPage>> {
        query_one(
            self.conn,
            &format!("{PAGE_SELECT_SQL} WHERE uuid = ?1;"),
            [id.to_string()],
            parse_page_row,
        )
    }

    fn find_page_by_name(
        &self,
        project_uuid: ProjectId,
        name: &str,
    ) -> RepoResult<Option<WikiPage>> {
        query_one(
            self.conn,
            &format!("{PAGE_SELECT_SQL} WHERE project_uuid = ?1 AND name = ?2;"),
            params![project_uuid.to_string(), name],
            parse_page_row,
        )
    }

    fn list_pages(&self, project_uuid: ProjectId) -> RepoResult<Vec<WikiPage>> {
        query_all(
            self.conn,
            &format!("{PAGE_SELECT_SQL} WHERE project_uuid = ?1 ORDER BY title ASC, name ASC;"),
            [project_uuid.to_string()],
            parse_page_row,
        )
    }

    fn get_revision(&self, id: WikiRevisionId) -> RepoResult<Option<WikiPageRevision>> {
        query_one(
            self.conn,
            &format!("{REVISION_SELECT_SQL} WHERE uuid = ?1;"),
            [id.to_string()],
            parse_revision_row,
        )
    }

    fn current_revision(&self, page_uuid: WikiPageId) -> RepoResult<Option<WikiPageRevision>> {
        let Some(page) = self.get_page(page_uuid)? else {
            return Err(RepoError::not_found("wiki page", page_uuid));
        };
        match page.current_revision {
            Some(revision_id) => self.get_revision(revision_id),
            None => Ok(None),
        }
    }

    fn list_revisions(&self, page_uuid: WikiPageId) -> RepoResult<Vec<WikiPageRevision>> {
        query_all(
            self.conn,
            &format!(
                "{REVISION_SELECT_SQL}
                 WHERE page_uuid = ?1
                 ORDER BY created_at ASC, rowid ASC;"
            ),
            [page_uuid.to_string()],
            parse_revision_row,
        )
    }
}

fn insert_revision_and_repoint(conn: &Connection, revision: &WikiPageRevision) -> RepoResult<()> {
    let page_exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM wiki_pages WHERE uuid = ?1);",
        [revision.page_uuid.to_string()],
        |row| row.get(0),
    )?;
    if page_exists == 0 {
        return Err(RepoError::not_found("wiki page", revision.page_uuid));
    }

    conn.execute(
        "INSERT INTO wiki_page_revisions (
            uuid,
            page_uuid,
            user_uuid,
            wiki_text,
            html_text,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            revision.uuid.to_string(),
            revision.page_uuid.to_string(),
            revision.user_uuid.to_string(),
            revision.wiki_text.as_str(),
            revision.html_text.as_str(),
            revision.created_at,
        ],
    )?;
    conn.execute(
        "UPDATE wiki_pages SET current_revision_uuid = ?2 WHERE uuid = ?1;",
        params![revision.page_uuid.to_string(), revision.uuid.to_string()],
    )?;
    Ok(())
}

fn parse_page_row(row: &Row<'_>) -> RepoResult<WikiPage> {
    let page = WikiPage {
        uuid: get_uuid(row, "uuid")?,
        project_uuid: get_uuid(row, "project_uuid")?,
        name: row.get("name")?,
        title: row.get("title")?,
        current_revision: get_optional_uuid(row, "current_revision_uuid")?,
        created_at: row.get("created_at")?,
    };
    page.validate()?;
    Ok(page)
}

fn parse_revision_row(row: &Row<'_>) -> RepoResult<WikiPageRevision> {
    Ok(WikiPageRevision {
        uuid: get_uuid(row, "uuid")?,
        page_uuid: get_uuid(row, "page_uuid")?,
        user_uuid: get_uuid(row, "user_uuid")?,
        wiki_text: row.get("wiki_text")?,
        html_text: row.get("html_text")?,
        created_at: row.get("created_at")?,
    })
}
