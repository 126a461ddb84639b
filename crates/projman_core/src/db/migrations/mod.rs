//! Ordered schema steps for the projman database.
//!
//! # Invariants
//! - Step versions start at 1 and grow by exactly one.
//! - `PRAGMA user_version` always equals the last step applied.
//! - A step either applies fully (schema and version bump) or not at all.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One schema step and the version it brings the database to.
#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    label: &'static str,
    sql: &'static str,
}

const STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        label: "accounts_projects",
        sql: include_str!("0001_accounts_projects.sql"),
    },
    SchemaStep {
        version: 2,
        label: "tasks",
        sql: include_str!("0002_tasks.sql"),
    },
    SchemaStep {
        version: 3,
        label: "wiki_notes_files",
        sql: include_str!("0003_wiki_notes_files.sql"),
    },
];

/// Schema version this build writes and expects.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Reads the schema version recorded in the database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings `conn` up to [`latest_version`].
///
/// Databases written by a newer build are refused untouched.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    for step in STEPS.iter().filter(|step| step.version > from) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        tx.commit()?;
        info!(
            "event=db_migrate module=db status=ok version={} step={}",
            step.version, step.label
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, STEPS};

    #[test]
    fn step_versions_are_contiguous() {
        for (index, step) in STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.label);
        }
        assert_eq!(latest_version() as usize, STEPS.len());
    }
}
