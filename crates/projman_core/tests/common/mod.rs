#![allow(dead_code)]

use projman_core::form::project_forms::CreateProjectForm;
use projman_core::{
    AccountRepository, Form, FormData, FormErrors, FormResult, Project, SqliteRepository, User,
    UserProfile,
};

/// Inserts a user directly; the hash is not a real PHC string.
pub fn seed_user(repo: &SqliteRepository<'_>, username: &str) -> User {
    let user = User::new(username, "unusable-hash");
    repo.create_account(&user, &UserProfile::for_user(&user))
        .unwrap();
    user
}

pub fn seed_project(repo: &SqliteRepository<'_>, owner: &User, shortname: &str) -> Project {
    CreateProjectForm::new(repo, owner)
        .submit(&form(&[
            ("shortname", shortname),
            ("name", "Seeded project"),
            ("start_date", "2024-01-01"),
        ]))
        .unwrap()
}

pub fn form(pairs: &[(&str, &str)]) -> FormData {
    FormData::from_pairs(pairs.iter().copied())
}

/// Unwraps the validation errors of a failed submission.
pub fn invalid<T: std::fmt::Debug>(result: FormResult<T>) -> FormErrors {
    match result {
        Err(projman_core::FormError::Invalid(errors)) => errors,
        other => panic!("expected validation failure, got {other:?}"),
    }
}

pub fn count_rows(conn: &rusqlite::Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
