mod common;

use common::{count_rows, form, invalid, seed_project, seed_user};
use projman_core::db::open_db_in_memory;
use projman_core::form::account_forms::{
    UserCreationForm, PASSWORD_MISMATCH_MESSAGE, USERNAME_TAKEN_MESSAGE,
};
use projman_core::form::project_forms::{IDENTIFIER_MESSAGE, SHORTNAME_TAKEN_MESSAGE};
use projman_core::{
    AccountRepository, AccountService, Form, ProjectRepository, SqliteRepository,
};

#[test]
fn mismatched_passwords_are_a_form_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();

    let errors = invalid(UserCreationForm::new(&repo).submit(&form(&[
        ("username", "alice"),
        ("password1", "correct horse"),
        ("password2", "correct horse "),
    ])));

    assert_eq!(errors.form_errors(), [PASSWORD_MISMATCH_MESSAGE.to_string()]);
    assert_eq!(count_rows(&conn, "users"), 0);
}

#[test]
fn signup_creates_exactly_one_user_and_profile() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();

    let created = UserCreationForm::new(&repo)
        .submit(&form(&[
            ("username", "alice"),
            ("password1", "s3cret"),
            ("password2", "s3cret"),
        ]))
        .unwrap();

    assert_eq!(created.user.username, "alice");
    assert!(created.user.password_hash.starts_with("$argon2"));
    assert_eq!(created.profile.user_uuid, created.user.uuid);
    assert!(created.project.is_none());
    assert_eq!(count_rows(&conn, "users"), 1);
    assert_eq!(count_rows(&conn, "user_profiles"), 1);
    assert_eq!(count_rows(&conn, "projects"), 0);
    assert_eq!(
        repo.get_profile(created.user.uuid).unwrap(),
        Some(created.profile)
    );
}

#[test]
fn signup_rejects_taken_or_invalid_usernames() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    seed_user(&repo, "alice");
    let signup = UserCreationForm::new(&repo);

    let errors = invalid(signup.submit(&form(&[
        ("username", "alice"),
        ("password1", "pw"),
        ("password2", "pw"),
    ])));
    assert_eq!(errors.field("username"), [USERNAME_TAKEN_MESSAGE.to_string()]);

    let errors = invalid(signup.submit(&form(&[
        ("username", "bad name"),
        ("password1", "pw"),
        ("password2", "other"),
    ])));
    assert_eq!(errors.field("username"), [IDENTIFIER_MESSAGE.to_string()]);
    assert_eq!(errors.form_errors(), [PASSWORD_MISMATCH_MESSAGE.to_string()]);

    let errors = invalid(signup.submit(&form(&[])));
    for field in ["username", "password1", "password2"] {
        assert_eq!(errors.field(field), ["This field is required.".to_string()]);
    }
    assert!(!errors.has_field("project_name"));
    assert_eq!(count_rows(&conn, "users"), 1);
}

#[test]
fn project_name_creates_an_owned_starter_project() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();

    let created = UserCreationForm::new(&repo)
        .submit(&form(&[
            ("username", "alice"),
            ("password1", "pw"),
            ("password2", "pw"),
            ("project_name", "apollo"),
        ]))
        .unwrap();

    let project = created.project.unwrap();
    assert_eq!(project.shortname, "apollo");
    assert_eq!(project.owner_uuid, created.user.uuid);
    assert_eq!(
        repo.find_project_by_shortname("apollo").unwrap(),
        Some(project.clone())
    );
    let subscribers = repo.list_subscribers(project.uuid).unwrap();
    assert_eq!(subscribers, vec![created.user]);

    let errors = invalid(UserCreationForm::new(&repo).submit(&form(&[
        ("username", "bob"),
        ("password1", "pw"),
        ("password2", "pw"),
        ("project_name", "apollo"),
    ])));
    assert_eq!(errors.field("project_name"), [SHORTNAME_TAKEN_MESSAGE.to_string()]);
}

#[test]
fn signed_up_user_can_authenticate() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let created = UserCreationForm::new(&repo)
        .submit(&form(&[
            ("username", "alice"),
            ("password1", "s3cret"),
            ("password2", "s3cret"),
        ]))
        .unwrap();

    let accounts = AccountService::new(SqliteRepository::try_new(&conn).unwrap());
    assert_eq!(
        accounts.authenticate("alice", "s3cret").unwrap(),
        Some(created.user.clone())
    );
    assert_eq!(accounts.authenticate("alice", "wrong").unwrap(), None);
    assert_eq!(accounts.authenticate("nobody", "s3cret").unwrap(), None);
    assert_eq!(accounts.user_by_username("alice").unwrap(), created.user);
    assert!(accounts.user_by_username("nobody").is_err());
}

#[test]
fn username_taken_after_clean_is_a_field_error_on_save() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let signup = UserCreationForm::new(&repo);

    let cleaned = signup
        .clean(&form(&[
            ("username", "alice"),
            ("password1", "pw"),
            ("password2", "pw"),
            ("project_name", "apollo"),
        ]))
        .unwrap();
    seed_user(&repo, "alice");

    let errors = invalid(signup.save(cleaned));
    assert_eq!(errors.field("username"), [USERNAME_TAKEN_MESSAGE.to_string()]);
    assert!(!errors.has_field("project_name"));
    assert_eq!(count_rows(&conn, "users"), 1);
    assert_eq!(count_rows(&conn, "user_profiles"), 1);
    assert_eq!(count_rows(&conn, "projects"), 0);
}

#[test]
fn starter_project_clash_on_save_rolls_back_the_account() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let signup = UserCreationForm::new(&repo);
    let data = form(&[
        ("username", "alice"),
        ("password1", "pw"),
        ("password2", "pw"),
        ("project_name", "apollo"),
    ]);

    let cleaned = signup.clean(&data).unwrap();
    let bob = seed_user(&repo, "bob");
    seed_project(&repo, &bob, "apollo");
    let users_before = count_rows(&conn, "users");

    let errors = invalid(signup.save(cleaned));
    assert_eq!(errors.field("project_name"), [SHORTNAME_TAKEN_MESSAGE.to_string()]);
    assert!(!errors.has_field("username"));
    assert_eq!(count_rows(&conn, "users"), users_before);
    assert_eq!(count_rows(&conn, "user_profiles"), users_before);
    assert_eq!(count_rows(&conn, "projects"), 1);
    assert_eq!(count_rows(&conn, "subscribed_users"), 1);
    assert!(repo.find_user_by_username("alice").unwrap().is_none());

    let created = signup
        .submit(&form(&[
            ("username", "alice"),
            ("password1", "pw"),
            ("password2", "pw"),
            ("project_name", "apollo2"),
        ]))
        .unwrap();
    let project = created.project.unwrap();
    assert_eq!(project.shortname, "apollo2");
    assert_eq!(
        repo.list_subscribers(project.uuid).unwrap(),
        vec![created.user]
    );
}
