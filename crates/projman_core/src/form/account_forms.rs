//! Sign-up form.

use super::field::{required, FieldKind, FieldSpec};
use super::project_forms::{clean_new_shortname, IDENTIFIER_MESSAGE, SHORTNAME_TAKEN_MESSAGE};
use super::{check_with, conflict_as_field, record_log, Form, FormData, FormError, FormErrors, FormResult};
use crate::model::account::{User, UserProfile, USERNAME_MAX_LEN};
use crate::model::project::{Group, Project, SubscribedUser, SHORTNAME_MAX_LEN};
use crate::model::{is_identifier, today};
use crate::repo::account_repo::AccountRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::password::hash_password;
use serde::Serialize;

pub const USERNAME_TAKEN_MESSAGE: &str = "A user with that username already exists.";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "The two password fields didn't match.";

const PASSWORD_MAX_LEN: usize = 30;

const USERNAME: FieldSpec = FieldSpec::new(
    "username",
    FieldKind::Char {
        max_length: USERNAME_MAX_LEN,
    },
);
const PASSWORD1: FieldSpec = FieldSpec::new(
    "password1",
    FieldKind::Password {
        max_length: PASSWORD_MAX_LEN,
    },
);
const PASSWORD2: FieldSpec = FieldSpec::new(
    "password2",
    FieldKind::Password {
        max_length: PASSWORD_MAX_LEN,
    },
);
const PROJECT_NAME: FieldSpec = FieldSpec::new(
    "project_name",
    FieldKind::Char {
        max_length: SHORTNAME_MAX_LEN,
    },
)
.optional();
const USER_CREATION_FIELDS: [FieldSpec; 4] = [USERNAME, PASSWORD1, PASSWORD2, PROJECT_NAME];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedUser {
    pub username: String,
    pub password: String,
    pub project_name: Option<String>,
}

/// Result of a sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedAccount {
    pub user: User,
    pub profile: UserProfile,
    /// Starter project requested through `project_name`.
    pub project: Option<Project>,
}

/// Creates an unprivileged user, optionally with a starter project.
pub struct UserCreationForm<'a, R> {
    repo: &'a R,
}

impl<'a, R> UserCreationForm<'a, R>
where
    R: AccountRepository + ProjectRepository,
{
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    fn clean_username(&self, username: String) -> RepoResult<Result<String, String>> {
        if !is_identifier(&username) {
            return Ok(Err(IDENTIFIER_MESSAGE.to_string()));
        }
        if self.repo.find_user_by_username(&username)?.is_some() {
            return Ok(Err(USERNAME_TAKEN_MESSAGE.to_string()));
        }
        Ok(Ok(username))
    }

    /// Maps a clash on either unique column back onto the field that caused it.
    fn conflict_error(err: RepoError) -> FormError {
        if err.is_conflict_on("projects.shortname") {
            conflict_as_field(
                err,
                "projects.shortname",
                PROJECT_NAME.name,
                SHORTNAME_TAKEN_MESSAGE,
            )
        } else {
            conflict_as_field(err, "users.username", USERNAME.name, USERNAME_TAKEN_MESSAGE)
        }
    }
}

impl<R> Form for UserCreationForm<'_, R>
where
    R: AccountRepository + ProjectRepository,
{
    type Cleaned = CleanedUser;
    type Output = CreatedAccount;

    fn name(&self) -> &'static str {
        "user_creation"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &USER_CREATION_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<CleanedUser> {
        let mut errors = FormErrors::new();
        let username = errors.take(
            USERNAME.name,
            check_with(required(USERNAME.text(data)), |value| {
                self.clean_username(value)
            })?,
        );
        let password1 = errors.take(PASSWORD1.name, required(PASSWORD1.text(data)));
        let password2 = errors.take(PASSWORD2.name, required(PASSWORD2.text(data)));
        let project_name = match PROJECT_NAME.text(data) {
            Ok(Some(value)) => errors.take(
                PROJECT_NAME.name,
                clean_new_shortname(self.repo, value)?.map(Some),
            ),
            other => errors.take(PROJECT_NAME.name, other),
        };

        if PASSWORD1.raw(data) != PASSWORD2.raw(data) {
            errors.add_form(PASSWORD_MISMATCH_MESSAGE);
        }

        match (username, password1, password2, project_name) {
            (Some(username), Some(password), Some(_), Some(project_name))
                if errors.is_empty() =>
            {
                Ok(CleanedUser {
                    username,
                    password,
                    project_name,
                })
            }
            _ => Err(errors.into()),
        }
    }

    fn save(&self, cleaned: CleanedUser) -> FormResult<CreatedAccount> {
        let password_hash = hash_password(&cleaned.password)
            .map_err(|err| FormError::PasswordHash(err.to_string()))?;
        let user = User::new(cleaned.username, password_hash);
        let profile = UserProfile::for_user(&user);
        let starter = cleaned.project_name.map(|shortname| {
            let project = Project::new(shortname.clone(), shortname, user.uuid, today());
            let owner = SubscribedUser::new(user.uuid, project.uuid, Group::Owner);
            (project, owner)
        });

        self.repo
            .create_account_with_project(
                &user,
                &profile,
                starter.as_ref().map(|(project, owner)| (project, owner)),
            )
            .map_err(Self::conflict_error)?;

        let project = starter.map(|(project, _)| project);
        if let Some(project) = &project {
            record_log(
                self.repo,
                project.uuid,
                format!("Project {} created by {}", project.shortname, user.username),
            )?;
        }
        Ok(CreatedAccount {
            user,
            profile,
            project,
        })
    }
}
