//! Account lookup and authentication.

use crate::model::account::User;
use crate::repo::account_repo::AccountRepository;
use crate::repo::RepoError;
use crate::service::password::verify_password;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for account use-cases.
#[derive(Debug)]
pub enum AccountServiceError {
    /// No user has the requested username.
    UnknownUser(String),
    /// Stored hash could not be parsed.
    PasswordHash(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for AccountServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUser(username) => write!(f, "unknown user: `{username}`"),
            Self::PasswordHash(message) => write!(f, "stored password hash is invalid: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccountServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AccountServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Account service facade over repository implementations.
pub struct AccountService<R: AccountRepository> {
    repo: R,
}

impl<R: AccountRepository> AccountService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Resolves a username into its user record.
    pub fn user_by_username(&self, username: &str) -> Result<User, AccountServiceError> {
        self.repo
            .find_user_by_username(username)?
            .ok_or_else(|| AccountServiceError::UnknownUser(username.to_string()))
    }

    /// Returns the user when `password` matches, `None` otherwise.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to callers.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AccountServiceError> {
        let Some(user) = self.repo.find_user_by_username(username)? else {
            info!("event=authenticate module=service status=rejected reason=unknown_user");
            return Ok(None);
        };
        let matches = verify_password(password, &user.password_hash).map_err(|err| {
            warn!(
                "event=authenticate module=service status=error user={}",
                user.uuid
            );
            AccountServiceError::PasswordHash(err.to_string())
        })?;
        if matches {
            info!("event=authenticate module=service status=ok user={}", user.uuid);
            Ok(Some(user))
        } else {
            info!(
                "event=authenticate module=service status=rejected reason=password user={}",
                user.uuid
            );
            Ok(None)
        }
    }
}
