//! Invite answering use-cases.
//!
//! # Invariants
//! - Only the invited user can answer an invite.
//! - An invite is answered at most once.
//! - Accepting creates the subscription and its log entry in the same
//!   transaction that consumes the invite.

use crate::model::account::User;
use crate::model::project::{InvitedUser, SubscribedUser};
use crate::model::project_content::ProjectLog;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for invite use-cases.
#[derive(Debug)]
pub enum InviteServiceError {
    InviteNotFound(Uuid),
    /// The invite belongs to another user.
    NotAddressedToUser(Uuid),
    /// The invite was already accepted or rejected.
    AlreadyAnswered(Uuid),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for InviteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InviteNotFound(id) => write!(f, "invite not found: {id}"),
            Self::NotAddressedToUser(id) => write!(f, "invite {id} is addressed to another user"),
            Self::AlreadyAnswered(id) => write!(f, "invite {id} was already answered"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for InviteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for InviteServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Invite service facade over repository implementations.
pub struct InviteService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> InviteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Invites still waiting for an answer from `user`.
    pub fn pending_invites(&self, user: &User) -> Result<Vec<InvitedUser>, InviteServiceError> {
        Ok(self.repo.list_pending_invites_for_user(user.uuid)?)
    }

    /// Accepts an invite and subscribes `user` with the invited group.
    pub fn accept(
        &self,
        invite_id: Uuid,
        user: &User,
    ) -> Result<SubscribedUser, InviteServiceError> {
        let invite = self.pending_invite(invite_id, user)?;
        let log = ProjectLog::new(
            invite.project_uuid,
            format!("{} joined as {}", user.username, invite.group.label()),
        );
        let subscription = self.repo.accept_invite(invite.uuid, &log)?;
        info!(
            "event=invite_accept module=service status=ok invite={} project={}",
            invite.uuid, invite.project_uuid
        );
        Ok(subscription)
    }

    /// Declines an invite. The row is kept with `rejected` set.
    pub fn reject(&self, invite_id: Uuid, user: &User) -> Result<InvitedUser, InviteServiceError> {
        let mut invite = self.pending_invite(invite_id, user)?;
        self.repo.reject_invite(invite.uuid)?;
        invite.rejected = true;
        info!(
            "event=invite_reject module=service status=ok invite={} project={}",
            invite.uuid, invite.project_uuid
        );
        Ok(invite)
    }

    fn pending_invite(
        &self,
        invite_id: Uuid,
        user: &User,
    ) -> Result<InvitedUser, InviteServiceError> {
        let invite = self
            .repo
            .get_invite(invite_id)?
            .ok_or(InviteServiceError::InviteNotFound(invite_id))?;
        if invite.user_uuid != user.uuid {
            return Err(InviteServiceError::NotAddressedToUser(invite_id));
        }
        if !invite.is_pending() {
            return Err(InviteServiceError::AlreadyAnswered(invite_id));
        }
        Ok(invite)
    }
}
