//! Core domain logic for projman.
//! This crate is the single source of truth for project, task and wiki invariants.

pub mod db;
pub mod form;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use form::{FieldKind, FieldSpec, Form, FormData, FormError, FormErrors, FormResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::account::{User, UserId, UserProfile};
pub use model::project::{Group, InvitedUser, Project, ProjectId, SubscribedUser};
pub use model::project_content::{Notice, ProjectFile, ProjectLog, TodoList};
pub use model::task::{Task, TaskItem, VersionInfo};
pub use model::time_amount::{TimeAmount, TimeUnit};
pub use model::wiki::{WikiPage, WikiPageRevision};
pub use model::EntityValidationError;
pub use repo::account_repo::AccountRepository;
pub use repo::project_repo::ProjectRepository;
pub use repo::task_repo::{TaskRepository, TaskScope};
pub use repo::wiki_repo::WikiRepository;
pub use repo::{RepoError, RepoResult, SqliteRepository};
pub use service::account_service::{AccountService, AccountServiceError};
pub use service::invite_service::{InviteService, InviteServiceError};
