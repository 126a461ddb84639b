//! Project creation, invitations and simple project content forms.

use super::field::{required, FieldKind, FieldSpec};
use super::{check_with, conflict_as_field, record_log, Form, FormData, FormErrors, FormResult};
use crate::model::account::{User, USERNAME_MAX_LEN};
use crate::model::project::{
    Group, InvitedUser, Project, SubscribedUser, PROJECT_NAME_MAX_LEN, SHORTNAME_MAX_LEN,
};
use crate::model::project_content::{
    upload_basename, Notice, ProjectFile, TodoList, TODO_LIST_NAME_MAX_LEN,
};
use crate::model::{is_identifier, today};
use crate::repo::account_repo::AccountRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::RepoResult;
use chrono::NaiveDate;

pub const IDENTIFIER_MESSAGE: &str =
    "This value must contain only letters, numbers and underscores.";
pub const SHORTNAME_TAKEN_MESSAGE: &str =
    "This project name is already taken. Please try another.";
pub const DATE_ORDER_MESSAGE: &str = "Start date can not be greater than end date";
pub const UNKNOWN_USER_MESSAGE: &str = "There is no user with that name";
pub const UNKNOWN_GROUP_MESSAGE: &str = "No such group";
pub const ALREADY_INVITED_MESSAGE: &str = "This user is already invited. The invite is pending.";
pub const EMPTY_FILE_NAME_MESSAGE: &str = "The submitted file name is empty.";
pub const ALREADY_SUBSCRIBED_MESSAGE: &str = "This user is already subscribed to the project.";

/// Checks a prospective project shortname for format and availability.
pub(crate) fn clean_new_shortname<R: ProjectRepository>(
    repo: &R,
    value: String,
) -> RepoResult<Result<String, String>> {
    if !is_identifier(&value) {
        return Ok(Err(IDENTIFIER_MESSAGE.to_string()));
    }
    if repo.find_project_by_shortname(&value)?.is_some() {
        return Ok(Err(SHORTNAME_TAKEN_MESSAGE.to_string()));
    }
    Ok(Ok(value))
}

/// Creates a project and hands ownership to its creator.
pub struct CreateProjectForm<'a, R> {
    repo: &'a R,
    user: &'a User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedProject {
    pub shortname: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

const SHORTNAME: FieldSpec = FieldSpec::new(
    "shortname",
    FieldKind::Char {
        max_length: SHORTNAME_MAX_LEN,
    },
)
.with_help("Shortname for your project. Determines URL. Can not contain spaces or special characters.");
const PROJECT_NAME: FieldSpec = FieldSpec::new(
    "name",
    FieldKind::Char {
        max_length: PROJECT_NAME_MAX_LEN,
    },
)
.with_help("Name of the project.");
const PROJECT_START: FieldSpec = FieldSpec::new("start_date", FieldKind::Date);
const PROJECT_END: FieldSpec = FieldSpec::new("end_date", FieldKind::Date).optional();
const CREATE_PROJECT_FIELDS: [FieldSpec; 4] =
    [SHORTNAME, PROJECT_NAME, PROJECT_START, PROJECT_END];

impl<'a, R: ProjectRepository> CreateProjectForm<'a, R> {
    pub fn new(repo: &'a R, user: &'a User) -> Self {
        Self { repo, user }
    }
}

impl<R: ProjectRepository> Form for CreateProjectForm<'_, R> {
    type Cleaned = CleanedProject;
    type Output = Project;

    fn name(&self) -> &'static str {
        "create_project"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &CREATE_PROJECT_FIELDS
    }

    fn initial(&self) -> FormData {
        FormData::from_pairs([(PROJECT_START.name, today().to_string())])
    }

    fn clean(&self, data: &FormData) -> FormResult<CleanedProject> {
        let mut errors = FormErrors::new();
        let shortname = errors.take(
            SHORTNAME.name,
            check_with(required(SHORTNAME.text(data)), |value| {
                clean_new_shortname(self.repo, value)
            })?,
        );
        let name = errors.take(PROJECT_NAME.name, required(PROJECT_NAME.text(data)));
        let start_date = errors.take(PROJECT_START.name, required(PROJECT_START.date(data)));
        let end_date = errors.take(PROJECT_END.name, PROJECT_END.date(data));

        if let (Some(start), Some(Some(end))) = (start_date, end_date) {
            if end < start {
                errors.add_form(DATE_ORDER_MESSAGE);
            }
        }

        match (shortname, name, start_date, end_date) {
            (Some(shortname), Some(name), Some(start_date), Some(end_date))
                if errors.is_empty() =>
            {
                Ok(CleanedProject {
                    shortname,
                    name,
                    start_date,
                    end_date,
                })
            }
            _ => Err(errors.into()),
        }
    }

    fn save(&self, cleaned: CleanedProject) -> FormResult<Project> {
        let mut project = Project::new(
            cleaned.shortname,
            cleaned.name,
            self.user.uuid,
            cleaned.start_date,
        );
        project.end_date = cleaned.end_date;
        let owner = SubscribedUser::new(self.user.uuid, project.uuid, Group::Owner);

        self.repo
            .create_project(&project, &owner)
            .map_err(|err| {
                conflict_as_field(err, "projects.shortname", SHORTNAME.name, SHORTNAME_TAKEN_MESSAGE)
            })?;
        record_log(
            self.repo,
            project.uuid,
            format!("Project {} created by {}", project.shortname, self.user.username),
        )?;
        Ok(project)
    }
}

/// Invites an existing user into a project with a membership group.
pub struct InviteUserForm<'a, R> {
    repo: &'a R,
    project: &'a Project,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedInvite {
    pub user: User,
    pub group: Group,
}

const INVITE_USERNAME: FieldSpec = FieldSpec::new(
    "username",
    FieldKind::Char {
        max_length: USERNAME_MAX_LEN,
    },
)
.with_help("User name of the user to invite.");
const INVITE_GROUP: FieldSpec = FieldSpec::new("group", FieldKind::Choice)
    .with_help("Permissions available to this user.");
const INVITE_FIELDS: [FieldSpec; 2] = [INVITE_USERNAME, INVITE_GROUP];

impl<'a, R> InviteUserForm<'a, R>
where
    R: AccountRepository + ProjectRepository,
{
    pub fn new(repo: &'a R, project: &'a Project) -> Self {
        Self { repo, project }
    }

    fn clean_username(&self, username: String) -> RepoResult<Result<User, String>> {
        let Some(user) = self.repo.find_user_by_username(&username)? else {
            return Ok(Err(UNKNOWN_USER_MESSAGE.to_string()));
        };
        if self
            .repo
            .find_pending_invite(self.project.uuid, user.uuid)?
            .is_some()
        {
            return Ok(Err(ALREADY_INVITED_MESSAGE.to_string()));
        }
        if self
            .repo
            .find_subscription(self.project.uuid, user.uuid)?
            .is_some()
        {
            return Ok(Err(ALREADY_SUBSCRIBED_MESSAGE.to_string()));
        }
        Ok(Ok(user))
    }
}

impl<R> Form for InviteUserForm<'_, R>
where
    R: AccountRepository + ProjectRepository,
{
    type Cleaned = CleanedInvite;
    type Output = InvitedUser;

    fn name(&self) -> &'static str {
        "invite_user"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &INVITE_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<CleanedInvite> {
        let mut errors = FormErrors::new();
        let username = required(INVITE_USERNAME.text(data));
        let user = match username {
            Ok(username) => errors.take(INVITE_USERNAME.name, self.clean_username(username)?),
            Err(message) => errors.take(INVITE_USERNAME.name, Err(message)),
        };
        let group = errors.take(
            INVITE_GROUP.name,
            required(INVITE_GROUP.text(data)).and_then(|value| {
                Group::from_label(&value).ok_or_else(|| UNKNOWN_GROUP_MESSAGE.to_string())
            }),
        );

        match (user, group) {
            (Some(user), Some(group)) if errors.is_empty() => Ok(CleanedInvite { user, group }),
            _ => Err(errors.into()),
        }
    }

    fn save(&self, cleaned: CleanedInvite) -> FormResult<InvitedUser> {
        let invite = InvitedUser::new(cleaned.user.uuid, self.project.uuid, cleaned.group);
        self.repo.create_invite(&invite).map_err(|err| {
            conflict_as_field(
                err,
                "invited_users.user_uuid",
                INVITE_USERNAME.name,
                ALREADY_INVITED_MESSAGE,
            )
        })?;
        record_log(
            self.repo,
            self.project.uuid,
            format!(
                "{} invited as {}",
                cleaned.user.username,
                cleaned.group.label()
            ),
        )?;
        Ok(invite)
    }
}

/// Posts a notice on the project board.
pub struct AddNoticeForm<'a, R> {
    repo: &'a R,
    project: &'a Project,
    user: &'a User,
}

const NOTICE_TEXT: FieldSpec = FieldSpec::new("text", FieldKind::Text);
const NOTICE_FIELDS: [FieldSpec; 1] = [NOTICE_TEXT];

impl<'a, R: ProjectRepository> AddNoticeForm<'a, R> {
    pub fn new(repo: &'a R, project: &'a Project, user: &'a User) -> Self {
        Self {
            repo,
            project,
            user,
        }
    }
}

impl<R: ProjectRepository> Form for AddNoticeForm<'_, R> {
    type Cleaned = String;
    type Output = Notice;

    fn name(&self) -> &'static str {
        "add_notice"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &NOTICE_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<String> {
        required(NOTICE_TEXT.text(data))
            .map_err(|message| FormErrors::for_field(NOTICE_TEXT.name, message).into())
    }

    fn save(&self, text: String) -> FormResult<Notice> {
        let mut notice = Notice::new(self.project.uuid, self.user.uuid, text);
        notice.number = self.repo.create_notice(&notice)?;
        record_log(
            self.repo,
            self.project.uuid,
            format!("Notice #{} posted by {}", notice.number, self.user.username),
        )?;
        Ok(notice)
    }
}

/// Creates a todo list owned by the submitting user.
pub struct AddTodoListForm<'a, R> {
    repo: &'a R,
    project: &'a Project,
    user: &'a User,
}

const TODO_LIST_NAME: FieldSpec = FieldSpec::new(
    "name",
    FieldKind::Char {
        max_length: TODO_LIST_NAME_MAX_LEN,
    },
)
.with_help("Name of your todo list.");
const TODO_LIST_FIELDS: [FieldSpec; 1] = [TODO_LIST_NAME];

impl<'a, R: ProjectRepository> AddTodoListForm<'a, R> {
    pub fn new(repo: &'a R, project: &'a Project, user: &'a User) -> Self {
        Self {
            repo,
            project,
            user,
        }
    }
}

impl<R: ProjectRepository> Form for AddTodoListForm<'_, R> {
    type Cleaned = String;
    type Output = TodoList;

    fn name(&self) -> &'static str {
        "add_todo_list"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &TODO_LIST_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<String> {
        required(TODO_LIST_NAME.text(data))
            .map_err(|message| FormErrors::for_field(TODO_LIST_NAME.name, message).into())
    }

    fn save(&self, name: String) -> FormResult<TodoList> {
        let list = TodoList::new(self.project.uuid, self.user.uuid, name);
        self.repo.create_todo_list(&list)?;
        record_log(
            self.repo,
            self.project.uuid,
            format!("Todo list {} added by {}", list.name, self.user.username),
        )?;
        Ok(list)
    }
}

/// Records an uploaded file. The bytes are stored by the caller.
pub struct AddFileForm<'a, R> {
    repo: &'a R,
    project: &'a Project,
}

const FILE_NAME: FieldSpec = FieldSpec::new("filename", FieldKind::File);
const FILE_FIELDS: [FieldSpec; 1] = [FILE_NAME];

impl<'a, R: ProjectRepository> AddFileForm<'a, R> {
    pub fn new(repo: &'a R, project: &'a Project) -> Self {
        Self { repo, project }
    }
}

impl<R: ProjectRepository> Form for AddFileForm<'_, R> {
    type Cleaned = String;
    type Output = ProjectFile;

    fn name(&self) -> &'static str {
        "add_file"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &FILE_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<String> {
        required(FILE_NAME.text(data))
            .and_then(|filename| {
                if upload_basename(&filename).is_empty() {
                    Err(EMPTY_FILE_NAME_MESSAGE.to_string())
                } else {
                    Ok(filename)
                }
            })
            .map_err(|message| FormErrors::for_field(FILE_NAME.name, message).into())
    }

    fn save(&self, filename: String) -> FormResult<ProjectFile> {
        let file = ProjectFile::new(self.project.uuid, &filename);
        self.repo.create_file(&file)?;
        record_log(
            self.repo,
            self.project.uuid,
            format!("File {} uploaded", file.file_name()),
        )?;
        Ok(file)
    }
}
