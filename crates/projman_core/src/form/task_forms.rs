//! Task creation and editing forms.
//!
//! # Invariants
//! - `user_responsible` only accepts `None` or a username subscribed to the
//!   project at the time the form was built.
//! - Edits never mutate the stored row; they append a new version.

use super::field::{required, FieldKind, FieldSpec};
use super::project_forms::DATE_ORDER_MESSAGE;
use super::{record_log, Form, FormData, FormErrors, FormResult};
use crate::model::account::{User, UserId};
use crate::model::note::TaskNote;
use crate::model::project::Project;
use crate::model::task::{Task, TASK_NAME_MAX_LEN};
use crate::repo::project_repo::ProjectRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoResult;
use chrono::NaiveDate;

pub const NO_USER_CHOICE: &str = "None";
pub const ACTUAL_DATE_ORDER_MESSAGE: &str =
    "Actual start date can not be greater than actual end date";

const TASK_NAME: FieldSpec = FieldSpec::new(
    "name",
    FieldKind::Char {
        max_length: TASK_NAME_MAX_LEN,
    },
)
.with_help("Name of the task");
const TASK_START: FieldSpec =
    FieldSpec::new("start_date", FieldKind::Date).with_help("When will this task start?");
const TASK_END: FieldSpec = FieldSpec::new("end_date", FieldKind::Date)
    .optional()
    .with_help("When will this task end?");
const TASK_RESPONSIBLE: FieldSpec = FieldSpec::new("user_responsible", FieldKind::Choice)
    .with_help("Who is responsible for this task?");
const ACTUAL_START: FieldSpec = FieldSpec::new("actual_start_date", FieldKind::Date)
    .optional()
    .with_help("When did this task start?");
const ACTUAL_END: FieldSpec = FieldSpec::new("actual_end_date", FieldKind::Date)
    .optional()
    .with_help("When did this task end?");
const IS_COMPLETE: FieldSpec = FieldSpec::new("is_complete", FieldKind::Boolean)
    .optional()
    .with_help("Is this task complete?");
const NOTE_TEXT: FieldSpec =
    FieldSpec::new("text", FieldKind::Text).with_help("Add a note to this task");

const CREATE_TASK_FIELDS: [FieldSpec; 4] = [TASK_NAME, TASK_START, TASK_END, TASK_RESPONSIBLE];
const EDIT_TASK_FIELDS: [FieldSpec; 7] = [
    TASK_NAME,
    TASK_START,
    TASK_END,
    TASK_RESPONSIBLE,
    ACTUAL_START,
    ACTUAL_END,
    IS_COMPLETE,
];
const TASK_NOTE_FIELDS: [FieldSpec; 1] = [NOTE_TEXT];

/// "None" followed by the usernames of `subscribers`.
pub fn user_choices(subscribers: &[User]) -> Vec<&str> {
    std::iter::once(NO_USER_CHOICE)
        .chain(subscribers.iter().map(|user| user.username.as_str()))
        .collect()
}

/// Resolves a cleaned user choice against the subscriber list.
pub(crate) fn chosen_user(subscribers: &[User], choice: &str) -> Option<UserId> {
    subscribers
        .iter()
        .find(|user| user.username == choice)
        .map(|user| user.uuid)
}

pub(crate) fn choice_for_user(subscribers: &[User], user: Option<UserId>) -> String {
    user.and_then(|id| subscribers.iter().find(|candidate| candidate.uuid == id))
        .map(|candidate| candidate.username.clone())
        .unwrap_or_else(|| NO_USER_CHOICE.to_string())
}

/// Cleaned values of the fields every task form shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedTaskFields {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub user_responsible: Option<UserId>,
}

/// Fields and rules shared by task create/edit forms.
pub struct TaskFieldSet<'a, R> {
    repo: &'a R,
    project: &'a Project,
    subscribers: Vec<User>,
}

impl<'a, R> TaskFieldSet<'a, R>
where
    R: ProjectRepository + TaskRepository,
{
    /// Loads the responsible-user choices of `project`.
    pub fn new(repo: &'a R, project: &'a Project) -> RepoResult<Self> {
        Ok(Self {
            repo,
            project,
            subscribers: repo.list_subscribers(project.uuid)?,
        })
    }

    pub fn responsible_choices(&self) -> Vec<&str> {
        user_choices(&self.subscribers)
    }

    /// Cleans the shared fields, recording problems into `errors`.
    pub fn clean(&self, data: &FormData, errors: &mut FormErrors) -> Option<CleanedTaskFields> {
        let name = errors.take(TASK_NAME.name, required(TASK_NAME.text(data)));
        let start_date = errors.take(TASK_START.name, required(TASK_START.date(data)));
        let end_date = errors.take(TASK_END.name, TASK_END.date(data));
        let choices = self.responsible_choices();
        let responsible = errors.take(
            TASK_RESPONSIBLE.name,
            required(TASK_RESPONSIBLE.choice(data, &choices)),
        );

        if let (Some(start), Some(Some(end))) = (start_date, end_date) {
            if start > end {
                errors.add_form(DATE_ORDER_MESSAGE);
            }
        }

        Some(CleanedTaskFields {
            name: name?,
            start_date: start_date?,
            end_date: end_date?,
            user_responsible: chosen_user(&self.subscribers, &responsible?),
        })
    }

    /// Builds an unsaved task from cleaned values.
    pub fn build(&self, cleaned: CleanedTaskFields, created_by: &User) -> Task {
        let mut task = Task::new(
            self.project.uuid,
            cleaned.name,
            cleaned.start_date,
            created_by.uuid,
        );
        task.expected_end_date = cleaned.end_date;
        task.user_responsible = cleaned.user_responsible;
        task
    }

    fn insert(&self, mut task: Task, user: &User) -> FormResult<Task> {
        task.number = self.repo.create_task(&task)?;
        let kind = if task.is_subtask() { "Subtask" } else { "Task" };
        record_log(
            self.repo,
            self.project.uuid,
            format!("{kind} #{} {} created by {}", task.number, task.name, user.username),
        )?;
        Ok(task)
    }
}

fn finish(
    cleaned: Option<CleanedTaskFields>,
    errors: FormErrors,
) -> FormResult<CleanedTaskFields> {
    match cleaned {
        Some(cleaned) if errors.is_empty() => Ok(cleaned),
        _ => Err(errors.into()),
    }
}

/// Creates a top-level task.
pub struct CreateTaskForm<'a, R> {
    fieldset: TaskFieldSet<'a, R>,
    user: &'a User,
}

impl<'a, R> CreateTaskForm<'a, R>
where
    R: ProjectRepository + TaskRepository,
{
    pub fn new(repo: &'a R, project: &'a Project, user: &'a User) -> RepoResult<Self> {
        Ok(Self {
            fieldset: TaskFieldSet::new(repo, project)?,
            user,
        })
    }

    pub fn responsible_choices(&self) -> Vec<&str> {
        self.fieldset.responsible_choices()
    }
}

impl<R> Form for CreateTaskForm<'_, R>
where
    R: ProjectRepository + TaskRepository,
{
    type Cleaned = CleanedTaskFields;
    type Output = Task;

    fn name(&self) -> &'static str {
        "create_task"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &CREATE_TASK_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<CleanedTaskFields> {
        let mut errors = FormErrors::new();
        let cleaned = self.fieldset.clean(data, &mut errors);
        finish(cleaned, errors)
    }

    fn save(&self, cleaned: CleanedTaskFields) -> FormResult<Task> {
        let task = self.fieldset.build(cleaned, self.user);
        self.fieldset.insert(task, self.user)
    }
}

/// Creates a subtask under an existing task.
pub struct CreateSubTaskForm<'a, R> {
    fieldset: TaskFieldSet<'a, R>,
    user: &'a User,
    parent: &'a Task,
}

impl<'a, R> CreateSubTaskForm<'a, R>
where
    R: ProjectRepository + TaskRepository,
{
    pub fn new(
        repo: &'a R,
        project: &'a Project,
        user: &'a User,
        parent: &'a Task,
    ) -> RepoResult<Self> {
        Ok(Self {
            fieldset: TaskFieldSet::new(repo, project)?,
            user,
            parent,
        })
    }
}

impl<R> Form for CreateSubTaskForm<'_, R>
where
    R: ProjectRepository + TaskRepository,
{
    type Cleaned = CleanedTaskFields;
    type Output = Task;

    fn name(&self) -> &'static str {
        "create_subtask"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &CREATE_TASK_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<CleanedTaskFields> {
        let mut errors = FormErrors::new();
        let cleaned = self.fieldset.clean(data, &mut errors);
        finish(cleaned, errors)
    }

    fn save(&self, cleaned: CleanedTaskFields) -> FormResult<Task> {
        let mut task = self.fieldset.build(cleaned, self.user);
        task.parent_task_num = Some(self.parent.number);
        self.fieldset.insert(task, self.user)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedTaskEdit {
    pub fields: CleanedTaskFields,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub is_complete: bool,
}

/// Edits a task by appending a new version.
pub struct EditTaskForm<'a, R> {
    fieldset: TaskFieldSet<'a, R>,
    user: &'a User,
    task: &'a Task,
}

impl<'a, R> EditTaskForm<'a, R>
where
    R: ProjectRepository + TaskRepository,
{
    pub fn new(
        repo: &'a R,
        project: &'a Project,
        user: &'a User,
        task: &'a Task,
    ) -> RepoResult<Self> {
        Ok(Self {
            fieldset: TaskFieldSet::new(repo, project)?,
            user,
            task,
        })
    }
}

impl<R> Form for EditTaskForm<'_, R>
where
    R: ProjectRepository + TaskRepository,
{
    type Cleaned = CleanedTaskEdit;
    type Output = Task;

    fn name(&self) -> &'static str {
        "edit_task"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &EDIT_TASK_FIELDS
    }

    fn initial(&self) -> FormData {
        let task = self.task;
        let mut data = FormData::new();
        data.insert(TASK_NAME.name, task.name.as_str());
        data.insert(TASK_START.name, task.expected_start_date.to_string());
        if let Some(end) = task.expected_end_date {
            data.insert(TASK_END.name, end.to_string());
        }
        if let Some(start) = task.actual_start_date {
            data.insert(ACTUAL_START.name, start.to_string());
        }
        if let Some(end) = task.actual_end_date {
            data.insert(ACTUAL_END.name, end.to_string());
        }
        data.insert(
            TASK_RESPONSIBLE.name,
            choice_for_user(&self.fieldset.subscribers, task.user_responsible),
        );
        data.insert(IS_COMPLETE.name, task.is_complete.to_string());
        data
    }

    fn clean(&self, data: &FormData) -> FormResult<CleanedTaskEdit> {
        let mut errors = FormErrors::new();
        let fields = self.fieldset.clean(data, &mut errors);
        let actual_start = errors.take(ACTUAL_START.name, ACTUAL_START.date(data));
        let actual_end = errors.take(ACTUAL_END.name, ACTUAL_END.date(data));
        let is_complete = IS_COMPLETE.flag(data);

        // Unsubmitted end dates keep their stored value, so check against that.
        if let Some(fields) = &fields {
            if fields.end_date.is_none()
                && matches!(self.task.expected_end_date, Some(end) if fields.start_date > end)
            {
                errors.add_form(DATE_ORDER_MESSAGE);
            }
        }
        if let (Some(start), Some(end)) = (actual_start, actual_end) {
            let start = start.or(self.task.actual_start_date);
            let end = end.or(self.task.actual_end_date);
            if let (Some(start), Some(end)) = (start, end) {
                if start > end {
                    errors.add_form(ACTUAL_DATE_ORDER_MESSAGE);
                }
            }
        }

        match (fields, actual_start, actual_end) {
            (Some(fields), Some(actual_start_date), Some(actual_end_date))
                if errors.is_empty() =>
            {
                Ok(CleanedTaskEdit {
                    fields,
                    actual_start_date,
                    actual_end_date,
                    is_complete,
                })
            }
            _ => Err(errors.into()),
        }
    }

    fn save(&self, cleaned: CleanedTaskEdit) -> FormResult<Task> {
        let mut task = self.task.clone();
        task.name = cleaned.fields.name;
        task.expected_start_date = cleaned.fields.start_date;
        task.user_responsible = cleaned.fields.user_responsible;
        if let Some(end) = cleaned.fields.end_date {
            task.expected_end_date = Some(end);
        }
        if let Some(start) = cleaned.actual_start_date {
            task.actual_start_date = Some(start);
        }
        if let Some(end) = cleaned.actual_end_date {
            task.actual_end_date = Some(end);
        }
        task.is_complete = cleaned.is_complete;
        task.updated_by = self.user.uuid;

        let saved = self.fieldset.repo.save_task_version(&task)?;
        record_log(
            self.fieldset.repo,
            saved.project_uuid,
            format!(
                "Task #{} updated to version {} by {}",
                saved.number, saved.version.version_number, self.user.username
            ),
        )?;
        Ok(saved)
    }
}

/// Attaches a note to a task by its logical number.
pub struct AddTaskNoteForm<'a, R> {
    repo: &'a R,
    task: &'a Task,
    user: &'a User,
}

impl<'a, R> AddTaskNoteForm<'a, R>
where
    R: ProjectRepository + TaskRepository,
{
    pub fn new(repo: &'a R, task: &'a Task, user: &'a User) -> Self {
        Self { repo, task, user }
    }
}

impl<R> Form for AddTaskNoteForm<'_, R>
where
    R: ProjectRepository + TaskRepository,
{
    type Cleaned = String;
    type Output = TaskNote;

    fn name(&self) -> &'static str {
        "add_task_note"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &TASK_NOTE_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<String> {
        required(NOTE_TEXT.text(data))
            .map_err(|message| FormErrors::for_field(NOTE_TEXT.name, message).into())
    }

    fn save(&self, text: String) -> FormResult<TaskNote> {
        let note = self.task.add_note(self.user.uuid, text);
        self.repo.create_task_note(&note)?;
        record_log(
            self.repo,
            self.task.project_uuid,
            format!("Note added to task #{} by {}", self.task.number, self.user.username),
        )?;
        Ok(note)
    }
}
