//! Task item forms.

use super::field::{required, FieldKind, FieldSpec};
use super::task_forms::{choice_for_user, chosen_user, user_choices};
use super::{record_log, Form, FormData, FormErrors, FormResult};
use crate::model::account::{User, UserId};
use crate::model::note::TodoNote;
use crate::model::project::Project;
use crate::model::task::{Task, TaskItem, TASK_NAME_MAX_LEN};
use crate::model::time_amount::{TimeAmount, TimeUnit, DECIMAL_PLACES, MAX_DIGITS};
use crate::repo::project_repo::ProjectRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoResult;

pub const TIME_NOT_POSITIVE_MESSAGE: &str = "Time must be greater than 0";
pub const NEGATIVE_ACTUAL_TIME_MESSAGE: &str = "Actual time can not be negative";

const TIME_KIND: FieldKind = FieldKind::Decimal {
    max_digits: MAX_DIGITS,
    decimal_places: DECIMAL_PLACES,
};

const ITEM_NAME: FieldSpec = FieldSpec::new(
    "item_name",
    FieldKind::Char {
        max_length: TASK_NAME_MAX_LEN,
    },
)
.with_help("Name of this task item.");
const ITEM_USER: FieldSpec = FieldSpec::new("user", FieldKind::Choice)
    .with_help("Who is going to do this task item?");
const ITEM_TIME: FieldSpec =
    FieldSpec::new("time", TIME_KIND).with_help("How long will this task item take?");
const ITEM_UNITS: FieldSpec = FieldSpec::new("units", FieldKind::Choice);
const CREATE_ITEM_FIELDS: [FieldSpec; 4] = [ITEM_NAME, ITEM_USER, ITEM_TIME, ITEM_UNITS];

const EDIT_NAME: FieldSpec = FieldSpec::new(
    "name",
    FieldKind::Char {
        max_length: TASK_NAME_MAX_LEN,
    },
);
const EDIT_USER: FieldSpec = FieldSpec::new("user", FieldKind::Choice);
const EDIT_EXPECTED_TIME: FieldSpec = FieldSpec::new("expected_time", TIME_KIND);
const EDIT_ACTUAL_TIME: FieldSpec = FieldSpec::new("actual_time", TIME_KIND).optional();
const EDIT_UNIT: FieldSpec = FieldSpec::new("unit", FieldKind::Choice);
const EDIT_IS_COMPLETE: FieldSpec = FieldSpec::new("is_complete", FieldKind::Boolean).optional();
const EDIT_ITEM_FIELDS: [FieldSpec; 6] = [
    EDIT_NAME,
    EDIT_USER,
    EDIT_EXPECTED_TIME,
    EDIT_ACTUAL_TIME,
    EDIT_UNIT,
    EDIT_IS_COMPLETE,
];

const TODO_NOTE_TEXT: FieldSpec = FieldSpec::new("text", FieldKind::Text);
const TODO_NOTE_FIELDS: [FieldSpec; 1] = [TODO_NOTE_TEXT];

fn unit_choices() -> Vec<&'static str> {
    TimeUnit::ALL.iter().map(|unit| unit.as_str()).collect()
}

fn clean_unit(field: &FieldSpec, data: &FormData) -> Result<TimeUnit, String> {
    required(field.choice(data, &unit_choices())).and_then(|value| {
        TimeUnit::parse(&value).ok_or_else(|| {
            format!("Select a valid choice. {value} is not one of the available choices.")
        })
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedTaskItem {
    pub name: String,
    pub user: Option<UserId>,
    pub expected_time: TimeAmount,
    pub unit: TimeUnit,
}

/// Adds a work item to a task.
pub struct CreateTaskItemForm<'a, R> {
    repo: &'a R,
    project: &'a Project,
    user: &'a User,
    task: &'a Task,
    subscribers: Vec<User>,
}

impl<'a, R> CreateTaskItemForm<'a, R>
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
            repo,
            project,
            user,
            task,
            subscribers: repo.list_subscribers(project.uuid)?,
        })
    }

    pub fn user_choices(&self) -> Vec<&str> {
        user_choices(&self.subscribers)
    }
}

impl<R> Form for CreateTaskItemForm<'_, R>
where
    R: ProjectRepository + TaskRepository,
{
    type Cleaned = CleanedTaskItem;
    type Output = TaskItem;

    fn name(&self) -> &'static str {
        "create_task_item"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &CREATE_ITEM_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<CleanedTaskItem> {
        let mut errors = FormErrors::new();
        let name = errors.take(ITEM_NAME.name, required(ITEM_NAME.text(data)));
        let user = errors.take(
            ITEM_USER.name,
            required(ITEM_USER.choice(data, &self.user_choices())),
        );
        let time = errors.take(ITEM_TIME.name, required(ITEM_TIME.amount(data)));
        let unit = errors.take(ITEM_UNITS.name, clean_unit(&ITEM_UNITS, data));

        if matches!(time, Some(time) if !time.is_positive()) {
            errors.add_form(TIME_NOT_POSITIVE_MESSAGE);
        }

        match (name, user, time, unit) {
            (Some(name), Some(user), Some(expected_time), Some(unit)) if errors.is_empty() => {
                Ok(CleanedTaskItem {
                    name,
                    user: chosen_user(&self.subscribers, &user),
                    expected_time,
                    unit,
                })
            }
            _ => Err(errors.into()),
        }
    }

    fn save(&self, cleaned: CleanedTaskItem) -> FormResult<TaskItem> {
        let mut item = TaskItem::new(
            self.task,
            cleaned.name,
            cleaned.expected_time,
            cleaned.unit,
            self.user.uuid,
        );
        item.user = cleaned.user;
        item.number = self.repo.create_task_item(&item)?;
        record_log(
            self.repo,
            self.project.uuid,
            format!(
                "Task item #{} added to task #{} by {}",
                item.number, self.task.number, self.user.username
            ),
        )?;
        Ok(item)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedTaskItemEdit {
    pub item: CleanedTaskItem,
    pub actual_time: Option<TimeAmount>,
    pub is_complete: bool,
}

/// Edits a task item by appending a new version.
pub struct EditTaskItemForm<'a, R> {
    repo: &'a R,
    user: &'a User,
    item: &'a TaskItem,
    subscribers: Vec<User>,
}

impl<'a, R> EditTaskItemForm<'a, R>
where
    R: ProjectRepository + TaskRepository,
{
    pub fn new(repo: &'a R, user: &'a User, item: &'a TaskItem) -> RepoResult<Self> {
        Ok(Self {
            repo,
            user,
            item,
            subscribers: repo.list_subscribers(item.project_uuid)?,
        })
    }
}

impl<R> Form for EditTaskItemForm<'_, R>
where
    R: ProjectRepository + TaskRepository,
{
    type Cleaned = CleanedTaskItemEdit;
    type Output = TaskItem;

    fn name(&self) -> &'static str {
        "edit_task_item"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &EDIT_ITEM_FIELDS
    }

    fn initial(&self) -> FormData {
        let item = self.item;
        let mut data = FormData::from_pairs([
            (EDIT_NAME.name, item.name.clone()),
            (EDIT_USER.name, choice_for_user(&self.subscribers, item.user)),
            (EDIT_EXPECTED_TIME.name, item.expected_time.to_string()),
            (EDIT_UNIT.name, item.unit.as_str().to_string()),
            (EDIT_IS_COMPLETE.name, item.is_complete.to_string()),
        ]);
        if let Some(actual) = item.actual_time {
            data.insert(EDIT_ACTUAL_TIME.name, actual.to_string());
        }
        data
    }

    fn clean(&self, data: &FormData) -> FormResult<CleanedTaskItemEdit> {
        let mut errors = FormErrors::new();
        let name = errors.take(EDIT_NAME.name, required(EDIT_NAME.text(data)));
        let user = errors.take(
            EDIT_USER.name,
            required(EDIT_USER.choice(data, &user_choices(&self.subscribers))),
        );
        let expected_time = errors.take(
            EDIT_EXPECTED_TIME.name,
            required(EDIT_EXPECTED_TIME.amount(data)),
        );
        let actual_time = errors.take(EDIT_ACTUAL_TIME.name, EDIT_ACTUAL_TIME.amount(data));
        let unit = errors.take(EDIT_UNIT.name, clean_unit(&EDIT_UNIT, data));
        let is_complete = EDIT_IS_COMPLETE.flag(data);

        if matches!(expected_time, Some(time) if !time.is_positive()) {
            errors.add_form(TIME_NOT_POSITIVE_MESSAGE);
        }
        if matches!(actual_time, Some(Some(time)) if time.is_negative()) {
            errors.add_form(NEGATIVE_ACTUAL_TIME_MESSAGE);
        }

        match (name, user, expected_time, actual_time, unit) {
            (Some(name), Some(user), Some(expected_time), Some(actual_time), Some(unit))
                if errors.is_empty() =>
            {
                Ok(CleanedTaskItemEdit {
                    item: CleanedTaskItem {
                        name,
                        user: chosen_user(&self.subscribers, &user),
                        expected_time,
                        unit,
                    },
                    actual_time,
                    is_complete,
                })
            }
            _ => Err(errors.into()),
        }
    }

    fn save(&self, cleaned: CleanedTaskItemEdit) -> FormResult<TaskItem> {
        let mut item = self.item.clone();
        item.name = cleaned.item.name;
        item.user = cleaned.item.user;
        item.expected_time = cleaned.item.expected_time;
        item.actual_time = cleaned.actual_time;
        item.unit = cleaned.item.unit;
        item.is_complete = cleaned.is_complete;
        item.updated_by = self.user.uuid;

        let saved = self.repo.save_task_item_version(&item)?;
        record_log(
            self.repo,
            saved.project_uuid,
            format!(
                "Task item #{} updated to version {} by {}",
                saved.number, saved.version.version_number, self.user.username
            ),
        )?;
        Ok(saved)
    }
}

/// Attaches a note to a task item by its logical number.
pub struct AddTodoNoteForm<'a, R> {
    repo: &'a R,
    item: &'a TaskItem,
    user: &'a User,
}

impl<'a, R> AddTodoNoteForm<'a, R>
where
    R: ProjectRepository + TaskRepository,
{
    pub fn new(repo: &'a R, item: &'a TaskItem, user: &'a User) -> Self {
        Self { repo, item, user }
    }
}

impl<R> Form for AddTodoNoteForm<'_, R>
where
    R: ProjectRepository + TaskRepository,
{
    type Cleaned = String;
    type Output = TodoNote;

    fn name(&self) -> &'static str {
        "add_todo_note"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &TODO_NOTE_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<String> {
        required(TODO_NOTE_TEXT.text(data))
            .map_err(|message| FormErrors::for_field(TODO_NOTE_TEXT.name, message).into())
    }

    fn save(&self, text: String) -> FormResult<TodoNote> {
        let note = self.item.add_note(self.user.uuid, text);
        self.repo.create_todo_note(&note)?;
        record_log(
            self.repo,
            self.item.project_uuid,
            format!("Note added to task item #{} by {}", self.item.number, self.user.username),
        )?;
        Ok(note)
    }
}
