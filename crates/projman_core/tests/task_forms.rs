mod common;

use chrono::NaiveDate;
use common::{count_rows, form, invalid, seed_project, seed_user};
use projman_core::db::open_db_in_memory;
use projman_core::form::task_forms::{
    AddTaskNoteForm, CreateSubTaskForm, CreateTaskForm, EditTaskForm,
};
use projman_core::form::STALE_VERSION_MESSAGE;
use projman_core::{Form, SqliteRepository, TaskRepository, TaskScope};

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

#[test]
fn end_before_start_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");

    let errors = invalid(
        CreateTaskForm::new(&repo, &project, &alice)
            .unwrap()
            .submit(&form(&[
                ("name", "Design"),
                ("start_date", "2024-05-10"),
                ("end_date", "2024-05-01"),
                ("user_responsible", "None"),
            ])),
    );

    assert_eq!(
        errors.form_errors(),
        ["Start date can not be greater than end date".to_string()]
    );
    assert_eq!(count_rows(&conn, "tasks"), 0);
}

#[test]
fn tasks_with_equal_or_missing_end_are_created_with_numbers() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");
    let create = CreateTaskForm::new(&repo, &project, &alice).unwrap();

    let same_day = create
        .submit(&form(&[
            ("name", "Same day"),
            ("start_date", "2024-05-10"),
            ("end_date", "2024-05-10"),
            ("user_responsible", "alice"),
        ]))
        .unwrap();
    let open_ended = create
        .submit(&form(&[
            ("name", "Open ended"),
            ("start_date", "2024-05-10"),
            ("user_responsible", "None"),
        ]))
        .unwrap();

    assert_eq!(same_day.number, 1);
    assert_eq!(open_ended.number, 2);
    assert_eq!(same_day.user_responsible, Some(alice.uuid));
    assert_eq!(open_ended.user_responsible, None);
    assert_eq!(open_ended.expected_end_date, None);
    assert_eq!(same_day.version.version_number, 1);
    assert!(same_day.version.is_current);
    assert_eq!(same_day.absolute_url(&project), "/apollo/tasks/1/");

    let stored = repo.get_task(project.uuid, 1).unwrap().unwrap();
    assert_eq!(stored, same_day);
}

#[test]
fn responsible_user_must_be_a_subscriber() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    seed_user(&repo, "outsider");
    let project = seed_project(&repo, &alice, "apollo");
    let create = CreateTaskForm::new(&repo, &project, &alice).unwrap();

    assert_eq!(create.responsible_choices(), vec!["None", "alice"]);
    let errors = invalid(create.submit(&form(&[
        ("name", "Design"),
        ("start_date", "2024-05-10"),
        ("user_responsible", "outsider"),
    ])));
    assert_eq!(
        errors.field("user_responsible"),
        ["Select a valid choice. outsider is not one of the available choices.".to_string()]
    );
}

#[test]
fn subtasks_reference_parent_number() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");
    let task_fields = [
        ("name", "Parent"),
        ("start_date", "2024-05-01"),
        ("user_responsible", "None"),
    ];
    let parent = CreateTaskForm::new(&repo, &project, &alice)
        .unwrap()
        .submit(&form(&task_fields))
        .unwrap();

    let child = CreateSubTaskForm::new(&repo, &project, &alice, &parent)
        .unwrap()
        .submit(&form(&[
            ("name", "Child"),
            ("start_date", "2024-05-02"),
            ("user_responsible", "None"),
        ]))
        .unwrap();

    assert_eq!(child.parent_task_num, Some(parent.number));
    assert!(child.is_subtask());
    assert_eq!(child.number, 2);

    let top: Vec<_> = repo
        .list_tasks(project.uuid, TaskScope::TopLevel)
        .unwrap()
        .into_iter()
        .map(|task| task.number)
        .collect();
    assert_eq!(top, vec![1]);
    let children = repo
        .list_tasks(project.uuid, TaskScope::SubtasksOf(parent.number))
        .unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "Child");
    assert_eq!(repo.list_tasks(project.uuid, TaskScope::All).unwrap().len(), 2);
}

#[test]
fn edit_appends_a_new_current_version() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let bob = seed_user(&repo, "bob");
    let project = seed_project(&repo, &alice, "apollo");
    let task = CreateTaskForm::new(&repo, &project, &alice)
        .unwrap()
        .submit(&form(&[
            ("name", "Design"),
            ("start_date", "2024-05-01"),
            ("end_date", "2024-05-20"),
            ("user_responsible", "None"),
        ]))
        .unwrap();

    let edited = EditTaskForm::new(&repo, &project, &bob, &task)
        .unwrap()
        .submit(&form(&[
            ("name", "Design v2"),
            ("start_date", "2024-05-02"),
            ("user_responsible", "alice"),
            ("actual_start_date", "2024-05-03"),
            ("is_complete", "on"),
        ]))
        .unwrap();

    assert_eq!(edited.number, task.number);
    assert_ne!(edited.uuid, task.uuid);
    assert_eq!(edited.version.version_number, 2);
    assert_eq!(edited.name, "Design v2");
    assert_eq!(edited.expected_start_date, date("2024-05-02"));
    // Not submitted, so the stored end date is kept.
    assert_eq!(edited.expected_end_date, Some(date("2024-05-20")));
    assert_eq!(edited.actual_start_date, Some(date("2024-05-03")));
    assert_eq!(edited.user_responsible, Some(alice.uuid));
    assert_eq!(edited.updated_by, bob.uuid);
    assert_eq!(edited.created_by, alice.uuid);
    assert!(edited.is_complete);

    let history = repo.task_history(project.uuid, task.number).unwrap();
    assert_eq!(history.len(), 2);
    assert!(!history[0].version.is_current);
    assert!(history[0].version.effective_end_at.is_some());
    assert_eq!(history[0].name, "Design");
    assert!(history[1].version.is_current);

    let current = repo.get_task(project.uuid, task.number).unwrap().unwrap();
    assert_eq!(current, edited);
    assert_eq!(repo.list_tasks(project.uuid, TaskScope::All).unwrap().len(), 1);
}

#[test]
fn unchecked_completion_box_means_incomplete() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");
    let mut task_fields = vec![
        ("name", "Design"),
        ("start_date", "2024-05-01"),
        ("user_responsible", "None"),
    ];
    let task = CreateTaskForm::new(&repo, &project, &alice)
        .unwrap()
        .submit(&form(&task_fields))
        .unwrap();

    task_fields.push(("is_complete", "on"));
    let done = EditTaskForm::new(&repo, &project, &alice, &task)
        .unwrap()
        .submit(&form(&task_fields))
        .unwrap();
    assert!(done.is_complete);

    task_fields.pop();
    let reopened = EditTaskForm::new(&repo, &project, &alice, &done)
        .unwrap()
        .submit(&form(&task_fields))
        .unwrap();
    assert!(!reopened.is_complete);
    assert_eq!(reopened.version.version_number, 3);
}

#[test]
fn edit_initial_reflects_current_task() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");
    let task = CreateTaskForm::new(&repo, &project, &alice)
        .unwrap()
        .submit(&form(&[
            ("name", "Design"),
            ("start_date", "2024-05-01"),
            ("user_responsible", "alice"),
        ]))
        .unwrap();

    let initial = EditTaskForm::new(&repo, &project, &alice, &task)
        .unwrap()
        .initial();
    assert_eq!(initial.get("name"), Some("Design"));
    assert_eq!(initial.get("start_date"), Some("2024-05-01"));
    assert_eq!(initial.get("user_responsible"), Some("alice"));
    assert_eq!(initial.get("end_date"), None);
    assert_eq!(initial.get("is_complete"), Some("false"));
}

#[test]
fn edit_checks_dates_against_stored_values() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");
    let task = CreateTaskForm::new(&repo, &project, &alice)
        .unwrap()
        .submit(&form(&[
            ("name", "Design"),
            ("start_date", "2024-05-01"),
            ("end_date", "2024-05-05"),
            ("user_responsible", "None"),
        ]))
        .unwrap();
    let edit = EditTaskForm::new(&repo, &project, &alice, &task).unwrap();

    let errors = invalid(edit.submit(&form(&[
        ("name", "Design"),
        ("start_date", "2024-06-01"),
        ("user_responsible", "None"),
    ])));
    assert_eq!(
        errors.form_errors(),
        ["Start date can not be greater than end date".to_string()]
    );

    let errors = invalid(edit.submit(&form(&[
        ("name", "Design"),
        ("start_date", "2024-05-01"),
        ("user_responsible", "None"),
        ("actual_start_date", "2024-05-09"),
        ("actual_end_date", "2024-05-08"),
    ])));
    assert_eq!(
        errors.form_errors(),
        ["Actual start date can not be greater than actual end date".to_string()]
    );
    assert_eq!(repo.task_history(project.uuid, task.number).unwrap().len(), 1);
}

#[test]
fn editing_a_superseded_version_is_a_form_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");
    let fields = [
        ("name", "Design"),
        ("start_date", "2024-05-01"),
        ("user_responsible", "None"),
    ];
    let task = CreateTaskForm::new(&repo, &project, &alice)
        .unwrap()
        .submit(&form(&fields))
        .unwrap();

    EditTaskForm::new(&repo, &project, &alice, &task)
        .unwrap()
        .submit(&form(&fields))
        .unwrap();
    let errors = invalid(
        EditTaskForm::new(&repo, &project, &alice, &task)
            .unwrap()
            .submit(&form(&fields)),
    );

    assert_eq!(errors.form_errors(), [STALE_VERSION_MESSAGE.to_string()]);
    assert_eq!(repo.task_history(project.uuid, task.number).unwrap().len(), 2);
}

#[test]
fn task_notes_survive_new_versions() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");
    let fields = [
        ("name", "Design"),
        ("start_date", "2024-05-01"),
        ("user_responsible", "None"),
    ];
    let task = CreateTaskForm::new(&repo, &project, &alice)
        .unwrap()
        .submit(&form(&fields))
        .unwrap();

    let note = AddTaskNoteForm::new(&repo, &task, &alice)
        .submit(&form(&[("text", "Needs review")]))
        .unwrap();
    assert_eq!(note.task_num, task.number);

    let edited = EditTaskForm::new(&repo, &project, &alice, &task)
        .unwrap()
        .submit(&form(&fields))
        .unwrap();
    AddTaskNoteForm::new(&repo, &edited, &alice)
        .submit(&form(&[("text", "Reviewed")]))
        .unwrap();

    let texts: Vec<_> = repo
        .list_task_notes(project.uuid, task.number)
        .unwrap()
        .into_iter()
        .map(|note| note.text)
        .collect();
    assert_eq!(texts, vec!["Needs review", "Reviewed"]);
}
