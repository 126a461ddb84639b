mod common;

use common::{count_rows, form, invalid, seed_project, seed_user};
use projman_core::db::open_db_in_memory;
use projman_core::form::wiki_forms::{
    CreateWikiPageForm, EditWikiPageForm, EMPTY_PAGE_NAME_MESSAGE, PAGE_NAME_TAKEN_MESSAGE,
};
use projman_core::{
    Form, ProjectRepository, SqliteRepository, WikiPage, WikiPageRevision, WikiRepository,
};

#[test]
fn create_page_stores_first_revision() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");

    let page = CreateWikiPageForm::new(&repo, &project, &alice)
        .submit(&form(&[("title", "Release Plan"), ("text", "# Goals\n\nShip **v1**")]))
        .unwrap();

    assert_eq!(page.name, "Release_Plan");
    assert_eq!(page.title, "Release Plan");
    assert_eq!(page.absolute_url(&project), "/apollo/wiki/Release_Plan/");

    let current = repo.current_revision(page.uuid).unwrap().unwrap();
    assert_eq!(page.current_revision, Some(current.uuid));
    assert_eq!(current.user_uuid, alice.uuid);
    assert_eq!(
        current.html_text,
        "<h1>Goals</h1>\n<p>Ship <strong>v1</strong></p>"
    );
    assert_eq!(
        repo.find_page_by_name(project.uuid, "Release_Plan").unwrap(),
        Some(page)
    );
    assert!(repo
        .list_logs(project.uuid)
        .unwrap()
        .iter()
        .any(|log| log.text.contains("Release_Plan")));
}

#[test]
fn titles_that_collide_or_have_no_name_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");
    let create = CreateWikiPageForm::new(&repo, &project, &alice);

    create
        .submit(&form(&[("title", "Release Plan"), ("text", "first")]))
        .unwrap();
    let errors = invalid(create.submit(&form(&[("title", "Release-Plan!"), ("text", "again")])));
    assert_eq!(errors.field("title"), [PAGE_NAME_TAKEN_MESSAGE.to_string()]);

    let errors = invalid(create.submit(&form(&[("title", "???"), ("text", "")])));
    assert_eq!(errors.field("title"), [EMPTY_PAGE_NAME_MESSAGE.to_string()]);
    assert_eq!(errors.field("text"), ["This field is required.".to_string()]);

    assert_eq!(count_rows(&conn, "wiki_pages"), 1);
    assert_eq!(count_rows(&conn, "wiki_page_revisions"), 1);
}

#[test]
fn same_page_name_is_allowed_in_another_project() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let apollo = seed_project(&repo, &alice, "apollo");
    let gemini = seed_project(&repo, &alice, "gemini");

    for project in [&apollo, &gemini] {
        CreateWikiPageForm::new(&repo, project, &alice)
            .submit(&form(&[("title", "Home"), ("text", "hello")]))
            .unwrap();
    }
    assert_eq!(repo.list_pages(apollo.uuid).unwrap().len(), 1);
    assert_eq!(repo.list_pages(gemini.uuid).unwrap().len(), 1);
}

#[test]
fn edits_append_revisions_and_move_current() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let bob = seed_user(&repo, "bob");
    let project = seed_project(&repo, &alice, "apollo");
    let page = CreateWikiPageForm::new(&repo, &project, &alice)
        .submit(&form(&[("title", "Home"), ("text", "v1")]))
        .unwrap();

    let edit = EditWikiPageForm::new(&repo, &bob, &page).unwrap();
    assert_eq!(edit.initial().get("text"), Some("v1"));
    let second = edit.submit(&form(&[("text", "v2 [[Other]]")])).unwrap();
    let third = EditWikiPageForm::new(&repo, &alice, &page)
        .unwrap()
        .submit(&form(&[("text", "v3")]))
        .unwrap();

    assert_ne!(second.uuid, third.uuid);
    assert_eq!(second.user_uuid, bob.uuid);
    assert_eq!(second.html_text, "<p>v2 <a href=\"../Other/\">Other</a></p>");

    let texts: Vec<_> = repo
        .list_revisions(page.uuid)
        .unwrap()
        .into_iter()
        .map(|revision| revision.wiki_text)
        .collect();
    assert_eq!(texts, vec!["v1", "v2 [[Other]]", "v3"]);

    let current = repo.current_revision(page.uuid).unwrap().unwrap();
    assert_eq!(current, third);
    let stored = repo.get_page(page.uuid).unwrap().unwrap();
    assert_eq!(stored.current_revision, Some(third.uuid));

    let refreshed = EditWikiPageForm::new(&repo, &bob, &stored).unwrap();
    assert_eq!(refreshed.initial().get("text"), Some("v3"));
}

#[test]
fn blank_edit_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");
    let page = CreateWikiPageForm::new(&repo, &project, &alice)
        .submit(&form(&[("title", "Home"), ("text", "v1")]))
        .unwrap();

    let errors = invalid(
        EditWikiPageForm::new(&repo, &alice, &page)
            .unwrap()
            .submit(&form(&[("text", "   ")])),
    );
    assert!(errors.has_field("text"));
    assert_eq!(repo.list_revisions(page.uuid).unwrap().len(), 1);
}

#[test]
fn page_created_after_clean_is_a_title_error_on_save() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let alice = seed_user(&repo, "alice");
    let project = seed_project(&repo, &alice, "apollo");
    let create = CreateWikiPageForm::new(&repo, &project, &alice);

    let cleaned = create
        .clean(&form(&[("title", "Release Plan"), ("text", "mine")]))
        .unwrap();
    let page = WikiPage::new(project.uuid, "Release-Plan");
    let first = WikiPageRevision::new(page.uuid, alice.uuid, "theirs");
    repo.create_page(&page, &first).unwrap();
    let logs_before = count_rows(&conn, "project_logs");

    let errors = invalid(create.save(cleaned));
    assert_eq!(errors.field("title"), [PAGE_NAME_TAKEN_MESSAGE.to_string()]);
    assert_eq!(count_rows(&conn, "wiki_pages"), 1);
    assert_eq!(count_rows(&conn, "wiki_page_revisions"), 1);
    assert_eq!(count_rows(&conn, "project_logs"), logs_before);
}
