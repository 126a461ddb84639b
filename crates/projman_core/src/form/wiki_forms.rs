//! Wiki page forms.

use super::field::{required, FieldKind, FieldSpec};
use super::{check_with, conflict_as_field, record_log, Form, FormData, FormErrors, FormResult};
use crate::model::account::User;
use crate::model::project::Project;
use crate::model::wiki::{
    page_name_from_title, WikiPage, WikiPageRevision, PAGE_TITLE_MAX_LEN,
};
use crate::repo::project_repo::ProjectRepository;
use crate::repo::wiki_repo::WikiRepository;
use crate::repo::RepoResult;

pub const EMPTY_PAGE_NAME_MESSAGE: &str = "Title must contain at least one letter or number.";
pub const PAGE_NAME_TAKEN_MESSAGE: &str = "A page with this name already exists.";

const PAGE_TITLE: FieldSpec = FieldSpec::new(
    "title",
    FieldKind::Char {
        max_length: PAGE_TITLE_MAX_LEN,
    },
)
.with_help("Name of the wiki page.");
const PAGE_TEXT: FieldSpec = FieldSpec::new("text", FieldKind::Text);
const CREATE_PAGE_FIELDS: [FieldSpec; 2] = [PAGE_TITLE, PAGE_TEXT];
const EDIT_PAGE_FIELDS: [FieldSpec; 1] = [PAGE_TEXT];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedWikiPage {
    pub title: String,
    pub text: String,
}

/// Creates a page together with its first revision.
pub struct CreateWikiPageForm<'a, R> {
    repo: &'a R,
    project: &'a Project,
    user: &'a User,
}

impl<'a, R> CreateWikiPageForm<'a, R>
where
    R: ProjectRepository + WikiRepository,
{
    pub fn new(repo: &'a R, project: &'a Project, user: &'a User) -> Self {
        Self {
            repo,
            project,
            user,
        }
    }

    fn clean_title(&self, title: String) -> RepoResult<Result<String, String>> {
        let name = page_name_from_title(&title);
        if name.is_empty() {
            return Ok(Err(EMPTY_PAGE_NAME_MESSAGE.to_string()));
        }
        if self
            .repo
            .find_page_by_name(self.project.uuid, &name)?
            .is_some()
        {
            return Ok(Err(PAGE_NAME_TAKEN_MESSAGE.to_string()));
        }
        Ok(Ok(title))
    }
}

impl<R> Form for CreateWikiPageForm<'_, R>
where
    R: ProjectRepository + WikiRepository,
{
    type Cleaned = CleanedWikiPage;
    type Output = WikiPage;

    fn name(&self) -> &'static str {
        "create_wiki_page"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &CREATE_PAGE_FIELDS
    }

    fn clean(&self, data: &FormData) -> FormResult<CleanedWikiPage> {
        let mut errors = FormErrors::new();
        let title = errors.take(
            PAGE_TITLE.name,
            check_with(required(PAGE_TITLE.text(data)), |title| {
                self.clean_title(title)
            })?,
        );
        let text = errors.take(PAGE_TEXT.name, required(PAGE_TEXT.text(data)));

        match (title, text) {
            (Some(title), Some(text)) if errors.is_empty() => Ok(CleanedWikiPage { title, text }),
            _ => Err(errors.into()),
        }
    }

    fn save(&self, cleaned: CleanedWikiPage) -> FormResult<WikiPage> {
        let page = WikiPage::new(self.project.uuid, cleaned.title);
        let first = WikiPageRevision::new(page.uuid, self.user.uuid, cleaned.text);
        let page = self.repo.create_page(&page, &first).map_err(|err| {
            conflict_as_field(err, "wiki_pages.name", PAGE_TITLE.name, PAGE_NAME_TAKEN_MESSAGE)
        })?;
        record_log(
            self.repo,
            self.project.uuid,
            format!("Wiki page {} created by {}", page.name, self.user.username),
        )?;
        Ok(page)
    }
}

/// Appends a revision to an existing page.
pub struct EditWikiPageForm<'a, R> {
    repo: &'a R,
    user: &'a User,
    page: &'a WikiPage,
    current_text: String,
}

impl<'a, R> EditWikiPageForm<'a, R>
where
    R: ProjectRepository + WikiRepository,
{
    /// Loads the current revision text used as the initial value.
    pub fn new(repo: &'a R, user: &'a User, page: &'a WikiPage) -> RepoResult<Self> {
        let current_text = repo
            .current_revision(page.uuid)?
            .map(|revision| revision.wiki_text)
            .unwrap_or_default();
        Ok(Self {
            repo,
            user,
            page,
            current_text,
        })
    }
}

impl<R> Form for EditWikiPageForm<'_, R>
where
    R: ProjectRepository + WikiRepository,
{
    type Cleaned = String;
    type Output = WikiPageRevision;

    fn name(&self) -> &'static str {
        "edit_wiki_page"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &EDIT_PAGE_FIELDS
    }

    fn initial(&self) -> FormData {
        FormData::from_pairs([(PAGE_TEXT.name, self.current_text.as_str())])
    }

    fn clean(&self, data: &FormData) -> FormResult<String> {
        required(PAGE_TEXT.text(data))
            .map_err(|message| FormErrors::for_field(PAGE_TEXT.name, message).into())
    }

    fn save(&self, text: String) -> FormResult<WikiPageRevision> {
        let revision = WikiPageRevision::new(self.page.uuid, self.user.uuid, text);
        let page = self.repo.append_revision(&revision)?;
        record_log(
            self.repo,
            page.project_uuid,
            format!("Wiki page {} edited by {}", page.name, self.user.username),
        )?;
        Ok(revision)
    }
}
