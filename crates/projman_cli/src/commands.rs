use crate::config::{
    Command, Config, FormArgs, InviteCommand, ItemCommand, ProjectCommand, TaskCommand,
    WikiCommand,
};
use anyhow::{anyhow, bail, Context};
use projman_core::form::account_forms::UserCreationForm;
use projman_core::form::project_forms::{
    AddFileForm, AddNoticeForm, AddTodoListForm, CreateProjectForm, InviteUserForm,
};
use projman_core::form::task_forms::{
    AddTaskNoteForm, CreateSubTaskForm, CreateTaskForm, EditTaskForm,
};
use projman_core::form::task_item_forms::{AddTodoNoteForm, CreateTaskItemForm, EditTaskItemForm};
use projman_core::form::wiki_forms::{CreateWikiPageForm, EditWikiPageForm};
use projman_core::{
    open_db, AccountRepository, AccountService, Form, FormData, InviteService, Project,
    ProjectRepository, SqliteRepository, Task, TaskItem, TaskRepository, TaskScope, User,
    WikiPage, WikiRepository,
};
use serde::Serialize;

/// Executes one parsed command against the configured database.
pub fn run(config: Config) -> anyhow::Result<()> {
    let conn = open_db(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))?;
    let repo = SqliteRepository::try_new(&conn)?;
    let session = Session {
        repo: &repo,
        acting_user: config.acting_user.as_deref(),
    };

    match config.command {
        Command::Signup(form) => print(&UserCreationForm::new(&repo).submit(&form_data(form))?),
        Command::Login { username, password } => {
            let service = AccountService::new(SqliteRepository::try_new(&conn)?);
            match service.authenticate(&username, &password)? {
                Some(user) => print(&user),
                None => bail!("invalid username or password"),
            }
        }
        Command::Project(command) => session.project_command(command),
        Command::Invite(command) => {
            let user = session.user()?;
            let service = InviteService::new(SqliteRepository::try_new(&conn)?);
            match command {
                InviteCommand::List => print(&service.pending_invites(&user)?),
                InviteCommand::Accept { invite } => print(&service.accept(invite, &user)?),
                InviteCommand::Reject { invite } => print(&service.reject(invite, &user)?),
            }
        }
        Command::Task(command) => session.task_command(command),
        Command::Item(command) => session.item_command(command),
        Command::Wiki(command) => session.wiki_command(command),
    }
}

fn form_data(form: FormArgs) -> FormData {
    FormData::from_pairs(form.fields)
}

fn print<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Repository plus the identity a command acts as.
struct Session<'a, 'conn> {
    repo: &'a SqliteRepository<'conn>,
    acting_user: Option<&'a str>,
}

impl Session<'_, '_> {
    fn user(&self) -> anyhow::Result<User> {
        let username = self
            .acting_user
            .ok_or_else(|| anyhow!("this command needs --as <username> (or PROJMAN_USER)"))?;
        self.repo
            .find_user_by_username(username)?
            .ok_or_else(|| anyhow!("unknown user `{username}`"))
    }

    fn find_project(&self, shortname: &str) -> anyhow::Result<Project> {
        self.repo
            .find_project_by_shortname(shortname)?
            .ok_or_else(|| anyhow!("unknown project `{shortname}`"))
    }

    fn find_task(&self, project: &Project, number: i64) -> anyhow::Result<Task> {
        self.repo
            .get_task(project.uuid, number)?
            .ok_or_else(|| anyhow!("task #{number} not found in {}", project.shortname))
    }

    fn find_item(&self, project: &Project, number: i64) -> anyhow::Result<TaskItem> {
        self.repo
            .get_task_item(project.uuid, number)?
            .ok_or_else(|| anyhow!("task item #{number} not found in {}", project.shortname))
    }

    fn find_page(&self, project: &Project, name: &str) -> anyhow::Result<WikiPage> {
        self.repo
            .find_page_by_name(project.uuid, name)?
            .ok_or_else(|| anyhow!("wiki page `{name}` not found in {}", project.shortname))
    }

    fn project_command(&self, command: ProjectCommand) -> anyhow::Result<()> {
        let repo = self.repo;
        match command {
            ProjectCommand::Create(form) => {
                let user = self.user()?;
                print(&CreateProjectForm::new(repo, &user).submit(&form_data(form))?)
            }
            ProjectCommand::Show { project } => print(&self.find_project(&project)?),
            ProjectCommand::List => print(&repo.list_projects_for_user(self.user()?.uuid)?),
            ProjectCommand::Members { project } => {
                print(&repo.list_subscriptions(self.find_project(&project)?.uuid)?)
            }
            ProjectCommand::Invite { project, form } => {
                let project = self.find_project(&project)?;
                print(&InviteUserForm::new(repo, &project).submit(&form_data(form))?)
            }
            ProjectCommand::Notice { project, form } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                print(&AddNoticeForm::new(repo, &project, &user).submit(&form_data(form))?)
            }
            ProjectCommand::Notices { project } => {
                print(&repo.list_notices(self.find_project(&project)?.uuid)?)
            }
            ProjectCommand::TodoList { project, form } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                print(&AddTodoListForm::new(repo, &project, &user).submit(&form_data(form))?)
            }
            ProjectCommand::TodoLists { project } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                print(&repo.list_todo_lists(project.uuid, user.uuid)?)
            }
            ProjectCommand::File { project, form } => {
                let project = self.find_project(&project)?;
                print(&AddFileForm::new(repo, &project).submit(&form_data(form))?)
            }
            ProjectCommand::Files { project } => {
                print(&repo.list_files(self.find_project(&project)?.uuid)?)
            }
            ProjectCommand::Log { project } => {
                print(&repo.list_logs(self.find_project(&project)?.uuid)?)
            }
        }
    }

    fn task_command(&self, command: TaskCommand) -> anyhow::Result<()> {
        let repo = self.repo;
        match command {
            TaskCommand::Create { project, form } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                let form_impl = CreateTaskForm::new(repo, &project, &user)?;
                print(&form_impl.submit(&form_data(form))?)
            }
            TaskCommand::Subtask {
                project,
                parent,
                form,
            } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                let parent = self.find_task(&project, parent)?;
                let form_impl = CreateSubTaskForm::new(repo, &project, &user, &parent)?;
                print(&form_impl.submit(&form_data(form))?)
            }
            TaskCommand::Edit {
                project,
                number,
                form,
            } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                let task = self.find_task(&project, number)?;
                let form_impl = EditTaskForm::new(repo, &project, &user, &task)?;
                // Unsubmitted fields keep their current values.
                let mut data = form_impl.initial();
                for (key, value) in form.fields {
                    data.insert(key, value);
                }
                print(&form_impl.submit(&data)?)
            }
            TaskCommand::Show { project, number } => {
                let project = self.find_project(&project)?;
                print(&self.find_task(&project, number)?)
            }
            TaskCommand::List {
                project,
                top_level,
                parent,
            } => {
                let project = self.find_project(&project)?;
                let scope = match (top_level, parent) {
                    (_, Some(parent)) => TaskScope::SubtasksOf(parent),
                    (true, None) => TaskScope::TopLevel,
                    (false, None) => TaskScope::All,
                };
                print(&repo.list_tasks(project.uuid, scope)?)
            }
            TaskCommand::History { project, number } => {
                print(&repo.task_history(self.find_project(&project)?.uuid, number)?)
            }
            TaskCommand::Note {
                project,
                number,
                form,
            } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                let task = self.find_task(&project, number)?;
                print(&AddTaskNoteForm::new(repo, &task, &user).submit(&form_data(form))?)
            }
            TaskCommand::Notes { project, number } => {
                print(&repo.list_task_notes(self.find_project(&project)?.uuid, number)?)
            }
        }
    }

    fn item_command(&self, command: ItemCommand) -> anyhow::Result<()> {
        let repo = self.repo;
        match command {
            ItemCommand::Create {
                project,
                task,
                form,
            } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                let task = self.find_task(&project, task)?;
                let form_impl = CreateTaskItemForm::new(repo, &project, &user, &task)?;
                print(&form_impl.submit(&form_data(form))?)
            }
            ItemCommand::Edit {
                project,
                number,
                form,
            } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                let item = self.find_item(&project, number)?;
                let form_impl = EditTaskItemForm::new(repo, &user, &item)?;
                let mut data = form_impl.initial();
                for (key, value) in form.fields {
                    data.insert(key, value);
                }
                print(&form_impl.submit(&data)?)
            }
            ItemCommand::List { project, task } => {
                print(&repo.list_task_items(self.find_project(&project)?.uuid, task)?)
            }
            ItemCommand::History { project, number } => {
                print(&repo.task_item_history(self.find_project(&project)?.uuid, number)?)
            }
            ItemCommand::Note {
                project,
                number,
                form,
            } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                let item = self.find_item(&project, number)?;
                print(&AddTodoNoteForm::new(repo, &item, &user).submit(&form_data(form))?)
            }
            ItemCommand::Notes { project, number } => {
                print(&repo.list_todo_notes(self.find_project(&project)?.uuid, number)?)
            }
        }
    }

    fn wiki_command(&self, command: WikiCommand) -> anyhow::Result<()> {
        let repo = self.repo;
        match command {
            WikiCommand::Create { project, form } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                print(&CreateWikiPageForm::new(repo, &project, &user).submit(&form_data(form))?)
            }
            WikiCommand::Edit {
                project,
                page,
                form,
            } => {
                let (project, user) = (self.find_project(&project)?, self.user()?);
                let page = self.find_page(&project, &page)?;
                let form_impl = EditWikiPageForm::new(repo, &user, &page)?;
                print(&form_impl.submit(&form_data(form))?)
            }
            WikiCommand::Show { project, page } => {
                let project = self.find_project(&project)?;
                let page = self.find_page(&project, &page)?;
                let revision = repo.current_revision(page.uuid)?;
                print(&serde_json::json!({
                    "page": page,
                    "url": page.absolute_url(&project),
                    "revision": revision,
                }))
            }
            WikiCommand::List { project } => {
                print(&repo.list_pages(self.find_project(&project)?.uuid)?)
            }
            WikiCommand::Revisions { project, page } => {
                let project = self.find_project(&project)?;
                print(&repo.list_revisions(self.find_page(&project, &page)?.uuid)?)
            }
        }
    }
}
