use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line front-end for a projman database.
#[derive(Debug, Parser)]
#[clap(name = "projman", version, about)]
pub struct Config {
    /// SQLite database file; created and migrated on first use.
    #[clap(long = "db", env = "PROJMAN_DB", default_value = "projman.sqlite3")]
    pub db_path: PathBuf,

    /// Username the command acts as.
    #[clap(long = "as", env = "PROJMAN_USER")]
    pub acting_user: Option<String>,

    #[clap(long, env = "PROJMAN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Enables file logging into this directory.
    #[clap(long, env = "PROJMAN_LOG_DIR")]
    pub log_dir: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

/// Repeated `-f key=value` form input.
#[derive(Debug, Args)]
pub struct FormArgs {
    #[clap(short = 'f', long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a user account (fields: username, password1, password2, project_name).
    Signup(FormArgs),
    /// Check a username/password pair.
    Login { username: String, password: String },
    #[clap(subcommand)]
    Project(ProjectCommand),
    #[clap(subcommand)]
    Invite(InviteCommand),
    #[clap(subcommand)]
    Task(TaskCommand),
    #[clap(subcommand)]
    Item(ItemCommand),
    #[clap(subcommand)]
    Wiki(WikiCommand),
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Fields: shortname, name, start_date, end_date.
    Create(FormArgs),
    Show { project: String },
    /// Projects the acting user is subscribed to.
    List,
    Members { project: String },
    /// Invite a user (fields: username, group).
    Invite {
        project: String,
        #[clap(flatten)]
        form: FormArgs,
    },
    /// Post a notice (field: text).
    Notice {
        project: String,
        #[clap(flatten)]
        form: FormArgs,
    },
    Notices { project: String },
    /// Create a todo list for the acting user (field: name).
    TodoList {
        project: String,
        #[clap(flatten)]
        form: FormArgs,
    },
    TodoLists { project: String },
    /// Record an uploaded file (field: filename).
    File {
        project: String,
        #[clap(flatten)]
        form: FormArgs,
    },
    Files { project: String },
    Log { project: String },
}

#[derive(Debug, Subcommand)]
pub enum InviteCommand {
    /// Pending invites of the acting user.
    List,
    Accept { invite: uuid::Uuid },
    Reject { invite: uuid::Uuid },
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Fields: name, start_date, end_date, user_responsible.
    Create {
        project: String,
        #[clap(flatten)]
        form: FormArgs,
    },
    Subtask {
        project: String,
        parent: i64,
        #[clap(flatten)]
        form: FormArgs,
    },
    /// Adds: actual_start_date, actual_end_date, is_complete.
    Edit {
        project: String,
        number: i64,
        #[clap(flatten)]
        form: FormArgs,
    },
    Show { project: String, number: i64 },
    List {
        project: String,
        #[clap(long, conflicts_with = "parent")]
        top_level: bool,
        #[clap(long)]
        parent: Option<i64>,
    },
    History { project: String, number: i64 },
    Note {
        project: String,
        number: i64,
        #[clap(flatten)]
        form: FormArgs,
    },
    Notes { project: String, number: i64 },
}

#[derive(Debug, Subcommand)]
pub enum ItemCommand {
    /// Fields: item_name, user, time, units.
    Create {
        project: String,
        task: i64,
        #[clap(flatten)]
        form: FormArgs,
    },
    /// Fields: name, user, expected_time, actual_time, unit, is_complete.
    Edit {
        project: String,
        number: i64,
        #[clap(flatten)]
        form: FormArgs,
    },
    List { project: String, task: i64 },
    History { project: String, number: i64 },
    Note {
        project: String,
        number: i64,
        #[clap(flatten)]
        form: FormArgs,
    },
    Notes { project: String, number: i64 },
}

#[derive(Debug, Subcommand)]
pub enum WikiCommand {
    /// Fields: title, text.
    Create {
        project: String,
        #[clap(flatten)]
        form: FormArgs,
    },
    /// Field: text.
    Edit {
        project: String,
        page: String,
        #[clap(flatten)]
        form: FormArgs,
    },
    Show { project: String, page: String },
    List { project: String },
    Revisions { project: String, page: String },
}

fn parse_field(value: &str) -> Result<(String, String), String> {
    let (key, val) = value
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{value}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in `{value}`"));
    }
    Ok((key.to_string(), val.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_field, Command, Config, ProjectCommand};
    use clap::Parser;

    #[test]
    fn field_values_may_contain_equals() {
        assert_eq!(
            parse_field("text=a=b").unwrap(),
            ("text".to_string(), "a=b".to_string())
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn parses_nested_form_command() {
        let config = Config::try_parse_from([
            "projman",
            "--db",
            "x.sqlite3",
            "--as",
            "alice",
            "project",
            "create",
            "-f",
            "shortname=demo",
            "-f",
            "name=Demo",
        ])
        .unwrap();
        assert_eq!(config.acting_user.as_deref(), Some("alice"));
        match config.command {
            Command::Project(ProjectCommand::Create(form)) => assert_eq!(form.fields.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
