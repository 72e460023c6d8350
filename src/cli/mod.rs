//! Command-line interface for taskdesk
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};

use crate::app::AppContext;
use crate::error::{Error, Result};
use crate::output::OutputOptions;

mod auth;
mod init;
mod task;
mod user;

/// taskdesk - team task tracking
///
/// Administrators manage users and tasks; users work through the tasks
/// assigned to them.
#[derive(Parser, Debug)]
#[command(name = "taskdesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Workspace root holding .taskdesk.toml (defaults to current directory)
    #[arg(long, global = true, env = "TASKDESK_ROOT")]
    pub root: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and the first administrator
    Init {
        /// Email of the first administrator
        #[arg(long)]
        admin_email: Option<String>,

        /// Password of the first administrator
        #[arg(long, env = "TASKDESK_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,

        /// Display name of the first administrator
        #[arg(long)]
        admin_name: Option<String>,
    },

    /// Sign in
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in principal and profile
    Whoami,

    /// Show the landing view for the current session
    Home,

    /// User administration (admin)
    #[command(subcommand)]
    User(UserCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),
}

/// User subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create an account and its profile
    Create {
        #[arg(long)]
        email: String,

        #[arg(long, env = "TASKDESK_NEW_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        name: String,

        /// Role: admin or user
        #[arg(long, default_value = "user")]
        role: String,
    },

    /// List all profiles
    List,

    /// Change profile fields
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Role: admin or user
        #[arg(long)]
        role: Option<String>,
    },

    /// Remove a profile (the sign-in credential is kept)
    Delete { id: String },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task (admin)
    New {
        title: String,

        /// Assignee user id
        #[arg(long)]
        assign: String,

        #[arg(long, help = DEADLINE_HELP)]
        deadline: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Initial status: pending, in-progress, completed
        #[arg(long)]
        status: Option<String>,

        /// Admin notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List all tasks (admin)
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Filter by assignee id
        #[arg(long)]
        assignee: Option<String>,

        /// Only overdue tasks
        #[arg(long)]
        overdue: bool,
    },

    /// Show one task (admin or assignee)
    Show { id: String },

    /// Rewrite task fields (admin)
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// New assignee user id
        #[arg(long)]
        assign: Option<String>,

        #[arg(long, help = DEADLINE_HELP)]
        deadline: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a task (admin)
    Delete { id: String },

    /// Task counts (admins see everyone, users see their own)
    Stats {
        /// Restrict to one assignee (admin)
        #[arg(long)]
        user: Option<String>,
    },

    /// Tasks assigned to you
    Mine {
        #[arg(long)]
        status: Option<String>,
    },

    /// Set the status of a task assigned to you
    Status { id: String, status: String },

    /// Set your notes on a task assigned to you
    Note { id: String, text: String },
}

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    pub fn root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(path) => Ok(path.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    pub fn open(&self) -> Result<AppContext> {
        AppContext::open(&self.root()?)
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = GlobalOptions {
            root: self.root,
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Init {
                admin_email,
                admin_password,
                admin_name,
            } => init::run(init::InitOptions {
                admin_email,
                admin_password,
                admin_name,
                global,
            }),
            Commands::Login { email, password } => auth::run_login(auth::LoginOptions {
                email,
                password,
                global,
            }),
            Commands::Logout => auth::run_logout(global),
            Commands::Whoami => auth::run_whoami(global),
            Commands::Home => auth::run_home(global),
            Commands::User(cmd) => match cmd {
                UserCommands::Create {
                    email,
                    password,
                    name,
                    role,
                } => user::run_create(user::CreateOptions {
                    email,
                    password,
                    name,
                    role,
                    global,
                }),
                UserCommands::List => user::run_list(global),
                UserCommands::Update {
                    id,
                    name,
                    email,
                    role,
                } => user::run_update(user::UpdateOptions {
                    id,
                    name,
                    email,
                    role,
                    global,
                }),
                UserCommands::Delete { id } => user::run_delete(user::DeleteOptions { id, global }),
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    title,
                    assign,
                    deadline,
                    description,
                    status,
                    notes,
                } => task::run_new(task::NewOptions {
                    title,
                    assign,
                    deadline,
                    description,
                    status,
                    notes,
                    global,
                }),
                TaskCommands::List {
                    status,
                    assignee,
                    overdue,
                } => task::run_list(task::ListOptions {
                    status,
                    assignee,
                    overdue,
                    global,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions { id, global }),
                TaskCommands::Update {
                    id,
                    title,
                    description,
                    status,
                    assign,
                    deadline,
                    notes,
                } => task::run_update(task::UpdateOptions {
                    id,
                    title,
                    description,
                    status,
                    assign,
                    deadline,
                    notes,
                    global,
                }),
                TaskCommands::Delete { id } => task::run_delete(task::DeleteOptions { id, global }),
                TaskCommands::Stats { user } => task::run_stats(task::StatsOptions { user, global }),
                TaskCommands::Mine { status } => task::run_mine(task::MineOptions { status, global }),
                TaskCommands::Status { id, status } => {
                    task::run_status(task::StatusOptions { id, status, global })
                }
                TaskCommands::Note { id, text } => {
                    task::run_note(task::NoteOptions { id, text, global })
                }
            },
        }
    }
}

const DEADLINE_HELP: &str = "Deadline: RFC 3339 with an offset, or YYYY-MM-DDTHH:MM / YYYY-MM-DD read as UTC (not local time)";

/// Parse a deadline given as RFC 3339, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD`
///
/// Forms without an offset are taken as UTC.
pub(crate) fn parse_deadline(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, pattern) {
            return Ok(parsed.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(Error::InvalidArgument(format!(
        "invalid deadline '{value}' (expected RFC 3339, or YYYY-MM-DDTHH:MM / YYYY-MM-DD in UTC)"
    )))
}

/// Render a date with the configured pattern, falling back to RFC 3339
pub(crate) fn format_date(value: DateTime<Utc>, pattern: &str) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    match write!(out, "{}", value.format(pattern)) {
        Ok(()) => out,
        Err(_) => value.to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::CommandFactory;

    #[test]
    fn deadline_accepts_all_forms() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().expect("date");
        assert_eq!(parse_deadline("2026-03-01T09:30:00Z").expect("rfc3339"), expected);
        assert_eq!(parse_deadline("2026-03-01T10:30:00+01:00").expect("offset"), expected);
        assert_eq!(parse_deadline("2026-03-01T09:30").expect("local form"), expected);
        assert_eq!(
            parse_deadline("2026-03-01").expect("date only"),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single().expect("date")
        );
    }

    #[test]
    fn deadline_help_names_utc_for_offsetless_forms() {
        let cmd = Cli::command();
        let task = cmd.find_subcommand("task").expect("task");
        for name in ["new", "update"] {
            let sub = task.find_subcommand(name).expect("subcommand");
            let help = sub
                .get_arguments()
                .find(|arg| arg.get_id() == "deadline")
                .and_then(|arg| arg.get_help())
                .map(|help| help.to_string())
                .expect("deadline help");
            assert!(help.contains("YYYY-MM-DDTHH:MM / YYYY-MM-DD read as UTC"), "{help}");
        }
    }

    #[test]
    fn deadline_rejects_garbage() {
        assert!(matches!(
            parse_deadline("next tuesday"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn date_uses_configured_pattern() {
        let value = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).single().expect("date");
        assert_eq!(format_date(value, "%b %-d, %Y"), "Jan 5, 2026");
        assert_eq!(format_date(value, "%Y-%m-%d"), "2026-01-05");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
