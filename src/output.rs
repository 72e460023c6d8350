//! Shared output formatting for taskdesk commands.

use std::fmt::Write;

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "taskdesk.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

/// Envelope shared by success and error output
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    next_steps: &'a [String],
}

#[derive(Serialize)]
#[serde(tag = "status")]
enum Outcome<'a, T: Serialize> {
    #[serde(rename = "success")]
    Success { data: &'a T },
    #[serde(rename = "error")]
    Failure { error: ErrorBody },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

/// Print a command result: JSON envelope, human text, or nothing (`--quiet`)
pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let (warnings, next_steps): (&[String], &[String]) = match human {
            Some(human) => (human.warnings.as_slice(), human.next_steps.as_slice()),
            None => (&[], &[]),
        };
        return print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Success { data },
            warnings,
            next_steps,
        });
    }

    match human {
        Some(human) if !options.quiet => println!("{}", format_human(human)),
        _ => {}
    }
    Ok(())
}

/// Report a failed command; JSON goes to stdout, human text to stderr
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let warnings = error_warnings(err);
    let next_steps = error_next_steps(err);

    if json {
        return print_envelope(&Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Failure {
                error: ErrorBody {
                    message: err.to_string(),
                    code: err.exit_code(),
                    kind: error_kind(err),
                    details: err.details(),
                },
            },
            warnings: &warnings,
            next_steps: &next_steps,
        });
    }

    eprintln!("error: {err}");
    for warning in &warnings {
        eprintln!("warning: {warning}");
    }
    for step in &next_steps {
        eprintln!("hint: {step}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut text = output.header.clone();

    if !output.summary.is_empty() {
        text.push_str("\n\nSummary:");
        for (key, value) in &output.summary {
            if value.is_empty() {
                let _ = write!(text, "\n- {key}");
            } else {
                let _ = write!(text, "\n- {key}: {value}");
            }
        }
    }
    for (title, items) in [
        ("Details", &output.details),
        ("Warnings", &output.warnings),
        ("Next steps", &output.next_steps),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = write!(text, "\n\n{title}:");
        for item in items {
            let _ = write!(text, "\n- {item}");
        }
    }

    text
}

/// Best-effort command name for error envelopes, read before clap parses
pub fn infer_command_name_from_args() -> String {
    let mut args = std::env::args().skip(1);
    let mut command = None;
    let mut subcommand = None;

    while let Some(arg) = args.next() {
        if arg == "--root" {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        command = Some(arg);
        break;
    }

    let command = match command {
        Some(cmd) => cmd,
        None => return "taskdesk".to_string(),
    };

    if matches!(command.as_str(), "user" | "task") {
        for arg in args.by_ref() {
            if arg.starts_with('-') {
                continue;
            }
            subcommand = Some(arg);
            break;
        }
    }

    match subcommand {
        Some(sub) => format!("{command} {sub}"),
        None => command,
    }
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        2 => "user_error",
        3 => "policy_blocked",
        _ => "operation_failed",
    }
}

/// Context worth surfacing next to the error message
fn error_warnings(err: &Error) -> Vec<String> {
    match err {
        Error::Timeout { path, .. } => vec![format!(
            "another taskdesk process may be holding {}",
            path.display()
        )],
        Error::Redirected { required, route } => vec![format!(
            "signed in without the {required} role; your view is {}",
            route.path()
        )],
        _ => Vec::new(),
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::NotInitialized(_) => vec![
            "taskdesk init --admin-email <email> --admin-password <password> --admin-name <name>"
                .to_string(),
        ],
        Error::NotSignedIn | Error::InvalidCredentials => {
            vec!["taskdesk login --email <email> --password <password>".to_string()]
        }
        Error::Redirected { route, .. } => vec![route.command().to_string()],
        Error::UserNotFound(_) => vec!["taskdesk user list".to_string()],
        Error::TaskNotFound(_) => vec!["taskdesk task list".to_string()],
        Error::InvalidConfig(_) => vec!["fix .taskdesk.toml then retry".to_string()],
        Error::Timeout { .. } => vec!["retry, or raise backend.timeout_ms".to_string()],
        _ => Vec::new(),
    }
}
