//! Task commands: the admin task table and the user dashboard.

use chrono::Utc;
use serde::Serialize;

use super::{format_date, parse_deadline, GlobalOptions};
use crate::access::landing;
use crate::app::AppContext;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::stats::TaskStats;
use crate::task::{assignee_names, NewTask, TaskRecord, TaskStatus, TaskUpdate};
use crate::user::{Role, UserRecord};

pub struct NewOptions {
    pub title: String,
    pub assign: String,
    pub deadline: String,
    pub description: String,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub global: GlobalOptions,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub overdue: bool,
    pub global: GlobalOptions,
}

pub struct ShowOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct UpdateOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assign: Option<String>,
    pub deadline: Option<String>,
    pub notes: Option<String>,
    pub global: GlobalOptions,
}

pub struct DeleteOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct StatsOptions {
    pub user: Option<String>,
    pub global: GlobalOptions,
}

pub struct MineOptions {
    pub status: Option<String>,
    pub global: GlobalOptions,
}

pub struct StatusOptions {
    pub id: String,
    pub status: String,
    pub global: GlobalOptions,
}

pub struct NoteOptions {
    pub id: String,
    pub text: String,
    pub global: GlobalOptions,
}

/// A task as shown to a reader, with derived fields
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskView {
    #[serde(flatten)]
    task: TaskRecord,
    assignee_name: String,
    overdue: bool,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    stats: TaskStats,
    tasks: Vec<TaskView>,
}

#[derive(Serialize)]
struct TaskCreateOutput {
    id: String,
    task: TaskView,
}

#[derive(Serialize)]
struct TaskDeleteOutput {
    id: String,
    removed: bool,
}

#[derive(Serialize)]
struct TaskStatsOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    stats: TaskStats,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let ctx = options.global.open()?;
    ctx.require(Some(Role::Admin))?;

    let assignee = existing_user(&ctx, &options.assign)?;
    let deadline = parse_deadline(&options.deadline)?;
    let status = parse_status(options.status.as_deref())?;

    let id = ctx.tasks.create(NewTask {
        title: options.title,
        description: options.description,
        assigned_to: assignee.id.clone(),
        deadline,
        status,
        notes: options.notes,
        user_notes: None,
    })?;
    let task = load_task(&ctx, &id)?;

    let mut human = HumanOutput::new(format!("Created task {}", task.title));
    human.push_summary("id", id.clone());
    human.push_summary("assignee", assignee.name.clone());
    human.push_summary("deadline", format_date(task.deadline, &ctx.config.tasks.date_format));
    if task.is_overdue(Utc::now()) {
        human.push_warning("deadline is already in the past");
    }

    let output = TaskCreateOutput {
        id,
        task: view(task, assignee.name, Utc::now()),
    };
    emit_success(options.global.output(), "task new", &output, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = options.global.open()?;
    ctx.require(Some(Role::Admin))?;

    let status = parse_status(options.status.as_deref())?;
    let now = Utc::now();
    let mut tasks = match options.assignee.as_deref() {
        Some(assignee) => ctx.tasks.list_for(assignee)?,
        None => ctx.tasks.list_all()?,
    };
    tasks.retain(|task| {
        status.map_or(true, |status| task.status == status)
            && (!options.overdue || task.is_overdue(now))
    });

    let users = ctx.users.list_all()?;
    let stats = TaskStats::compute(&tasks, now);
    let views = views(tasks, &users, ctx.unknown_assignee(), now);

    let mut human = HumanOutput::new("Tasks");
    push_stats(&mut human, &stats);
    for task in &views {
        human.push_detail(task_line(task, &ctx));
    }
    if views.is_empty() {
        human.push_next_step("taskdesk task new <title> --assign <user-id> --deadline <date>");
    }

    let output = TaskListOutput {
        total: views.len(),
        stats,
        tasks: views,
    };
    emit_success(options.global.output(), "task list", &output, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = options.global.open()?;
    let profile = ctx.require(None)?;
    let task = load_task(&ctx, &options.id)?;
    ensure_can_touch(&profile, &task)?;

    let users = ctx.users.list_all()?;
    let now = Utc::now();
    let task = views(vec![task], &users, ctx.unknown_assignee(), now)
        .pop()
        .ok_or_else(|| Error::TaskNotFound(options.id.clone()))?;

    let date_format = &ctx.config.tasks.date_format;
    let mut human = HumanOutput::new(task.task.title.clone());
    human.push_summary("id", task.task.id.clone());
    human.push_summary("status", task.task.status.to_string());
    human.push_summary("assignee", task.assignee_name.clone());
    human.push_summary("deadline", format_date(task.task.deadline, date_format));
    human.push_summary("created", format_date(task.task.created_at, date_format));
    if !task.task.description.is_empty() {
        human.push_detail(task.task.description.clone());
    }
    if !task.task.notes.is_empty() {
        human.push_detail(format!("notes: {}", task.task.notes));
    }
    if !task.task.user_notes.is_empty() {
        human.push_detail(format!("assignee notes: {}", task.task.user_notes));
    }
    if task.overdue {
        human.push_warning("overdue");
    }

    emit_success(options.global.output(), "task show", &task, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_update(options: UpdateOptions) -> Result<()> {
    let ctx = options.global.open()?;
    ctx.require(Some(Role::Admin))?;

    let assigned_to = match options.assign.as_deref() {
        Some(id) => Some(existing_user(&ctx, id)?.id),
        None => None,
    };
    let updates = TaskUpdate {
        title: options.title,
        description: options.description,
        status: parse_status(options.status.as_deref())?,
        assigned_to,
        deadline: options.deadline.as_deref().map(parse_deadline).transpose()?,
        notes: options.notes,
        user_notes: None,
    };
    ctx.tasks.update(&options.id, &updates)?;
    let task = load_task(&ctx, &options.id)?;

    let users = ctx.users.list_all()?;
    let now = Utc::now();
    let mut human = HumanOutput::new(format!("Updated task {}", task.title));
    human.push_summary("id", task.id.clone());
    human.push_summary("status", task.status.to_string());
    let task = views(vec![task], &users, ctx.unknown_assignee(), now)
        .pop()
        .ok_or_else(|| Error::TaskNotFound(options.id.clone()))?;
    human.push_summary("assignee", task.assignee_name.clone());

    emit_success(options.global.output(), "task update", &task, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let ctx = options.global.open()?;
    ctx.require(Some(Role::Admin))?;

    let existing = ctx.tasks.get(&options.id)?;
    ctx.tasks.delete(&options.id)?;

    let header = match &existing {
        Some(task) => format!("Deleted task {}", task.title),
        None => format!("No task {}", options.id),
    };
    let human = HumanOutput::new(header);
    let output = TaskDeleteOutput {
        id: options.id,
        removed: existing.is_some(),
    };
    emit_success(options.global.output(), "task delete", &output, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_stats(options: StatsOptions) -> Result<()> {
    let ctx = options.global.open()?;
    let profile = ctx.require(None)?;

    let scope = match (profile.role, options.user) {
        (Role::Admin, user) => user,
        (Role::User, None) => Some(profile.id.clone()),
        (Role::User, Some(user)) if user == profile.id => Some(user),
        (Role::User, Some(_)) => {
            return Err(Error::Redirected {
                required: Role::Admin.to_string(),
                route: landing(profile.role),
            })
        }
    };
    let stats = ctx.tasks.stats(scope.as_deref())?;

    let header = match &scope {
        Some(user) if *user == profile.id => "Your tasks".to_string(),
        Some(user) => format!("Tasks for {user}"),
        None => "All tasks".to_string(),
    };
    let mut human = HumanOutput::new(header);
    push_stats(&mut human, &stats);
    if stats.overdue > 0 {
        human.push_warning(format!("{} task(s) overdue", stats.overdue));
    }

    let output = TaskStatsOutput { user: scope, stats };
    emit_success(options.global.output(), "task stats", &output, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_mine(options: MineOptions) -> Result<()> {
    let ctx = options.global.open()?;
    let profile = ctx.require(Some(Role::User))?;

    let status = parse_status(options.status.as_deref())?;
    let now = Utc::now();
    let tasks = ctx.tasks.list_for(&profile.id)?;
    let stats = TaskStats::compute(&tasks, now);
    let tasks: Vec<TaskView> = tasks
        .into_iter()
        .filter(|task| status.map_or(true, |status| task.status == status))
        .map(|task| view(task, profile.name.clone(), now))
        .collect();

    let mut human = HumanOutput::new(format!("Tasks for {}", profile.name));
    push_stats(&mut human, &stats);
    for task in &tasks {
        human.push_detail(task_line(task, &ctx));
    }
    if stats.overdue > 0 {
        human.push_warning(format!("{} task(s) overdue", stats.overdue));
    }
    if let Some(task) = tasks.iter().find(|task| task.task.status != TaskStatus::Completed) {
        human.push_next_step(format!("taskdesk task status {} in-progress", task.task.id));
    }

    let output = TaskListOutput {
        total: tasks.len(),
        stats,
        tasks,
    };
    emit_success(options.global.output(), "task mine", &output, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_status(options: StatusOptions) -> Result<()> {
    let ctx = options.global.open()?;
    let profile = ctx.require(None)?;
    let status: TaskStatus = options.status.parse()?;

    let task = load_task(&ctx, &options.id)?;
    ensure_can_touch(&profile, &task)?;
    ctx.tasks.update_status(&task.id, status)?;

    let mut human = HumanOutput::new(format!("{}: {} -> {}", task.title, task.status, status));
    human.push_summary("id", task.id.clone());
    let task = load_task(&ctx, &options.id)?;
    let name = assignee_name(&ctx, &profile, &task)?;
    let task = view(task, name, Utc::now());

    emit_success(options.global.output(), "task status", &task, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_note(options: NoteOptions) -> Result<()> {
    let ctx = options.global.open()?;
    let profile = ctx.require(None)?;

    let task = load_task(&ctx, &options.id)?;
    ensure_can_touch(&profile, &task)?;
    ctx.tasks.update_user_notes(&task.id, &options.text)?;

    let mut human = HumanOutput::new(format!("Noted on {}", task.title));
    human.push_summary("id", task.id.clone());
    let task = load_task(&ctx, &options.id)?;
    let name = assignee_name(&ctx, &profile, &task)?;
    let task = view(task, name, Utc::now());

    emit_success(options.global.output(), "task note", &task, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

fn parse_status(value: Option<&str>) -> Result<Option<TaskStatus>> {
    value.map(str::parse).transpose()
}

fn load_task(ctx: &AppContext, id: &str) -> Result<TaskRecord> {
    ctx.tasks
        .get(id)?
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))
}

fn existing_user(ctx: &AppContext, id: &str) -> Result<UserRecord> {
    ctx.users
        .get(id)?
        .ok_or_else(|| Error::UserNotFound(id.to_string()))
}

/// Admins may touch any task; users only their own
///
/// Someone else's task reads as missing to a user.
fn ensure_can_touch(profile: &UserRecord, task: &TaskRecord) -> Result<()> {
    if profile.role == Role::Admin || task.assigned_to == profile.id {
        Ok(())
    } else {
        Err(Error::TaskNotFound(task.id.clone()))
    }
}

fn assignee_name(ctx: &AppContext, profile: &UserRecord, task: &TaskRecord) -> Result<String> {
    if task.assigned_to == profile.id {
        return Ok(profile.name.clone());
    }
    Ok(ctx
        .users
        .get(&task.assigned_to)?
        .map(|user| user.name)
        .unwrap_or_else(|| ctx.unknown_assignee().to_string()))
}

fn view(task: TaskRecord, assignee_name: String, now: chrono::DateTime<Utc>) -> TaskView {
    let overdue = task.is_overdue(now);
    TaskView {
        task,
        assignee_name,
        overdue,
    }
}

fn views(
    tasks: Vec<TaskRecord>,
    users: &[UserRecord],
    unknown: &str,
    now: chrono::DateTime<Utc>,
) -> Vec<TaskView> {
    let mut names = assignee_names(&tasks, users, unknown);
    tasks
        .into_iter()
        .map(|task| {
            let name = names
                .remove(&task.id)
                .unwrap_or_else(|| unknown.to_string());
            view(task, name, now)
        })
        .collect()
}

fn task_line(task: &TaskView, ctx: &AppContext) -> String {
    let mut line = format!(
        "[{}] {} {} ({}, due {})",
        task.task.status,
        task.task.id,
        task.task.title,
        task.assignee_name,
        format_date(task.task.deadline, &ctx.config.tasks.date_format)
    );
    if task.overdue {
        line.push_str(" OVERDUE");
    }
    line
}

fn push_stats(human: &mut HumanOutput, stats: &TaskStats) {
    human.push_summary("total", stats.total.to_string());
    human.push_summary("pending", stats.pending.to_string());
    human.push_summary("in progress", stats.in_progress.to_string());
    human.push_summary("completed", stats.completed.to_string());
    human.push_summary("open", stats.open().to_string());
    human.push_summary("overdue", stats.overdue.to_string());
}
