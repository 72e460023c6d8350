//! User administration commands.

use serde::Serialize;

use super::GlobalOptions;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::user::{Role, UserRecord, UserUpdate};

pub struct CreateOptions {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
    pub global: GlobalOptions,
}

pub struct UpdateOptions {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub global: GlobalOptions,
}

pub struct DeleteOptions {
    pub id: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct UserListOutput {
    total: usize,
    users: Vec<UserRecord>,
}

#[derive(Serialize)]
struct UserDeleteOutput {
    id: String,
    removed: bool,
    credential_revoked: bool,
    orphaned_tasks: usize,
}

pub fn run_create(options: CreateOptions) -> Result<()> {
    let ctx = options.global.open()?;
    ctx.require(Some(Role::Admin))?;
    let role: Role = options.role.parse()?;

    let record = ctx
        .users
        .create(&options.email, &options.password, &options.name, role)?;

    let mut human = HumanOutput::new(format!("Created user {}", record.name));
    push_record(&mut human, &record);
    if role == Role::User {
        human.push_next_step(format!(
            "taskdesk task new <title> --assign {} --deadline <date>",
            record.id
        ));
    }

    emit_success(options.global.output(), "user create", &record, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_list(global: GlobalOptions) -> Result<()> {
    let ctx = global.open()?;
    ctx.require(Some(Role::Admin))?;
    let users = ctx.users.list_all()?;

    let mut human = HumanOutput::new("Users");
    human.push_summary("Total", users.len().to_string());
    for user in &users {
        human.push_detail(format!(
            "[{}] {} {} <{}>",
            user.role, user.id, user.name, user.email
        ));
    }

    let output = UserListOutput {
        total: users.len(),
        users,
    };
    emit_success(global.output(), "user list", &output, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_update(options: UpdateOptions) -> Result<()> {
    let ctx = options.global.open()?;
    ctx.require(Some(Role::Admin))?;

    let updates = UserUpdate {
        name: options.name,
        email: options.email,
        role: options.role.as_deref().map(str::parse).transpose()?,
    };
    ctx.users.update(&options.id, &updates)?;
    let record = ctx
        .users
        .get(&options.id)?
        .ok_or_else(|| Error::UserNotFound(options.id.clone()))?;

    let mut human = HumanOutput::new(format!("Updated user {}", record.name));
    push_record(&mut human, &record);
    if updates.email.is_some() {
        human.push_warning("profile email changed; the sign-in email is unchanged");
    }

    emit_success(options.global.output(), "user update", &record, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let ctx = options.global.open()?;
    let admin = ctx.require(Some(Role::Admin))?;

    let existing = ctx.users.get(&options.id)?;
    ctx.users.delete(&options.id)?;
    let orphaned_tasks = ctx.tasks.list_for(&options.id)?.len();

    let header = match &existing {
        Some(record) => format!("Deleted user {}", record.name),
        None => format!("No profile for {}", options.id),
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("id", options.id.clone());
    if existing.is_some() {
        human.push_warning("the sign-in credential is not revoked");
    }
    if orphaned_tasks > 0 {
        human.push_warning(format!(
            "{orphaned_tasks} task(s) still assigned; they show as {}",
            ctx.unknown_assignee()
        ));
        human.push_next_step("taskdesk task list");
    }
    if admin.id == options.id {
        human.push_warning("you deleted your own profile; admin commands are now unavailable");
    }

    let output = UserDeleteOutput {
        id: options.id,
        removed: existing.is_some(),
        credential_revoked: false,
        orphaned_tasks,
    };
    emit_success(options.global.output(), "user delete", &output, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

fn push_record(human: &mut HumanOutput, record: &UserRecord) {
    human.push_summary("id", record.id.clone());
    human.push_summary("email", record.email.clone());
    human.push_summary("role", record.role.to_string());
}
