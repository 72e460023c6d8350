//! Session commands: login, logout, whoami, home.

use serde::Serialize;

use super::GlobalOptions;
use crate::access::{resolve_home, Route};
use crate::backend::Principal;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::session::SessionState;
use crate::user::UserRecord;

pub struct LoginOptions {
    pub email: String,
    pub password: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct SessionReport {
    session: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<UserRecord>,
    home: &'static str,
}

#[derive(Serialize)]
struct HomeReport {
    route: Route,
    path: &'static str,
    command: &'static str,
}

pub fn run_login(options: LoginOptions) -> Result<()> {
    let ctx = options.global.open()?;
    let principal = ctx.identity.sign_in(&options.email, &options.password)?;
    let profile = ctx.users.get(&principal.uid)?;
    let home = resolve_home(profile.as_ref());

    let mut human = HumanOutput::new(format!("Signed in as {}", principal.email));
    push_identity(&mut human, &principal, profile.as_ref());
    if profile.is_none() {
        human.push_warning("no profile exists for this account; ask an admin to recreate it");
    } else {
        human.push_next_step(home.command());
    }

    let report = SessionReport {
        session: ctx.session.state(),
        profile,
        home: home.path(),
    };
    emit_success(options.global.output(), "login", &report, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_logout(global: GlobalOptions) -> Result<()> {
    let ctx = global.open()?;
    let was = ctx.session.principal();
    ctx.identity.sign_out()?;

    let header = match &was {
        Some(principal) => format!("Signed out {}", principal.email),
        None => "Not signed in".to_string(),
    };
    let human = HumanOutput::new(header);
    let report = SessionReport {
        session: ctx.session.state(),
        profile: None,
        home: Route::SignIn.path(),
    };
    emit_success(global.output(), "logout", &report, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_whoami(global: GlobalOptions) -> Result<()> {
    let ctx = global.open()?;
    let profile = ctx.current_profile()?;
    let home = resolve_home(profile.as_ref());

    let mut human = match ctx.session.principal() {
        Some(principal) => {
            let mut human = HumanOutput::new(principal.email.clone());
            push_identity(&mut human, &principal, profile.as_ref());
            human
        }
        None => {
            let mut human = HumanOutput::new("Not signed in");
            human.push_next_step(Route::SignIn.command());
            human
        }
    };
    human.push_summary("home", home.path());

    let report = SessionReport {
        session: ctx.session.state(),
        profile,
        home: home.path(),
    };
    emit_success(global.output(), "whoami", &report, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

pub fn run_home(global: GlobalOptions) -> Result<()> {
    let ctx = global.open()?;
    let route = resolve_home(ctx.current_profile()?.as_ref());

    let mut human = HumanOutput::new(format!("Home: {route}"));
    human.push_next_step(route.command());

    let report = HomeReport {
        route,
        path: route.path(),
        command: route.command(),
    };
    emit_success(global.output(), "home", &report, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

fn push_identity(human: &mut HumanOutput, principal: &Principal, profile: Option<&UserRecord>) {
    human.push_summary("uid", principal.uid.clone());
    match profile {
        Some(profile) => {
            human.push_summary("name", profile.name.clone());
            human.push_summary("role", profile.role.to_string());
        }
        None => human.push_summary("profile", "none"),
    }
}
