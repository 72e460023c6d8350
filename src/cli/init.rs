//! taskdesk init command implementation
//!
//! Creates the config file and data directory, then bootstraps the first
//! administrator when the directory has no profiles yet.

use std::path::{Path, PathBuf};

use super::GlobalOptions;
use crate::app::AppContext;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::storage::CONFIG_FILE;
use crate::user::{Role, UserRecord};

pub struct InitOptions {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
    pub global: GlobalOptions,
}

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    data_dir: PathBuf,
    created: InitCreated,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin: Option<UserRecord>,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    data_dir: bool,
    admin: bool,
}

pub fn run(options: InitOptions) -> Result<()> {
    let root = options.global.root()?;
    let created_config = ensure_config(&root)?;
    let (ctx, created_data_dir) = AppContext::create(&root)?;

    let mut human_warnings = Vec::new();
    let has_profiles = !ctx.users.list_all()?.is_empty();
    let admin = match (
        has_profiles,
        options.admin_email,
        options.admin_password,
        options.admin_name,
    ) {
        (false, Some(email), Some(password), Some(name)) => {
            Some(ctx.users.create(&email, &password, &name, Role::Admin)?)
        }
        (false, ..) => {
            return Err(Error::InvalidArgument(
                "first init needs --admin-email, --admin-password and --admin-name".to_string(),
            ))
        }
        (true, email, _, _) => {
            if email.is_some() {
                human_warnings.push("users already exist; admin bootstrap skipped".to_string());
            }
            None
        }
    };

    let report = InitReport {
        root: root.clone(),
        data_dir: ctx.storage.data_dir().to_path_buf(),
        created: InitCreated {
            config: created_config,
            data_dir: created_data_dir,
            admin: admin.is_some(),
        },
        admin,
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }
    if created_data_dir {
        created_items.push(format!("{}/", ctx.config.backend.data_dir.display()));
    }
    if let Some(admin) = report.admin.as_ref() {
        created_items.push(format!("admin {}", admin.email));
    }

    let header = if created_items.is_empty() {
        "taskdesk init: nothing to do"
    } else {
        "taskdesk init: initialized"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("root", root.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    for warning in human_warnings {
        human.push_warning(warning);
    }
    human.push_next_step("taskdesk login --email <email> --password <password>");

    emit_success(options.global.output(), "init", &report, Some(&human))?;
    ctx.shutdown();
    Ok(())
}

fn ensure_config(root: &Path) -> Result<bool> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::OperationFailed(format!(
                "{CONFIG_FILE} exists but is not a file: {}",
                config_path.display()
            )));
        }
        return Ok(false);
    }

    std::fs::create_dir_all(root)?;
    Config::default().save(&config_path)?;
    Ok(true)
}
