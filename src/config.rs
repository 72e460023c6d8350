//! Configuration loading and management
//!
//! Handles parsing of `.taskdesk.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::storage::CONFIG_FILE;

/// Upper bound accepted for `backend.timeout_ms`
const MAX_TIMEOUT_MS: u64 = 600_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Task presentation configuration
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Local backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Data directory, relative to the root
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How long a backend call may wait on a lock before failing
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".taskdesk")
}

fn default_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Task presentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Label shown when a task's assignee has no profile
    #[serde(default = "default_unknown_assignee")]
    pub unknown_assignee: String,

    /// chrono format string for deadlines in human output
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_unknown_assignee() -> String {
    "Unknown".to_string()
}

fn default_date_format() -> String {
    "%b %-d, %Y".to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            unknown_assignee: default_unknown_assignee(),
            date_format: default_date_format(),
        }
    }
}

impl Config {
    /// Load configuration from a `.taskdesk.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the root, or return defaults if absent
    ///
    /// Unlike a missing file, an unreadable or invalid file is an error.
    pub fn load_from_root(root: &Path) -> crate::error::Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path).map_err(|err| match err {
                crate::error::Error::TomlParse(parse) => {
                    crate::error::Error::InvalidConfig(format!("{CONFIG_FILE}: {parse}"))
                }
                other => other,
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.backend.validate()?;
        self.tasks.validate()?;
        Ok(())
    }
}

impl BackendConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "backend.data_dir cannot be empty".to_string(),
            ));
        }
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(crate::error::Error::InvalidConfig(format!(
                "backend.timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

impl TasksConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.unknown_assignee.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "tasks.unknown_assignee cannot be empty".to_string(),
            ));
        }
        if self.date_format.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "tasks.date_format cannot be empty".to_string(),
            ));
        }
        if chrono::format::StrftimeItems::new(&self.date_format)
            .any(|item| matches!(item, chrono::format::Item::Error))
        {
            return Err(crate::error::Error::InvalidConfig(format!(
                "tasks.date_format is not a valid strftime pattern: {}",
                self.date_format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.backend.data_dir, PathBuf::from(".taskdesk"));
        assert_eq!(cfg.backend.timeout_ms, 5000);
        assert_eq!(cfg.tasks.unknown_assignee, "Unknown");
        assert_eq!(cfg.tasks.date_format, "%b %-d, %Y");
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[backend]
data_dir = "state"
timeout_ms = 250

[tasks]
unknown_assignee = "(removed)"
date_format = "%Y-%m-%d"
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.backend.data_dir, PathBuf::from("state"));
        assert_eq!(cfg.backend.timeout_ms, 250);
        assert_eq!(cfg.tasks.unknown_assignee, "(removed)");
        assert_eq!(cfg.tasks.date_format, "%Y-%m-%d");
    }

    #[test]
    fn zero_timeout_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[backend]\ntimeout_ms = 0").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            crate::error::Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_date_format_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[tasks]\ndate_format = \"%Q\"").expect("write config");

        assert!(matches!(
            Config::load(&path),
            Err(crate::error::Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_from_root_defaults_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from_root(dir.path()).expect("defaults");
        assert_eq!(cfg.backend.timeout_ms, 5000);
    }

    #[test]
    fn load_from_root_reports_broken_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CONFIG_FILE), "this = [not valid").expect("write config");

        let err = Config::load_from_root(dir.path()).expect_err("broken config");
        assert!(matches!(err, crate::error::Error::InvalidConfig(_)));
    }

    #[test]
    fn save_writes_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.toml");
        Config::default().save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("unknown_assignee = \"Unknown\""));
        assert!(written.contains("timeout_ms = 5000"));
    }
}
