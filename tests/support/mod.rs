#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-secret";
pub const ADMIN_NAME: &str = "Root Admin";
pub const USER_PASSWORD: &str = "user-secret";

/// A taskdesk workspace in a temp directory
pub struct TestDesk {
    dir: TempDir,
}

impl TestDesk {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    /// Workspace with the first admin bootstrapped and signed in
    pub fn with_admin() -> Self {
        let desk = Self::new();
        desk.init();
        desk.login(ADMIN_EMAIL, ADMIN_PASSWORD);
        desk
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join(".taskdesk")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskdesk").expect("binary");
        cmd.current_dir(self.dir.path())
            .env_remove("TASKDESK_ROOT")
            .env_remove("TASKDESK_PASSWORD")
            .env_remove("TASKDESK_NEW_PASSWORD")
            .env_remove("TASKDESK_ADMIN_PASSWORD")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn init(&self) {
        self.cmd()
            .args([
                "init",
                "--admin-email",
                ADMIN_EMAIL,
                "--admin-password",
                ADMIN_PASSWORD,
                "--admin-name",
                ADMIN_NAME,
            ])
            .assert()
            .success();
    }

    pub fn login(&self, email: &str, password: &str) {
        self.cmd()
            .args(["login", "--email", email, "--password", password])
            .assert()
            .success();
    }

    /// Run a command with `--json`, expect success, return the envelope
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    /// Run a command with `--json`, expect the given exit code, return the envelope
    pub fn json_failure(&self, args: &[&str], code: i32) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .code(code)
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json error envelope")
    }

    /// Create a user through the CLI (caller must be signed in as admin)
    pub fn create_user(&self, email: &str, name: &str, role: &str) -> String {
        let value = self.json(&[
            "user",
            "create",
            "--email",
            email,
            "--password",
            USER_PASSWORD,
            "--name",
            name,
            "--role",
            role,
        ]);
        value["data"]["id"].as_str().expect("user id").to_string()
    }

    /// Create a task through the CLI (caller must be signed in as admin)
    pub fn create_task(&self, title: &str, assignee: &str, deadline: &str) -> String {
        let value = self.json(&[
            "task",
            "new",
            title,
            "--assign",
            assignee,
            "--deadline",
            deadline,
        ]);
        value["data"]["id"].as_str().expect("task id").to_string()
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(".taskdesk.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }
}
