mod support;

use predicates::str::contains;

use support::TestDesk;

#[test]
fn broken_config_fails_every_command() {
    let desk = TestDesk::new();
    desk.write_config("[backend\ndata_dir = ").expect("config");

    let value = desk.json_failure(&["whoami"], 2);
    assert!(value["error"]["message"]
        .as_str()
        .expect("message")
        .contains("Invalid configuration"));
    assert_eq!(value["next_steps"][0], "fix .taskdesk.toml then retry");
}

#[test]
fn out_of_range_timeout_is_rejected() {
    let desk = TestDesk::new();
    desk.write_config("[backend]\ntimeout_ms = 0\n").expect("config");

    desk.cmd()
        .arg("init")
        .assert()
        .code(2)
        .stderr(contains("timeout_ms"));
}

#[test]
fn custom_data_dir_is_used() {
    let desk = TestDesk::new();
    desk.write_config("[backend]\ndata_dir = \"state\"\n")
        .expect("config");
    desk.init();

    assert!(desk.path().join("state/identity/accounts.json").is_file());
    assert!(!desk.data_dir().exists());
}

#[test]
fn root_flag_overrides_current_dir() {
    let desk = TestDesk::new();
    let elsewhere = tempfile::tempdir().expect("tempdir");

    let mut cmd = desk.cmd();
    cmd.current_dir(elsewhere.path())
        .arg("--root")
        .arg(desk.path())
        .args([
            "init",
            "--admin-email",
            support::ADMIN_EMAIL,
            "--admin-password",
            support::ADMIN_PASSWORD,
            "--admin-name",
            support::ADMIN_NAME,
        ])
        .assert()
        .success();

    assert!(desk.path().join(".taskdesk.toml").is_file());
    assert!(!elsewhere.path().join(".taskdesk.toml").exists());
}
