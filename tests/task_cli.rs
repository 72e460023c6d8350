mod support;

use serde_json::Value;

use support::{TestDesk, USER_PASSWORD};

fn ids(value: &Value) -> Vec<String> {
    value["data"]["tasks"]
        .as_array()
        .expect("tasks")
        .iter()
        .map(|task| task["id"].as_str().expect("id").to_string())
        .collect()
}

#[test]
fn stats_count_statuses_and_overdue() {
    let desk = TestDesk::with_admin();
    let bo = desk.create_user("bo@example.com", "Bo", "user");

    let late = desk.create_task("Late", &bo, "2000-01-01");
    let done = desk.create_task("Done late", &bo, "2000-01-01T09:30");
    let busy = desk.create_task("Busy", &bo, "2099-01-01T00:00:00Z");

    desk.login("bo@example.com", USER_PASSWORD);
    desk.json(&["task", "status", &done, "completed"]);
    desk.json(&["task", "status", &busy, "in-progress"]);

    let stats = desk.json(&["task", "stats"]);
    assert_eq!(stats["data"]["user"], bo.as_str());
    assert_eq!(
        stats["data"]["stats"],
        serde_json::json!({
            "total": 3,
            "pending": 1,
            "inProgress": 1,
            "completed": 1,
            "overdue": 1,
        })
    );

    let mine = desk.json(&["task", "mine"]);
    assert_eq!(ids(&mine), vec![busy, done, late]);
    let late_view = &mine["data"]["tasks"][2];
    assert_eq!(late_view["overdue"], true);
    assert_eq!(late_view["assigneeName"], "Bo");
}

#[test]
fn status_update_changes_only_status() {
    let desk = TestDesk::with_admin();
    let bo = desk.create_user("bo@example.com", "Bo", "user");
    let id = desk.create_task("Write report", &bo, "2099-06-01");
    let before = desk.json(&["task", "show", &id]);

    desk.login("bo@example.com", USER_PASSWORD);
    let after = desk.json(&["task", "status", &id, "completed"]);

    for field in ["title", "description", "assignedTo", "deadline", "createdAt", "notes", "userNotes"] {
        assert_eq!(after["data"][field], before["data"][field], "{field} changed");
    }
    assert_eq!(before["data"]["status"], "pending");
    assert_eq!(after["data"]["status"], "completed");
}

#[test]
fn user_notes_and_foreign_tasks() {
    let desk = TestDesk::with_admin();
    let bo = desk.create_user("bo@example.com", "Bo", "user");
    let cy = desk.create_user("cy@example.com", "Cy", "user");
    let mine = desk.create_task("Mine", &bo, "2099-01-01");
    let theirs = desk.create_task("Theirs", &cy, "2099-01-01");

    desk.login("bo@example.com", USER_PASSWORD);
    let noted = desk.json(&["task", "note", &mine, "waiting on review"]);
    assert_eq!(noted["data"]["userNotes"], "waiting on review");

    // Someone else's task reads as missing.
    desk.json_failure(&["task", "status", &theirs, "completed"], 2);
    desk.json_failure(&["task", "show", &theirs], 2);
    assert_eq!(ids(&desk.json(&["task", "mine"])), vec![mine]);
}

#[test]
fn admin_list_resolves_unknown_assignee() {
    let desk = TestDesk::with_admin();
    let bo = desk.create_user("bo@example.com", "Bo", "user");
    let id = desk.create_task("Handover", &bo, "2099-01-01");
    desk.json(&["user", "delete", &bo]);

    let list = desk.json(&["task", "list"]);
    assert_eq!(ids(&list), vec![id]);
    assert_eq!(list["data"]["tasks"][0]["assigneeName"], "Unknown");
    assert_eq!(list["data"]["tasks"][0]["assignedTo"], bo.as_str());
}

#[test]
fn unknown_assignee_label_is_configurable() {
    let desk = TestDesk::new();
    desk.write_config("[tasks]\nunknown_assignee = \"(former staff)\"\n")
        .expect("config");
    desk.init();
    desk.login(support::ADMIN_EMAIL, support::ADMIN_PASSWORD);
    let bo = desk.create_user("bo@example.com", "Bo", "user");
    desk.create_task("Handover", &bo, "2099-01-01");
    desk.json(&["user", "delete", &bo]);

    let list = desk.json(&["task", "list"]);
    assert_eq!(list["data"]["tasks"][0]["assigneeName"], "(former staff)");
}

#[test]
fn admin_update_keeps_created_at() {
    let desk = TestDesk::with_admin();
    let bo = desk.create_user("bo@example.com", "Bo", "user");
    let cy = desk.create_user("cy@example.com", "Cy", "user");
    let id = desk.create_task("Plan", &bo, "2099-01-01");
    let before = desk.json(&["task", "show", &id]);

    let after = desk.json(&[
        "task",
        "update",
        &id,
        "--title",
        "Plan v2",
        "--assign",
        &cy,
        "--deadline",
        "2099-02-01",
        "--notes",
        "reassigned",
    ]);
    assert_eq!(after["data"]["title"], "Plan v2");
    assert_eq!(after["data"]["assignedTo"], cy.as_str());
    assert_eq!(after["data"]["assigneeName"], "Cy");
    assert_eq!(after["data"]["deadline"], "2099-02-01T00:00:00Z");
    assert_eq!(after["data"]["notes"], "reassigned");
    assert_eq!(after["data"]["createdAt"], before["data"]["createdAt"]);
}

#[test]
fn delete_removes_task() {
    let desk = TestDesk::with_admin();
    let bo = desk.create_user("bo@example.com", "Bo", "user");
    let keep = desk.create_task("Keep", &bo, "2099-01-01");
    let gone = desk.create_task("Gone", &bo, "2099-01-01");

    let deleted = desk.json(&["task", "delete", &gone]);
    assert_eq!(deleted["data"]["removed"], true);
    assert_eq!(ids(&desk.json(&["task", "list"])), vec![keep]);
    desk.json_failure(&["task", "show", &gone], 2);
}

#[test]
fn task_creation_validates_input() {
    let desk = TestDesk::with_admin();
    let bo = desk.create_user("bo@example.com", "Bo", "user");

    desk.json_failure(
        &["task", "new", "X", "--assign", "nobody", "--deadline", "2099-01-01"],
        2,
    );
    desk.json_failure(
        &["task", "new", "X", "--assign", &bo, "--deadline", "soon"],
        2,
    );
    desk.json_failure(
        &[
            "task", "new", "X", "--assign", &bo, "--deadline", "2099-01-01", "--status", "done",
        ],
        2,
    );
}

#[test]
fn roles_are_gated_both_ways() {
    let desk = TestDesk::with_admin();
    desk.create_user("bo@example.com", "Bo", "user");

    // Admins have no personal dashboard.
    let value = desk.json_failure(&["task", "mine"], 3);
    assert_eq!(value["error"]["details"]["redirect_to"], "/admin");

    desk.login("bo@example.com", USER_PASSWORD);
    let value = desk.json_failure(&["task", "list"], 3);
    assert_eq!(value["error"]["details"]["redirect_to"], "/dashboard");
    desk.json_failure(&["task", "stats", "--user", "someone-else"], 3);
}

#[test]
fn admin_stats_cover_everyone() {
    let desk = TestDesk::with_admin();
    let bo = desk.create_user("bo@example.com", "Bo", "user");
    let cy = desk.create_user("cy@example.com", "Cy", "user");
    desk.create_task("A", &bo, "2000-01-01");
    desk.create_task("B", &cy, "2099-01-01");

    let all = desk.json(&["task", "stats"]);
    assert_eq!(all["data"]["stats"]["total"], 2);
    assert_eq!(all["data"]["stats"]["overdue"], 1);
    assert!(all["data"].get("user").is_none());

    let only_cy = desk.json(&["task", "stats", "--user", &cy]);
    assert_eq!(only_cy["data"]["stats"]["total"], 1);
    assert_eq!(only_cy["data"]["stats"]["overdue"], 0);
}
