use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::tempdir;

fn kanban() -> Command {
    let mut cmd = Command::cargo_bin("kanban").unwrap();
    cmd.env_remove("KANBAN_FILE").env_remove("KANBAN_USER");
    cmd
}

fn parse_json_output(output: &str) -> Value {
    serde_json::from_str(output).expect("Failed to parse JSON output")
}

fn extract_id(json: &Value) -> String {
    json["data"]["id"].as_str().unwrap().to_string()
}

/// Run a command that must succeed and return its parsed stdout.
fn run_ok(file: &Path, args: &[&str]) -> Value {
    let output = kanban()
        .arg("--file")
        .arg(file)
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    parse_json_output(&String::from_utf8_lossy(&output))
}

fn create_board(file: &Path, name: &str) -> String {
    extract_id(&run_ok(file, &["board", "create", "--name", name]))
}

fn create_list(file: &Path, board_id: &str, name: &str) -> String {
    extract_id(&run_ok(
        file,
        &["list", "create", "--board-id", board_id, "--name", name],
    ))
}

fn create_card(file: &Path, list_id: &str, name: &str) -> String {
    extract_id(&run_ok(
        file,
        &["card", "create", "--list-id", list_id, "--name", name],
    ))
}

fn card_names(json: &Value) -> Vec<String> {
    json["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect()
}

fn orders(json: &Value) -> Vec<i64> {
    json["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["order"].as_i64().unwrap())
        .collect()
}

mod board_tests {
    use super::*;

    #[test]
    fn test_board_create() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");

        let json = run_ok(&file, &["board", "create", "--name", "Test Board"]);
        assert!(json["success"].as_bool().unwrap());
        assert_eq!(json["data"]["name"], "Test Board");
        assert_eq!(json["data"]["owner_id"], "local");
        assert_eq!(json["data"]["members"][0]["role"], "admin");
    }

    #[test]
    fn test_board_list_only_shows_memberships() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");

        create_board(&file, "Mine");
        let json = run_ok(&file, &["board", "list"]);
        assert_eq!(json["data"]["count"], 1);

        let json = run_ok(&file, &["--user", "stranger", "board", "list"]);
        assert_eq!(json["data"]["count"], 0);
    }

    #[test]
    fn test_board_update_and_clear_description() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Roadmap");

        let json = run_ok(
            &file,
            &[
                "board",
                "update",
                "--id",
                &board_id,
                "--description",
                "Q3 goals",
                "--visibility",
                "team",
            ],
        );
        assert_eq!(json["data"]["description"], "Q3 goals");
        assert_eq!(json["data"]["visibility"], "team");

        let json = run_ok(
            &file,
            &["board", "update", "--id", &board_id, "--clear-description"],
        );
        assert!(json["data"]["description"].is_null());
        assert_eq!(json["data"]["visibility"], "team");
    }

    #[test]
    fn test_viewer_cannot_add_lists() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Roadmap");

        run_ok(
            &file,
            &[
                "board", "add-member", "--id", &board_id, "--member", "bo", "--name", "Bo",
                "--role", "viewer",
            ],
        );

        kanban()
            .arg("--file")
            .arg(&file)
            .args(["--user", "bo", "list", "create", "--board-id", &board_id, "--name", "Todo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot edit"));

        let json = run_ok(&file, &["--user", "bo", "board", "get", "--id", &board_id]);
        assert_eq!(json["data"]["members"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_board_delete_cascades() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Short lived");
        let list_id = create_list(&file, &board_id, "Todo");
        create_card(&file, &list_id, "Task");

        run_ok(&file, &["board", "delete", "--id", &board_id]);

        kanban()
            .arg("--file")
            .arg(&file)
            .args(["card", "list", "--list-id", &list_id])
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"success\":false"));
    }
}

mod list_tests {
    use super::*;

    #[test]
    fn test_lists_are_appended_in_order() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        for name in ["Todo", "Doing", "Done"] {
            create_list(&file, &board_id, name);
        }

        let json = run_ok(&file, &["list", "list", "--board-id", &board_id]);
        assert_eq!(card_names(&json), vec!["Todo", "Doing", "Done"]);
        assert_eq!(orders(&json), vec![0, 1, 2]);
    }

    #[test]
    fn test_list_move_renumbers() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        create_list(&file, &board_id, "Todo");
        create_list(&file, &board_id, "Doing");
        let done = create_list(&file, &board_id, "Done");

        let json = run_ok(&file, &["list", "move", "--id", &done, "--position", "0"]);
        assert_eq!(json["data"]["moved"], true);

        let json = run_ok(&file, &["list", "list", "--board-id", &board_id]);
        assert_eq!(card_names(&json), vec!["Done", "Todo", "Doing"]);
        assert_eq!(orders(&json), vec![0, 1, 2]);
    }

    #[test]
    fn test_list_move_in_place_is_noop() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let todo = create_list(&file, &board_id, "Todo");

        let json = run_ok(&file, &["list", "move", "--id", &todo, "--position", "0"]);
        assert_eq!(json["data"]["moved"], false);
        assert_eq!(json["data"]["writes"], 0);
    }

    #[test]
    fn test_list_delete_closes_gap() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        create_list(&file, &board_id, "Todo");
        let doing = create_list(&file, &board_id, "Doing");
        create_list(&file, &board_id, "Done");

        run_ok(&file, &["list", "delete", "--id", &doing]);

        let json = run_ok(&file, &["list", "list", "--board-id", &board_id]);
        assert_eq!(card_names(&json), vec!["Todo", "Done"]);
        assert_eq!(orders(&json), vec![0, 1]);
    }

    #[test]
    fn test_blank_list_name_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");

        kanban()
            .arg("--file")
            .arg(&file)
            .args(["list", "create", "--board-id", &board_id, "--name", "   "])
            .assert()
            .failure();
    }

    #[test]
    fn test_list_update_and_clear_wip_limit() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let list_id = create_list(&file, &board_id, "Todo");

        let json = run_ok(
            &file,
            &["list", "update", "--id", &list_id, "--name", "Doing", "--wip-limit", "3"],
        );
        assert_eq!(json["data"]["name"], "Doing");
        assert_eq!(json["data"]["wip_limit"], 3);
        assert_eq!(json["data"]["order"], 0);

        let json = run_ok(&file, &["list", "update", "--id", &list_id, "--clear-wip-limit"]);
        assert!(json["data"]["wip_limit"].is_null());

        let json = run_ok(&file, &["list", "list", "--board-id", &board_id]);
        assert_eq!(json["data"]["items"][0]["name"], "Doing");
    }

    #[test]
    fn test_list_update_without_changes_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let list_id = create_list(&file, &board_id, "Todo");

        kanban()
            .arg("--file")
            .arg(&file)
            .args(["list", "update", "--id", &list_id])
            .assert()
            .failure()
            .stderr(predicate::str::contains("nothing to update"));
    }
}

mod card_tests {
    use super::*;

    #[test]
    fn test_card_create_with_fields() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let list_id = create_list(&file, &board_id, "Todo");

        let json = run_ok(
            &file,
            &[
                "card",
                "create",
                "--list-id",
                &list_id,
                "--name",
                "Login page",
                "--priority",
                "high",
                "--points",
                "5",
                "--due-date",
                "2030-01-15",
                "--tags",
                "auth,ui",
            ],
        );
        assert_eq!(json["data"]["name"], "Login page");
        assert_eq!(json["data"]["priority"], "high");
        assert_eq!(json["data"]["story_points"], 5);
        assert_eq!(json["data"]["order"], 0);
        assert_eq!(json["data"]["tags"], serde_json::json!(["auth", "ui"]));
        assert!(json["data"]["due_date"]
            .as_str()
            .unwrap()
            .starts_with("2030-01-15"));
    }

    #[test]
    fn test_card_update_and_clear() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let list_id = create_list(&file, &board_id, "Todo");
        let card_id = create_card(&file, &list_id, "Task");

        let json = run_ok(
            &file,
            &[
                "card", "update", "--id", &card_id, "--status", "in-progress", "--points", "3",
                "--assignee", "u2:Bo",
            ],
        );
        assert_eq!(json["data"]["status"], "in-progress");
        assert_eq!(json["data"]["story_points"], 3);
        assert_eq!(json["data"]["assignee"]["name"], "Bo");

        let json = run_ok(
            &file,
            &["card", "update", "--id", &card_id, "--clear-points", "--clear-assignee"],
        );
        assert!(json["data"]["story_points"].is_null());
        assert!(json["data"]["assignee"].is_null());
        assert_eq!(json["data"]["status"], "in-progress");

        let json = run_ok(&file, &["card", "get", "--id", &card_id]);
        assert_eq!(json["data"]["status"], "in-progress");
    }

    #[test]
    fn test_card_update_without_changes_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let list_id = create_list(&file, &board_id, "Todo");
        let card_id = create_card(&file, &list_id, "Task");

        kanban()
            .arg("--file")
            .arg(&file)
            .args(["card", "update", "--id", &card_id])
            .assert()
            .failure()
            .stderr(predicate::str::contains("nothing to update"));
    }

    #[test]
    fn test_card_move_within_list() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let list_id = create_list(&file, &board_id, "Todo");
        let a = create_card(&file, &list_id, "A");
        create_card(&file, &list_id, "B");
        create_card(&file, &list_id, "C");

        run_ok(&file, &["card", "move", "--id", &a, "--position", "2"]);

        let json = run_ok(&file, &["card", "list", "--list-id", &list_id]);
        assert_eq!(card_names(&json), vec!["B", "C", "A"]);
        assert_eq!(orders(&json), vec![0, 1, 2]);
    }

    #[test]
    fn test_card_move_across_lists() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let todo = create_list(&file, &board_id, "Todo");
        let done = create_list(&file, &board_id, "Done");
        let a = create_card(&file, &todo, "A");
        create_card(&file, &todo, "B");
        create_card(&file, &done, "X");

        let json = run_ok(
            &file,
            &["card", "move", "--id", &a, "--list-id", &done, "--position", "99"],
        );
        assert_eq!(json["data"]["moved"], true);

        let json = run_ok(&file, &["card", "list", "--list-id", &todo]);
        assert_eq!(card_names(&json), vec!["B"]);
        assert_eq!(orders(&json), vec![0]);

        let json = run_ok(&file, &["card", "list", "--list-id", &done]);
        assert_eq!(card_names(&json), vec!["X", "A"]);
        assert_eq!(orders(&json), vec![0, 1]);

        let json = run_ok(&file, &["card", "list", "--board-id", &board_id]);
        assert_eq!(card_names(&json), vec!["B", "X", "A"]);
    }

    #[test]
    fn test_card_delete_renumbers_siblings() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let list_id = create_list(&file, &board_id, "Todo");
        let a = create_card(&file, &list_id, "A");
        create_card(&file, &list_id, "B");
        create_card(&file, &list_id, "C");

        let json = run_ok(&file, &["card", "delete", "--id", &a]);
        assert_eq!(json["data"]["deleted"], a);

        let json = run_ok(&file, &["card", "list", "--list-id", &list_id]);
        assert_eq!(card_names(&json), vec!["B", "C"]);
        assert_eq!(orders(&json), vec![0, 1]);
    }

    #[test]
    fn test_unknown_card_reports_error_json() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");

        kanban()
            .arg("--file")
            .arg(&file)
            .args(["card", "get", "--id", "00000000-0000-0000-0000-000000000000"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"success\":false"));
    }
}

mod content_tests {
    use super::*;

    fn card_on_new_board(file: &Path) -> (String, String) {
        let board_id = create_board(file, "Board");
        let list_id = create_list(file, &board_id, "Todo");
        (board_id.clone(), create_card(file, &list_id, "Task"))
    }

    #[test]
    fn test_comment_add_edit_list_delete() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let (_, card_id) = card_on_new_board(&file);

        let first = run_ok(&file, &["card", "comment", "add", "--card-id", &card_id, "--text", "first"]);
        assert_eq!(first["data"]["user_id"], "local");
        let first_id = extract_id(&first);
        run_ok(&file, &["card", "comment", "add", "--card-id", &card_id, "--text", "second @bo"]);

        let json = run_ok(
            &file,
            &["card", "comment", "edit", "--card-id", &card_id, "--id", &first_id, "--text", "first!"],
        );
        assert_eq!(json["data"]["text"], "first!");
        assert_eq!(json["data"]["edited"], true);

        let json = run_ok(&file, &["card", "comment", "list", "--card-id", &card_id]);
        assert_eq!(json["data"]["count"], 2);
        assert_eq!(json["data"]["items"][0]["text"], "second @bo");
        assert_eq!(json["data"]["items"][0]["mentions"][0], "bo");
        assert_eq!(json["data"]["items"][1]["text"], "first!");

        run_ok(&file, &["card", "comment", "delete", "--card-id", &card_id, "--id", &first_id]);
        let json = run_ok(&file, &["card", "comment", "list", "--card-id", &card_id]);
        assert_eq!(json["data"]["count"], 1);
    }

    #[test]
    fn test_only_author_edits_comment() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let (board_id, card_id) = card_on_new_board(&file);
        run_ok(
            &file,
            &[
                "board", "add-member", "--id", &board_id, "--member", "bo", "--name", "Bo",
                "--role", "editor",
            ],
        );
        let comment = run_ok(&file, &["card", "comment", "add", "--card-id", &card_id, "--text", "mine"]);
        let comment_id = extract_id(&comment);

        kanban()
            .arg("--file")
            .arg(&file)
            .args([
                "--user", "bo", "card", "comment", "edit", "--card-id", &card_id, "--id", &comment_id,
                "--text", "hijacked",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("belongs to another user"));

        let json = run_ok(&file, &["card", "comment", "list", "--card-id", &card_id]);
        assert_eq!(json["data"]["items"][0]["text"], "mine");
    }

    #[test]
    fn test_checklist_add_item_and_toggle() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let (_, card_id) = card_on_new_board(&file);

        let json = run_ok(&file, &["card", "checklist", "add", "--card-id", &card_id, "--title", "Release"]);
        let checklist_id = json["data"][0]["id"].as_str().unwrap().to_string();

        let json = run_ok(
            &file,
            &[
                "card", "checklist", "add-item", "--card-id", &card_id, "--checklist-id", &checklist_id,
                "--text", "Tag build",
            ],
        );
        let item = &json["data"][0]["items"][0];
        assert_eq!(item["done"], false);
        let item_id = item["id"].as_str().unwrap().to_string();

        let json = run_ok(
            &file,
            &[
                "card", "checklist", "toggle", "--card-id", &card_id, "--checklist-id", &checklist_id,
                "--item-id", &item_id,
            ],
        );
        assert_eq!(json["data"][0]["items"][0]["done"], true);

        let json = run_ok(&file, &["card", "get", "--id", &card_id]);
        assert_eq!(json["data"]["checklists"][0]["items"][0]["done"], true);
    }
}

mod sprint_tests {
    use super::*;

    #[test]
    fn test_sprint_lifecycle() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let list_id = create_list(&file, &board_id, "Todo");
        let card_id = extract_id(&run_ok(
            &file,
            &["card", "create", "--list-id", &list_id, "--name", "Task", "--points", "8"],
        ));

        let json = run_ok(
            &file,
            &[
                "sprint", "create", "--board-id", &board_id, "--name", "Sprint 1", "--start",
                "2030-01-01",
            ],
        );
        assert_eq!(json["data"]["number"], 1);
        assert_eq!(json["data"]["status"], "planning");
        let sprint_id = extract_id(&json);

        let json = run_ok(
            &file,
            &["sprint", "add-card", "--id", &sprint_id, "--card-id", &card_id],
        );
        assert_eq!(json["data"]["metrics"]["total_points"], 8);

        let json = run_ok(&file, &["card", "get", "--id", &card_id]);
        assert_eq!(json["data"]["sprint_id"], sprint_id);

        run_ok(&file, &["sprint", "activate", "--id", &sprint_id]);
        let json = run_ok(&file, &["board", "get", "--id", &board_id]);
        assert_eq!(json["data"]["active_sprint_id"], sprint_id);

        run_ok(&file, &["card", "update", "--id", &card_id, "--status", "done"]);
        let json = run_ok(&file, &["sprint", "complete", "--id", &sprint_id]);
        assert_eq!(json["data"]["status"], "done");
        assert_eq!(json["data"]["metrics"]["completed_points"], 8);

        let json = run_ok(&file, &["board", "get", "--id", &board_id]);
        assert!(json["data"]["active_sprint_id"].is_null());

        kanban()
            .arg("--file")
            .arg(&file)
            .args(["sprint", "cancel", "--id", &sprint_id])
            .assert()
            .failure();
    }

    #[test]
    fn test_sprint_notes_and_retro() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let sprint_id = extract_id(&run_ok(
            &file,
            &["sprint", "create", "--board-id", &board_id, "--name", "Sprint 1"],
        ));

        let json = run_ok(
            &file,
            &[
                "sprint", "note", "--id", &sprint_id, "--note", "API done", "--impediment",
                "CI flaky",
            ],
        );
        assert_eq!(json["data"]["daily_notes"][0]["impediments"][0], "CI flaky");

        let json = run_ok(
            &file,
            &[
                "sprint", "retro", "--id", &sprint_id, "--positive", "shipped", "--action",
                "fix CI",
            ],
        );
        assert_eq!(json["data"]["retrospective"]["action_items"][0], "fix CI");
        assert!(json["data"]["retrospective"]["held_at"].is_string());
    }

    #[test]
    fn test_sprint_list_and_delete() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let first = extract_id(&run_ok(
            &file,
            &["sprint", "create", "--board-id", &board_id, "--name", "One"],
        ));
        run_ok(
            &file,
            &["sprint", "create", "--board-id", &board_id, "--name", "Two"],
        );

        let json = run_ok(&file, &["sprint", "list", "--board-id", &board_id]);
        assert_eq!(json["data"]["count"], 2);

        run_ok(&file, &["sprint", "delete", "--id", &first]);
        let json = run_ok(&file, &["sprint", "list", "--board-id", &board_id]);
        assert_eq!(json["data"]["count"], 1);
    }
}

mod watch_tests {
    use super::*;

    #[test]
    fn test_watch_prints_current_board() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        let board_id = create_board(&file, "Board");
        let list_id = create_list(&file, &board_id, "Todo");
        create_card(&file, &list_id, "Task");

        let json = run_ok(
            &file,
            &["watch", "--board-id", &board_id, "--count", "1", "--interval-ms", "50"],
        );
        assert_eq!(json["data"]["lists"][0]["name"], "Todo");
        assert_eq!(json["data"]["lists"][0]["cards"][0], "Task");
    }
}

mod misc_tests {
    use super::*;

    #[test]
    fn test_missing_file_argument() {
        kanban()
            .env("HOME", tempdir().unwrap().path())
            .env("XDG_CONFIG_HOME", tempdir().unwrap().path())
            .args(["board", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--file"));
    }

    #[test]
    fn test_completions() {
        kanban()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("kanban"));
    }

    #[test]
    fn test_data_file_is_versioned_envelope() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.json");
        create_board(&file, "Board");

        let raw = std::fs::read_to_string(&file).unwrap();
        let envelope: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope["version"], 1);
        assert_eq!(envelope["data"]["boards"].as_array().unwrap().len(), 1);
    }
}
