//! Integration tests for the transcript-recorder CLI.
//!
//! These run the binary and check its JSON output and exit codes.

use std::fs;
use std::process::Command;

use serde_json::json;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_transcript-recorder"))
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("stdout is not JSON ({}): {}", e, stdout))
}

#[test]
fn test_help_exits_zero() {
    let output = binary().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--record"));
    assert!(stdout.contains("--merge"));
}

#[test]
fn test_unknown_argument_fails_with_stderr() {
    let output = binary().arg("--bogus").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown argument"));
}

#[test]
fn test_check_permissions_outputs_json() {
    let output = binary().arg("--check-permissions").output().unwrap();
    let json = stdout_json(&output);
    assert!(json["enabled"].is_boolean());
    assert!(json["message"].is_string());
}

#[test]
fn test_replay_exports_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("apps.json");
    let tree = dir.path().join("tree.json");
    let out = dir.path().join("out");

    fs::write(
        &config,
        json!({
            "slack": {
                "base_transcript_directory": "ignored",
                "app_names": ["Slack"],
                "rules_to_find_transcript_table": [{
                    "steps": [{"role": "AXGroup", "description_contains": "huddle", "search_scope": {"levels_deep": 0}}]
                }]
            }
        })
        .to_string(),
    )
    .unwrap();
    fs::write(
        &tree,
        json!({
            "role": "AXApplication",
            "children": [{
                "role": "AXGroup",
                "description": "Huddle captions",
                "children": [
                    {"role": "AXStaticText", "value": "Morning all"},
                    {"role": "AXButton", "value": "Leave"},
                    {"role": "AXStaticText", "value": "Let's start"}
                ]
            }]
        })
        .to_string(),
    )
    .unwrap();

    let output = binary()
        .args(["--replay"])
        .arg(&config)
        .arg("slack")
        .arg(&tree)
        .arg("--output")
        .arg(&out)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json["exported"], true);
    assert_eq!(json["snapshot"]["text_element_count"], 2);

    let path = json["snapshot"]["file_path"].as_str().unwrap();
    assert!(path.starts_with(out.to_str().unwrap()));
    assert_eq!(fs::read_to_string(path).unwrap(), "Morning all\nLet's start\n");
}

#[test]
fn test_replay_without_match_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("apps.json");
    let tree = dir.path().join("tree.json");
    fs::write(
        &config,
        json!({"webex": {
            "base_transcript_directory": dir.path().join("out"),
            "rules_to_find_transcript_table": [{"steps": [{"role": "AXTable"}]}]
        }})
        .to_string(),
    )
    .unwrap();
    fs::write(&tree, json!({"role": "AXApplication"}).to_string()).unwrap();

    let output = binary().arg("--replay").arg(&config).arg("webex").arg(&tree).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["exported"], false);
}

#[test]
fn test_merge_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.txt");
    let second = dir.path().join("b.txt");
    let merged = dir.path().join("merged.txt");
    fs::write(&first, "1\n2\n3\n4\n5\n6\n").unwrap();
    fs::write(&second, "2\n3\n4\n5\n6\n7\n8\n").unwrap();

    let output = binary().arg("--merge").arg(&merged).arg(&first).arg(&second).output().unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["overlap_count"], 5);
    assert_eq!(json["line_count"], 8);
    assert_eq!(fs::read_to_string(&merged).unwrap(), "1\n2\n3\n4\n5\n6\n7\n8\n");
}
