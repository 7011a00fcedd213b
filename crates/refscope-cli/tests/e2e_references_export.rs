//! E2E tests for `refscope references`, `refscope export` and
//! `refscope completions`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

const SCENE: &str = r#"
scan_roots = ["Scene"]

[entities.Scene]
depends_on = ["Player", "PlayerCollider", "Enemy"]

[entities.Player]
depends_on = ["Mesh", "Material"]

[entities.PlayerCollider]
owner = "Player"
depends_on = ["Mesh", "Material"]

[entities.Enemy]
depends_on = ["Mesh", "Sword"]

[entities.Level2]
depends_on = ["Boss"]

[entities.Boss]
depends_on = ["Sword"]
"#;

fn refscope_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("refscope"));
    cmd.current_dir(dir);
    cmd.env("REFSCOPE_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

fn project() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("scene.toml"), SCENE).expect("write facts");
    dir
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

#[test]
fn references_groups_referencers_of_target() {
    let dir = project();
    let json = json_output(
        refscope_cmd(dir.path()).args(["references", "scene.toml", "Mesh", "--json"]),
    );

    assert_eq!(json["target"], "Mesh");
    assert_eq!(json["scan_roots"], serde_json::json!(["Scene"]));
    let roots = json["roots"].as_array().expect("roots array");
    assert_eq!(roots.len(), 1);
    assert_eq!(
        roots[0]["members"],
        serde_json::json!(["Enemy", "Player", "PlayerCollider"])
    );
}

#[test]
fn references_with_explicit_scan_roots_merge() {
    let dir = project();
    let json = json_output(refscope_cmd(dir.path()).args([
        "references",
        "scene.toml",
        "Sword",
        "--scan-root",
        "Scene",
        "--scan-root",
        "Level2",
        "--json",
    ]));

    // Enemy is found from Scene, Boss from Level2; both reference Sword.
    let members: Vec<&str> = json["roots"]
        .as_array()
        .expect("roots array")
        .iter()
        .flat_map(|root| {
            root["members"]
                .as_array()
                .map(|m| m.iter().filter_map(Value::as_str).collect::<Vec<_>>())
                .unwrap_or_else(|| root["id"].as_str().into_iter().collect())
        })
        .collect();
    assert!(members.contains(&"Enemy"));
    assert!(members.contains(&"Boss"));
    assert_eq!(json["session"]["scans"], 2);

    let enemy = json["roots"]
        .as_array()
        .expect("roots array")
        .iter()
        .find(|root| root["id"] == "Enemy")
        .expect("Enemy root");
    assert_eq!(enemy["found_in"], serde_json::json!(["Scene"]));
    assert_eq!(enemy["label"], "Enemy\nin Scene");
}

#[test]
fn references_unknown_scan_root_reports_code() {
    let dir = project();
    refscope_cmd(dir.path())
        .args(["references", "scene.toml", "Mesh", "--scan-root", "Nowhere", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2003"));
}

#[test]
fn references_text_uses_arrow_towards_target() {
    let dir = project();
    refscope_cmd(dir.path())
        .args(["references", "scene.toml", "Mesh", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("{Enemy, Player, PlayerCollider} <- {Scene}"));
}

#[test]
fn export_json_lists_graph() {
    let dir = project();
    let json = json_output(refscope_cmd(dir.path()).args(["export", "scene.toml", "Scene"]));

    assert_eq!(json["stats"]["edge_count"], 5);
    assert_eq!(json["edges"].as_array().map(Vec::len), Some(5));
    assert!(
        json["nodes"]
            .as_array()
            .expect("nodes array")
            .iter()
            .any(|node| node["label"] == "Player" && node["kind"] == "cluster")
    );
}

#[test]
fn export_dot_to_file() {
    let dir = project();
    refscope_cmd(dir.path())
        .args(["export", "scene.toml", "Scene", "--dot", "--output", "scene.dot"])
        .assert()
        .success();

    let dot = std::fs::read_to_string(dir.path().join("scene.dot")).expect("dot file");
    assert!(dot.starts_with("digraph {"));
    assert!(dot.contains("Sword"));
    assert!(dot.contains("->"));
}

#[test]
fn completions_emit_bash_script() {
    let dir = TempDir::new().expect("tempdir");
    refscope_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("refscope"));
}
