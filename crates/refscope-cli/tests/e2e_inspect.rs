//! E2E tests for `refscope inspect` and project configuration.

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
depends_on = ["Mesh", "Editor/Gizmo"]

[entities.Orphan]
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

fn inspect_json(dir: &Path, args: &[&str]) -> Value {
    let output = refscope_cmd(dir)
        .arg("inspect")
        .arg("scene.toml")
        .args(args)
        .arg("--json")
        .output()
        .expect("inspect should not crash");
    assert!(
        output.status.success(),
        "inspect failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

fn has_edge(json: &Value, source: &str, target: &str) -> bool {
    json["relations"]
        .as_array()
        .expect("relations array")
        .iter()
        .any(|edge| edge["source"] == source && edge["target"] == target)
}

#[test]
fn inspect_json_reports_wrapper_root_and_grouped_parts() {
    let dir = project();
    let json = inspect_json(dir.path(), &["Scene"]);

    let roots = json["roots"].as_array().expect("roots array");
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["id"], "{Scene}");
    assert_eq!(roots[0]["label"], "Scene");

    assert!(has_edge(&json, "{Scene}", "{Player, PlayerCollider}"));
    assert!(has_edge(&json, "{Scene}", "Enemy"));
    assert!(has_edge(&json, "Enemy", "Editor/Gizmo"));
    // Mesh hangs under the grouped parts only, which were still open when
    // Enemy was expanded.
    assert!(!has_edge(&json, "Enemy", "Mesh"));
    assert_eq!(json["graph"]["edge_count"], 5);
    assert_eq!(json["session"]["clusters_created"], 2);
}

#[test]
fn inspect_text_lists_one_edge_per_line() {
    let dir = project();
    refscope_cmd(dir.path())
        .args(["inspect", "scene.toml", "Scene", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("root {Scene}\n"))
        .stdout(predicate::str::contains("Enemy -> Editor/Gizmo\n"));
}

#[test]
fn inspect_pretty_draws_tree_with_anchor_label() {
    let dir = project();
    refscope_cmd(dir.path())
        .args(["inspect", "scene.toml", "Scene", "--format", "pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dependencies of Scene"))
        .stdout(predicate::str::contains("── Player\n"))
        .stdout(predicate::str::contains("── Enemy\n"));
}

#[test]
fn unreferenced_target_is_a_placeholder_root() {
    let dir = project();
    let json = inspect_json(dir.path(), &["Orphan"]);

    let roots = json["roots"].as_array().expect("roots array");
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["label"], "Orphan (unreferenced)");
    assert_eq!(roots[0]["placeholder"], true);
}

#[test]
fn project_config_excludes_prefixes() {
    let dir = project();
    std::fs::write(
        dir.path().join("refscope.toml"),
        "[scan]\nexclude_prefixes = [\"Editor/\"]\n",
    )
    .expect("write config");

    let json = inspect_json(dir.path(), &["Scene"]);
    assert!(!has_edge(&json, "Enemy", "Editor/Gizmo"));
    assert!(has_edge(&json, "{Scene}", "Enemy"));
    assert!(has_edge(&json, "{Player, PlayerCollider}", "Mesh"));
}

#[test]
fn project_config_supplies_default_targets() {
    let dir = project();
    std::fs::write(
        dir.path().join("refscope.toml"),
        "[scan]\ndefault_targets = [\"Enemy\"]\n",
    )
    .expect("write config");

    let json = inspect_json(dir.path(), &[]);
    assert_eq!(json["targets"], serde_json::json!(["Enemy"]));
}

#[test]
fn missing_facts_file_reports_code() {
    let dir = TempDir::new().expect("tempdir");
    refscope_cmd(dir.path())
        .args(["inspect", "missing.toml", "Scene", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

#[test]
fn unknown_target_reports_code() {
    let dir = project();
    refscope_cmd(dir.path())
        .args(["inspect", "scene.toml", "Nobody", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2004"))
        .stderr(predicate::str::contains("Nobody"));
}

#[test]
fn malformed_project_config_reports_code() {
    let dir = project();
    std::fs::write(dir.path().join("refscope.toml"), "[scan\n").expect("write config");
    refscope_cmd(dir.path())
        .args(["inspect", "scene.toml", "Scene", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}
