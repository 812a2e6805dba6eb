use std::{fs, path::PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

fn fixture_copy() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let target = dir.path().join("fixture.gfa");
    fs::copy(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/fixture.gfa"),
        &target,
    )
    .unwrap();
    (dir, target)
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn test_cli_exits_with_success_on_help() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_genograph"));
    cmd.arg("--help");
    let out = stdout_of(&mut cmd);
    assert!(out.contains("Usage: genograph"));
}

#[test]
fn test_cli_rejects_unknown_flag() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_genograph"));
    cmd.arg("--bogus");
    cmd.assert().code(2);
}

#[test]
fn test_cli_parse_reports_counts() {
    let (_dir, input) = fixture_copy();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_genograph"));
    cmd.args(["parse", "--input", input.to_str().unwrap()]);
    let out = stdout_of(&mut cmd);
    assert_eq!(out.trim(), "graph=fixture.gfa nodes=8 genomes=2");
}

#[test]
fn test_cli_status_without_store() {
    let (_dir, input) = fixture_copy();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_genograph"));
    cmd.args(["--command", "status", "--input", input.to_str().unwrap()]);
    let out = stdout_of(&mut cmd);
    assert!(out.starts_with("no store for"));
}

#[test]
fn test_cli_subgraph_command() {
    let (_dir, input) = fixture_copy();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_genograph"));
    cmd.args([
        "subgraph",
        "--input",
        input.to_str().unwrap(),
        "--center",
        "4",
        "--radius",
        "1",
    ]);
    let out = stdout_of(&mut cmd);
    assert_eq!(out, "nodes=2,4,5\nroots=2\nends=5\n");
}

#[test]
fn test_cli_topo_command() {
    let (_dir, input) = fixture_copy();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_genograph"));
    cmd.args([
        "topo",
        "--input",
        input.to_str().unwrap(),
        "--center",
        "1",
        "--radius",
        "10",
    ]);
    let out = stdout_of(&mut cmd);
    assert_eq!(out.trim(), "1,2,4,5,6,7,8,3");
}

#[test]
fn test_cli_layout_emits_json() {
    let (_dir, input) = fixture_copy();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_genograph"));
    cmd.args([
        "layout",
        "--input",
        input.to_str().unwrap(),
        "--center",
        "4",
        "--radius",
        "2",
    ]);
    let out = stdout_of(&mut cmd);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(!json["layers"].as_array().unwrap().is_empty());
}

#[test]
fn test_cli_subgraph_requires_center() {
    let (_dir, input) = fixture_copy();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_genograph"));
    cmd.args(["subgraph", "--input", input.to_str().unwrap()]);
    cmd.assert().code(1);
}

#[test]
fn test_cli_remove_deletes_store() {
    let (dir, input) = fixture_copy();
    let mut parse = Command::new(env!("CARGO_BIN_EXE_genograph"));
    parse.args(["parse", "--input", input.to_str().unwrap()]);
    parse.assert().success();
    assert!(dir.path().join("caches/fixture.genograph.db").exists());

    let mut remove = Command::new(env!("CARGO_BIN_EXE_genograph"));
    remove.args(["remove", "--input", input.to_str().unwrap()]);
    let out = stdout_of(&mut remove);
    assert_eq!(out.trim(), "removed=true");
    assert!(!dir.path().join("caches/fixture.genograph.db").exists());
}
