// Drives the compiled binary against a throwaway database and config.
use assert_cmd::Command;
use std::path::Path;
use tempfile::tempdir;

fn gamestats(dir: &Path) -> Command {
    gamestats_at(dir, "user/cli-test")
}

fn gamestats_at(dir: &Path, root: &str) -> Command {
    let mut cmd = Command::cargo_bin("gamestats").unwrap();
    cmd.arg("--db")
        .arg(dir.join("settings.db"))
        .arg("--config")
        .arg(dir.join("config.json"))
        .arg("--root")
        .arg(root);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {:?}", output);
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn fresh_database_reports_nothing() {
    let dir = tempdir().unwrap();
    let out = stdout_of(gamestats(dir.path()).arg("show"));
    assert!(out.starts_with("Game Statistics"));
    assert!(out.trim_end().ends_with("No statistics gathered."));
}

#[test]
fn played_games_show_in_report() {
    let dir = tempdir().unwrap();
    gamestats(dir.path())
        .args(["play", "won", "--moves", "10", "--score", "50"])
        .assert()
        .success();
    gamestats(dir.path())
        .args(["play", "lost", "--moves", "3", "--score", "30"])
        .assert()
        .success();

    let out = stdout_of(gamestats(dir.path()).args(["--name", "Klondike", "show"]));
    assert!(out.starts_with("Klondike Game Statistics"));
    assert!(out.contains("Games started: 2"));
    assert!(out.contains("Games won: 1"));
    assert!(out.contains("Games lost: 1"));
    assert!(out.contains("Highest score: 50"));
    assert!(out.contains("Least moves made: 10"));
    assert!(out.contains("Most moves made: 10"));
    assert!(out.contains("Quickest time: "));
}

#[test]
fn custom_counters_round_trip() {
    let dir = tempdir().unwrap();
    assert_eq!(stdout_of(gamestats(dir.path()).args(["custom", "incr", "Foo"])), "1\n");
    assert_eq!(stdout_of(gamestats(dir.path()).args(["custom", "incr", "Foo"])), "2\n");
    assert_eq!(stdout_of(gamestats(dir.path()).args(["custom", "decr", "Foo"])), "1\n");
    assert_eq!(stdout_of(gamestats(dir.path()).args(["custom", "get", "Foo"])), "1\n");

    gamestats(dir.path())
        .args(["custom", "reset", "Foo"])
        .assert()
        .success();
    assert_eq!(stdout_of(gamestats(dir.path()).args(["custom", "get", "Foo"])), "0\n");
}

#[test]
fn reset_clears_report() {
    let dir = tempdir().unwrap();
    gamestats(dir.path())
        .args(["play", "won", "--score", "5"])
        .assert()
        .success();
    gamestats(dir.path()).arg("reset").assert().success();

    let out = stdout_of(gamestats(dir.path()).arg("show"));
    assert!(out.contains("No statistics gathered."));
}

#[test]
fn reset_fails_for_unsupported_root() {
    let dir = tempdir().unwrap();
    gamestats_at(dir.path(), "elsewhere/game")
        .arg("reset")
        .assert()
        .failure();
}

#[test]
fn export_writes_report_file() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("report.txt");
    gamestats(dir.path())
        .args(["play", "tied"])
        .assert()
        .success();
    gamestats(dir.path())
        .arg("export")
        .arg(&target)
        .assert()
        .success();

    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains("Games tied: 1"));
}

#[test]
fn custom_counter_at_max_stays_at_max() {
    let dir = tempdir().unwrap();
    let max = i64::MAX.to_string();
    assert_eq!(
        stdout_of(gamestats(dir.path()).args(["custom", "set", "Foo", max.as_str()])),
        format!("{max}\n")
    );
    assert_eq!(
        stdout_of(gamestats(dir.path()).args(["custom", "incr", "Foo"])),
        format!("{max}\n")
    );
}

#[test]
fn discarded_moves_leave_move_extrema_alone() {
    let dir = tempdir().unwrap();
    gamestats(dir.path())
        .args(["play", "won", "--moves", "6"])
        .assert()
        .success();
    gamestats(dir.path())
        .args(["play", "done", "--moves", "2", "--discard-moves"])
        .assert()
        .success();

    let out = stdout_of(gamestats(dir.path()).arg("show"));
    assert!(out.contains("Least moves made: 6"));
    assert!(out.contains("Most moves made: 6"));
}

#[test]
fn saved_config_supplies_defaults() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    gamestats(dir.path())
        .args(["--name", "Hearts", "config", "--save"])
        .assert()
        .success();

    let saved = std::fs::read_to_string(&config).unwrap();
    assert!(saved.contains("user/cli-test"));
    assert!(saved.contains("Hearts"));

    // no --db/--root/--name: everything comes from the saved file
    let mut cmd = Command::cargo_bin("gamestats").unwrap();
    cmd.arg("--config").arg(&config).args(["play", "tied"]);
    cmd.assert().success();

    let out = stdout_of(gamestats(dir.path()).arg("show"));
    assert!(out.starts_with("Game Statistics"));
    assert!(out.contains("Games tied: 1"));

    let mut cmd = Command::cargo_bin("gamestats").unwrap();
    cmd.arg("--config").arg(&config).arg("show");
    assert!(stdout_of(&mut cmd).starts_with("Hearts Game Statistics"));
}
