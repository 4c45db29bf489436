//! CLI command integration tests.
//! Each test uses a temp directory via RCXI_DATA_DIR for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn rcxi_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("rcxi").unwrap();
    cmd.env("RCXI_DATA_DIR", data_dir.path());
    cmd
}

fn write_input(dir: &TempDir, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

#[test]
fn sessions_fresh_db() {
    let dir = TempDir::new().unwrap();
    rcxi_cmd(&dir)
        .arg("sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("(no sessions)"));
}

#[test]
fn run_prints_steps_and_snapshot() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "thoughts.txt",
        &["the web trembles", "", "a thread pulls taut", "the web trembles"],
    );

    let output = rcxi_cmd(&dir)
        .args(["run", "--seed", "42"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    // Blank lines are skipped
    assert_eq!(stdout.lines().filter(|l| l.starts_with('#')).count(), 3);
    assert!(stdout.contains("#1    accumulating"));

    let json_start = stdout.find('{').unwrap();
    let record: serde_json::Value = serde_json::from_str(&stdout[json_start..]).unwrap();
    for key in ["tension", "exceedsThreshold", "glyphPeaks", "meanActivation", "stability"] {
        assert!(record.get(key).is_some(), "missing {key}");
    }
}

#[test]
fn run_twice_resumes_session() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "a.txt", &["one", "two"]);

    rcxi_cmd(&dir)
        .args(["run", "--seed", "1"])
        .arg(&input)
        .assert()
        .success();
    rcxi_cmd(&dir)
        .args(["run", "--seed", "1"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("#3 "))
        .stdout(predicate::str::contains("#4 "));

    rcxi_cmd(&dir)
        .args(["history", "--limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#3 "))
        .stdout(predicate::str::contains("#1 ").not());

    rcxi_cmd(&dir)
        .arg("sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("default"))
        .stdout(predicate::str::contains("records=4"));
}

#[test]
fn named_sessions_are_isolated() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "a.txt", &["alpha"]);

    rcxi_cmd(&dir)
        .args(["--session", "left", "run"])
        .arg(&input)
        .assert()
        .success();

    rcxi_cmd(&dir)
        .args(["--session", "right", "history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no records)"));
}

#[test]
fn snapshot_requires_session() {
    let dir = TempDir::new().unwrap();
    rcxi_cmd(&dir)
        .arg("snapshot")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no session named"));
}

#[test]
fn snapshot_after_run() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "a.txt", &["first", "second", "third"]);
    rcxi_cmd(&dir).arg("run").arg(&input).assert().success();

    rcxi_cmd(&dir)
        .arg("snapshot")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"nodeCount\": 32"))
        .stdout(predicate::str::contains("\"sequenceIndex\": 3"));
}

#[test]
fn export_import_roundtrip() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "a.txt", &["keep", "this", "state"]);
    let export = dir.path().join("session.json");

    rcxi_cmd(&dir).arg("run").arg(&input).assert().success();
    rcxi_cmd(&dir)
        .arg("export")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported default"));

    let content = std::fs::read_to_string(&export).unwrap();
    assert!(content.contains("\"version\": \"1\""));

    rcxi_cmd(&dir)
        .args(["--session", "copy", "import"])
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 states, next sequence 4"));

    rcxi_cmd(&dir)
        .args(["--session", "copy", "snapshot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sequenceIndex\": 3"));
}

#[test]
fn import_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{\"version\": \"1\"}").unwrap();
    rcxi_cmd(&dir).arg("import").arg(&bad).assert().failure();
    rcxi_cmd(&dir)
        .arg("sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("(no sessions)"));
}

#[test]
fn config_file_shapes_new_session() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("session.toml");
    std::fs::write(
        &config,
        "seed = 7\n\n[engine]\ndimension = 16\nhistoryWindow = 8\n\n[graph]\nnodeCount = 5\n",
    )
    .unwrap();
    let input = write_input(&dir, "a.txt", &["small", "world"]);

    rcxi_cmd(&dir)
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&input)
        .assert()
        .success();

    rcxi_cmd(&dir)
        .arg("snapshot")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"nodeCount\": 5"));
}

#[test]
fn invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[graph]\ndecay = 2.0\n").unwrap();
    let input = write_input(&dir, "a.txt", &["x"]);

    rcxi_cmd(&dir)
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn run_on_empty_file_still_creates_session() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "empty.txt", &["", "   "]);
    rcxi_cmd(&dir).arg("run").arg(&input).assert().success();

    rcxi_cmd(&dir)
        .arg("sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("records=0"));
}
