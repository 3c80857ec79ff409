use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn diop_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("diop"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("DIOP_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn init_creates_project_layout() {
    let home = TempDir::new().expect("home");
    let project = TempDir::new().expect("project");

    diop_cmd(home.path())
        .args(["init", "--root"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(contains("Project layout ready"));

    for dir in ["operators", "testdata", "utils"] {
        assert!(project.path().join(dir).is_dir(), "{dir} missing");
    }
    let mock = fs::read_to_string(project.path().join("utils/mock_di_api.py")).expect("mock");
    assert!(mock.contains("class mock_api"));
}

#[test]
fn invalid_operator_id_is_rejected() {
    let home = TempDir::new().expect("home");
    diop_cmd(home.path())
        .args(["download", "no-dot-here", "--password", "x"])
        .assert()
        .failure()
        .stderr(contains("invalid operator identifier"));
}

#[test]
fn download_without_profile_asks_for_one() {
    let home = TempDir::new().expect("home");
    diop_cmd(home.path())
        .args(["download", "demo.op", "--password", "x"])
        .assert()
        .failure()
        .stderr(contains("diop profile set"));
}

#[test]
fn download_without_password_fails_before_any_call() {
    let home = TempDir::new().expect("home");
    diop_cmd(home.path())
        .args(["download", "demo.op", "--url", "https://di", "--user", "alice"])
        .assert()
        .failure()
        .stderr(contains("DIOP_PASSWORD"));
}

#[test]
fn profile_set_then_show() {
    let home = TempDir::new().expect("home");

    diop_cmd(home.path())
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(contains("No profile stored"));

    diop_cmd(home.path())
        .args(["profile", "set", "--url", "https://di.example.com", "--user", "alice"])
        .assert()
        .success();
    diop_cmd(home.path())
        .args(["profile", "set", "--tenant", "acme"])
        .assert()
        .success();

    diop_cmd(home.path())
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(contains("https://di.example.com"))
        .stdout(contains("acme"))
        .stdout(contains("alice"));

    let stored = fs::read_to_string(home.path().join(".diop/profile.yaml")).expect("profile");
    assert!(!stored.contains("password"));
}

#[test]
fn new_profile_needs_url_and_user() {
    let home = TempDir::new().expect("home");
    diop_cmd(home.path())
        .args(["profile", "set", "--tenant", "acme"])
        .assert()
        .failure()
        .stderr(contains("--url and --user"));
}

/// A stand-in `vctl` serving files from a local mirror folder.
#[cfg(unix)]
fn fake_client(dir: &Path, mirror: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        r#"#!/bin/sh
M="{mirror}"
case "$1" in
  login) exit 0 ;;
  vrep)
    case "$3" in
      ls) ls -1 "$M$4" ;;
      cat) cat "$M$4" ;;
      put) mkdir -p "$(dirname "$M$5")" && cp "$4" "$M$5" ;;
      mkdir) mkdir -p "$M$4" ;;
      *) exit 2 ;;
    esac ;;
  *) exit 2 ;;
esac
"#,
        mirror = mirror.display()
    );
    let path = dir.join("vctl");
    fs::write(&path, script).expect("write client");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

#[test]
#[cfg(unix)]
fn download_then_upload_round_trip_through_client() {
    let home = TempDir::new().expect("home");
    let project = TempDir::new().expect("project");
    let mirror = TempDir::new().expect("mirror");
    let bin = TempDir::new().expect("bin");

    let remote_op = mirror.path().join("ops/demo/passthrough");
    fs::create_dir_all(&remote_op).expect("remote dir");
    fs::write(
        remote_op.join("operator.json"),
        r#"{"description":"Passthrough","inports":[{"name":"input","type":"message"}],"outports":[{"name":"output","type":"message"}],"config":{"script":"file://script.py"}}"#,
    )
    .expect("operator");
    fs::write(
        remote_op.join("configSchema.json"),
        r#"{"$id":"http://sap.com/vflow/demo.passthrough.configSchema.json","properties":{"script":{"type":"string"}}}"#,
    )
    .expect("schema");
    fs::write(remote_op.join("README.md"), "docs").expect("readme");

    let client = fake_client(bin.path(), mirror.path());
    let connection = |cmd: &mut Command| {
        cmd.arg("--root")
            .arg(project.path())
            .arg("--client")
            .arg(&client)
            .args(["--url", "https://di", "--user", "alice", "--operators-root", "/ops"])
            .env("DIOP_PASSWORD", "secret");
    };

    let mut download = diop_cmd(home.path());
    download.args(["download", "demo.passthrough"]);
    connection(&mut download);
    download.assert().success().stdout(contains("script_test.py"));

    let local = project.path().join("operators/demo/passthrough");
    let script = fs::read_to_string(local.join("script.py")).expect("script");
    assert!(script.contains("def on_input(msg) :"));
    assert!(!local.join("README.md").exists());

    // Upload under a new package: folders are created and the header stripped.
    let target = project.path().join("operators/acme/scorer");
    fs::create_dir_all(&target).expect("target");
    for name in ["operator.json", "configSchema.json", "script.py"] {
        fs::copy(local.join(name), target.join(name)).expect("copy");
    }

    let mut upload = diop_cmd(home.path());
    upload.args(["upload", "acme.scorer"]);
    connection(&mut upload);
    upload.assert().success().stdout(contains("uploaded"));

    let uploaded = mirror.path().join("ops/acme/scorer");
    let remote_script = fs::read_to_string(uploaded.join("script.py")).expect("remote script");
    assert!(!remote_script.contains("mock_di_api"));
    let remote_operator = fs::read_to_string(uploaded.join("operator.json")).expect("operator");
    assert!(remote_operator.contains("acme.scorer.configSchema.json"));
    assert!(!target.join("tmp_script.py").exists());
}
