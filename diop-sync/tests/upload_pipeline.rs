//! Upload reconciliation against the in-memory repository.

mod common;

use std::fs;
use std::path::Path;

use common::{Call, FakeRepository, ROOT};
use diop_core::bootstrap::BOOTSTRAP_HEADER;
use diop_core::OperatorId;
use diop_sync::{plan_upload, upload, RemoteLayout, SyncError, Workspace};
use serde_json::json;
use tempfile::TempDir;

const BODY: &str = "def gen() :\n    api.send('output', 1)\n\napi.add_generator(gen)\n";

fn id() -> OperatorId {
    "acme.scorer".parse().expect("id")
}

/// A local operator copied from `demo.template`, still carrying its names.
fn local_operator(root: &Path) -> Workspace {
    let ws = Workspace::new(root);
    ws.ensure_operator_dirs(&id()).expect("dirs");
    let dir = ws.operator_dir(&id());
    let operator = json!({
        "description": "Template",
        "outports": [{"name": "output", "type": "message"}],
        "config": {
            "$type": "http://sap.com/vflow/demo.template.configSchema.json",
            "script": "file://script.py",
            "limit": 3
        }
    });
    let schema = json!({
        "$id": "http://sap.com/vflow/demo.template.configSchema.json",
        "type": "object",
        "properties": {"script": {"type": "string"}, "limit": {"type": "integer"}}
    });
    fs::write(dir.join("operator.json"), operator.to_string()).expect("operator");
    fs::write(dir.join("configSchema.json"), schema.to_string()).expect("schema");
    fs::write(dir.join("script.py"), format!("{BOOTSTRAP_HEADER}{BODY}")).expect("script");
    fs::write(dir.join("script_test.py"), "import script\n").expect("test");
    fs::create_dir_all(dir.join("__pycache__")).expect("cache");
    fs::write(dir.join("__pycache__/script.cpython-36.pyc"), "x").expect("pyc");
    ws
}

fn json_file(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read")).expect("json")
}

#[test]
fn scenario_c_new_package_creates_folders_then_renames_then_writes() {
    let tmp = TempDir::new().expect("tmp");
    let ws = local_operator(tmp.path());
    let mut remote = FakeRepository::new().with_file("/ops/other/op/operator.json", "{}");

    let report = upload(&mut remote, &RemoteLayout::new(ROOT), &ws, &id()).expect("upload");

    assert_eq!(remote.mkdirs(), vec!["/ops/acme", "/ops/acme/scorer"]);
    assert_eq!(
        remote.writes(),
        vec![
            "/ops/acme/scorer/configSchema.json",
            "/ops/acme/scorer/operator.json",
            "/ops/acme/scorer/script.py",
            "/ops/acme/scorer/script_test.py",
        ]
    );
    // Only the root is listed when the package is missing.
    let lists: Vec<_> = remote
        .calls
        .iter()
        .filter(|c| matches!(c, Call::List(_)))
        .collect();
    assert_eq!(lists, vec![&Call::List("/ops".to_owned())]);
    // Folders come before any write.
    let first_write = remote
        .calls
        .iter()
        .position(|c| matches!(c, Call::Write(_)))
        .expect("write");
    let last_mkdir = remote
        .calls
        .iter()
        .rposition(|c| matches!(c, Call::MakeDirectory(_)))
        .expect("mkdir");
    assert!(last_mkdir < first_write);

    // Renamed documents are written back locally with 4-space indentation.
    let dir = ws.operator_dir(&id());
    assert_eq!(report.rewritten_locally.len(), 2);
    let operator = json_file(&dir.join("operator.json"));
    let schema = json_file(&dir.join("configSchema.json"));
    let expected = "http://sap.com/vflow/acme.scorer.configSchema.json";
    assert_eq!(operator["config"]["$type"], expected);
    assert_eq!(schema["$id"], expected);
    assert_eq!(operator["description"], "Scorer");
    assert_eq!(operator["config"]["limit"], 3);
    assert!(fs::read_to_string(dir.join("operator.json"))
        .expect("read")
        .contains("\n    \"config\""));

    // The remote receives the renamed documents and the header-free script.
    assert_eq!(
        remote.files["/ops/acme/scorer/operator.json"],
        fs::read_to_string(dir.join("operator.json")).expect("read")
    );
    assert_eq!(remote.files["/ops/acme/scorer/script.py"], BODY);

    // The local script keeps its header; the staged copy is gone.
    let local_script = fs::read_to_string(dir.join("script.py")).expect("script");
    assert!(local_script.starts_with(BOOTSTRAP_HEADER));
    assert!(!dir.join("tmp_script.py").exists());
}

#[test]
fn existing_operator_is_overwritten_without_rename() {
    let tmp = TempDir::new().expect("tmp");
    let ws = local_operator(tmp.path());
    let mut remote = FakeRepository::new().with_file("/ops/acme/scorer/operator.json", "{}");
    let before = fs::read_to_string(ws.operator_dir(&id()).join("operator.json")).expect("read");

    upload(&mut remote, &RemoteLayout::new(ROOT), &ws, &id()).expect("upload");

    assert!(remote.mkdirs().is_empty());
    assert!(remote.calls.contains(&Call::List("/ops/acme".to_owned())));
    let after = fs::read_to_string(ws.operator_dir(&id()).join("operator.json")).expect("read");
    assert_eq!(after, before, "no rename for an operator that already exists");
    assert_eq!(remote.files["/ops/acme/scorer/operator.json"], before);
}

#[test]
fn existing_package_without_operator_creates_operator_folder_only() {
    let tmp = TempDir::new().expect("tmp");
    let ws = local_operator(tmp.path());
    let mut remote = FakeRepository::new().with_file("/ops/acme/other/operator.json", "{}");

    let plan = plan_upload(&mut remote, &RemoteLayout::new(ROOT), &ws, &id()).expect("plan");
    assert_eq!(plan.folders_to_create, vec!["/ops/acme/scorer"]);
    assert_eq!(plan.renamed_files, vec!["operator.json", "configSchema.json"]);
    assert!(remote.writes().is_empty(), "planning writes nothing");
}

#[test]
fn failed_write_aborts_and_removes_staged_script() {
    let tmp = TempDir::new().expect("tmp");
    let ws = local_operator(tmp.path());
    let mut remote = FakeRepository::new().with_file("/ops/acme/scorer/operator.json", "{}");
    remote.fail_write = Some("/ops/acme/scorer/operator.json".to_owned());

    let err = upload(&mut remote, &RemoteLayout::new(ROOT), &ws, &id()).unwrap_err();
    assert!(matches!(err, SyncError::Transport { .. }), "got: {err}");
    assert_eq!(
        remote.writes(),
        vec![
            "/ops/acme/scorer/configSchema.json",
            "/ops/acme/scorer/operator.json",
        ],
        "no writes after the failure"
    );
    assert!(!ws.operator_dir(&id()).join("tmp_script.py").exists());
}

#[test]
fn headerless_script_uploads_unchanged() {
    let tmp = TempDir::new().expect("tmp");
    let ws = local_operator(tmp.path());
    let dir = ws.operator_dir(&id());
    fs::write(dir.join("script.py"), BODY).expect("script");
    let mut remote = FakeRepository::new();

    upload(&mut remote, &RemoteLayout::new(ROOT), &ws, &id()).expect("upload");
    assert_eq!(remote.files["/ops/acme/scorer/script.py"], BODY);
}
