use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rollbookd");
    let mut child = Command::new(exe)
        .env_remove("ROLLBOOKD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rollbookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

fn assert_ok(value: &serde_json::Value, method: &str) {
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("rollbook-router-smoke");
    let bundle_out = workspace.join("smoke-backup.rbbackup.zip");
    let csv_out = workspace.join("smoke-export.csv");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_ok(&health, "health");
    let selected = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_ok(&selected, "workspace.select");

    let calls: Vec<(&str, serde_json::Value)> = vec![
        ("settings.get", json!({})),
        ("settings.update", json!({ "patch": { "defaultSessionCount": 3 } })),
        ("classes.create", json!({ "name": "Smoke Class" })),
        ("classes.list", json!({})),
        ("classes.open", json!({ "classIndex": 0 })),
        ("class.setDescription", json!({ "description": "smoke" })),
        ("students.add", json!({ "name": "Smoke Student" })),
        ("sessions.add", json!({})),
        ("grid.setMark", json!({ "sessionIndex": 0, "studentIndex": 0, "value": "70" })),
        ("grid.setAttendance", json!({ "sessionIndex": 0, "studentIndex": 0, "present": true })),
        ("grid.get", json!({})),
        ("sessions.remove", json!({})),
        ("exchange.exportClassCsv", json!({ "outPath": csv_out.to_string_lossy() })),
        ("backup.exportWorkspaceBundle", json!({ "outPath": bundle_out.to_string_lossy() })),
        ("students.remove", json!({ "studentIndex": 0 })),
        ("classes.resetAll", json!({ "confirm": true })),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = format!("s{}", i);
        let resp = request(&mut stdin, &mut reader, &id, method, params);
        assert_ok(&resp, method);
    }

    assert!(csv_out.is_file());
    assert!(bundle_out.is_file());

    let unknown = request(&mut stdin, &mut reader, "99", "nope.nothing", json!({}));
    assert_eq!(
        unknown.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_implemented")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn bad_json_line_gets_error_and_loop_continues() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read error line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse");
    assert_eq!(value.pointer("/error/code").and_then(|v| v.as_str()), Some("bad_json"));

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_ok(&health, "health");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn mutations_without_workspace_are_rejected() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let listed = request(&mut stdin, &mut reader, "1", "classes.list", json!({}));
    assert_ok(&listed, "classes.list");
    assert_eq!(
        listed.pointer("/result/classes").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );

    let created = request(&mut stdin, &mut reader, "2", "classes.create", json!({ "name": "X" }));
    assert_eq!(
        created.pointer("/error/code").and_then(|v| v.as_str()),
        Some("no_workspace")
    );

    drop(stdin);
    let _ = child.wait();
}
