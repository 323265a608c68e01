#[path = "../src/backup.rs"]
mod backup;
#[path = "../src/db.rs"]
mod db;
#[path = "../src/model.rs"]
mod model;

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
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

/// Creates a real workspace database with one stored class and returns its bytes.
fn sqlite_bytes(workspace: &Path) -> Vec<u8> {
    {
        let conn = db::open_db(workspace).expect("open db");
        let classes = vec![model::ClassRecord::new("Math", 2).expect("class")];
        db::save_classes(&conn, &classes).expect("save classes");
    }
    std::fs::read(workspace.join(db::DB_FILE)).expect("read db")
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("rollbook-backup-src");
    let workspace2 = temp_dir("rollbook-backup-dst");
    let out_dir = temp_dir("rollbook-backup-out");

    let bytes = sqlite_bytes(&workspace);
    let classes_json = r#"[{"name":"Math","description":"","students":[],"sessions":[],"attendance":[],"marks":[]}]"#;

    let bundle_path = out_dir.join("workspace.rbbackup.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path, classes_json)
        .expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 3);
    assert_eq!(export.classes_sha256, backup::sha256_hex(classes_json.as_bytes()));

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT_V1));
    assert!(manifest.contains(&export.bundle_id));
    let mut stored_classes = String::new();
    archive
        .by_name("data/classes.json")
        .expect("classes entry")
        .read_to_string(&mut stored_classes)
        .expect("read classes");
    assert_eq!(stored_classes, classes_json);
    archive
        .by_name("db/rollbook.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);
    assert!(import.classes_verified);

    let restored = std::fs::read(workspace2.join(db::DB_FILE)).expect("read restored db");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_classes_entry_is_rejected() {
    let out_dir = temp_dir("rollbook-backup-tampered");
    let workspace = temp_dir("rollbook-backup-tampered-dst");

    let bundle_path = out_dir.join("tampered.zip");
    {
        let f = File::create(&bundle_path).expect("create zip");
        let mut zip = zip::ZipWriter::new(f);
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest");
        let manifest = serde_json::json!({
            "format": backup::BUNDLE_FORMAT_V1,
            "classesSha256": backup::sha256_hex(b"[]"),
        });
        zip.write_all(manifest.to_string().as_bytes()).expect("write manifest");
        zip.start_file("data/classes.json", opts).expect("classes");
        zip.write_all(b"[{\"name\":\"Edited\"}]").expect("write classes");
        zip.start_file("db/rollbook.sqlite3", opts).expect("db");
        zip.write_all(b"payload").expect("write db");
        zip.finish().expect("finish zip");
    }

    let result = backup::import_workspace_bundle(&bundle_path, &workspace);
    let message = format!("{:#}", result.expect_err("checksum mismatch"));
    assert!(message.contains("checksum mismatch"), "{}", message);
    assert!(!workspace.join(db::DB_FILE).exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn non_database_file_leaves_existing_workspace_untouched() {
    let out_dir = temp_dir("rollbook-backup-junk");
    let workspace = temp_dir("rollbook-backup-junk-dst");
    let before = sqlite_bytes(&workspace);

    let junk = out_dir.join("notes.txt");
    std::fs::write(&junk, "these are lesson notes, not a database").expect("write junk");

    let result = backup::import_workspace_bundle(&junk, &workspace);
    let message = format!("{:#}", result.expect_err("junk rejected"));
    assert!(message.contains("not a sqlite database"), "{}", message);

    let after = std::fs::read(workspace.join(db::DB_FILE)).expect("read db");
    assert_eq!(after, before);
    assert!(!workspace
        .join(format!("{}.importing", db::DB_FILE))
        .exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn legacy_sqlite_import_is_supported() {
    let out_dir = temp_dir("rollbook-backup-legacy");
    let workspace = temp_dir("rollbook-backup-legacy-dst");

    let source = temp_dir("rollbook-backup-legacy-src");
    let bytes = sqlite_bytes(&source);
    let legacy_file = out_dir.join("legacy.sqlite3");
    std::fs::write(&legacy_file, &bytes).expect("write legacy sqlite file");

    let import =
        backup::import_workspace_bundle(&legacy_file, &workspace).expect("import legacy sqlite");
    assert_eq!(import.bundle_format_detected, backup::LEGACY_SQLITE_FORMAT);
    assert!(!import.classes_verified);

    let restored = std::fs::read(workspace.join(db::DB_FILE)).expect("read restored sqlite");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(source);
}
