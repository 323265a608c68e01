use crate::backup;
use crate::db;
use crate::ipc::handlers::core::open_workspace;
use crate::ipc::helpers::{
    get_required_str, require_db, resolve_class_index, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassRecord, ClassRepository};
use serde_json::json;
use std::path::PathBuf;

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Long format: one line per (student, session) cell, roster order first.
pub fn class_csv(cls: &ClassRecord) -> String {
    let mut csv =
        String::from("student_index,student_name,session_index,session_name,present,mark\n");
    for (i, student) in cls.students().iter().enumerate() {
        for (j, session) in cls.sessions().iter().enumerate() {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                i,
                csv_quote(&student.name),
                j,
                csv_quote(session),
                if cls.attendance()[j][i] { 1 } else { 0 },
                cls.marks()[j][i]
            ));
        }
    }
    csv
}

fn required_path(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = get_required_str(params, key)?.trim();
    if v.is_empty() {
        return Err(HandlerErr::new("bad_params", format!("missing {}", key)));
    }
    Ok(v.to_string())
}

fn io_failed(e: impl ToString, path: &str) -> HandlerErr {
    HandlerErr::new("io_failed", e.to_string()).with_details(json!({ "path": path }))
}

fn backup_export_workspace_bundle(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let out_path = required_path(params, "outPath")?;
    let conn = require_db(state)?;
    let Some(workspace_path) = state.workspace.clone() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };

    let _ = conn.execute_batch("PRAGMA wal_checkpoint(FULL)");
    let classes_json = db::encode_classes(state.classes.records())
        .map_err(|e| HandlerErr::new("io_failed", e.to_string()))?;

    let out = PathBuf::from(&out_path);
    let export = backup::export_workspace_bundle(&workspace_path, &out, &classes_json)
        .map_err(|e| io_failed(e, &out_path))?;
    tracing::info!(path = %out_path, bundle_id = %export.bundle_id, "workspace bundle exported");

    Ok(json!({
        "ok": true,
        "path": out_path,
        "bundleFormat": export.bundle_format,
        "bundleId": export.bundle_id,
        "entryCount": export.entry_count,
        "classesSha256": export.classes_sha256
    }))
}

/// Forgets everything loaded from the workspace so nothing stale is served.
fn close_workspace(state: &mut AppState) {
    state.db = None;
    state.workspace = None;
    state.classes = ClassRepository::new();
    state.current_class = None;
}

fn reopen_previous(state: &mut AppState) {
    let Some(previous) = state.workspace.clone() else {
        close_workspace(state);
        return;
    };
    if let Err(e) = open_workspace(state, &previous) {
        tracing::error!(error = %e, "could not reopen workspace after failed import");
        close_workspace(state);
    }
}

fn backup_import_workspace_bundle(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let in_path = required_path(params, "inPath")?;
    let workspace_path = params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone())
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))?;

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return Err(HandlerErr::new("not_found", "bundle file not found")
            .with_details(json!({ "path": in_path })));
    }

    // Drop open handle before replacing file.
    state.db = None;

    let import = match backup::import_workspace_bundle(&src, &workspace_path) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %in_path, error = %e, "workspace import rejected");
            reopen_previous(state);
            return Err(io_failed(e, &in_path));
        }
    };

    if let Err(e) = open_workspace(state, &workspace_path) {
        close_workspace(state);
        return Err(HandlerErr::new("db_open_failed", e.to_string()));
    }
    tracing::info!(path = %in_path, format = %import.bundle_format_detected, "workspace bundle imported");

    Ok(json!({
        "ok": true,
        "workspacePath": workspace_path.to_string_lossy(),
        "bundleFormatDetected": import.bundle_format_detected,
        "classesVerified": import.classes_verified,
        "classCount": state.classes.len()
    }))
}

fn exchange_export_class_csv(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_index = resolve_class_index(state, params)?;
    let out_path = required_path(params, "outPath")?;
    let cls = state.classes.select(class_index)?;
    let csv = class_csv(cls);
    let rows_exported = cls.student_count() * cls.session_count();

    let out = PathBuf::from(&out_path);
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_failed(e, &out_path))?;
    }
    std::fs::write(&out, csv).map_err(|e| io_failed(e, &out_path))?;

    Ok(json!({ "ok": true, "rowsExported": rows_exported, "path": out_path }))
}

fn handle_backup_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, backup_export_workspace_bundle(state, &req.params))
}

fn handle_backup_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, backup_import_workspace_bundle(state, &req.params))
}

fn handle_exchange_export_class_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, exchange_export_class_csv(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_backup_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_backup_import_workspace_bundle(state, req)),
        "exchange.exportClassCsv" => Some(handle_exchange_export_class_csv(state, req)),
        _ => None,
    }
}
