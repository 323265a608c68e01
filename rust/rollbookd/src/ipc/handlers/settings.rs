use crate::config;
use crate::ipc::helpers::{bad_params, require_db, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn settings_get(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "settings": state.settings }))
}

fn settings_update(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let Some(patch) = params.get("patch") else {
        return Err(bad_params("missing patch"));
    };
    let next = state.settings.patched(patch).map_err(bad_params)?;
    config::save_settings(conn, &next)
        .map_err(|e| HandlerErr::new("persist_failed", e.to_string()))?;
    state.settings = next;
    Ok(json!({ "settings": state.settings }))
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, settings_get(state))
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, settings_update(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
