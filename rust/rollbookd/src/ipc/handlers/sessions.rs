use crate::ipc::helpers::{
    class_view_at, get_optional_str, persist, require_db, resolve_class_index, respond,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn sessions_add(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_db(state)?;
    let class_index = resolve_class_index(state, params)?;
    let name = get_optional_str(params, "name")?;
    let session_index = state.classes.select_mut(class_index)?.add_session(name);
    persist(state)?;
    Ok(json!({
        "sessionIndex": session_index,
        "class": class_view_at(state, class_index)?
    }))
}

fn sessions_remove(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_db(state)?;
    let class_index = resolve_class_index(state, params)?;
    let removed = state.classes.select_mut(class_index)?.remove_session();
    // Nothing to write back when the class had no sessions.
    if removed.is_some() {
        persist(state)?;
    }
    Ok(json!({
        "removed": removed,
        "class": class_view_at(state, class_index)?
    }))
}

fn handle_sessions_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, sessions_add(state, &req.params))
}

fn handle_sessions_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, sessions_remove(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sessions.add" => Some(handle_sessions_add(state, req)),
        "sessions.remove" => Some(handle_sessions_remove(state, req)),
        _ => None,
    }
}
