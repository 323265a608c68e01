use crate::ipc::helpers::{
    class_view, class_view_at, get_optional_str, get_required_str, persist, require_db,
    resolve_class_index, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn classes_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    // Counts let the UI show a useful dashboard without opening each class.
    let classes: Vec<serde_json::Value> = state
        .classes
        .list()
        .into_iter()
        .zip(state.classes.records())
        .enumerate()
        .map(|(i, (name, c))| {
            json!({
                "classIndex": i,
                "name": name,
                "studentCount": c.student_count(),
                "sessionCount": c.session_count()
            })
        })
        .collect();
    Ok(json!({ "classes": classes }))
}

fn classes_create(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_db(state)?;
    let name = get_required_str(params, "name")?;
    let session_count = state.settings.default_session_count;
    let index = state.classes.create_class(name, session_count)?;
    persist(state)?;
    tracing::info!(class_index = index, sessions = session_count, "class created");
    let cls = state.classes.select(index)?;
    Ok(json!({ "classIndex": index, "name": cls.name() }))
}

fn classes_open(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let index = resolve_class_index(state, params)?;
    let view = class_view_at(state, index)?;
    state.current_class = Some(index);
    Ok(view)
}

fn classes_reset_all(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_db(state)?;
    let confirmed = params
        .get("confirm")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !confirmed {
        return Err(HandlerErr::new(
            "not_confirmed",
            "resetAll requires confirm: true",
        ));
    }
    let removed = state.classes.len();
    state.classes.reset_all();
    state.current_class = None;
    persist(state)?;
    tracing::warn!(removed, "all classes reset");
    Ok(json!({ "ok": true, "removed": removed }))
}

fn class_set_description(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_db(state)?;
    let index = resolve_class_index(state, params)?;
    let text = get_optional_str(params, "description")?.unwrap_or("");
    state.classes.select_mut(index)?.set_description(text);
    persist(state)?;
    let cls = state.classes.select(index)?;
    Ok(class_view(index, cls))
}

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, classes_list(state))
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, classes_create(state, &req.params))
}

fn handle_classes_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, classes_open(state, &req.params))
}

fn handle_classes_reset_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, classes_reset_all(state, &req.params))
}

fn handle_class_set_description(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, class_set_description(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.open" => Some(handle_classes_open(state, req)),
        "classes.resetAll" => Some(handle_classes_reset_all(state, req)),
        "class.setDescription" => Some(handle_class_set_description(state, req)),
        _ => None,
    }
}
