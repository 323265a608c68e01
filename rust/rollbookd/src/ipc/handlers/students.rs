use crate::ipc::helpers::{
    class_view_at, get_required_index, get_required_str, persist, require_db,
    resolve_class_index, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn students_add(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_db(state)?;
    let class_index = resolve_class_index(state, params)?;
    let name = get_required_str(params, "name")?;
    let student_index = state.classes.select_mut(class_index)?.add_student(name)?;
    persist(state)?;
    Ok(json!({
        "studentIndex": student_index,
        "class": class_view_at(state, class_index)?
    }))
}

fn students_remove(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_db(state)?;
    let class_index = resolve_class_index(state, params)?;
    let student_index = get_required_index(params, "studentIndex")?;
    let removed = state
        .classes
        .select_mut(class_index)?
        .remove_student(student_index)?;
    persist(state)?;
    tracing::info!(class_index, student_index, "student removed");
    Ok(json!({
        "removed": removed,
        "class": class_view_at(state, class_index)?
    }))
}

fn handle_students_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, students_add(state, &req.params))
}

fn handle_students_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, students_remove(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.add" => Some(handle_students_add(state, req)),
        "students.remove" => Some(handle_students_remove(state, req)),
        _ => None,
    }
}
