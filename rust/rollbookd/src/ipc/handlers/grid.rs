use crate::calc;
use crate::ipc::helpers::{
    class_view_at, get_required_bool, get_required_index, persist, require_db,
    resolve_class_index, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassRecord, ModelError, MARK_PARSE_FALLBACK};
use serde_json::json;

/// Non-text mark values: numbers are truncated, anything else is the fallback.
fn read_mark_number(v: Option<&serde_json::Value>) -> i64 {
    match v {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(MARK_PARSE_FALLBACK),
        _ => MARK_PARSE_FALLBACK,
    }
}

/// Mark cells arrive as whatever the UI widget held: text, a number, or
/// nothing. None of these is an error. Returns the stored value.
fn write_mark(
    cls: &mut ClassRecord,
    session: usize,
    student: usize,
    value: Option<&serde_json::Value>,
) -> Result<i64, ModelError> {
    match value {
        Some(serde_json::Value::String(raw)) => cls.set_mark(session, student, raw),
        other => {
            let v = read_mark_number(other);
            cls.set_mark_value(session, student, v)?;
            Ok(v)
        }
    }
}

fn grid_get(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_index = resolve_class_index(state, params)?;
    class_view_at(state, class_index)
}

fn grid_set_mark(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_db(state)?;
    let class_index = resolve_class_index(state, params)?;
    let session = get_required_index(params, "sessionIndex")?;
    let student = get_required_index(params, "studentIndex")?;
    let settings = state.settings.clone();

    let cls = state.classes.select_mut(class_index)?;
    let written = write_mark(cls, session, student, params.get("value"))?;
    let bounded = settings.bound_mark(written);
    if bounded != written {
        cls.set_mark_value(session, student, bounded)?;
    }
    let value = cls.mark(session, student)?;
    let average = calc::average_mark(cls, student)?;
    persist(state)?;

    Ok(json!({
        "value": value,
        "averageMark": average,
        "averageDisplay": calc::format_1_decimal(average),
        "class": class_view_at(state, class_index)?
    }))
}

fn grid_set_attendance(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_db(state)?;
    let class_index = resolve_class_index(state, params)?;
    let session = get_required_index(params, "sessionIndex")?;
    let student = get_required_index(params, "studentIndex")?;
    let present = get_required_bool(params, "present")?;

    let cls = state.classes.select_mut(class_index)?;
    cls.set_attendance(session, student, present)?;
    let present = cls.is_present(session, student)?;
    let rate = calc::attendance_percentage(cls, session)?;
    persist(state)?;

    Ok(json!({
        "present": present,
        "attendancePercent": rate.percent(),
        "attendanceDisplay": rate.display(),
        "class": class_view_at(state, class_index)?
    }))
}

fn handle_grid_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, grid_get(state, &req.params))
}

fn handle_grid_set_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, grid_set_mark(state, &req.params))
}

fn handle_grid_set_attendance(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, grid_set_attendance(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grid.get" => Some(handle_grid_get(state, req)),
        "grid.setMark" => Some(handle_grid_set_mark(state, req)),
        "grid.setAttendance" => Some(handle_grid_set_attendance(state, req)),
        _ => None,
    }
}
