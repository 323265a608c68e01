use crate::calc;
use crate::db;
use crate::ipc::error::{err, model_details};
use crate::ipc::types::AppState;
use crate::model::{ClassRecord, ModelError};
use rusqlite::Connection;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<ModelError> for HandlerErr {
    fn from(e: ModelError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
            details: Some(model_details(&e)),
        }
    }
}

pub fn bad_params(message: impl Into<String>) -> HandlerErr {
    HandlerErr::new("bad_params", message)
}

pub fn get_required_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| bad_params(format!("missing {}", key)))
}

pub fn get_optional_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<Option<&'a str>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| bad_params(format!("{} must be a string", key))),
    }
}

pub fn get_required_index(params: &serde_json::Value, key: &str) -> Result<usize, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| bad_params(format!("missing {}", key)))
}

pub fn get_required_bool(params: &serde_json::Value, key: &str) -> Result<bool, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| bad_params(format!("missing {}", key)))
}

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// `classIndex` from params, else the class last opened with `classes.open`.
pub fn resolve_class_index(state: &AppState, params: &serde_json::Value) -> Result<usize, HandlerErr> {
    match params.get("classIndex") {
        None | Some(serde_json::Value::Null) => state.current_class.ok_or_else(|| {
            if state.classes.is_empty() {
                HandlerErr::new("no_class", "no classes yet; create one first")
            } else {
                HandlerErr::new("no_class", "open a class first")
            }
        }),
        Some(v) => v
            .as_u64()
            .map(|v| v as usize)
            .ok_or_else(|| bad_params("classIndex must be a non-negative integer")),
    }
}

/// Writes the whole class collection back. Called after every mutation.
pub fn persist(state: &AppState) -> Result<(), HandlerErr> {
    let conn = require_db(state)?;
    db::save_classes(conn, state.classes.records()).map_err(|e| {
        tracing::error!(error = %e, "failed to persist classes");
        HandlerErr::new("persist_failed", e.to_string())
    })
}

pub fn class_view(index: usize, cls: &ClassRecord) -> serde_json::Value {
    let summary = calc::class_summary(cls);
    json!({
        "classIndex": index,
        "name": cls.name(),
        "description": cls.description(),
        "sessions": cls.sessions(),
        "students": summary.students,
        "attendance": cls.attendance(),
        "marks": cls.marks(),
        "summary": summary.sessions,
    })
}

pub fn class_view_at(state: &AppState, index: usize) -> Result<serde_json::Value, HandlerErr> {
    let cls = state.classes.select(index)?;
    Ok(class_view(index, cls))
}

pub fn respond(id: &str, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => crate::ipc::error::ok(id, v),
        Err(e) => e.response(id),
    }
}
