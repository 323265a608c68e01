use crate::model::ModelError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn model_details(e: &ModelError) -> serde_json::Value {
    match e {
        ModelError::InvalidInput { field } => json!({ "field": field }),
        ModelError::OutOfRange { what, index, len } => {
            json!({ "what": what, "index": index, "len": len })
        }
    }
}
