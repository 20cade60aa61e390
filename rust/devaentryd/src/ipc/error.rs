use serde_json::json;

use crate::error::{FlowError, UpdateFailure};

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

/// Map a workflow failure to its error code; torn edits carry the unsaved
/// replacement so the UI can show what was lost.
pub fn flow_err(id: &str, e: &FlowError) -> serde_json::Value {
    let details = match e {
        FlowError::ValidationFailure { field, value } => {
            Some(json!({ "field": field, "value": value }))
        }
        FlowError::AmbiguousIdentity { username, count } => {
            Some(json!({ "username": username, "count": count }))
        }
        FlowError::Update(UpdateFailure::Rejected { uid, .. }) => Some(json!({ "uid": uid })),
        FlowError::Update(UpdateFailure::Partial {
            uid, replacement, ..
        }) => Some(json!({ "uid": uid, "unsaved": replacement })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
