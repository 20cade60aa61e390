use serde_json::json;

use crate::ipc::error::{flow_err, ok};
use crate::ipc::types::{AppState, Request};
use crate::workflow::{Event, Workflow};

pub fn str_param<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

/// Dispatch one workflow event and reply with the resulting view.
pub async fn run(state: &mut AppState, req: &Request, event: Event) -> serde_json::Value {
    match state.engine.dispatch(event).await {
        Ok(wf) => ok(&req.id, view(wf)),
        Err(e) => flow_err(&req.id, &e),
    }
}

/// Everything the UI needs to render the current step.
pub fn view(wf: &Workflow) -> serde_json::Value {
    let editing = wf.editing().map(|d| {
        json!({
            "uid": d.original.uid,
            "studentName": d.original.student_name,
            "timestamp": d.original.timestamp,
            "fields": d.fields,
        })
    });
    json!({
        "step": wf.step(),
        "mode": wf.mode(),
        "session": wf.session(),
        "centers": wf.centers(),
        "selectedCenter": wf.selected_center(),
        "students": wf.students(),
        "selectedStudent": wf.selected_student(),
        "masterAttributes": wf.master_attributes(),
        "formFields": wf.form_spec().fields(),
        "form": wf.form(),
        "entries": wf.entries(),
        "editing": editing,
    })
}
