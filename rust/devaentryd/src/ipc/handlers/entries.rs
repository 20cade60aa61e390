use crate::ipc::error::{err, flow_err, ok};
use crate::ipc::helpers::{run, str_param, view};
use crate::ipc::types::{AppState, Request};
use crate::workflow::{Event, Step};
use serde_json::json;

async fn handle_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.engine.submit().await {
        Ok(entry) => ok(
            &req.id,
            json!({
                "submitted": true,
                "entry": entry,
                "view": view(state.engine.workflow()),
            }),
        ),
        Err(e) => flow_err(&req.id, &e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let wf = state.engine.workflow();
    if !matches!(wf.step(), Step::ViewList | Step::EditList | Step::EditForm) {
        return err(
            &req.id,
            "not_ready",
            "choose view or edit and a center first",
            Some(json!({ "step": wf.step() })),
        );
    }
    ok(
        &req.id,
        json!({
            "center": wf.selected_center(),
            "entries": wf.entries(),
        }),
    )
}

async fn handle_start_edit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(uid) = str_param(req, "uid") else {
        return err(&req.id, "bad_params", "missing uid", None);
    };
    let event = Event::StartEdit {
        uid: uid.to_string(),
    };
    run(state, req, event).await
}

async fn handle_set_edit_field(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(name) = str_param(req, "name") else {
        return err(&req.id, "bad_params", "missing name", None);
    };
    let value = str_param(req, "value").unwrap_or("").to_string();
    let event = Event::SetEditField {
        name: name.to_string(),
        value,
    };
    run(state, req, event).await
}

async fn handle_save_edit(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.engine.save_edit().await {
        Ok(entry) => ok(
            &req.id,
            json!({
                "entry": entry,
                "view": view(state.engine.workflow()),
            }),
        ),
        Err(e) => flow_err(&req.id, &e),
    }
}

fn handle_torn_edits(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "edits": state.engine.torn_edits() }))
}

async fn handle_recover(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(uid) = str_param(req, "uid") else {
        return err(&req.id, "bad_params", "missing uid", None);
    };
    let uid = uid.to_string();
    match state.engine.recover(&uid).await {
        Ok(entry) => ok(
            &req.id,
            json!({
                "entry": entry,
                "view": view(state.engine.workflow()),
            }),
        ),
        Err(e) => flow_err(&req.id, &e),
    }
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "entries.submit" => handle_submit(state, req).await,
        "entries.list" => handle_list(state, req),
        "entries.startEdit" => handle_start_edit(state, req).await,
        "entries.setEditField" => handle_set_edit_field(state, req).await,
        "entries.cancelEdit" => run(state, req, Event::CancelEdit).await,
        "entries.saveEdit" => handle_save_edit(state, req).await,
        "entries.tornEdits" => handle_torn_edits(state, req),
        "entries.recover" => handle_recover(state, req).await,
        _ => return None,
    };
    Some(resp)
}
