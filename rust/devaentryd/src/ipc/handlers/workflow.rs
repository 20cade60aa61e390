use crate::ipc::error::err;
use crate::ipc::helpers::{run, str_param};
use crate::ipc::types::{AppState, Request};
use crate::workflow::{Event, Mode};

async fn handle_choose(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = str_param(req, "mode") else {
        return err(&req.id, "bad_params", "missing mode", None);
    };
    let Some(mode) = Mode::parse(raw) else {
        return err(
            &req.id,
            "bad_params",
            "mode must be one of: menu, enter, view, edit",
            Some(serde_json::json!({ "mode": raw })),
        );
    };
    run(state, req, Event::Choose(mode)).await
}

async fn handle_select_center(state: &mut AppState, req: &Request) -> serde_json::Value {
    // null and "" both clear the selection
    let center = str_param(req, "center").unwrap_or("").to_string();
    run(state, req, Event::SelectCenter(center)).await
}

async fn handle_select_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student = str_param(req, "student").unwrap_or("").to_string();
    run(state, req, Event::SelectStudent(student)).await
}

async fn handle_set_field(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(name) = str_param(req, "name") else {
        return err(&req.id, "bad_params", "missing name", None);
    };
    let value = str_param(req, "value").unwrap_or("").to_string();
    let event = Event::SetField {
        name: name.to_string(),
        value,
    };
    run(state, req, event).await
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "workflow.choose" => handle_choose(state, req).await,
        "workflow.selectCenter" => handle_select_center(state, req).await,
        "workflow.selectStudent" => handle_select_student(state, req).await,
        "workflow.setField" => handle_set_field(state, req).await,
        "workflow.back" => run(state, req, Event::BackToMenu).await,
        "workflow.refresh" => run(state, req, Event::Refresh).await,
        _ => return None,
    };
    Some(resp)
}
