use crate::ipc::error::{err, flow_err, ok};
use crate::ipc::helpers::{str_param, view};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

async fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(username) = str_param(req, "username").map(str::trim) else {
        return err(&req.id, "bad_params", "missing username", None);
    };
    let Some(password) = str_param(req, "password") else {
        return err(&req.id, "bad_params", "missing password", None);
    };
    if username.is_empty() {
        return err(&req.id, "bad_params", "username must not be empty", None);
    }

    match state.engine.login(username, password).await {
        Ok(session) => ok(
            &req.id,
            json!({ "session": session, "view": view(state.engine.workflow()) }),
        ),
        Err(e) => flow_err(&req.id, &e),
    }
}

async fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.engine.logout().await {
        Ok(()) => ok(&req.id, view(state.engine.workflow())),
        Err(e) => flow_err(&req.id, &e),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "session": state.engine.workflow().session() }),
    )
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "session.login" => handle_login(state, req).await,
        "session.logout" => handle_logout(state, req).await,
        "session.get" => handle_get(state, req),
        _ => return None,
    };
    Some(resp)
}
