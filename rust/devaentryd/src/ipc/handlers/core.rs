use crate::ipc::error::ok;
use crate::ipc::helpers::view;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "backend": state.backend,
            "step": state.engine.workflow().step(),
        }),
    )
}

fn handle_workflow_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, view(state.engine.workflow()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workflow.get" => Some(handle_workflow_get(state, req)),
        _ => None,
    }
}
