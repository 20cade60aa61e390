//! Guided data-entry engine for per-student adjustment records.
//!
//! The engine drives a small workflow (menu, enter, view, edit) against a
//! spreadsheet-shaped record store that only supports list, append and
//! delete. The `devaentryd` binary exposes it to a UI over line-delimited
//! JSON on stdin/stdout.

pub mod config;
pub mod engine;
pub mod error;
pub mod form;
pub mod ipc;
pub mod model;
pub mod reconcile;
pub mod resolver;
pub mod session;
pub mod store;
pub mod update;
pub mod workflow;

pub use engine::Engine;
pub use error::{FlowError, StoreError, UpdateFailure};
pub use store::{Filter, RecordStore, Table};
