use tracing::{info, warn};

use crate::error::FlowError;
use crate::model::{Row, Session, UserRecord, COL_PASSWORD, COL_USERNAME};
use crate::store::{Filter, RecordStore, Table};

/// Look up `username`/`password` in the users table.
///
/// Exactly one match opens a session. No match and several matches are both
/// reported to the caller; neither is retried.
///
/// Only the username goes to the store (it ends up in a query string); the
/// password is compared locally.
pub async fn login(
    store: &dyn RecordStore,
    username: &str,
    password: &str,
) -> Result<Session, FlowError> {
    let rows: Vec<Row> = store
        .list(Table::Users, &Filter::all().eq(COL_USERNAME, username))
        .await?
        .into_iter()
        .filter(|row| row.get(COL_PASSWORD).map(String::as_str) == Some(password))
        .collect();

    match rows.as_slice() {
        [] => Err(FlowError::InvalidCredentials),
        [row] => {
            let session = UserRecord::from_row(row).into_session();
            info!(username = %session.username, center = %session.center_id, "session opened");
            Ok(session)
        }
        many => {
            warn!(username, count = many.len(), "duplicate user rows");
            Err(FlowError::AmbiguousIdentity {
                username: username.to_string(),
                count: many.len(),
            })
        }
    }
}
