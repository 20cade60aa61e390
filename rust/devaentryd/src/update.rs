//! Writes against the append/delete-only entries table.
//!
//! New entries are a single append. An edit is a two-step saga: delete every
//! row carrying the entry's `uid`, then append the replacement with the same
//! `uid` and a later timestamp. Between the two steps the logical record does
//! not exist in the store; the journal keeps the replacement so a failed
//! second step stays visible and can be re-issued by the user.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{FlowError, UpdateFailure};
use crate::model::{Entry, COL_UID};
use crate::store::{RecordStore, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SagaPhase {
    /// Delete not yet acknowledged.
    Pending,
    /// Old rows are gone, replacement not yet written.
    DeletedPendingCreate,
    /// Create failed after a successful delete.
    Torn,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSaga {
    pub uid: String,
    pub phase: SagaPhase,
    pub replacement: Entry,
}

/// Edits that have started but not finished, keyed by uid.
#[derive(Debug, Default)]
pub struct EditJournal {
    sagas: BTreeMap<String, EditSaga>,
}

impl EditJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, uid: &str, phase: SagaPhase, replacement: &Entry) {
        debug!(uid, ?phase, "edit saga");
        self.sagas.insert(
            uid.to_string(),
            EditSaga {
                uid: uid.to_string(),
                phase,
                replacement: replacement.clone(),
            },
        );
    }

    fn finish(&mut self, uid: &str) {
        self.sagas.remove(uid);
    }

    pub fn get(&self, uid: &str) -> Option<&EditSaga> {
        self.sagas.get(uid)
    }

    pub fn torn(&self) -> Vec<EditSaga> {
        self.sagas
            .values()
            .filter(|s| s.phase == SagaPhase::Torn)
            .cloned()
            .collect()
    }
}

/// A fresh 128-bit random identifier.
pub fn new_uid() -> String {
    Uuid::new_v4().to_string()
}

/// `now` at store precision, unless that would not be strictly after `previous`.
pub fn next_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(3);
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

/// Append a brand new entry.
pub async fn create_entry(store: &dyn RecordStore, entry: &Entry) -> Result<(), FlowError> {
    store.create(Table::Entries, entry.to_row()).await?;
    info!(uid = %entry.uid, student = %entry.student_name, "entry created");
    Ok(())
}

/// Replace `original` with a copy carrying `fields`.
///
/// Returns the replacement on success. A failed or no-op delete is
/// `Rejected` and leaves the store untouched; a failed create after a
/// successful delete is `Partial` and leaves the saga `Torn` in `journal`.
pub async fn update_entry(
    store: &dyn RecordStore,
    journal: &mut EditJournal,
    original: &Entry,
    fields: BTreeMap<String, String>,
) -> Result<Entry, UpdateFailure> {
    let uid = original.uid.clone();
    let replacement = Entry {
        uid: uid.clone(),
        timestamp: next_timestamp(original.timestamp, Utc::now()),
        center_id: original.center_id.clone(),
        username: original.username.clone(),
        student_name: original.student_name.clone(),
        fields,
    };

    journal.record(&uid, SagaPhase::Pending, &replacement);
    match store.delete(Table::Entries, COL_UID, &uid).await {
        Ok(0) => {
            journal.finish(&uid);
            return Err(UpdateFailure::Rejected {
                uid,
                reason: "no stored entry has this uid".to_string(),
            });
        }
        Ok(removed) => debug!(uid = %uid, removed, "old versions deleted"),
        Err(e) => {
            journal.finish(&uid);
            return Err(UpdateFailure::Rejected {
                uid,
                reason: e.to_string(),
            });
        }
    }

    journal.record(&uid, SagaPhase::DeletedPendingCreate, &replacement);
    if let Err(e) = store.create(Table::Entries, replacement.to_row()).await {
        journal.record(&uid, SagaPhase::Torn, &replacement);
        error!(
            uid = %uid,
            student = %replacement.student_name,
            fields = ?replacement.fields,
            error = %e,
            "entry deleted but replacement not written"
        );
        return Err(UpdateFailure::Partial {
            uid,
            replacement: Box::new(replacement),
            source: e,
        });
    }

    journal.finish(&uid);
    info!(uid = %uid, "entry updated");
    Ok(replacement)
}

/// Re-issue the create step of a torn edit.
pub async fn recover(
    store: &dyn RecordStore,
    journal: &mut EditJournal,
    uid: &str,
) -> Result<Entry, FlowError> {
    let Some(saga) = journal.get(uid).filter(|s| s.phase == SagaPhase::Torn) else {
        return Err(FlowError::NotReady(format!("no torn edit for entry {uid}")));
    };
    let mut replacement = saga.replacement.clone();
    replacement.timestamp = next_timestamp(replacement.timestamp, Utc::now());

    store.create(Table::Entries, replacement.to_row()).await?;
    journal.finish(uid);
    info!(uid, "torn edit recovered");
    Ok(replacement)
}
