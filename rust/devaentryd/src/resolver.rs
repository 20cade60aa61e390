//! Cascading roster lookups: center, then students of a center, then one
//! student's master attributes.
//!
//! Each stage reads the whole roster and filters locally. Store failures
//! degrade to an empty result so later stages never see an error.

use std::collections::{BTreeMap, HashSet};

use tracing::warn;

use crate::error::StoreResult;
use crate::model::{Center, Student};
use crate::store::{Filter, RecordStore, Table};

async fn roster(store: &dyn RecordStore) -> StoreResult<Vec<Student>> {
    let rows = store.list(Table::Roster, &Filter::all()).await?;
    Ok(rows.into_iter().filter_map(Student::from_row).collect())
}

async fn roster_or_empty(store: &dyn RecordStore, stage: &str) -> Vec<Student> {
    match roster(store).await {
        Ok(students) => students,
        Err(e) => {
            warn!(stage, error = %e, "roster fetch failed, showing no data");
            Vec::new()
        }
    }
}

/// Distinct center names, first-seen order.
pub async fn resolve_centers(store: &dyn RecordStore) -> Vec<Center> {
    let mut seen = HashSet::new();
    roster_or_empty(store, "centers")
        .await
        .into_iter()
        .filter(|s| seen.insert(s.center_id.clone()))
        .map(|s| Center(s.center_id))
        .collect()
}

/// Student names of `center` in roster order. No fetch for an empty center.
pub async fn resolve_students(store: &dyn RecordStore, center: &str) -> Vec<String> {
    if center.is_empty() {
        return Vec::new();
    }
    roster_or_empty(store, "students")
        .await
        .into_iter()
        .filter(|s| s.center_id == center)
        .map(|s| s.name)
        .collect()
}

/// Master columns of the `(center, student)` roster row; empty if there is none.
pub async fn resolve_master_attributes(
    store: &dyn RecordStore,
    center: &str,
    student: &str,
) -> BTreeMap<String, String> {
    if center.is_empty() || student.is_empty() {
        return BTreeMap::new();
    }
    roster_or_empty(store, "master")
        .await
        .into_iter()
        .find(|s| s.center_id == center && s.name == student)
        .map(|s| s.master_attributes)
        .unwrap_or_default()
}
