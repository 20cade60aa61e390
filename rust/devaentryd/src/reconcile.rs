//! Collapse the entry history into one current entry per student.
//!
//! The store keeps every version of every entry. For a center (and, in
//! owner-scoped setups, a username) the effective entry of a student is the
//! one with the greatest timestamp. On equal timestamps the row seen first in
//! store order wins; that tie-break is arbitrary but stable.

use std::collections::btree_map;
use std::collections::BTreeMap;

use tracing::warn;

use crate::error::StoreResult;
use crate::model::{EffectiveEntry, Entry, Row};
use crate::store::{Filter, RecordStore, Table};

/// Pure fold over already-mapped entries. Output is ordered by student name.
pub fn collapse(
    entries: impl IntoIterator<Item = Entry>,
    center: &str,
    owner: Option<&str>,
) -> Vec<EffectiveEntry> {
    let mut latest: BTreeMap<String, EffectiveEntry> = BTreeMap::new();

    for entry in entries {
        if entry.center_id != center {
            continue;
        }
        if let Some(owner) = owner {
            if entry.username != owner {
                continue;
            }
        }
        match latest.entry(entry.student_name.clone()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(EffectiveEntry {
                    entry,
                    superseded: 0,
                });
            }
            btree_map::Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                let superseded = current.superseded + 1;
                if entry.timestamp > current.entry.timestamp {
                    current.entry = entry;
                }
                current.superseded = superseded;
            }
        }
    }

    latest.into_values().collect()
}

/// Map raw rows to entries. Returns the entries and how many rows were
/// unreadable (typically history written before rows carried a `UID`).
pub fn entries_from_rows(rows: Vec<Row>) -> (Vec<Entry>, usize) {
    let mut skipped = 0;
    let mut first_error = None;
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        match Entry::from_row(row) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                skipped += 1;
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    if let Some(e) = first_error {
        warn!(skipped, first = %e, "skipping unreadable entry rows");
    }
    (entries, skipped)
}

/// Full read of the entries table followed by [`collapse`].
pub async fn try_reconcile(
    store: &dyn RecordStore,
    center: &str,
    owner: Option<&str>,
) -> StoreResult<Vec<EffectiveEntry>> {
    let rows = store.list(Table::Entries, &Filter::all()).await?;
    let (entries, _) = entries_from_rows(rows);
    Ok(collapse(entries, center, owner))
}

/// Fail-soft variant used by the listing screens.
pub async fn reconcile(
    store: &dyn RecordStore,
    center: &str,
    owner: Option<&str>,
) -> Vec<EffectiveEntry> {
    if center.is_empty() {
        return Vec::new();
    }
    match try_reconcile(store, center, owner).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(center, error = %e, "entries fetch failed, showing no data");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(uid: &str, student: &str, ts: i64, amount: &str) -> Entry {
        let mut fields = BTreeMap::new();
        fields.insert("amount".to_string(), amount.to_string());
        Entry {
            uid: uid.to_string(),
            timestamp: Utc.timestamp_opt(ts, 0).single().expect("ts"),
            center_id: "C1".to_string(),
            username: "kim".to_string(),
            student_name: student.to_string(),
            fields,
        }
    }

    #[test]
    fn latest_timestamp_wins() {
        let out = collapse(
            vec![entry("A", "Sam", 1, "10"), entry("A", "Sam", 2, "20")],
            "C1",
            None,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entry.fields.get("amount").map(String::as_str), Some("20"));
        assert_eq!(out[0].superseded, 1);
    }

    #[test]
    fn order_of_history_does_not_matter() {
        let out = collapse(
            vec![
                entry("A", "Sam", 5, "50"),
                entry("A", "Sam", 2, "20"),
                entry("B", "Ana", 3, "30"),
                entry("A", "Sam", 4, "40"),
            ],
            "C1",
            None,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].entry.student_name, "Ana");
        assert_eq!(out[1].entry.fields.get("amount").map(String::as_str), Some("50"));
        assert_eq!(out[1].superseded, 2);
    }

    #[test]
    fn equal_timestamps_keep_first_seen() {
        let out = collapse(
            vec![entry("A", "Sam", 7, "first"), entry("B", "Sam", 7, "second")],
            "C1",
            None,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entry.uid, "A");
    }

    #[test]
    fn center_and_owner_filters_apply_before_folding() {
        let mut other_center = entry("X", "Sam", 9, "99");
        other_center.center_id = "C2".to_string();
        let mut other_owner = entry("Y", "Sam", 8, "88");
        other_owner.username = "lee".to_string();
        let history = vec![entry("A", "Sam", 1, "10"), other_center, other_owner];

        let shared = collapse(history.clone(), "C1", None);
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].entry.uid, "Y");

        let private = collapse(history, "C1", Some("kim"));
        assert_eq!(private.len(), 1);
        assert_eq!(private[0].entry.uid, "A");
    }

    #[test]
    fn rows_without_uid_are_counted_and_skipped() {
        let mut good = entry("A", "Sam", 1, "10").to_row();
        good.insert("Note".to_string(), "kept".to_string());
        let mut legacy = good.clone();
        legacy.remove("UID");
        let mut garbled = good.clone();
        garbled.insert("Timestamp".to_string(), "last tuesday".to_string());

        let (entries, skipped) = entries_from_rows(vec![legacy.clone(), good, legacy, garbled]);
        assert_eq!(skipped, 3);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uid, "A");
    }

    #[test]
    fn collapse_is_idempotent() {
        let history = vec![
            entry("A", "Sam", 1, "10"),
            entry("B", "Ana", 2, "20"),
            entry("A", "Sam", 3, "30"),
        ];
        let once = collapse(history.clone(), "C1", None);
        let twice = collapse(history, "C1", None);
        assert_eq!(once, twice);
    }
}
