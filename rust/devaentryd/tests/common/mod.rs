#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use devaentryd::error::{StoreError, StoreResult};
use devaentryd::model::{format_timestamp, Row};
use devaentryd::store::SqliteStore;
use devaentryd::{Filter, RecordStore, Table};

/// SQLite-backed store whose operations can be made to fail on demand.
pub struct FaultyStore {
    inner: SqliteStore,
    pub fail_list: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    pub lists: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteStore::open_in_memory().expect("open in-memory store"),
            fail_list: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            lists: AtomicUsize::new(0),
        })
    }

    pub fn set(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    fn injected(op: &str) -> StoreError {
        StoreError::Server {
            status: 503,
            message: format!("injected {op} failure"),
        }
    }
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::injected("list"));
        }
        self.inner.list(table, filter).await
    }

    async fn create(&self, table: Table, row: Row) -> StoreResult<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::injected("create"));
        }
        self.inner.create(table, row).await
    }

    async fn delete(&self, table: Table, key_column: &str, key_value: &str) -> StoreResult<usize> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::injected("delete"));
        }
        self.inner.delete(table, key_column, key_value).await
    }
}

pub fn row(pairs: &[(&str, &str)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<BTreeMap<_, _>>()
}

pub async fn seed_roster(store: &dyn RecordStore, rows: &[(&str, &str, &str)]) {
    for (center, student, birth) in rows {
        store
            .create(
                Table::Roster,
                row(&[
                    ("Center Name", *center),
                    ("Student Name", *student),
                    ("Birth Date", *birth),
                    ("Agreement Date", "2024-09-01"),
                ]),
            )
            .await
            .expect("seed roster");
    }
}

/// Entry row with a timestamp `secs` after 2024-01-01T00:00:00Z.
pub fn entry_row(uid: &str, center: &str, user: &str, student: &str, secs: i64, amount: &str) -> Row {
    let base = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .expect("base")
        .with_timezone(&chrono::Utc);
    let ts = format_timestamp(base + chrono::Duration::seconds(secs));
    row(&[
        ("UID", uid),
        ("Timestamp", ts.as_str()),
        ("Center Name", center),
        ("Username", user),
        ("Student Name", student),
        ("Field1", amount),
        ("Field2", "note"),
    ])
}

pub async fn seed_entries(store: &dyn RecordStore, rows: Vec<Row>) {
    for r in rows {
        store.create(Table::Entries, r).await.expect("seed entry");
    }
}
