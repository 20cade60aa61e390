//! Local SQLite backend with the same append/delete-only contract as the
//! remote sheet. Used for development workspaces and tests.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::Connection;

use super::{Filter, RecordStore, Table};
use crate::error::{StoreError, StoreResult};
use crate::model::Row;

pub const DB_FILE_NAME: &str = "devaentry.sqlite3";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            table_name TEXT NOT NULL,
            row_json TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_table ON records(table_name, seq)",
        [],
    )?;
    Ok(())
}

impl SqliteStore {
    /// Open (or create) the store file inside `workspace`.
    pub fn open(workspace: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(workspace)
            .map_err(|e| StoreError::Backend(format!("create {}: {e}", workspace.display())))?;
        let conn = Connection::open(workspace.join(DB_FILE_NAME))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".into()))
    }

    fn rows_with_seq(conn: &Connection, table: Table) -> StoreResult<Vec<(i64, Row)>> {
        let mut stmt =
            conn.prepare("SELECT seq, row_json FROM records WHERE table_name = ? ORDER BY seq")?;
        let raw = stmt
            .query_map([table.as_str()], |r| {
                let seq: i64 = r.get(0)?;
                let json: String = r.get(1)?;
                Ok((seq, json))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;

        let mut out = Vec::with_capacity(raw.len());
        for (seq, json) in raw {
            let row: Row = serde_json::from_str(&json)?;
            out.push((seq, row));
        }
        Ok(out)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        let conn = self.lock()?;
        Ok(Self::rows_with_seq(&conn, table)?
            .into_iter()
            .map(|(_, row)| row)
            .filter(|row| filter.matches(row))
            .collect())
    }

    async fn create(&self, table: Table, row: Row) -> StoreResult<()> {
        let json = serde_json::to_string(&row)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO records(table_name, row_json) VALUES(?, ?)",
            (table.as_str(), &json),
        )?;
        Ok(())
    }

    async fn delete(&self, table: Table, key_column: &str, key_value: &str) -> StoreResult<usize> {
        let conn = self.lock()?;
        let doomed: Vec<i64> = Self::rows_with_seq(&conn, table)?
            .into_iter()
            .filter(|(_, row)| row.get(key_column).map(|v| v == key_value).unwrap_or(false))
            .map(|(seq, _)| seq)
            .collect();

        let tx = conn.unchecked_transaction()?;
        for seq in &doomed {
            tx.execute("DELETE FROM records WHERE seq = ?", [seq])?;
        }
        tx.commit()?;
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn append_list_delete_keeps_insertion_order() {
        let store = SqliteStore::open_in_memory().expect("open");
        store
            .create(Table::Roster, row(&[("Center Name", "B"), ("Student Name", "Zed")]))
            .await
            .expect("create");
        store
            .create(Table::Roster, row(&[("Center Name", "A"), ("Student Name", "Amy")]))
            .await
            .expect("create");
        store
            .create(Table::Entries, row(&[("UID", "x")]))
            .await
            .expect("create");

        let roster = store.list(Table::Roster, &Filter::all()).await.expect("list");
        let names: Vec<&str> = roster
            .iter()
            .map(|r| r.get("Student Name").map(String::as_str).unwrap_or(""))
            .collect();
        assert_eq!(names, vec!["Zed", "Amy"]);

        let removed = store
            .delete(Table::Roster, "Center Name", "B")
            .await
            .expect("delete");
        assert_eq!(removed, 1);
        assert_eq!(store.list(Table::Roster, &Filter::all()).await.expect("list").len(), 1);
        assert_eq!(store.list(Table::Entries, &Filter::all()).await.expect("list").len(), 1);

        let none = store
            .delete(Table::Roster, "Center Name", "B")
            .await
            .expect("delete");
        assert_eq!(none, 0);
    }
}
