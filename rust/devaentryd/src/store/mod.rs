//! Record store capability: list, append and delete over three tables.
//!
//! There is no update and no multi-row transaction; callers that need an
//! edit go through `update::update_entry`.

mod sheetdb;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Backend, StoreConfig};
use crate::error::StoreResult;
use crate::model::Row;

pub use sheetdb::SheetDbStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Center/student roster with master attributes.
    Roster,
    /// Append-only history of data entries.
    Entries,
    /// Login accounts.
    Users,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Roster => "roster",
            Table::Entries => "entries",
            Table::Users => "users",
        }
    }
}

/// Conjunction of exact column matches. Empty means "all rows".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<(String, String)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[(String, String)] {
        &self.conditions
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(col, val)| row.get(col).map(|v| v == val).unwrap_or(false))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows of `table` matching `filter`, in store order.
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>>;

    /// Append one row. Never merges with existing rows.
    async fn create(&self, table: Table, row: Row) -> StoreResult<()>;

    /// Remove every row whose `key_column` equals `key_value`; returns how many
    /// rows were removed.
    async fn delete(&self, table: Table, key_column: &str, key_value: &str) -> StoreResult<usize>;
}

/// Build the configured backend.
pub fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.backend {
        Backend::Sheetdb => {
            let store = SheetDbStore::new(&config.sheetdb)?;
            Ok(Arc::new(store))
        }
        Backend::Sqlite => {
            let store = match config.workspace.as_ref() {
                Some(path) => SqliteStore::open(path)?,
                None => SqliteStore::open_in_memory()?,
            };
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_requires_every_condition() {
        let mut row = Row::new();
        row.insert("Username".into(), "kim".into());
        row.insert("Password".into(), "pw".into());

        assert!(Filter::all().matches(&row));
        assert!(Filter::all().eq("Username", "kim").matches(&row));
        assert!(!Filter::all().eq("Username", "kim").eq("Password", "nope").matches(&row));
        assert!(!Filter::all().eq("Missing", "").matches(&row));
    }
}
