//! Typed records and their mapping to store rows.
//!
//! The store hands out string-keyed rows; nothing outside this module and
//! `store` looks at column names.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub const COL_CENTER: &str = "Center Name";
pub const COL_STUDENT: &str = "Student Name";
pub const COL_UID: &str = "UID";
pub const COL_TIMESTAMP: &str = "Timestamp";
pub const COL_USERNAME: &str = "Username";
pub const COL_PASSWORD: &str = "Password";

/// One raw row as the store returns it.
pub type Row = BTreeMap<String, String>;

/// Flatten a JSON object into a row. Non-string scalars keep their JSON text.
pub fn row_from_json(obj: serde_json::Map<String, serde_json::Value>) -> Row {
    obj.into_iter()
        .map(|(k, v)| {
            let s = match v {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, s)
        })
        .collect()
}

fn cell<'a>(row: &'a Row, col: &str) -> &'a str {
    row.get(col).map(|s| s.as_str()).unwrap_or("")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub center_id: String,
}

/// A center is identified by its name; there is no surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Center(pub String);

impl Center {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A roster row: the student plus whatever master columns the roster carries
/// (agreement date, birth date, billing status, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub center_id: String,
    pub name: String,
    pub master_attributes: BTreeMap<String, String>,
}

impl Student {
    pub fn from_row(mut row: Row) -> Option<Student> {
        let center_id = row.remove(COL_CENTER).unwrap_or_default();
        let name = row.remove(COL_STUDENT).unwrap_or_default();
        if center_id.is_empty() || name.is_empty() {
            return None;
        }
        Some(Student {
            center_id,
            name,
            master_attributes: row,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub center_id: String,
}

impl UserRecord {
    pub fn from_row(row: &Row) -> UserRecord {
        UserRecord {
            username: cell(row, COL_USERNAME).to_string(),
            center_id: cell(row, COL_CENTER).to_string(),
        }
    }

    pub fn into_session(self) -> Session {
        Session {
            username: self.username,
            center_id: self.center_id,
        }
    }
}

/// Why a row could not be read as an [`Entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    MissingColumn(&'static str),
    BadTimestamp(String),
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowError::MissingColumn(c) => write!(f, "missing column {c:?}"),
            RowError::BadTimestamp(t) => write!(f, "unparseable timestamp {t:?}"),
        }
    }
}

/// One immutable data-entry row. Edits produce a new row with the same `uid`
/// and a later `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub uid: String,
    pub timestamp: DateTime<Utc>,
    pub center_id: String,
    pub username: String,
    pub student_name: String,
    pub fields: BTreeMap<String, String>,
}

impl Entry {
    pub fn from_row(mut row: Row) -> Result<Entry, RowError> {
        let uid = row.remove(COL_UID).unwrap_or_default();
        if uid.is_empty() {
            return Err(RowError::MissingColumn(COL_UID));
        }
        let raw_ts = row.remove(COL_TIMESTAMP).unwrap_or_default();
        if raw_ts.is_empty() {
            return Err(RowError::MissingColumn(COL_TIMESTAMP));
        }
        let timestamp = parse_timestamp(&raw_ts).ok_or(RowError::BadTimestamp(raw_ts))?;
        let center_id = row.remove(COL_CENTER).unwrap_or_default();
        let username = row.remove(COL_USERNAME).unwrap_or_default();
        let student_name = row.remove(COL_STUDENT).unwrap_or_default();
        Ok(Entry {
            uid,
            timestamp,
            center_id,
            username,
            student_name,
            fields: row,
        })
    }

    pub fn to_row(&self) -> Row {
        let mut row = self.fields.clone();
        row.insert(COL_UID.to_string(), self.uid.clone());
        row.insert(COL_TIMESTAMP.to_string(), format_timestamp(self.timestamp));
        row.insert(COL_CENTER.to_string(), self.center_id.clone());
        row.insert(COL_USERNAME.to_string(), self.username.clone());
        row.insert(COL_STUDENT.to_string(), self.student_name.clone());
        row
    }
}

/// The current entry for one student: the latest raw entry by timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveEntry {
    #[serde(flatten)]
    pub entry: Entry,
    /// Older raw rows for the same student that this one supersedes.
    pub superseded: usize,
}

/// Millisecond RFC 3339 in UTC, the shape browsers produce for `toISOString`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time truncated to what the store keeps.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_row(uid: &str, ts: &str) -> Row {
        let mut row = Row::new();
        row.insert(COL_UID.into(), uid.into());
        row.insert(COL_TIMESTAMP.into(), ts.into());
        row.insert(COL_CENTER.into(), "North".into());
        row.insert(COL_STUDENT.into(), "Sam".into());
        row.insert("Field1".into(), "12.5".into());
        row
    }

    #[test]
    fn entry_row_mapping_keeps_form_columns_as_fields() {
        let entry = Entry::from_row(entry_row("u-1", "2024-03-01T10:00:00.000Z")).expect("entry");
        assert_eq!(entry.uid, "u-1");
        assert_eq!(entry.center_id, "North");
        assert_eq!(entry.student_name, "Sam");
        assert_eq!(entry.username, "");
        assert_eq!(entry.fields.len(), 1);
        assert_eq!(entry.fields.get("Field1").map(String::as_str), Some("12.5"));

        let row = entry.to_row();
        assert_eq!(row.get(COL_TIMESTAMP).map(String::as_str), Some("2024-03-01T10:00:00.000Z"));
        assert_eq!(Entry::from_row(row).expect("reparse"), entry);
    }

    #[test]
    fn entry_without_uid_is_rejected() {
        let mut row = entry_row("", "2024-03-01T10:00:00.000Z");
        row.remove(COL_UID);
        assert_eq!(Entry::from_row(row), Err(RowError::MissingColumn(COL_UID)));
    }

    #[test]
    fn entry_with_garbage_timestamp_is_rejected() {
        let err = Entry::from_row(entry_row("u-1", "yesterday")).unwrap_err();
        assert_eq!(err, RowError::BadTimestamp("yesterday".into()));
    }

    #[test]
    fn student_row_requires_center_and_name() {
        let mut row = Row::new();
        row.insert(COL_CENTER.into(), "North".into());
        row.insert(COL_STUDENT.into(), "Ana".into());
        row.insert("Birth Date".into(), "2015-02-03".into());
        let student = Student::from_row(row.clone()).expect("student");
        assert_eq!(student.master_attributes.len(), 1);

        row.insert(COL_STUDENT.into(), String::new());
        assert!(Student::from_row(row).is_none());
    }

    #[test]
    fn json_scalars_flatten_to_strings() {
        let obj = serde_json::json!({ "Field1": 10, "Paid": true, "Note": null, "Name": "x" });
        let row = row_from_json(obj.as_object().cloned().expect("object"));
        assert_eq!(row.get("Field1").map(String::as_str), Some("10"));
        assert_eq!(row.get("Paid").map(String::as_str), Some("true"));
        assert_eq!(row.get("Note").map(String::as_str), Some(""));
        assert_eq!(row.get("Name").map(String::as_str), Some("x"));
    }
}
