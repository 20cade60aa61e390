//! Sidecar configuration

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub form: FormConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Remote spreadsheet over HTTP
    Sheetdb,
    /// Local SQLite workspace (development and tests)
    Sqlite,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Sheetdb => "sheetdb",
            Backend::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// Workspace directory for the sqlite backend; in-memory when absent
    #[serde(default)]
    pub workspace: Option<PathBuf>,

    #[serde(default)]
    pub sheetdb: SheetDbConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            workspace: None,
            sheetdb: SheetDbConfig::default(),
        }
    }
}

fn default_backend() -> Backend {
    Backend::Sheetdb
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetDbConfig {
    /// Endpoint of the center/student roster sheet
    #[serde(default)]
    pub roster_url: String,

    /// Endpoint of the entries sheet
    #[serde(default)]
    pub entries_url: String,

    /// Endpoint of the users sheet (only needed with sessions)
    #[serde(default)]
    pub users_url: String,

    /// Optional bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds; requests never time out when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Which entries a reconciled listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryScope {
    /// Everything entered for the center, by anyone.
    Center,
    /// Only entries written by the logged-in user.
    Owner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Require a login before the menu
    #[serde(default)]
    pub sessions: bool,

    /// Take the center from the session instead of asking for it
    #[serde(default)]
    pub center_from_session: bool,

    #[serde(default = "default_scope")]
    pub entries_scope: EntryScope,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            sessions: false,
            center_from_session: false,
            entries_scope: default_scope(),
        }
    }
}

fn default_scope() -> EntryScope {
    EntryScope::Center
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Column names of the data-entry form, in display order
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// The one field that must parse as a number
    #[serde(default = "default_numeric_field")]
    pub numeric_field: Option<String>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            numeric_field: default_numeric_field(),
        }
    }
}

fn default_fields() -> Vec<String> {
    (1..=5).map(|i| format!("Field{i}")).collect()
}

fn default_numeric_field() -> Option<String> {
    Some("Field1".to_string())
}

impl Config {
    /// Parse only; call [`Config::validate`] once CLI overrides are applied.
    pub fn from_toml(raw: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(raw)?)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Config::from_toml(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workflow.center_from_session && !self.workflow.sessions {
            bail!("workflow.center_from_session requires workflow.sessions");
        }
        if self.workflow.entries_scope == EntryScope::Owner && !self.workflow.sessions {
            bail!("workflow.entries_scope = \"owner\" requires workflow.sessions");
        }
        if self.form.fields.is_empty() {
            bail!("form.fields must name at least one field");
        }
        if let Some(numeric) = &self.form.numeric_field {
            if !self.form.fields.contains(numeric) {
                bail!("form.numeric_field {numeric:?} is not one of form.fields");
            }
        }
        if self.store.backend == Backend::Sheetdb {
            let sheetdb = &self.store.sheetdb;
            if sheetdb.roster_url.trim().is_empty() {
                bail!("store.sheetdb.roster_url is required for the sheetdb backend");
            }
            if sheetdb.entries_url.trim().is_empty() {
                bail!("store.sheetdb.entries_url is required for the sheetdb backend");
            }
            if self.workflow.sessions && sheetdb.users_url.trim().is_empty() {
                bail!("store.sheetdb.users_url is required when workflow.sessions is on");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").expect("parse");
        assert_eq!(config.store.backend, Backend::Sheetdb);
        assert!(!config.workflow.sessions);
        assert_eq!(config.workflow.entries_scope, EntryScope::Center);
        assert_eq!(config.form.fields.len(), 5);
        assert_eq!(config.form.numeric_field.as_deref(), Some("Field1"));
        assert_eq!(config.store.sheetdb.timeout_secs, None);
    }

    #[test]
    fn session_variant_parses() {
        let config = Config::from_toml(
            r#"
[store]
backend = "sqlite"
workspace = "/tmp/deva"

[workflow]
sessions = true
center_from_session = true
entries_scope = "owner"

[form]
fields = ["Amount", "Reason"]
numeric_field = "Amount"
"#,
        )
        .expect("parse");
        assert_eq!(config.store.backend, Backend::Sqlite);
        assert_eq!(config.store.workspace, Some(PathBuf::from("/tmp/deva")));
        assert!(config.workflow.center_from_session);
        assert_eq!(config.workflow.entries_scope, EntryScope::Owner);
        assert_eq!(config.form.fields, vec!["Amount", "Reason"]);
    }

    fn sqlite(extra: &str) -> Config {
        Config::from_toml(&format!("[store]\nbackend = \"sqlite\"\n{extra}")).expect("parse")
    }

    #[test]
    fn session_center_without_sessions_is_rejected() {
        let err = sqlite("[workflow]\ncenter_from_session = true\n")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("requires workflow.sessions"));
    }

    #[test]
    fn numeric_field_must_be_a_form_field() {
        let err = sqlite("[form]\nfields = [\"A\"]\nnumeric_field = \"B\"\n")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("numeric_field"));
    }

    #[test]
    fn sheetdb_backend_needs_its_endpoints() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("roster_url"));

        let err = Config::from_toml("[store.sheetdb]\nroster_url = \"https://sheet/r\"\n")
            .expect("parse")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("entries_url"));

        let shared = r#"
[store.sheetdb]
roster_url = "https://sheet/r"
entries_url = "https://sheet/e"
"#;
        Config::from_toml(shared).expect("parse").validate().expect("shared setup");

        let err = Config::from_toml(&format!("{shared}\n[workflow]\nsessions = true\n"))
            .expect("parse")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("users_url"));
    }

    #[test]
    fn sqlite_backend_needs_no_endpoints() {
        sqlite("").validate().expect("sqlite defaults");
    }
}
