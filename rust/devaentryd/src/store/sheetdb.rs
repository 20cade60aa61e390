//! HTTP backend for SheetDB-style spreadsheet APIs.
//!
//! Each table is its own endpoint URL:
//! - `GET {url}` lists every row, `GET {url}/search?col=val` filters
//! - `POST {url}` with `{"data":[row]}` appends
//! - `DELETE {url}/{col}/{val}` removes matching rows

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::debug;

use super::{Filter, RecordStore, Table};
use crate::config::SheetDbConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::{row_from_json, Row};

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    created: usize,
}

#[derive(Debug, Deserialize)]
struct DeletedResponse {
    deleted: usize,
}

pub struct SheetDbStore {
    config: SheetDbConfig,
    client: Client,
}

impl SheetDbStore {
    pub fn new(config: &SheetDbConfig) -> StoreResult<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| StoreError::Backend(format!("invalid API key: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        // No timeout unless one is configured.
        let mut builder = Client::builder().default_headers(headers);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    fn url(&self, table: Table) -> StoreResult<&str> {
        let url = match table {
            Table::Roster => &self.config.roster_url,
            Table::Entries => &self.config.entries_url,
            Table::Users => &self.config.users_url,
        };
        let url = url.trim_end_matches('/');
        if url.is_empty() {
            return Err(StoreError::Backend(format!(
                "no endpoint configured for table {}",
                table.as_str()
            )));
        }
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> StoreResult<T> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Server {
                status,
                message: body,
            });
        }

        let body = response.json().await?;
        Ok(body)
    }
}

#[async_trait]
impl RecordStore for SheetDbStore {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        let base = self.url(table)?;
        let url = if filter.is_empty() {
            base.to_string()
        } else {
            let mut params: Vec<String> = filter
                .conditions()
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            params.push("casesensitive=true".to_string());
            format!("{}/search?{}", base, params.join("&"))
        };

        debug!(table = table.as_str(), "sheetdb list");
        let response = self.client.get(&url).send().await?;
        let objects: Vec<serde_json::Map<String, serde_json::Value>> =
            self.handle_response(response).await?;

        // The search endpoint matches loosely on some deployments; keep exact semantics.
        Ok(objects
            .into_iter()
            .map(row_from_json)
            .filter(|row| filter.matches(row))
            .collect())
    }

    async fn create(&self, table: Table, row: Row) -> StoreResult<()> {
        let url = self.url(table)?;
        debug!(table = table.as_str(), "sheetdb create");

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&serde_json::json!({ "data": [row] }))
            .send()
            .await?;

        let created: CreatedResponse = self.handle_response(response).await?;
        if created.created != 1 {
            return Err(StoreError::InvalidResponse(format!(
                "expected 1 created row, store reported {}",
                created.created
            )));
        }
        Ok(())
    }

    async fn delete(&self, table: Table, key_column: &str, key_value: &str) -> StoreResult<usize> {
        let url = format!(
            "{}/{}/{}",
            self.url(table)?,
            urlencoding::encode(key_column),
            urlencoding::encode(key_value)
        );
        debug!(table = table.as_str(), key_column, "sheetdb delete");

        let response = self.client.delete(&url).send().await?;
        let deleted: DeletedResponse = self.handle_response(response).await?;
        Ok(deleted.deleted)
    }
}
