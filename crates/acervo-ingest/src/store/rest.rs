//! PostgREST (Supabase) backend
//!
//! Talks to `<base>/rest/v1/<table>` with the project key sent both as
//! `apikey` and as a bearer token.

use super::{ReferenceStore, StoreResult};
use crate::error::StoreError;
use acervo_common::types::CleanRecord;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

const DEFAULT_PAGE_SIZE: usize = 1000;

pub struct RestReferenceStore {
    client: Client,
    endpoint: String,
    key: String,
    page_size: usize,
}

#[derive(Deserialize)]
struct TermRow {
    termo: String,
}

impl RestReferenceStore {
    pub fn new(base_url: &str, key: &str, table: &str) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("acervo-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            key: key.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Rows fetched per `select_keys` page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        self.authorized(request).send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                StoreError::Unreachable(e.to_string())
            } else {
                StoreError::Http(e)
            }
        })
    }

    async fn insert_json<T: serde::Serialize + ?Sized + Sync>(&self, body: &T) -> StoreResult<()> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "return=minimal")
            .json(body);

        let response = self.send(request).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejection(response).await)
        }
    }
}

async fn rejection(response: Response) -> StoreError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized(message),
        _ => StoreError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl ReferenceStore for RestReferenceStore {
    fn backend_name(&self) -> &'static str {
        "rest"
    }

    async fn table_exists(&self) -> StoreResult<bool> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "id"), ("limit", "1")]);

        let response = self.send(request).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(rejection(response).await),
        }
    }

    /// Pages are ordered by `id` and read until one comes back empty, so a
    /// server-side `max-rows` below the page size cannot end the scan early.
    async fn select_keys(&self) -> StoreResult<HashSet<String>> {
        let mut keys = HashSet::new();
        let mut offset = 0;

        loop {
            let request = self.client.get(&self.endpoint).query(&[
                ("select", "termo".to_string()),
                ("order", "id".to_string()),
                ("limit", self.page_size.to_string()),
                ("offset", offset.to_string()),
            ]);

            let response = self.send(request).await?;
            if !response.status().is_success() {
                return Err(rejection(response).await);
            }

            let rows: Vec<TermRow> = response
                .json()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            let fetched = rows.len();
            keys.extend(rows.into_iter().map(|row| row.termo));

            debug!("Fetched {} existing terms (offset {})", fetched, offset);

            if fetched == 0 {
                break;
            }
            offset += fetched;
        }

        Ok(keys)
    }

    async fn insert_many(&self, records: &[CleanRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.insert_json(records).await
    }

    async fn insert_one(&self, record: &CleanRecord) -> StoreResult<()> {
        self.insert_json(record).await
    }
}
