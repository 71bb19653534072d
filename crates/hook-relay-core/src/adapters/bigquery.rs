//! # BigQuery Streaming Insert Sink
//!
//! Writes rows through `tabledata.insertAll`:
//!
//! ```text
//! POST {endpoint}/bigquery/v2/projects/{p}/datasets/{d}/tables/{t}/insertAll
//! {"rows": [{"json": {...}}, ...]}
//! ```
//!
//! A 200 response may still carry `insertErrors` naming individual rows the
//! table refused; those are surfaced as [`SinkError::RowErrors`]. No
//! `insertId` is sent, so redelivered envelopes produce duplicate rows.

use crate::normalize::NormalizedRow;
use crate::sink::{InsertErrorDetail, RowInsertError, RowSink, SinkError, TableRef};
use async_trait::async_trait;
use relay_runtime::AccessTokenProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Public BigQuery API endpoint
pub const BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com";

#[derive(Debug, Serialize)]
struct InsertAllRequest<'a> {
    rows: Vec<InsertRow<'a>>,
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    json: &'a NormalizedRow,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<WireRowError>,
}

#[derive(Debug, Deserialize)]
struct WireRowError {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    errors: Vec<InsertErrorDetail>,
}

/// Streaming-insert sink for one table
pub struct BigQuerySink {
    http: reqwest::Client,
    table: TableRef,
    insert_url: String,
    tokens: Option<Arc<dyn AccessTokenProvider>>,
}

impl BigQuerySink {
    /// Create a sink against the public endpoint
    pub fn new(
        http: reqwest::Client,
        table: TableRef,
        tokens: Option<Arc<dyn AccessTokenProvider>>,
    ) -> Self {
        Self::with_endpoint(http, table, tokens, BIGQUERY_ENDPOINT)
    }

    /// Create a sink against a custom endpoint (emulators, tests)
    ///
    /// Without a token provider requests are sent unauthenticated.
    pub fn with_endpoint(
        http: reqwest::Client,
        table: TableRef,
        tokens: Option<Arc<dyn AccessTokenProvider>>,
        endpoint: &str,
    ) -> Self {
        let insert_url = format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            endpoint.trim_end_matches('/'),
            table.project_id,
            table.dataset_id,
            table.table_id
        );

        Self {
            http,
            table,
            insert_url,
            tokens,
        }
    }
}

#[async_trait]
impl RowSink for BigQuerySink {
    #[instrument(skip(self, rows), fields(table = %self.table, row_count = rows.len()))]
    async fn insert_rows(&self, rows: &[NormalizedRow]) -> Result<usize, SinkError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let body = InsertAllRequest {
            rows: rows.iter().map(|json| InsertRow { json }).collect(),
        };

        let mut request = self.http.post(&self.insert_url).json(&body);
        if let Some(tokens) = &self.tokens {
            let token = tokens.access_token().await?;
            request = request.bearer_auth(token.as_str());
        }

        let response = request.send().await.map_err(|e| SinkError::Transport {
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, "insertAll rejected");
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await.map_err(|e| SinkError::Transport {
            message: e.to_string(),
        })?;
        let parsed: InsertAllResponse = if text.trim().is_empty() {
            InsertAllResponse::default()
        } else {
            serde_json::from_str(&text).map_err(|e| SinkError::Transport {
                message: format!("unreadable insertAll response: {}", e),
            })?
        };

        if !parsed.insert_errors.is_empty() {
            let errors: Vec<RowInsertError> = parsed
                .insert_errors
                .into_iter()
                .map(|e| RowInsertError {
                    index: e.index,
                    errors: e.errors,
                })
                .collect();
            warn!(failed_rows = errors.len(), "insertAll reported row errors");
            return Err(SinkError::RowErrors(errors));
        }

        debug!("insertAll accepted all rows");
        Ok(rows.len())
    }

    fn table(&self) -> &TableRef {
        &self.table
    }
}

#[cfg(test)]
#[path = "bigquery_tests.rs"]
mod tests;
