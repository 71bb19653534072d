//! Analytical sink abstraction.
//!
//! The loader hands normalized rows to a [`RowSink`] in one bulk call. The
//! sink either accepts every row or reports which rows it refused.

use crate::normalize::NormalizedRow;
use async_trait::async_trait;
use relay_runtime::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fully qualified destination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableRef {
    /// Create a table reference, rejecting empty or path-like components
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Result<Self, SinkError> {
        let table = Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        };

        for (name, value) in [
            ("project_id", &table.project_id),
            ("dataset_id", &table.dataset_id),
            ("table_id", &table.table_id),
        ] {
            if value.trim().is_empty() || value.contains('/') {
                return Err(SinkError::InvalidTable {
                    message: format!("{} must be non-empty and must not contain '/'", name),
                });
            }
        }

        Ok(table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// One problem the sink reported for a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertErrorDetail {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub debug_info: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// All problems reported for the row at `index` of the submitted batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowInsertError {
    pub index: usize,
    pub errors: Vec<InsertErrorDetail>,
}

/// Errors from sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("BigQuery insertion errors: {}", render_row_errors(.0))]
    RowErrors(Vec<RowInsertError>),

    #[error("sink request failed: {message}")]
    Transport { message: String },

    #[error("sink rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("sink authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("invalid table reference: {message}")]
    InvalidTable { message: String },
}

impl SinkError {
    /// Row-level errors, if the sink refused individual rows
    pub fn row_errors(&self) -> Option<&[RowInsertError]> {
        match self {
            Self::RowErrors(errors) => Some(errors),
            _ => None,
        }
    }
}

fn render_row_errors(errors: &[RowInsertError]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| format!("{} row(s) rejected", errors.len()))
}

/// Destination for normalized rows
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Insert all rows in one request
    ///
    /// Returns the number of rows accepted. An empty slice is accepted
    /// without contacting the sink.
    async fn insert_rows(&self, rows: &[NormalizedRow]) -> Result<usize, SinkError>;

    /// Table the sink writes to
    fn table(&self) -> &TableRef;
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
