//! # In-Memory Row Sink
//!
//! Thread-safe sink for testing and local development. Keeps every inserted
//! row and can be scripted to refuse the next batch with row errors.

use crate::normalize::NormalizedRow;
use crate::sink::{RowInsertError, RowSink, SinkError, TableRef};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct SinkState {
    rows: Vec<NormalizedRow>,
    insert_calls: usize,
    scripted_failure: Option<Vec<RowInsertError>>,
}

/// Sink that stores rows in memory
#[derive(Debug, Clone)]
pub struct InMemorySink {
    table: TableRef,
    state: Arc<Mutex<SinkState>>,
}

impl InMemorySink {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            state: Arc::new(Mutex::new(SinkState::default())),
        }
    }

    /// Snapshot of all rows inserted so far
    pub fn rows(&self) -> Vec<NormalizedRow> {
        self.state
            .lock()
            .map(|state| state.rows.clone())
            .unwrap_or_default()
    }

    /// Number of non-empty insert calls received
    pub fn insert_calls(&self) -> usize {
        self.state.lock().map(|state| state.insert_calls).unwrap_or_default()
    }

    /// Refuse the next non-empty batch with the given row errors
    pub fn fail_next_with(&self, errors: Vec<RowInsertError>) {
        if let Ok(mut state) = self.state.lock() {
            state.scripted_failure = Some(errors);
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|state| state.rows.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new(TableRef {
            project_id: "local".to_string(),
            dataset_id: "hubspot".to_string(),
            table_id: "events".to_string(),
        })
    }
}

#[async_trait]
impl RowSink for InMemorySink {
    async fn insert_rows(&self, rows: &[NormalizedRow]) -> Result<usize, SinkError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut state = self.state.lock().map_err(|_| SinkError::Transport {
            message: "in-memory sink lock poisoned".to_string(),
        })?;
        state.insert_calls += 1;

        if let Some(errors) = state.scripted_failure.take() {
            return Err(SinkError::RowErrors(errors));
        }

        state.rows.extend_from_slice(rows);
        Ok(rows.len())
    }

    fn table(&self) -> &TableRef {
        &self.table
    }
}

#[cfg(test)]
#[path = "memory_sink_tests.rs"]
mod tests;
