//! # Infrastructure Adapters
//!
//! Implementations of the [`RowSink`](crate::sink::RowSink) interface.

pub mod bigquery;
pub mod memory_sink;

pub use bigquery::{BigQuerySink, BIGQUERY_ENDPOINT};
pub use memory_sink::InMemorySink;
