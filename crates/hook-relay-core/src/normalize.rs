//! Projection of event records onto the fixed sink schema.

use crate::envelope::EventRecord;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Sink columns, in insertion order
pub const EXPECTED_COLUMNS: [&str; 10] = [
    "appId",
    "eventId",
    "subscriptionId",
    "portalId",
    "occurredAt",
    "subscriptionType",
    "attemptNumber",
    "objectId",
    "changeSource",
    "changeFlag",
];

/// An event record restricted to exactly the sink columns
///
/// Columns absent from the source record hold `null`; keys outside the
/// schema are dropped. Values are carried through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    values: [Value; 10],
}

impl NormalizedRow {
    pub fn from_record(record: &EventRecord) -> Self {
        Self {
            values: EXPECTED_COLUMNS.map(|column| record.get(column).cloned().unwrap_or(Value::Null)),
        }
    }

    /// Value of a column, or `None` if `column` is not part of the schema
    pub fn get(&self, column: &str) -> Option<&Value> {
        EXPECTED_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|index| &self.values[index])
    }

    /// `(column, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        EXPECTED_COLUMNS.iter().copied().zip(self.values.iter())
    }
}

impl Serialize for NormalizedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(EXPECTED_COLUMNS.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Normalize every record, preserving order
pub fn normalize(records: &[EventRecord]) -> Vec<NormalizedRow> {
    records.iter().map(NormalizedRow::from_record).collect()
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
