//! Tests for sink types.

use super::*;

#[test]
fn test_table_ref_displays_dotted_path() {
    let table = TableRef::new("proj", "analytics", "hubspot_events").unwrap();
    assert_eq!(table.to_string(), "proj.analytics.hubspot_events");
}

#[test]
fn test_table_ref_rejects_empty_component() {
    let result = TableRef::new("proj", "", "events");
    assert!(matches!(result, Err(SinkError::InvalidTable { .. })));
}

#[test]
fn test_table_ref_rejects_path_component() {
    let result = TableRef::new("proj", "ds", "a/b");
    assert!(matches!(result, Err(SinkError::InvalidTable { .. })));
}

#[test]
fn test_row_errors_display_enumerates_rows() {
    let error = SinkError::RowErrors(vec![RowInsertError {
        index: 0,
        errors: vec![InsertErrorDetail {
            reason: Some("invalid".to_string()),
            location: Some("appId".to_string()),
            debug_info: None,
            message: Some("no such field".to_string()),
        }],
    }]);

    let rendered = error.to_string();

    assert!(rendered.starts_with("BigQuery insertion errors: "));
    assert!(rendered.contains("\"index\":0"));
    assert!(rendered.contains("no such field"));
    assert_eq!(error.row_errors().map(<[_]>::len), Some(1));
}

#[test]
fn test_insert_error_detail_parses_wire_format() {
    let detail: InsertErrorDetail = serde_json::from_str(
        r#"{"reason":"invalid","location":"changeFlag","debugInfo":"","message":"bad"}"#,
    )
    .unwrap();

    assert_eq!(detail.reason.as_deref(), Some("invalid"));
    assert_eq!(detail.debug_info.as_deref(), Some(""));
}

#[test]
fn test_transport_error_has_no_row_errors() {
    let error = SinkError::Transport {
        message: "connection reset".to_string(),
    };
    assert!(error.row_errors().is_none());
}
