//! Wire format of host protocol messages.

use cellbook_core::{OutputDescriptor, OutputKind, Value};
use cellbook_server::{CellSource, ClientMessage, ServerMessage};
use serde_json::json;

#[test]
fn test_execute_cell_from_json() {
    let msg: ClientMessage = serde_json::from_value(json!({
        "type": "execute_cell",
        "cell_id": "c1",
        "source": "x = 1"
    }))
    .unwrap();
    assert_eq!(
        msg,
        ClientMessage::ExecuteCell {
            cell_id: "c1".to_string(),
            source: "x = 1".to_string(),
        }
    );
}

#[test]
fn test_execute_all_from_json() {
    let msg: ClientMessage = serde_json::from_value(json!({
        "type": "execute_all",
        "cells": [
            { "id": "a", "source": "x = 1" },
            { "id": "b", "source": "display(x)" }
        ]
    }))
    .unwrap();
    assert_eq!(
        msg,
        ClientMessage::ExecuteAll {
            cells: vec![CellSource::new("a", "x = 1"), CellSource::new("b", "display(x)")],
        }
    );
}

#[test]
fn test_unit_messages_from_json() {
    let edited: ClientMessage = serde_json::from_str(r#"{"type":"cell_edited"}"#).unwrap();
    assert_eq!(edited, ClientMessage::CellEdited);
    let done: ClientMessage = serde_json::from_str(r#"{"type":"auto_save_done"}"#).unwrap();
    assert_eq!(done, ClientMessage::AutoSaveDone);
}

#[test]
fn test_cell_result_to_json() {
    let msg = ServerMessage::CellResult {
        cell_id: "c1".to_string(),
        output: OutputDescriptor::new(
            OutputKind::Table,
            Value::Array(vec![Value::object([("mean", Value::Number(2.0))])]),
        )
        .with_timing(3),
    };
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({
            "type": "cell_result",
            "cell_id": "c1",
            "output": { "type": "table", "data": [{ "mean": 2 }], "timing_ms": 3 }
        })
    );
}

#[test]
fn test_auto_save_to_json() {
    assert_eq!(
        serde_json::to_value(ServerMessage::AutoSave).unwrap(),
        json!({ "type": "auto_save" })
    );
}

#[test]
fn test_unknown_message_rejected() {
    let result = serde_json::from_str::<ClientMessage>(r#"{"type":"interrupt"}"#);
    assert!(result.is_err());
}
