//! Host protocol messages.
//!
//! Defines the message types exchanged between the host application and a
//! session, over WebSocket as JSON.

use cellbook_core::OutputDescriptor;
use serde::{Deserialize, Serialize};

/// A cell submitted for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSource {
    /// Cell identifier.
    pub id: String,
    /// Cell source text.
    pub source: String,
}

impl CellSource {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
        }
    }
}

/// Messages sent from host to session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Execute one cell, queued behind any running cell.
    ExecuteCell {
        /// Cell identifier.
        cell_id: String,
        /// Source code.
        source: String,
    },

    /// Reset the context and run every cell in order.
    ExecuteAll {
        /// Cells in notebook order.
        cells: Vec<CellSource>,
    },

    /// Notebook content changed; feeds the auto-save debounce.
    CellEdited,

    /// The host finished an auto-save.
    AutoSaveDone,
}

/// Messages sent from session to host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Terminal result of one cell execution.
    CellResult {
        /// Cell that finished.
        cell_id: String,
        /// Output descriptor for the rendering layer.
        output: OutputDescriptor,
    },

    /// The host should persist the notebook now.
    AutoSave,

    /// Request-level error (malformed message, closed session).
    Error {
        /// Error message.
        message: String,
    },
}
