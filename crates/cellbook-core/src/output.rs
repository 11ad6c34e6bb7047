//! Output classification.
//!
//! Turns a cell's result value into the [`OutputDescriptor`] the rendering
//! layer consumes. An explicit hint from `display(value, "kind")` wins;
//! otherwise the kind is inferred from the value's shape.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Marker text for cells that neither display nor produce a value.
pub const NO_OUTPUT: &str = "(no output)";

/// Rendering kind of a cell output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Text,
    Table,
    Sequence,
    Alignment,
    Error,
}

impl OutputKind {
    /// Parse a display hint. Unknown hints yield `None`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim() {
            "text" => Some(Self::Text),
            "table" => Some(Self::Table),
            "sequence" => Some(Self::Sequence),
            "alignment" => Some(Self::Alignment),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Table => "table",
            Self::Sequence => "sequence",
            Self::Alignment => "alignment",
            Self::Error => "error",
        }
    }
}

/// Renderer-facing result of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    #[serde(rename = "type")]
    pub kind: OutputKind,
    pub data: Value,
    pub timing_ms: u64,
}

impl OutputDescriptor {
    pub fn new(kind: OutputKind, data: Value) -> Self {
        Self {
            kind,
            data,
            timing_ms: 0,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(OutputKind::Text, Value::String(text.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(OutputKind::Error, Value::String(message.into()))
    }

    pub fn with_timing(mut self, timing_ms: u64) -> Self {
        self.timing_ms = timing_ms;
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == OutputKind::Error
    }
}

/// Classify a value, honouring a recognised hint.
pub fn classify(value: Value, hint: Option<&str>) -> OutputDescriptor {
    match hint.and_then(OutputKind::from_hint) {
        Some(OutputKind::Text) => OutputDescriptor::text(value.to_text()),
        Some(kind) => OutputDescriptor::new(kind, value),
        None => {
            if let Some(hint) = hint {
                tracing::debug!("Ignoring unknown output hint '{}'", hint);
            }
            infer(value)
        }
    }
}

fn infer(value: Value) -> OutputDescriptor {
    match value {
        Value::Array(items) => {
            if matches!(items.first(), Some(Value::Object(_) | Value::Array(_))) {
                OutputDescriptor::new(OutputKind::Table, Value::Array(items))
            } else {
                OutputDescriptor::text(Value::Array(items).to_text())
            }
        }
        Value::Object(map) => {
            if map.contains_key("aligned_query") && map.contains_key("aligned_target") {
                OutputDescriptor::new(OutputKind::Alignment, Value::Object(map))
            } else if map.contains_key("mean") || map.contains_key("count") {
                OutputDescriptor::new(OutputKind::Table, Value::Array(vec![Value::Object(map)]))
            } else {
                OutputDescriptor::text(Value::Object(map).to_text())
            }
        }
        scalar => OutputDescriptor::text(scalar.to_text()),
    }
}
