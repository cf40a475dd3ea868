use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the host's row identifier is kept.
pub const ROW_ID_KEY: &str = "id";

pub type RowId = i64;

/// A plain record snapshot. Keys keep the order the source delivered them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub fields: Map<String, Value>,
}

impl Row {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn id(&self) -> Option<RowId> {
        self.fields.get(ROW_ID_KEY).and_then(Value::as_i64)
    }

    /// Absent keys read as `Null`.
    pub fn get(&self, column: &str) -> &Value {
        self.fields.get(column).unwrap_or(&Value::Null)
    }

    /// Display text of a cell, blank when absent or null.
    pub fn text(&self, column: &str) -> String {
        cell_text(self.get(column))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// The `(header, rows)` value every encoder consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Every row gets one cell per header column; missing cells become `Null`.
    pub fn from_rows(header: &[String], rows: &[Row]) -> Self {
        let rows = rows
            .iter()
            .map(|row| header.iter().map(|col| row.get(col).clone()).collect())
            .collect();

        Self {
            header: header.to_vec(),
            rows,
        }
    }

    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Dismissable message for the user. Input-state and host-call problems end up here
/// instead of failing the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notice {
    NoRecords,
    NoColumnsAvailable,
    HostCallFailed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::NoRecords => "No records received".to_string(),
            Notice::NoColumnsAvailable => "No columns selected for export.".to_string(),
            Notice::HostCallFailed(detail) => format!("Could not load the selected record: {}", detail),
        }
    }
}
