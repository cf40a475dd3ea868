use crate::core::normalize::{normalize_record, records_payload};
use crate::domain::model::RowId;
use crate::domain::ports::RecordSource;
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

/// Reads the row set from a JSON file: a bare array, or a `{"records": [...]}` dump
/// of the REST endpoint.
#[derive(Debug, Clone)]
pub struct FileRecordSource {
    path: PathBuf,
}

impl FileRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for FileRecordSource {
    async fn fetch_records(&self) -> Result<Vec<Value>> {
        tracing::debug!("Reading records from {}", self.path.display());
        let bytes = tokio::fs::read(&self.path).await?;
        let payload: Value = serde_json::from_slice(&bytes)?;
        Ok(records_payload(payload))
    }

    async fn fetch_record(&self, row_id: RowId) -> Result<Value> {
        self.fetch_records()
            .await?
            .into_iter()
            .find(|raw| normalize_record(raw).and_then(|row| row.id()) == Some(row_id))
            .ok_or_else(|| ExportError::host_call("fetch_record", format!("row {} not found", row_id)))
    }
}
