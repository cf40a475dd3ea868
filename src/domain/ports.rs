use crate::domain::model::{RowId, Table};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// The external tabular source. Raw rows are handed to the normalizer untouched.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self) -> Result<Vec<Value>>;
    async fn fetch_record(&self, row_id: RowId) -> Result<Value>;
}

/// Moves the host's active row. Used by selector widgets, not by export.
#[async_trait]
pub trait CursorSink: Send + Sync {
    async fn set_cursor(&self, row_id: RowId) -> Result<()>;
}

pub trait Encoder: Send + Sync {
    fn extension(&self) -> &'static str;
    fn mime_type(&self) -> &'static str;
    fn encode(&self, table: &Table) -> Result<Vec<u8>>;
}
