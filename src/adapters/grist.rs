use crate::config::toml_config::SourceConfig;
use crate::core::normalize::records_payload;
use crate::domain::model::RowId;
use crate::domain::ports::RecordSource;
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Record source backed by a Grist-style REST endpoint
/// (`GET .../tables/<table>/records` returning `{"records": [{"id", "fields"}]}`).
#[derive(Debug, Clone)]
pub struct GristRecordSource {
    client: Client,
    endpoint: String,
    headers: HashMap<String, String>,
}

impl GristRecordSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            headers: HashMap::new(),
        }
    }

    pub fn from_config(endpoint: &str, config: &SourceConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.to_string(),
            headers: config.headers.clone().unwrap_or_default(),
        })
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    fn request(&self) -> RequestBuilder {
        let mut request = self.client.get(&self.endpoint);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        request
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Vec<Value>> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("{} response status: {}", operation, status);

        if !status.is_success() {
            return Err(ExportError::host_call(operation, format!("HTTP {}", status)));
        }

        let payload: Value = response.json().await?;
        Ok(records_payload(payload))
    }
}

#[async_trait]
impl RecordSource for GristRecordSource {
    async fn fetch_records(&self) -> Result<Vec<Value>> {
        tracing::debug!("Fetching records from: {}", self.endpoint);
        let records = self.send("fetch_records", self.request()).await?;
        tracing::info!("Fetched {} records", records.len());
        Ok(records)
    }

    async fn fetch_record(&self, row_id: RowId) -> Result<Value> {
        let filter = format!(r#"{{"id":[{}]}}"#, row_id);
        let request = self.request().query(&[("filter", filter)]);

        self.send("fetch_record", request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ExportError::host_call("fetch_record", format!("row {} not found", row_id)))
    }
}
