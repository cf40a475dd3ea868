// Adapters layer: concrete record sources behind the `RecordSource` port.

pub mod file;
pub mod grist;

pub use file::FileRecordSource;
pub use grist::GristRecordSource;

use crate::config::toml_config::SourceConfig;
use crate::domain::ports::RecordSource;
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::validate_required_field;
use std::sync::Arc;

/// Build the record source named by `[source] type`.
pub fn record_source(config: &SourceConfig) -> Result<Arc<dyn RecordSource>> {
    match config.r#type.as_str() {
        "grist" | "api" => {
            let endpoint = validate_required_field("source.endpoint", &config.endpoint)?;
            Ok(Arc::new(GristRecordSource::from_config(endpoint, config)?))
        }
        "file" => {
            let path = validate_required_field("source.path", &config.path)?;
            Ok(Arc::new(FileRecordSource::new(path)))
        }
        other => Err(ExportError::InvalidConfigValueError {
            field: "source.type".to_string(),
            value: other.to_string(),
            reason: "Supported source types: grist, file".to_string(),
        }),
    }
}
