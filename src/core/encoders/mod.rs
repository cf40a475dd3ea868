pub mod csv_encoder;
pub mod workbook;

pub use csv_encoder::CsvEncoder;
pub use workbook::WorkbookEncoder;

use crate::domain::ports::Encoder;
use crate::utils::error::{ExportError, Result};

pub const SUPPORTED_FORMATS: [&str; 2] = ["csv", "xlsx"];

/// Encoders for the configured output formats, in the configured order.
pub fn build_encoders(formats: &[String], sheet_name: &str) -> Result<Vec<Box<dyn Encoder>>> {
    formats
        .iter()
        .map(|format| -> Result<Box<dyn Encoder>> {
            match format.as_str() {
                "csv" => Ok(Box::new(CsvEncoder)),
                "xlsx" => Ok(Box::new(WorkbookEncoder::new(sheet_name))),
                other => Err(ExportError::InvalidConfigValueError {
                    field: "output.formats".to_string(),
                    value: other.to_string(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        SUPPORTED_FORMATS.join(", ")
                    ),
                }),
            }
        })
        .collect()
}
