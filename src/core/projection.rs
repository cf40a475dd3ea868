use crate::domain::model::{Row, ROW_ID_KEY};
use crate::utils::error::{ExportError, Result};

/// Ordered list of columns that get rendered and exported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    columns: Vec<String>,
}

impl Projection {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The "no columns available" condition as a value the caller can act on.
    pub fn require_columns(&self) -> Result<&[String]> {
        if self.columns.is_empty() {
            Err(ExportError::NoColumnsAvailable)
        } else {
            Ok(&self.columns)
        }
    }
}

/// Compute the projection.
///
/// Explicit export columns win and keep their order. Without them the first row's
/// keys are used. In both cases the id column and every exclusion are dropped.
/// Explicit names that no row carries stay in the header.
pub fn compute_projection(export_columns: &[String], exclusions: &[String], rows: &[Row]) -> Projection {
    let keep = |name: &&str| *name != ROW_ID_KEY && !exclusions.iter().any(|e| e == name);

    let columns: Vec<String> = if !export_columns.is_empty() {
        export_columns
            .iter()
            .map(String::as_str)
            .filter(keep)
            .map(str::to_string)
            .collect()
    } else if let Some(first) = rows.first() {
        tracing::debug!("No export columns configured, falling back to first row keys");
        first.columns().filter(keep).map(str::to_string).collect()
    } else {
        Vec::new()
    };

    Projection { columns }
}
