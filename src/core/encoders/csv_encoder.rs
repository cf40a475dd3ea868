use crate::domain::model::Table;
use crate::domain::ports::Encoder;
use crate::utils::error::{ExportError, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Delimited text: every field quoted, embedded quotes doubled, rows joined by `\n`.
#[derive(Debug, Clone, Default)]
pub struct CsvEncoder;

impl Encoder for CsvEncoder {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv;charset=utf-8"
    }

    fn encode(&self, table: &Table) -> Result<Vec<u8>> {
        if table.header.is_empty() {
            return Err(ExportError::NoColumnsAvailable);
        }

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .double_quote(true)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(&table.header)?;
        for row in table.text_rows() {
            writer.write_record(&row)?;
        }

        let mut bytes = writer.into_inner().map_err(|e| ExportError::EncodingError {
            message: e.to_string(),
        })?;

        // 行之間用換行連接，最後一行不加
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
        }

        tracing::debug!("Encoded {} rows as CSV ({} bytes)", table.rows.len(), bytes.len());
        Ok(bytes)
    }
}
