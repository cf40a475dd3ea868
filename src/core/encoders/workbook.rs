//! Minimal SpreadsheetML (`.xlsx`) writer.
//!
//! One worksheet, inline strings, no shared-string table and no styles. Numbers
//! and booleans keep their native cell types; null cells are left out so the
//! spreadsheet shows them blank.

use crate::domain::model::Table;
use crate::domain::ports::Encoder;
use crate::utils::error::{ExportError, Result};
use serde_json::Value;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

#[derive(Debug, Clone)]
pub struct WorkbookEncoder {
    sheet_name: String,
}

impl WorkbookEncoder {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
        }
    }

    fn workbook_xml(&self) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                "\n",
                r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
                r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
                r#"<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
            ),
            escape_xml(&self.sheet_name)
        )
    }
}

impl Default for WorkbookEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_SHEET_NAME)
    }
}

impl Encoder for WorkbookEncoder {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn mime_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn encode(&self, table: &Table) -> Result<Vec<u8>> {
        if table.header.is_empty() {
            return Err(ExportError::NoColumnsAvailable);
        }

        let sheet = sheet_xml(table)?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let bytes = {
            let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

            zip.start_file("[Content_Types].xml", options)?;
            zip.write_all(CONTENT_TYPES.as_bytes())?;

            zip.start_file("_rels/.rels", options)?;
            zip.write_all(ROOT_RELS.as_bytes())?;

            zip.start_file("xl/workbook.xml", options)?;
            zip.write_all(self.workbook_xml().as_bytes())?;

            zip.start_file("xl/_rels/workbook.xml.rels", options)?;
            zip.write_all(WORKBOOK_RELS.as_bytes())?;

            zip.start_file("xl/worksheets/sheet1.xml", options)?;
            zip.write_all(sheet.as_bytes())?;

            zip.finish()?.into_inner()
        };

        tracing::debug!(
            "Encoded {} rows into sheet '{}' ({} bytes)",
            table.rows.len(),
            self.sheet_name,
            bytes.len()
        );
        Ok(bytes)
    }
}

fn sheet_xml(table: &Table) -> Result<String> {
    let mut xml = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#
    ));

    let header: Vec<Value> = table.header.iter().cloned().map(Value::String).collect();
    write_row(&mut xml, 1, &header)?;
    for (index, row) in table.rows.iter().enumerate() {
        write_row(&mut xml, index + 2, row)?;
    }

    xml.push_str("</sheetData></worksheet>");
    Ok(xml)
}

fn write_row(xml: &mut String, row_number: usize, cells: &[Value]) -> Result<()> {
    write!(xml, r#"<row r="{}">"#, row_number).map_err(fmt_error)?;

    for (col, value) in cells.iter().enumerate() {
        let reference = format!("{}{}", column_name(col), row_number);
        match value {
            Value::Null => {}
            Value::Number(n) => {
                write!(xml, r#"<c r="{}"><v>{}</v></c>"#, reference, n).map_err(fmt_error)?
            }
            Value::Bool(b) => write!(
                xml,
                r#"<c r="{}" t="b"><v>{}</v></c>"#,
                reference,
                if *b { 1 } else { 0 }
            )
            .map_err(fmt_error)?,
            Value::String(s) => write_inline(xml, &reference, s)?,
            other => write_inline(xml, &reference, &other.to_string())?,
        }
    }

    xml.push_str("</row>");
    Ok(())
}

fn write_inline(xml: &mut String, reference: &str, text: &str) -> Result<()> {
    write!(
        xml,
        r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        reference,
        escape_xml(&escape_cell_text(text))
    )
    .map_err(fmt_error)
}

fn fmt_error(e: std::fmt::Error) -> ExportError {
    ExportError::EncodingError {
        message: e.to_string(),
    }
}

/// Zero-based column index to `A`, `B`, .. `Z`, `AA`, ..
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// ST_Xstring escaping for cell text: control characters other than tab and
/// line feed become `_xHHHH_`, and a literal `_xHHHH_` gets its leading
/// underscore written as `_x005F_` so readers decode it back verbatim.
// \r 也要編碼，否則 XML 解析時 \r\n 會被正規化成 \n
fn escape_cell_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, c) in text.char_indices() {
        match c {
            '_' if is_escape_token(&text[index..]) => out.push_str("_x005F_"),
            '\t' | '\n' => out.push(c),
            c if (c as u32) < 0x20 => out.push_str(&format!("_x{:04X}_", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn is_escape_token(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 7
        && bytes[0] == b'_'
        && bytes[1] == b'x'
        && bytes[2..6].iter().all(u8::is_ascii_hexdigit)
        && bytes[6] == b'_'
}
