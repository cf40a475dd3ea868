use crate::core::roles::RoleMapping;
use crate::domain::model::Row;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GENERIC_STEM: &str = "export";
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilenamePolicyKind {
    #[default]
    Concatenate,
    Templated,
}

/// How artifact names are built from the selected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenamePolicy {
    /// Values of the title columns joined by a space.
    Concatenate { title_columns: Vec<String> },
    /// `"<prefix> <YYYY-MM> <name> <identifier>"`
    Templated {
        prefix: String,
        date_column: Option<String>,
        name_column: Option<String>,
        identifier_column: Option<String>,
    },
}

impl FilenamePolicy {
    pub fn from_mapping(kind: FilenamePolicyKind, mapping: &RoleMapping, prefix: &str) -> Self {
        match kind {
            FilenamePolicyKind::Concatenate => FilenamePolicy::Concatenate {
                title_columns: mapping.title_columns.clone(),
            },
            FilenamePolicyKind::Templated => FilenamePolicy::Templated {
                prefix: prefix.to_string(),
                date_column: mapping.billing_date.clone(),
                name_column: mapping.display_name.clone(),
                identifier_column: mapping.identifier.clone(),
            },
        }
    }

    /// Columns that only exist to name the file.
    pub fn reserved_columns(&self) -> Vec<String> {
        match self {
            FilenamePolicy::Concatenate { title_columns } => title_columns.clone(),
            FilenamePolicy::Templated {
                date_column,
                name_column,
                identifier_column,
                ..
            } => [date_column, name_column, identifier_column]
                .into_iter()
                .flatten()
                .cloned()
                .collect(),
        }
    }
}

pub fn generic_filename(extension: &str) -> String {
    format!("{}.{}", GENERIC_STEM, extension)
}

/// Build the artifact name for `extension` from the selected row.
///
/// Pure: the same policy and selection always give the same name.
pub fn derive_filename(policy: &FilenamePolicy, selection: Option<&Row>, extension: &str) -> String {
    let Some(row) = selection else {
        return generic_filename(extension);
    };

    let stem = match policy {
        FilenamePolicy::Concatenate { title_columns } => concatenated_stem(title_columns, row),
        FilenamePolicy::Templated {
            prefix,
            date_column,
            name_column,
            identifier_column,
        } => templated_stem(
            prefix,
            date_column.as_deref(),
            name_column.as_deref(),
            identifier_column.as_deref(),
            row,
        ),
    };

    match stem {
        Some(stem) => format!("{}.{}", sanitize(&stem), extension),
        None => generic_filename(extension),
    }
}

fn concatenated_stem(title_columns: &[String], row: &Row) -> Option<String> {
    let parts: Vec<String> = title_columns
        .iter()
        .map(|col| row.text(col).trim().to_string())
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn templated_stem(
    prefix: &str,
    date_column: Option<&str>,
    name_column: Option<&str>,
    identifier_column: Option<&str>,
    row: &Row,
) -> Option<String> {
    let month = match date_column.and_then(|col| month_token(row.get(col))) {
        Some(month) => month,
        None => {
            tracing::debug!("Billing date missing or unparsable, using generic file name");
            return None;
        }
    };

    let text_or_unknown = |col: Option<&str>| {
        col.map(|c| row.text(c).trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    };

    Some(format!(
        "{} {} {} {}",
        prefix,
        month,
        text_or_unknown(name_column),
        text_or_unknown(identifier_column)
    ))
}

/// `YYYY-MM` for a date-like cell. Numbers are epoch seconds.
pub fn month_token(value: &Value) -> Option<String> {
    let date = match value {
        Value::String(s) => parse_date(s.trim())?,
        Value::Number(n) => DateTime::from_timestamp(n.as_f64()? as i64, 0)?.date_naive(),
        _ => return None,
    };
    Some(format!("{:04}-{:02}", date.year(), date.month()))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

// path separators and characters most filesystems reject
fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
