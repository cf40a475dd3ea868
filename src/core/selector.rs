use crate::domain::model::{Row, RowId};
use crate::domain::ports::CursorSink;
use crate::utils::error::{ExportError, Result};
use serde_json::Value;

/// Row the host cursor should move to when `row` is picked: the link column's
/// value when one is configured and holds a row id, else the row's own id.
pub fn link_target(row: &Row, link_column: Option<&str>) -> Option<RowId> {
    match link_column {
        Some(col) => match row.get(col) {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        },
        None => row.id(),
    }
}

/// Labels for a picker: `"<label> - <second>"`, or just the label when no second
/// column is set. Rows without anything to show are skipped; the row index is
/// kept so a pick maps back to the row.
pub fn option_labels(rows: &[Row], label_column: &str, second_column: Option<&str>) -> Vec<(usize, String)> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let first = row.text(label_column);
            let label = match second_column {
                Some(col) => format!("{} - {}", first, row.text(col)).trim().to_string(),
                None => first.trim().to_string(),
            };
            if label.is_empty() || label == "-" {
                None
            } else {
                Some((index, label))
            }
        })
        .collect()
}

/// Move the host cursor to the row picked at `index`.
pub async fn move_cursor<C: CursorSink + ?Sized>(
    sink: &C,
    rows: &[Row],
    index: usize,
    link_column: Option<&str>,
) -> Result<RowId> {
    if rows.is_empty() {
        return Err(ExportError::NoRecords);
    }

    let row = rows.get(index).ok_or_else(|| ExportError::InvalidConfigValueError {
        field: "index".to_string(),
        value: index.to_string(),
        reason: format!("Only {} rows available", rows.len()),
    })?;

    let target = link_target(row, link_column).ok_or_else(|| {
        ExportError::host_call("set_cursor", format!("row {} has no usable row reference", index))
    })?;

    tracing::debug!("Setting cursor to row {}", target);
    sink.set_cursor(target).await?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::normalize_records;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCursor {
        moves: Mutex<Vec<RowId>>,
    }

    #[async_trait]
    impl CursorSink for RecordingCursor {
        async fn set_cursor(&self, row_id: RowId) -> Result<()> {
            self.moves.lock().unwrap().push(row_id);
            Ok(())
        }
    }

    fn rows() -> Vec<Row> {
        normalize_records(&[
            json!({"id": 10, "Client": "Acme", "Project": 3, "Code": "A"}),
            json!({"id": 11, "Client": "", "Project": "4", "Code": ""}),
            json!({"id": 12, "Client": "Beta", "Project": null, "Code": "B"}),
        ])
    }

    #[test]
    fn test_link_target() {
        let rows = rows();
        assert_eq!(link_target(&rows[0], None), Some(10));
        assert_eq!(link_target(&rows[0], Some("Project")), Some(3));
        assert_eq!(link_target(&rows[1], Some("Project")), Some(4));
        assert_eq!(link_target(&rows[2], Some("Project")), None);
    }

    #[test]
    fn test_option_labels_skip_empty() {
        let rows = rows();
        assert_eq!(
            option_labels(&rows, "Client", Some("Code")),
            vec![(0, "Acme - A".to_string()), (2, "Beta - B".to_string())]
        );
        assert_eq!(
            option_labels(&rows, "Client", None),
            vec![(0, "Acme".to_string()), (2, "Beta".to_string())]
        );
    }

    #[tokio::test]
    async fn test_move_cursor() {
        let sink = RecordingCursor::default();
        let rows = rows();

        assert_eq!(move_cursor(&sink, &rows, 2, None).await.unwrap(), 12);
        assert_eq!(move_cursor(&sink, &rows, 0, Some("Project")).await.unwrap(), 3);
        assert!(move_cursor(&sink, &rows, 9, None).await.is_err());
        assert!(matches!(
            move_cursor(&sink, &[], 0, None).await,
            Err(ExportError::NoRecords)
        ));

        assert_eq!(*sink.moves.lock().unwrap(), vec![12, 3]);
    }
}
