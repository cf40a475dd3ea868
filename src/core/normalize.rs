use crate::domain::model::{Row, ROW_ID_KEY};
use serde_json::{Map, Value};

/// Turn one raw host record into a flat [`Row`].
///
/// Accepts the flat shape (`{"id": 1, "A": ..}`) and the REST envelope
/// (`{"id": 1, "fields": {"A": ..}}`). The id always lands under [`ROW_ID_KEY`]
/// as the first key. Returns `None` for anything that is not an object.
pub fn normalize_record(raw: &Value) -> Option<Row> {
    let obj = raw.as_object()?;

    let mut fields = Map::new();
    if let Some(id) = obj.get(ROW_ID_KEY) {
        fields.insert(ROW_ID_KEY.to_string(), normalize_id(id));
    }

    let body = match obj.get("fields") {
        Some(Value::Object(inner)) if is_envelope(obj) => inner,
        _ => obj,
    };

    for (key, value) in body {
        if key == ROW_ID_KEY && fields.contains_key(ROW_ID_KEY) {
            continue;
        }
        fields.insert(key.clone(), value.clone());
    }

    Some(Row::new(fields))
}

/// Normalize a whole row set. Rows that cannot be read are skipped.
pub fn normalize_records(raw: &[Value]) -> Vec<Row> {
    let mut skipped = 0usize;
    let rows: Vec<Row> = raw
        .iter()
        .filter_map(|value| {
            let row = normalize_record(value);
            if row.is_none() {
                skipped += 1;
            }
            row
        })
        .collect();

    if skipped > 0 {
        tracing::warn!("Skipped {} records that were not objects", skipped);
    }

    rows
}

/// Unwrap a raw records payload: a bare array, or `{"records": [...]}`.
pub fn records_payload(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("records") {
            Some(Value::Array(items)) => items,
            _ => vec![Value::Object(obj)],
        },
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

// 只有 id 與 fields 兩個鍵才是 REST 格式；其他情況 fields 只是一般欄位
fn is_envelope(obj: &Map<String, Value>) -> bool {
    obj.keys().all(|key| key == ROW_ID_KEY || key == "fields")
}

// ids arrive as numbers or numeric strings
fn normalize_id(id: &Value) -> Value {
    match id {
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| id.clone()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_record_keeps_key_order() {
        let row = normalize_record(&json!({"id": 7, "Date": "2024-03-17", "Hours": 4})).unwrap();
        let keys: Vec<&str> = row.columns().collect();
        assert_eq!(keys, vec!["id", "Date", "Hours"]);
        assert_eq!(row.id(), Some(7));
    }

    #[test]
    fn test_rest_envelope_is_flattened() {
        let row = normalize_record(&json!({
            "id": "12",
            "fields": {"Client": "Acme", "Hours": null, "Tags": ["L", "a"]}
        }))
        .unwrap();

        let keys: Vec<&str> = row.columns().collect();
        assert_eq!(keys, vec!["id", "Client", "Hours", "Tags"]);
        assert_eq!(row.id(), Some(12));
        assert_eq!(row.text("Hours"), "");
        assert_eq!(row.text("Tags"), r#"["L","a"]"#);
    }

    #[test]
    fn test_column_named_fields_is_kept_on_flat_rows() {
        let row = normalize_record(&json!({
            "id": 3,
            "Client": "Acme",
            "fields": {"nested": true}
        }))
        .unwrap();

        let keys: Vec<&str> = row.columns().collect();
        assert_eq!(keys, vec!["id", "Client", "fields"]);
        assert_eq!(row.text("Client"), "Acme");
        assert_eq!(row.text("fields"), r#"{"nested":true}"#);

        let bare = normalize_record(&json!({"fields": {"A": 1}})).unwrap();
        assert_eq!(bare.columns().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_mismatched_types_do_not_fail() {
        assert!(normalize_record(&json!("text")).is_none());
        assert!(normalize_record(&json!(null)).is_none());

        let rows = normalize_records(&[json!({"A": 1}), json!(42), json!({"A": 2})]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id(), None);
    }

    #[test]
    fn test_records_payload_shapes() {
        assert_eq!(records_payload(json!([{"A": 1}])).len(), 1);
        assert_eq!(
            records_payload(json!({"records": [{"id": 1}, {"id": 2}]})).len(),
            2
        );
        assert!(records_payload(Value::Null).is_empty());
    }
}
