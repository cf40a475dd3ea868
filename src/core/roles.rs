//! Semantic column roles and their resolution from the host's options payload.
//!
//! The host hands over a `role name -> column name(s)` object whenever the user
//! edits the mapping. Multi-value roles accept a single string or a list; single
//! value roles take the first usable entry of a list. Unset roles resolve to
//! empty values.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    ExportColumns,
    TitleColumns,
    BillingDate,
    DisplayName,
    Identifier,
    LinkColumn,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::ExportColumns,
        Role::TitleColumns,
        Role::BillingDate,
        Role::DisplayName,
        Role::Identifier,
        Role::LinkColumn,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Role::ExportColumns => "ExportCols",
            Role::TitleColumns => "TitleCols",
            Role::BillingDate => "BillingDate",
            Role::DisplayName => "DisplayName",
            Role::Identifier => "Identifier",
            Role::LinkColumn => "LinkColumn",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Role::ExportColumns => "Columns to Export",
            Role::TitleColumns => "Columns for the file name",
            Role::BillingDate => "Billing date",
            Role::DisplayName => "Name",
            Role::Identifier => "Identifier",
            Role::LinkColumn => "Select a Column to Link Widgets",
        }
    }

    fn is_multi(self) -> bool {
        matches!(self, Role::ExportColumns | Role::TitleColumns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Any,
    Date,
}

/// One entry of the ready handshake.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSpec {
    pub name: &'static str,
    pub title: &'static str,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub allow_multiple: bool,
    pub optional: bool,
}

/// Roles declared to the host on startup.
pub fn declared_roles() -> Vec<RoleSpec> {
    Role::ALL
        .iter()
        .map(|&role| RoleSpec {
            name: role.key(),
            title: role.title(),
            column_type: if role == Role::BillingDate {
                ColumnType::Date
            } else {
                ColumnType::Any
            },
            allow_multiple: role.is_multi(),
            optional: role != Role::ExportColumns,
        })
        .collect()
}

/// Resolved `role -> column` assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMapping {
    pub export_columns: Vec<String>,
    pub title_columns: Vec<String>,
    pub billing_date: Option<String>,
    pub display_name: Option<String>,
    pub identifier: Option<String>,
    pub link_column: Option<String>,
}

impl RoleMapping {
    /// Resolve a host options payload. Anything that is not an object resolves to
    /// the empty mapping.
    pub fn resolve(options: &Value) -> Self {
        let Some(obj) = options.as_object() else {
            if !options.is_null() {
                tracing::warn!("Ignoring options payload that is not an object: {}", options);
            }
            return Self::default();
        };

        let multi = |role: Role| column_list(obj.get(role.key()));
        let single = |role: Role| column_list(obj.get(role.key())).into_iter().next();

        Self {
            export_columns: multi(Role::ExportColumns),
            title_columns: multi(Role::TitleColumns),
            billing_date: single(Role::BillingDate),
            display_name: single(Role::DisplayName),
            identifier: single(Role::Identifier),
            link_column: single(Role::LinkColumn),
        }
    }
}

/// Strings and string lists become a de-duplicated, order-preserving list of
/// non-blank names. Other value types are ignored.
fn column_list(value: Option<&Value>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        let name = name.trim();
        if !name.is_empty() && !out.iter().any(|c| c == name) {
            out.push(name.to_string());
        }
    };

    match value {
        Some(Value::String(s)) => push(s),
        Some(Value::Array(items)) => {
            for item in items {
                if let Value::String(s) = item {
                    push(s);
                }
            }
        }
        _ => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_multi_and_single_roles() {
        let mapping = RoleMapping::resolve(&json!({
            "ExportCols": ["Date", "Hours", "Task"],
            "TitleCols": "Client",
            "BillingDate": ["Date", "Other"],
            "DisplayName": "Employee",
            "Identifier": null
        }));

        assert_eq!(mapping.export_columns, vec!["Date", "Hours", "Task"]);
        assert_eq!(mapping.title_columns, vec!["Client"]);
        assert_eq!(mapping.billing_date.as_deref(), Some("Date"));
        assert_eq!(mapping.display_name.as_deref(), Some("Employee"));
        assert_eq!(mapping.identifier, None);
    }

    #[test]
    fn test_unset_roles_resolve_empty() {
        assert_eq!(RoleMapping::resolve(&json!({})), RoleMapping::default());
        assert_eq!(RoleMapping::resolve(&Value::Null), RoleMapping::default());
        assert_eq!(RoleMapping::resolve(&json!([1, 2])), RoleMapping::default());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let payload = json!({"ExportCols": ["A", "A", " ", "B"], "LinkColumn": "Ref"});
        let first = RoleMapping::resolve(&payload);
        let second = RoleMapping::resolve(&payload);
        assert_eq!(first, second);
        assert_eq!(first.export_columns, vec!["A", "B"]);
        assert_eq!(first.link_column.as_deref(), Some("Ref"));
    }

    #[test]
    fn test_declared_roles_handshake() {
        let roles = declared_roles();
        let export = roles.iter().find(|r| r.name == "ExportCols").unwrap();
        assert!(export.allow_multiple);
        assert!(!export.optional);

        let date = roles.iter().find(|r| r.name == "BillingDate").unwrap();
        assert_eq!(date.column_type, ColumnType::Date);

        let json = serde_json::to_value(export).unwrap();
        assert_eq!(json["allowMultiple"], json!(true));
        assert_eq!(json["type"], json!("Any"));
    }
}
