//! Explicitly owned pipeline state.
//!
//! Only the dispatcher mutates an [`ExportSession`], one event at a time. Row set
//! and role mapping are replaced wholesale; the projection is recomputed from
//! them on every change. Selection fetches are tagged with the token of the
//! selection that issued them and dropped when a newer selection exists.

use crate::core::filename::{derive_filename, FilenamePolicy, FilenamePolicyKind};
use crate::core::normalize::{normalize_record, normalize_records};
use crate::core::projection::{compute_projection, Projection};
use crate::core::roles::RoleMapping;
use crate::domain::model::{ExportArtifact, Notice, Row, RowId, Table};
use crate::domain::ports::Encoder;
use crate::utils::error::{ExportError, Result};
use serde_json::Value;

pub const DEFAULT_FILENAME_PREFIX: &str = "Timesheet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub filename_policy: FilenamePolicyKind,
    pub filename_prefix: String,
    /// Columns never exported, on top of the id and filename columns.
    pub exclude: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            filename_policy: FilenamePolicyKind::default(),
            filename_prefix: DEFAULT_FILENAME_PREFIX.to_string(),
            exclude: Vec::new(),
        }
    }
}

/// Issued for every selection that needs its full record fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket {
    pub token: u64,
    pub row_id: RowId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Stale,
    Failed,
}

#[derive(Debug, Default)]
struct SelectionState {
    token: u64,
    record: Option<Row>,
    in_flight: usize,
}

#[derive(Debug)]
pub struct ExportSession {
    settings: SessionSettings,
    mapping: RoleMapping,
    rows: Vec<Row>,
    projection: Projection,
    selection: SelectionState,
    notice: Option<Notice>,
}

impl ExportSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            mapping: RoleMapping::default(),
            rows: Vec::new(),
            projection: Projection::default(),
            selection: SelectionState::default(),
            notice: None,
        }
    }

    pub fn apply_options(&mut self, options: &Value) {
        self.mapping = RoleMapping::resolve(options);
        tracing::debug!("Role mapping updated: {:?}", self.mapping);
        self.refresh();
    }

    pub fn apply_records(&mut self, raw: &[Value]) {
        self.rows = normalize_records(raw);
        tracing::debug!("Row set replaced with {} rows", self.rows.len());
        self.refresh();
    }

    /// Record a selection change. The lightweight record becomes the selection
    /// right away; a ticket is returned when a fuller fetch should follow.
    pub fn select(&mut self, record: Option<&Value>) -> Option<SelectionTicket> {
        self.selection.token += 1;
        self.selection.record = record.and_then(normalize_record);

        let row_id = self.selection.record.as_ref().and_then(Row::id)?;
        self.selection.in_flight += 1;

        Some(SelectionTicket {
            token: self.selection.token,
            row_id,
        })
    }

    /// Apply the result of a selection fetch, unless a newer selection exists.
    pub fn complete_fetch(&mut self, ticket: SelectionTicket, result: Result<Value>) -> FetchOutcome {
        self.selection.in_flight = self.selection.in_flight.saturating_sub(1);

        if ticket.token != self.selection.token {
            tracing::debug!(
                "Discarding fetch for row {} (token {}, current {})",
                ticket.row_id,
                ticket.token,
                self.selection.token
            );
            return FetchOutcome::Stale;
        }

        let fetched = result.and_then(|raw| {
            normalize_record(&raw).ok_or_else(|| {
                ExportError::host_call("fetch_record", format!("row {} returned no fields", ticket.row_id))
            })
        });

        match fetched {
            Ok(row) => {
                self.selection.record = Some(row);
                if matches!(self.notice, Some(Notice::HostCallFailed(_))) {
                    self.notice = None;
                }
                FetchOutcome::Applied
            }
            Err(e) => {
                tracing::warn!("Selection fetch for row {} failed: {}", ticket.row_id, e);
                self.notice = Some(Notice::HostCallFailed(e.to_string()));
                FetchOutcome::Failed
            }
        }
    }

    pub fn mapping(&self) -> &RoleMapping {
        &self.mapping
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn selection(&self) -> Option<&Row> {
        self.selection.record.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.selection.in_flight
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn filename_policy(&self) -> FilenamePolicy {
        FilenamePolicy::from_mapping(
            self.settings.filename_policy,
            &self.mapping,
            &self.settings.filename_prefix,
        )
    }

    pub fn exclusions(&self) -> Vec<String> {
        let mut exclusions = self.filename_policy().reserved_columns();
        exclusions.extend(self.settings.exclude.iter().cloned());
        exclusions
    }

    pub fn filename_for(&self, extension: &str) -> String {
        derive_filename(&self.filename_policy(), self.selection(), extension)
    }

    /// Header plus body as rendered and exported.
    pub fn table(&self) -> Result<Table> {
        let columns = self.projection.require_columns()?;
        Ok(Table::from_rows(columns, &self.rows))
    }

    /// Encode the current state once per encoder. Nothing is cached. Input-state
    /// problems are also left as the session notice.
    pub fn export(&mut self, encoders: &[Box<dyn Encoder>]) -> Result<Vec<ExportArtifact>> {
        let result = self.build_artifacts(encoders);
        if let Err(ExportError::NoColumnsAvailable) = &result {
            self.notice = Some(Notice::NoColumnsAvailable);
        }
        result
    }

    fn build_artifacts(&self, encoders: &[Box<dyn Encoder>]) -> Result<Vec<ExportArtifact>> {
        let table = self.table()?;
        if table.rows.is_empty() {
            tracing::warn!("Exporting header only, the row set is empty");
        }

        encoders
            .iter()
            .map(|encoder| -> Result<ExportArtifact> {
                Ok(ExportArtifact {
                    filename: self.filename_for(encoder.extension()),
                    mime_type: encoder.mime_type(),
                    bytes: encoder.encode(&table)?,
                })
            })
            .collect()
    }

    fn refresh(&mut self) {
        self.projection = compute_projection(&self.mapping.export_columns, &self.exclusions(), &self.rows);

        let input_notice = if self.projection.is_empty() {
            Some(Notice::NoColumnsAvailable)
        } else if self.rows.is_empty() {
            Some(Notice::NoRecords)
        } else {
            None
        };

        match input_notice {
            Some(notice) => {
                tracing::info!("{}", notice.message());
                self.notice = Some(notice);
            }
            None => {
                if matches!(self.notice, Some(Notice::NoColumnsAvailable | Notice::NoRecords)) {
                    self.notice = None;
                }
            }
        }
    }
}

impl Default for ExportSession {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoders::{CsvEncoder, WorkbookEncoder};
    use serde_json::json;

    fn timesheet_session() -> ExportSession {
        let mut session = ExportSession::new(SessionSettings {
            filename_policy: FilenamePolicyKind::Templated,
            ..SessionSettings::default()
        });
        session.apply_options(&json!({
            "ExportCols": ["Date", "Task", "Hours"],
            "BillingDate": "Date",
            "DisplayName": "Employee",
            "Identifier": "Code"
        }));
        session.apply_records(&[
            json!({"id": 1, "Date": "2024-03-17", "Employee": "Jane Doe", "Code": "C-102", "Task": "Audit", "Hours": 3}),
            json!({"id": 2, "Date": "2024-04-02", "Employee": "John Roe", "Code": "C-200", "Task": "Review", "Hours": 5}),
        ]);
        session
    }

    #[test]
    fn test_templated_role_columns_are_excluded() {
        let session = timesheet_session();
        assert_eq!(session.projection().columns(), ["Task".to_string(), "Hours".to_string()]);
        assert!(session.notice().is_none());
    }

    #[test]
    fn test_stale_fetch_is_discarded() {
        let mut session = timesheet_session();

        let ticket_a = session.select(Some(&json!({"id": 1}))).unwrap();
        let ticket_b = session.select(Some(&json!({"id": 2}))).unwrap();
        assert_eq!(session.in_flight(), 2);

        let b = json!({"id": 2, "Date": "2024-04-02", "Employee": "John Roe", "Code": "C-200"});
        assert_eq!(session.complete_fetch(ticket_b, Ok(b)), FetchOutcome::Applied);

        let a = json!({"id": 1, "Date": "2024-03-17", "Employee": "Jane Doe", "Code": "C-102"});
        assert_eq!(session.complete_fetch(ticket_a, Ok(a)), FetchOutcome::Stale);

        assert_eq!(session.in_flight(), 0);
        assert_eq!(session.filename_for("csv"), "Timesheet 2024-04 John Roe C-200.csv");
    }

    #[test]
    fn test_stale_fetch_does_not_replace_newer_provisional_selection() {
        let mut session = timesheet_session();

        let ticket_a = session.select(Some(&json!({"id": 1}))).unwrap();
        session.select(Some(&json!({"id": 2, "Date": "2024-04-02", "Employee": "John Roe", "Code": "C-200"})));

        let a = json!({"id": 1, "Date": "2024-03-17", "Employee": "Jane Doe", "Code": "C-102"});
        assert_eq!(session.complete_fetch(ticket_a, Ok(a)), FetchOutcome::Stale);
        assert_eq!(session.selection().and_then(Row::id), Some(2));
        assert_eq!(session.filename_for("xlsx"), "Timesheet 2024-04 John Roe C-200.xlsx");
    }

    #[test]
    fn test_failed_fetch_leaves_state_unchanged() {
        let mut session = timesheet_session();
        let ticket = session
            .select(Some(&json!({"id": 1, "Date": "2024-03-17", "Employee": "Jane Doe", "Code": "C-102"})))
            .unwrap();

        let outcome = session.complete_fetch(ticket, Err(ExportError::host_call("fetch_record", "timeout")));
        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(matches!(session.notice(), Some(Notice::HostCallFailed(_))));
        assert_eq!(session.filename_for("csv"), "Timesheet 2024-03 Jane Doe C-102.csv");
        assert_eq!(session.rows().len(), 2);
    }

    #[test]
    fn test_selection_without_id_needs_no_fetch() {
        let mut session = timesheet_session();
        assert!(session.select(Some(&json!({"Date": "2024-05-01"}))).is_none());
        assert!(session.select(None).is_none());
        assert!(session.selection().is_none());
        assert_eq!(session.filename_for("csv"), "export.csv");
    }

    #[test]
    fn test_export_without_columns_sets_notice() {
        let mut session = ExportSession::default();
        session.apply_records(&[]);
        assert_eq!(session.notice(), Some(&Notice::NoColumnsAvailable));

        session.dismiss_notice();
        let encoders: Vec<Box<dyn Encoder>> = vec![Box::new(CsvEncoder)];
        let result = session.export(&encoders);
        assert!(matches!(result, Err(ExportError::NoColumnsAvailable)));
        assert_eq!(session.notice(), Some(&Notice::NoColumnsAvailable));
    }

    #[test]
    fn test_export_produces_one_artifact_per_encoder() {
        let mut session = timesheet_session();
        session.select(Some(&json!({"id": 1, "Date": "2024-03-17", "Employee": "Jane Doe", "Code": "C-102"})));

        let encoders: Vec<Box<dyn Encoder>> =
            vec![Box::new(CsvEncoder), Box::new(WorkbookEncoder::default())];
        let artifacts = session.export(&encoders).unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].filename, "Timesheet 2024-03 Jane Doe C-102.csv");
        assert_eq!(artifacts[1].filename, "Timesheet 2024-03 Jane Doe C-102.xlsx");
        assert_eq!(
            String::from_utf8(artifacts[0].bytes.clone()).unwrap(),
            "\"Task\",\"Hours\"\n\"Audit\",\"3\"\n\"Review\",\"5\""
        );
    }

    #[test]
    fn test_empty_row_set_with_explicit_columns_exports_header() {
        let mut session = ExportSession::default();
        session.apply_options(&json!({"ExportCols": ["A", "B"]}));
        session.apply_records(&[]);
        assert_eq!(session.notice(), Some(&Notice::NoRecords));

        let encoders: Vec<Box<dyn Encoder>> = vec![Box::new(CsvEncoder)];
        let artifacts = session.export(&encoders).unwrap();
        assert_eq!(artifacts[0].bytes, b"\"A\",\"B\"");
        assert_eq!(artifacts[0].filename, "export.csv");
    }

    #[test]
    fn test_options_change_recomputes_projection() {
        let mut session = ExportSession::default();
        session.apply_records(&[json!({"id": 1, "Client": "Acme", "Hours": 2})]);
        assert_eq!(session.projection().columns(), ["Client".to_string(), "Hours".to_string()]);

        session.apply_options(&json!({"TitleCols": ["Client"]}));
        assert_eq!(session.projection().columns(), ["Hours".to_string()]);
    }
}
