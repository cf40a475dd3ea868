use anyhow::Result;
use grid_export::adapters::record_source;
use grid_export::core::RecordSource;
use grid_export::{
    Dispatcher, ExportConfig, ExportEngine, ExportError, ExportSession, LocalStorage,
};
use serde_json::json;
use std::io::Read;
use tempfile::TempDir;

fn write_config(dir: &TempDir, records_path: &str, extra: &str) -> Result<ExportConfig> {
    let output = dir.path().join("out");
    let content = format!(
        r#"
[export]
name = "pipeline-test"

[source]
type = "file"
path = "{}"

{}

[output]
output_path = "{}"
formats = ["csv", "xlsx"]
sheet_name = "Hours"
"#,
        records_path.replace('\\', "/"),
        extra,
        output.to_str().unwrap().replace('\\', "/")
    );

    let config_path = dir.path().join("export.toml");
    std::fs::write(&config_path, content)?;
    Ok(ExportConfig::from_file(&config_path)?)
}

fn write_records(dir: &TempDir, records: serde_json::Value) -> Result<String> {
    let path = dir.path().join("rows.json");
    std::fs::write(&path, records.to_string())?;
    Ok(path.to_str().unwrap().to_string())
}

async fn export_with(config: &ExportConfig, select: Option<i64>) -> grid_export::Result<Vec<grid_export::core::ExportArtifact>> {
    let source = record_source(&config.source)?;
    let (handle, _task) = Dispatcher::spawn(
        ExportSession::new(config.session_settings()),
        source.clone(),
        config.encoders()?,
    );

    handle.options_changed(config.options_payload())?;
    handle.records_changed(source.fetch_records().await?)?;
    if let Some(id) = select {
        handle.selection_changed(Some(json!({ "id": id })))?;
    }
    handle.idle().await?;
    handle.export().await
}

fn read_zip_entry(bytes: &[u8], name: &str) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec()))?;
    let mut content = String::new();
    archive.by_name(name)?.read_to_string(&mut content)?;
    Ok(content)
}

#[tokio::test]
async fn test_timesheet_export_end_to_end() -> Result<()> {
    let dir = TempDir::new()?;
    let records = write_records(
        &dir,
        json!({"records": [
            {"id": 1, "fields": {"Date": "2024-03-17", "Employee": "Jane Doe", "Code": "C-102", "Task": "Audit \"Q1\"", "Hours": 3.5}},
            {"id": 2, "fields": {"Date": "2024-03-18", "Employee": "Jane Doe", "Code": "C-102", "Task": "Report", "Hours": 2}}
        ]}),
    )?;
    let config = write_config(
        &dir,
        &records,
        r#"
[columns]
ExportCols = ["Task", "Hours"]
BillingDate = "Date"
DisplayName = "Employee"
Identifier = "Code"

[filename]
policy = "templated"
"#,
    )?;

    let artifacts = export_with(&config, Some(1)).await?;
    let engine = ExportEngine::new(LocalStorage::new(config.output_path()), config.output_path());
    let paths = engine.save(&artifacts).await?;

    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("Timesheet 2024-03 Jane Doe C-102.csv"));
    assert!(paths[1].ends_with("Timesheet 2024-03 Jane Doe C-102.xlsx"));

    let out = dir.path().join("out");
    let csv = std::fs::read_to_string(out.join("Timesheet 2024-03 Jane Doe C-102.csv"))?;
    assert_eq!(
        csv,
        "\"Task\",\"Hours\"\n\"Audit \"\"Q1\"\"\",\"3.5\"\n\"Report\",\"2\""
    );

    let xlsx = std::fs::read(out.join("Timesheet 2024-03 Jane Doe C-102.xlsx"))?;
    let workbook = read_zip_entry(&xlsx, "xl/workbook.xml")?;
    assert!(workbook.contains(r#"<sheet name="Hours""#));

    let sheet = read_zip_entry(&xlsx, "xl/worksheets/sheet1.xml")?;
    assert!(sheet.contains("<t xml:space=\"preserve\">Task</t>"));
    assert!(sheet.contains("Audit &quot;Q1&quot;"));
    assert!(sheet.contains(r#"<c r="B2"><v>3.5</v></c>"#));
    assert!(sheet.contains(r#"<c r="B3"><v>2</v></c>"#));

    Ok(())
}

#[tokio::test]
async fn test_default_projection_uses_first_row_keys() -> Result<()> {
    let dir = TempDir::new()?;
    let records = write_records(
        &dir,
        json!([
            {"id": 1, "Client": "Acme", "Month": "March", "Hours": 4, "Notes": "line\nbreak"},
            {"id": 2, "Client": "Beta", "Month": "March", "Hours": 6}
        ]),
    )?;
    let config = write_config(&dir, &records, "[columns]\nTitleCols = [\"Client\", \"Month\"]")?;

    let artifacts = export_with(&config, Some(2)).await?;
    assert_eq!(artifacts[0].filename, "Beta March.csv");
    assert_eq!(artifacts[1].filename, "Beta March.xlsx");

    let mut reader = csv::Reader::from_reader(artifacts[0].bytes.as_slice());
    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    assert_eq!(header, vec!["Hours", "Notes"]);

    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(
        rows,
        vec![
            vec!["4".to_string(), "line\nbreak".to_string()],
            vec!["6".to_string(), String::new()],
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_no_columns_produces_no_artifact() -> Result<()> {
    let dir = TempDir::new()?;
    let records = write_records(&dir, json!([]))?;
    let config = write_config(&dir, &records, "")?;

    let err = export_with(&config, None).await.unwrap_err();
    assert!(matches!(err, ExportError::NoColumnsAvailable));
    assert!(err.is_input_state());
    assert!(!dir.path().join("out").exists());

    Ok(())
}

#[tokio::test]
async fn test_fetch_records_through_file_source() -> Result<()> {
    let dir = TempDir::new()?;
    let records = write_records(&dir, json!([{"id": 9, "A": 1}]))?;
    let config = write_config(&dir, &records, "")?;

    let source = record_source(&config.source)?;
    assert_eq!(source.fetch_records().await?.len(), 1);
    assert_eq!(source.fetch_record(9).await?["A"], json!(1));

    Ok(())
}
