use clap::Parser;
use grid_export::core::roles::declared_roles;
use grid_export::utils::error::ErrorSeverity;
use grid_export::utils::{logger, validation::Validate};
use grid_export::core::RecordSource;
use grid_export::{
    adapters, CliConfig, Dispatcher, ExportConfig, ExportEngine, ExportError, ExportSession,
    LocalStorage,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.describe_roles {
        println!("{}", serde_json::to_string_pretty(&declared_roles())?);
        return Ok(());
    }

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting grid-export");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match run(&cli).await {
        Ok(paths) => {
            for path in &paths {
                tracing::info!("📁 Output saved to: {}", path);
                println!("📁 {}", path);
            }
            println!("✅ Export completed ({} files)", paths.len());
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ Export failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 輸入狀態錯誤只是提示，不算失敗
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
    }
}

async fn run(cli: &CliConfig) -> Result<Vec<String>, ExportError> {
    let mut config = ExportConfig::from_file(&cli.config)?;
    if let Some(path) = &cli.output_path {
        config.output.output_path = path.clone();
    }
    if let Some(path) = &cli.records_file {
        config.source.r#type = "file".to_string();
        config.source.path = Some(path.clone());
    }
    config.validate()?;

    let source: Arc<dyn RecordSource> = adapters::record_source(&config.source)?;

    let (handle, task) = Dispatcher::spawn(
        ExportSession::new(config.session_settings()),
        Arc::clone(&source),
        config.encoders()?,
    );

    handle.options_changed(config.options_payload())?;
    handle.records_changed(source.fetch_records().await?)?;
    if let Some(row_id) = cli.select {
        handle.selection_changed(Some(serde_json::json!({ "id": row_id })))?;
    }

    let snapshot = handle.idle().await?;
    tracing::info!(
        "Exporting {} rows, columns: {}",
        snapshot.row_count,
        snapshot.columns.join(", ")
    );
    if let Some(notice) = &snapshot.notice {
        tracing::warn!("⚠️ {}", notice.message());
    }

    let artifacts = handle.export().await?;
    drop(handle);
    if task.await.is_err() {
        tracing::warn!("Dispatcher task ended abnormally");
    }

    let engine = ExportEngine::new(
        LocalStorage::new(config.output_path()),
        config.output_path(),
    );
    engine.save(&artifacts).await
}
