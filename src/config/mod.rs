pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "grid-export")]
#[command(about = "Export a table view to CSV and XLSX with a derived file name")]
pub struct CliConfig {
    #[arg(long, short = 'c', default_value = "export.toml")]
    pub config: String,

    #[arg(long, help = "Read rows from this JSON file instead of the configured source")]
    pub records_file: Option<String>,

    #[arg(long, help = "Row id used as the current selection for the file name")]
    pub select: Option<i64>,

    #[arg(long, help = "Override [output] output_path")]
    pub output_path: Option<String>,

    #[arg(long, help = "Print the column roles handshake as JSON and exit")]
    pub describe_roles: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub log_json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}
