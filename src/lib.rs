pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FileRecordSource, GristRecordSource};
pub use config::{cli::LocalStorage, toml_config::ExportConfig};
pub use core::{
    dispatcher::{Dispatcher, DispatcherHandle, SessionSnapshot},
    export::ExportEngine,
    session::{ExportSession, SessionSettings},
};
pub use utils::error::{ExportError, Result};
