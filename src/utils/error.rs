use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("No columns available for export")]
    NoColumnsAvailable,

    #[error("No records received")]
    NoRecords,

    #[error("Host call '{operation}' failed: {message}")]
    HostCall { operation: String, message: String },

    #[error("Encoding error: {message}")]
    EncodingError { message: String },

    #[error("Export dispatcher is no longer running")]
    DispatcherClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 沒有資料或沒有可輸出的欄位
    InputState,
    HostCall,
    Configuration,
    Encoding,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExportError {
    pub fn host_call(operation: impl Into<String>, message: impl ToString) -> Self {
        ExportError::HostCall {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ExportError::NoColumnsAvailable | ExportError::NoRecords => ErrorCategory::InputState,
            ExportError::ApiError(_) | ExportError::HostCall { .. } => ErrorCategory::HostCall,
            ExportError::ConfigError { .. }
            | ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. }
            | ExportError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ExportError::ZipError(_)
            | ExportError::CsvError(_)
            | ExportError::SerializationError(_)
            | ExportError::EncodingError { .. } => ErrorCategory::Encoding,
            ExportError::IoError(_) | ExportError::DispatcherClosed => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::InputState => ErrorSeverity::Low,
            ErrorCategory::HostCall => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Encoding => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn is_input_state(&self) -> bool {
        self.category() == ErrorCategory::InputState
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ExportError::NoColumnsAvailable => "No columns selected for export.".to_string(),
            ExportError::NoRecords => "No records received.".to_string(),
            ExportError::HostCall { operation, .. } => {
                format!("Could not reach the data source while running '{}'.", operation)
            }
            ExportError::ApiError(_) => "Could not reach the data source.".to_string(),
            ExportError::MissingConfigError { field } => {
                format!("Missing configuration value: {}", field)
            }
            ExportError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid configuration value for {}: {}", field, reason)
            }
            ExportError::ConfigError { .. } | ExportError::ConfigValidationError { .. } => {
                "The configuration file could not be used.".to_string()
            }
            _ => format!("Export failed: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::InputState => {
                "Map at least one column to 'Columns to Export' or make sure the view has rows."
            }
            ErrorCategory::HostCall => {
                "Check the source endpoint, the API key and that the document is shared with read access."
            }
            ErrorCategory::Configuration => "Fix the configuration file and run again.",
            ErrorCategory::Encoding => "Check cell contents for values that cannot be encoded.",
            ErrorCategory::System => "Check that the output directory exists and is writable.",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
