use crate::core::encoders::{build_encoders, workbook::DEFAULT_SHEET_NAME, SUPPORTED_FORMATS};
use crate::core::filename::FilenamePolicyKind;
use crate::core::session::{SessionSettings, DEFAULT_FILENAME_PREFIX};
use crate::domain::ports::Encoder;
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_output_formats, validate_path, validate_range,
    validate_sheet_name, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub export: ExportSection,
    pub source: SourceConfig,
    /// Role options payload, same shape the host sends on a mapping change.
    pub columns: Option<Map<String, Value>>,
    pub filename: Option<FilenameConfig>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSection {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub r#type: String,
    pub endpoint: Option<String>,
    pub path: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilenameConfig {
    #[serde(default)]
    pub policy: FilenamePolicyKind,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: String,
    pub formats: Vec<String>,
    pub sheet_name: Option<String>,
    pub exclude: Option<Vec<String>>,
}

impl ExportConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ExportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ExportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GRIST_API_KEY})，找不到的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ExportError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("export.name", &self.export.name)?;

        match self.source.r#type.as_str() {
            "grist" | "api" => {
                let endpoint = self.source.endpoint.as_deref().unwrap_or_default();
                validate_url("source.endpoint", endpoint)?;
            }
            "file" => {
                let path = self.source.path.as_deref().unwrap_or_default();
                validate_path("source.path", path)?;
            }
            other => {
                return Err(ExportError::InvalidConfigValueError {
                    field: "source.type".to_string(),
                    value: other.to_string(),
                    reason: "Supported source types: grist, file".to_string(),
                })
            }
        }

        if let Some(timeout) = self.source.timeout_seconds {
            validate_range("source.timeout_seconds", timeout, 1, 300)?;
        }

        validate_path("output.output_path", &self.output.output_path)?;
        validate_output_formats("output.formats", &self.output.formats, &SUPPORTED_FORMATS)?;
        validate_sheet_name("output.sheet_name", self.sheet_name())?;

        Ok(())
    }

    /// Options payload to feed the session, `{}` when `[columns]` is absent.
    pub fn options_payload(&self) -> Value {
        Value::Object(self.columns.clone().unwrap_or_default())
    }

    pub fn session_settings(&self) -> SessionSettings {
        let filename = self.filename.clone().unwrap_or_default();
        SessionSettings {
            filename_policy: filename.policy,
            filename_prefix: filename
                .prefix
                .unwrap_or_else(|| DEFAULT_FILENAME_PREFIX.to_string()),
            exclude: self.output.exclude.clone().unwrap_or_default(),
        }
    }

    pub fn sheet_name(&self) -> &str {
        self.output.sheet_name.as_deref().unwrap_or(DEFAULT_SHEET_NAME)
    }

    pub fn encoders(&self) -> Result<Vec<Box<dyn Encoder>>> {
        build_encoders(&self.output.formats, self.sheet_name())
    }

    pub fn output_path(&self) -> &str {
        &self.output.output_path
    }
}

impl Validate for ExportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
