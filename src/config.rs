//! Configuration
//!
//! Reads configuration from:
//! - `.cppcheckrc.yaml` / `.cppcheckrc.json` (project-level)
//! - `~/.cppcheckrc.yaml` (user-level)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cppcheck report path is empty, run cppcheck externally and set 'report_path' to its XML report")]
    MissingReportPath,

    #[error("Cppcheck report is not found, please check 'report_path': {}", .0.display())]
    ReportNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Catalog compilation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding one report per Cppcheck version
    pub snapshots_dir: PathBuf,

    /// Snapshot file name prefix (`cppcheck-1.72.xml`)
    pub file_prefix: String,

    /// Replacement table (.properties, .yaml or .json)
    pub replacements: Option<PathBuf>,

    /// Compiled catalog file
    pub output: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            snapshots_dir: PathBuf::from("files"),
            file_prefix: "cppcheck-".to_string(),
            replacements: None,
            output: PathBuf::from("cppcheck.xml"),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color: ColorMode,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cppcheck XML report to import
    pub report_path: Option<PathBuf>,

    /// Languages to build rule repositories for
    pub languages: Vec<String>,

    /// Language owning extensions several languages claim (`.h`)
    pub header_language: String,

    /// Catalog compilation settings
    pub catalog: CatalogConfig,

    /// Output settings
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_path: None,
            languages: vec!["c".to_string(), "cpp".to_string()],
            header_language: "cpp".to_string(),
            catalog: CatalogConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_names = [".cppcheckrc.yaml", ".cppcheckrc.yml", ".cppcheckrc.json"];

        // Check current directory
        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            for name in &config_names {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.iter().any(|l| l.trim().is_empty()) {
            return Err(ConfigError::Invalid("empty language name".to_string()));
        }
        if self.header_language.trim().is_empty() {
            return Err(ConfigError::Invalid("empty header_language".to_string()));
        }
        if self.catalog.file_prefix.is_empty() {
            return Err(ConfigError::Invalid("empty catalog.file_prefix".to_string()));
        }
        Ok(())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        report_path: Option<PathBuf>,
        snapshots_dir: Option<PathBuf>,
        replacements: Option<PathBuf>,
        output: Option<PathBuf>,
    ) {
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(p) = report_path {
            self.report_path = Some(p);
        }
        if let Some(d) = snapshots_dir {
            self.catalog.snapshots_dir = d;
        }
        if let Some(r) = replacements {
            self.catalog.replacements = Some(r);
        }
        if let Some(o) = output {
            self.catalog.output = o;
        }
    }

    /// The configured report, checked to be an existing file
    pub fn report_file(&self) -> Result<&Path, ConfigError> {
        let path = match &self.report_path {
            Some(p) if !p.as_os_str().is_empty() => p.as_path(),
            _ => return Err(ConfigError::MissingReportPath),
        };
        if !path.is_file() {
            return Err(ConfigError::ReportNotFound(path.to_path_buf()));
        }
        Ok(path)
    }
}
