//! Configuration schema (tsqlbricks.toml)

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "tsqlbricks.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Worker pool size for directory conversion (None = available cores)
    #[serde(default)]
    pub jobs: Option<usize>,

    /// File extension converted by the batch driver, matched case-insensitively
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Delete and recreate the output root before a batch run
    #[serde(default = "default_true")]
    pub clean_output: bool,

    /// Emit the two provenance comment lines at the top of each output
    #[serde(default = "default_true")]
    pub header: bool,
}

fn default_extension() -> String {
    "sql".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs: None,
            extension: default_extension(),
            clean_output: true,
            header: true,
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config.jobs == Some(0) {
            return Err(ConfigError::ParseError("jobs must be at least 1".to_string()));
        }

        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Whether a file name carries the configured extension
    pub fn matches_extension(&self, file_name: &str) -> bool {
        let suffix = format!(".{}", self.extension.to_lowercase());
        file_name.to_lowercase().ends_with(&suffix)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.extension, "sql");
        assert!(config.clean_output);
        assert!(config.header);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = Config::from_toml("jobs = 4").unwrap();
        assert_eq!(config.jobs, Some(4));
        assert_eq!(config.worker_count(), 4);
        assert_eq!(config.extension, "sql");
        assert!(config.header);
    }

    #[test]
    fn zero_jobs_rejected() {
        assert!(matches!(Config::from_toml("jobs = 0"), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let config = Config::default();
        assert!(config.matches_extension("Model.SQL"));
        assert!(config.matches_extension("model.sql"));
        assert!(!config.matches_extension("model.sql.bak"));
        assert!(!config.matches_extension("notsql"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config { jobs: Some(2), ..Config::default() };
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }
}
