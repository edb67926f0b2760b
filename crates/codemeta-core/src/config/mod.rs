//! Configuration management for codemeta.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `codemeta.toml` file
//! 3. User config `~/.config/codemeta/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extraction limits.
    pub extract: ExtractConfig,

    /// Compiler-service configuration for TypeScript/JavaScript.
    pub service: ServiceConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./codemeta.toml` (project local)
    /// 2. `~/.config/codemeta/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides apply in every case.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::locate() {
            Some(path) => Self::from_file(path),
            None => Self::default().with_overrides(|key| std::env::var(key).ok()),
        }
    }

    /// First existing config file in search order.
    pub fn locate() -> Option<PathBuf> {
        let local = PathBuf::from(PROJECT_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        let user_config = dirs::config_dir()?
            .join(USER_CONFIG_DIR)
            .join(USER_CONFIG_FILE);
        user_config.exists().then_some(user_config)
    }

    /// Apply overrides from `lookup`, then validate the result.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        self.apply_overrides(lookup)?;
        self.validate()?;
        Ok(self)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable numbers are ignored; an unknown service mode is an error.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(mode) = lookup(ENV_SERVICE_MODE) {
            self.service.mode = mode.parse()?;
        }
        if let Some(program) = lookup(ENV_SERVICE_PROGRAM) {
            self.service.program = program;
        }
        if let Some(timeout) = lookup(ENV_SERVICE_TIMEOUT) {
            if let Ok(n) = timeout.parse() {
                self.service.timeout_secs = n;
            }
        }
        if let Some(size) = lookup(ENV_MAX_FILE_SIZE) {
            if let Ok(n) = size.parse() {
                self.extract.max_file_size = n;
            }
        }
        Ok(())
    }

    /// Reject values no caller could use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "service.program must not be empty".to_string(),
            ));
        }
        if self.service.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "service.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Extraction limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Maximum size of a single file to extract (in bytes). 0 disables.
    pub max_file_size: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Where TypeScript/JavaScript extraction runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Walk the syntax tree in this process.
    #[default]
    InProcess,
    /// Invoke the compiler-service executable per file.
    External,
}

impl std::str::FromStr for ServiceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "in_process" | "inprocess" => Ok(Self::InProcess),
            "external" => Ok(Self::External),
            other => Err(ConfigError::Invalid(format!(
                "unknown service mode `{}` (expected `in_process` or `external`)",
                other
            ))),
        }
    }
}

/// Compiler-service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub mode: ServiceMode,

    /// Executable name or path; bare names are resolved through `PATH`.
    pub program: String,

    /// Bounded wait per call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mode: ServiceMode::default(),
            program: DEFAULT_SERVICE_PROGRAM.to_string(),
            timeout_secs: DEFAULT_SERVICE_TIMEOUT_SECS,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.extract.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.service.mode, ServiceMode::InProcess);
        assert_eq!(config.service.program, DEFAULT_SERVICE_PROGRAM);
        assert_eq!(config.service.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_to_toml() {
        let toml_str = Config::default_config_string();
        assert!(toml_str.contains("[extract]"));
        assert!(toml_str.contains("[service]"));
        assert!(toml_str.contains("mode = \"in_process\""));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[extract]
max_file_size = 0

[service]
mode = "external"
program = "/opt/codemeta/bin/codemeta-tsc"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.extract.max_file_size, 0);
        assert_eq!(config.service.mode, ServiceMode::External);
        assert_eq!(config.service.program, "/opt/codemeta/bin/codemeta-tsc");
        assert_eq!(config.service.timeout_secs, DEFAULT_SERVICE_TIMEOUT_SECS);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SERVICE_MODE, "External"),
            (ENV_SERVICE_TIMEOUT, "5"),
            (ENV_MAX_FILE_SIZE, "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.service.mode, ServiceMode::External);
        assert_eq!(config.service.timeout_secs, 5);
        assert_eq!(config.extract.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_invalid_mode_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == ENV_SERVICE_MODE).then(|| "remote".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_overrides_are_validated() {
        let err = Config::default()
            .with_overrides(|key| (key == ENV_SERVICE_TIMEOUT).then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Config::default()
            .with_overrides(|key| (key == ENV_SERVICE_PROGRAM).then(|| "  ".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = Config::default().with_overrides(|_| None).unwrap();
        assert_eq!(config.service.timeout_secs, DEFAULT_SERVICE_TIMEOUT_SECS);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.service.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
