use serde::{Deserialize, Serialize};

use super::capture::CaptureConfig;
use super::collector::CollectorConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;

/// Main configuration structure for DNS Harvester
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Capture input configuration
    pub capture: CaptureConfig,

    /// Collector and timeframe configuration
    pub collector: CollectorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. dns-harvester.toml in current directory
    /// 3. /etc/dns-harvester/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("dns-harvester.toml").exists() {
            Self::from_file("dns-harvester.toml")?
        } else if std::path::Path::new("/etc/dns-harvester/config.toml").exists() {
            Self::from_file("/etc/dns-harvester/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    /// Load configuration from a specific file
    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply command-line overrides to configuration
    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(input) = overrides.input {
            self.capture.input = Some(input);
        }
        if let Some(len) = overrides.timeframe_len_ms {
            self.collector.timeframe_len_ms = len;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collector.timeframe_len_ms == 0 {
            return Err(ConfigError::Validation(
                "Timeframe length cannot be 0".to_string(),
            ));
        }

        if !self.collector.pending_capacity.is_power_of_two() {
            return Err(ConfigError::Validation(format!(
                "Pending index capacity must be a power of two, got {}",
                self.collector.pending_capacity
            )));
        }

        if self.collector.output_queue_depth == 0 {
            return Err(ConfigError::Validation(
                "Output queue depth cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub input: Option<String>,
    pub timeframe_len_ms: Option<u64>,
    pub log_level: Option<String>,
}
