//! Configuration management for seriallog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. The
//! values collected here are the named constants of the logging session:
//! output path, header labels, field delimiter, expected field count, and
//! the acquisition timing knobs.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "seriallog";

/// Default output file name, created in the working directory.
const OUTPUT_FILE_NAME: &str = "voltage_log.csv";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SERIALLOG_`)
/// 2. TOML config file at `~/.config/seriallog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output file configuration.
    pub output: OutputConfig,
    /// Acquisition loop configuration.
    pub acquisition: AcquisitionConfig,
}

/// Output-file-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the output CSV file.
    /// Defaults to `voltage_log.csv` in the working directory.
    pub path: Option<PathBuf>,
    /// Header labels, one per field.
    pub header: Vec<String>,
    /// Field delimiter used for both input lines and output rows.
    pub delimiter: char,
    /// Number of fields a line must have to be accepted as a record.
    pub expected_fields: usize,
}

/// Acquisition-loop-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Per-read timeout in milliseconds. A read that sees no data within
    /// this window yields no line, which is not an error.
    pub read_timeout_ms: u64,
    /// Delay after opening the port before the first read, in milliseconds,
    /// to let the transport initialize.
    pub settle_delay_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None, // Will be resolved to default at runtime
            header: vec!["Time(s)".to_string(), "Voltage(V)".to_string()],
            delimiter: ',',
            expected_fields: 2,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 1000,
            settle_delay_ms: 2000,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `SERIALLOG_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SERIALLOG_").split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.output.expected_fields == 0 {
            return Err(Error::config_validation(
                "expected_fields must be at least 1",
            ));
        }

        if self.output.header.len() != self.output.expected_fields {
            return Err(Error::config_validation(format!(
                "header has {} labels but expected_fields is {}",
                self.output.header.len(),
                self.output.expected_fields
            )));
        }

        if !self.output.delimiter.is_ascii() {
            return Err(Error::config_validation(format!(
                "delimiter '{}' must be a single ASCII character",
                self.output.delimiter
            )));
        }

        if self.acquisition.read_timeout_ms == 0 {
            return Err(Error::config_validation(
                "read_timeout_ms must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Get the output file path, resolving defaults if not set.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(OUTPUT_FILE_NAME))
    }

    /// Get the field delimiter as a byte, as the CSV writer expects it.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        // Validated to be ASCII, so the cast is lossless.
        self.output.delimiter as u8
    }

    /// Get the per-read timeout as a Duration.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.acquisition.read_timeout_ms)
    }

    /// Get the post-open settle delay as a Duration.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.acquisition.settle_delay_ms)
    }
}
