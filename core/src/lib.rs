//! # cpuhog-core
//!
//! Core library for the cpuhog sensor suite providing shared functionality
//! for status-bar monitors that print one line per reporting period.
//!
//! ## Features
//!
//! - **Line sensor trait** - Standardized interface for stream-driven sensors
//! - **Configuration management** - RON-based configuration with defaults
//! - **Fixed-width formatting** - Column helpers for compact bar text
//! - **Error handling** - Comprehensive error types with context
//!
//! ## Quick Start
//!
//! ```rust
//! use cpuhog_core::{LineSensor, SensorError};
//!
//! // A sensor that publishes every non-empty line it sees, upper-cased.
//! struct Shout {
//!     name: String,
//! }
//!
//! impl LineSensor for Shout {
//!     type Error = SensorError;
//!
//!     fn name(&self) -> &str {
//!         &self.name
//!     }
//!
//!     fn feed(&mut self, line: &str) -> Option<String> {
//!         (!line.is_empty()).then(|| line.to_uppercase())
//!     }
//! }
//!
//! let mut sensor = Shout { name: "shout".to_owned() };
//! assert_eq!(sensor.feed("hi"), Some("HI".to_owned()));
//! assert_eq!(sensor.feed(""), None);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global configuration loaded from ~/.config/cpuhog/config.ron
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Column budget for the command name plus its `*N` process-count suffix
    #[serde(default = "default_label_width")]
    pub label_width: usize,
    /// Installed location of `pidstat` (Linux only)
    #[serde(default = "default_pidstat_path")]
    pub pidstat_path: PathBuf,
    /// Default log filter (e.g. "info" or "cpuhog_top_cpu=debug"); `RUST_LOG` wins
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_label_width() -> usize {
    GlobalConfig::DEFAULT_LABEL_WIDTH
}

fn default_pidstat_path() -> PathBuf {
    PathBuf::from(GlobalConfig::DEFAULT_PIDSTAT_PATH)
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            label_width: default_label_width(),
            pidstat_path: default_pidstat_path(),
            log_filter: None,
        }
    }
}

impl GlobalConfig {
    /// Width of the name column used when nothing else is configured.
    pub const DEFAULT_LABEL_WIDTH: usize = 12;

    /// Where the sysstat package installs `pidstat`.
    pub const DEFAULT_PIDSTAT_PATH: &'static str = "/usr/bin/pidstat";

    /// Load configuration from the standard config file location.
    ///
    /// Searches for config in:
    /// 1. ~/.config/cpuhog/config.ron
    /// 2. ~/.cpuhog/config.ron (fallback)
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self, SensorError> {
        if let Some(config_path) = Self::find_config_file() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self, SensorError> {
        let content = std::fs::read_to_string(path)?;

        let config: GlobalConfig = ron::from_str(&content).map_err(|e| {
            SensorError::parse_with_source(
                format!("Failed to parse config file {}", path.display()),
                e,
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot produce a usable line.
    pub fn validate(&self) -> Result<(), SensorError> {
        if self.label_width == 0 {
            return Err(SensorError::config_with_value(
                "label_width must be at least 1",
                self.label_width.to_string(),
            ));
        }
        Ok(())
    }

    /// Find the config file in standard locations.
    pub fn find_config_file() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_path = config_dir.join("cpuhog").join("config.ron");
            if xdg_path.exists() {
                return Some(xdg_path);
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".cpuhog").join("config.ron");
            if home_path.exists() {
                return Some(home_path);
            }
        }

        None
    }

    /// Get the default config file path for writing.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cpuhog").join("config.ron"))
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SensorError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SensorError::parse_with_source("Failed to serialize config", e))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create an example configuration with every setting spelled out.
    pub fn example_config() -> Self {
        Self {
            log_filter: Some("warn".to_owned()),
            ..Self::default()
        }
    }

    /// Save example configuration with documentation to a file.
    pub fn save_example_config_to_file(path: &Path) -> Result<(), SensorError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let body = ron::ser::to_string_pretty(&Self::example_config(), ron::ser::PrettyConfig::default())
            .map_err(|e| SensorError::parse_with_source("Failed to serialize config", e))?;

        let content = format!(
            "// cpuhog configuration\n\
             //\n\
             // label_width:  columns shared by the command name and its *N suffix\n\
             // pidstat_path: installed location of pidstat (Linux only)\n\
             // log_filter:   default tracing filter, overridden by RUST_LOG\n\
             {body}\n"
        );

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// A sensor driven by a stream of text lines rather than by a timer.
///
/// Each call to [`LineSensor::feed`] hands the sensor one line of output from
/// its data source. The sensor answers with the line to publish, if the input
/// completed a reporting period, or `None` when there is nothing to print yet.
pub trait LineSensor {
    /// Error type for sensor operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Get the unique name/identifier for this sensor.
    fn name(&self) -> &str;

    /// Consume one line of source output.
    ///
    /// Returns `Some(line)` when a reporting period closed. The published line
    /// may be empty, which tells the bar to hide the monitor.
    fn feed(&mut self, line: &str) -> Option<String>;

    /// Check if the sensor is available on this system.
    ///
    /// Default implementation returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor is not available or supported.
    fn check_availability(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Utility functions for fixed-width bar text.
pub mod format {
    /// Round to the nearest integer, halves away from zero.
    #[must_use]
    pub fn round_half_away(value: f64) -> i64 {
        value.round() as i64
    }

    /// Process-count suffix, present only for more than one process.
    ///
    /// ```rust
    /// use cpuhog_core::format::count_suffix;
    ///
    /// assert_eq!(count_suffix(1), "");
    /// assert_eq!(count_suffix(3), "*3");
    /// ```
    #[must_use]
    pub fn count_suffix(count: usize) -> String {
        if count > 1 {
            format!("*{count}")
        } else {
            String::new()
        }
    }

    /// Truncate `name` so that `name + suffix` fits in `budget` characters.
    ///
    /// The suffix is never cut. Counting is by `char`, so multi-byte names
    /// are never split inside a code point.
    #[must_use]
    pub fn fit_label(name: &str, suffix: &str, budget: usize) -> String {
        let keep = budget.saturating_sub(suffix.chars().count());
        let mut label: String = name.chars().take(keep).collect();
        label.push_str(suffix);
        label
    }

    /// Rounded percentage right-aligned in a field of at least `width` columns.
    #[must_use]
    pub fn percent_field(value: f64, width: usize) -> String {
        format!("{:>width$}", round_half_away(value))
    }
}

/// Common error types for sensor operations.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// I/O error occurred while reading sensor data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing sensor data from text format.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what failed to parse
        message: String,
        /// Optional source error for chaining
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error (invalid settings, etc.).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration issue
        message: String,
        /// The invalid configuration value if applicable
        value: Option<String>,
    },

    /// Sensor is not available on this system.
    #[error("Sensor unavailable: {reason}")]
    Unavailable {
        /// Reason why the sensor is unavailable
        reason: String,
    },

    /// The running operating system has no sampler profile.
    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform {
        /// Identity reported by the target, e.g. "windows"
        os: String,
    },

    /// Invalid data format or unexpected values.
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Description of what makes the data invalid
        message: String,
        /// The invalid data if it can be safely displayed
        data: Option<String>,
    },

    /// The external sampler closed its output.
    #[error("{program} exited unexpectedly ({status})")]
    ChildExited {
        /// Program that was running
        program: String,
        /// Exit status as reported by the OS
        status: String,
    },
}

impl SensorError {
    /// Create a new parse error with a source error.
    pub fn parse_with_source<S: Into<String>, E>(message: S, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Parse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new configuration error with the invalid value.
    pub fn config_with_value<S: Into<String>, V: Into<String>>(message: S, value: V) -> Self {
        Self::Config {
            message: message.into(),
            value: Some(value.into()),
        }
    }

    /// Create a new unavailable error.
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a new unsupported platform error.
    pub fn unsupported_platform<S: Into<String>>(os: S) -> Self {
        Self::UnsupportedPlatform { os: os.into() }
    }

    /// Create a new invalid data error with the problematic data.
    pub fn invalid_data_with_value<S: Into<String>, D: Into<String>>(message: S, data: D) -> Self {
        Self::InvalidData {
            message: message.into(),
            data: Some(data.into()),
        }
    }

    /// Create a new child exit error.
    pub fn child_exited<P: Into<String>, S: ToString>(program: P, status: S) -> Self {
        Self::ChildExited {
            program: program.into(),
            status: status.to_string(),
        }
    }
}
