//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load configuration files
//! across all estim applications. TOML is the default format; files with a
//! `.json` extension are parsed as JSON so configurations saved by older
//! tooling can be loaded unchanged.
//!
//! # Usage
//!
//! ```rust,no_run
//! use estim_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use estim_common::stim::StimulationConfig;
//! use serde::Deserialize;
//! use std::path::{Path, PathBuf};
//!
//! #[derive(Debug, Deserialize)]
//! struct RunFile {
//!     shared: SharedConfig,
//!     stimulation: StimulationConfig,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let run = RunFile::load(Path::new("stim.toml"))?;
//!     run.shared.validate()?;
//!     println!("{}: {} trains", run.shared.service_name, run.stimulation.train_count);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("Config file {} not found", .0.display())]
    FileNotFound(PathBuf),

    /// Unreadable file or TOML / JSON syntax error.
    #[error("Cannot parse config: {0}")]
    ParseError(String),

    /// Parsed, but the values are rejected.
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// `[shared] log_level`, lowercase in files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every backend line write.
    Trace,
    /// Commit groups and sequence summaries.
    Debug,
    /// Lifecycle and state changes.
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Aborted operations.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// `[shared]` table of every estim configuration file.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "estim-matrix-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Default log level when no `-v` / `RUST_LOG` is given.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Name reported in the startup log line.
    pub service_name: String,
}

impl SharedConfig {
    /// Reject a blank `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "[shared] service_name is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load any deserializable config from TOML or JSON.
///
/// Blanket-implemented; semantic checks stay with each config's own
/// `validate()`.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read `path`; `.json` files are parsed as JSON, anything else as TOML.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            _ => ConfigError::ParseError(format!("{}: {e}", path.display())),
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parse configuration from TOML text.
    fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse configuration from JSON text.
    fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Deserialize)]
    struct HoldFile {
        shared: SharedConfig,
        latch_hold_us: u64,
    }

    #[test]
    fn log_levels_parse_lowercase() {
        #[derive(Deserialize)]
        struct Level {
            level: LogLevel,
        }

        assert_eq!(LogLevel::default(), LogLevel::Info);
        for (text, level) in [("trace", LogLevel::Trace), ("warn", LogLevel::Warn)] {
            let parsed: Level = toml::from_str(&format!("level = \"{text}\"")).unwrap();
            assert_eq!(parsed.level, level);
        }
        assert!(toml::from_str::<Level>("level = \"Verbose\"").is_err());
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
    }

    #[test]
    fn blank_service_name_rejected() {
        let shared = SharedConfig {
            log_level: LogLevel::Warn,
            service_name: "  ".into(),
        };
        let err = shared.validate().unwrap_err();
        assert!(err.to_string().contains("service_name"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = HoldFile::load(Path::new("/nonexistent/estim/matrix.toml")).unwrap_err();
        assert!(matches!(&err, ConfigError::FileNotFound(p) if p.ends_with("matrix.toml")));
        assert!(err.to_string().contains("/nonexistent/estim/matrix.toml"));
    }

    #[test]
    fn broken_toml_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[shared\nlatch_hold_us = ").unwrap();
        assert!(matches!(
            HoldFile::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn toml_and_json_load_the_same_values() {
        let mut toml_file = NamedTempFile::new().unwrap();
        write!(
            toml_file,
            "latch_hold_us = 250\n\n[shared]\nlog_level = \"debug\"\nservice_name = \"rig-a\"\n"
        )
        .unwrap();

        let mut json_file = tempfile::Builder::new().suffix(".JSON").tempfile().unwrap();
        write!(
            json_file,
            r#"{{"latch_hold_us": 250, "shared": {{"log_level": "debug", "service_name": "rig-a"}}}}"#
        )
        .unwrap();

        for path in [toml_file.path(), json_file.path()] {
            let loaded = HoldFile::load(path).unwrap();
            assert_eq!(loaded.latch_hold_us, 250);
            assert_eq!(loaded.shared.log_level, LogLevel::Debug);
            assert_eq!(loaded.shared.service_name, "rig-a");
        }
    }
}
