//! Configuration
//!
//! Capture settings persisted as pretty-printed JSON. Missing keys fall back
//! to their defaults so older files keep loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::datalog::DEFAULT_OUTPUT_DIR;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::protocol::{DEFAULT_BAUD_RATE, DEFAULT_MAX_LINE_LEN};

/// Default serial port
#[cfg(target_os = "windows")]
pub const DEFAULT_PORT: &str = "COM3";
/// Default serial port
#[cfg(target_os = "macos")]
pub const DEFAULT_PORT: &str = "/dev/tty.usbserial-0001";
/// Default serial port
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Errors loading or saving the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial port the IMU is attached to
    pub port: String,
    /// Link baud rate (framing is always 8N1)
    pub baud_rate: u32,
    /// Values kept per channel for live display
    pub history_capacity: usize,
    /// Directory exported sessions are written to
    pub output_dir: PathBuf,
    /// Initial session name
    pub session_name: String,
    /// Sleep after a poll that returned no data, in milliseconds
    pub poll_interval_ms: u64,
    /// Longest partial line kept before it is discarded
    pub max_line_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            session_name: crate::datalog::DEFAULT_SESSION_NAME.to_string(),
            poll_interval_ms: 5,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl Config {
    /// Load from `path`, or defaults if the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.normalized())
    }

    /// Write to `path`, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        std::fs::write(path, json).map_err(write_err)
    }

    /// Clamp values that would make the pipeline degenerate
    pub fn normalized(mut self) -> Self {
        self.history_capacity = self.history_capacity.max(1);
        self.max_line_len = self.max_line_len.max(16);
        self
    }
}
