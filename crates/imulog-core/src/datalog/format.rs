//! Log file format
//!
//! Writes sealed sessions as CSV: one header row followed by one row per
//! captured sample, `time` first as seconds since the Unix epoch.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::SealedSession;
use crate::frame::{Channel, Sample};

/// Header row of exported files
pub const CSV_HEADER: &str = "time,acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z,temp";

/// File extension of exported sessions
pub const CSV_EXTENSION: &str = "csv";

/// Default directory exported sessions are written to
pub const DEFAULT_OUTPUT_DIR: &str = "data_collection";

/// Errors that can occur while exporting a session
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid session name '{0}'")]
    InvalidName(String),

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Write samples to a CSV file, replacing any existing file
pub fn write_csv<P: AsRef<Path>>(path: P, samples: &[Sample]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", CSV_HEADER)?;

    for sample in samples {
        write!(writer, "{:.6}", sample.epoch_seconds())?;
        for channel in Channel::ALL {
            write!(writer, ",{}", sample.get(channel))?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes sealed sessions into an output directory
#[derive(Debug, Clone)]
pub struct SessionExporter {
    output_dir: PathBuf,
}

impl SessionExporter {
    /// Create an exporter writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory exports are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolve the file a session named `name` is written to
    ///
    /// A trailing `.csv` on the name is accepted and not doubled.
    pub fn destination(&self, name: &str) -> Result<PathBuf, ExportError> {
        let trimmed = name.trim();
        let stem = trimmed.strip_suffix(".csv").unwrap_or(trimmed);

        let has_separator = stem.contains(|c: char| c == '/' || c == '\\');
        if stem.is_empty() || stem == "." || stem == ".." || has_separator {
            return Err(ExportError::InvalidName(name.to_string()));
        }

        Ok(self.output_dir.join(format!("{}.{}", stem, CSV_EXTENSION)))
    }

    /// Write a sealed session to its destination
    ///
    /// The session is borrowed so a failed export can be retried.
    pub fn export(&self, session: &SealedSession) -> Result<PathBuf, ExportError> {
        let path = self.destination(&session.name)?;

        fs::create_dir_all(&self.output_dir).map_err(|source| ExportError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        write_csv(&path, &session.samples).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            "Exported session '{}' ({} samples) to {}",
            session.name,
            session.len(),
            path.display()
        );
        Ok(path)
    }
}

impl Default for SessionExporter {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}
