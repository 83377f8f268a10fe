//! Data Logging
//!
//! Records sessions of IMU samples, exports them to CSV and reads them back.

mod format;
mod playback;
mod recorder;

pub use format::{write_csv, ExportError, SessionExporter, CSV_HEADER, DEFAULT_OUTPUT_DIR};
pub use playback::{read_csv, ChannelSummary, PlaybackError, SessionPlayer};
pub use recorder::{RecordOutcome, RecordingController, RecordingState, DEFAULT_SESSION_NAME};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::frame::Sample;

/// A session still being captured
#[derive(Debug, Clone)]
pub struct Session {
    started_at: DateTime<Utc>,
    samples: Vec<Sample>,
}

impl Session {
    /// Start an empty session
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            samples: Vec::new(),
        }
    }

    /// Append a captured sample
    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Number of captured samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// When recording began
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Freeze the session under `name`
    pub fn seal(self, name: String, sealed_at: DateTime<Utc>) -> SealedSession {
        SealedSession {
            name,
            started_at: self.started_at,
            sealed_at,
            samples: self.samples,
        }
    }
}

/// A completed session, ready for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedSession {
    /// Session name, determines the export destination
    pub name: String,
    /// When recording began
    pub started_at: DateTime<Utc>,
    /// When recording stopped
    pub sealed_at: DateTime<Utc>,
    /// Captured samples in append order
    pub samples: Vec<Sample>,
}

impl SealedSession {
    /// Number of captured samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Wall-clock span between the first and last captured sample
    pub fn duration(&self) -> Duration {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => (last.captured_at - first.captured_at)
                .to_std()
                .unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }
}
