//! Session playback
//!
//! Reads exported sessions back for offline analysis.

use chrono::DateTime;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::CSV_HEADER;
use crate::frame::{Channel, FrameParser, Sample, CHANNEL_COUNT};

/// Errors that can occur while reading an exported session
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unexpected header: '{0}'")]
    Header(String),

    #[error("Line {line}: {reason}")]
    Row { line: usize, reason: String },
}

/// Read an exported CSV session
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Sample>, PlaybackError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| PlaybackError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(&content)
}

/// Parse exported CSV content
pub fn parse_csv(content: &str) -> Result<Vec<Sample>, PlaybackError> {
    let mut lines = content.lines();
    let header = lines.next().unwrap_or_default().trim();
    if header != CSV_HEADER {
        return Err(PlaybackError::Header(header.to_string()));
    }

    let mut samples = Vec::new();
    for (i, line) in lines.enumerate() {
        // 1-based, header is line 1
        let line_no = i + 2;
        if line.trim().is_empty() {
            continue;
        }

        let (time, rest) = line.split_once(',').ok_or_else(|| PlaybackError::Row {
            line: line_no,
            reason: "missing channel columns".to_string(),
        })?;

        let seconds: f64 = time.trim().parse().map_err(|_| PlaybackError::Row {
            line: line_no,
            reason: format!("invalid time '{}'", time.trim()),
        })?;
        let captured_at = DateTime::from_timestamp_micros((seconds * 1_000_000.0).round() as i64)
            .ok_or_else(|| PlaybackError::Row {
                line: line_no,
                reason: format!("time out of range: {}", seconds),
            })?;

        let values = FrameParser::parse_values(rest.as_bytes()).map_err(|e| PlaybackError::Row {
            line: line_no,
            reason: e.to_string(),
        })?;

        samples.push(Sample::new(captured_at, values));
    }

    Ok(samples)
}

/// Min / max / mean of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelSummary {
    /// Channel summarized
    pub channel: Channel,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
}

/// Recorded session player for offline analysis
pub struct SessionPlayer {
    samples: Vec<Sample>,
    position: usize,
}

impl SessionPlayer {
    /// Create a player over recorded samples
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            position: 0,
        }
    }

    /// Load an exported session from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PlaybackError> {
        Ok(Self::new(read_csv(path)?))
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time between the first and last sample
    pub fn duration(&self) -> Duration {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => (last.captured_at - first.captured_at)
                .to_std()
                .unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }

    /// Get the current position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Seek to a position
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.samples.len().saturating_sub(1));
    }

    /// Seek to the first sample at or after `offset` from the start
    pub fn seek_to_offset(&mut self, offset: Duration) {
        let Some(first) = self.samples.first().map(|s| s.captured_at) else {
            return;
        };
        self.position = self
            .samples
            .iter()
            .position(|s| (s.captured_at - first).to_std().unwrap_or_default() >= offset)
            .unwrap_or(self.samples.len().saturating_sub(1));
    }

    /// Get the current sample
    pub fn current(&self) -> Option<&Sample> {
        self.samples.get(self.position)
    }

    /// Advance to the next sample
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Sample> {
        if self.position + 1 < self.samples.len() {
            self.position += 1;
            self.current()
        } else {
            None
        }
    }

    /// Get all samples
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Values of one channel in recorded order
    pub fn channel_values(&self, channel: Channel) -> Vec<f64> {
        self.samples.iter().map(|s| s.get(channel)).collect()
    }

    /// Per-channel statistics; empty when there are no samples
    pub fn summary(&self) -> Vec<ChannelSummary> {
        if self.samples.is_empty() {
            return Vec::new();
        }

        let mut min = [f64::INFINITY; CHANNEL_COUNT];
        let mut max = [f64::NEG_INFINITY; CHANNEL_COUNT];
        let mut sum = [0.0; CHANNEL_COUNT];
        for sample in &self.samples {
            for (i, &v) in sample.values.iter().enumerate() {
                min[i] = min[i].min(v);
                max[i] = max[i].max(v);
                sum[i] += v;
            }
        }

        let n = self.samples.len() as f64;
        Channel::ALL
            .into_iter()
            .map(|channel| {
                let i = channel.index();
                ChannelSummary {
                    channel,
                    min: min[i],
                    max: max[i],
                    mean: sum[i] / n,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONTENT: &str = "time,acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z,temp\n\
        1700000000.000000,0,0,9.8,0,0,0,30\n\
        1700000000.500000,1,0,9.8,0,0,0,31\n\
        1700000001.000000,2,0,9.8,0,0,0,32\n";

    fn make_test_player() -> SessionPlayer {
        SessionPlayer::new(parse_csv(CONTENT).unwrap())
    }

    #[test]
    fn test_player_navigation() {
        let mut player = make_test_player();
        assert_eq!(player.len(), 3);
        assert_eq!(player.duration(), Duration::from_secs(1));

        assert_eq!(player.current().unwrap().get(Channel::AccX), 0.0);
        player.next();
        assert_eq!(player.position(), 1);

        player.seek_to_offset(Duration::from_millis(700));
        assert_eq!(player.position(), 2);
        assert!(player.next().is_none());
    }

    #[test]
    fn test_channel_values_and_summary() {
        let player = make_test_player();
        assert_eq!(player.channel_values(Channel::Temp), vec![30.0, 31.0, 32.0]);

        let temp = player.summary()[Channel::Temp.index()];
        assert_eq!(temp.min, 30.0);
        assert_eq!(temp.max, 32.0);
        assert_eq!(temp.mean, 31.0);
    }

    #[test]
    fn test_header_only_is_empty() {
        let samples = parse_csv("time,acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z,temp\n").unwrap();
        assert!(samples.is_empty());
        assert!(SessionPlayer::new(samples).summary().is_empty());
    }

    #[test]
    fn test_bad_rows_are_reported() {
        let err = parse_csv("time,acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z,temp\n1,2,3\n")
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Row { line: 2, .. }));

        let err = parse_csv("a,b\n").unwrap_err();
        assert!(matches!(err, PlaybackError::Header(_)));
    }
}
