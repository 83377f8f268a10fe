//! Frame parsing
//!
//! Turns raw newline-delimited lines from the link into validated [`Sample`]s.
//! A frame is exactly seven comma-separated decimal fields in channel order:
//! `acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z,temp`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of channels in a frame
pub const CHANNEL_COUNT: usize = 7;

/// Field delimiter used on the wire
pub const FIELD_DELIMITER: char = ',';

/// One named scalar field of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Acceleration, X axis (m/s^2)
    AccX,
    /// Acceleration, Y axis (m/s^2)
    AccY,
    /// Acceleration, Z axis (m/s^2)
    AccZ,
    /// Angular velocity, X axis (deg/s)
    GyroX,
    /// Angular velocity, Y axis (deg/s)
    GyroY,
    /// Angular velocity, Z axis (deg/s)
    GyroZ,
    /// Sensor temperature (Celsius)
    Temp,
}

impl Channel {
    /// All channels in wire order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::AccX,
        Channel::AccY,
        Channel::AccZ,
        Channel::GyroX,
        Channel::GyroY,
        Channel::GyroZ,
        Channel::Temp,
    ];

    /// Position of this channel within a frame
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name used in exported files
    pub fn name(self) -> &'static str {
        match self {
            Channel::AccX => "acc_x",
            Channel::AccY => "acc_y",
            Channel::AccZ => "acc_z",
            Channel::GyroX => "gyro_x",
            Channel::GyroY => "gyro_y",
            Channel::GyroZ => "gyro_z",
            Channel::Temp => "temp",
        }
    }

    /// Look up a channel by its column name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Display units
    pub fn units(self) -> &'static str {
        match self {
            Channel::AccX | Channel::AccY | Channel::AccZ => "m/s^2",
            Channel::GyroX | Channel::GyroY | Channel::GyroZ => "deg/s",
            Channel::Temp => "C",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated 7-channel reading with its capture time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock time the frame was accepted
    pub captured_at: DateTime<Utc>,
    /// Channel values in [`Channel::ALL`] order
    pub values: [f64; CHANNEL_COUNT],
}

impl Sample {
    /// Create a sample from values in wire order
    pub fn new(captured_at: DateTime<Utc>, values: [f64; CHANNEL_COUNT]) -> Self {
        Self {
            captured_at,
            values,
        }
    }

    /// Value of a single channel
    pub fn get(&self, channel: Channel) -> f64 {
        self.values[channel.index()]
    }

    /// Capture time as fractional seconds since the Unix epoch
    pub fn epoch_seconds(&self) -> f64 {
        self.captured_at.timestamp_micros() as f64 / 1_000_000.0
    }
}

/// Reasons a frame is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("Frame is not valid UTF-8 (at byte {valid_up_to})")]
    Decode { valid_up_to: usize },

    #[error("Wrong field count: expected {expected}, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("Field {index} is empty")]
    EmptyField { index: usize },

    #[error("Field {index} is not numeric: '{value}'")]
    NonNumeric { index: usize, value: String },

    #[error("Partial frame exceeded {limit} bytes without a line delimiter")]
    Overlong { limit: usize },
}

impl FrameError {
    /// The line could not be decoded as text
    pub fn is_decode(&self) -> bool {
        matches!(self, FrameError::Decode { .. })
    }

    /// The line decoded but failed structural or numeric validation
    pub fn is_malformed(&self) -> bool {
        !self.is_decode()
    }
}

/// Stateless frame parser
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameParser;

impl FrameParser {
    /// Parse a raw line, stamping the sample with the current time
    pub fn parse(line: &[u8]) -> Result<Sample, FrameError> {
        let values = Self::parse_values(line)?;
        Ok(Sample::new(Utc::now(), values))
    }

    /// Parse a raw line with an explicit capture time
    pub fn parse_at(line: &[u8], captured_at: DateTime<Utc>) -> Result<Sample, FrameError> {
        let values = Self::parse_values(line)?;
        Ok(Sample::new(captured_at, values))
    }

    /// Validate a line and extract the channel values
    pub fn parse_values(line: &[u8]) -> Result<[f64; CHANNEL_COUNT], FrameError> {
        let text = std::str::from_utf8(line).map_err(|e| FrameError::Decode {
            valid_up_to: e.valid_up_to(),
        })?;

        let fields: Vec<&str> = text.trim().split(FIELD_DELIMITER).collect();
        if fields.len() != CHANNEL_COUNT {
            return Err(FrameError::FieldCount {
                expected: CHANNEL_COUNT,
                actual: fields.len(),
            });
        }

        let mut values = [0.0; CHANNEL_COUNT];
        for (index, (slot, field)) in values.iter_mut().zip(&fields).enumerate() {
            let field = field.trim();
            if field.is_empty() {
                return Err(FrameError::EmptyField { index });
            }
            *slot = field.parse::<f64>().map_err(|_| FrameError::NonNumeric {
                index,
                value: field.to_string(),
            })?;
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_valid_frame() {
        let now = Utc::now();
        let sample = FrameParser::parse_at(b"0.12,-0.5,9.81,1.5,-2.25,0.0,31.4\r\n", now).unwrap();
        assert_eq!(sample.values, [0.12, -0.5, 9.81, 1.5, -2.25, 0.0, 31.4]);
        assert_eq!(sample.captured_at, now);
        assert_eq!(sample.get(Channel::Temp), 31.4);
    }

    #[test]
    fn test_parse_tolerates_field_whitespace() {
        let values = FrameParser::parse_values(b"  1, 2 ,3,4,5,6, 7  ").unwrap();
        assert_eq!(values, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_reject_wrong_field_count() {
        assert_eq!(
            FrameParser::parse_values(b"1,2,3,4,5,6"),
            Err(FrameError::FieldCount {
                expected: 7,
                actual: 6
            })
        );
        assert_eq!(
            FrameParser::parse_values(b"1,2,3,4,5,6,7,8"),
            Err(FrameError::FieldCount {
                expected: 7,
                actual: 8
            })
        );
    }

    #[test]
    fn test_reject_empty_and_non_numeric() {
        assert_eq!(
            FrameParser::parse_values(b"1,2,,4,5,6,7"),
            Err(FrameError::EmptyField { index: 2 })
        );
        assert_eq!(
            FrameParser::parse_values(b"1,2,3,4,5,6,   "),
            Err(FrameError::EmptyField { index: 6 })
        );
        assert_eq!(
            FrameParser::parse_values(b"1,2,3,abc,5,6,7"),
            Err(FrameError::NonNumeric {
                index: 3,
                value: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_reject_invalid_utf8() {
        let err = FrameParser::parse_values(b"1,2,\xff\xfe,4,5,6,7").unwrap_err();
        assert!(err.is_decode());
        assert!(!err.is_malformed());
    }

    #[test]
    fn test_empty_line_is_malformed() {
        let err = FrameParser::parse_values(b"").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_channel_names_round_trip() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_name(channel.name()), Some(channel));
        }
        assert_eq!(Channel::from_name("time"), None);
    }
}
