//! Link errors

use thiserror::Error;

/// Errors that can occur on the sensor link
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Cannot open link {port}: {reason}")]
    Unavailable { port: String, reason: String },

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Link closed")]
    Closed,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
