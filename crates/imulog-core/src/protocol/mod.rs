//! Serial Link Communication
//!
//! Access to the byte stream the IMU writes its frames to. The link is
//! read-only: nothing is ever sent back to the device.

mod error;
mod lines;
pub mod serial;
mod stream;

pub use error::LinkError;
pub use lines::LineSplitter;
pub use serial::{list_ports, open_port, PortInfo};
pub use stream::{Link, ScriptedLink, SerialLink};

/// Default baud rate of the IMU link
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Read timeout applied to the serial port, in milliseconds
///
/// Reads are only issued when bytes are queued, so this bounds a read that
/// races with the driver rather than an idle wait.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10;

/// Default maximum length of a partial line before it is discarded
pub const DEFAULT_MAX_LINE_LEN: usize = 256;
