//! # imulog Core Library
//!
//! Core functionality for capturing IMU sensor streams from a serial link.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Frame parsing for comma-separated 7-channel IMU lines
//! - Bounded rolling history per channel for live display
//! - Recording sessions (record / pause / stop) with CSV export
//! - Serial link access and a simulated demo link
//! - Session playback for offline analysis
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use imulog_core::prelude::*;
//!
//! let config = Config::default();
//! let link = SerialLink::open(&config.port, config.baud_rate)?;
//! let buffers = Arc::new(RollingBufferSet::new(config.history_capacity));
//! let recorder = Arc::new(RecordingController::new(&config.session_name));
//!
//! let mut ingest = IngestionLoop::new(link, buffers.clone(), recorder.clone(), &config);
//! let updates = ingest.subscribe();
//! std::thread::spawn(move || ingest.run(shutdown));
//!
//! recorder.toggle_record();
//! ```

pub mod config;
pub mod datalog;
pub mod demo;
pub mod frame;
pub mod history;
pub mod ingest;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::datalog::{
        RecordOutcome, RecordingController, RecordingState, SealedSession, SessionExporter,
        SessionPlayer,
    };
    pub use crate::demo::DemoLink;
    pub use crate::frame::{Channel, FrameError, FrameParser, Sample};
    pub use crate::history::{BufferSnapshot, RollingBufferSet};
    pub use crate::ingest::{BufferUpdate, IngestStats, IngestionLoop};
    pub use crate::protocol::{Link, LinkError, SerialLink};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
