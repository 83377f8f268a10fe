//! Ingestion loop
//!
//! Drives the pipeline: polls the link, splits lines, parses frames and fans
//! accepted samples out to the rolling history and the recorder. Runs on its
//! own thread; the operator side only touches the shared history, recorder
//! and the update feed.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::Config;
use crate::datalog::RecordingController;
use crate::frame::{FrameError, FrameParser, Sample};
use crate::history::{BufferSnapshot, RollingBufferSet};
use crate::protocol::{LineSplitter, Link, LinkError};

/// Bytes requested from the link per poll
const READ_CHUNK: usize = 1024;

/// Diagnostic counters, shared with the operator side
#[derive(Debug, Default)]
pub struct IngestStats {
    frames_accepted: AtomicU64,
    decode_errors: AtomicU64,
    malformed_frames: AtomicU64,
    bytes_read: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Frames parsed into samples
    pub frames_accepted: u64,
    /// Lines that were not valid text
    pub decode_errors: u64,
    /// Lines rejected for field count, empty or non-numeric fields, or length
    pub malformed_frames: u64,
    /// Raw bytes read from the link
    pub bytes_read: u64,
}

impl StatsSnapshot {
    /// All rejected frames
    pub fn rejected(&self) -> u64 {
        self.decode_errors + self.malformed_frames
    }
}

impl IngestStats {
    /// Current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
        }
    }

    fn record_rejection(&self, error: &FrameError) {
        if error.is_decode() {
            self.decode_errors.fetch_add(1, Ordering::Relaxed);
        } else {
            self.malformed_frames.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Notification published after every accepted sample
#[derive(Debug, Clone, Default)]
pub struct BufferUpdate {
    /// Number of samples accepted so far
    pub sequence: u64,
    /// The sample that triggered this update
    pub latest: Option<Sample>,
    /// Rolling history including `latest`
    pub snapshot: BufferSnapshot,
}

/// What happened to one line
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Parsed; `captured` tells whether the recorder kept it
    Accepted {
        /// The sample was appended to the active session
        captured: bool,
    },
    /// Discarded
    Rejected(FrameError),
}

/// The ingestion driver
pub struct IngestionLoop<L: Link> {
    link: L,
    splitter: LineSplitter,
    read_buf: Vec<u8>,
    buffers: Arc<RollingBufferSet>,
    recorder: Arc<RecordingController>,
    stats: Arc<IngestStats>,
    updates: watch::Sender<BufferUpdate>,
    poll_interval: Duration,
    sequence: u64,
}

impl<L: Link> IngestionLoop<L> {
    /// Create a loop reading from `link` into the shared history and recorder
    pub fn new(
        link: L,
        buffers: Arc<RollingBufferSet>,
        recorder: Arc<RecordingController>,
        config: &Config,
    ) -> Self {
        let (updates, _) = watch::channel(BufferUpdate::default());
        Self {
            link,
            splitter: LineSplitter::new(config.max_line_len),
            read_buf: vec![0; READ_CHUNK],
            buffers,
            recorder,
            stats: Arc::new(IngestStats::default()),
            updates,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            sequence: 0,
        }
    }

    /// Shared diagnostic counters
    pub fn stats(&self) -> Arc<IngestStats> {
        self.stats.clone()
    }

    /// Subscribe to buffer updates
    pub fn subscribe(&self) -> watch::Receiver<BufferUpdate> {
        self.updates.subscribe()
    }

    /// Parse one line and fan the sample out on success
    pub fn handle_line(&mut self, line: &[u8]) -> FrameOutcome {
        match FrameParser::parse(line) {
            Ok(sample) => FrameOutcome::Accepted {
                captured: self.accept(sample),
            },
            Err(e) => {
                self.reject(&e, line);
                FrameOutcome::Rejected(e)
            }
        }
    }

    /// Poll the link once and process every complete line
    ///
    /// Returns the number of bytes read; 0 means no data was available.
    pub fn poll_once(&mut self) -> Result<usize, LinkError> {
        let n = self.link.poll(&mut self.read_buf)?;
        if n == 0 {
            return Ok(0);
        }
        self.stats.bytes_read.fetch_add(n as u64, Ordering::Relaxed);

        let mut lines = Vec::new();
        self.splitter
            .feed(&self.read_buf[..n], |line| lines.push(line.map(<[u8]>::to_vec)));

        for line in lines {
            match line {
                Ok(line) => {
                    self.handle_line(&line);
                }
                Err(e) => self.reject(&e, &[]),
            }
        }
        Ok(n)
    }

    /// Run until `shutdown` is set or the link fails
    pub fn run(mut self, shutdown: Arc<AtomicBool>) -> Result<StatsSnapshot, LinkError> {
        tracing::info!("Ingestion started on {}", self.link.describe());

        while !shutdown.load(Ordering::Acquire) {
            match self.poll_once() {
                Ok(0) => std::thread::sleep(self.poll_interval),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Link {} failed: {}", self.link.describe(), e);
                    return Err(e);
                }
            }
        }

        let stats = self.stats.snapshot();
        tracing::info!(
            "Ingestion stopped: {} accepted, {} decode errors, {} malformed",
            stats.frames_accepted,
            stats.decode_errors,
            stats.malformed_frames
        );
        Ok(stats)
    }

    fn accept(&mut self, sample: Sample) -> bool {
        self.buffers.append(&sample);
        let captured = self.recorder.on_sample(&sample);

        self.sequence += 1;
        self.stats.frames_accepted.fetch_add(1, Ordering::Relaxed);
        self.updates.send_replace(BufferUpdate {
            sequence: self.sequence,
            latest: Some(sample),
            snapshot: self.buffers.snapshot(),
        });
        captured
    }

    fn reject(&self, error: &FrameError, line: &[u8]) {
        self.stats.record_rejection(error);
        tracing::debug!(
            "Rejected frame ({}): {:?}",
            error,
            String::from_utf8_lossy(line)
        );
    }
}
