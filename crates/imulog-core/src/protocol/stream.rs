//! Link Streams
//!
//! The byte sources the ingestion loop polls: a real serial port and a
//! scripted in-memory link for tests.

use serialport::SerialPort;
use std::collections::VecDeque;
use std::io::{self, Read};

use super::{open_port, LinkError};

/// Abstraction for the byte source frames arrive on
pub trait Link: Send {
    /// Read whatever bytes are available into `buf`
    ///
    /// Returns `Ok(0)` when nothing is available; never waits for data.
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// Human-readable name for logs
    fn describe(&self) -> String;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        (**self).poll(buf)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Serial port wrapper implementing [`Link`]
pub struct SerialLink {
    name: String,
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Wrap an already opened port
    pub fn new(name: impl Into<String>, port: Box<dyn SerialPort>) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }

    /// Open `name` at `baud_rate` with 8N1 framing
    pub fn open(name: &str, baud_rate: u32) -> Result<Self, LinkError> {
        let port = open_port(name, baud_rate)?;
        Ok(Self::new(name, port))
    }
}

impl Link for SerialLink {
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let queued = self
            .port
            .bytes_to_read()
            .map_err(|e| LinkError::SerialError(e.to_string()))? as usize;
        if queued == 0 {
            return Ok(0);
        }

        let len = queued.min(buf.len());
        match self.port.read(&mut buf[..len]) {
            Ok(0) => Err(LinkError::Closed),
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(0)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(LinkError::IoError(e)),
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// In-memory link replaying pre-recorded chunks, one chunk per poll
///
/// An empty chunk simulates a poll with no data available. Once the script is
/// exhausted every poll returns `Ok(0)`, or [`LinkError::Closed`] if the link
/// was built with [`ScriptedLink::closing`].
#[derive(Debug, Default)]
pub struct ScriptedLink {
    chunks: VecDeque<Vec<u8>>,
    pending: Vec<u8>,
    close_when_done: bool,
}

impl ScriptedLink {
    /// Create a link yielding `chunks` in order
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            pending: Vec::new(),
            close_when_done: false,
        }
    }

    /// Report [`LinkError::Closed`] once all chunks are consumed
    pub fn closing(mut self) -> Self {
        self.close_when_done = true;
        self
    }

    /// Chunks not yet delivered
    pub fn remaining(&self) -> usize {
        self.chunks.len() + usize::from(!self.pending.is_empty())
    }
}

impl Link for ScriptedLink {
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        if self.pending.is_empty() {
            match self.chunks.pop_front() {
                Some(chunk) => self.pending = chunk,
                None if self.close_when_done => return Err(LinkError::Closed),
                None => return Ok(0),
            }
        }

        // A chunk larger than `buf` is delivered over several polls
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
