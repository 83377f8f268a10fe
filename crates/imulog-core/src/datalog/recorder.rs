//! Session recorder
//!
//! State machine deciding, per incoming sample, whether it belongs to the
//! active session. Shared between the ingestion thread (`on_sample`) and the
//! operator (`toggle_record`, `toggle_pause`, `set_session_name`); every
//! mutation goes through the same lock.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{SealedSession, Session};
use crate::frame::Sample;

/// Default session name, as used for the export file stem
pub const DEFAULT_SESSION_NAME: &str = "data";

/// Recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingState {
    /// Not recording
    Idle,
    /// Appending samples to the active session
    Recording,
    /// Session retained but not appending
    Paused,
}

/// Result of a record toggle
#[derive(Debug)]
pub enum RecordOutcome {
    /// A fresh session was started
    Started,
    /// The active session was sealed and must be exported
    Stopped(SealedSession),
}

/// The active session lives inside the phase: it exists only while
/// Recording or Paused.
#[derive(Debug)]
enum Phase {
    Idle,
    Recording(Session),
    Paused(Session),
}

impl Phase {
    fn state(&self) -> RecordingState {
        match self {
            Phase::Idle => RecordingState::Idle,
            Phase::Recording(_) => RecordingState::Recording,
            Phase::Paused(_) => RecordingState::Paused,
        }
    }

    fn session(&self) -> Option<&Session> {
        match self {
            Phase::Idle => None,
            Phase::Recording(s) | Phase::Paused(s) => Some(s),
        }
    }
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    session_name: String,
}

/// Recording state machine with the active session
pub struct RecordingController {
    inner: Mutex<Inner>,
}

impl RecordingController {
    /// Create an idle recorder that will name sessions `session_name`
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                phase: Phase::Idle,
                session_name: session_name.into(),
            }),
        }
    }

    /// Current state
    pub fn state(&self) -> RecordingState {
        self.lock().phase.state()
    }

    /// Name the next sealed session will carry
    pub fn session_name(&self) -> String {
        self.lock().session_name.clone()
    }

    /// Change the session name; takes effect when the session is sealed
    pub fn set_session_name(&self, name: impl Into<String>) {
        let name = name.into();
        tracing::info!("Session name set to '{}'", name);
        self.lock().session_name = name;
    }

    /// Number of samples in the active session, if any
    pub fn captured_len(&self) -> Option<usize> {
        self.lock().phase.session().map(Session::len)
    }

    /// Start a fresh session when idle, otherwise seal the active one
    ///
    /// The sealed session is returned to the caller for export so the lock is
    /// never held during file I/O.
    pub fn toggle_record(&self) -> RecordOutcome {
        let mut inner = self.lock();
        match std::mem::replace(&mut inner.phase, Phase::Idle) {
            Phase::Idle => {
                inner.phase = Phase::Recording(Session::new(Utc::now()));
                tracing::info!("Recording started");
                RecordOutcome::Started
            }
            Phase::Recording(session) | Phase::Paused(session) => {
                let sealed = session.seal(inner.session_name.clone(), Utc::now());
                tracing::info!(
                    "Recording stopped: '{}' with {} samples",
                    sealed.name,
                    sealed.len()
                );
                RecordOutcome::Stopped(sealed)
            }
        }
    }

    /// Pause or resume the active session; no effect while idle
    pub fn toggle_pause(&self) -> RecordingState {
        let mut inner = self.lock();
        inner.phase = match std::mem::replace(&mut inner.phase, Phase::Idle) {
            Phase::Idle => {
                tracing::debug!("Pause ignored: not recording");
                Phase::Idle
            }
            Phase::Recording(session) => {
                tracing::info!("Recording paused after {} samples", session.len());
                Phase::Paused(session)
            }
            Phase::Paused(session) => {
                tracing::info!("Recording resumed");
                Phase::Recording(session)
            }
        };
        inner.phase.state()
    }

    /// Offer a sample to the active session; returns whether it was captured
    pub fn on_sample(&self, sample: &Sample) -> bool {
        match &mut self.lock().phase {
            Phase::Recording(session) => {
                session.push(*sample);
                true
            }
            Phase::Idle | Phase::Paused(_) => false,
        }
    }

    /// Seal the active session, if any, for a final export at shutdown
    pub fn finish(&self) -> Option<SealedSession> {
        let mut inner = self.lock();
        match std::mem::replace(&mut inner.phase, Phase::Idle) {
            Phase::Idle => None,
            Phase::Recording(session) | Phase::Paused(session) => {
                let sealed = session.seal(inner.session_name.clone(), Utc::now());
                tracing::info!(
                    "Sealing in-flight session '{}' with {} samples at shutdown",
                    sealed.name,
                    sealed.len()
                );
                Some(sealed)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RecordingController {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_NAME)
    }
}
