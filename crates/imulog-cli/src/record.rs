//! Interactive capture session
//!
//! The ingestion loop runs on a blocking worker; this task owns the operator
//! side: stdin commands, the live status line and background exports.

use anyhow::{Context, Result};
use imulog_core::config::Config;
use imulog_core::datalog::{
    ExportError, RecordOutcome, RecordingController, RecordingState, SealedSession,
    SessionExporter,
};
use imulog_core::demo::{DemoLink, DEFAULT_DEMO_RATE_HZ};
use imulog_core::frame::Channel;
use imulog_core::history::RollingBufferSet;
use imulog_core::ingest::{BufferUpdate, IngestStats, IngestionLoop, StatsSnapshot};
use imulog_core::protocol::{Link, LinkError, SerialLink};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};

use crate::cli::RecordArgs;
use crate::commands::{OperatorCommand, HELP};

const DEFAULT_STATUS_INTERVAL_MS: u64 = 1000;

/// Where sessions that could not be exported are written at exit
const RESCUE_DIR: &str = ".";

type ExportResult = (SealedSession, Result<PathBuf, ExportError>);

/// Background exports and sessions waiting for a retry
struct Exports {
    exporter: SessionExporter,
    running: JoinSet<ExportResult>,
    failed: Vec<(SealedSession, ExportError)>,
}

impl Exports {
    fn new(exporter: SessionExporter) -> Self {
        Self {
            exporter,
            running: JoinSet::new(),
            failed: Vec::new(),
        }
    }

    fn spawn(&mut self, session: SealedSession) {
        let exporter = self.exporter.clone();
        self.running.spawn_blocking(move || {
            let result = exporter.export(&session);
            (session, result)
        });
    }

    /// Re-export failed sessions; ones rejected for their name take `current_name`
    fn retry(&mut self, current_name: &str) -> usize {
        let failed = std::mem::take(&mut self.failed);
        let count = failed.len();
        for (mut session, error) in failed {
            if matches!(error, ExportError::InvalidName(_)) {
                session.name = current_name.to_string();
            }
            self.spawn(session);
        }
        count
    }

    fn report(&mut self, joined: Result<ExportResult, JoinError>) {
        match joined {
            Ok((session, Ok(path))) => {
                println!(
                    "saved '{}' ({} samples) to {}",
                    session.name,
                    session.len(),
                    path.display()
                );
            }
            Ok((session, Err(error))) => {
                eprintln!(
                    "EXPORT FAILED for '{}' ({} samples): {}",
                    session.name,
                    session.len(),
                    error
                );
                eprintln!("  data is kept; type 'retry' to try again");
                tracing::warn!("Export of '{}' failed: {}", session.name, error);
                self.failed.push((session, error));
            }
            Err(e) => tracing::error!("Export task failed: {}", e),
        }
    }

    async fn drain(&mut self) {
        while let Some(joined) = self.running.join_next().await {
            self.report(joined);
        }
    }
}

enum Event {
    Input(std::io::Result<Option<String>>),
    Exported(Result<ExportResult, JoinError>),
    IngestEnded(Result<Result<StatsSnapshot, LinkError>, JoinError>),
    Interrupt,
    Tick,
}

fn open_link(args: &RecordArgs, config: &Config) -> Result<Box<dyn Link>> {
    if args.demo {
        let link = DemoLink::new(args.demo_rate.unwrap_or(DEFAULT_DEMO_RATE_HZ))
            .with_corruption(args.demo_corruption.unwrap_or(0.0));
        return Ok(Box::new(link));
    }

    let link = SerialLink::open(&config.port, config.baud_rate).with_context(|| {
        format!(
            "Cannot open IMU link on {} (see `imulog ports`, or use --demo)",
            config.port
        )
    })?;
    Ok(Box::new(link))
}

/// Run an interactive capture until the operator quits
pub async fn execute(args: RecordArgs, config: Config) -> Result<()> {
    let link = open_link(&args, &config)?;
    let link_name = link.describe();

    let buffers = Arc::new(RollingBufferSet::new(config.history_capacity));
    let recorder = Arc::new(RecordingController::new(config.session_name.clone()));
    let mut exports = Exports::new(SessionExporter::new(config.output_dir.clone()));

    let ingest = IngestionLoop::new(link, buffers, recorder.clone(), &config);
    let stats = ingest.stats();
    let mut updates = ingest.subscribe();

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut ingest_task = {
        let shutdown = shutdown.clone();
        tokio::task::spawn_blocking(move || ingest.run(shutdown))
    };
    let mut ingest_finished = false;

    let status_ms = args
        .status_interval_ms
        .unwrap_or(DEFAULT_STATUS_INTERVAL_MS);
    let mut status_tick = tokio::time::interval(Duration::from_millis(status_ms.max(1)));

    println!("capturing from {}; exports go to {}", link_name, config.output_dir.display());
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let event = tokio::select! {
            line = lines.next_line() => Event::Input(line),
            Some(joined) = exports.running.join_next(), if !exports.running.is_empty() => {
                Event::Exported(joined)
            }
            result = &mut ingest_task, if !ingest_finished => Event::IngestEnded(result),
            _ = tokio::signal::ctrl_c() => Event::Interrupt,
            _ = status_tick.tick(), if status_ms > 0 => Event::Tick,
        };

        match event {
            Event::Input(Ok(Some(line))) => {
                let command = match line.parse::<OperatorCommand>() {
                    Ok(command) => command,
                    Err(message) => {
                        if !message.is_empty() {
                            eprintln!("{}", message);
                        }
                        continue;
                    }
                };
                if command == OperatorCommand::Quit {
                    break;
                }
                handle_command(command, &recorder, &mut exports, &stats);
            }
            Event::Input(Ok(None)) => {
                tracing::info!("stdin closed, stopping");
                break;
            }
            Event::Input(Err(e)) => {
                tracing::error!("Failed to read operator input: {}", e);
                break;
            }
            Event::Exported(joined) => exports.report(joined),
            Event::IngestEnded(result) => {
                ingest_finished = true;
                report_ingest_end(result);
                break;
            }
            Event::Interrupt => {
                println!();
                tracing::info!("Interrupted, stopping");
                break;
            }
            Event::Tick => print_live(&mut updates, &recorder, &stats),
        }
    }

    shutdown.store(true, Ordering::Release);
    if !ingest_finished {
        report_ingest_end(ingest_task.await);
    }

    finish_exports(&recorder, &mut exports, Path::new(RESCUE_DIR)).await;

    let totals = stats.snapshot();
    println!(
        "frames: {} accepted, {} decode errors, {} malformed",
        totals.frames_accepted, totals.decode_errors, totals.malformed_frames
    );
    Ok(())
}

fn handle_command(
    command: OperatorCommand,
    recorder: &RecordingController,
    exports: &mut Exports,
    stats: &IngestStats,
) {
    match command {
        OperatorCommand::ToggleRecord => match recorder.toggle_record() {
            RecordOutcome::Started => {
                println!("recording as '{}'", recorder.session_name());
            }
            RecordOutcome::Stopped(session) => {
                println!("stopped: {} samples, saving...", session.len());
                exports.spawn(session);
            }
        },
        OperatorCommand::TogglePause => match recorder.toggle_pause() {
            RecordingState::Paused => println!("paused"),
            RecordingState::Recording => println!("resumed"),
            RecordingState::Idle => println!("not recording"),
        },
        OperatorCommand::SetName(name) => {
            recorder.set_session_name(name);
            println!("session name: '{}'", recorder.session_name());
        }
        OperatorCommand::Status => {
            let totals = stats.snapshot();
            let captured = recorder
                .captured_len()
                .map(|n| format!(" ({} samples)", n))
                .unwrap_or_default();
            println!(
                "state: {:?}{} | name: '{}' | failed exports: {}",
                recorder.state(),
                captured,
                recorder.session_name(),
                exports.failed.len()
            );
            println!(
                "frames: {} ok, {} decode, {} malformed",
                totals.frames_accepted, totals.decode_errors, totals.malformed_frames
            );
        }
        OperatorCommand::Retry => {
            let count = exports.retry(&recorder.session_name());
            println!("retrying {} export(s)", count);
        }
        OperatorCommand::Help => println!("{}", HELP),
        OperatorCommand::Quit => {}
    }
}

fn report_ingest_end(result: Result<Result<StatsSnapshot, LinkError>, JoinError>) {
    match result {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => eprintln!("link lost: {}", e),
        Err(e) => tracing::error!("Ingestion worker failed: {}", e),
    }
}

/// Export the in-flight session, wait for every export, then rescue failures
///
/// Returns the rescue files written.
async fn finish_exports(
    recorder: &RecordingController,
    exports: &mut Exports,
    rescue_dir: &Path,
) -> Vec<PathBuf> {
    if let Some(session) = recorder.finish() {
        println!("saving in-flight session '{}' ({} samples)", session.name, session.len());
        exports.spawn(session);
    }
    exports.drain().await;
    rescue_failed(exports, rescue_dir)
}

/// Write sessions that still failed to `dir`, one new file each
fn rescue_failed(exports: &mut Exports, dir: &Path) -> Vec<PathBuf> {
    let rescue = SessionExporter::new(dir);
    let mut written = Vec::new();
    for (mut session, error) in exports.failed.drain(..) {
        let stamp = session.sealed_at.format("%Y%m%d-%H%M%S").to_string();
        let original = std::mem::replace(&mut session.name, unused_rescue_name(&rescue, &stamp));
        match rescue.export(&session) {
            Ok(path) => {
                println!("'{}' could not be saved ({})", original, error);
                println!("  written to {} instead", path.display());
                written.push(path);
            }
            Err(e) => eprintln!(
                "'{}' ({} samples) LOST: {} / {}",
                original,
                session.len(),
                error,
                e
            ),
        }
    }
    written
}

/// First `imulog-rescue-<stamp>-<n>` whose file does not exist yet
fn unused_rescue_name(rescue: &SessionExporter, stamp: &str) -> String {
    let mut n = 1;
    loop {
        let name = format!("imulog-rescue-{}-{}", stamp, n);
        match rescue.destination(&name) {
            Ok(path) if path.exists() => n += 1,
            _ => return name,
        }
    }
}

/// Render the latest sample as a one-line live view
fn print_live(
    updates: &mut watch::Receiver<BufferUpdate>,
    recorder: &RecordingController,
    stats: &IngestStats,
) {
    if !updates.has_changed().unwrap_or(false) {
        return;
    }
    let update = updates.borrow_and_update();
    let Some(sample) = update.latest else {
        return;
    };

    let marker = match recorder.state() {
        RecordingState::Idle => "    ".to_string(),
        RecordingState::Recording => format!("REC {}", recorder.captured_len().unwrap_or(0)),
        RecordingState::Paused => format!("PAU {}", recorder.captured_len().unwrap_or(0)),
    };
    let rejected = stats.snapshot().rejected();
    println!(
        "[{}] acc {:7.2} {:7.2} {:7.2} | gyro {:7.2} {:7.2} {:7.2} | temp {:5.1} | hist {} rej {}",
        marker,
        sample.get(Channel::AccX),
        sample.get(Channel::AccY),
        sample.get(Channel::AccZ),
        sample.get(Channel::GyroX),
        sample.get(Channel::GyroY),
        sample.get(Channel::GyroZ),
        sample.get(Channel::Temp),
        update.snapshot.len(),
        rejected
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use imulog_core::datalog::read_csv;
    use imulog_core::frame::FrameParser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(recorder: &RecordingController, rows: usize) {
        for i in 0..rows {
            let line = format!("{},0,9.81,0,0,0,25", i);
            recorder.on_sample(&FrameParser::parse(line.as_bytes()).unwrap());
        }
    }

    fn sealed(name: &str, rows: usize) -> SealedSession {
        let recorder = RecordingController::new(name);
        recorder.toggle_record();
        record(&recorder, rows);
        match recorder.toggle_record() {
            RecordOutcome::Stopped(session) => session,
            RecordOutcome::Started => panic!("Expected a sealed session"),
        }
    }

    /// A path that exists as a file, so creating it as a directory fails
    fn unwritable(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("blocker");
        std::fs::write(&path, "").unwrap();
        path
    }

    #[tokio::test]
    async fn test_failed_export_is_kept_for_retry() {
        let dir = TempDir::new().unwrap();
        let mut exports = Exports::new(SessionExporter::new(unwritable(&dir)));

        exports.spawn(sealed("run", 3));
        exports.drain().await;
        assert_eq!(exports.failed.len(), 1);
        assert!(matches!(exports.failed[0].1, ExportError::CreateDir { .. }));

        exports.exporter = SessionExporter::new(dir.path().join("out"));
        assert_eq!(exports.retry("other"), 1);
        exports.drain().await;

        assert!(exports.failed.is_empty());
        let saved = read_csv(dir.path().join("out").join("run.csv")).unwrap();
        assert_eq!(saved.len(), 3);
    }

    #[tokio::test]
    async fn test_retry_renames_session_with_invalid_name() {
        let dir = TempDir::new().unwrap();
        let mut exports = Exports::new(SessionExporter::new(dir.path()));

        exports.spawn(sealed("../escape", 2));
        exports.drain().await;
        assert!(matches!(exports.failed[0].1, ExportError::InvalidName(_)));

        assert_eq!(exports.retry("bench"), 1);
        exports.drain().await;

        assert!(exports.failed.is_empty());
        assert_eq!(read_csv(dir.path().join("bench.csv")).unwrap().len(), 2);
    }

    #[test]
    fn test_rescue_files_never_overwrite_each_other() {
        let dir = TempDir::new().unwrap();
        let mut exports = Exports::new(SessionExporter::new(unwritable(&dir)));

        let first = sealed("a", 3);
        let mut second = first.clone();
        second.name = "b".to_string();
        second.samples.truncate(1);
        assert_eq!(first.sealed_at, second.sealed_at);
        exports
            .failed
            .push((first, ExportError::InvalidName("a".to_string())));
        exports
            .failed
            .push((second, ExportError::InvalidName("b".to_string())));

        let written = rescue_failed(&mut exports, dir.path());

        assert_eq!(written.len(), 2);
        assert_ne!(written[0], written[1]);
        assert_eq!(read_csv(&written[0]).unwrap().len(), 3);
        assert_eq!(read_csv(&written[1]).unwrap().len(), 1);
        assert!(exports.failed.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_exports_in_flight_session() {
        let dir = TempDir::new().unwrap();
        let recorder = RecordingController::new("live");
        recorder.toggle_record();
        record(&recorder, 2);
        recorder.toggle_pause();

        let mut exports = Exports::new(SessionExporter::new(dir.path().join("out")));
        let rescued = finish_exports(&recorder, &mut exports, dir.path()).await;

        assert!(rescued.is_empty());
        assert_eq!(recorder.state(), RecordingState::Idle);
        assert_eq!(read_csv(dir.path().join("out").join("live.csv")).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_rescues_after_in_flight_export_fails() {
        let dir = TempDir::new().unwrap();
        let recorder = RecordingController::new("live");
        recorder.toggle_record();
        record(&recorder, 2);

        let mut exports = Exports::new(SessionExporter::new(unwritable(&dir)));
        exports
            .failed
            .push((sealed("earlier", 1), ExportError::InvalidName("earlier".to_string())));

        let rescue_dir = dir.path().join("rescue");
        let rescued = finish_exports(&recorder, &mut exports, &rescue_dir).await;

        assert_eq!(rescued.len(), 2);
        assert_eq!(read_csv(&rescued[0]).unwrap().len(), 1);
        assert_eq!(read_csv(&rescued[1]).unwrap().len(), 2);
        assert!(exports.failed.is_empty());
    }
}
