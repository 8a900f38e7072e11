use cansat_proto::telemetry::TelemetrySnapshot;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::decoder;
use crate::error::{DecodeError, FrameError, TransportError};
use crate::framer::LineFramer;
use crate::history::TelemetryHistory;
use crate::source::{ChunkSource, Readout};

#[derive(Debug, Error)]
pub enum LineError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A line that was skipped or only partly applied.
#[derive(Debug)]
pub struct LineFailure {
    /// `None` when the bytes were not text.
    pub line: Option<String>,
    pub error: LineError,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    /// Complete non-blank lines seen.
    pub lines: usize,
    /// Lines whose fields reached the snapshot (including bad-timestamp ones).
    pub applied: usize,
    pub failures: Vec<LineFailure>,
}

#[derive(Debug)]
pub enum PollOutcome {
    Idle,
    Ingested(IngestReport),
    Closed,
}

/// Framer, snapshot and chart history for one serial session.
///
/// Readers on other tasks get copies of the snapshot through [`subscribe`];
/// only the session itself mutates it.
///
/// [`subscribe`]: IngestSession::subscribe
pub struct IngestSession {
    framer: LineFramer,
    snapshot: TelemetrySnapshot,
    history: TelemetryHistory,
    tx: watch::Sender<TelemetrySnapshot>,
}

impl IngestSession {
    pub fn new(history_capacity: usize) -> Self {
        let (tx, _rx) = watch::channel(TelemetrySnapshot::new());
        Self {
            framer: LineFramer::new(),
            snapshot: TelemetrySnapshot::new(),
            history: TelemetryHistory::new(history_capacity),
            tx,
        }
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn history(&self) -> &TelemetryHistory {
        &self.history
    }

    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.tx.subscribe()
    }

    /// Bytes of an unterminated record still held by the framer.
    pub fn pending_bytes(&self) -> usize {
        self.framer.buffered().len()
    }

    /// Run one chunk through framing and decoding. Per-line failures are
    /// logged and reported, never fatal.
    pub fn ingest(&mut self, chunk: &[u8]) -> IngestReport {
        let mut report = IngestReport::default();

        for item in self.framer.feed(chunk) {
            let line = match item {
                Ok(line) => line,
                Err(e) => {
                    warn!("ingest: {}", e);
                    report.failures.push(LineFailure { line: None, error: e.into() });
                    continue;
                }
            };
            report.lines += 1;
            debug!(target: "cansat::rx", "{}", line);

            match decoder::decode(&line, &mut self.snapshot) {
                Ok(()) => {
                    report.applied += 1;
                    self.history.record(&self.snapshot);
                }
                Err(e @ DecodeError::BadTimestamp { .. }) => {
                    warn!("ingest: {}; other fields applied", e);
                    report.applied += 1;
                    self.history.record(&self.snapshot);
                    report.failures.push(LineFailure { line: Some(line), error: e.into() });
                }
                Err(e) => {
                    warn!("ingest: skipping line: {}", e);
                    report.failures.push(LineFailure { line: Some(line), error: e.into() });
                }
            }
        }

        if report.applied > 0 {
            let snap = &self.snapshot;
            self.tx.send_if_modified(|cur| {
                if *cur == *snap {
                    return false;
                }
                *cur = snap.clone();
                true
            });
        }
        report
    }

    /// One scheduling tick: take what the source has right now and ingest it.
    pub async fn poll(&mut self, src: &mut ChunkSource) -> Result<PollOutcome, TransportError> {
        match src.read_available().await? {
            Readout::Idle => Ok(PollOutcome::Idle),
            Readout::Closed => Ok(PollOutcome::Closed),
            Readout::Data(chunk) => Ok(PollOutcome::Ingested(self.ingest(&chunk))),
        }
    }

    /// Session boundary: drop the partial line, forget every field.
    pub fn reset(&mut self) {
        if !self.framer.buffered().is_empty() {
            debug!("ingest: discarding {} buffered bytes", self.framer.buffered().len());
        }
        self.framer.reset();
        self.snapshot = TelemetrySnapshot::new();
        self.history.clear();
        self.tx.send_replace(self.snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_lines_across_chunks() {
        let mut s = IngestSession::new(10);
        let r = s.ingest(b"{\"temperature\": 20}\n{\"press");
        assert_eq!((r.lines, r.applied), (1, 1));
        assert_eq!(s.pending_bytes(), 7);
        let r = s.ingest(b"ure\": 1000}\n{\"temperature\": 21}\n");
        assert_eq!((r.lines, r.applied), (2, 2));
        assert_eq!(s.snapshot().temperature, Some(21.0));
        assert_eq!(s.snapshot().pressure, Some(1000.0));
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn failures_are_reported_and_skipped() {
        let mut s = IngestSession::new(10);
        let r = s.ingest(b"{not json\n\xff\n{\"yaw\": 3}\n{\"roll\": 1, \"date\": \"x\", \"time\": \"y\"}\n");
        assert_eq!(r.lines, 3);
        assert_eq!(r.applied, 2);
        assert_eq!(r.failures.len(), 3);
        assert!(matches!(r.failures[0].error, LineError::Decode(DecodeError::MalformedSyntax(_))));
        assert!(r.failures[1].line.is_none());
        assert!(matches!(r.failures[2].error, LineError::Decode(DecodeError::BadTimestamp { .. })));
        assert_eq!(s.snapshot().yaw, Some(3.0));
        assert_eq!(s.snapshot().roll, Some(1.0));
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn subscribers_see_updates() {
        let mut s = IngestSession::new(10);
        let mut rx = s.subscribe();
        assert!(!rx.has_changed().unwrap());

        s.ingest(b"{\"altitude\": 512.5}\n");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().altitude, Some(512.5));

        // same value again: nothing new to publish
        s.ingest(b"{\"altitude\": 512.5}\n");
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn reset_is_a_hard_session_boundary() {
        let mut s = IngestSession::new(10);
        s.ingest(b"{\"yaw\": 5}\n{\"pitch\":");
        let rx = s.subscribe();
        s.reset();
        assert_eq!(s.pending_bytes(), 0);
        assert_eq!(*s.snapshot(), TelemetrySnapshot::new());
        assert!(s.history().is_empty());
        assert_eq!(*rx.borrow(), TelemetrySnapshot::new());

        // the tail of the old partial record must not resurrect
        let r = s.ingest(b" 7}\n");
        assert_eq!(r.applied, 0);
        assert_eq!(s.snapshot().pitch, None);
    }

    #[tokio::test]
    async fn poll_drains_a_replay_file() {
        let path = std::env::temp_dir().join(format!("cansat-poll-{}.jsonl", std::process::id()));
        std::fs::write(
            &path,
            "{\"yaw\": 1.5}\n{\"date\": \"01/15/2024\", \"time\": \"10:00:00.000000\"}\n{\"location\": \"pad\"}\n",
        )
        .unwrap();

        let mut src = ChunkSource::replay(path.to_str().unwrap(), 5).await.unwrap();
        let mut s = IngestSession::new(10);
        let mut applied = 0;
        loop {
            match s.poll(&mut src).await.unwrap() {
                PollOutcome::Ingested(r) => applied += r.applied,
                PollOutcome::Idle => continue,
                PollOutcome::Closed => break,
            }
        }
        std::fs::remove_file(&path).ok();

        assert_eq!(applied, 3);
        assert_eq!(s.snapshot().yaw, Some(1.5));
        assert_eq!(s.snapshot().location.as_deref(), Some("pad"));
        assert_eq!(s.snapshot().labels()[8].1, "2024-01-15 15:00:00.000000");
    }
}
