use std::time::{Duration, Instant};

use crate::ingest::IngestReport;

/// Link bookkeeping for status output; not part of the telemetry itself.
#[derive(Debug, Clone, Default)]
pub struct LinkStatus {
    pub connected: bool,
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub last_line: Option<Instant>,
    pub lines: u64,
    pub applied: u64,
    pub failures: u64,
}

impl LinkStatus {
    pub fn note(&mut self, report: &IngestReport) {
        if report.lines > 0 {
            self.last_line = Some(Instant::now());
        }
        self.lines += report.lines as u64;
        self.applied += report.applied as u64;
        self.failures += report.failures.len() as u64;
    }

    pub fn line_age(&self) -> Option<Duration> {
        self.last_line.map(|t| t.elapsed())
    }
}
