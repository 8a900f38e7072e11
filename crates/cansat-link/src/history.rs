use std::collections::VecDeque;

use cansat_proto::telemetry::TelemetrySnapshot;

pub const DEFAULT_CAPACITY: usize = 500;

/// One point of the running chart series, taken after a record was applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySample {
    /// Sample counter, the chart's x axis.
    pub index: u64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub altitude: Option<f64>,
}

/// Bounded series of snapshots for plotting. Attitude plots as 0.0 until the
/// first value arrives; the environmental channels keep their gaps.
#[derive(Debug, Clone)]
pub struct TelemetryHistory {
    samples: VecDeque<HistorySample>,
    capacity: usize,
    next_index: u64,
}

impl TelemetryHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { samples: VecDeque::with_capacity(capacity.min(4096)), capacity, next_index: 0 }
    }

    pub fn record(&mut self, snap: &TelemetrySnapshot) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(HistorySample {
            index: self.next_index,
            yaw: snap.yaw.unwrap_or(0.0),
            pitch: snap.pitch.unwrap_or(0.0),
            roll: snap.roll.unwrap_or(0.0),
            temperature: snap.temperature,
            pressure: snap.pressure,
            altitude: snap.altitude,
        });
        self.next_index += 1;
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.next_index = 0;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistorySample> {
        self.samples.iter()
    }

    /// `(index, yaw, pitch, roll)` columns for the attitude plot.
    pub fn attitude(&self) -> Vec<(u64, f64, f64, f64)> {
        self.samples.iter().map(|s| (s.index, s.yaw, s.pitch, s.roll)).collect()
    }
}

impl Default for TelemetryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
