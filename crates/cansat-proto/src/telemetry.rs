use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Duration, PrimitiveDateTime};

/// Shown for a numeric field that has never been received.
pub const UNAVAILABLE: &str = "unavailable";
/// Shown for the location field before any fix arrives.
pub const NO_SIGNAL: &str = "signal not available";

/// Fixed wall-clock offset from the on-board clock (GMT) to local time (PKT).
/// Not timezone-database aware.
pub const DERIVED_OFFSET: Duration = Duration::hours(5);

/// One JSON line as sent by the CanSat. Every key is optional and unknown
/// keys are ignored; `null` counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub yaw: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub altitude: Option<f64>,
    pub location: Option<String>,
    /// `MM/DD/YYYY`
    pub date: Option<String>,
    /// `HH:MM:SS.ffffff`
    pub time: Option<String>,
}

/// Last known value of every telemetry field for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub yaw: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub altitude: Option<f64>,
    pub location: Option<String>,
    timestamp_primary: Option<PrimitiveDateTime>,
    timestamp_derived: Option<PrimitiveDateTime>,
}

impl TelemetrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the scalar fields present in `rec`; absent ones are kept.
    /// Timestamps are handled separately by the decoder.
    pub fn merge_scalars(&mut self, rec: &TelemetryRecord) {
        fn keep(dst: &mut Option<f64>, src: Option<f64>) {
            if let Some(v) = src {
                *dst = Some(v);
            }
        }
        keep(&mut self.yaw, rec.yaw);
        keep(&mut self.pitch, rec.pitch);
        keep(&mut self.roll, rec.roll);
        keep(&mut self.temperature, rec.temperature);
        keep(&mut self.pressure, rec.pressure);
        keep(&mut self.altitude, rec.altitude);
        if let Some(loc) = &rec.location {
            self.location = Some(loc.clone());
        }
    }

    /// Sets the primary (GMT) timestamp and recomputes the derived (PKT) one.
    /// This is the only way either timestamp changes. Returns false (and
    /// leaves both untouched) if the offset would leave the supported range.
    pub fn set_timestamp(&mut self, primary: PrimitiveDateTime) -> bool {
        let Some(derived) = primary.checked_add(DERIVED_OFFSET) else {
            return false;
        };
        self.timestamp_primary = Some(primary);
        self.timestamp_derived = Some(derived);
        true
    }

    pub fn timestamp_primary(&self) -> Option<PrimitiveDateTime> {
        self.timestamp_primary
    }

    pub fn timestamp_derived(&self) -> Option<PrimitiveDateTime> {
        self.timestamp_derived
    }

    /// Label/value pairs in display order, with sentinels for missing data.
    pub fn labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Yaw", num(self.yaw)),
            ("Pitch", num(self.pitch)),
            ("Roll", num(self.roll)),
            ("Temperature", num(self.temperature)),
            ("Pressure", num(self.pressure)),
            ("Altitude", num(self.altitude)),
            ("Location", self.location.clone().unwrap_or_else(|| NO_SIGNAL.to_string())),
            ("Time (GMT)", stamp(self.timestamp_primary)),
            ("Time (PKT)", stamp(self.timestamp_derived)),
        ]
    }
}

fn num(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| UNAVAILABLE.to_string())
}

fn stamp(ts: Option<PrimitiveDateTime>) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");
    ts.and_then(|t| t.format(fmt).ok())
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}
