use cansat_proto::telemetry::{TelemetryRecord, TelemetrySnapshot};
use serde::de::Error as _;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::error::DecodeError;

/// Parse one JSON line and merge it into `snap`.
///
/// A line that is not a JSON object of the record shape leaves `snap`
/// untouched. A bad `date`/`time` pair still lets the other fields through.
pub fn decode(line: &str, snap: &mut TelemetrySnapshot) -> Result<(), DecodeError> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if !value.is_object() {
        return Err(serde_json::Error::custom("telemetry record must be a JSON object").into());
    }
    let rec: TelemetryRecord = serde_json::from_value(value)?;
    apply(&rec, snap)
}

/// Merge an already parsed record. Timestamps only move when both `date`
/// and `time` are present.
pub fn apply(rec: &TelemetryRecord, snap: &mut TelemetrySnapshot) -> Result<(), DecodeError> {
    snap.merge_scalars(rec);

    let (Some(date), Some(time)) = (&rec.date, &rec.time) else {
        return Ok(());
    };
    let raw = format!("{} {}", date, time);
    let primary = parse_timestamp(&raw).map_err(|e| DecodeError::BadTimestamp {
        raw: raw.clone(),
        reason: e.to_string(),
    })?;
    if !snap.set_timestamp(primary) {
        return Err(DecodeError::BadTimestamp { raw, reason: "offset leaves supported date range".into() });
    }
    Ok(())
}

/// `MM/DD/YYYY HH:MM:SS.ffffff`
pub fn parse_timestamp(raw: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    let fmt = format_description!("[month]/[day]/[year] [hour]:[minute]:[second].[subsecond]");
    PrimitiveDateTime::parse(raw, fmt)
}
