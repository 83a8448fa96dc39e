//! Reconstruction of a regular hourly time series from the sparse
//! result payload.
//!
//! The service returns only a start instant, a generation instant and
//! bare value sequences; interval boundaries, issue time and lead time
//! are all derived here, deterministically.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::ForecastError;
use crate::model::{ForecastResultPayload, ForecastRow, ForecastTable, ResultSeries};

/// The remote model anchors its issue time this far before the first
/// forecasted interval.
const ISSUE_OFFSET_HOURS: i64 = 4;

/// Outcome of [`reconstruct`]: a still-running job is a normal state,
/// not an error, and the caller must branch on it before treating the
/// result as final.
#[derive(Debug, Clone)]
pub enum Reconstruction {
    /// Job not finished yet; re-poll after a delay.
    Pending,
    Table(ForecastTable),
}

impl Reconstruction {
    pub fn is_pending(&self) -> bool {
        matches!(self, Reconstruction::Pending)
    }

    /// Unwraps the table, mapping `Pending` to `None`.
    pub fn into_table(self) -> Option<ForecastTable> {
        match self {
            Reconstruction::Pending => None,
            Reconstruction::Table(table) => Some(table),
        }
    }
}

/// Authoritative issue time of a forecast.
///
/// The earlier of (start − 4 h) and the generation instant wins: the
/// forecast cannot have used information from after the API call, so
/// when the call happened before the model's own anchor, the call time
/// is the true bound.
pub fn issue_time(start_time: DateTime<Utc>, time_generated: DateTime<Utc>) -> DateTime<Utc> {
    let anchored = start_time - TimeDelta::hours(ISSUE_OFFSET_HOURS);
    anchored.min(time_generated)
}

/// Row count of the reconstructed table.
///
/// Driven by the present output fields: neither present is a protocol
/// violation, and two present series of different lengths are rejected
/// rather than padded.
pub fn num_intervals(results: &ResultSeries) -> Result<usize, ForecastError> {
    match (&results.ghi, &results.poai) {
        (None, None) => Err(ForecastError::NoOutputFields),
        (Some(ghi), Some(poai)) if ghi.len() != poai.len() => {
            Err(ForecastError::MismatchedSeries { ghi: ghi.len(), poai: poai.len() })
        }
        (Some(ghi), _) => Ok(ghi.len()),
        (None, Some(poai)) => Ok(poai.len()),
    }
}

/// Builds the aligned hourly table from a retrieved payload.
///
/// Every interval is exactly one hour wide and contiguous; the table
/// length is driven purely by the present output fields, with no
/// gap-filling or interpolation. Fields absent from the payload are
/// carried as `None` in every row.
pub fn reconstruct(payload: ForecastResultPayload) -> Result<Reconstruction, ForecastError> {
    if payload.status.is_pending() {
        return Ok(Reconstruction::Pending);
    }

    let start_time = payload.start_time.ok_or(ForecastError::MissingField("StartTime"))?;
    let time_generated =
        payload.time_generated.ok_or(ForecastError::MissingField("TimeGenerated"))?;

    let issued = issue_time(start_time, time_generated);
    let intervals = num_intervals(&payload.results)?;

    let ghi = payload.results.ghi;
    let poai = payload.results.poai;

    let mut rows = Vec::with_capacity(intervals);
    for i in 0..intervals {
        let interval_start = start_time + TimeDelta::hours(i as i64);
        let interval_end = interval_start + TimeDelta::hours(1);

        rows.push(ForecastRow {
            issue_time: issued,
            interval_start,
            interval_end,
            lead_time_hours: lead_time_hours(issued, interval_start),
            ghi: ghi.as_ref().and_then(|s| s.get(i).cloned()),
            poai: poai.as_ref().and_then(|s| s.get(i).cloned()),
        });
    }

    Ok(Reconstruction::Table(ForecastTable { rows }))
}

/// Hours between issue time and interval start, rounded to 2 decimals.
fn lead_time_hours(issued: DateTime<Utc>, interval_start: DateTime<Utc>) -> f64 {
    let hours = (interval_start - issued).num_milliseconds() as f64 / 3_600_000.0;
    (hours * 100.0).round() / 100.0
}
