use std::collections::BTreeMap;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ForecastError;

/// Site the forecast is requested for.
#[derive(Debug, Clone)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

/// Mounting of the PV array, as the service understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountType {
    Fixed,
    SingleAxis,
}

impl MountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MountType::Fixed => "Fixed",
            MountType::SingleAxis => "SingleAxis",
        }
    }
}

impl std::fmt::Display for MountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MountType {
    type Error = ForecastError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "fixed" => Ok(MountType::Fixed),
            "singleaxis" | "single-axis" | "single_axis" => Ok(MountType::SingleAxis),
            _ => Err(ForecastError::InvalidRequest(format!(
                "Unknown mount type '{value}'. Supported: fixed, single-axis."
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayConfiguration {
    pub mount: MountType,
    pub tilt_degrees: f64,
    pub azimuth_degrees: f64,
}

/// Irradiance series the service can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputField {
    Ghi,
    Poai,
}

impl OutputField {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputField::Ghi => "GHI",
            OutputField::Poai => "POAI",
        }
    }

    pub const fn all() -> &'static [OutputField] {
        &[OutputField::Ghi, OutputField::Poai]
    }
}

impl std::fmt::Display for OutputField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OutputField {
    type Error = ForecastError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "ghi" => Ok(OutputField::Ghi),
            "poai" => Ok(OutputField::Poai),
            _ => Err(ForecastError::InvalidRequest(format!(
                "Unknown output field '{value}'. Supported: GHI, POAI."
            ))),
        }
    }
}

/// Parameters of one forecast job. Immutable once built; consumed by
/// [`crate::client::ForecastClient::submit`].
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub location: Location,
    /// First forecasted interval, truncated to the hour at construction.
    pub start_time: DateTime<Utc>,
    pub forecast_horizon_hours: u32,
    /// Strictly increasing, each in 0..=100.
    pub percentiles: Vec<u8>,
    pub array_configuration: ArrayConfiguration,
    pub output_fields: Vec<OutputField>,
}

impl ForecastRequest {
    /// Validates the parameters and truncates `start_time` to the hour.
    pub fn new(
        location: Location,
        start_time: DateTime<Utc>,
        forecast_horizon_hours: u32,
        percentiles: Vec<u8>,
        array_configuration: ArrayConfiguration,
        output_fields: Vec<OutputField>,
    ) -> Result<Self, ForecastError> {
        if forecast_horizon_hours == 0 {
            return Err(ForecastError::InvalidRequest(
                "forecast horizon must be at least 1 hour".into(),
            ));
        }

        if percentiles.is_empty() {
            return Err(ForecastError::InvalidRequest(
                "at least one percentile is required".into(),
            ));
        }
        for pair in percentiles.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ForecastError::InvalidRequest(format!(
                    "percentiles must be strictly increasing, got {} after {}",
                    pair[1], pair[0]
                )));
            }
        }
        if let Some(&out_of_range) = percentiles.iter().find(|&&p| p > 100) {
            return Err(ForecastError::InvalidRequest(format!(
                "percentiles must lie in 0..=100, got {out_of_range}"
            )));
        }

        if output_fields.is_empty() {
            return Err(ForecastError::InvalidRequest(
                "at least one output field (GHI, POAI) is required".into(),
            ));
        }

        let start_time = start_time
            .duration_trunc(TimeDelta::hours(1))
            .map_err(|e| ForecastError::InvalidRequest(format!("invalid start time: {e}")))?;

        Ok(Self {
            location,
            start_time,
            forecast_horizon_hours,
            percentiles,
            array_configuration,
            output_fields,
        })
    }

    pub fn wants(&self, field: OutputField) -> bool {
        self.output_fields.contains(&field)
    }
}

/// Outcome of a submission, kept verbatim for the caller to inspect.
///
/// The client does not judge the HTTP status at submission time;
/// [`crate::client::ForecastClient::retrieve`] does, before polling.
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    pub status: StatusCode,
    pub body: String,
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Job identifier assigned by the service, if the body carries one.
    pub fn request_id(&self) -> Option<String> {
        let body: Value = serde_json::from_str(&self.body).ok()?;
        body.get("RequestId").and_then(Value::as_str).map(str::to_owned)
    }
}

/// Remote job state as reported by the result endpoint.
///
/// `Pending` is non-terminal; `Complete` and `Failed` are terminal.
/// Anything else the service invents is preserved in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum JobStatus {
    Pending,
    Complete,
    Failed,
    Other(String),
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "pending" => JobStatus::Pending,
            "complete" => JobStatus::Complete,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Other(raw),
        }
    }
}

impl JobStatus {
    pub fn is_pending(&self) -> bool {
        *self == JobStatus::Pending
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Complete => "Complete",
            JobStatus::Failed => "Failed",
            JobStatus::Other(raw) => raw,
        }
    }
}

/// One per-interval record: percentile label (e.g. `"P50"`) to value.
pub type QuantileSet = BTreeMap<String, f64>;

/// Per-field series of the raw result. A field absent from the request
/// is absent here too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSeries {
    #[serde(rename = "GHI")]
    pub ghi: Option<Vec<QuantileSet>>,
    #[serde(rename = "POAI")]
    pub poai: Option<Vec<QuantileSet>>,
}

/// Raw retrieved result, typed at parse time.
///
/// Timestamps are optional because a still-pending job may omit them;
/// reconstruction requires them once the status is terminal.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResultPayload {
    #[serde(rename = "Status")]
    pub status: JobStatus,
    #[serde(rename = "StartTime")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "TimeGenerated")]
    pub time_generated: Option<DateTime<Utc>>,
    #[serde(rename = "Results", default)]
    pub results: ResultSeries,
}

/// One row of the reconstructed table.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRow {
    pub issue_time: DateTime<Utc>,
    pub interval_start: DateTime<Utc>,
    pub interval_end: DateTime<Utc>,
    /// Hours from issue time to interval start, rounded to 2 decimals.
    pub lead_time_hours: f64,
    pub ghi: Option<QuantileSet>,
    pub poai: Option<QuantileSet>,
}

/// Final artifact: one row per forecasted interval, in chronological
/// order (payload order, never re-sorted).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ForecastTable {
    pub rows: Vec<ForecastRow>,
}

impl ForecastTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn location() -> Location {
        Location { latitude: 33.45, longitude: -111.98, name: "Test Site".into() }
    }

    fn array() -> ArrayConfiguration {
        ArrayConfiguration { mount: MountType::Fixed, tilt_degrees: 30.0, azimuth_degrees: 180.0 }
    }

    fn request_with_percentiles(percentiles: Vec<u8>) -> Result<ForecastRequest, ForecastError> {
        ForecastRequest::new(
            location(),
            Utc.with_ymd_and_hms(2024, 2, 14, 9, 0, 0).unwrap(),
            24,
            percentiles,
            array(),
            vec![OutputField::Ghi],
        )
    }

    #[test]
    fn start_time_is_truncated_to_the_hour() {
        let req = ForecastRequest::new(
            location(),
            Utc.with_ymd_and_hms(2024, 2, 14, 9, 42, 17).unwrap(),
            24,
            vec![10, 50, 90],
            array(),
            vec![OutputField::Ghi, OutputField::Poai],
        )
        .expect("valid request");

        assert_eq!(req.start_time, Utc.with_ymd_and_hms(2024, 2, 14, 9, 0, 0).unwrap());
    }

    #[test]
    fn percentiles_must_be_strictly_increasing() {
        let err = request_with_percentiles(vec![10, 50, 50]).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));

        let err = request_with_percentiles(vec![90, 50]).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn percentiles_must_be_within_bounds() {
        let err = request_with_percentiles(vec![10, 101]).unwrap_err();
        assert!(err.to_string().contains("0..=100"));
    }

    #[test]
    fn percentiles_must_be_non_empty() {
        let err = request_with_percentiles(vec![]).unwrap_err();
        assert!(err.to_string().contains("at least one percentile"));
    }

    #[test]
    fn horizon_must_be_at_least_one_hour() {
        let err = ForecastRequest::new(
            location(),
            Utc.with_ymd_and_hms(2024, 2, 14, 9, 0, 0).unwrap(),
            0,
            vec![50],
            array(),
            vec![OutputField::Ghi],
        )
        .unwrap_err();
        assert!(err.to_string().contains("at least 1 hour"));
    }

    #[test]
    fn output_fields_must_be_non_empty() {
        let err = ForecastRequest::new(
            location(),
            Utc.with_ymd_and_hms(2024, 2, 14, 9, 0, 0).unwrap(),
            24,
            vec![50],
            array(),
            vec![],
        )
        .unwrap_err();
        assert!(err.to_string().contains("output field"));
    }

    #[test]
    fn request_id_extracted_from_submission_body() {
        let submission = SubmissionResult {
            status: StatusCode::OK,
            body: r#"{"RequestId":"abc-123","Status":"Pending"}"#.into(),
        };
        assert_eq!(submission.request_id(), Some("abc-123".to_string()));
    }

    #[test]
    fn request_id_absent_when_body_lacks_key() {
        let submission =
            SubmissionResult { status: StatusCode::OK, body: r#"{"Status":"Pending"}"#.into() };
        assert_eq!(submission.request_id(), None);
    }

    #[test]
    fn request_id_absent_when_body_is_not_json() {
        let submission =
            SubmissionResult { status: StatusCode::OK, body: "Internal Server Error".into() };
        assert_eq!(submission.request_id(), None);
    }

    #[test]
    fn job_status_parses_known_and_unknown_values() {
        assert_eq!(JobStatus::from("Pending".to_string()), JobStatus::Pending);
        assert_eq!(JobStatus::from("complete".to_string()), JobStatus::Complete);
        assert_eq!(JobStatus::from("FAILED".to_string()), JobStatus::Failed);
        assert_eq!(JobStatus::from("Queued".to_string()), JobStatus::Other("Queued".to_string()));
    }

    #[test]
    fn mount_type_round_trips_through_strings() {
        assert_eq!(MountType::try_from("fixed").unwrap(), MountType::Fixed);
        assert_eq!(MountType::try_from("single-axis").unwrap(), MountType::SingleAxis);
        assert_eq!(MountType::SingleAxis.as_str(), "SingleAxis");
        assert!(MountType::try_from("dual-axis").is_err());
    }

    #[test]
    fn result_payload_deserializes_with_missing_fields() {
        let payload: ForecastResultPayload =
            serde_json::from_str(r#"{"Status":"Pending"}"#).expect("pending payload");
        assert!(payload.status.is_pending());
        assert!(payload.start_time.is_none());
        assert!(payload.results.ghi.is_none());
        assert!(payload.results.poai.is_none());
    }
}
