use chrono::SecondsFormat;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_CHARSET, CONTENT_TYPE};
use serde::Serialize;

use crate::error::ForecastError;
use crate::model::{ForecastRequest, ForecastResultPayload, OutputField, SubmissionResult};

/// Production endpoint; override via [`ForecastClient::with_base_url`]
/// for staging or tests.
pub const DEFAULT_BASE_URL: &str = "https://api.solaranywhere.com/v2";

const SUBMIT_PATH: &str = "/Forecast";
const RESULT_PATH: &str = "/ForecastResult";

const API_KEY_HEADER: &str = "X-Api-Key";

/// Client for the asynchronous submit/poll forecast service.
///
/// `submit` creates a job, `retrieve` takes one snapshot of its state.
/// Polling loops live in [`crate::poll`], not here: each call is a
/// single atomic network operation.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl ForecastClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), http: Client::new() }
    }

    /// Submits a forecast job.
    ///
    /// Creates a billable job on the remote service, so callers must not
    /// blindly re-submit on an ambiguous failure. The HTTP status is not
    /// judged here: status and body are returned verbatim, and
    /// [`retrieve`](Self::retrieve) rejects failed submissions.
    pub async fn submit(
        &self,
        request: &ForecastRequest,
    ) -> Result<SubmissionResult, ForecastError> {
        let url = format!("{}{}", self.base_url, SUBMIT_PATH);
        let body = SubmitBody::from(request);

        let res = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_CHARSET, "utf-8")
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        Ok(SubmissionResult { status, body })
    }

    /// Fetches one snapshot of a submitted job's result.
    ///
    /// Fails before any network I/O when the submission was not a
    /// success, or when its body carries no request id. The returned
    /// payload may still be pending; branching on that is
    /// [`crate::series::reconstruct`]'s job.
    pub async fn retrieve(
        &self,
        submission: &SubmissionResult,
    ) -> Result<ForecastResultPayload, ForecastError> {
        if !submission.is_success() {
            return Err(ForecastError::InvalidSubmission {
                status: submission.status,
                body: truncate_body(&submission.body),
            });
        }

        let request_id = submission
            .request_id()
            .ok_or_else(|| ForecastError::MissingIdentifier {
                body: truncate_body(&submission.body),
            })?;

        let url = format!("{}{}/{}", self.base_url, RESULT_PATH, request_id);

        let res = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_CHARSET, "utf-8")
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ForecastError::Service { status, body: truncate_body(&body) });
        }

        let payload: ForecastResultPayload = serde_json::from_str(&body)?;
        Ok(payload)
    }
}

/// Wire shape of the submission body. Field names and nesting are part
/// of the external protocol.
#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "StartTime")]
    start_time: String,
    #[serde(rename = "ForecastHorizon_Hours")]
    forecast_horizon_hours: u32,
    #[serde(rename = "Percentiles")]
    percentiles: &'a [u8],
    #[serde(rename = "ArrayConfiguration")]
    array_configuration: ArrayBody,
    #[serde(rename = "OutputFields")]
    output_fields: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct ArrayBody {
    #[serde(rename = "Tracking")]
    tracking: &'static str,
    #[serde(rename = "Tilt_Degrees")]
    tilt_degrees: f64,
    #[serde(rename = "Azimuth_Degrees")]
    azimuth_degrees: f64,
}

impl<'a> From<&'a ForecastRequest> for SubmitBody<'a> {
    fn from(req: &'a ForecastRequest) -> Self {
        SubmitBody {
            latitude: req.location.latitude,
            longitude: req.location.longitude,
            name: &req.location.name,
            start_time: req.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            forecast_horizon_hours: req.forecast_horizon_hours,
            percentiles: &req.percentiles,
            array_configuration: ArrayBody {
                tracking: req.array_configuration.mount.as_str(),
                tilt_degrees: req.array_configuration.tilt_degrees,
                azimuth_degrees: req.array_configuration.azimuth_degrees,
            },
            output_fields: req.output_fields.iter().map(OutputField::as_str).collect(),
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        // Back off to a char boundary so multibyte text cannot panic.
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
