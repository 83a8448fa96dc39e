use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by the forecast client and the time-series
/// reconstruction. `Pending` is deliberately *not* in here: a pending
/// job is an expected intermediate state, reported through
/// [`crate::series::Reconstruction::Pending`].
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Network-level failure talking to the forecast service.
    #[error("request to forecast service failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered the result poll with a non-success status.
    #[error("forecast service returned status {status}: {body}")]
    Service { status: StatusCode, body: String },

    /// Submission came back non-200; retrieval must not proceed.
    #[error("submission failed with status {status}: {body}")]
    InvalidSubmission { status: StatusCode, body: String },

    /// Submission succeeded but the response carried no request id.
    #[error("submission response did not contain a RequestId: {body}")]
    MissingIdentifier { body: String },

    /// Terminal result with neither GHI nor POAI populated.
    #[error("result contains neither a GHI nor a POAI series")]
    NoOutputFields,

    /// Both series present but of different lengths.
    #[error("GHI and POAI series have different lengths ({ghi} vs {poai})")]
    MismatchedSeries { ghi: usize, poai: usize },

    /// A field required for a terminal result was absent.
    #[error("result payload is missing required field {0}")]
    MissingField(&'static str),

    /// Caller-side request validation failure, before any network I/O.
    #[error("invalid forecast request: {0}")]
    InvalidRequest(String),

    #[error("failed to parse forecast service response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The remote job reached the Failed terminal state.
    #[error("forecast job failed on the service side (status '{0}')")]
    JobFailed(String),

    /// Poll policy gave up while the job was still pending.
    #[error("forecast still pending after {0} poll attempts")]
    PollExhausted(u32),
}
