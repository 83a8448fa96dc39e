//! Caller-driven polling for job completion.
//!
//! `retrieve` is a single snapshot; this module layers the loop on top,
//! parameterized by max attempts and delay. Cancellation is simply
//! dropping the future.

use std::time::Duration;

use crate::client::ForecastClient;
use crate::error::ForecastError;
use crate::model::{ForecastTable, JobStatus, SubmissionResult};
use crate::series::{Reconstruction, reconstruct};

/// How long to wait between result snapshots while the job is pending.
///
/// Jobs of this class typically complete in ~15 seconds, so the default
/// polls at that cadence for up to 10 minutes.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { max_attempts: 40, delay: Duration::from_secs(15) }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Polls until the job reaches a terminal state or attempts run out.
    ///
    /// A `Failed` terminal status surfaces as [`ForecastError::JobFailed`];
    /// exhausting the attempts while still pending surfaces as
    /// [`ForecastError::PollExhausted`].
    pub async fn run(
        &self,
        client: &ForecastClient,
        submission: &SubmissionResult,
    ) -> Result<ForecastTable, ForecastError> {
        for attempt in 0..self.max_attempts {
            let payload = client.retrieve(submission).await?;

            if payload.status == JobStatus::Failed {
                return Err(ForecastError::JobFailed(payload.status.as_str().to_string()));
            }

            match reconstruct(payload)? {
                Reconstruction::Table(table) => return Ok(table),
                Reconstruction::Pending => {
                    if attempt + 1 < self.max_attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }

        Err(ForecastError::PollExhausted(self.max_attempts))
    }
}
