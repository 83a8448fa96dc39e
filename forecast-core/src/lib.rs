//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The client for the asynchronous submit/poll forecast service
//! - Reconstruction of the hourly time series from raw results
//! - A caller-driven poll policy for job completion
//!
//! It is used by `forecast-cli`, but can also be reused by other binaries or services.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod poll;
pub mod series;

pub use client::{DEFAULT_BASE_URL, ForecastClient};
pub use config::Config;
pub use error::ForecastError;
pub use model::{
    ArrayConfiguration, ForecastRequest, ForecastResultPayload, ForecastRow, ForecastTable,
    JobStatus, Location, MountType, OutputField, QuantileSet, ResultSeries, SubmissionResult,
};
pub use poll::PollPolicy;
pub use series::{Reconstruction, reconstruct};
