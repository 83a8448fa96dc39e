use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use clap::{Parser, Subcommand};

use forecast_core::{
    ArrayConfiguration, Config, ForecastClient, ForecastRequest, ForecastTable, Location,
    MountType, OutputField, PollPolicy, QuantileSet,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Irradiance forecast CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the API credential (and optionally the base URL).
    Configure {
        /// Override the service base URL, e.g. for a staging endpoint.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Submit a forecast job, wait for completion and print the table.
    Run {
        #[arg(long)]
        latitude: f64,

        #[arg(long)]
        longitude: f64,

        /// Site name passed to the service.
        #[arg(long)]
        name: String,

        /// First forecasted interval (RFC 3339); defaults to the next full hour.
        #[arg(long)]
        start: Option<String>,

        /// Forecast horizon in hours.
        #[arg(long, default_value_t = 24)]
        horizon: u32,

        /// Comma-separated percentiles, strictly increasing.
        #[arg(long, default_value = "10,50,90")]
        percentiles: String,

        /// Mount type: fixed or single-axis.
        #[arg(long, default_value = "fixed")]
        tracking: String,

        #[arg(long, default_value_t = 30.0)]
        tilt: f64,

        #[arg(long, default_value_t = 180.0)]
        azimuth: f64,

        /// Comma-separated output fields out of: ghi, poai.
        #[arg(long, default_value = "ghi,poai")]
        fields: String,

        /// Maximum number of result polls before giving up.
        #[arg(long, default_value_t = 40)]
        poll_attempts: u32,

        /// Seconds to wait between result polls.
        #[arg(long, default_value_t = 15)]
        poll_delay: u64,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { base_url } => configure(base_url),
            Command::Run {
                latitude,
                longitude,
                name,
                start,
                horizon,
                percentiles,
                tracking,
                tilt,
                azimuth,
                fields,
                poll_attempts,
                poll_delay,
            } => {
                let request = build_request(
                    latitude, longitude, name, start, horizon, &percentiles, &tracking, tilt,
                    azimuth, &fields,
                )?;
                run_forecast(request, poll_attempts, poll_delay).await
            }
        }
    }
}

fn configure(base_url: Option<String>) -> Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(api_key);

    if base_url.is_some() {
        config.base_url = base_url;
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_request(
    latitude: f64,
    longitude: f64,
    name: String,
    start: Option<String>,
    horizon: u32,
    percentiles: &str,
    tracking: &str,
    tilt: f64,
    azimuth: f64,
    fields: &str,
) -> Result<ForecastRequest> {
    let start_time = match start {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .with_context(|| format!("Invalid start time '{raw}', expected RFC 3339"))?
            .with_timezone(&Utc),
        None => Utc::now().duration_trunc(TimeDelta::hours(1))? + TimeDelta::hours(1),
    };

    let percentiles = percentiles
        .split(',')
        .map(|p| p.trim().parse::<u8>().with_context(|| format!("Invalid percentile '{p}'")))
        .collect::<Result<Vec<_>>>()?;

    let output_fields = fields
        .split(',')
        .map(|f| OutputField::try_from(f.trim()).map_err(anyhow::Error::from))
        .collect::<Result<Vec<_>>>()?;

    let request = ForecastRequest::new(
        Location { latitude, longitude, name },
        start_time,
        horizon,
        percentiles,
        ArrayConfiguration {
            mount: MountType::try_from(tracking)?,
            tilt_degrees: tilt,
            azimuth_degrees: azimuth,
        },
        output_fields,
    )?;

    Ok(request)
}

async fn run_forecast(request: ForecastRequest, poll_attempts: u32, poll_delay: u64) -> Result<()> {
    let config = Config::load()?;
    let api_key = config.api_key()?.to_string();
    let client = ForecastClient::with_base_url(api_key, config.base_url().to_string());

    let submission = client.submit(&request).await?;
    match submission.request_id() {
        Some(id) => println!("Submitted forecast job {id} (status {})", submission.status),
        None => println!("Submitted forecast job (status {})", submission.status),
    }

    let policy = PollPolicy::new(poll_attempts, Duration::from_secs(poll_delay));
    let table = policy.run(&client, &submission).await?;

    print_table(&table);
    Ok(())
}

fn print_table(table: &ForecastTable) {
    if let Some(first) = table.rows.first() {
        println!("Issue time: {}", first.issue_time.format("%Y-%m-%d %H:%M UTC"));
    }

    for row in &table.rows {
        println!(
            "{} -> {}  lead {:>6.2} h  GHI [{}]  POAI [{}]",
            row.interval_start.format("%Y-%m-%d %H:%M"),
            row.interval_end.format("%H:%M"),
            row.lead_time_hours,
            format_quantiles(row.ghi.as_ref()),
            format_quantiles(row.poai.as_ref()),
        );
    }
}

fn format_quantiles(quantiles: Option<&QuantileSet>) -> String {
    match quantiles {
        None => "-".to_string(),
        Some(set) => set
            .iter()
            .map(|(label, value)| format!("{label}={value:.1}"))
            .collect::<Vec<_>>()
            .join(" "),
    }
}
