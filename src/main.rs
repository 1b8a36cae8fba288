//! Geofence report - daily geofence entry/exit report job
//!
//! Logs in to the fleet tracking API, fetches devices and today's geofence
//! events, reduces them to a per-device first enter / last exit summary, and
//! mails the result as an HTML body with a CSV attachment.
//!
//! Module structure:
//! - `domain/` - Devices, events, summaries and report rows
//! - `io/` - External interfaces (fleet API, CSV, HTML, SMTP)
//! - `services/` - Time window, reconciliation, fetch coordination, the job
//! - `infra/` - Configuration and errors

use clap::Parser;
use geofence_report::infra::{Config, ReportError};
use geofence_report::io::{DryRunMailer, FleetClient, ReportMailer, SmtpMailer};
use geofence_report::services::{JobReport, ReportJob};
use std::process::ExitCode;
use tracing::{error, info, Instrument};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Geofence report - one run per invocation, meant to be scheduled
#[derive(Parser, Debug)]
#[command(name = "geofence-report", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/report.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Render the report but write the HTML body to disk instead of mailing it
    #[arg(long)]
    dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_logging(json: bool) {
    // Default: INFO, use RUST_LOG=debug for per-request detail
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_job<M: ReportMailer>(
    config: &Config,
    api: &FleetClient,
    mailer: &M,
) -> anyhow::Result<JobReport> {
    let report = ReportJob::new(config, api, mailer).run(chrono::Utc::now()).await?;
    Ok(report)
}

async fn run(args: &Args) -> anyhow::Result<JobReport> {
    let config = Config::load(args.config.as_deref())?;

    info!(
        config_file = %config.config_file(),
        api = %config.api_base_url(),
        group_ids = ?config.api_group_ids(),
        timezone = %config.timezone(),
        layout = ?config.report_layout(),
        output = %config.output_path(),
        recipients = %config.mail_to().len(),
        cc = %config.mail_cc().len(),
        dry_run = %args.dry_run,
        "config_loaded"
    );

    let api = FleetClient::new(&config)?;

    if args.dry_run {
        run_job(&config, &api, &DryRunMailer).await
    } else {
        let mailer = SmtpMailer::new(&config)?;
        run_job(&config, &api, &mailer).await
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_json);

    let run_id = uuid::Uuid::now_v7();
    info!(
        version = %env!("CARGO_PKG_VERSION"),
        git = %env!("GIT_HASH"),
        run_id = %run_id,
        "geofence-report starting"
    );

    let span = tracing::info_span!("run", run_id = %run_id);
    match run(&args).instrument(span).await {
        Ok(report) => {
            info!(
                run_id = %run_id,
                rows = %report.rows,
                attachment = %report.attachment.display(),
                "geofence-report finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            // Pipeline failures carry their stage; anything else failed during setup
            match e.downcast_ref::<ReportError>() {
                Some(report_error) => error!(
                    run_id = %run_id,
                    stage = %report_error.stage(),
                    error = %report_error,
                    "report_failed"
                ),
                None => error!(run_id = %run_id, error = %format!("{e:#}"), "geofence-report aborted"),
            }
            ExitCode::FAILURE
        }
    }
}
