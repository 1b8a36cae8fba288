//! Report job - one end-to-end run
//!
//! time window → fetch (auth, devices ∥ events) → reconcile → CSV + HTML → deliver
//!
//! Any failure aborts the run before delivery. Nothing is retried.

use crate::domain::report::ReportTable;
use crate::infra::config::Config;
use crate::infra::error::ReportError;
use crate::io::csv_report::CsvReport;
use crate::io::fleet_api::FleetApi;
use crate::io::html_report::{self, HtmlReportContext};
use crate::io::mailer::{Delivery, ReportMailer};
use crate::services::fetch_coordinator::FetchCoordinator;
use crate::services::reconciler::reconcile;
use crate::services::time_window::{parse_timezone, TimeWindow};
use chrono::{DateTime, Datelike, Utc};
use std::path::PathBuf;
use tracing::info;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub devices: usize,
    pub events: usize,
    pub summaries: usize,
    pub rows: usize,
    pub attachment: PathBuf,
}

pub struct ReportJob<'a, A: FleetApi, M: ReportMailer> {
    config: &'a Config,
    api: &'a A,
    mailer: &'a M,
}

impl<'a, A: FleetApi, M: ReportMailer> ReportJob<'a, A, M> {
    pub fn new(config: &'a Config, api: &'a A, mailer: &'a M) -> Self {
        Self { config, api, mailer }
    }

    /// Run the whole pipeline for the day containing `now`
    pub async fn run(&self, now: DateTime<Utc>) -> Result<JobReport, ReportError> {
        let tz = parse_timezone(self.config.timezone())?;
        let window = TimeWindow::for_day(now, tz)?;
        info!(
            timezone = %tz,
            from = %window.from_param(),
            to = %window.to_param(),
            "report_window_resolved"
        );

        let data = FetchCoordinator::new(self.api).run(&self.config.credentials(), &window).await?;

        let summaries = reconcile(&data.events);
        let table = ReportTable::build(
            self.config.report_layout(),
            &summaries,
            &data.events,
            &data.devices,
            tz,
        );

        let csv = CsvReport::new(self.config.output_path());
        let rows = csv.write(&table)?;

        let local_now = now.with_timezone(&tz);
        let date = local_now.format("%A, %B %-d, %Y").to_string();
        let html_body = html_report::render(
            &table,
            &HtmlReportContext {
                title: self.config.report_title(),
                date: &date,
                organization: self.config.organization(),
                year: local_now.year(),
            },
        );

        let delivery = Delivery {
            subject: self.config.mail_subject().to_string(),
            html_body,
            attachment_path: csv.path().to_path_buf(),
        };
        self.mailer.send(&delivery).await?;

        let report = JobReport {
            devices: data.devices.len(),
            events: data.events.len(),
            summaries: summaries.len(),
            rows,
            attachment: delivery.attachment_path,
        };
        info!(
            devices = %report.devices,
            events = %report.events,
            summaries = %report.summaries,
            rows = %report.rows,
            "report_sent"
        );
        Ok(report)
    }
}
