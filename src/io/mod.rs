//! IO modules - external system interfaces
//!
//! - `fleet_api` - HTTP client for the fleet tracking API
//! - `csv_report` - CSV attachment writer
//! - `html_report` - HTML email body
//! - `mailer` - SMTP delivery (and a dry-run stand-in)

pub mod csv_report;
pub mod fleet_api;
pub mod html_report;
pub mod mailer;

// Re-export commonly used types
pub use csv_report::CsvReport;
pub use fleet_api::{Credentials, FleetApi, FleetClient, SessionToken};
pub use mailer::{Delivery, DryRunMailer, ReportMailer, SmtpMailer};
