//! Error types for each stage of a report run
//!
//! Every error is terminal: nothing is retried, the run logs the error and
//! stops before delivery.

use crate::services::time_window::TimeWindowError;
use std::path::PathBuf;
use thiserror::Error;

/// Login against the session endpoint failed
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("session request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("login rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("session cookie '{cookie}' not present in login response")]
    MissingToken { cookie: String },
}

/// Cause of a single fetch branch failing
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Fetch coordinator failure
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),

    /// One or both concurrent branches failed. Partial data is discarded.
    #[error("{}", describe_branches(.devices, .events))]
    Branches { devices: Option<ApiError>, events: Option<ApiError> },
}

impl FetchError {
    /// Names of the branches that failed, for logging
    pub fn failed_branches(&self) -> Vec<&'static str> {
        match self {
            FetchError::Authentication(_) => vec!["authentication"],
            FetchError::Branches { devices, events } => {
                let mut names = Vec::new();
                if devices.is_some() {
                    names.push("devices");
                }
                if events.is_some() {
                    names.push("events");
                }
                names
            }
        }
    }
}

fn describe_branches(devices: &Option<ApiError>, events: &Option<ApiError>) -> String {
    match (devices, events) {
        (Some(d), Some(e)) => format!("device fetch failed: {d}; event fetch failed: {e}"),
        (Some(d), None) => format!("device fetch failed: {d}"),
        (None, Some(e)) => format!("event fetch failed: {e}"),
        (None, None) => "fetch failed".to_string(),
    }
}

/// Writing the CSV attachment failed
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Mail relay submission failed
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("invalid content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("smtp send failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("failed to write dry-run output {path}: {source}")]
    DryRun {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a whole report run, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("time window: {0}")]
    TimeWindow(#[from] TimeWindowError),

    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),

    #[error("render: {0}")]
    Render(#[from] RenderError),

    #[error("delivery: {0}")]
    Delivery(#[from] DeliveryError),
}

impl ReportError {
    pub fn stage(&self) -> &'static str {
        match self {
            ReportError::TimeWindow(_) => "time_window",
            ReportError::Fetch(_) => "fetch",
            ReportError::Render(_) => "render",
            ReportError::Delivery(_) => "delivery",
        }
    }
}
