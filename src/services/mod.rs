//! Services - report logic
//!
//! - `time_window` - Local day boundaries in the report timezone
//! - `reconciler` - Raw events to per-device first enter / last exit
//! - `fetch_coordinator` - Authenticate, fetch devices and events concurrently, join
//! - `report_job` - End-to-end run: fetch, reconcile, render, deliver

pub mod fetch_coordinator;
pub mod reconciler;
pub mod report_job;
pub mod time_window;

// Re-export commonly used types
pub use fetch_coordinator::{FetchCoordinator, FetchedData};
pub use reconciler::reconcile;
pub use report_job::{JobReport, ReportJob};
pub use time_window::{TimeWindow, TimeWindowError};
