//! Domain models - fleet records and report rows
//!
//! - `types` - Devices, geofence events and per-device summaries
//! - `report` - Rows and cells shared by the CSV and HTML renderers

pub mod report;
pub mod types;

pub use report::{Cell, ReportLayout, ReportRow, ReportTable};
pub use types::{Device, DeviceEventSummary, DeviceId, DeviceMap, EventKind, EventRecord};
