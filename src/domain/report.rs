//! Report rows shared by the CSV attachment and the HTML body
//!
//! Both artifacts are rendered from the same `ReportTable`, so a row can never
//! say one thing in the attachment and another in the email.

use crate::domain::types::{DeviceEventSummary, DeviceMap, EventKind, EventRecord};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;

/// Placeholder for "no such event observed"
pub const MISSING_PLACEHOLDER: &str = "-";

/// Rendered in place of a timestamp that could not be parsed
pub const INVALID_TIME: &str = "Invalid Time";

/// Display format for local timestamps
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which rows the report carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLayout {
    /// One row per device: first enter, last exit
    #[default]
    Summary,
    /// One row per raw geofence event
    Events,
}

/// A single table cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Plain text that is not a timestamp
    Text(String),
    /// Successfully converted timestamp
    Present(String),
    /// Sentinel: no event observed
    Missing,
    /// Source timestamp could not be parsed
    Invalid,
}

impl Cell {
    pub fn as_str(&self) -> &str {
        match self {
            Cell::Text(s) | Cell::Present(s) => s,
            Cell::Missing => MISSING_PLACEHOLDER,
            Cell::Invalid => INVALID_TIME,
        }
    }

    /// Style class used by the HTML body
    pub fn css_class(&self) -> Option<&'static str> {
        match self {
            Cell::Text(_) => None,
            Cell::Present(_) => Some("present"),
            Cell::Missing => Some("missing"),
            Cell::Invalid => Some("invalid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub device_name: String,
    pub cells: Vec<Cell>,
    /// Raw exit events are highlighted in the events layout
    pub is_exit: bool,
}

impl ReportRow {
    /// True if any timestamp cell is the sentinel
    pub fn has_missing(&self) -> bool {
        self.cells.iter().any(|c| *c == Cell::Missing)
    }
}

/// Header plus rows, ready for rendering
#[derive(Debug, Clone)]
pub struct ReportTable {
    pub layout: ReportLayout,
    pub headers: Vec<String>,
    pub rows: Vec<ReportRow>,
    /// Distinct devices seen in the event set
    pub device_count: usize,
    /// Raw events fetched
    pub event_count: usize,
}

/// Convert an RFC 3339 timestamp into the report timezone.
/// Returns `Invalid Time` when the source cannot be parsed.
pub fn format_local_time(raw: &str, tz: Tz) -> String {
    match local_time_cell(raw, tz) {
        Cell::Present(s) => s,
        _ => INVALID_TIME.to_string(),
    }
}

fn local_time_cell(raw: &str, tz: Tz) -> Cell {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => Cell::Present(t.with_timezone(&tz).format(LOCAL_TIME_FORMAT).to_string()),
        Err(_) => Cell::Invalid,
    }
}

fn optional_time_cell(raw: Option<&str>, tz: Tz) -> Cell {
    match raw {
        Some(raw) => local_time_cell(raw, tz),
        None => Cell::Missing,
    }
}

impl ReportTable {
    /// One row per device summary, in summary order
    pub fn from_summaries(
        summaries: &[DeviceEventSummary],
        devices: &DeviceMap,
        event_count: usize,
        tz: Tz,
    ) -> Self {
        let headers = vec![
            "Device Name".to_string(),
            format!("First Enter ({})", tz.name()),
            format!("Last Exit ({})", tz.name()),
        ];

        let rows = summaries
            .iter()
            .map(|s| ReportRow {
                device_name: devices.name_of(s.device_id).to_string(),
                cells: vec![
                    optional_time_cell(s.first_enter.as_deref(), tz),
                    optional_time_cell(s.last_exit.as_deref(), tz),
                ],
                is_exit: false,
            })
            .collect();

        Self {
            layout: ReportLayout::Summary,
            headers,
            rows,
            device_count: summaries.len(),
            event_count,
        }
    }

    /// One row per raw event, in fetch order
    pub fn from_events(events: &[EventRecord], devices: &DeviceMap, tz: Tz) -> Self {
        let headers = vec![
            "Device Name".to_string(),
            "Event Time (UTC)".to_string(),
            format!("Event Time ({})", tz.name()),
            "Geofence Status".to_string(),
        ];

        let rows = events
            .iter()
            .map(|e| ReportRow {
                device_name: devices.name_of(e.device_id).to_string(),
                cells: vec![
                    Cell::Text(e.event_time.clone()),
                    local_time_cell(&e.event_time, tz),
                    Cell::Text(e.kind.as_str().to_string()),
                ],
                is_exit: e.kind == EventKind::Exit,
            })
            .collect();

        let mut seen: Vec<_> = events.iter().map(|e| e.device_id).collect();
        seen.sort_unstable();
        seen.dedup();

        Self {
            layout: ReportLayout::Events,
            headers,
            rows,
            device_count: seen.len(),
            event_count: events.len(),
        }
    }

    /// Build the table for the configured layout
    pub fn build(
        layout: ReportLayout,
        summaries: &[DeviceEventSummary],
        events: &[EventRecord],
        devices: &DeviceMap,
        tz: Tz,
    ) -> Self {
        match layout {
            ReportLayout::Summary => Self::from_summaries(summaries, devices, events.len(), tz),
            ReportLayout::Events => Self::from_events(events, devices, tz),
        }
    }
}
