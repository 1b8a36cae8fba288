//! Event reconciliation
//!
//! Reduces the raw geofence event stream to one summary per device:
//! - First enter: the first `Enter` in input order, never overwritten
//! - Last exit: the last `Exit` in input order, every exit overwrites
//!
//! "Last" means last in the order the API returned the events, not the
//! latest timestamp. The events endpoint returns them chronologically, which
//! is what makes the two coincide.

use crate::domain::types::{DeviceEventSummary, DeviceId, EventKind, EventRecord};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Summarize events per device. Output is in first-seen order of device ids.
pub fn reconcile(events: &[EventRecord]) -> Vec<DeviceEventSummary> {
    let mut summaries: Vec<DeviceEventSummary> = Vec::new();
    let mut index: FxHashMap<DeviceId, usize> = FxHashMap::default();

    for event in events {
        let slot = *index.entry(event.device_id).or_insert_with(|| {
            summaries.push(DeviceEventSummary::new(event.device_id));
            summaries.len() - 1
        });
        let summary = &mut summaries[slot];

        match &event.kind {
            EventKind::Enter => {
                if summary.first_enter.is_none() {
                    summary.first_enter = Some(event.event_time.clone());
                }
            }
            EventKind::Exit => {
                summary.last_exit = Some(event.event_time.clone());
            }
            EventKind::Other(kind) => {
                debug!(device_id = %event.device_id, kind = %kind, "reconcile_unknown_event_kind");
            }
        }
    }

    debug!(events = %events.len(), devices = %summaries.len(), "events_reconciled");
    summaries
}
