//! Fleet API records and the per-device summary derived from them

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Newtype wrapper for device IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DeviceId(pub i64);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracked device as returned by `GET /api/devices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub name: String,
}

/// Kind of geofence crossing
///
/// Any other report type is kept with its wire name so it can still be shown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Enter,
    Exit,
    /// The server filter should never return these
    Other(String),
}

impl EventKind {
    /// Wire name, also used as the "Geofence Status" column
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Enter => "geofenceEnter",
            EventKind::Exit => "geofenceExit",
            EventKind::Other(name) => name,
        }
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "geofenceEnter" => EventKind::Enter,
            "geofenceExit" => EventKind::Exit,
            _ => EventKind::Other(name),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Null and absent both read as an empty string
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One geofence crossing as returned by `GET /api/reports/events`
///
/// `event_time` is kept as the raw wire string. It is parsed only when
/// rendered, so a malformed, null or missing value degrades to
/// `Invalid Time` instead of failing the whole fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, deserialize_with = "nullable_string")]
    pub event_time: String,
    pub device_id: DeviceId,
}

impl EventRecord {
    pub fn new(kind: EventKind, event_time: impl Into<String>, device_id: i64) -> Self {
        Self { kind, event_time: event_time.into(), device_id: DeviceId(device_id) }
    }
}

/// First enter / last exit of a single device over the report window
///
/// `None` is the "no such event observed" sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEventSummary {
    pub device_id: DeviceId,
    pub first_enter: Option<String>,
    pub last_exit: Option<String>,
}

impl DeviceEventSummary {
    pub fn new(device_id: DeviceId) -> Self {
        Self { device_id, first_enter: None, last_exit: None }
    }
}

/// Devices keyed by id
#[derive(Debug, Clone, Default)]
pub struct DeviceMap {
    devices: FxHashMap<DeviceId, Device>,
}

impl DeviceMap {
    /// Build the map from the device list. Duplicate ids overwrite silently,
    /// the last record in the list wins.
    pub fn from_devices(devices: Vec<Device>) -> Self {
        let mut map = FxHashMap::default();
        map.reserve(devices.len());
        for device in devices {
            map.insert(device.id, device);
        }
        Self { devices: map }
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    /// Display name for a device, empty when the id does not resolve
    pub fn name_of(&self, id: DeviceId) -> &str {
        self.devices.get(&id).map(|d| d.name.as_str()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
