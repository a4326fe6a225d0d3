//! Domain types for location tracking.
//!
//! [`EntityRecord`] is transient and rebuilt from the cache every cycle.
//! [`LocationEntry`] and [`HistoryLog`] are what lands on disk.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Timestamps above this value are taken to be milliseconds.
pub const MILLIS_THRESHOLD: f64 = 1e12;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The configured name of the one entity whose history is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedName(pub String);

impl fmt::Display for TrackedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TrackedName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TrackedName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Extraction output
// ---------------------------------------------------------------------------

/// One trackable object surfaced by the location cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    /// Unix seconds or milliseconds, as the cache reported it.
    pub timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Map<String, Value>>,
}

impl EntityRecord {
    /// A record with a name and nothing else.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latitude: None,
            longitude: None,
            accuracy: None,
            timestamp: None,
            address: None,
        }
    }

    pub fn has_location(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Normalize a cache timestamp to unix seconds.
pub fn normalize_timestamp(raw: f64) -> f64 {
    if raw > MILLIS_THRESHOLD {
        raw / 1000.0
    } else {
        raw
    }
}

/// The matched entity's location, normalized but not yet stamped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationCandidate {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub timestamp: f64,
    pub address: Map<String, Value>,
}

impl LocationCandidate {
    /// Returns `None` when the entity is missing latitude or longitude.
    pub fn from_entity(entity: &EntityRecord) -> Option<Self> {
        let (latitude, longitude) = (entity.latitude?, entity.longitude?);
        Some(Self {
            latitude,
            longitude,
            accuracy: entity.accuracy,
            timestamp: normalize_timestamp(entity.timestamp.unwrap_or(0.0)),
            address: entity.address.clone().unwrap_or_default(),
        })
    }

    pub fn same_position(&self, entry: &LocationEntry) -> bool {
        self.latitude == entry.latitude && self.longitude == entry.longitude
    }

    pub fn into_entry(self, recorded_at: String) -> LocationEntry {
        LocationEntry {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            timestamp: self.timestamp,
            address: self.address,
            recorded_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted history
// ---------------------------------------------------------------------------

/// One recorded position. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Unix seconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: Map<String, Value>,
    /// ISO-8601 local time at which the entry was appended.
    pub recorded_at: String,
}

impl LocationEntry {
    /// `"City, State"` from the address, if either part is present.
    pub fn place_label(&self) -> Option<String> {
        place_label(&self.address)
    }
}

/// Older history files can carry an explicit `null` for optional fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Human-readable `locality, administrativeArea` pair from a cache address.
pub fn place_label(address: &Map<String, Value>) -> Option<String> {
    let part = |key: &str| {
        address
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    match (part("locality"), part("administrativeArea")) {
        (Some(city), Some(state)) => Some(format!("{city}, {state}")),
        (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
        (None, None) => None,
    }
}

/// Append-only location history for one tracked entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    /// Key name kept compatible with history files written before tagtrail.
    #[serde(rename = "airtag_name")]
    pub tracked_name: TrackedName,
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
}

impl HistoryLog {
    pub fn new(tracked_name: TrackedName) -> Self {
        Self {
            tracked_name,
            locations: Vec::new(),
        }
    }

    pub fn last(&self) -> Option<&LocationEntry> {
        self.locations.last()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tracked_name_display() {
        assert_eq!(TrackedName::from("LYRIQ").to_string(), "LYRIQ");
    }

    #[test]
    fn millisecond_timestamps_are_scaled_down() {
        assert_eq!(normalize_timestamp(1_715_000_000_000.0), 1_715_000_000.0);
        assert_eq!(normalize_timestamp(1_715_000_000.0), 1_715_000_000.0);
    }

    #[test]
    fn candidate_requires_both_coordinates() {
        let mut entity = EntityRecord::named("tag");
        entity.latitude = Some(40.0);
        assert!(LocationCandidate::from_entity(&entity).is_none());

        entity.longitude = Some(-73.0);
        let candidate = LocationCandidate::from_entity(&entity).expect("candidate");
        assert_eq!(candidate.timestamp, 0.0);
        assert!(candidate.address.is_empty());
    }

    #[test]
    fn place_label_joins_city_and_state() {
        let address = json!({"locality": "Daytona Beach", "administrativeArea": "FL"});
        let address = address.as_object().expect("object").clone();
        assert_eq!(place_label(&address).as_deref(), Some("Daytona Beach, FL"));

        let only_state = json!({"administrativeArea": "FL"});
        assert_eq!(
            place_label(only_state.as_object().expect("object")).as_deref(),
            Some("FL")
        );
        assert_eq!(place_label(&Map::new()), None);
    }

    #[test]
    fn history_uses_legacy_name_key() {
        let log = HistoryLog::new(TrackedName::from("LYRIQ"));
        let value = serde_json::to_value(&log).expect("serialize");
        assert_eq!(value, json!({"airtag_name": "LYRIQ", "locations": []}));
    }

    #[test]
    fn null_timestamp_and_address_load_as_defaults() {
        let entry: LocationEntry = serde_json::from_value(json!({
            "latitude": 29.19,
            "longitude": -81.05,
            "accuracy": null,
            "timestamp": null,
            "address": null,
            "recorded_at": "2024-05-06T12:00:00.000000-04:00"
        }))
        .expect("deserialize");
        assert_eq!(entry.timestamp, 0.0);
        assert!(entry.address.is_empty());
    }
}
