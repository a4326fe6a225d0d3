//! Structured extractor: JSON converter output → entity records.

use serde_json::{Map, Value};

use tagtrail_core::EntityRecord;

const OBJECTS_KEY: &str = "$objects";
const UNKNOWN_NAME: &str = "Unknown";

/// Normalize a converter JSON value into entity records.
///
/// Accepts a top-level array, or a mapping whose `$objects` key holds an
/// array. Anything else yields an empty list. Non-mapping elements are
/// skipped; order is otherwise preserved.
pub fn extract_entities(value: &Value) -> Vec<EntityRecord> {
    let Some(items) = entity_array(value) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(entity_from_object)
        .collect()
}

fn entity_array(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get(OBJECTS_KEY).and_then(Value::as_array),
        _ => None,
    }
}

fn entity_from_object(item: &Map<String, Value>) -> EntityRecord {
    let name = item
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_NAME);
    let mut record = EntityRecord::named(name);

    if let Some(location) = item.get("location").and_then(Value::as_object) {
        record.latitude = location.get("latitude").and_then(Value::as_f64);
        record.longitude = location.get("longitude").and_then(Value::as_f64);
        record.accuracy = location.get("horizontalAccuracy").and_then(Value::as_f64);
        record.timestamp = location.get("timeStamp").and_then(Value::as_f64);
        record.address = Some(
            item.get("address")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        );
    }
    record
}
