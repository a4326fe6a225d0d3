//! Text-dump parser.
//!
//! The text dump (`plutil -p`) has no schema: it is an indented rendering of
//! the archived object graph. Records are rebuilt by watching five field
//! patterns line by line and flushing a record whenever a new `"name"` shows
//! up. This depends on fields appearing near their owner in the dump; it
//! covers the sibling ordering the converter emits and nothing more.
//!
//! Flush rule:
//! - a new name flushes the pending record if it has a name and a latitude;
//! - latitude and longitude reset on every new name;
//! - accuracy and timestamp are never reset, so a record that does not repeat
//!   them inherits the previous record's values.

use once_cell::sync::Lazy;
use regex::Regex;

use tagtrail_core::EntityRecord;

static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""name"\s*=>\s*"([^"]+)""#).expect("name regex"));
static LATITUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""latitude"\s*=>\s*([-\d.]+)"#).expect("latitude regex"));
static LONGITUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""longitude"\s*=>\s*([-\d.]+)"#).expect("longitude regex"));
static ACCURACY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""horizontalAccuracy"\s*=>\s*([-\d.]+)"#).expect("accuracy regex")
});
static TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""timeStamp"\s*=>\s*([-\d.]+)"#).expect("timestamp regex"));

/// Fields seen since the last flush.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PendingRecord {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub timestamp: Option<f64>,
}

impl PendingRecord {
    /// A record is complete enough to emit once it has a name and a latitude.
    fn ready(&self) -> Option<EntityRecord> {
        let name = self.name.as_ref()?;
        let latitude = self.latitude?;
        Some(EntityRecord {
            name: name.clone(),
            latitude: Some(latitude),
            longitude: self.longitude,
            accuracy: self.accuracy,
            timestamp: self.timestamp,
            address: None,
        })
    }

    /// Start a new entity: emit the old one if ready, then reset position.
    fn begin(&mut self, name: String) -> Option<EntityRecord> {
        let flushed = self.ready();
        self.name = Some(name);
        self.latitude = None;
        self.longitude = None;
        flushed
    }
}

/// Single-pass record builder over a text dump.
#[derive(Debug, Default)]
pub struct TextDumpParser {
    pending: PendingRecord,
    records: Vec<EntityRecord>,
}

impl TextDumpParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &PendingRecord {
        &self.pending
    }

    /// Feed one line. The name pattern is checked before the others so a
    /// line holding both a name and a coordinate attributes it to the new name.
    pub fn feed_line(&mut self, line: &str) {
        if let Some(name) = capture(&NAME, line) {
            if let Some(record) = self.pending.begin(name.to_string()) {
                self.records.push(record);
            }
        }
        if let Some(v) = capture_number(&LATITUDE, line) {
            self.pending.latitude = Some(v);
        }
        if let Some(v) = capture_number(&LONGITUDE, line) {
            self.pending.longitude = Some(v);
        }
        if let Some(v) = capture_number(&ACCURACY, line) {
            self.pending.accuracy = Some(v);
        }
        if let Some(v) = capture_number(&TIMESTAMP, line) {
            self.pending.timestamp = Some(v);
        }
    }

    /// Flush whatever is still pending and return all records in order.
    pub fn finish(mut self) -> Vec<EntityRecord> {
        if let Some(record) = self.pending.ready() {
            self.records.push(record);
        }
        self.records
    }
}

/// Parse a complete text dump into entity records.
pub fn parse_text_dump(raw: &str) -> Vec<EntityRecord> {
    let mut parser = TextDumpParser::new();
    for line in raw.lines() {
        parser.feed_line(line);
    }
    parser.finish()
}

fn capture<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    pattern
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// `[-\d.]+` also matches things like `-` or `1.2.3`; those are skipped.
fn capture_number(pattern: &Regex, line: &str) -> Option<f64> {
    let raw = capture(pattern, line)?;
    match raw.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::debug!(value = raw, "ignoring unparseable number in text dump");
            None
        }
    }
}
