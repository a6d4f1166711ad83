use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

/// Filesystem key: file size in bytes.
pub const FILE_SIZE: &str = "file_size";
/// Filesystem key: creation time as epoch seconds.
pub const CREATION_TIME: &str = "creation_time";
/// Filesystem key: last modification time as epoch seconds.
pub const MODIFIED_TIME: &str = "modified_time";

/// Keys consulted for the event timestamp, highest priority first.
pub const TIMESTAMP_PRIORITY: [&str; 4] = [
    "DateTimeOriginal",
    "DateTime",
    "DateTimeDigitized",
    CREATION_TIME,
];

/// Layout of formatted date-time values in embedded metadata.
pub const METADATA_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// One metadata value, kept in the type its source produced it in.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Free text, including formatted EXIF dates.
    Text(String),
    /// Whole number, e.g. a file size or a single EXIF short/long.
    Integer(i64),
    /// Fractional number, e.g. epoch seconds or an EXIF rational.
    Float(f64),
    /// Already parsed local wall time.
    Timestamp(NaiveDateTime),
}

impl MetadataValue {
    /// Interpret the value as a point in time.
    ///
    /// Numbers (and text that parses as a number) are epoch seconds rendered in
    /// local time; other text must match [`METADATA_DATETIME_FORMAT`].
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(at) => Some(*at),
            Self::Integer(secs) => epoch_to_local(*secs as f64),
            Self::Float(secs) => epoch_to_local(*secs),
            Self::Text(raw) => {
                let raw = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
                match raw.parse::<f64>() {
                    Ok(secs) => epoch_to_local(secs),
                    Err(_) => NaiveDateTime::parse_from_str(raw, METADATA_DATETIME_FORMAT).ok(),
                }
            }
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Timestamp(at) => write!(f, "{at}"),
        }
    }
}

fn epoch_to_local(secs: f64) -> Option<NaiveDateTime> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let utc = DateTime::from_timestamp(whole as i64, nanos)?;
    Some(utc.with_timezone(&chrono::Local).naive_local())
}

/// Embedded and filesystem metadata for one image, merged into a single map.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataBag {
    entries: BTreeMap<String, MetadataValue>,
}

impl MetadataBag {
    /// Empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: MetadataValue) {
        self.entries.insert(key.into(), value);
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Layer `embedded` on top of this bag; embedded keys win on collision.
    pub fn merge_embedded(&mut self, embedded: MetadataBag) {
        self.entries.extend(embedded.entries);
    }
}

impl<K: Into<String>> FromIterator<(K, MetadataValue)> for MetadataBag {
    fn from_iter<I: IntoIterator<Item = (K, MetadataValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/metadata/bag.rs"]
mod tests;
