use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::foundation::clock::Clock;
use crate::foundation::error::{StampError, StampResult};
use crate::metadata::bag::{MetadataBag, TIMESTAMP_PRIORITY};

/// Timestamp layout used in output file names.
pub const FILENAME_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Where a [`ResolvedTimestamp`] came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimestampSource {
    /// A metadata key from the priority list.
    Key(&'static str),
    /// No key produced a usable value; the clock was read instead.
    Clock,
}

impl std::fmt::Display for TimestampSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Clock => f.write_str("clock"),
        }
    }
}

/// The single event time chosen for an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    /// Local wall time of the event.
    pub at: NaiveDateTime,
    /// Key or fallback that produced `at`.
    pub source: TimestampSource,
}

impl ResolvedTimestamp {
    /// `YYYYMMDD_HHMMSS`, as embedded in output file names.
    pub fn file_stamp(&self) -> String {
        self.at.format(FILENAME_STAMP_FORMAT).to_string()
    }

    /// Format with a caller-supplied `chrono` pattern, rejecting invalid patterns.
    pub fn format_with(&self, pattern: &str) -> StampResult<String> {
        let mut out = String::new();
        write!(out, "{}", self.at.format(pattern)).map_err(|_| {
            StampError::Other(anyhow::anyhow!("invalid timestamp format '{pattern}'"))
        })?;
        Ok(out)
    }
}

/// Pick the event timestamp from `bag`.
///
/// Keys are tried in [`TIMESTAMP_PRIORITY`] order and the first one whose value
/// reads as a timestamp wins. When none does, `clock` supplies the time.
pub fn resolve_timestamp(bag: &MetadataBag, clock: &impl Clock) -> ResolvedTimestamp {
    for key in TIMESTAMP_PRIORITY {
        let Some(value) = bag.get(key) else {
            continue;
        };
        match value.as_timestamp() {
            Some(at) => {
                tracing::debug!(key, %at, "timestamp resolved from metadata");
                return ResolvedTimestamp {
                    at,
                    source: TimestampSource::Key(key),
                };
            }
            None => tracing::debug!(key, %value, "metadata value is not a timestamp"),
        }
    }

    let at = clock.now();
    tracing::warn!(%at, "no usable timestamp in metadata; using current time");
    ResolvedTimestamp {
        at,
        source: TimestampSource::Clock,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/metadata/timestamp.rs"]
mod tests;
