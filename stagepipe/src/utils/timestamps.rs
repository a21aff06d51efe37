//! UTC timestamps for stage log entries.

use chrono::{DateTime, Utc};
use serde::Serializer;

/// A UTC point in time.
pub type Timestamp = DateTime<Utc>;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f+00:00";

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format(ISO_FORMAT).to_string()
}

/// Returns the current UTC time formatted with [`format_iso8601`].
///
/// # Examples
///
/// ```
/// use stagepipe::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso8601(&now_utc())
}

/// Milliseconds between two timestamps, with microsecond resolution.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn elapsed_ms(start: &Timestamp, end: &Timestamp) -> f64 {
    let delta = *end - *start;
    delta
        .num_microseconds()
        .map_or(delta.num_milliseconds() as f64, |us| us as f64 / 1000.0)
}

/// Serde helper writing a timestamp in ISO 8601 form.
pub fn serialize_iso<S>(dt: &Timestamp, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_iso8601(dt))
}

/// Serde helper for optional timestamps; `None` is written as null.
pub fn serialize_iso_opt<S>(dt: &Option<Timestamp>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => serialize_iso(dt, serializer),
        None => serializer.serialize_none(),
    }
}
