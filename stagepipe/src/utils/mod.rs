//! Shared helpers.

pub mod timestamps;

pub use timestamps::{elapsed_ms, format_iso8601, iso_timestamp, now_utc, Timestamp};
