//! Append-only record of stage invocations.

use super::config::DumpFormat;
use crate::binding::CallArgs;
use crate::core::Value;
use crate::errors::StagepipeError;
use crate::utils::timestamps::{elapsed_ms, now_utc, serialize_iso, serialize_iso_opt, Timestamp};
use indexmap::IndexMap;
use serde::Serialize;

/// One stage invocation.
///
/// Opened when the stage is entered and closed when it exits, whether the
/// body ran or validation aborted it first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageLogEntry {
    /// Position of the invocation within its pipe.
    pub index: usize,
    /// Stage name.
    pub func: String,
    /// Positional arguments as supplied.
    pub args: Vec<Value>,
    /// Keyword arguments as supplied.
    pub kwargs: IndexMap<String, Value>,
    /// When the stage was entered.
    #[serde(serialize_with = "serialize_iso")]
    pub start_time: Timestamp,
    /// When the stage exited.
    #[serde(serialize_with = "serialize_iso_opt")]
    pub end_time: Option<Timestamp>,
    /// Errors recorded during the invocation, in order.
    pub exceptions: Vec<StagepipeError>,
    /// The body's result, if it returned one.
    pub return_value: Option<Value>,
}

impl StageLogEntry {
    /// Opens an entry stamped with the current time.
    #[must_use]
    pub fn open(index: usize, func: impl Into<String>, call: &CallArgs) -> Self {
        Self {
            index,
            func: func.into(),
            args: call.args.clone(),
            kwargs: call.kwargs.clone(),
            start_time: now_utc(),
            end_time: None,
            exceptions: Vec::new(),
            return_value: None,
        }
    }

    /// Stamps the end time unless the entry is already closed.
    pub fn close(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(now_utc());
        }
    }

    /// Records an error.
    pub fn record(&mut self, error: StagepipeError) {
        self.exceptions.push(error);
    }

    /// Returns true once the entry has an end time.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Returns true if any error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.exceptions.is_empty()
    }

    /// Most recently recorded error.
    #[must_use]
    pub fn last_error(&self) -> Option<&StagepipeError> {
        self.exceptions.last()
    }

    /// Wall time spent in the stage, in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> Option<f64> {
        self.end_time.map(|end| elapsed_ms(&self.start_time, &end))
    }
}

/// Ordered collection of [`StageLogEntry`] values. Entries are only ever
/// appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StageLog {
    entries: Vec<StageLogEntry>,
}

impl StageLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: StageLogEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut StageLogEntry> {
        self.entries.iter_mut().rev().find(|e| e.index == index)
    }

    /// Returns the entry recorded under `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StageLogEntry> {
        self.entries.iter().find(|e| e.index == index)
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&StageLogEntry> {
        self.entries.last()
    }

    /// Iterates over entries in the order stages were entered.
    pub fn iter(&self) -> impl Iterator<Item = &StageLogEntry> {
        self.entries.iter()
    }

    /// Returns all entries.
    #[must_use]
    pub fn entries(&self) -> &[StageLogEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the log as JSON.
    #[must_use]
    pub fn to_json(&self, format: DumpFormat) -> String {
        let rendered = match format {
            DumpFormat::Pretty => serde_json::to_string_pretty(self),
            DumpFormat::Compact => serde_json::to_string(self),
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"failed to render stage log: {e}\"}}"))
    }
}

impl<'a> IntoIterator for &'a StageLog {
    type Item = &'a StageLogEntry;
    type IntoIter = std::slice::Iter<'a, StageLogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageExecutionError;

    fn entry(index: usize) -> StageLogEntry {
        StageLogEntry::open(index, "stage", &CallArgs::positional([1]).kwarg("k", "v"))
    }

    #[test]
    fn test_entry_lifecycle() {
        let mut e = entry(0);
        assert!(!e.is_closed());
        assert_eq!(e.duration_ms(), None);

        e.record(StageExecutionError::new("stage", "boom").into());
        e.close();
        let first_end = e.end_time;
        e.close();

        assert!(e.is_closed());
        assert_eq!(e.end_time, first_end);
        assert!(e.has_errors());
        assert!(e.duration_ms().unwrap() >= 0.0);
    }

    #[test]
    fn test_log_is_ordered() {
        let mut log = StageLog::new();
        log.push(entry(0));
        log.push(entry(1));

        assert_eq!(log.len(), 2);
        assert_eq!(log.iter().map(|e| e.index).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(log.last().map(|e| e.index), Some(1));

        log.get_mut(0).unwrap().return_value = Some(Value::Int(7));
        assert_eq!(log.get(0).unwrap().return_value, Some(Value::Int(7)));
        assert!(log.get(5).is_none());
    }

    #[test]
    fn test_json_shape() {
        let mut log = StageLog::new();
        let mut e = entry(0);
        e.record(StageExecutionError::new("stage", "boom").into());
        log.push(e);

        let json: serde_json::Value =
            serde_json::from_str(&log.to_json(DumpFormat::Compact)).unwrap();
        let first = &json[0];
        assert_eq!(first["func"], "stage");
        assert_eq!(first["args"], serde_json::json!([1]));
        assert_eq!(first["kwargs"]["k"], "v");
        assert!(first["start_time"].as_str().unwrap().ends_with("+00:00"));
        assert!(first["end_time"].is_null());
        assert_eq!(first["exceptions"][0]["kind"], "stage_execution");
        assert_eq!(first["exceptions"][0]["detail"]["message"], "boom");
    }
}
